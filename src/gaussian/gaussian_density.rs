use crate::errors::Error;
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, s};
use ndarray_linalg::{Determinant, Inverse};
use ndarray_stats::QuantileExt;

// Global constants
const PI: f64 = std::f64::consts::PI;

/// Unnormalised multivariate Gaussian with a fixed mean and covariance
///
/// The determinant and inverse are computed once, so the kernel can be evaluated
/// on a whole grid without repeating the factorisation.
#[derive(Clone, Debug)]
pub struct GaussianKernel {
    pub mean: Array1<f64>,
    pub cov_inverse: Array2<f64>,
    /// 1 / sqrt(det(cov))
    pub coefficient: f64,
}

impl GaussianKernel {
    /// Create a new kernel
    ///
    /// # Arguments
    /// * `mean` - e.g. impact parameters (d0, z0, t), length = n_dim
    /// * `cov` - covariance of `mean`, shape = (n_dim, n_dim)
    ///
    /// # Returns
    /// * `Error::DimensionMismatch` if `cov` is not square or does not match `mean`
    /// * `Error::Linalg` if `cov` is singular
    ///
    pub fn new(mean: ArrayView1<f64>, cov: ArrayView2<f64>) -> Result<Self, Error> {
        let (n_rows, n_cols): (usize, usize) = cov.dim();
        if n_rows != n_cols || mean.len() != n_rows {
            return Err(Error::DimensionMismatch {
                vector_len: mean.len(),
                n_rows,
                n_cols,
            });
        }

        let cov_owned: Array2<f64> = cov.to_owned();
        let cov_det: f64 = cov_owned.det()?;
        let cov_inverse: Array2<f64> = cov_owned.inv()?;

        return Ok(GaussianKernel {
            mean: mean.to_owned(),
            cov_inverse,
            coefficient: 1.0 / cov_det.sqrt(),
        });
    }

    pub fn n_dim(&self) -> usize {
        return self.mean.len();
    }

    /// Density at `diff = point - mean`
    pub fn evaluate_diff(&self, diff: ArrayView1<f64>) -> f64 {
        let mahalanobis_sq: f64 = diff.dot(&self.cov_inverse.dot(&diff));
        return self.coefficient * (-0.5 * mahalanobis_sq).exp();
    }

    /// Density at `point`
    pub fn evaluate(&self, point: ArrayView1<f64>) -> f64 {
        let diff: Array1<f64> = &point - &self.mean;
        return self.evaluate_diff(diff.view());
    }
}

/// Unnormalised Gaussian density of a displacement
///
/// `density = 1 / sqrt(det(cov)) * exp(-0.5 * diff^T . cov^-1 . diff)`
///
/// The `(2 pi)^(-k/2)` factor is omitted, so the peak value depends only on the
/// covariance volume. Near-singular covariances are not special-cased and may give
/// `inf` or `nan`.
///
/// # Arguments
/// * `diff` - `point - reference_point`, length = n_dim
/// * `cov` - covariance, shape = (n_dim, n_dim)
///
/// # Examples
/// ```
/// use acts_vis_rs::gaussian::gaussian_density;
/// use ndarray::{Array1, Array2};
///
/// let diff: Array1<f64> = Array1::from(vec![0.0, 0.0]);
/// let cov: Array2<f64> = Array2::from_diag(&Array1::from(vec![4.0, 1.0]));
///
/// let density: f64 = gaussian_density(diff.view(), cov.view()).unwrap();
/// assert!((density - 0.5).abs() < 1e-12);
/// ```
///
pub fn gaussian_density(diff: ArrayView1<f64>, cov: ArrayView2<f64>) -> Result<f64, Error> {
    let origin: Array1<f64> = Array1::zeros(diff.len());
    let kernel: GaussianKernel = GaussianKernel::new(origin.view(), cov)?;
    return Ok(kernel.evaluate_diff(diff));
}

/// Unnormalised Gaussian density at `point` for a distribution centred on `mean`
pub fn gaussian_density_at(point: ArrayView1<f64>, mean: ArrayView1<f64>, cov: ArrayView2<f64>) -> Result<f64, Error> {
    if point.len() != mean.len() {
        return Err(Error::DimensionMismatch {
            vector_len: point.len(),
            n_rows: mean.len(),
            n_cols: mean.len(),
        });
    }
    let diff: Array1<f64> = &point - &mean;
    return gaussian_density(diff.view(), cov);
}

/// Probability density, i.e. `gaussian_density` times `(2 pi)^(-k/2)`
pub fn normalised_gaussian_density(diff: ArrayView1<f64>, cov: ArrayView2<f64>) -> Result<f64, Error> {
    let n_dim: i32 = diff.len() as i32;
    let density: f64 = gaussian_density(diff, cov)?;
    return Ok(density * (2.0 * PI).powf(-0.5 * n_dim as f64));
}

/// The first `n_dim` impact parameters and the matching covariance block
///
/// `n_dim = 2` gives the time-independent (d0, z0) density, `n_dim = 3` adds t.
pub fn leading_block<'a>(ip: ArrayView1<'a, f64>, cov: ArrayView2<'a, f64>, n_dim: usize) -> (ArrayView1<'a, f64>, ArrayView2<'a, f64>) {
    let ip_block: ArrayView1<f64> = ip.slice_move(s![..n_dim]);
    let cov_block: ArrayView2<f64> = cov.slice_move(s![..n_dim, ..n_dim]);
    return (ip_block, cov_block);
}

/// Index of the sample with the largest `cov[row, col]`
///
/// # Arguments
/// * `covs` - shape = (n_samples, n_dim, n_dim)
/// * `row`, `col` - covariance entry, e.g. (2, 2) for var(t)
///
pub fn index_of_max_covariance(covs: &Array3<f64>, row: usize, col: usize) -> Result<usize, Error> {
    let entries: ArrayView1<f64> = covs.slice(s![.., row, col]);
    let i_max: usize = entries.argmax_skipnan().map_err(|_| Error::EmptyInput {
        what: format!("no finite covariance entries at ({}, {})", row, col),
    })?;
    return Ok(i_max);
}

#[test]
fn test_gaussian_density_unit_covariance_at_mean() {
    use approx::assert_abs_diff_eq;

    let ips: Array2<f64> = Array2::zeros((1, 3));
    let covs: Array3<f64> = Array3::from_shape_fn((1, 3, 3), |(_, i, j)| if i == j { 1.0 } else { 0.0 });

    let ip: ArrayView1<f64> = ips.row(0);
    let cov: ArrayView2<f64> = covs.slice(s![0, .., ..]);

    // At the mean of a unit covariance the unnormalised density is exactly one
    let density: f64 = gaussian_density_at(ip, ip, cov).unwrap();
    assert_abs_diff_eq!(density, 1.0, epsilon = 1e-12);

    // Including the normalisation gives the textbook peak value
    let diff: Array1<f64> = Array1::zeros(3);
    let density_normalised: f64 = normalised_gaussian_density(diff.view(), cov).unwrap();
    assert_abs_diff_eq!(density_normalised, 1.0 / (2.0 * PI).powf(1.5), epsilon = 1e-12);
}

#[test]
fn test_gaussian_density_symmetric() {
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng: StdRng = StdRng::seed_from_u64(7);
    for n_dim in [2, 3] {
        for _ in 0..20 {
            // A^T A + I is symmetric positive definite
            let a: Array2<f64> = Array2::from_shape_fn((n_dim, n_dim), |_| rng.random_range(-1.0..1.0));
            let cov: Array2<f64> = a.t().dot(&a) + Array2::<f64>::eye(n_dim);
            let diff: Array1<f64> = Array1::from_shape_fn(n_dim, |_| rng.random_range(-2.0..2.0));
            let minus_diff: Array1<f64> = -&diff;

            let density_plus: f64 = gaussian_density(diff.view(), cov.view()).unwrap();
            let density_minus: f64 = gaussian_density(minus_diff.view(), cov.view()).unwrap();
            assert_relative_eq!(density_plus, density_minus, max_relative = 1e-12);
        }
    }
}

#[test]
fn test_gaussian_density_known_value() {
    use approx::assert_abs_diff_eq;

    // Diagonal covariance: exp(-0.5 * (1/4 + 4/1)) / sqrt(4)
    let diff: Array1<f64> = Array1::from(vec![1.0, 2.0]);
    let cov: Array2<f64> = Array2::from_diag(&Array1::from(vec![4.0, 1.0]));
    let density: f64 = gaussian_density(diff.view(), cov.view()).unwrap();
    let expected: f64 = 0.5 * (-0.5 * (0.25 + 4.0_f64)).exp();
    assert_abs_diff_eq!(density, expected, epsilon = 1e-12);
}

#[test]
fn test_gaussian_density_errors() {
    let diff: Array1<f64> = Array1::zeros(2);

    let singular: Array2<f64> = Array2::from_shape_vec((2, 2), vec![1.0, 1.0, 1.0, 1.0]).unwrap();
    assert!(matches!(gaussian_density(diff.view(), singular.view()), Err(Error::Linalg(_))));

    let cov_3d: Array2<f64> = Array2::eye(3);
    assert!(matches!(gaussian_density(diff.view(), cov_3d.view()), Err(Error::DimensionMismatch { .. })));
}

#[test]
fn test_leading_block_and_max_covariance() {
    let ip: Array1<f64> = Array1::from(vec![0.1, 0.2, 0.3]);
    let mut covs: Array3<f64> = Array3::zeros((3, 3, 3));
    for i_sample in 0..3 {
        for i_dim in 0..3 {
            covs[(i_sample, i_dim, i_dim)] = 1.0 + i_dim as f64;
        }
    }
    covs[(1, 2, 2)] = 100.0;

    let cov: ArrayView2<f64> = covs.slice(s![1, .., ..]);
    let (ip_block, cov_block): (ArrayView1<f64>, ArrayView2<f64>) = leading_block(ip.view(), cov, 2);
    assert_eq!(ip_block.to_vec(), vec![0.1, 0.2]);
    assert_eq!(cov_block.dim(), (2, 2));
    assert_eq!(cov_block[(1, 1)], 2.0);

    assert_eq!(index_of_max_covariance(&covs, 2, 2).unwrap(), 1);
}
