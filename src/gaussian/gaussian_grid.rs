use super::GaussianKernel;
use crate::binning::value_from_bin;
use crate::errors::Error;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Grid around a single track's impact parameters
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GaussianGridSettings {
    #[serde(default = "GaussianGridSettings::default_z_bin_extent")]
    pub z_bin_extent: f64,
    #[serde(default = "GaussianGridSettings::default_t_bin_extent")]
    pub t_bin_extent: f64,
    #[serde(default = "GaussianGridSettings::default_n_z")]
    pub n_z: usize,
    #[serde(default = "GaussianGridSettings::default_n_t")]
    pub n_t: usize,
    /// Which track of the input files to draw
    #[serde(default = "GaussianGridSettings::default_plot_index")]
    pub plot_index: usize,
}

impl GaussianGridSettings {
    fn default_z_bin_extent() -> f64 {
        0.05
    }
    fn default_t_bin_extent() -> f64 {
        19.0
    }
    fn default_n_z() -> usize {
        41
    }
    fn default_n_t() -> usize {
        5
    }
    fn default_plot_index() -> usize {
        30
    }
}

impl Default for GaussianGridSettings {
    fn default() -> Self {
        Self {
            z_bin_extent: Self::default_z_bin_extent(),
            t_bin_extent: Self::default_t_bin_extent(),
            n_z: Self::default_n_z(),
            n_t: Self::default_n_t(),
            plot_index: Self::default_plot_index(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GaussianGrid {
    pub z: Array1<f64>,
    pub t: Array1<f64>,
    /// shape = (n_z, n_t)
    pub density: Array2<f64>,
}

/// Evaluate one track's density on a (z, t) grid centred on its impact parameters
///
/// Every cell is written once: `density[z_bin, t_bin]` is the density at
/// `(0, z(z_bin), t(t_bin))`, where z and t follow `value_from_bin` around `ip[1]`
/// and `ip[2]`.
///
/// # Arguments
/// * `ip` - impact parameters (d0, z0, t)
/// * `cov` - 3x3 covariance of `ip`
/// * `settings` - bin extents and grid size
///
pub fn gaussian_grid(ip: ArrayView1<f64>, cov: ArrayView2<f64>, settings: &GaussianGridSettings) -> Result<GaussianGrid, Error> {
    let kernel: GaussianKernel = GaussianKernel::new(ip, cov)?;
    if kernel.n_dim() != 3 {
        return Err(Error::DimensionMismatch {
            vector_len: ip.len(),
            n_rows: 3,
            n_cols: 3,
        });
    }

    let n_z: usize = settings.n_z;
    let n_t: usize = settings.n_t;
    let z: Array1<f64> = Array1::from_shape_fn(n_z, |z_bin: usize| value_from_bin(ip[1], settings.z_bin_extent, z_bin, n_z));
    let t: Array1<f64> = Array1::from_shape_fn(n_t, |t_bin: usize| value_from_bin(ip[2], settings.t_bin_extent, t_bin, n_t));

    let mut density: Array2<f64> = Array2::from_elem((n_z, n_t), f64::NAN);
    let mut point: Array1<f64> = Array1::zeros(3);
    for z_bin in 0..n_z {
        point[1] = z[z_bin];
        for t_bin in 0..n_t {
            point[2] = t[t_bin];
            density[(z_bin, t_bin)] = kernel.evaluate(point.view());
        }
    }

    return Ok(GaussianGrid { z, t, density });
}

#[test]
fn test_gaussian_grid() {
    use super::gaussian_density_at;
    use approx::assert_abs_diff_eq;

    let ip: Array1<f64> = Array1::from(vec![0.0, 1.5, 20.0]);
    let cov: Array2<f64> = Array2::from_diag(&Array1::from(vec![0.01, 0.04, 400.0]));
    let settings: GaussianGridSettings = GaussianGridSettings::default();

    let grid: GaussianGrid = gaussian_grid(ip.view(), cov.view(), &settings).unwrap();
    assert_eq!(grid.density.dim(), (41, 5));
    assert_abs_diff_eq!(grid.z[0], 1.5 - 0.05 * 20.5, epsilon = 1e-12);
    assert_abs_diff_eq!(grid.t[4], 20.0 + 19.0 * 1.5, epsilon = 1e-12);

    // Each cell is the kernel at (0, z, t)
    for (z_bin, t_bin) in [(0, 0), (20, 2), (40, 4), (13, 1)] {
        let point: Array1<f64> = Array1::from(vec![0.0, grid.z[z_bin], grid.t[t_bin]]);
        let expected: f64 = gaussian_density_at(point.view(), ip.view(), cov.view()).unwrap();
        assert_abs_diff_eq!(grid.density[(z_bin, t_bin)], expected, epsilon = 1e-15);
    }

    // The grid is shifted by half a bin, so the mean sits between cells (20, 2) and (21, 3)
    assert_abs_diff_eq!(grid.density[(20, 2)], grid.density[(21, 3)], epsilon = 1e-12);
    assert!(grid.density[(20, 2)] < 1.0 / (0.01_f64 * 0.04 * 400.0).sqrt());
}
