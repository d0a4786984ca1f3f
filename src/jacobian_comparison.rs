use crate::errors::Error;
use ndarray::{Array2, Array3, Axis, Zip, s};
use ndarray_stats::QuantileExt;

/// Entries where both Jacobians are smaller than this are not compared
pub const SMALL_VALUE_THRESHOLD: f64 = 1e-4;

/// Mean and spread of the relative difference between two sets of Jacobians
#[derive(Clone, Debug)]
pub struct JacobianComparison {
    /// shape = (n_rows, n_cols), NaN where every sample was masked
    pub mean: Array2<f64>,
    /// Population standard deviation, shape = (n_rows, n_cols)
    pub std: Array2<f64>,
    /// Upper end of the colour scale shared by `mean` and `std`
    pub colour_max: f64,
}

/// True where both `|analytical|` and `|numerical|` are below `threshold`
pub fn small_value_mask(analytical: &Array3<f64>, numerical: &Array3<f64>, threshold: f64) -> Result<Array3<bool>, Error> {
    check_same_shape(analytical, numerical)?;
    let mask: Array3<bool> = Zip::from(analytical)
        .and(numerical)
        .map_collect(|a: &f64, n: &f64| a.abs() < threshold && n.abs() < threshold);
    return Ok(mask);
}

/// `|numerical - analytical| / |numerical|`, NaN where both are below `threshold`
///
/// Unmasked entries with a vanishing numerical value give `inf` or NaN, which are
/// left in place.
pub fn relative_difference(analytical: &Array3<f64>, numerical: &Array3<f64>, threshold: f64) -> Result<Array3<f64>, Error> {
    check_same_shape(analytical, numerical)?;
    let relative_diff: Array3<f64> = Zip::from(analytical).and(numerical).map_collect(|a: &f64, n: &f64| {
        if a.abs() < threshold && n.abs() < threshold {
            return f64::NAN;
        }
        return (n - a).abs() / n.abs();
    });
    return Ok(relative_diff);
}

/// Mean over the sample axis (axis 0), ignoring NaN
pub fn nan_mean_axis0(values: &Array3<f64>) -> Array2<f64> {
    let n_rows: usize = values.len_of(Axis(1));
    let n_cols: usize = values.len_of(Axis(2));
    let mut mean: Array2<f64> = Array2::from_elem((n_rows, n_cols), f64::NAN);
    for i_row in 0..n_rows {
        for i_col in 0..n_cols {
            let (sum, count): (f64, usize) = values
                .slice(s![.., i_row, i_col])
                .iter()
                .filter(|x| !x.is_nan())
                .fold((0.0, 0), |(sum, count), x| (sum + x, count + 1));
            if count > 0 {
                mean[(i_row, i_col)] = sum / count as f64;
            }
        }
    }
    return mean;
}

/// Population standard deviation over the sample axis (axis 0), ignoring NaN
pub fn nan_std_axis0(values: &Array3<f64>) -> Array2<f64> {
    let mean: Array2<f64> = nan_mean_axis0(values);
    let n_rows: usize = values.len_of(Axis(1));
    let n_cols: usize = values.len_of(Axis(2));
    let mut std: Array2<f64> = Array2::from_elem((n_rows, n_cols), f64::NAN);
    for i_row in 0..n_rows {
        for i_col in 0..n_cols {
            let mean_here: f64 = mean[(i_row, i_col)];
            if mean_here.is_nan() {
                continue;
            }
            let (sum_sq, count): (f64, usize) = values
                .slice(s![.., i_row, i_col])
                .iter()
                .filter(|x| !x.is_nan())
                .fold((0.0, 0), |(sum_sq, count), x| (sum_sq + (x - mean_here).powi(2), count + 1));
            std[(i_row, i_col)] = (sum_sq / count as f64).sqrt();
        }
    }
    return std;
}

/// Compare analytical and numerical Jacobians sample by sample
///
/// # Arguments
/// * `analytical` - shape = (n_samples, 6, 4) for the free-to-bound position Jacobian
/// * `numerical` - same shape as `analytical`
/// * `threshold` - entries where both are below this are excluded, see `SMALL_VALUE_THRESHOLD`
///
/// # Returns
/// * `JacobianComparison` with per-entry mean and standard deviation over the samples
///
pub fn compare_jacobians(analytical: &Array3<f64>, numerical: &Array3<f64>, threshold: f64) -> Result<JacobianComparison, Error> {
    let relative_diff: Array3<f64> = relative_difference(analytical, numerical, threshold)?;
    let mean: Array2<f64> = nan_mean_axis0(&relative_diff);
    let std: Array2<f64> = nan_std_axis0(&relative_diff);

    // Element-wise maximum keeps NaN, the overall maximum skips it
    let larger: Array2<f64> = Zip::from(&mean).and(&std).map_collect(|m: &f64, s: &f64| {
        if m.is_nan() || s.is_nan() {
            return f64::NAN;
        }
        return m.max(*s);
    });
    let colour_max: f64 = *larger.max_skipnan();

    return Ok(JacobianComparison { mean, std, colour_max });
}

fn check_same_shape(left: &Array3<f64>, right: &Array3<f64>) -> Result<(), Error> {
    if left.shape() != right.shape() {
        return Err(Error::ShapeMismatch {
            left: left.shape().to_vec(),
            right: right.shape().to_vec(),
        });
    }
    return Ok(());
}

#[test]
fn test_masked_entries_are_excluded() {
    use approx::assert_abs_diff_eq;

    let n_samples: usize = 4;
    let mut analytical: Array3<f64> = Array3::from_elem((n_samples, 6, 4), 1.0);
    let mut numerical: Array3<f64> = Array3::from_elem((n_samples, 6, 4), 1.0);

    // Entry (0, 0) is below threshold in every sample
    for i_sample in 0..n_samples {
        analytical[(i_sample, 0, 0)] = 1e-6;
        numerical[(i_sample, 0, 0)] = -2e-5;
    }

    // Entry (5, 3): relative differences 0.0, 0.5, NaN (masked), 1.0
    numerical[(0, 5, 3)] = 2.0;
    analytical[(0, 5, 3)] = 2.0;
    numerical[(1, 5, 3)] = 2.0;
    analytical[(1, 5, 3)] = 1.0;
    numerical[(2, 5, 3)] = 1e-5;
    analytical[(2, 5, 3)] = 1e-5;
    numerical[(3, 5, 3)] = 1.0;
    analytical[(3, 5, 3)] = 0.0;

    let mask: Array3<bool> = small_value_mask(&analytical, &numerical, SMALL_VALUE_THRESHOLD).unwrap();
    assert!(mask[(2, 0, 0)]);
    assert!(mask[(2, 5, 3)]);
    assert!(!mask[(3, 5, 3)]);

    let comparison: JacobianComparison = compare_jacobians(&analytical, &numerical, SMALL_VALUE_THRESHOLD).unwrap();
    assert!(comparison.mean[(0, 0)].is_nan());
    assert!(comparison.std[(0, 0)].is_nan());

    assert_abs_diff_eq!(comparison.mean[(5, 3)], 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(comparison.std[(5, 3)], (1.0_f64 / 6.0).sqrt(), epsilon = 1e-12);

    // Identical entries elsewhere
    assert_eq!(comparison.mean[(2, 2)], 0.0);
    assert_eq!(comparison.std[(2, 2)], 0.0);

    assert_abs_diff_eq!(comparison.colour_max, 0.5, epsilon = 1e-12);
}

#[test]
fn test_one_sided_small_values_are_compared() {
    // Only the analytical value is small, so the entry is kept
    let analytical: Array3<f64> = Array3::from_elem((1, 1, 1), 1e-6);
    let numerical: Array3<f64> = Array3::from_elem((1, 1, 1), 1e-2);
    let relative_diff: Array3<f64> = relative_difference(&analytical, &numerical, SMALL_VALUE_THRESHOLD).unwrap();
    assert!((relative_diff[(0, 0, 0)] - 0.9999).abs() < 1e-12);

    // A vanishing numerical value propagates
    let numerical_zero: Array3<f64> = Array3::zeros((1, 1, 1));
    let analytical_large: Array3<f64> = Array3::from_elem((1, 1, 1), 1.0);
    let relative_diff: Array3<f64> = relative_difference(&analytical_large, &numerical_zero, SMALL_VALUE_THRESHOLD).unwrap();
    assert!(relative_diff[(0, 0, 0)].is_infinite());
}

#[test]
fn test_shape_mismatch() {
    let analytical: Array3<f64> = Array3::zeros((2, 6, 4));
    let numerical: Array3<f64> = Array3::zeros((3, 6, 4));
    assert!(matches!(compare_jacobians(&analytical, &numerical, SMALL_VALUE_THRESHOLD), Err(Error::ShapeMismatch { .. })));
}
