use crate::errors::Error;
use ndarray::Array1;
use ndarray_stats::QuantileExt;

/// Bin index of a continuous coordinate
///
/// Uses the offset convention of the density grids written by the vertex finder:
/// `floor(value / bin_width - 0.5) + 1`. Bin 0 is centred on zero and covers
/// `[-bin_width / 2, bin_width / 2)`. Index arithmetic such as `bin - min_bin`
/// relies on exactly this definition.
///
/// # Arguments
/// * `value` - coordinate, e.g. z in mm or t in mm
/// * `bin_width` - extent of one bin, same units as `value`
///
pub fn bin_index(value: f64, bin_width: f64) -> i64 {
    let bin: f64 = (value / bin_width - 0.5).floor() + 1.0;
    return bin as i64;
}

/// Number of bins needed to cover `[min, max]`, both ends included
///
/// Halves round to even, so a span of 2.5 bin widths gives 3 bins.
pub fn bin_count(min: f64, max: f64, bin_width: f64) -> Result<usize, Error> {
    if !(max >= min) || !(bin_width > 0.0) {
        return Err(Error::InvalidBinRange { min, max, width: bin_width });
    }
    let n_bins: usize = ((max - min) / bin_width).round_ties_even() as usize + 1;
    return Ok(n_bins);
}

/// Number of bins covering the range spanned by `values`
pub fn bin_count_from_array(values: &Array1<f64>, bin_width: f64) -> Result<usize, Error> {
    let min: f64 = *values.min_skipnan();
    let max: f64 = *values.max_skipnan();
    if values.is_empty() || min.is_nan() {
        return Err(Error::EmptyInput {
            what: "no finite values to bin".to_string(),
        });
    }
    return bin_count(min, max, bin_width);
}

/// Coordinate represented by a grid bin
///
/// `reference + bin_width * (bin - n_bins / 2)` with real division, so the grid
/// is centred on `reference`.
///
/// Note: this is not the inverse of `bin_index`. The grid is shifted by `n_bins / 2`
/// and has no half-bin offset.
pub fn value_from_bin(reference: f64, bin_width: f64, bin: usize, n_bins: usize) -> f64 {
    let value: f64 = reference + bin_width * (bin as f64 - n_bins as f64 / 2.0);
    return value;
}

#[test]
fn test_bin_index_offset_convention() {
    let bin_width: f64 = 0.025;

    // Bin 0 is centred on zero
    assert_eq!(bin_index(0.0, bin_width), 0);
    assert_eq!(bin_index(0.012, bin_width), 0);
    assert_eq!(bin_index(-0.012, bin_width), 0);
    assert_eq!(bin_index(0.013, bin_width), 1);
    assert_eq!(bin_index(-0.013, bin_width), -1);

    // Window used for the binned density plots
    assert_eq!(bin_index(3.0, bin_width), 120);
    assert_eq!(bin_index(4.0, bin_width), 160);
}

#[test]
fn test_bin_index_monotonic() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng: StdRng = StdRng::seed_from_u64(42);
    for _ in 0..50 {
        let bin_width: f64 = rng.random_range(1e-3..20.0);
        let mut values: Vec<f64> = (0..200).map(|_| rng.random_range(-1000.0..1000.0)).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());

        let bins: Vec<i64> = values.iter().map(|value| bin_index(*value, bin_width)).collect();
        for i_value in 1..bins.len() {
            assert!(bins[i_value] >= bins[i_value - 1]);
        }
    }
}

#[test]
fn test_bin_count() {
    assert_eq!(bin_count(0.0, 0.0, 0.1).unwrap(), 1);
    assert_eq!(bin_count(3.0, 3.0, 0.025).unwrap(), 1);
    assert_eq!(bin_count(3.0, 4.0, 0.025).unwrap(), 41);
    assert_eq!(bin_count(-0.2, 0.2, 0.004).unwrap(), 101);

    // Half bin spans round to even
    assert_eq!(bin_count(0.0, 2.5, 1.0).unwrap(), 3);
    assert_eq!(bin_count(0.0, 3.5, 1.0).unwrap(), 5);

    assert!(matches!(bin_count(1.0, 0.0, 0.1), Err(Error::InvalidBinRange { .. })));
    assert!(matches!(bin_count(0.0, 1.0, 0.0), Err(Error::InvalidBinRange { .. })));

    let values: Array1<f64> = Array1::from(vec![3.5, 3.0, f64::NAN, 4.0]);
    assert_eq!(bin_count_from_array(&values, 0.025).unwrap(), 41);
    assert!(matches!(bin_count_from_array(&Array1::zeros(0), 0.025), Err(Error::EmptyInput { .. })));
}

#[test]
fn test_value_from_bin_is_not_inverse_of_bin_index() {
    use approx::assert_abs_diff_eq;

    // The grid convention centres `n_bins` bins on the reference
    let n_bins: usize = 41;
    let bin_width: f64 = 0.05;
    assert_abs_diff_eq!(value_from_bin(0.0, bin_width, 0, n_bins), -1.025, epsilon = 1e-12);
    assert_abs_diff_eq!(value_from_bin(1.0, bin_width, 20, n_bins), 0.975, epsilon = 1e-12);

    // Feeding grid coordinates back through `bin_index` does not return the grid bin:
    // the grid bins are shifted by -n_bins/2 and offset by half a bin
    let mut n_round_trips: usize = 0;
    for bin in 0..n_bins {
        let value: f64 = value_from_bin(0.0, bin_width, bin, n_bins);
        if bin_index(value, bin_width) == bin as i64 {
            n_round_trips += 1;
        }
    }
    assert_eq!(n_round_trips, 0);
}
