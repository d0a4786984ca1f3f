use crate::binning::{bin_count, bin_index};
use crate::errors::Error;
use ndarray::{Array1, Array2, ArrayView1};
use ndarray_stats::QuantileExt;
use serde::{Deserialize, Serialize};

/// Region of the binned density written by the vertex finder that is shown
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BinnedDensityWindow {
    #[serde(default = "BinnedDensityWindow::default_spatial_bin_extent")]
    pub spatial_bin_extent: f64,
    #[serde(default = "BinnedDensityWindow::default_temporal_bin_extent")]
    pub temporal_bin_extent: f64,
    #[serde(default = "BinnedDensityWindow::default_z_min")]
    pub z_min: f64,
    #[serde(default = "BinnedDensityWindow::default_z_max")]
    pub z_max: f64,
    #[serde(default)]
    pub t_min: f64,
    #[serde(default)]
    pub t_max: f64,
}

impl BinnedDensityWindow {
    fn default_spatial_bin_extent() -> f64 {
        0.025
    }
    fn default_temporal_bin_extent() -> f64 {
        0.1
    }
    fn default_z_min() -> f64 {
        3.0
    }
    fn default_z_max() -> f64 {
        4.0
    }
}

impl Default for BinnedDensityWindow {
    fn default() -> Self {
        Self {
            spatial_bin_extent: Self::default_spatial_bin_extent(),
            temporal_bin_extent: Self::default_temporal_bin_extent(),
            z_min: Self::default_z_min(),
            z_max: Self::default_z_max(),
            t_min: 0.0,
            t_max: 0.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BinnedDensity {
    pub min_z_bin: i64,
    pub max_z_bin: i64,
    pub min_t_bin: i64,
    pub max_t_bin: i64,
    /// shape = (n_z_bins, n_t_bins), indexed by `bin - min_bin`
    pub density: Array2<f64>,
    pub n_filled: usize,
}

/// Copy the densities that fall strictly inside the window onto a dense grid
///
/// # Arguments
/// * `data` - rows of (z_bin, t_bin, density), shape = (n_rows, 3)
/// * `window` - bin extents and coordinate range to show
///
/// # Returns
/// * `BinnedDensity` where `density[(z_bin - min_z_bin, t_bin - min_t_bin)]` is the last
///   density read for that bin; rows with `z_bin` or `t_bin` on or outside the window
///   edges are skipped
///
pub fn fill_binned_density(data: &Array2<f64>, window: &BinnedDensityWindow) -> Result<BinnedDensity, Error> {
    if data.ncols() != 3 {
        return Err(Error::ShapeMismatch {
            left: data.shape().to_vec(),
            right: vec![data.nrows(), 3],
        });
    }

    let min_z_bin: i64 = bin_index(window.z_min, window.spatial_bin_extent);
    let max_z_bin: i64 = bin_index(window.z_max, window.spatial_bin_extent);
    let min_t_bin: i64 = bin_index(window.t_min, window.temporal_bin_extent);
    let max_t_bin: i64 = bin_index(window.t_max, window.temporal_bin_extent);
    let n_z_bins: usize = bin_count(window.z_min, window.z_max, window.spatial_bin_extent)?;
    let n_t_bins: usize = bin_count(window.t_min, window.t_max, window.temporal_bin_extent)?;

    let mut density: Array2<f64> = Array2::zeros((n_z_bins, n_t_bins));
    let mut n_filled: usize = 0;
    for row in data.rows() {
        let z_bin: f64 = row[0];
        let t_bin: f64 = row[1];
        if !((min_z_bin as f64) < z_bin && z_bin < max_z_bin as f64) {
            continue;
        }
        if !((min_t_bin as f64) < t_bin && t_bin < max_t_bin as f64) {
            continue;
        }
        let i_z: usize = (z_bin - min_z_bin as f64) as usize;
        let i_t: usize = (t_bin - min_t_bin as f64) as usize;
        if i_z >= n_z_bins || i_t >= n_t_bins {
            continue;
        }
        density[(i_z, i_t)] = row[2];
        n_filled += 1;
    }

    return Ok(BinnedDensity {
        min_z_bin,
        max_z_bin,
        min_t_bin,
        max_t_bin,
        density,
        n_filled,
    });
}

/// Rescale the given columns to [0, 1] in place
///
/// A constant column has no range and becomes NaN.
pub fn renormalise_columns(data: &mut Array2<f64>, columns: &[usize]) -> Result<(), Error> {
    for &i_column in columns {
        if i_column >= data.ncols() {
            return Err(Error::ShapeMismatch {
                left: data.shape().to_vec(),
                right: vec![data.nrows(), i_column + 1],
            });
        }
        let column: ArrayView1<f64> = data.column(i_column);
        let min: f64 = *column.min_skipnan();
        let max: f64 = *column.max_skipnan();
        let normalised: Array1<f64> = column.mapv(|x: f64| (x - min) / (max - min));
        data.column_mut(i_column).assign(&normalised);
    }
    return Ok(());
}

#[test]
fn test_fill_binned_density_strict_window() {
    let window: BinnedDensityWindow = BinnedDensityWindow {
        t_min: -0.5,
        t_max: 0.5,
        ..Default::default()
    };
    // z bins (120, 160), t bins (-5, 5)
    let data: Array2<f64> = Array2::from_shape_vec(
        (5, 3),
        vec![
            121.0, 0.0, 0.5, // inside
            120.0, 0.0, 0.9, // on the lower z edge
            159.0, 4.0, 0.7, // inside
            140.0, 5.0, 0.3, // on the upper t edge
            140.0, 1.0, 0.1, // inside
        ],
    )
    .unwrap();

    let binned: BinnedDensity = fill_binned_density(&data, &window).unwrap();
    assert_eq!((binned.min_z_bin, binned.max_z_bin), (120, 160));
    assert_eq!((binned.min_t_bin, binned.max_t_bin), (-5, 5));
    assert_eq!(binned.density.dim(), (41, 11));
    assert_eq!(binned.n_filled, 3);
    assert_eq!(binned.density[(1, 5)], 0.5);
    assert_eq!(binned.density[(39, 9)], 0.7);
    assert_eq!(binned.density[(20, 6)], 0.1);
    assert_eq!(binned.density[(0, 5)], 0.0);
}

#[test]
fn test_fill_binned_density_default_time_window_is_empty() {
    // t_min == t_max leaves no bin strictly between the edges
    let data: Array2<f64> = Array2::from_shape_vec((2, 3), vec![130.0, 0.0, 1.0, 150.0, 0.0, 2.0]).unwrap();
    let binned: BinnedDensity = fill_binned_density(&data, &BinnedDensityWindow::default()).unwrap();
    assert_eq!(binned.density.dim(), (41, 1));
    assert_eq!(binned.n_filled, 0);
}

#[test]
fn test_renormalise_columns() {
    use approx::assert_abs_diff_eq;

    let mut data: Array2<f64> = Array2::from_shape_vec((3, 3), vec![2.0, 7.0, 0.1, 4.0, 7.0, 0.2, 6.0, 7.0, 0.3]).unwrap();
    renormalise_columns(&mut data, &[0, 1]).unwrap();

    assert_abs_diff_eq!(data.column(0).to_owned(), Array1::from(vec![0.0, 0.5, 1.0]), epsilon = 1e-12);
    assert!(data.column(1).iter().all(|x| x.is_nan()));
    assert_eq!(data[(2, 2)], 0.3);

    assert!(renormalise_columns(&mut data, &[3]).is_err());
}
