use crate::errors::Error;
use crate::gaussian::{GaussianKernel, leading_block};
use log::info;
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, Axis, s};
use ndarray_stats::QuantileExt;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Axes of the accumulated track density
///
/// `n_t == 1` selects the time-independent density: the (d0, z0) Gaussian is used
/// and z gets its own resolution. Otherwise the (d0, z0, t) Gaussian is used on an
/// `n_t` x `n_t` grid.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrackDensitySettings {
    #[serde(default = "TrackDensitySettings::default_n_t")]
    pub n_t: usize,
    #[serde(default = "TrackDensitySettings::default_t_min")]
    pub t_min: f64,
    #[serde(default = "TrackDensitySettings::default_t_max")]
    pub t_max: f64,
    /// Number of z points when `n_t == 1`
    #[serde(default = "TrackDensitySettings::default_n_z_time_independent")]
    pub n_z_time_independent: usize,
    #[serde(default = "TrackDensitySettings::default_z_min")]
    pub z_min: f64,
    #[serde(default = "TrackDensitySettings::default_z_max")]
    pub z_max: f64,
}

impl TrackDensitySettings {
    fn default_n_t() -> usize {
        1
    }
    fn default_t_min() -> f64 {
        -200.0
    }
    fn default_t_max() -> f64 {
        600.0
    }
    fn default_n_z_time_independent() -> usize {
        101
    }
    fn default_z_min() -> f64 {
        -0.2
    }
    fn default_z_max() -> f64 {
        0.2
    }

    pub fn is_time_independent(&self) -> bool {
        return self.n_t == 1;
    }

    pub fn n_z(&self) -> usize {
        if self.is_time_independent() {
            return self.n_z_time_independent;
        }
        return self.n_t;
    }

    /// 2 for (d0, z0), 3 for (d0, z0, t)
    pub fn n_dim(&self) -> usize {
        if self.is_time_independent() {
            return 2;
        }
        return 3;
    }

    pub fn z_axis(&self) -> Array1<f64> {
        return linspace(self.z_min, self.z_max, self.n_z());
    }

    pub fn t_axis(&self) -> Array1<f64> {
        return linspace(self.t_min, self.t_max, self.n_t);
    }
}

impl Default for TrackDensitySettings {
    fn default() -> Self {
        Self {
            n_t: Self::default_n_t(),
            t_min: Self::default_t_min(),
            t_max: Self::default_t_max(),
            n_z_time_independent: Self::default_n_z_time_independent(),
            z_min: Self::default_z_min(),
            z_max: Self::default_z_max(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TrackDensity {
    pub z: Array1<f64>,
    pub t: Array1<f64>,
    /// shape = (n_z, n_t)
    pub density: Array2<f64>,
}

/// Evenly spaced points, both ends included; a single point sits at `start`
pub fn linspace(start: f64, end: f64, n: usize) -> Array1<f64> {
    if n == 1 {
        return Array1::from_elem(1, start);
    }
    return Array1::linspace(start, end, n);
}

/// Sum of all tracks' Gaussian densities on the (z, t) grid
///
/// Every cell holds `sum_k density_k(0, z, t)`, where `density_k` is the Gaussian of
/// track `k` restricted to the first `n_dim` impact parameters. Rows of the grid are
/// independent and filled in parallel; within a cell the tracks are summed in input
/// order.
///
/// # Arguments
/// * `ips` - impact parameters (d0, z0, t), shape = (n_tracks, 3)
/// * `covs` - covariances, shape = (n_tracks, 3, 3)
/// * `settings` - grid axes
///
/// # Returns
/// * `TrackDensity` with `density.shape() = (n_z, n_t)`
///
pub fn accumulate_track_density(ips: &Array2<f64>, covs: &Array3<f64>, settings: &TrackDensitySettings) -> Result<TrackDensity, Error> {
    let n_tracks: usize = ips.nrows();
    if covs.shape()[0] != n_tracks {
        return Err(Error::ShapeMismatch {
            left: ips.shape().to_vec(),
            right: covs.shape().to_vec(),
        });
    }

    let n_dim: usize = settings.n_dim();
    let z: Array1<f64> = settings.z_axis();
    let t: Array1<f64> = settings.t_axis();
    let n_z: usize = z.len();
    let n_t: usize = t.len();

    // Factorise each covariance once
    let mut kernels: Vec<GaussianKernel> = Vec::with_capacity(n_tracks);
    for i_track in 0..n_tracks {
        let cov: ArrayView2<f64> = covs.slice(s![i_track, .., ..]);
        let (ip_block, cov_block): (ArrayView1<f64>, ArrayView2<f64>) = leading_block(ips.row(i_track), cov, n_dim);
        kernels.push(GaussianKernel::new(ip_block, cov_block)?);
    }

    let timing_start: Instant = Instant::now();
    let rows: Vec<Array1<f64>> = (0..n_z)
        .into_par_iter() // Use Rayon to create a parallel iterator
        .map(|i_z: usize| {
            let mut row: Array1<f64> = Array1::zeros(n_t);
            let mut coords: Array1<f64> = Array1::zeros(3);
            coords[1] = z[i_z];
            for i_t in 0..n_t {
                coords[2] = t[i_t];
                let point: ArrayView1<f64> = coords.slice(s![..n_dim]);
                for kernel in kernels.iter() {
                    row[i_t] += kernel.evaluate(point);
                }
            }
            return row;
        })
        .collect();
    let duration: Duration = timing_start.elapsed();
    info!("accumulated {} tracks on a {} x {} grid in {:?}", n_tracks, n_z, n_t, duration);

    let mut density: Array2<f64> = Array2::zeros((n_z, n_t));
    for i_z in 0..n_z {
        density.slice_mut(s![i_z, ..]).assign(&rows[i_z]);
    }

    return Ok(TrackDensity { z, t, density });
}

/// Nearest grid indices of each truth vertex
///
/// # Arguments
/// * `vertices` - truth vertices (x, y, z, t), shape = (n_vertices, 4)
/// * `z`, `t` - grid axes
///
/// # Returns
/// * `indices[(i_vertex, 0)]` = z index, `indices[(i_vertex, 1)]` = t index
///
pub fn truth_vertex_indices(vertices: &Array2<f64>, z: &Array1<f64>, t: &Array1<f64>) -> Result<Array2<usize>, Error> {
    if vertices.ncols() < 4 {
        return Err(Error::ShapeMismatch {
            left: vertices.shape().to_vec(),
            right: vec![vertices.nrows(), 4],
        });
    }

    let n_vertices: usize = vertices.len_of(Axis(0));
    let mut indices: Array2<usize> = Array2::zeros((n_vertices, 2));
    for i_vertex in 0..n_vertices {
        let vertex_z: f64 = vertices[(i_vertex, 2)];
        let vertex_t: f64 = vertices[(i_vertex, 3)];
        indices[(i_vertex, 0)] = nearest_index(z, vertex_z)?;
        indices[(i_vertex, 1)] = nearest_index(t, vertex_t)?;
    }
    return Ok(indices);
}

fn nearest_index(axis: &Array1<f64>, value: f64) -> Result<usize, Error> {
    let distance: Array1<f64> = axis.mapv(|x: f64| (x - value).abs());
    return distance.argmin_skipnan().map_err(|_| Error::EmptyInput {
        what: format!("no grid point close to {}", value),
    });
}

#[test]
fn test_accumulator_equals_sum_of_tracks() {
    use crate::gaussian::gaussian_density_at;
    use approx::assert_relative_eq;

    let ips: Array2<f64> = Array2::from_shape_vec((3, 3), vec![0.01, -0.05, 10.0, -0.02, 0.0, -50.0, 0.0, 0.1, 300.0]).unwrap();
    let mut covs: Array3<f64> = Array3::zeros((3, 3, 3));
    for i_track in 0..3 {
        covs[(i_track, 0, 0)] = 1e-3;
        covs[(i_track, 1, 1)] = 4e-3 * (i_track + 1) as f64;
        covs[(i_track, 2, 2)] = 900.0;
        covs[(i_track, 1, 2)] = 0.5;
        covs[(i_track, 2, 1)] = 0.5;
    }

    for n_t in [1, 7] {
        let settings: TrackDensitySettings = TrackDensitySettings { n_t, ..Default::default() };
        let n_dim: usize = settings.n_dim();
        let track_density: TrackDensity = accumulate_track_density(&ips, &covs, &settings).unwrap();
        assert_eq!(track_density.density.dim(), (settings.n_z(), n_t));

        for i_z in [0, settings.n_z() / 2, settings.n_z() - 1] {
            for i_t in 0..n_t {
                let coords: Array1<f64> = Array1::from(vec![0.0, track_density.z[i_z], track_density.t[i_t]]);
                let mut expected: f64 = 0.0;
                for i_track in 0..3 {
                    let cov: ArrayView2<f64> = covs.slice(s![i_track, ..n_dim, ..n_dim]);
                    expected += gaussian_density_at(coords.slice(s![..n_dim]), ips.slice(s![i_track, ..n_dim]), cov).unwrap();
                }
                assert_relative_eq!(track_density.density[(i_z, i_t)], expected, max_relative = 1e-12);
            }
        }
    }
}

#[test]
fn test_time_independent_axes() {
    let settings: TrackDensitySettings = TrackDensitySettings::default();
    assert!(settings.is_time_independent());
    assert_eq!(settings.n_dim(), 2);
    assert_eq!(settings.z_axis().len(), 101);
    assert_eq!(settings.t_axis().to_vec(), vec![-200.0]);

    let with_time: TrackDensitySettings = TrackDensitySettings { n_t: 50, ..Default::default() };
    assert_eq!(with_time.n_dim(), 3);
    assert_eq!(with_time.z_axis().len(), 50);
    assert_eq!(with_time.t_axis()[49], 600.0);
}

#[test]
fn test_truth_vertex_indices() {
    let z: Array1<f64> = linspace(-0.2, 0.2, 5); // -0.2, -0.1, 0.0, 0.1, 0.2
    let t: Array1<f64> = linspace(-200.0, 600.0, 5); // step 200
    let vertices: Array2<f64> = Array2::from_shape_vec((2, 4), vec![0.0, 0.0, 0.09, 10.0, 0.0, 0.0, -5.0, 590.0]).unwrap();

    let indices: Array2<usize> = truth_vertex_indices(&vertices, &z, &t).unwrap();
    assert_eq!(indices.row(0).to_vec(), vec![3, 1]);
    assert_eq!(indices.row(1).to_vec(), vec![0, 4]);
}

#[test]
fn test_singular_track_covariance_fails() {
    let ips: Array2<f64> = Array2::zeros((1, 3));
    let covs: Array3<f64> = Array3::zeros((1, 3, 3));
    let result: Result<TrackDensity, Error> = accumulate_track_density(&ips, &covs, &TrackDensitySettings::default());
    assert!(matches!(result, Err(Error::Linalg(_))));
}
