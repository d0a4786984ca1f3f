use crate::binning;
use crate::errors::Error;
use crate::gaussian;
use crate::jacobian_comparison::{self, JacobianComparison, SMALL_VALUE_THRESHOLD};
use crate::track_density::{self, TrackDensity, TrackDensitySettings};
use ndarray::{Array1, Array2, Array3};
use numpy::IntoPyArray; // converting to python data types
use numpy::PyArrayMethods; // used in to convert python data into ndarray
use numpy::{PyArray1, PyArray2, PyArray3};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

impl From<Error> for PyErr {
    fn from(error: Error) -> Self {
        return PyValueError::new_err(error.to_string());
    }
}

/// A Python module implemented in Rust; bindings added here
#[pymodule]
fn acts_vis_rs(_py: Python, m: &Bound<'_, PyModule>) -> PyResult<()> {
    #[pyfn(m)]
    fn gaussian_density_py(diff: &Bound<'_, PyArray1<f64>>, cov: &Bound<'_, PyArray2<f64>>) -> PyResult<f64> {
        let diff_ndarray: Array1<f64> = Array1::from(unsafe { diff.as_array() }.to_vec());
        let cov_ndarray: Array2<f64> = unsafe { cov.as_array() }.to_owned();

        let density: f64 = gaussian::gaussian_density(diff_ndarray.view(), cov_ndarray.view())?;
        return Ok(density);
    }

    #[pyfn(m)]
    fn gaussian_grid_py(
        py: Python,
        ip: &Bound<'_, PyArray1<f64>>,
        cov: &Bound<'_, PyArray2<f64>>,
        z_bin_extent: f64,
        t_bin_extent: f64,
        n_z: usize,
        n_t: usize,
    ) -> PyResult<Py<PyArray2<f64>>> {
        let ip_ndarray: Array1<f64> = Array1::from(unsafe { ip.as_array() }.to_vec());
        let cov_ndarray: Array2<f64> = unsafe { cov.as_array() }.to_owned();
        let settings: gaussian::GaussianGridSettings = gaussian::GaussianGridSettings {
            z_bin_extent,
            t_bin_extent,
            n_z,
            n_t,
            ..Default::default()
        };

        let grid: gaussian::GaussianGrid = gaussian::gaussian_grid(ip_ndarray.view(), cov_ndarray.view(), &settings)?;
        return Ok(grid.density.into_pyarray(py).into());
    }

    #[pyfn(m)]
    #[pyo3(signature = (ips, covs, n_t=1, t_min=-200.0, t_max=600.0, z_min=-0.2, z_max=0.2))]
    fn accumulate_track_density_py(
        py: Python,
        ips: &Bound<'_, PyArray2<f64>>,
        covs: &Bound<'_, PyArray3<f64>>,
        n_t: usize,
        t_min: f64,
        t_max: f64,
        z_min: f64,
        z_max: f64,
    ) -> PyResult<(Py<PyArray1<f64>>, Py<PyArray1<f64>>, Py<PyArray2<f64>>)> {
        let ips_ndarray: Array2<f64> = unsafe { ips.as_array() }.to_owned();
        let covs_ndarray: Array3<f64> = unsafe { covs.as_array() }.to_owned();
        let settings: TrackDensitySettings = TrackDensitySettings {
            n_t,
            t_min,
            t_max,
            z_min,
            z_max,
            ..Default::default()
        };

        // Release the GIL while the grid is filled
        let track_density: TrackDensity = py.allow_threads(|| track_density::accumulate_track_density(&ips_ndarray, &covs_ndarray, &settings))?;

        return Ok((
            track_density.z.into_pyarray(py).into(),
            track_density.t.into_pyarray(py).into(),
            track_density.density.into_pyarray(py).into(),
        ));
    }

    #[pyfn(m)]
    fn bin_index_py(value: f64, bin_width: f64) -> i64 {
        return binning::bin_index(value, bin_width);
    }

    #[pyfn(m)]
    fn bin_count_py(min: f64, max: f64, bin_width: f64) -> PyResult<usize> {
        return Ok(binning::bin_count(min, max, bin_width)?);
    }

    #[pyfn(m)]
    fn value_from_bin_py(reference: f64, bin_width: f64, bin: usize, n_bins: usize) -> f64 {
        return binning::value_from_bin(reference, bin_width, bin, n_bins);
    }

    #[pyfn(m)]
    #[pyo3(signature = (analytical, numerical, threshold=SMALL_VALUE_THRESHOLD))]
    fn compare_jacobians_py(
        py: Python,
        analytical: &Bound<'_, PyArray3<f64>>,
        numerical: &Bound<'_, PyArray3<f64>>,
        threshold: f64,
    ) -> PyResult<(Py<PyArray2<f64>>, Py<PyArray2<f64>>, f64)> {
        let analytical_ndarray: Array3<f64> = unsafe { analytical.as_array() }.to_owned();
        let numerical_ndarray: Array3<f64> = unsafe { numerical.as_array() }.to_owned();

        let comparison: JacobianComparison = jacobian_comparison::compare_jacobians(&analytical_ndarray, &numerical_ndarray, threshold)?;

        return Ok((comparison.mean.into_pyarray(py).into(), comparison.std.into_pyarray(py).into(), comparison.colour_max));
    }

    Ok(())
}
