use crate::compatibilities::{CompatibilityComparison, CompatibilitySettings, compare_compatibilities, load_compatibilities};
use crate::config::AnalysisConfig;
use crate::data_loader::{load_matrices, load_vectors};
use crate::errors::Error;
use crate::gaussian::{GaussianGrid, GaussianGridSettings, gaussian_grid, index_of_max_covariance};
use crate::jacobian_comparison::{JacobianComparison, compare_jacobians};
use crate::plotting::{
    ColourBar, HeatmapStyle, LinePlot, LineSeriesData, Ticks, plot_coloured_scatter, plot_heatmap, plot_heatmap_panels, plot_lines,
};
use crate::track_density::{
    BinnedDensity, TrackDensity, TrackDensitySettings, accumulate_track_density, fill_binned_density, renormalise_columns, truth_vertex_indices,
};
use crate::vertexing::{FittedVertex, TextTableReader, TruthVertexFinder, VertexFittingConfig, run_vertex_fitting};
use log::info;
use ndarray::{Array1, Array2, Array3, s};
use ndarray_stats::QuantileExt;
use std::fs;
use std::path::{Path, PathBuf};

/// The time-independent density is shown as a band this many rows high
const N_REPEATED_ROWS: usize = 10;

fn ensure_output_dir(config: &AnalysisConfig) -> Result<(), Error> {
    let output_dir: &Path = &config.paths.output_dir;
    fs::create_dir_all(output_dir).map_err(|source| Error::io(output_dir, source))?;
    return Ok(());
}

fn density_colour_bar() -> ColourBar {
    return ColourBar {
        end_labels: Some(("min".to_string(), "max".to_string())),
        label: Some("Track Density []".to_string()),
    };
}

/// Density of a single track on a grid around its impact parameters
///
/// Reads `cov.txt` and `ip.txt`, writes `gaussian.svg`.
pub fn gaussian_plot(config: &AnalysisConfig) -> Result<(), Error> {
    let settings: &GaussianGridSettings = &config.gaussian;
    let covs: Array3<f64> = load_matrices(&config.paths.input("cov.txt"), 3, 3)?;
    let ips: Array2<f64> = load_vectors(&config.paths.input("ip.txt"), 3)?;
    let n_tracks: usize = ips.nrows();
    if covs.shape()[0] != n_tracks {
        return Err(Error::ShapeMismatch {
            left: covs.shape().to_vec(),
            right: ips.shape().to_vec(),
        });
    }
    info!("loaded {} impact parameters and covariances", n_tracks);

    let i_max_var_t: usize = index_of_max_covariance(&covs, 2, 2)?;
    info!("largest var(t) at track {}, covariance:\n{}", i_max_var_t, covs.slice(s![i_max_var_t, .., ..]));
    info!("impact parameters: {}", ips.row(i_max_var_t));

    let i_plot: usize = settings.plot_index;
    if i_plot >= n_tracks {
        return Err(Error::EmptyInput {
            what: format!("track {} requested but only {} tracks were loaded", i_plot, n_tracks),
        });
    }
    let grid: GaussianGrid = gaussian_grid(ips.row(i_plot), covs.slice(s![i_plot, .., ..]), settings)?;

    ensure_output_dir(config)?;
    let style: HeatmapStyle = HeatmapStyle {
        x_label: Some("t bin".to_string()),
        y_label: Some("z bin".to_string()),
        ..Default::default()
    };
    plot_heatmap(&config.paths.output("gaussian.svg"), &grid.density, &style)?;
    return Ok(());
}

/// Image of the accumulated density, z along x and t along y
///
/// A time-independent density has a single t column, which is repeated
/// `N_REPEATED_ROWS` times so it shows as a band.
fn density_image(density: &Array2<f64>, time_independent: bool) -> Array2<f64> {
    if time_independent {
        let n_z: usize = density.nrows();
        return Array2::from_shape_fn((N_REPEATED_ROWS, n_z), |(_, i_z)| density[(i_z, 0)]);
    }
    return density.t().to_owned();
}

/// Rows the truth markers are shifted by
///
/// Note: the offset of 4 rows centres the markers on the repeated band of a single
/// time point. It is dropped for a time-resolved grid, where a fixed shift would
/// move every marker 4 time bins away from its vertex.
fn marker_row_offset(time_independent: bool) -> f64 {
    if time_independent {
        return 4.0;
    }
    return 0.0;
}

/// Truth vertex markers at (z index, t index + row offset)
///
/// The row offset comes from `marker_row_offset`, which diverges from a constant
/// shift of 4 rows when time is resolved.
fn truth_vertex_markers(indices: &Array2<usize>, row_offset: f64) -> Vec<(f64, f64)> {
    return indices
        .rows()
        .into_iter()
        .map(|row| (row[0] as f64, row[1] as f64 + row_offset))
        .collect();
}

/// Summed density of all tracks on a (z, t) grid, with truth vertices overlaid
///
/// Reads `trackParams.txt`, `trackCovs.txt` and `truthVertices.txt`. Writes
/// `trackDensity1D.svg` and `trackDensity2D.svg` for a single time point, otherwise
/// `trackDensityWithTime2D.svg`.
pub fn artificial_track_densities(config: &AnalysisConfig) -> Result<(), Error> {
    let settings: &TrackDensitySettings = &config.track_density;
    let ips: Array2<f64> = load_vectors(&config.paths.input("trackParams.txt"), 3)?;
    let covs: Array3<f64> = load_matrices(&config.paths.input("trackCovs.txt"), 3, 3)?;
    let vertices: Array2<f64> = load_vectors(&config.paths.input("truthVertices.txt"), 4)?;
    info!("truth vertex times: {}", vertices.column(3));
    info!("{} tracks", ips.nrows());

    let track_density: TrackDensity = accumulate_track_density(&ips, &covs, settings)?;
    let indices: Array2<usize> = truth_vertex_indices(&vertices, &track_density.z, &track_density.t)?;
    let z: &Array1<f64> = &track_density.z;
    let t: &Array1<f64> = &track_density.t;
    let n_z: usize = z.len();
    let n_t: usize = t.len();
    let time_independent: bool = settings.is_time_independent();
    if n_z == 0 || n_t == 0 {
        return Err(Error::EmptyInput {
            what: format!("track density grid of {} x {} points", n_z, n_t),
        });
    }

    ensure_output_dir(config)?;

    if time_independent {
        let max_density: f64 = *track_density.density.max_skipnan();
        let plot: LinePlot = LinePlot {
            series: vec![LineSeriesData::new("", z.to_vec(), track_density.density.column(0).to_vec())],
            markers: vertices.column(2).iter().map(|&vertex_z| (vertex_z, 0.0)).collect(),
            x_label: Some("z [mm]".to_string()),
            y_label: Some("Track Density []".to_string()),
            y_ticks: Some(Ticks::new(vec![0.0, max_density], vec!["0".to_string(), "max".to_string()])),
            ..Default::default()
        };
        plot_lines(&config.paths.output("trackDensity1D.svg"), &plot)?;
    }

    let row_offset: f64 = marker_row_offset(time_independent);
    let image: Array2<f64> = density_image(&track_density.density, time_independent);
    let (y_label, y_ticks): (Option<String>, Ticks) = if time_independent {
        (None, Ticks::hidden())
    } else {
        (
            Some("t [mm]".to_string()),
            Ticks::new(vec![0.0, (n_t - 1) as f64], vec![t[0].to_string(), t[n_t - 1].to_string()]),
        )
    };
    let style: HeatmapStyle = HeatmapStyle {
        x_label: Some("z [mm]".to_string()),
        y_label,
        x_ticks: Some(Ticks::new(vec![0.0, (n_z - 1) as f64], vec![z[0].to_string(), z[n_z - 1].to_string()])),
        y_ticks: Some(y_ticks),
        origin_lower: true,
        colour_bar: density_colour_bar(),
        markers: truth_vertex_markers(&indices, row_offset),
        ..Default::default()
    };
    let file_name: &str = if time_independent { "trackDensity2D.svg" } else { "trackDensityWithTime2D.svg" };
    plot_heatmap(&config.paths.output(file_name), &image, &style)?;
    return Ok(());
}

/// Binned densities written by the vertex finder, as a scatter over normalised (z, t)
///
/// Reads `densities1D.txt`, writes `densities1D.svg`.
pub fn track_densities(config: &AnalysisConfig) -> Result<(), Error> {
    let mut data: Array2<f64> = load_vectors(&config.paths.input("densities1D.txt"), 3)?;
    info!("loaded binned densities, shape {:?}", data.shape());

    let binned: BinnedDensity = fill_binned_density(&data, &config.binned_density)?;
    info!(
        "z bins {}..{}, t bins {}..{}, {} of {} cells filled",
        binned.min_z_bin,
        binned.max_z_bin,
        binned.min_t_bin,
        binned.max_t_bin,
        binned.n_filled,
        binned.density.len()
    );

    renormalise_columns(&mut data, &[0, 1])?;

    ensure_output_dir(config)?;
    plot_coloured_scatter(
        &config.paths.output("densities1D.svg"),
        &data.column(0).to_vec(),
        &data.column(1).to_vec(),
        &data.column(2).to_vec(),
        &ColourBar::default(),
    )?;
    return Ok(());
}

/// Track-vertex compatibilities with and without time information
///
/// Reads `compatibilitiesWithTime.txt` and `compatibilities.txt`, writes a heatmap of
/// each and `compatibilityComparison.svg` for the configured vertex.
pub fn compatibilities(config: &AnalysisConfig) -> Result<(), Error> {
    let settings: &CompatibilitySettings = &config.compatibilities;
    let n_tracks: usize = settings.n_tracks();
    // Fail before any plot is written when the vertex has no known true tracks
    settings.true_track_indices()?;
    ensure_output_dir(config)?;

    let with_time: Array2<f64> = load_compatibilities(&config.paths.input("compatibilitiesWithTime.txt"), n_tracks)?;
    plot_heatmap(&config.paths.output("compatibilitiesWithTime.svg"), &with_time, &HeatmapStyle::default())?;

    let without_time: Array2<f64> = load_compatibilities(&config.paths.input("compatibilities.txt"), n_tracks)?;
    plot_heatmap(&config.paths.output("compatibilities.svg"), &without_time, &HeatmapStyle::default())?;

    let comparison: CompatibilityComparison = compare_compatibilities(&with_time, &without_time, settings)?;
    info!("vertex {}: true tracks {:?}", settings.vertex_index, comparison.correct_track_indices);

    let track_indices: Vec<f64> = (0..n_tracks).map(|i_track| i_track as f64).collect();
    let plot: LinePlot = LinePlot {
        series: vec![
            LineSeriesData::new("with time", track_indices.clone(), comparison.with_time.to_vec()),
            LineSeriesData::new("without time", track_indices, comparison.without_time.to_vec()),
        ],
        vertical_lines: comparison.correct_track_indices.iter().map(|&i_track| i_track as f64).collect(),
        x_ticks: Some(Ticks::integers(n_tracks, 0)),
        ..Default::default()
    };
    plot_lines(&config.paths.output("compatibilityComparison.svg"), &plot)?;
    return Ok(());
}

/// Relative difference between analytical and numerical Jacobians
///
/// Reads `A_analytical.txt` and `A_numerical.txt`, writes `jacobian_comparison.svg`
/// with the mean (a) and standard deviation (b) over the samples.
pub fn compare_jacobians_plot(config: &AnalysisConfig) -> Result<(), Error> {
    let analytical: Array3<f64> = load_matrices(&config.paths.input("A_analytical.txt"), 6, 4)?;
    let numerical: Array3<f64> = load_matrices(&config.paths.input("A_numerical.txt"), 6, 4)?;
    info!("comparing {} Jacobians", analytical.shape()[0]);

    let comparison: JacobianComparison = compare_jacobians(&analytical, &numerical, config.jacobian.threshold)?;
    info!("largest mean or spread of the relative difference: {:.3e}", comparison.colour_max);

    ensure_output_dir(config)?;
    let (n_rows, n_cols): (usize, usize) = comparison.mean.dim();
    let style: HeatmapStyle = HeatmapStyle {
        x_ticks: Some(Ticks::integers(n_cols, 1)),
        y_ticks: Some(Ticks::integers(n_rows, 1)),
        vmin: Some(0.0),
        vmax: Some(comparison.colour_max),
        size: (1000, 600),
        ..Default::default()
    };
    plot_heatmap_panels(
        &config.paths.output("jacobian_comparison.svg"),
        &[("a)", &comparison.mean), ("b)", &comparison.std)],
        &style,
    )?;
    return Ok(());
}

/// Truth-seeded vertex fitting over the configured particle and track tables
pub fn vertex_fitting(config: &AnalysisConfig) -> Result<Vec<FittedVertex>, Error> {
    let vertex_config: &VertexFittingConfig = &config.vertex_fitting;
    let particles_path: PathBuf = config.paths.input(&vertex_config.particles);
    let tracks_path: PathBuf = config.paths.input(&vertex_config.tracks);

    if vertex_config.write_output && particles_path.exists() && tracks_path.exists() {
        ensure_output_dir(config)?;
    }
    let vertices: Vec<FittedVertex> = run_vertex_fitting(
        vertex_config,
        &config.paths.output_dir,
        &TextTableReader::new(&particles_path),
        &TextTableReader::new(&tracks_path),
        &TruthVertexFinder,
    )?;
    return Ok(vertices);
}

/// Every plotting analysis in turn; stops at the first failure
pub fn run_all(config: &AnalysisConfig) -> Result<(), Error> {
    gaussian_plot(config)?;
    artificial_track_densities(config)?;
    track_densities(config)?;
    compatibilities(config)?;
    compare_jacobians_plot(config)?;
    return Ok(());
}

#[test]
fn test_density_image_layout() {
    let density: Array2<f64> = Array2::from_shape_vec((3, 1), vec![1.0, 2.0, 3.0]).unwrap();
    let band: Array2<f64> = density_image(&density, true);
    assert_eq!(band.dim(), (N_REPEATED_ROWS, 3));
    assert!(band.rows().into_iter().all(|row| row.to_vec() == vec![1.0, 2.0, 3.0]));

    let with_time: Array2<f64> = Array2::from_shape_vec((2, 3), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    let image: Array2<f64> = density_image(&with_time, false);
    assert_eq!(image.dim(), (3, 2));
    assert_eq!(image[(2, 1)], 6.0);
}

#[test]
fn test_truth_vertex_markers_offset() {
    let indices: Array2<usize> = Array2::from_shape_vec((2, 2), vec![10, 0, 55, 0]).unwrap();
    assert_eq!(truth_vertex_markers(&indices, 4.0), vec![(10.0, 4.0), (55.0, 4.0)]);
    assert_eq!(truth_vertex_markers(&indices, 0.0), vec![(10.0, 0.0), (55.0, 0.0)]);

    // Only the repeated single time point band is shifted
    assert_eq!(marker_row_offset(true), 4.0);
    assert_eq!(marker_row_offset(false), 0.0);
}

#[test]
fn test_missing_tables_fail_before_plotting() {
    let dir = tempfile::tempdir().unwrap();
    let mut config: AnalysisConfig = AnalysisConfig::default();
    config.override_paths(Some(dir.path().join("missing")), Some(dir.path().join("out")));

    assert!(matches!(gaussian_plot(&config), Err(Error::Io { .. })));
    assert!(matches!(compare_jacobians_plot(&config), Err(Error::Io { .. })));
    assert!(matches!(vertex_fitting(&config), Err(Error::MissingInput { .. })));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_gaussian_plot_index_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("cov.txt"), "1 0 0 0 1 0 0 0 2\n1 0 0 0 1 0 0 0 5\n").unwrap();
    fs::write(dir.path().join("ip.txt"), "0 0 0\n0 1 2\n").unwrap();

    let mut config: AnalysisConfig = AnalysisConfig::default();
    config.override_paths(Some(dir.path().to_path_buf()), Some(dir.path().join("out")));
    assert!(matches!(gaussian_plot(&config), Err(Error::EmptyInput { .. })));
}

#[test]
fn test_compatibilities_unknown_vertex_fails_before_plotting() {
    let dir = tempfile::tempdir().unwrap();
    let mut config: AnalysisConfig = AnalysisConfig::default();
    config.override_paths(Some(dir.path().to_path_buf()), Some(dir.path().join("out")));
    config.compatibilities.vertex_index = 4;

    assert!(matches!(compatibilities(&config), Err(Error::UnknownTrueTracks { vertex_index: 4 })));
    assert!(!dir.path().join("out").exists());
}
