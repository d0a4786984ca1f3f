use crate::compatibilities::CompatibilitySettings;
use crate::errors::Error;
use crate::gaussian::GaussianGridSettings;
use crate::jacobian_comparison::SMALL_VALUE_THRESHOLD;
use crate::track_density::{BinnedDensityWindow, TrackDensitySettings};
use crate::vertexing::VertexFittingConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where input tables are read from and plots are written to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "PathsConfig::default_input_dir")]
    pub input_dir: PathBuf,
    #[serde(default = "PathsConfig::default_output_dir")]
    pub output_dir: PathBuf,
}

impl PathsConfig {
    fn default_input_dir() -> PathBuf {
        PathBuf::from(".")
    }
    fn default_output_dir() -> PathBuf {
        PathBuf::from("plots")
    }

    pub fn input(&self, file_name: impl AsRef<Path>) -> PathBuf {
        return self.input_dir.join(file_name);
    }

    pub fn output(&self, file_name: impl AsRef<Path>) -> PathBuf {
        return self.output_dir.join(file_name);
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: Self::default_input_dir(),
            output_dir: Self::default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JacobianSettings {
    /// Entries where both Jacobians are below this are not compared
    #[serde(default = "JacobianSettings::default_threshold")]
    pub threshold: f64,
}

impl JacobianSettings {
    fn default_threshold() -> f64 {
        SMALL_VALUE_THRESHOLD
    }
}

impl Default for JacobianSettings {
    fn default() -> Self {
        Self {
            threshold: Self::default_threshold(),
        }
    }
}

/// Every analysis parameter, read from a TOML file
///
/// All sections and fields are optional; an empty file gives the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub gaussian: GaussianGridSettings,
    #[serde(default)]
    pub track_density: TrackDensitySettings,
    #[serde(default)]
    pub binned_density: BinnedDensityWindow,
    #[serde(default)]
    pub compatibilities: CompatibilitySettings,
    #[serde(default)]
    pub jacobian: JacobianSettings,
    #[serde(default)]
    pub vertex_fitting: VertexFittingConfig,
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let contents: String = fs::read_to_string(path).map_err(|source| Error::io(path, source))?;
        return Self::from_toml(&contents).map_err(|message| Error::Config {
            path: path.to_path_buf(),
            message,
        });
    }

    pub fn from_toml(contents: &str) -> Result<Self, String> {
        return toml::from_str(contents).map_err(|e| e.to_string());
    }

    /// Replace the configured directories when given
    pub fn override_paths(&mut self, input_dir: Option<PathBuf>, output_dir: Option<PathBuf>) {
        if let Some(input_dir) = input_dir {
            self.paths.input_dir = input_dir;
        }
        if let Some(output_dir) = output_dir {
            self.paths.output_dir = output_dir;
        }
    }
}

#[test]
fn test_empty_config_gives_defaults() {
    let config: AnalysisConfig = AnalysisConfig::from_toml("").unwrap();
    assert_eq!(config, AnalysisConfig::default());
    assert_eq!(config.paths.output_dir, PathBuf::from("plots"));
    assert_eq!(config.gaussian.plot_index, 30);
    assert_eq!(config.track_density.n_t, 1);
    assert_eq!(config.compatibilities.true_track_indices().unwrap(), vec![0, 10, 17, 18]);
    assert_eq!(config.jacobian.threshold, 1e-4);
    assert_eq!(config.vertex_fitting.sequencer.events, 100);
    assert_eq!(config.vertex_fitting.sequencer.num_threads, -1);
    assert_eq!(config.vertex_fitting.particle_selection.abs_eta_max, 2.5);
}

#[test]
fn test_partial_config_keeps_other_defaults() {
    use crate::vertexing::VertexFinderKind;

    let contents: &str = r#"
[paths]
input_dir = "/data/run1"

[track_density]
n_t = 201

[vertex_fitting]
vertex_finder = "amvf"

[vertex_fitting.track_selection]
loc0_max = 2.0
"#;
    let config: AnalysisConfig = AnalysisConfig::from_toml(contents).unwrap();
    assert_eq!(config.paths.input_dir, PathBuf::from("/data/run1"));
    assert_eq!(config.paths.output_dir, PathBuf::from("plots"));
    assert_eq!(config.track_density.n_t, 201);
    assert_eq!(config.track_density.t_max, 600.0);
    assert_eq!(config.vertex_fitting.vertex_finder, VertexFinderKind::Amvf);
    assert_eq!(config.vertex_fitting.track_selection.loc0_max, 2.0);
    assert_eq!(config.vertex_fitting.track_selection.abs_eta_max, 100.0);

    let vertex_0: AnalysisConfig = AnalysisConfig::from_toml("[compatibilities]\nvertex_index = 0").unwrap();
    assert_eq!(vertex_0.compatibilities.true_track_indices().unwrap(), vec![1, 5, 12, 13]);
}

#[test]
fn test_load_config_file_and_overrides() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[paths]\noutput_dir = \"out\"").unwrap();
    let mut config: AnalysisConfig = AnalysisConfig::load(file.path()).unwrap();
    assert_eq!(config.paths.output("gaussian.svg"), PathBuf::from("out").join("gaussian.svg"));

    config.override_paths(Some(PathBuf::from("in")), None);
    assert_eq!(config.paths.input_dir, PathBuf::from("in"));
    assert_eq!(config.paths.output_dir, PathBuf::from("out"));

    let mut broken = tempfile::NamedTempFile::new().unwrap();
    writeln!(broken, "[vertex_fitting]\nvertex_finder = \"adaptive\"").unwrap();
    assert!(matches!(AnalysisConfig::load(broken.path()), Err(Error::Config { .. })));
    assert!(matches!(AnalysisConfig::load(Path::new("does/not/exist.toml")), Err(Error::Io { .. })));
}
