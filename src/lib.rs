pub mod analyses;
pub mod binning;
pub mod compatibilities;
pub mod config;
pub mod data_loader;
pub mod errors;
pub mod gaussian;
pub mod jacobian_comparison;
pub mod plotting;
pub mod track_density;
pub mod vertexing;

#[cfg(feature = "python")]
mod python;

pub use config::AnalysisConfig;
pub use errors::Error;
