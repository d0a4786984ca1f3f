// Load modules
mod accumulated_density;
mod binned_density;

// Expose functions to public
pub use accumulated_density::{TrackDensity, TrackDensitySettings, accumulate_track_density, linspace, truth_vertex_indices};
pub use binned_density::{BinnedDensity, BinnedDensityWindow, fill_binned_density, renormalise_columns};
