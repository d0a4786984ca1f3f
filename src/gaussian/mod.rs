// Load modules
mod gaussian_density;
mod gaussian_grid;

// Expose functions to public
pub use gaussian_density::{GaussianKernel, gaussian_density, gaussian_density_at, index_of_max_covariance, leading_block, normalised_gaussian_density};
pub use gaussian_grid::{GaussianGrid, GaussianGridSettings, gaussian_grid};
