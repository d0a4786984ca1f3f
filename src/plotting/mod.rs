// Load modules
mod colour_scale;
mod heatmap;
mod line_plot;
mod scatter;

// Expose functions to public
pub use colour_scale::{ColourBar, Ticks, finite_range};
pub use heatmap::{HeatmapStyle, plot_heatmap, plot_heatmap_panels};
pub use line_plot::{LinePlot, LineSeriesData, plot_lines};
pub use scatter::plot_coloured_scatter;

use crate::errors::Error;
use std::path::Path;

pub(crate) const FONT: &str = "sans-serif";

/// Whether text can be laid out; drawing needs a system font
#[cfg(test)]
pub(crate) fn font_available() -> bool {
    use plotters::style::IntoFont;
    return (FONT, 12).into_font().box_size("0").is_ok();
}

/// Attach the output path to a drawing failure
pub(crate) fn plot_error<E: std::fmt::Display>(path: &Path, error: E) -> Error {
    return Error::Plot {
        path: path.to_path_buf(),
        message: error.to_string(),
    };
}
