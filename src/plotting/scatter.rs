use super::colour_scale::{colour_for, draw_colour_bar, padded_range};
use super::{ColourBar, FONT, finite_range, plot_error};
use crate::errors::Error;
use log::info;
use plotters::prelude::*;
use std::path::Path;

/// Scatter plot of (x, y) points coloured by `values`, with a colour bar
///
/// Points whose value is NaN are left out.
pub fn plot_coloured_scatter(path: &Path, xs: &[f64], ys: &[f64], values: &[f64], colour_bar: &ColourBar) -> Result<(), Error> {
    if xs.len() != ys.len() || xs.len() != values.len() {
        return Err(Error::ShapeMismatch {
            left: vec![xs.len(), ys.len()],
            right: vec![values.len()],
        });
    }

    let (vmin, vmax): (f64, f64) = finite_range(values.iter()).unwrap_or((0.0, 1.0));
    let (x_min, x_max): (f64, f64) = padded_range(finite_range(xs.iter()), 0.05);
    let (y_min, y_max): (f64, f64) = padded_range(finite_range(ys.iter()), 0.05);

    let size: (u32, u32) = (900, 700);
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(|e| plot_error(path, e))?;
    let (plot_area, colour_bar_area) = root.split_horizontally(size.0 - 130);

    let mut chart = ChartBuilder::on(&plot_area)
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(|e| plot_error(path, e))?;
    chart
        .configure_mesh()
        .disable_mesh()
        .label_style((FONT, 16))
        .draw()
        .map_err(|e| plot_error(path, e))?;

    let points: Vec<Circle<(f64, f64), i32>> = xs
        .iter()
        .zip(ys.iter())
        .zip(values.iter())
        .filter_map(|((&x, &y), &value)| colour_for(value, vmin, vmax).map(|colour| Circle::new((x, y), 4, colour.filled())))
        .collect();
    chart.draw_series(points).map_err(|e| plot_error(path, e))?;

    draw_colour_bar(&colour_bar_area, vmin, vmax, colour_bar).map_err(|e| plot_error(path, e))?;
    root.present().map_err(|e| plot_error(path, e))?;

    info!("wrote {}", path.display());
    return Ok(());
}

#[test]
fn test_scatter_rejects_mismatched_lengths() {
    let path = std::path::PathBuf::from("never_written_scatter.svg");
    let result: Result<(), Error> = plot_coloured_scatter(&path, &[0.0, 1.0], &[0.0, 1.0], &[1.0], &ColourBar::default());
    assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    assert!(!path.exists());
}

#[test]
fn test_plot_coloured_scatter_writes_svg() {
    if !super::font_available() {
        eprintln!("no font available, skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let colour_bar: ColourBar = ColourBar {
        label: Some("relative difference".to_string()),
        ..Default::default()
    };

    let path = dir.path().join("scatter.svg");
    plot_coloured_scatter(&path, &[0.0, 1.0, 2.0], &[1.0, 0.0, 2.0], &[0.1, f64::NAN, 0.9], &colour_bar).unwrap();
    let contents: String = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("<svg"));
    assert!(contents.contains("<circle"));
}
