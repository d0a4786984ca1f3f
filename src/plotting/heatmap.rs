use super::colour_scale::{colour_for, draw_colour_bar, draw_x_ticks, draw_y_ticks};
use super::{ColourBar, FONT, Ticks, finite_range, plot_error};
use crate::errors::Error;
use log::info;
use ndarray::Array2;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

const COLOUR_BAR_WIDTH: u32 = 130;

/// Appearance of an image plot of a 2D array
///
/// `data[(i_row, i_col)]` is drawn at x = `i_col`, y = `i_row`, with row 0 at the
/// top unless `origin_lower` is set.
#[derive(Clone, Debug)]
pub struct HeatmapStyle {
    pub title: Option<String>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    /// `None` keeps the automatic labels
    pub x_ticks: Option<Ticks>,
    pub y_ticks: Option<Ticks>,
    pub origin_lower: bool,
    /// Colour scale limits; the finite data range is used when unset
    pub vmin: Option<f64>,
    pub vmax: Option<f64>,
    pub colour_bar: ColourBar,
    /// Red markers at (column, row)
    pub markers: Vec<(f64, f64)>,
    pub size: (u32, u32),
}

impl Default for HeatmapStyle {
    fn default() -> Self {
        Self {
            title: None,
            x_label: None,
            y_label: None,
            x_ticks: None,
            y_ticks: None,
            origin_lower: false,
            vmin: None,
            vmax: None,
            colour_bar: ColourBar::default(),
            markers: Vec::new(),
            size: (900, 700),
        }
    }
}

impl HeatmapStyle {
    fn colour_limits(&self, data: &Array2<f64>) -> (f64, f64) {
        let (data_min, data_max): (f64, f64) = finite_range(data.iter()).unwrap_or((0.0, 1.0));
        return (self.vmin.unwrap_or(data_min), self.vmax.unwrap_or(data_max));
    }
}

/// Write a single heatmap with a colour bar
pub fn plot_heatmap(path: &Path, data: &Array2<f64>, style: &HeatmapStyle) -> Result<(), Error> {
    let (vmin, vmax): (f64, f64) = style.colour_limits(data);

    let root = SVGBackend::new(path, style.size).into_drawing_area();
    root.fill(&WHITE).map_err(|e| plot_error(path, e))?;
    let (plot_area, colour_bar_area) = root.split_horizontally(style.size.0.saturating_sub(COLOUR_BAR_WIDTH));

    draw_heatmap(&plot_area, data, style, vmin, vmax).map_err(|e| plot_error(path, e))?;
    draw_colour_bar(&colour_bar_area, vmin, vmax, &style.colour_bar).map_err(|e| plot_error(path, e))?;

    root.present().map_err(|e| plot_error(path, e))?;
    info!("wrote {}", path.display());
    return Ok(());
}

/// Several heatmaps side by side on one colour scale
///
/// Each panel is tagged with its label ("a)", "b)", ...) in the top-left corner.
pub fn plot_heatmap_panels(path: &Path, panels: &[(&str, &Array2<f64>)], style: &HeatmapStyle) -> Result<(), Error> {
    let (data_min, data_max): (f64, f64) = finite_range(panels.iter().flat_map(|(_, data)| data.iter())).unwrap_or((0.0, 1.0));
    let vmin: f64 = style.vmin.unwrap_or(data_min);
    let vmax: f64 = style.vmax.unwrap_or(data_max);

    let root = SVGBackend::new(path, style.size).into_drawing_area();
    root.fill(&WHITE).map_err(|e| plot_error(path, e))?;
    let (plot_area, colour_bar_area) = root.split_horizontally(style.size.0.saturating_sub(COLOUR_BAR_WIDTH));

    let panel_areas = plot_area.split_evenly((1, panels.len().max(1)));
    let label_style: TextStyle = TextStyle::from((FONT, 22).into_font()).color(&BLACK);
    for (panel_area, (label, data)) in panel_areas.iter().zip(panels.iter()) {
        draw_heatmap(panel_area, data, style, vmin, vmax).map_err(|e| plot_error(path, e))?;
        panel_area.draw_text(label, &label_style, (8, 8)).map_err(|e| plot_error(path, e))?;
    }
    draw_colour_bar(&colour_bar_area, vmin, vmax, &style.colour_bar).map_err(|e| plot_error(path, e))?;

    root.present().map_err(|e| plot_error(path, e))?;
    info!("wrote {}", path.display());
    return Ok(());
}

fn draw_heatmap<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    data: &Array2<f64>,
    style: &HeatmapStyle,
    vmin: f64,
    vmax: f64,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let (n_rows, n_cols): (usize, usize) = data.dim();
    let row_to_y = |row: f64| -> f64 {
        if style.origin_lower {
            return row;
        }
        return n_rows as f64 - 1.0 - row;
    };

    let mut builder = ChartBuilder::on(area);
    builder.margin(30).x_label_area_size(50).y_label_area_size(70);
    if let Some(title) = &style.title {
        builder.caption(title, (FONT, 24));
    }
    let mut chart = builder.build_cartesian_2d(-0.5..(n_cols as f64 - 0.5), -0.5..(n_rows as f64 - 0.5))?;

    // Custom ticks are drawn by hand below, so blank the automatic ones
    let blank = |_: &f64| String::new();
    let mut mesh = chart.configure_mesh();
    mesh.disable_mesh();
    if style.x_ticks.is_some() {
        mesh.x_label_formatter(&blank);
    }
    if style.y_ticks.is_some() {
        mesh.y_label_formatter(&blank);
    }
    if let Some(x_label) = &style.x_label {
        mesh.x_desc(x_label.as_str());
    }
    if let Some(y_label) = &style.y_label {
        mesh.y_desc(y_label.as_str());
    }
    mesh.draw()?;

    let mut cells: Vec<Rectangle<(f64, f64)>> = Vec::with_capacity(n_rows * n_cols);
    for i_row in 0..n_rows {
        let y: f64 = row_to_y(i_row as f64);
        for i_col in 0..n_cols {
            if let Some(colour) = colour_for(data[(i_row, i_col)], vmin, vmax) {
                let x: f64 = i_col as f64;
                cells.push(Rectangle::new([(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)], colour.filled()));
            }
        }
    }
    chart.draw_series(cells)?;

    chart.draw_series(style.markers.iter().map(|&(x, row)| Circle::new((x, row_to_y(row)), 4, RED.filled())))?;

    if let Some(x_ticks) = &style.x_ticks {
        draw_x_ticks(area, &chart, x_ticks.pairs(), -0.5)?;
    }
    if let Some(y_ticks) = &style.y_ticks {
        draw_y_ticks(area, &chart, y_ticks.pairs().map(|(row, label)| (row_to_y(row), label)), -0.5)?;
    }

    return Ok(());
}

#[test]
fn test_plot_heatmap_writes_svg() {
    if !super::font_available() {
        eprintln!("no font available, skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let data: Array2<f64> = Array2::from_shape_fn((10, 20), |(i_row, i_col)| (i_row * i_col) as f64);
    let style: HeatmapStyle = HeatmapStyle {
        title: Some("density".to_string()),
        x_ticks: Some(Ticks::integers(20, 0)),
        origin_lower: true,
        markers: vec![(5.0, 4.0)],
        ..Default::default()
    };

    let path = dir.path().join("heatmap.svg");
    plot_heatmap(&path, &data, &style).unwrap();
    let contents: String = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("<svg"));
    assert!(contents.contains("density"));

    let panels_path = dir.path().join("panels.svg");
    let other: Array2<f64> = data.mapv(|x: f64| -x);
    plot_heatmap_panels(&panels_path, &[("first", &data), ("second", &other)], &HeatmapStyle::default()).unwrap();
    let contents: String = std::fs::read_to_string(&panels_path).unwrap();
    assert!(contents.contains("first"));
    assert!(contents.contains("second"));
}
