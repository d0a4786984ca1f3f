use super::colour_scale::{draw_x_ticks, draw_y_ticks, padded_range};
use super::{FONT, Ticks, finite_range, plot_error};
use crate::errors::Error;
use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

const SERIES_COLOURS: [RGBColor; 4] = [BLUE, GREEN, MAGENTA, BLACK];

/// One labelled curve
#[derive(Clone, Debug, Default)]
pub struct LineSeriesData {
    /// Shown in the legend when not empty
    pub label: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl LineSeriesData {
    pub fn new(label: &str, x: Vec<f64>, y: Vec<f64>) -> Self {
        return LineSeriesData {
            label: label.to_string(),
            x,
            y,
        };
    }
}

#[derive(Clone, Debug)]
pub struct LinePlot {
    pub series: Vec<LineSeriesData>,
    /// Red points at (x, y)
    pub markers: Vec<(f64, f64)>,
    /// Dashed red vertical lines at these x positions
    pub vertical_lines: Vec<f64>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub x_ticks: Option<Ticks>,
    pub y_ticks: Option<Ticks>,
    pub size: (u32, u32),
}

impl Default for LinePlot {
    fn default() -> Self {
        Self {
            series: Vec::new(),
            markers: Vec::new(),
            vertical_lines: Vec::new(),
            x_label: None,
            y_label: None,
            x_ticks: None,
            y_ticks: None,
            size: (900, 600),
        }
    }
}

impl LinePlot {
    fn x_range(&self) -> (f64, f64) {
        let xs = self.series.iter().flat_map(|series| series.x.iter());
        let marker_xs = self.markers.iter().map(|(x, _)| x);
        return padded_range(finite_range(xs.chain(marker_xs).chain(self.vertical_lines.iter())), 0.02);
    }

    fn y_range(&self) -> (f64, f64) {
        let ys = self.series.iter().flat_map(|series| series.y.iter());
        let marker_ys = self.markers.iter().map(|(_, y)| y);
        return padded_range(finite_range(ys.chain(marker_ys)), 0.05);
    }
}

/// Write one or more line series with optional markers and vertical guides
pub fn plot_lines(path: &Path, plot: &LinePlot) -> Result<(), Error> {
    for series in &plot.series {
        if series.x.len() != series.y.len() {
            return Err(Error::ShapeMismatch {
                left: vec![series.x.len()],
                right: vec![series.y.len()],
            });
        }
    }

    let root = SVGBackend::new(path, plot.size).into_drawing_area();
    root.fill(&WHITE).map_err(|e| plot_error(path, e))?;
    draw_lines(&root, plot).map_err(|e| plot_error(path, e))?;
    root.present().map_err(|e| plot_error(path, e))?;

    info!("wrote {}", path.display());
    return Ok(());
}

fn draw_lines<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, plot: &LinePlot) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let (x_min, x_max): (f64, f64) = plot.x_range();
    let (y_min, y_max): (f64, f64) = plot.y_range();

    let mut chart = ChartBuilder::on(area)
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    let blank = |_: &f64| String::new();
    let mut mesh = chart.configure_mesh();
    mesh.disable_mesh();
    if plot.x_ticks.is_some() {
        mesh.x_label_formatter(&blank);
    }
    if plot.y_ticks.is_some() {
        mesh.y_label_formatter(&blank);
    }
    if let Some(x_label) = &plot.x_label {
        mesh.x_desc(x_label.as_str());
    }
    if let Some(y_label) = &plot.y_label {
        mesh.y_desc(y_label.as_str());
    }
    mesh.label_style((FONT, 16)).draw()?;

    let mut has_legend: bool = false;
    for (i_series, series) in plot.series.iter().enumerate() {
        let colour: RGBColor = SERIES_COLOURS[i_series % SERIES_COLOURS.len()];
        let points = series.x.iter().cloned().zip(series.y.iter().cloned());
        let annotation = chart.draw_series(LineSeries::new(points, colour.stroke_width(2)))?;
        if !series.label.is_empty() {
            annotation
                .label(series.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], colour.stroke_width(2)));
            has_legend = true;
        }
    }

    chart.draw_series(plot.markers.iter().map(|&(x, y)| Circle::new((x, y), 5, RED.filled())))?;

    // Dashed lines as short segments
    let n_dashes: usize = 40;
    let dash_length: f64 = (y_max - y_min) / (2 * n_dashes) as f64;
    for &x in &plot.vertical_lines {
        chart.draw_series((0..n_dashes).map(|i_dash| {
            let y_start: f64 = y_min + 2.0 * i_dash as f64 * dash_length;
            return PathElement::new(vec![(x, y_start), (x, y_start + dash_length)], RED.stroke_width(1));
        }))?;
    }

    if let Some(x_ticks) = &plot.x_ticks {
        draw_x_ticks(area, &chart, x_ticks.pairs(), y_min)?;
    }
    if let Some(y_ticks) = &plot.y_ticks {
        draw_y_ticks(area, &chart, y_ticks.pairs(), x_min)?;
    }

    if has_legend {
        chart
            .configure_series_labels()
            .label_font((FONT, 16))
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .position(SeriesLabelPosition::UpperRight)
            .draw()?;
    }

    return Ok(());
}

#[test]
fn test_line_plot_ranges() {
    let plot: LinePlot = LinePlot {
        series: vec![LineSeriesData::new("with time", vec![0.0, 1.0, 2.0], vec![0.0, 0.5, 1.0])],
        markers: vec![(4.0, 0.0)],
        vertical_lines: vec![-1.0],
        ..Default::default()
    };
    let (x_min, x_max): (f64, f64) = plot.x_range();
    assert!(x_min < -1.0 && x_max > 4.0);
    let (y_min, y_max): (f64, f64) = plot.y_range();
    assert!(y_min < 0.0 && y_max > 1.0);
}

#[test]
fn test_plot_lines_rejects_ragged_series() {
    let plot: LinePlot = LinePlot {
        series: vec![LineSeriesData::new("", vec![0.0, 1.0], vec![0.0])],
        ..Default::default()
    };
    let path = std::path::PathBuf::from("never_written.svg");
    assert!(matches!(plot_lines(&path, &plot), Err(Error::ShapeMismatch { .. })));
    assert!(!path.exists());
}

#[test]
fn test_plot_lines_writes_svg() {
    if !super::font_available() {
        eprintln!("no font available, skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let plot: LinePlot = LinePlot {
        series: vec![
            LineSeriesData::new("with time", vec![0.0, 1.0, 2.0], vec![0.2, 1.0, 0.4]),
            LineSeriesData::new("without time", vec![0.0, 1.0, 2.0], vec![0.5, 0.6, 1.0]),
        ],
        markers: vec![(1.0, 0.0)],
        vertical_lines: vec![1.0],
        x_label: Some("track".to_string()),
        ..Default::default()
    };

    let path = dir.path().join("lines.svg");
    plot_lines(&path, &plot).unwrap();
    let contents: String = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("<svg"));
    assert!(contents.contains("without time"));
}
