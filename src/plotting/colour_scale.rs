use super::FONT;
use plotters::coord::Shift;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters::style::FontTransform;
use plotters::style::colors::colormaps::{ColorMap, ViridisRGB};

/// Tick marks at chosen data coordinates
///
/// An empty set hides the axis labels altogether.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ticks {
    pub positions: Vec<f64>,
    pub labels: Vec<String>,
}

impl Ticks {
    pub fn new(positions: Vec<f64>, labels: Vec<String>) -> Self {
        return Ticks { positions, labels };
    }

    pub fn hidden() -> Self {
        return Ticks::default();
    }

    /// Ticks at `0..n` labelled `first_label..first_label + n`
    pub fn integers(n: usize, first_label: usize) -> Self {
        let positions: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let labels: Vec<String> = (0..n).map(|i| (i + first_label).to_string()).collect();
        return Ticks { positions, labels };
    }

    pub fn pairs(&self) -> impl Iterator<Item = (f64, &str)> {
        return self.positions.iter().cloned().zip(self.labels.iter().map(|label| label.as_str()));
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColourBar {
    /// Replace the numeric scale with a label at each end, e.g. ("min", "max")
    pub end_labels: Option<(String, String)>,
    pub label: Option<String>,
}

/// Smallest and largest finite value; `None` if there are none
pub fn finite_range<'a>(values: impl IntoIterator<Item = &'a f64>) -> Option<(f64, f64)> {
    let mut range: Option<(f64, f64)> = None;
    for &value in values {
        if !value.is_finite() {
            continue;
        }
        range = match range {
            None => Some((value, value)),
            Some((min, max)) => Some((min.min(value), max.max(value))),
        };
    }
    return range;
}

/// Axis range with a little padding, never empty
pub(crate) fn padded_range(range: Option<(f64, f64)>, fraction: f64) -> (f64, f64) {
    let (min, max): (f64, f64) = range.unwrap_or((0.0, 1.0));
    let span: f64 = max - min;
    if span <= 0.0 {
        return (min - 0.5, max + 0.5);
    }
    return (min - fraction * span, max + fraction * span);
}

/// Viridis colour for `value` on the scale [vmin, vmax]; NaN is not drawn
pub(crate) fn colour_for(value: f64, vmin: f64, vmax: f64) -> Option<RGBColor> {
    if value.is_nan() {
        return None;
    }
    let span: f64 = vmax - vmin;
    let norm: f64 = if span > 0.0 { ((value - vmin) / span).clamp(0.0, 1.0) } else { 0.5 };
    return Some(ViridisRGB.get_color(norm));
}

/// Vertical gradient with labels, drawn into its own area right of the plot
pub(crate) fn draw_colour_bar<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    vmin: f64,
    vmax: f64,
    colour_bar: &ColourBar,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let (bar_width_px, bar_height_px): (u32, u32) = area.dim_in_pixel();
    let bar_x_start: i32 = (bar_width_px as i32).saturating_sub(90);
    let top_margin: i32 = 30;
    let bottom_margin: i32 = 60;
    let usable_height: i32 = (bar_height_px as i32).saturating_sub(top_margin + bottom_margin);
    if usable_height <= 1 {
        return Ok(());
    }

    for i in 0..usable_height {
        let frac: f64 = 1.0 - (i as f64 / (usable_height - 1) as f64);
        let colour: RGBColor = ViridisRGB.get_color(frac);
        area.draw(&Rectangle::new([(bar_x_start, top_margin + i), (bar_x_start + 20, top_margin + i + 1)], colour.filled()))?;
    }

    let text_style: TextStyle = TextStyle::from((FONT, 16).into_font()).color(&BLACK);
    match &colour_bar.end_labels {
        Some((low, high)) => {
            area.draw_text(high, &text_style, (bar_x_start + 25, top_margin - 6))?;
            area.draw_text(low, &text_style, (bar_x_start + 25, top_margin + usable_height - 10))?;
        }
        None => {
            let n_labels: i32 = 5;
            for i_label in 0..n_labels {
                let frac: f64 = i_label as f64 / (n_labels - 1) as f64;
                let value: f64 = vmin + (vmax - vmin) * (1.0 - frac);
                let y_pos: i32 = top_margin + (frac * (usable_height - 1) as f64) as i32;
                area.draw_text(&format!("{:.2e}", value), &text_style, (bar_x_start + 25, y_pos - 8))?;
            }
        }
    }

    if let Some(label) = &colour_bar.label {
        area.draw_text(
            label,
            &TextStyle::from((FONT, 18).into_font()).color(&BLACK).transform(FontTransform::Rotate270),
            (bar_x_start - 20, top_margin + usable_height / 2 + 40),
        )?;
    }

    return Ok(());
}

type Chart<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Write tick labels under the x axis at data coordinates, level with `y_axis`
pub(crate) fn draw_x_ticks<'p, DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    chart: &Chart<'_, DB>,
    ticks: impl Iterator<Item = (f64, &'p str)>,
    y_axis: f64,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let text_style: TextStyle = TextStyle::from((FONT, 16).into_font()).color(&BLACK);
    let (base_x, base_y): (i32, i32) = area.get_base_pixel();
    for (position, label) in ticks {
        let (px, py): (i32, i32) = chart.backend_coord(&(position, y_axis));
        area.draw_text(label, &text_style, (px - base_x - 4 * label.len() as i32, py - base_y + 8))?;
    }
    return Ok(());
}

/// Write tick labels left of the y axis at data coordinates, level with `x_axis`
pub(crate) fn draw_y_ticks<'p, DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    chart: &Chart<'_, DB>,
    ticks: impl Iterator<Item = (f64, &'p str)>,
    x_axis: f64,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let text_style: TextStyle = TextStyle::from((FONT, 16).into_font()).color(&BLACK);
    let (base_x, base_y): (i32, i32) = area.get_base_pixel();
    for (position, label) in ticks {
        let (px, py): (i32, i32) = chart.backend_coord(&(x_axis, position));
        area.draw_text(label, &text_style, (px - base_x - 10 - 9 * label.len() as i32, py - base_y - 8))?;
    }
    return Ok(());
}

#[test]
fn test_finite_range_and_padding() {
    let values: Vec<f64> = vec![f64::NAN, 3.0, -1.0, f64::INFINITY, 2.0];
    assert_eq!(finite_range(values.iter()), Some((-1.0, 3.0)));
    assert_eq!(finite_range([f64::NAN].iter()), None);

    assert_eq!(padded_range(Some((0.0, 10.0)), 0.1), (-1.0, 11.0));
    assert_eq!(padded_range(Some((2.0, 2.0)), 0.1), (1.5, 2.5));
    assert_eq!(padded_range(None, 0.1), (-0.1, 1.1));
}

#[test]
fn test_colour_for() {
    assert!(colour_for(f64::NAN, 0.0, 1.0).is_none());

    // Out of range values are clamped to the ends of the colour map
    assert_eq!(colour_for(-5.0, 0.0, 1.0), colour_for(0.0, 0.0, 1.0));
    assert_eq!(colour_for(5.0, 0.0, 1.0), colour_for(1.0, 0.0, 1.0));
    assert_ne!(colour_for(0.0, 0.0, 1.0), colour_for(1.0, 0.0, 1.0));
}

#[test]
fn test_integer_ticks() {
    let ticks: Ticks = Ticks::integers(4, 1);
    let pairs: Vec<(f64, &str)> = ticks.pairs().collect();
    assert_eq!(pairs, vec![(0.0, "1"), (1.0, "2"), (2.0, "3"), (3.0, "4")]);
    assert!(Ticks::hidden().positions.is_empty());
}
