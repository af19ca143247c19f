//! Plotters SVG renderer with the house chart layout.
//!
//! Layout conventions (matching the desktop charting tool the charts replicate):
//! - title left-aligned above the plot
//! - y ticks and the y label on the right edge, label unrotated at the top
//! - horizontal gridlines only
//! - legend in a fixed corner, only when more than one line is drawn
//!
//! Absent values are never interpolated here; a gap splits the line into
//! separately drawn segments.

use chrono::{Datelike, Months, NaiveDate};
use plotters::prelude::*;

use crate::chart::{ChartSpec, LineSpec};
use crate::domain::Table;
use crate::error::AppError;

const MARGIN: i32 = 20;
const TITLE_HEIGHT: u32 = 50;
const LABEL_HEADROOM: i32 = 36;
const RIGHT_LABEL_AREA: u32 = 80;
const BOTTOM_LABEL_AREA: u32 = 40;
const FONT: &str = "sans-serif";
const MAX_X_TICKS: usize = 10;
const TICK_STEPS_MONTHS: [u32; 6] = [1, 2, 3, 6, 12, 24];
// Calendar year shown when a table has no rows and the chart has no window.
const EMPTY_CHART_YEAR: i32 = 2000;

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
}

impl Default for RenderOptions {
    /// A 15x10 inch figure at 100 dpi.
    fn default() -> Self {
        Self {
            width: 1500,
            height: 1000,
        }
    }
}

/// A line ready to draw: style plus gap-free `(day number, value)` runs.
struct PreparedLine<'a> {
    spec: &'a LineSpec,
    segments: Vec<Vec<(f64, f64)>>,
}

/// Render `table` per `spec` and return the SVG document.
pub fn render_svg(table: &Table, spec: &ChartSpec, options: &RenderOptions) -> Result<String, AppError> {
    if options.width < 200 || options.height < 150 {
        return Err(AppError::usage(format!(
            "Chart size {}x{} is too small.",
            options.width, options.height
        )));
    }

    let xs: Vec<f64> = table.dates().iter().map(|&d| day_number(d)).collect();
    let lines = spec
        .lines
        .iter()
        .map(|line| {
            let values = table.values(&line.column).map_err(|_| {
                AppError::usage(format!("Chart '{}' plots unknown column '{}'.", spec.key, line.column))
            })?;
            Ok(PreparedLine {
                spec: line,
                segments: segments(&xs, values),
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    let x_bounds = x_bounds(&xs, spec.after_year);
    let y_bounds = y_bounds(&lines);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height)).into_drawing_area();
        draw(&root, spec, &lines, x_bounds, y_bounds)
            .map_err(|e| AppError::render(format!("Failed to draw chart '{}': {e}", spec.key)))?;
    }
    Ok(svg)
}

fn draw(
    root: &DrawingArea<SVGBackend<'_>, plotters::coord::Shift>,
    spec: &ChartSpec,
    lines: &[PreparedLine<'_>],
    x_bounds: (f64, f64),
    y_bounds: (f64, f64),
) -> Result<(), Box<dyn std::error::Error>> {
    root.fill(&WHITE)?;

    let (title_area, body) = root.split_vertically(TITLE_HEIGHT);
    title_area.draw(&Text::new(
        spec.title.clone(),
        (MARGIN, MARGIN),
        (FONT, 24).into_font().color(&BLACK),
    ))?;

    let (x0, x1) = x_bounds;
    let (y0, y1) = y_bounds;
    let ticks = date_ticks(x0, x1);
    let monthly = ticks.monthly;
    let fmt_x = move |v: &f64| format_date_tick(*v, monthly);

    let mut chart = ChartBuilder::on(&body)
        .margin_top(LABEL_HEADROOM)
        .margin_left(MARGIN)
        .margin_right(MARGIN)
        .margin_bottom(MARGIN)
        .set_label_area_size(LabelAreaPosition::Right, RIGHT_LABEL_AREA)
        .set_label_area_size(LabelAreaPosition::Bottom, BOTTOM_LABEL_AREA)
        .build_cartesian_2d((x0..x1).with_key_points(ticks.points), y0..y1)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_labels(8)
        .x_label_formatter(&fmt_x)
        .y_label_formatter(&|v| format_value_tick(*v))
        .label_style((FONT, 14).into_font().color(&BLACK))
        .axis_style(&BLACK)
        .bold_line_style(&RGBColor(210, 210, 210))
        .light_line_style(&WHITE)
        .draw()?;

    let with_legend = lines.len() > 1;
    for line in lines {
        let style = line.spec.color.rgb().stroke_width(2);
        if with_legend {
            // Registered on an empty series so all-gap lines still get an entry.
            chart
                .draw_series(LineSeries::new(std::iter::empty::<(f64, f64)>(), style))?
                .label(line.spec.legend_text())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 24, y)], style));
        }
        for segment in &line.segments {
            chart.draw_series(LineSeries::new(segment.iter().copied(), style))?;
        }
    }

    if with_legend {
        chart
            .configure_series_labels()
            .position(spec.legend.series_label_position())
            .label_font((FONT, 14).into_font())
            .background_style(&WHITE)
            .border_style(&RGBColor(180, 180, 180))
            .draw()?;
    }

    // The y label sits above the right axis, reading left to right.
    let (x_px, y_px) = chart.plotting_area().get_pixel_range();
    root.draw(&Text::new(
        spec.y_label.clone(),
        (x_px.end + 6, y_px.start - LABEL_HEADROOM + 8),
        (FONT, 16).into_font().color(&BLACK),
    ))?;

    root.present()?;
    Ok(())
}

/// Split a column into runs of consecutive present values.
fn segments(xs: &[f64], values: &[Option<f64>]) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (&x, v) in xs.iter().zip(values) {
        match v {
            Some(y) if y.is_finite() => current.push((x, *y)),
            _ => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn day_number(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

/// Data span; an empty table shows the first year after the chart's window.
fn x_bounds(xs: &[f64], after_year: Option<i32>) -> (f64, f64) {
    match (xs.first(), xs.last()) {
        (Some(&a), Some(&b)) if b > a => (a, b),
        (Some(&a), _) => (a - 15.0, a + 15.0),
        _ => {
            let year = after_year.map_or(EMPTY_CHART_YEAR, |y| y + 1);
            match (NaiveDate::from_ymd_opt(year, 1, 1), NaiveDate::from_ymd_opt(year, 12, 31)) {
                (Some(first), Some(last)) => (day_number(first), day_number(last)),
                _ => (0.0, 365.0),
            }
        }
    }
}

/// X tick positions on calendar boundaries.
struct DateTicks {
    points: Vec<f64>,
    /// Ticks fall on months rather than whole years.
    monthly: bool,
}

/// Pick the finest month/year step that keeps at most `MAX_X_TICKS` ticks
/// inside `[x0, x1]`.
fn date_ticks(x0: f64, x1: f64) -> DateTicks {
    let (Some(start), Some(end)) = (date_of(x0.ceil()), date_of(x1.floor())) else {
        return DateTicks {
            points: Vec::new(),
            monthly: false,
        };
    };

    let years = (end.year() - start.year()).max(0) as u32 + 1;
    let wide_step = years.div_ceil(MAX_X_TICKS as u32) * 12;
    for step in TICK_STEPS_MONTHS.into_iter().chain(std::iter::once(wide_step)) {
        let boundaries = month_boundaries(start, end, step);
        if boundaries.len() <= MAX_X_TICKS {
            if boundaries.is_empty() {
                break;
            }
            return DateTicks {
                points: boundaries.into_iter().map(day_number).collect(),
                monthly: step < 12,
            };
        }
    }
    DateTicks {
        points: vec![day_number(start)],
        monthly: true,
    }
}

/// First days of months in `[start, end]` whose month index is a multiple of
/// `step` (so a step of 12 gives every January).
fn month_boundaries(start: NaiveDate, end: NaiveDate, step: u32) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    let Some(mut month) = start.with_day(1) else {
        return out;
    };
    if month < start {
        match month.checked_add_months(Months::new(1)) {
            Some(next) => month = next,
            None => return out,
        }
    }
    while month <= end {
        let index = month.year() * 12 + month.month0() as i32;
        if index.rem_euclid(step as i32) == 0 {
            out.push(month);
        }
        match month.checked_add_months(Months::new(1)) {
            Some(next) => month = next,
            None => break,
        }
    }
    out
}

fn date_of(v: f64) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(v as i32)
}

fn y_bounds(lines: &[PreparedLine<'_>]) -> (f64, f64) {
    let mut values = lines
        .iter()
        .flat_map(|l| l.segments.iter().flatten().map(|&(_, y)| y))
        .peekable();
    if values.peek().is_none() {
        return (0.0, 1.0);
    }
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| (lo.min(y), hi.max(y)));
    pad_range(lo, hi, 0.05)
}

fn pad_range(lo: f64, hi: f64, frac: f64) -> (f64, f64) {
    let span = hi - lo;
    if span.abs() < 1e-12 {
        let pad = if lo.abs() > 1e-12 { lo.abs() * frac } else { 1.0 };
        return (lo - pad, hi + pad);
    }
    (lo - span * frac, hi + span * frac)
}

fn format_date_tick(v: f64, with_month: bool) -> String {
    match date_of(v.round()) {
        Some(d) if with_month => d.format("%b %Y").to_string(),
        Some(d) => d.year().to_string(),
        None => String::new(),
    }
}

fn format_value_tick(v: f64) -> String {
    if v.abs() >= 100.0 {
        format!("{v:.0}")
    } else if v.abs() >= 10.0 {
        format!("{v:.1}")
    } else {
        format!("{v:.2}")
    }
}
