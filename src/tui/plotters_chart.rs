//! Plotters-powered multi-series line chart widget for Ratatui.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.
//! Axis tick labels are drawn by the caller as plain Ratatui text; the widget
//! only draws series.

use chrono::{Datelike, NaiveDate};
use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

use crate::dashboard::WideSeries;

/// High-contrast colors cycled across tickers.
pub const PALETTE: [(u8, u8, u8); 6] = [
    (0, 255, 255),
    (255, 200, 0),
    (0, 255, 0),
    (255, 80, 80),
    (200, 120, 255),
    (255, 255, 255),
];

pub fn series_color(index: usize) -> (u8, u8, u8) {
    PALETTE[index % PALETTE.len()]
}

/// Chart x coordinate of a date.
pub fn date_x(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce())
}

/// Inverse of [`date_x`], rounding to the nearest day.
pub fn x_date(x: f64) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(x.round() as i32)
}

/// One ticker's line, split wherever a value is missing.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSeries {
    pub ticker: String,
    pub color: (u8, u8, u8),
    pub segments: Vec<Vec<(f64, f64)>>,
}

/// Convert a pivoted panel into plot series plus padded y bounds.
pub fn plot_series(wide: &WideSeries) -> (Vec<PlotSeries>, [f64; 2]) {
    let series = wide
        .series
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let mut segments = Vec::new();
            let mut current: Vec<(f64, f64)> = Vec::new();
            for (&date, v) in wide.dates.iter().zip(&s.values) {
                match v {
                    Some(v) => current.push((date_x(date), *v)),
                    None if !current.is_empty() => segments.push(std::mem::take(&mut current)),
                    None => {}
                }
            }
            if !current.is_empty() {
                segments.push(current);
            }
            PlotSeries {
                ticker: s.ticker.clone(),
                color: series_color(i),
                segments,
            }
        })
        .collect();

    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for (_, y) in wide.points() {
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if !y_min.is_finite() || !y_max.is_finite() {
        return (series, [0.0, 1.0]);
    }

    let pad = ((y_max - y_min).abs() * 0.05).max(y_min.abs() * 0.01).max(1e-9);
    (series, [y_min - pad, y_max + pad])
}

/// X bounds for an inclusive date range; a single day gets half a day either side.
pub fn date_bounds(start: NaiveDate, end: NaiveDate) -> [f64; 2] {
    let (x0, x1) = (date_x(start), date_x(end));
    if x1 > x0 { [x0, x1] } else { [x0 - 0.5, x0 + 0.5] }
}

/// A lightweight, render-only chart description.
pub struct SeriesChart<'a> {
    pub series: &'a [PlotSeries],
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    /// Horizontal reference line (e.g. zero for returns).
    pub baseline: Option<f64>,
}

impl Widget for SeriesChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 10 || area.height < 4 {
            buf.set_string(area.x, area.y, "Resize terminal.", Style::default().fg(Color::Yellow));
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root).margin(1).build_cartesian_2d(x0..x1, y0..y1)?;

            if let Some(y) = self.baseline.filter(|y| (y0..=y1).contains(y)) {
                chart.draw_series(LineSeries::new([(x0, y), (x1, y)], &RGBColor(90, 90, 90)))?;
            }

            for s in self.series {
                let (r, g, b) = s.color;
                let color = RGBColor(r, g, b);
                for segment in &s.segments {
                    chart.draw_series(LineSeries::new(segment.iter().copied(), &color))?;
                    // Single-day segments have no line; mark them so they still show.
                    chart.draw_series(segment.iter().map(|&(x, y)| Pixel::new((x, y), color)))?;
                }
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}
