//! SVG line chart of history and forecast.

use std::path::Path;

use chrono::NaiveDate;
use plotters::prelude::*;

use crate::config::ChartConfig;
use crate::error::{ForecastError, Result};
use crate::series::{add_months, CombinedSeries, TimeSeries};

const HISTORICAL_COLOR: RGBColor = RGBColor(255, 140, 0);
const FORECAST_COLOR: RGBColor = BLUE;
const BOUNDARY_COLOR: RGBColor = RGBColor(128, 128, 128);

fn render_err<E: std::fmt::Display>(e: E) -> ForecastError {
    ForecastError::Render(e.to_string())
}

/// Join history and forecast. Fails with `EmptySeries` if either is empty.
pub fn combine(historical: &TimeSeries, forecast: &TimeSeries) -> Result<CombinedSeries> {
    CombinedSeries::concat(historical, forecast)
}

/// Combine and render in one step. Nothing is drawn when either series is empty.
pub fn render_svg(
    historical: &TimeSeries,
    forecast: &TimeSeries,
    options: &ChartConfig,
) -> Result<(CombinedSeries, String)> {
    let combined = combine(historical, forecast)?;
    let svg = render_combined(&combined, options)?;
    Ok((combined, svg))
}

fn y_range(combined: &CombinedSeries) -> (f64, f64) {
    let (lo, hi) = combined
        .observations()
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), o| {
            (lo.min(o.value), hi.max(o.value))
        });
    let pad = if hi > lo { (hi - lo) * 0.08 } else { 1.0 };
    (lo - pad, hi + pad)
}

/// Render a combined series. The x axis is the month offset from the first
/// observation, labelled `YYYY-MM`.
pub fn render_combined(combined: &CombinedSeries, options: &ChartConfig) -> Result<String> {
    if combined.historical().is_empty() {
        return Err(ForecastError::EmptySeries("historical"));
    }
    if combined.forecast().is_empty() {
        return Err(ForecastError::EmptySeries("forecast"));
    }

    let origin: NaiveDate = combined.observations()[0].date;
    let last_x = (combined.len() - 1) as i32;
    let boundary_x = (combined.historical().len() - 1) as i32;
    let (y_min, y_max) = y_range(combined);

    let points: Vec<(i32, f64)> = combined
        .observations()
        .iter()
        .enumerate()
        .map(|(i, o)| (i as i32, o.value))
        .collect();
    let historical_points = &points[..=boundary_x as usize];
    // forecast line starts at the last historical point
    let forecast_points = &points[boundary_x as usize..];

    let label_month = |x: &i32| -> String {
        u32::try_from(*x)
            .ok()
            .and_then(|m| add_months(origin, m).ok())
            .map(|d| d.format("%Y-%m").to_string())
            .unwrap_or_default()
    };

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height))
            .into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 28))
            .margin(20)
            .x_label_area_size(60)
            .y_label_area_size(70)
            .build_cartesian_2d(0i32..last_x.max(1), y_min..y_max)
            .map_err(render_err)?;

        chart
            .configure_mesh()
            .x_desc(options.x_label.as_str())
            .y_desc(options.y_label.as_str())
            .x_labels(12)
            .x_label_formatter(&label_month)
            .light_line_style(RGBColor(230, 230, 230))
            .draw()
            .map_err(render_err)?;

        chart
            .draw_series(LineSeries::new(
                historical_points.iter().copied(),
                HISTORICAL_COLOR.stroke_width(2),
            ))
            .map_err(render_err)?
            .label("Historical")
            .legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], HISTORICAL_COLOR.stroke_width(2))
            });
        chart
            .draw_series(
                historical_points
                    .iter()
                    .map(|&p| Circle::new(p, 3, HISTORICAL_COLOR.filled())),
            )
            .map_err(render_err)?;

        chart
            .draw_series(LineSeries::new(
                forecast_points.iter().copied(),
                FORECAST_COLOR.stroke_width(2),
            ))
            .map_err(render_err)?
            .label("Forecast")
            .legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], FORECAST_COLOR.stroke_width(2))
            });
        chart
            .draw_series(
                forecast_points[1..]
                    .iter()
                    .map(|&p| Circle::new(p, 3, FORECAST_COLOR.filled())),
            )
            .map_err(render_err)?;

        let dash = (y_max - y_min) / 40.0;
        let dashes = (0..20).map(|k| {
            let y0 = y_min + 2.0 * k as f64 * dash;
            PathElement::new(
                vec![(boundary_x, y0), (boundary_x, y0 + dash)],
                BOUNDARY_COLOR.stroke_width(2),
            )
        });
        chart
            .draw_series(dashes)
            .map_err(render_err)?
            .label("Forecast start")
            .legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 8, y)], BOUNDARY_COLOR.stroke_width(2))
            });

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
    }

    Ok(svg)
}

/// Write a rendered chart to disk.
pub fn save(svg: &str, path: impl AsRef<Path>) -> Result<()> {
    std::fs::write(path, svg)?;
    Ok(())
}
