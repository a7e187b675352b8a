//! Chart rendering. Every chart is written twice, SVG and PNG, so the
//! report document can embed the vector form and fall back to the raster
//! one.

use std::path::Path;

use chrono::{DateTime, TimeDelta, Utc};
use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::debug;

const CHART_SIZE: (u32, u32) = (900, 300);
const BREAKDOWN_SIZE: (u32, u32) = (1170, 300);

/// One named line on a chart.
#[derive(Debug, Clone)]
pub struct Series {
    pub label: String,
    pub points: Vec<(DateTime<Utc>, f64)>,
}

/// One bar of the stacked power-breakdown chart.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchStack {
    /// Cycle start time, used as the bar's axis label.
    pub label: String,
    /// Per-sensor contributions, stacked bottom-up in order.
    pub segments: Vec<(String, f64)>,
}

/// Render a time-series line chart as `<stem>.svg` and `<stem>.png` under
/// `dir`. A chart with no data at all is skipped.
pub fn line_chart(
    dir: &Path,
    stem: &str,
    caption: &str,
    y_desc: &str,
    series: &[Series],
) -> Result<(), String> {
    if series.iter().all(|s| s.points.is_empty()) {
        debug!("No data for chart {}, skipping", stem);
        return Ok(());
    }

    let svg_path = dir.join(format!("{stem}.svg"));
    {
        let root = SVGBackend::new(&svg_path, CHART_SIZE).into_drawing_area();
        draw_line_chart(&root, caption, y_desc, series)?;
    }

    let png_path = dir.join(format!("{stem}.png"));
    {
        let root = BitMapBackend::new(&png_path, CHART_SIZE).into_drawing_area();
        draw_line_chart(&root, caption, y_desc, series)?;
    }

    Ok(())
}

/// Render the stacked per-cycle breakdown as `<stem>.svg` and `<stem>.png`
/// under `dir`.
pub fn stacked_bar_chart(
    dir: &Path,
    stem: &str,
    caption: &str,
    y_desc: &str,
    batches: &[BatchStack],
) -> Result<(), String> {
    if batches.is_empty() {
        debug!("No data for chart {}, skipping", stem);
        return Ok(());
    }

    let svg_path = dir.join(format!("{stem}.svg"));
    {
        let root = SVGBackend::new(&svg_path, BREAKDOWN_SIZE).into_drawing_area();
        draw_stacked_bars(&root, caption, y_desc, batches)?;
    }

    let png_path = dir.join(format!("{stem}.png"));
    {
        let root = BitMapBackend::new(&png_path, BREAKDOWN_SIZE).into_drawing_area();
        draw_stacked_bars(&root, caption, y_desc, batches)?;
    }

    Ok(())
}

fn draw_line_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    caption: &str,
    y_desc: &str,
    series: &[Series],
) -> Result<(), String> {
    let mut t_min = DateTime::<Utc>::MAX_UTC;
    let mut t_max = DateTime::<Utc>::MIN_UTC;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for (ts, value) in series.iter().flat_map(|s| s.points.iter()) {
        t_min = t_min.min(*ts);
        t_max = t_max.max(*ts);
        y_min = y_min.min(*value);
        y_max = y_max.max(*value);
    }
    let y_min = y_min.min(0.0);
    let y_max = y_max.max(1.0);
    // A single-cycle capture still needs a non-empty time axis.
    let t_max = if t_min == t_max { t_max + TimeDelta::seconds(1) } else { t_max };

    root.fill(&WHITE).map_err(|e| e.to_string())?;
    let mut chart = ChartBuilder::on(root)
        .caption(caption, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(t_min..t_max, y_min..y_max)
        .map_err(|e| e.to_string())?;

    chart
        .configure_mesh()
        .x_labels(8)
        .x_label_formatter(&|ts| ts.format("%H:%M:%S").to_string())
        .x_desc("Time (HH:MM:SS)")
        .y_desc(y_desc)
        .draw()
        .map_err(|e| e.to_string())?;

    for (idx, s) in series.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        chart
            .draw_series(LineSeries::new(s.points.iter().copied(), &color))
            .map_err(|e| e.to_string())?
            .label(s.label.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], &color));
    }

    if series.len() > 1 {
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(|e| e.to_string())?;
    }

    root.present().map_err(|e| e.to_string())
}

fn draw_stacked_bars<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    caption: &str,
    y_desc: &str,
    batches: &[BatchStack],
) -> Result<(), String> {
    let y_max = batches
        .iter()
        .map(|b| b.segments.iter().map(|(_, v)| v).sum::<f64>())
        .fold(1.0_f64, f64::max);

    // Stable sensor-to-color assignment across all bars.
    let mut sensors: Vec<&str> = batches
        .iter()
        .flat_map(|b| b.segments.iter().map(|(name, _)| name.as_str()))
        .collect();
    sensors.sort_unstable();
    sensors.dedup();

    root.fill(&WHITE).map_err(|e| e.to_string())?;
    let mut chart = ChartBuilder::on(root)
        .caption(caption, ("sans-serif", 22))
        .margin(12)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(0..batches.len() as i32, 0.0..y_max * 1.05)
        .map_err(|e| e.to_string())?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(batches.len().min(8))
        .x_label_formatter(&|i| {
            batches
                .get(*i as usize)
                .map(|b| b.label.clone())
                .unwrap_or_default()
        })
        .y_desc(y_desc)
        .draw()
        .map_err(|e| e.to_string())?;

    for (i, batch) in batches.iter().enumerate() {
        let (x0, x1) = (i as i32, i as i32 + 1);
        let mut base = 0.0;
        for (name, value) in &batch.segments {
            let top = base + value;
            let idx = sensors.binary_search(&name.as_str()).unwrap_or(0);
            let color = Palette99::pick(idx).to_rgba();
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(x0, base), (x1, top)],
                    color.filled(),
                )))
                .map_err(|e| e.to_string())?;
            base = top;
        }
    }

    root.present().map_err(|e| e.to_string())
}
