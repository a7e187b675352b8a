//! Per-sensor summary statistics tables.

use std::fs::File;
use std::path::Path;

use csv::Writer;
use serde::Serialize;

use super::SensorSeries;

/// One row of a category's summary table.
#[derive(Debug, Serialize, PartialEq)]
pub struct SensorSummary {
    #[serde(rename = "Sensor")]
    pub sensor: String,
    #[serde(rename = "Samples")]
    pub samples: usize,
    #[serde(rename = "Min")]
    pub min: f64,
    #[serde(rename = "Mean")]
    pub mean: f64,
    #[serde(rename = "Max")]
    pub max: f64,
}

/// Compute min/mean/max per sensor. Sensors without samples are omitted.
pub fn summarize(series: &SensorSeries) -> Vec<SensorSummary> {
    series
        .iter()
        .filter(|(_, points)| !points.is_empty())
        .map(|(name, points)| {
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            let mut sum = 0.0;
            for (_, value) in points {
                min = min.min(*value);
                max = max.max(*value);
                sum += value;
            }
            SensorSummary {
                sensor: name.clone(),
                samples: points.len(),
                min,
                mean: sum / points.len() as f64,
                max,
            }
        })
        .collect()
}

pub fn write_summary_csv(path: &Path, rows: &[SensorSummary]) -> Result<(), String> {
    let file =
        File::create(path).map_err(|e| format!("failed to create {}: {e}", path.display()))?;
    let mut writer = Writer::from_writer(file);
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| format!("failed to write summary row to {}: {e}", path.display()))?;
    }
    writer
        .flush()
        .map_err(|e| format!("failed to flush {}: {e}", path.display()))
}
