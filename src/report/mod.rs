//! Batch report generation: loads the collected reading files, renders the
//! per-sensor plots and composes the summary document.

mod charts;
mod document;
mod summary;

pub use charts::{BatchStack, Series};
pub use summary::SensorSummary;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeDelta, Utc};
use tracing::{info, warn};

use crate::bmc::names::TOTAL_POWER_NAME;
use crate::store::{self, Category, Reading};

use document::{Entry, Section};

/// Readings grouped by sensor name, time-ordered within each sensor.
pub type SensorSeries = BTreeMap<String, Vec<(DateTime<Utc>, f64)>>;

/// Readings closer together than this belong to the same poll cycle.
const BATCH_TOLERANCE_SECS: i64 = 5;

/// Configuration for one report run.
#[derive(Debug)]
pub struct ReportConfig {
    /// Keep every Nth sample per sensor; 1 keeps everything.
    pub resample: usize,
    /// Directory holding the three category files.
    pub data_dir: PathBuf,
    /// Directory the timestamped report directory is created in.
    pub output_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            resample: 1,
            data_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
        }
    }
}

/// Generate a full report and return the report directory path.
pub fn generate(config: &ReportConfig) -> Result<PathBuf, String> {
    info!("Generating report with configuration: {:?}", config);

    let power = load_category(config, Category::Power)?;
    let fans = load_category(config, Category::Fan)?;
    let temps = load_category(config, Category::Temperature)?;

    let (first, last) = monitoring_period(&[&power, &fans, &temps])
        .ok_or_else(|| "no readings found in any category".to_string())?;

    let report_dir = config
        .output_dir
        .join(Local::now().format("%Y%m%d-%H%M-Reports").to_string());
    let psu_dir = report_dir.join("psus");
    let fan_dir = report_dir.join("fans");
    let temp_dir = report_dir.join("temperatures");
    for dir in [&report_dir, &psu_dir, &fan_dir, &temp_dir] {
        fs::create_dir_all(dir).map_err(|e| format!("failed to create {}: {e}", dir.display()))?;
    }

    let power_series = group_by_sensor(&power, config.resample);
    let fan_series = group_by_sensor(&fans, config.resample);
    let temp_series = group_by_sensor(&temps, config.resample);

    let sections = vec![
        power_section(&power_series, &psu_dir),
        fan_section(&fan_series, &fan_dir),
        temp_section(&temp_series, &temp_dir),
    ];

    let mut tables = Vec::new();
    for (category, series) in [
        (Category::Power, &power_series),
        (Category::Fan, &fan_series),
        (Category::Temperature, &temp_series),
    ] {
        let rows = summary::summarize(series);
        if rows.is_empty() {
            continue;
        }
        let file_name = format!("summary_{}.csv", category.label());
        summary::write_summary_csv(&report_dir.join(&file_name), &rows)?;
        tables.push(file_name);
    }

    document::write_document(&report_dir, first, last, &sections, &tables)
        .map_err(|e| format!("failed to write report document: {e}"))?;

    info!("Report written to {}", report_dir.display());
    Ok(report_dir)
}

fn load_category(config: &ReportConfig, category: Category) -> Result<Vec<Reading>, String> {
    let path = config.data_dir.join(category.file_name());
    let readings = store::load_readings(&path).map_err(|e| {
        format!(
            "failed to load {} readings from {}: {e}",
            category.label(),
            path.display()
        )
    })?;
    info!(
        "Loaded {} {} readings from {}",
        readings.len(),
        category.label(),
        path.display()
    );
    Ok(readings)
}

fn monitoring_period(categories: &[&[Reading]]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let mut first: Option<DateTime<Utc>> = None;
    let mut last: Option<DateTime<Utc>> = None;
    for reading in categories.iter().flat_map(|c| c.iter()) {
        first = Some(first.map_or(reading.timestamp, |f| f.min(reading.timestamp)));
        last = Some(last.map_or(reading.timestamp, |l| l.max(reading.timestamp)));
    }
    Some((first?, last?))
}

/// Group readings by sensor, sort each sensor's samples by time, and keep
/// every `resample`th sample.
fn group_by_sensor(readings: &[Reading], resample: usize) -> SensorSeries {
    let mut series = SensorSeries::new();
    for reading in readings {
        series
            .entry(reading.name.clone())
            .or_default()
            .push((reading.timestamp, reading.value));
    }
    for points in series.values_mut() {
        points.sort_by_key(|(ts, _)| *ts);
        if resample > 1 {
            *points = points.iter().copied().step_by(resample).collect();
        }
    }
    series
}

fn is_psu_name(name: &str) -> bool {
    name.starts_with("GPU_TRAY_PSU") || name.starts_with("CPU_TRAY_PSU")
}

fn power_section(series: &SensorSeries, psu_dir: &Path) -> Section {
    let mut entries = Vec::new();

    if let Some(total) = series.get(TOTAL_POWER_NAME) {
        let stem = "total_psu_power_usage";
        render_line(
            psu_dir,
            stem,
            "Total PSU Power Usage in Watts",
            "Power Usage (W)",
            vec![Series {
                label: "Total Power".to_string(),
                points: total.clone(),
            }],
        );
        entries.push(Entry {
            title: "Total Power".to_string(),
            image: format!("psus/{stem}"),
        });
    }

    let batches = power_batches(series, TimeDelta::seconds(BATCH_TOLERANCE_SECS));
    if !batches.is_empty() {
        let stem = "total_psu_power_breakdown";
        render_stacked(
            psu_dir,
            stem,
            "Total PSU Power Usage Breakdown",
            "Power Usage (W)",
            &batches,
        );
        entries.push(Entry {
            title: "Power Breakdown".to_string(),
            image: format!("psus/{stem}"),
        });
    }

    // GPU tray PSUs first, then CPU tray, as the chassis is laid out.
    for prefix in ["GPU_TRAY_PSU", "CPU_TRAY_PSU"] {
        for (name, points) in series.iter().filter(|(name, _)| name.starts_with(prefix)) {
            let stem = format!("{}_power_usage", name.to_lowercase());
            render_line(
                psu_dir,
                &stem,
                &format!("{name} Power Usage in Watts"),
                "Power Usage (W)",
                vec![Series {
                    label: name.clone(),
                    points: points.clone(),
                }],
            );
            entries.push(Entry {
                title: format!("{name} Power Usage"),
                image: format!("psus/{stem}"),
            });
        }
    }

    Section {
        title: "PSUs".to_string(),
        entries,
    }
}

fn fan_section(series: &SensorSeries, fan_dir: &Path) -> Section {
    let mut entries = Vec::new();

    // "FAN1 Front" and "FAN1 Rear" are rotors of the same fan and share a
    // chart.
    let mut bases: Vec<String> = series
        .keys()
        .map(|name| name.split(' ').next().unwrap_or(name.as_str()).to_string())
        .collect();
    bases.sort();
    bases.dedup();

    for base in &bases {
        let mut lines = Vec::new();
        for rotor in ["Front", "Rear"] {
            let name = format!("{base} {rotor}");
            if let Some(points) = series.get(&name) {
                lines.push(Series {
                    label: name,
                    points: points.clone(),
                });
            }
        }
        if lines.is_empty() {
            // Fan without the rotor suffix convention; plot it as-is.
            if let Some(points) = series.get(base) {
                lines.push(Series {
                    label: base.clone(),
                    points: points.clone(),
                });
            }
        }
        if lines.is_empty() {
            continue;
        }
        let stem = format!("fan_{base}_speed");
        render_line(
            fan_dir,
            &stem,
            &format!("FAN {base} Speed in RPM"),
            "Speed (RPM)",
            lines,
        );
        entries.push(Entry {
            title: format!("FAN {base} Speed"),
            image: format!("fans/{stem}"),
        });
    }

    if !series.is_empty() {
        let stem = "aggregate_fan_speed";
        let aggregate: Vec<Series> = series
            .iter()
            .map(|(name, points)| Series {
                label: name.clone(),
                points: points.clone(),
            })
            .collect();
        render_line(
            fan_dir,
            stem,
            "Aggregate FAN Speed Over Time",
            "Speed (RPM)",
            aggregate,
        );
        entries.push(Entry {
            title: "Aggregate FAN Speed".to_string(),
            image: format!("fans/{stem}"),
        });
    }

    Section {
        title: "FANs".to_string(),
        entries,
    }
}

/// Temperature sensors are charted in groups by name prefix; the ambient
/// sensor is a group of one.
const TEMP_GROUPS: &[(&str, &str, &str)] = &[
    ("TEMP_AMBIENT", "Ambient Temperature", "temp_ambient"),
    ("TEMP_CPU_TRAY_PSU", "CPU Tray PSUs Temperatures", "temp_cpu_tray_psus"),
    ("TEMP_GPU_TRAY_PSU", "GPU Tray PSUs Temperatures", "temp_gpu_tray_psus"),
    ("TEMP_GB_GPU", "GPU Temperatures", "temp_gpus"),
    ("TEMP_DIMM_ZONE", "Memory Temperatures (DIMM Zones)", "temp_dimm_zones"),
    ("TEMP_NVME", "NVME Drives Temperatures", "temp_nvmes"),
];

fn temp_section(series: &SensorSeries, temp_dir: &Path) -> Section {
    let mut entries = Vec::new();

    for (prefix, title, stem) in TEMP_GROUPS {
        let lines: Vec<Series> = series
            .iter()
            .filter(|(name, _)| {
                if *prefix == "TEMP_AMBIENT" {
                    name.as_str() == *prefix
                } else {
                    name.starts_with(prefix)
                }
            })
            .map(|(name, points)| Series {
                label: name.clone(),
                points: points.clone(),
            })
            .collect();
        if lines.is_empty() {
            continue;
        }
        render_line(temp_dir, stem, title, "Temperature (°C)", lines);
        entries.push(Entry {
            title: title.to_string(),
            image: format!("temperatures/{stem}"),
        });
    }

    Section {
        title: "Temperatures".to_string(),
        entries,
    }
}

/// Split the interleaved PSU readings into poll cycles and sum each
/// sensor's contribution per cycle. The synthetic total is excluded.
fn power_batches(series: &SensorSeries, tolerance: TimeDelta) -> Vec<BatchStack> {
    let mut rows: Vec<(DateTime<Utc>, &str, f64)> = Vec::new();
    for (name, points) in series {
        if !is_psu_name(name) {
            continue;
        }
        for (ts, value) in points {
            rows.push((*ts, name.as_str(), *value));
        }
    }
    rows.sort_by_key(|(ts, ..)| *ts);

    let mut batches: Vec<BatchStack> = Vec::new();
    let mut current: BTreeMap<&str, f64> = BTreeMap::new();
    let mut started: Option<DateTime<Utc>> = None;
    let mut prev: Option<DateTime<Utc>> = None;

    let mut push_batch =
        |current: &mut BTreeMap<&str, f64>, started: &mut Option<DateTime<Utc>>| {
            if let Some(start) = started.take() {
                batches.push(BatchStack {
                    label: start.format("%H:%M:%S").to_string(),
                    segments: current.iter().map(|(n, v)| (n.to_string(), *v)).collect(),
                });
                current.clear();
            }
        };

    for (ts, name, value) in rows {
        if prev.is_some_and(|p| ts - p > tolerance) {
            push_batch(&mut current, &mut started);
        }
        if started.is_none() {
            started = Some(ts);
        }
        *current.entry(name).or_insert(0.0) += value;
        prev = Some(ts);
    }
    push_batch(&mut current, &mut started);

    batches
}

fn render_line(dir: &Path, stem: &str, caption: &str, y_desc: &str, series: Vec<Series>) {
    if let Err(e) = charts::line_chart(dir, stem, caption, y_desc, &series) {
        warn!("Failed to render chart {}: {}", stem, e);
    }
}

fn render_stacked(dir: &Path, stem: &str, caption: &str, y_desc: &str, batches: &[BatchStack]) {
    if let Err(e) = charts::stacked_bar_chart(dir, stem, caption, y_desc, batches) {
        warn!("Failed to render chart {}: {}", stem, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reading(name: &str, offset_secs: i64, value: f64) -> Reading {
        Reading {
            name: name.to_string(),
            timestamp: Utc.timestamp_opt(1_700_000_000 + offset_secs, 0).unwrap(),
            value,
        }
    }

    #[test]
    fn groups_by_sensor_and_sorts_by_time() {
        let readings = vec![
            reading("FAN1 Front", 60, 9300.0),
            reading("FAN1 Front", 0, 9000.0),
            reading("FAN1 Rear", 0, 8800.0),
        ];

        let series = group_by_sensor(&readings, 1);
        assert_eq!(series.len(), 2);
        let front = &series["FAN1 Front"];
        assert_eq!(front[0].1, 9000.0);
        assert_eq!(front[1].1, 9300.0);
    }

    #[test]
    fn resampling_keeps_every_nth_sample() {
        let readings: Vec<Reading> = (0..5)
            .map(|i| reading("TEMP_AMBIENT", i * 30, 20.0 + i as f64))
            .collect();

        let series = group_by_sensor(&readings, 2);
        let points = &series["TEMP_AMBIENT"];
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].1, 20.0);
        assert_eq!(points[1].1, 22.0);
        assert_eq!(points[2].1, 24.0);
    }

    #[test]
    fn monitoring_period_spans_all_categories() {
        let power = vec![reading("Total Power in W", 30, 4000.0)];
        let fans = vec![reading("FAN1 Front", 0, 9000.0)];
        let temps = vec![reading("TEMP_AMBIENT", 90, 24.0)];

        let (first, last) = monitoring_period(&[&power, &fans, &temps]).unwrap();
        assert_eq!(first, fans[0].timestamp);
        assert_eq!(last, temps[0].timestamp);
    }

    #[test]
    fn monitoring_period_of_nothing_is_none() {
        assert!(monitoring_period(&[&[], &[]]).is_none());
    }

    #[test]
    fn power_batches_split_on_time_gaps_and_exclude_the_total() {
        let readings = vec![
            reading("GPU_TRAY_PSU1", 0, 500.0),
            reading("CPU_TRAY_PSU1", 1, 200.0),
            reading("Total Power in W", 1, 700.0),
            reading("GPU_TRAY_PSU1", 30, 520.0),
            reading("CPU_TRAY_PSU1", 31, 210.0),
        ];
        let series = group_by_sensor(&readings, 1);

        let batches = power_batches(&series, TimeDelta::seconds(5));
        assert_eq!(batches.len(), 2);
        assert_eq!(
            batches[0].segments,
            vec![
                ("CPU_TRAY_PSU1".to_string(), 200.0),
                ("GPU_TRAY_PSU1".to_string(), 500.0)
            ]
        );
        assert_eq!(
            batches[1].segments,
            vec![
                ("CPU_TRAY_PSU1".to_string(), 210.0),
                ("GPU_TRAY_PSU1".to_string(), 520.0)
            ]
        );
    }

    #[test]
    fn power_batches_of_one_cycle_form_a_single_batch() {
        let readings = vec![
            reading("GPU_TRAY_PSU1", 0, 500.0),
            reading("GPU_TRAY_PSU2", 2, 480.0),
        ];
        let series = group_by_sensor(&readings, 1);

        let batches = power_batches(&series, TimeDelta::seconds(5));
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].label, "22:13:20");
        assert_eq!(batches[0].segments.len(), 2);
    }
}
