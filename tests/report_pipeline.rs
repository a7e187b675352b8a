use bmc_stats::report::{self, ReportConfig};
use bmc_stats::store::{self, Category, Reading};
use chrono::{TimeDelta, TimeZone, Utc};
use tempfile::tempdir;

fn reading(name: &str, offset_secs: i64, value: f64) -> Reading {
    Reading {
        name: name.to_string(),
        timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap() + TimeDelta::seconds(offset_secs),
        value,
    }
}

/// Three collection cycles, thirty seconds apart, for a small chassis.
fn write_capture(data_dir: &std::path::Path) {
    for cycle in 0..3 {
        let t = cycle * 30;
        let psu1 = 500.0 + cycle as f64;
        let psu2 = 480.0 - cycle as f64;
        let cpu1 = 200.0;

        store::append_readings(
            &data_dir.join(Category::Power.file_name()),
            &[
                reading("GPU_TRAY_PSU1", t, psu1),
                reading("GPU_TRAY_PSU2", t, psu2),
                reading("CPU_TRAY_PSU1", t + 1, cpu1),
                reading("Total Power in W", t + 1, psu1 + psu2 + cpu1),
            ],
        )
        .unwrap();

        store::append_readings(
            &data_dir.join(Category::Fan.file_name()),
            &[
                reading("FAN1 Front", t, 9300.0),
                reading("FAN1 Rear", t, 8900.0),
                reading("FAN9 Front", t, 7400.0),
            ],
        )
        .unwrap();

        store::append_readings(
            &data_dir.join(Category::Temperature.file_name()),
            &[
                reading("TEMP_AMBIENT", t, 23.5),
                reading("TEMP_GB_GPU0", t, 64.0 + cycle as f64),
                reading("TEMP_CPU_TRAY_PSU1", t, 41.0),
            ],
        )
        .unwrap();
    }
}

#[test]
fn capture_files_survive_a_collector_restart() {
    let tmp = tempdir().unwrap();
    write_capture(tmp.path());
    // A second run appends to the same files instead of truncating them.
    write_capture(tmp.path());

    let power = store::load_readings(&tmp.path().join(Category::Power.file_name())).unwrap();
    assert_eq!(power.len(), 24);
    assert!(power.iter().any(|r| r.name == "Total Power in W"));
}

#[test]
fn report_produces_document_and_summaries() {
    let data = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_capture(data.path());

    let config = ReportConfig {
        resample: 1,
        data_dir: data.path().to_path_buf(),
        output_dir: out.path().to_path_buf(),
    };
    let report_dir = report::generate(&config).unwrap();

    assert!(report_dir.is_dir());
    for sub in ["psus", "fans", "temperatures"] {
        assert!(report_dir.join(sub).is_dir(), "missing {sub} directory");
    }

    let html = std::fs::read_to_string(report_dir.join("index.html")).unwrap();
    assert!(html.contains("Monitoring period"));
    assert!(html.contains("Total Power"));
    assert!(html.contains("FAN FAN1 Speed"));
    assert!(html.contains("Ambient Temperature"));
    assert!(html.contains("psus/gpu_tray_psu1_power_usage.svg"));

    let summary = std::fs::read_to_string(report_dir.join("summary_power.csv")).unwrap();
    assert!(summary.starts_with("Sensor,Samples,Min,Mean,Max"));
    assert!(summary.contains("GPU_TRAY_PSU1,3,500.0,501.0,502.0"));

    let fan_summary = std::fs::read_to_string(report_dir.join("summary_fan.csv")).unwrap();
    assert!(fan_summary.contains("FAN9 Front,3,7400.0,7400.0,7400.0"));
}

#[test]
fn report_fails_cleanly_when_capture_files_are_missing() {
    let data = tempdir().unwrap();
    let out = tempdir().unwrap();

    let config = ReportConfig {
        resample: 1,
        data_dir: data.path().to_path_buf(),
        output_dir: out.path().to_path_buf(),
    };
    let err = report::generate(&config).unwrap_err();
    assert!(err.contains("psu_readings.json"), "unexpected error: {err}");
}

// Chart rendering needs a system font for the captions and axis labels,
// which headless build machines do not always have.
#[test]
#[ignore]
fn report_renders_chart_images() {
    let data = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_capture(data.path());

    let config = ReportConfig {
        resample: 1,
        data_dir: data.path().to_path_buf(),
        output_dir: out.path().to_path_buf(),
    };
    let report_dir = report::generate(&config).unwrap();

    for image in [
        "psus/total_psu_power_usage.svg",
        "psus/total_psu_power_breakdown.svg",
        "fans/fan_FAN1_speed.svg",
        "fans/aggregate_fan_speed.svg",
        "temperatures/temp_ambient.svg",
        "temperatures/temp_gpus.svg",
    ] {
        assert!(report_dir.join(image).is_file(), "missing {image}");
    }
}
