//! The timed poll-and-record loop behind `bmc-collect`.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use tracing::{info, warn};

use crate::bmc::names::{TOTAL_POWER_NAME, Tray, fan_sensor_name, power_sensor_name, temp_sensor_name};
use crate::bmc::{BmcClient, PowerEndpoints, Thermal};
use crate::store::{self, Category, Reading};

/// Probing faster than this gains nothing and loads the BMC.
pub const MIN_PROBE_INTERVAL_SECS: u64 = 15;

/// Configuration for one collection run.
#[derive(Debug)]
pub struct CollectorConfig {
    /// Seconds between poll cycles.
    pub probe_every_secs: u64,
    /// Total collection duration; run until killed when unset.
    pub collect_for_secs: Option<u64>,
    /// Directory the three category files are written to.
    pub output_dir: PathBuf,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            probe_every_secs: MIN_PROBE_INTERVAL_SECS,
            collect_for_secs: None,
            output_dir: PathBuf::from("."),
        }
    }
}

/// Discover the PSU endpoints, then poll power, fan and temperature sensors
/// on the configured interval, appending each cycle's readings to the
/// category files.
pub fn run(client: &BmcClient, config: &CollectorConfig) -> Result<(), String> {
    info!("Starting collection with configuration: {:?}", config);

    if config.probe_every_secs < MIN_PROBE_INTERVAL_SECS {
        return Err(format!(
            "probe interval must be at least {MIN_PROBE_INTERVAL_SECS} seconds, got {}",
            config.probe_every_secs
        ));
    }

    std::fs::create_dir_all(&config.output_dir).map_err(|e| {
        format!(
            "failed to create output directory {}: {e}",
            config.output_dir.display()
        )
    })?;

    let endpoints = client
        .discover_power_endpoints()
        .map_err(|e| format!("failed to discover PSU endpoints: {e}"))?;
    if endpoints.is_empty() {
        warn!("No PSU endpoints discovered; the power file will only contain totals");
    }

    let deadline = config
        .collect_for_secs
        .map(|secs| Utc::now() + TimeDelta::seconds(secs as i64));

    loop {
        if let Some(deadline) = deadline {
            if Utc::now() >= deadline {
                info!("Data collection completed");
                break;
            }
        }

        let power = collect_power(client, &endpoints);
        append(config, Category::Power, &power)?;

        match client.thermal() {
            Ok(thermal) => {
                let (fans, temps) = thermal_readings(&thermal);
                append(config, Category::Fan, &fans)?;
                append(config, Category::Temperature, &temps)?;
            }
            Err(e) => {
                warn!("Thermal query failed, skipping fan and temperature readings this cycle: {}", e)
            }
        }

        thread::sleep(Duration::from_secs(config.probe_every_secs));
    }

    Ok(())
}

/// Query every discovered PSU endpoint in turn. Failures are logged and the
/// sensor is skipped for this cycle; the synthetic total sums whatever was
/// read successfully.
fn collect_power(client: &BmcClient, endpoints: &PowerEndpoints) -> Vec<Reading> {
    let mut readings = Vec::new();
    let mut total = 0.0;

    let tagged = endpoints
        .gpu_tray
        .iter()
        .map(|e| (e, Tray::Gpu))
        .chain(endpoints.cpu_tray.iter().map(|e| (e, Tray::Cpu)));

    for (endpoint, tray) in tagged {
        let name = power_sensor_name(endpoint_member_id(endpoint), tray);
        match client.read_power_sensor(endpoint) {
            Ok(Some(value)) => {
                total += value;
                readings.push(Reading {
                    name,
                    timestamp: Utc::now(),
                    value,
                });
            }
            Ok(None) => warn!("{}: no numeric reading, skipping", name),
            Err(e) => warn!("Failed to query {}: {}", endpoint, e),
        }
    }

    readings.push(Reading {
        name: TOTAL_POWER_NAME.to_string(),
        timestamp: Utc::now(),
        value: total,
    });
    readings
}

/// Map one `Thermal` response into fan and temperature readings. Entries
/// without a numeric reading are logged and skipped.
fn thermal_readings(thermal: &Thermal) -> (Vec<Reading>, Vec<Reading>) {
    let now = Utc::now();

    let mut fans = Vec::new();
    for fan in &thermal.fans {
        let member_id = fan.member_id.as_deref().unwrap_or("Unknown");
        match fan.reading {
            Some(value) => fans.push(Reading {
                name: fan_sensor_name(member_id),
                timestamp: now,
                value,
            }),
            None => warn!("Fan {}: no numeric reading, skipping", member_id),
        }
    }

    let mut temps = Vec::new();
    for temp in &thermal.temperatures {
        let member_id = temp.member_id.as_deref().unwrap_or("Unknown");
        match temp.reading_celsius {
            Some(value) => temps.push(Reading {
                name: temp_sensor_name(member_id),
                timestamp: now,
                value,
            }),
            None => warn!("Temperature {}: no numeric reading, skipping", member_id),
        }
    }

    (fans, temps)
}

/// The member id is the trailing path segment of a sensor endpoint.
fn endpoint_member_id(endpoint: &str) -> &str {
    endpoint.rsplit('/').next().unwrap_or(endpoint)
}

fn append(config: &CollectorConfig, category: Category, readings: &[Reading]) -> Result<(), String> {
    if readings.is_empty() {
        return Ok(());
    }
    let path = config.output_dir.join(category.file_name());
    store::append_readings(&path, readings).map_err(|e| {
        format!(
            "failed to append {} readings to {}: {e}",
            category.label(),
            path.display()
        )
    })?;
    info!(
        "Appended {} {} readings to {}",
        readings.len(),
        category.label(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bmc::{FanEntry, TemperatureEntry};

    #[test]
    fn rejects_probe_intervals_below_the_minimum() {
        let client = BmcClient::new("127.0.0.1", "admin", "secret", "Chassis_1").unwrap();
        let config = CollectorConfig {
            probe_every_secs: 5,
            ..CollectorConfig::default()
        };

        let err = run(&client, &config).unwrap_err();
        assert!(err.contains("at least 15 seconds"), "unexpected error: {err}");
    }

    #[test]
    fn extracts_member_id_from_endpoint_path() {
        assert_eq!(
            endpoint_member_id("/redfish/v1/Chassis/C/Sensors/power_PWR_PDB_PSU1"),
            "power_PWR_PDB_PSU1"
        );
        assert_eq!(endpoint_member_id("PWR_MB_PSU2"), "PWR_MB_PSU2");
    }

    #[test]
    fn thermal_readings_normalize_names_and_skip_missing_values() {
        let thermal = Thermal {
            fans: vec![
                FanEntry {
                    member_id: Some("SPD_FAN1_F".to_string()),
                    reading: Some(9300.0),
                },
                FanEntry {
                    member_id: Some("SPD_FAN1_R".to_string()),
                    reading: None,
                },
            ],
            temperatures: vec![
                TemperatureEntry {
                    member_id: Some("TEMP_PDB_PSU2".to_string()),
                    reading_celsius: Some(41.5),
                },
                TemperatureEntry {
                    member_id: None,
                    reading_celsius: Some(22.0),
                },
            ],
        };

        let (fans, temps) = thermal_readings(&thermal);

        assert_eq!(fans.len(), 1);
        assert_eq!(fans[0].name, "FAN1 Front");
        assert_eq!(fans[0].value, 9300.0);

        assert_eq!(temps.len(), 2);
        assert_eq!(temps[0].name, "TEMP_GPU_TRAY_PSU2");
        assert_eq!(temps[1].name, "Unknown");
    }
}
