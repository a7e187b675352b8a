//! On-disk reading store: three append-only JSON array files, one per
//! category, acting as the hand-off format between the collector and the
//! report generator.

use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One captured sensor sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(rename = "Name")]
    pub name: String,
    /// Capture time, UTC.
    #[serde(rename = "Timestamp", with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "Reading")]
    pub value: f64,
}

/// Reading category. The unit is implied: Watts, RPM, Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Power,
    Fan,
    Temperature,
}

impl Category {
    pub fn file_name(self) -> &'static str {
        match self {
            Category::Power => "psu_readings.json",
            Category::Fan => "fan_readings.json",
            Category::Temperature => "temp_readings.json",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Power => "power",
            Category::Fan => "fan",
            Category::Temperature => "temperature",
        }
    }
}

/// Append readings to the JSON array file at `path`, creating it if needed.
///
/// The file is rewritten as a whole so it is a single valid JSON array after
/// every cycle. An unreadable or corrupt file starts over from an empty
/// array.
pub fn append_readings(path: &Path, new: &[Reading]) -> io::Result<()> {
    if new.is_empty() {
        return Ok(());
    }

    let mut readings = match fs::read_to_string(path) {
        Ok(contents) if !contents.trim().is_empty() => {
            match serde_json::from_str::<Vec<Reading>>(&contents) {
                Ok(existing) => existing,
                Err(e) => {
                    warn!("Discarding unparsable contents of {}: {}", path.display(), e);
                    Vec::new()
                }
            }
        }
        _ => Vec::new(),
    };
    readings.extend_from_slice(new);

    let serialized = serde_json::to_string_pretty(&readings)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(path, serialized)
}

/// Load every reading from the JSON array file at `path`.
pub fn load_readings(path: &Path) -> io::Result<Vec<Reading>> {
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&contents).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.to_rfc3339())
    }

    /// Accepts RFC 3339 as well as the offset-less form older capture files
    /// contain.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn reading(name: &str, offset_secs: i64, value: f64) -> Reading {
        Reading {
            name: name.to_string(),
            timestamp: Utc.timestamp_opt(1_700_000_000 + offset_secs, 0).unwrap(),
            value,
        }
    }

    #[test]
    fn append_creates_file_and_extends_it() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("psu_readings.json");

        append_readings(&path, &[reading("GPU_TRAY_PSU1", 0, 512.0)]).unwrap();
        append_readings(&path, &[reading("GPU_TRAY_PSU1", 30, 498.0)]).unwrap();

        let readings = load_readings(&path).unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].value, 512.0);
        assert_eq!(readings[1].value, 498.0);
    }

    #[test]
    fn append_with_no_readings_does_not_touch_the_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("fan_readings.json");

        append_readings(&path, &[]).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn corrupt_file_starts_over_from_empty() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("temp_readings.json");
        std::fs::write(&path, "definitely not json").unwrap();

        append_readings(&path, &[reading("TEMP_AMBIENT", 0, 24.5)]).unwrap();

        let readings = load_readings(&path).unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].name, "TEMP_AMBIENT");
    }

    #[test]
    fn loads_offsetless_timestamps() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("psu_readings.json");
        std::fs::write(
            &path,
            r#"[{"Name": "CPU_TRAY_PSU1", "Timestamp": "2024-05-06T12:00:00.123456", "Reading": 180.0}]"#,
        )
        .unwrap();

        let readings = load_readings(&path).unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].timestamp.timestamp(), 1_714_996_800);
    }

    #[test]
    fn round_trips_rfc3339_timestamps() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("psu_readings.json");
        let original = reading("Total Power in W", 0, 4242.0);

        append_readings(&path, std::slice::from_ref(&original)).unwrap();

        let readings = load_readings(&path).unwrap();
        assert_eq!(readings, vec![original]);
    }

    #[test]
    fn load_of_empty_file_yields_no_readings() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("fan_readings.json");
        std::fs::write(&path, "").unwrap();

        assert!(load_readings(&path).unwrap().is_empty());
    }
}
