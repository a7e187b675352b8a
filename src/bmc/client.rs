//! HTTPS client for the BMC's Redfish-style management API.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum BmcError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

pub type Result<T> = std::result::Result<T, BmcError>;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Substrings that mark a sensor collection member as a PSU endpoint.
const GPU_TRAY_PSU_MARKER: &str = "power_PWR_PDB_";
const CPU_TRAY_PSU_MARKER: &str = "PWR_MB_PSU";

pub struct BmcClient {
    http: Client,
    host: String,
    username: String,
    password: String,
    chassis: String,
}

/// PSU endpoints discovered from the chassis sensor collection.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PowerEndpoints {
    pub gpu_tray: Vec<String>,
    pub cpu_tray: Vec<String>,
}

impl PowerEndpoints {
    pub fn len(&self) -> usize {
        self.gpu_tray.len() + self.cpu_tray.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gpu_tray.is_empty() && self.cpu_tray.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct SensorCollection {
    #[serde(rename = "Members", default)]
    members: Vec<MemberRef>,
}

#[derive(Debug, Deserialize)]
struct MemberRef {
    #[serde(rename = "@odata.id")]
    odata_id: String,
}

#[derive(Debug, Deserialize)]
struct PowerSensor {
    #[serde(rename = "Reading")]
    reading: Option<f64>,
}

/// The `Thermal` resource carries both the fan and the temperature arrays,
/// so one request per cycle serves two categories.
#[derive(Debug, Deserialize)]
pub struct Thermal {
    #[serde(rename = "Fans", default)]
    pub fans: Vec<FanEntry>,
    #[serde(rename = "Temperatures", default)]
    pub temperatures: Vec<TemperatureEntry>,
}

#[derive(Debug, Deserialize)]
pub struct FanEntry {
    #[serde(rename = "MemberId")]
    pub member_id: Option<String>,
    #[serde(rename = "Reading")]
    pub reading: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct TemperatureEntry {
    #[serde(rename = "MemberId")]
    pub member_id: Option<String>,
    #[serde(rename = "ReadingCelsius")]
    pub reading_celsius: Option<f64>,
}

impl BmcClient {
    /// BMCs ship self-signed certificates, so certificate validation is off.
    pub fn new(host: &str, username: &str, password: &str, chassis: &str) -> Result<Self> {
        info!("Initializing BMC client for {}", host);
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|source| BmcError::Http {
                url: format!("https://{host}"),
                source,
            })?;

        Ok(BmcClient {
            http,
            host: host.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            chassis: chassis.to_string(),
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("https://{}{}", self.host, path);
        debug!("GET {}", url);
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|source| BmcError::Http {
                url: url.clone(),
                source,
            })?;
        response.json().map_err(|source| BmcError::Decode { url, source })
    }

    /// Walk the chassis sensor collection and pick out the PSU endpoints.
    /// Called once at collector startup; the set does not change at runtime.
    pub fn discover_power_endpoints(&self) -> Result<PowerEndpoints> {
        let path = format!("/redfish/v1/Chassis/{}/Sensors", self.chassis);
        let collection: SensorCollection = self.get(&path)?;
        let endpoints =
            partition_power_endpoints(collection.members.iter().map(|m| m.odata_id.as_str()));
        info!(
            "Discovered {} GPU tray and {} CPU tray PSU endpoints",
            endpoints.gpu_tray.len(),
            endpoints.cpu_tray.len()
        );
        Ok(endpoints)
    }

    /// Fetch one PSU sensor resource. `None` when the resource carries no
    /// numeric reading.
    pub fn read_power_sensor(&self, endpoint: &str) -> Result<Option<f64>> {
        let sensor: PowerSensor = self.get(endpoint)?;
        Ok(sensor.reading)
    }

    pub fn thermal(&self) -> Result<Thermal> {
        let path = format!("/redfish/v1/Chassis/{}/Thermal", self.chassis);
        self.get(&path)
    }
}

fn partition_power_endpoints<'a>(ids: impl Iterator<Item = &'a str>) -> PowerEndpoints {
    let mut endpoints = PowerEndpoints::default();
    for id in ids {
        if id.contains(GPU_TRAY_PSU_MARKER) {
            endpoints.gpu_tray.push(id.to_string());
        } else if id.contains(CPU_TRAY_PSU_MARKER) {
            endpoints.cpu_tray.push(id.to_string());
        }
    }
    endpoints
}
