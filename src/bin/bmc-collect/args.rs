use std::path::PathBuf;

use clap::Parser;

/// Collect power, fan and temperature telemetry from a server BMC.
#[derive(Debug, Parser)]
pub struct Args {
    /// Server BMC IP address or hostname.
    #[arg(long)]
    pub bmc_ip: String,

    /// Username for authentication. The password is read from the
    /// BMC_PASSWORD environment variable.
    #[arg(long)]
    pub bmc_username: String,

    /// Probe interval in seconds.
    #[arg(long)]
    pub probe_every: u64,

    /// Duration in seconds for which to collect data. Runs indefinitely if
    /// not specified.
    #[arg(long)]
    pub collect_for: Option<u64>,

    /// Chassis path segment of the Redfish sensor endpoints.
    #[arg(long, default_value = "Miramar_Sensor")]
    pub chassis: String,

    /// Directory the reading files are written to.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,
}
