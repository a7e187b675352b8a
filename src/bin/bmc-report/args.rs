use std::path::PathBuf;

use clap::Parser;

/// Generate plots and a report document from collected sensor data.
#[derive(Debug, Parser)]
pub struct Args {
    /// Keep every Nth sample for each sensor. Default is 1 (consider all
    /// samples).
    #[arg(long, default_value_t = 1)]
    pub resample: usize,

    /// Directory containing the reading files.
    #[arg(long, default_value = ".")]
    pub data_dir: PathBuf,

    /// Directory the timestamped report directory is created in.
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,
}
