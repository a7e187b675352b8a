mod args;

use args::Args;
use bmc_stats::report::{self, ReportConfig};
use clap::Parser as _;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::fmt;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = setup_logging();
    info!("Starting report generation");

    let args = Args::parse();
    let config = ReportConfig {
        resample: args.resample,
        data_dir: args.data_dir,
        output_dir: args.output_dir,
    };

    match report::generate(&config) {
        Ok(path) => {
            info!("Report generated successfully at {}", path.display());
            println!("Report written to: {}", path.display());
        }
        Err(e) => {
            error!("Report generation failed: {}", e);
            eprintln!("Report generation failed: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}

/// File-based logging with daily rotation.
fn setup_logging() -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = rolling::daily("logs", "report.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_level(true)
        .init();

    guard
}
