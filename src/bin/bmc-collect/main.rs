mod args;

use std::env;

use args::Args;
use bmc_stats::bmc::BmcClient;
use bmc_stats::collector::{self, CollectorConfig};
use clap::Parser as _;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::fmt;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = setup_logging();
    info!("Starting collector");

    let args = Args::parse();

    let password = match env::var("BMC_PASSWORD") {
        Ok(password) if !password.is_empty() => password,
        _ => {
            error!("BMC_PASSWORD environment variable not set");
            eprintln!("Error: BMC_PASSWORD environment variable not set.");
            eprintln!("Example: export BMC_PASSWORD='your_password'");
            return Err("BMC_PASSWORD environment variable not set".into());
        }
    };

    let client = match BmcClient::new(&args.bmc_ip, &args.bmc_username, &password, &args.chassis) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to initialize BMC client: {}", e);
            return Err(Box::new(e));
        }
    };

    let config = CollectorConfig {
        probe_every_secs: args.probe_every,
        collect_for_secs: args.collect_for,
        output_dir: args.output_dir,
    };

    match collector::run(&client, &config) {
        Ok(()) => info!("Collector shutting down"),
        Err(e) => {
            error!("Collection failed: {}", e);
            eprintln!("Collection failed: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}

/// File-based logging with daily rotation.
fn setup_logging() -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = rolling::daily("logs", "collector.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_level(true)
        .init();

    guard
}
