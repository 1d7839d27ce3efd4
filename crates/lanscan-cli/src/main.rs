//! lanscan - Find every live host on the local IPv4 subnet
//!
//! Sweeps the subnet of the adapter that carries the default gateway, then
//! reports latency, hardware address, host name and the state of one TCP port
//! for each host that answered.

mod config;
mod output;

use anyhow::Result;
use clap::Parser;
use lanscan_core::{ProgressReport, ScanResult};
use lanscan_discovery::{CancellationToken, Scanner};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "lanscan")]
#[command(about = "Discover and characterize hosts on the local IPv4 subnet")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "lanscan.toml")]
    config: PathBuf,

    /// TCP port to probe on every live host
    #[arg(short, long)]
    port: Option<u16>,

    /// Local address to scan from (default: adapter with the default gateway)
    #[arg(short, long)]
    address: Option<Ipv4Addr>,

    /// Subnet mask (default: the adapter's own)
    #[arg(short, long)]
    netmask: Option<Ipv4Addr>,

    /// Print hosts and the summary as JSON lines
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Write a default configuration file to --config and exit
    #[arg(long)]
    write_default_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for results
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if args.write_default_config {
        config::save_default_config(&args.config)?;
        info!(path = %args.config.display(), "Wrote default configuration");
        return Ok(());
    }

    info!("lanscan v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config::load_config(&args.config)?;

    if let Some(port) = args.port {
        config.scan.port = port;
    }
    if let Some(address) = args.address {
        config.scan.local_address = Some(address);
    }
    if let Some(netmask) = args.netmask {
        config.scan.netmask = Some(netmask);
    }

    let scanner = Scanner::new(config.capabilities());
    let scan_config = config.to_scan_config();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping scan");
            on_interrupt.cancel();
        }
    });

    let json = args.json;
    let on_host_found = move |_ip: Ipv4Addr, result: ScanResult| {
        if json {
            match output::json_line(&result) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!(ip = %result.address, error = %e, "Failed to encode result"),
            }
        } else {
            println!("{}", output::host_line(&result));
        }
    };
    let on_progress = |report: ProgressReport| {
        if report.is_finished() {
            info!("{}", output::progress_line(&report));
        } else {
            debug!("{}", output::progress_line(&report));
        }
    };

    let summary = scanner
        .scan(&scan_config, on_host_found, on_progress, &cancel)
        .await?;

    if json {
        println!("{}", output::json_line(&summary)?);
    } else {
        println!("{}", output::summary_line(&summary));
    }

    Ok(())
}
