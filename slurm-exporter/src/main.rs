// `slurm_exporter` -- Export the state of a Slurm cluster as Prometheus metrics.
//
// Every scrape of the telemetry path runs the enabled collectors, each of which runs one or more
// Slurm command line tools (sinfo, squeue, sdiag, scontrol, sshare), parses their output with the
// `slurmparse` library, and reports gauges.  Nothing is cached between scrapes.
//
// Run with --help for brief help.  The --once switch runs a single scrape and prints the result
// to stdout, which is handy for checking a new cluster.

mod collectors;
mod config;
mod exporter;
mod logging;
mod metrics;
mod runner;
mod server;

use anyhow::{bail, Result};
use clap::Parser;
use collectors::CollectorName;
use exporter::Exporter;
use logging::{LogFormat, LogLevel};
use runner::SlurmCommands;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const DEFAULT_TIMEOUT_SECS: u64 = 5;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Address to listen on for scrapes
    #[arg(long = "web.listen-address", default_value = "0.0.0.0:9341")]
    listen_address: SocketAddr,

    /// Path under which to expose metrics
    #[arg(long = "web.telemetry-path", default_value = "/metrics")]
    telemetry_path: String,

    /// Time limit in seconds for each Slurm command [default: 5]
    #[arg(long = "command.timeout")]
    command_timeout: Option<u64>,

    /// Minimum level of log messages; RUST_LOG overrides
    #[arg(long = "log.level", value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Format of log messages
    #[arg(long = "log.format", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Run only this collector (repeatable) [default: all]
    #[arg(long, value_enum)]
    collector: Vec<CollectorName>,

    /// Do not run this collector (repeatable) [default: none]
    #[arg(long, value_enum)]
    no_collector: Vec<CollectorName>,

    /// File containing JSON data with the command timeout and collector switches [default: none]
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Scrape once, print the metrics to stdout, and exit
    #[arg(long, default_value_t = false)]
    once: bool,
}

fn main() {
    match slurm_exporter() {
        Ok(()) => {}
        Err(msg) => {
            eprintln!("ERROR: {:#}", msg);
            process::exit(1);
        }
    }
}

fn slurm_exporter() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level, cli.log_format)?;

    if !cli.telemetry_path.starts_with('/') || cli.telemetry_path == "/" {
        bail!("Telemetry path must start with '/' and not be the root: {}", cli.telemetry_path);
    }

    let file_config = match cli.config_file {
        Some(ref path) => config::read_from_json(path)?,
        None => config::FileConfig::default(),
    };

    let timeout = match cli.command_timeout {
        Some(0) => bail!("Command timeout must be positive"),
        Some(secs) => Duration::from_secs(secs),
        None => file_config
            .command_timeout
            .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
    };

    let enabled = config::enabled_collectors(&file_config, &cli.collector, &cli.no_collector);
    if enabled.is_empty() {
        bail!("No collectors are enabled");
    }

    let runner = Arc::new(SlurmCommands::new(timeout));
    let exporter = Exporter::new(runner, enabled.into_iter().map(|c| c.build()).collect())?;
    info!(
        collectors = exporter.collector_names().join(","),
        timeout_secs = timeout.as_secs(),
        "starting"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(async {
        if cli.once {
            let (_, body) = metrics::encode(&exporter.gather().await)?;
            io::stdout().write_all(&body)?;
            Ok(())
        } else {
            server::serve(Arc::new(exporter), cli.listen_address, &cli.telemetry_path).await
        }
    })
}

#[test]
fn test_cli_defaults() {
    let cli = Cli::try_parse_from(["slurm_exporter"]).unwrap();
    assert!(cli.listen_address.port() == 9341);
    assert!(cli.telemetry_path == "/metrics");
    assert!(cli.command_timeout.is_none());
    assert!(cli.log_level == LogLevel::Info);
    assert!(cli.collector.is_empty());
    assert!(!cli.once);
}

#[test]
fn test_cli_switches() {
    let cli = Cli::try_parse_from([
        "slurm_exporter",
        "--web.listen-address",
        "127.0.0.1:9000",
        "--command.timeout",
        "12",
        "--log.format",
        "json",
        "--collector",
        "cpus",
        "--collector",
        "gpus",
        "--no-collector",
        "gpus",
    ])
    .unwrap();
    assert!(cli.listen_address.port() == 9000);
    assert!(cli.command_timeout == Some(12));
    assert!(cli.log_format == LogFormat::Json);
    assert!(cli.collector == vec![CollectorName::Cpus, CollectorName::Gpus]);
    assert!(cli.no_collector == vec![CollectorName::Gpus]);
    assert!(Cli::try_parse_from(["slurm_exporter", "--collector", "bogus"]).is_err());
}
