// src/main.rs
use clap::Parser;
use diskcollectd::collector::{
    CommandRunner, MetricsAssembler, SystemRunner, get_hostname, run_pass,
};
use diskcollectd::config::{Cli, Config};
use diskcollectd::sink::{CsvStore, HttpSubmitter, Sink};
use std::sync::Arc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Initializes the tracing subscriber. Default level is INFO, -q keeps only
/// errors.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let config = Config::load(&cli)?;

    info!(
        host = %get_hostname(),
        attributes = config.registry.len(),
        interface = %config.probe.interface,
        "starting disk metrics collection"
    );

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new(config.probe_timeout));

    let csv = CsvStore::new(&config.csv_path);
    info!(path = %csv.path().display(), "appending metrics to CSV");

    let mut sinks: Vec<Arc<dyn Sink>> = vec![Arc::new(csv)];
    match &config.api_url {
        Some(url) => match HttpSubmitter::new(url, config.node_id, config.http_timeout) {
            Ok(submitter) => {
                info!(url = submitter.url(), "submitting metrics to API");
                sinks.push(Arc::new(submitter));
            }
            Err(e) => error!("failed to build HTTP client, remote submission disabled: {}", e),
        },
        None => warn!("API_URL not set, remote submission disabled"),
    }

    let assembler = MetricsAssembler::new(
        Arc::clone(&runner),
        Arc::new(config.registry.clone()),
        config.probe.clone(),
    );

    let summary = run_pass(runner, &assembler, &sinks, config.max_workers).await;

    info!(
        devices = summary.devices,
        records = summary.records,
        delivered = ?summary.delivered,
        "disk metrics collection finished"
    );

    Ok(())
}
