use anyhow::Context;
use clap::Parser;
use ocdsearch::{
    config::Config,
    engine::{ElasticClient, SearchEngine},
    indexing::IngestionDriver,
    metrics, telemetry,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "ocds-index")]
#[command(about = "Load OCDS release files into a tender search index", version)]
struct Cli {
    /// Target index (default: ocds_tenders)
    #[arg(value_name = "INDEX")]
    index: Option<String>,

    /// Directory holding the release files (default: current directory)
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// Delete and recreate the index before loading
    #[arg(short, long)]
    delete: bool,

    /// Search engine host, e.g. `localhost` or `http://es:9200`
    #[arg(short = 'H', long, env = "OCDS_ENGINE_HOST")]
    host: Option<String>,

    /// File name pattern inside PATH (default: *.json)
    #[arg(long, value_name = "GLOB")]
    pattern: Option<String>,

    /// Write the run's metrics here in Prometheus text format
    #[arg(long, value_name = "FILE")]
    metrics_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });

    if let Some(index) = cli.index {
        config.ingest.index = index;
    }
    if let Some(path) = cli.path {
        config.ingest.path = path;
    }
    if let Some(pattern) = cli.pattern {
        config.ingest.pattern = pattern;
    }
    if cli.delete {
        config.ingest.delete = true;
    }
    if let Some(host) = cli.host.as_deref() {
        config.engine = config.engine.with_host(host);
    }
    if let Some(file) = cli.metrics_file {
        config.ingest.metrics_file = Some(file);
    }

    telemetry::init_tracing(&config.observability)?;

    if config.observability.prometheus_enabled {
        if let Err(e) = metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
        }
    }

    let engine: Arc<dyn SearchEngine> =
        Arc::new(ElasticClient::new(&config.engine).context("Invalid engine configuration")?);
    tracing::info!(engine = %config.engine.url, index = %config.ingest.index, "Starting ingestion");

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping");
            signal_token.cancel();
        }
    });

    let driver = IngestionDriver::new(engine).with_delete_existing(config.ingest.delete);
    let result = driver
        .run(&config.ingest.glob_pattern(), &config.ingest.index, &cancel)
        .await;

    if config.observability.prometheus_enabled {
        export_metrics(config.ingest.metrics_file.as_deref());
    }

    let report = result.context("Ingestion failed")?;
    println!("{}", report.counters);
    Ok(())
}

/// Failed runs are exported too, so `ingest_runs_total{result="failed"}` is seen
fn export_metrics(file: Option<&Path>) {
    tracing::debug!(metrics = %metrics::gather_metrics(), "Ingestion metrics");

    if let Some(file) = file {
        match metrics::write_metrics(file) {
            Ok(()) => tracing::info!(file = %file.display(), "Metrics written"),
            Err(e) => tracing::warn!(file = %file.display(), error = %e, "Failed to write metrics"),
        }
    }
}
