use anyhow::Context;
use axum::Router;
use clap::Parser;
#[cfg(unix)]
use ocdsearch::api::server::serve_unix;
use ocdsearch::{
    api::{build_router, AppState},
    config::Config,
    engine::{ElasticClient, SearchEngine},
    search::SearchService,
    telemetry,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "ocds-search")]
#[command(about = "OCDS tender search gateway", version)]
struct Args {
    /// Address to listen on
    #[arg(short, long, value_name = "HOST")]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Unix domain socket to listen on instead of BIND:PORT
    #[arg(short = 's', long, value_name = "SOCKET")]
    path: Option<PathBuf>,

    /// Search engine host, e.g. `localhost` or `http://es:9200`
    #[arg(short = 'H', long = "host", value_name = "ENGINE_HOST", env = "OCDS_ENGINE_HOST")]
    engine_host: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });

    if let Some(bind) = args.bind {
        config.server.host = bind;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(path) = args.path {
        config.server.path = Some(path);
    }
    if let Some(host) = args.engine_host.as_deref() {
        config.engine = config.engine.with_host(host);
    }

    telemetry::init_tracing(&config.observability)?;
    tracing::info!("Starting OCDS search gateway v{}", env!("CARGO_PKG_VERSION"));

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = ocdsearch::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        } else {
            tracing::info!("Prometheus metrics initialized");
        }
    } else {
        tracing::info!("Prometheus metrics disabled in configuration");
    }

    let engine: Arc<dyn SearchEngine> =
        Arc::new(ElasticClient::new(&config.engine).context("Invalid engine configuration")?);
    tracing::info!(engine = %config.engine.url, "Search engine configured");

    let search = Arc::new(SearchService::new(engine, config.search.default_index.clone()));
    let app = build_router(AppState::new(search));

    match config.server.path.as_deref() {
        Some(path) => serve_on_socket(path, app).await?,
        None => {
            let addr = format!("{}:{}", config.server.host, config.server.port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;

            tracing::info!("HTTP server listening on http://{}", addr);
            tracing::info!("   Search: http://{}/search", addr);
            tracing::info!("   Health check: http://{}/health", addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    tracing::info!("Shut down gracefully");
    Ok(())
}

#[cfg(unix)]
async fn serve_on_socket(path: &Path, app: Router) -> anyhow::Result<()> {
    let listener = tokio::net::UnixListener::bind(path)
        .with_context(|| format!("Failed to bind {}", path.display()))?;
    tracing::info!("HTTP server listening on unix:{}", path.display());

    serve_unix(listener, app, shutdown_signal()).await?;

    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!("Failed to remove socket {}: {}", path.display(), e);
    }
    Ok(())
}

#[cfg(not(unix))]
async fn serve_on_socket(path: &Path, _app: Router) -> anyhow::Result<()> {
    anyhow::bail!("Unix sockets are not supported here: {}", path.display())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
