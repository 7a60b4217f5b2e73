//! Tracing subscriber setup shared by both binaries

use crate::config::ObservabilityConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor the configured level parse
const FALLBACK_FILTER: &str = "ocdsearch=info,tower_http=info";

/// Build the log filter: `RUST_LOG` wins, then `observability.log_level`
pub fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| {
            EnvFilter::try_new(format!(
                "ocdsearch={level},tower_http={level}",
                level = config.log_level
            ))
        })
        .unwrap_or_else(|_| FALLBACK_FILTER.into())
}

/// Install the global subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init_tracing(config: &ObservabilityConfig) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(config));

    if config.json_logs {
        registry.with(fmt::layer().json()).try_init()?;
    } else {
        registry.with(fmt::layer()).try_init()?;
    }

    Ok(())
}
