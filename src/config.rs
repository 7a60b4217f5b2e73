use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Search engine connection
    #[serde(default)]
    pub engine: EngineConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Search request defaults
    #[serde(default)]
    pub search: SearchConfig,

    /// Bulk ingestion defaults
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the embedded defaults, an optional file and the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("OCDS_CONFIG").unwrap_or_else(|_| "config/ocdsearch.toml".to_string());

        config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .add_source(config::File::with_name(&config_path).required(false))
            // Environment overrides, e.g. OCDS__ENGINE__URL
            .add_source(
                config::Environment::with_prefix("OCDS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Base URL of the engine REST API
    #[serde(default = "default_engine_url")]
    pub url: String,

    /// Per-request timeout (seconds)
    #[serde(default = "default_engine_timeout")]
    pub timeout_secs: u64,

    /// Retry requests that time out
    #[serde(default = "default_true")]
    pub retry_on_timeout: bool,

    /// Max retry attempts after the first timeout
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl EngineConfig {
    /// Point the client at `host`, as given on the command line.
    ///
    /// A bare host name gets the default scheme and port, so `es1` becomes
    /// `http://es1:9200` while `https://es1:443` is kept as is.
    pub fn with_host(mut self, host: &str) -> Self {
        self.url = normalize_engine_host(host);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: default_engine_url(),
            timeout_secs: default_engine_timeout(),
            retry_on_timeout: true,
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP bind port
    #[serde(default = "default_http_port")]
    pub port: u16,

    /// Unix domain socket to listen on instead of host and port
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_http_port(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Index queried when a request does not name one with `api`
    #[serde(default = "default_search_index")]
    pub default_index: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_index: default_search_index(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Target index name
    #[serde(default = "default_ingest_index")]
    pub index: String,

    /// Directory holding the JSON files
    #[serde(default = "default_ingest_path")]
    pub path: PathBuf,

    /// File name pattern inside `path`
    #[serde(default = "default_ingest_pattern")]
    pub pattern: String,

    /// Drop and recreate the index before ingesting
    #[serde(default)]
    pub delete: bool,

    /// Where to write the run's metrics in Prometheus text format
    #[serde(default)]
    pub metrics_file: Option<PathBuf>,
}

impl IngestConfig {
    /// Glob pattern for the files of one run
    pub fn glob_pattern(&self) -> String {
        self.path.join(&self.pattern).to_string_lossy().into_owned()
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            index: default_ingest_index(),
            path: default_ingest_path(),
            pattern: default_ingest_pattern(),
            delete: false,
            metrics_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            prometheus_enabled: true,
        }
    }
}

const DEFAULT_ENGINE_PORT: u16 = 9200;

fn normalize_engine_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    let with_scheme = if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    };

    let authority = with_scheme
        .split("://")
        .nth(1)
        .unwrap_or_default()
        .split('/')
        .next()
        .unwrap_or_default();

    // Bracketed IPv6 literals carry colons of their own
    let has_port = match authority.rfind(']') {
        Some(end) => authority[end..].contains(':'),
        None => authority.contains(':'),
    };

    if has_port {
        with_scheme
    } else {
        format!("{}:{}", with_scheme, DEFAULT_ENGINE_PORT)
    }
}

// Default value functions
fn default_engine_url() -> String {
    format!("http://localhost:{}", DEFAULT_ENGINE_PORT)
}

fn default_engine_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_search_index() -> String {
    "tenders".to_string()
}

fn default_ingest_index() -> String {
    "ocds_tenders".to_string()
}

fn default_ingest_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_ingest_pattern() -> String {
    "*.json".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();
        assert_eq!(config.engine.url, "http://localhost:9200");
        assert_eq!(config.engine.timeout_secs, 30);
        assert!(config.engine.retry_on_timeout);
        assert_eq!(config.server.port, 8080);
        assert!(config.server.path.is_none());
        assert_eq!(config.search.default_index, "tenders");
        assert_eq!(config.ingest.index, "ocds_tenders");
        assert!(!config.ingest.delete);
        assert!(config.ingest.metrics_file.is_none());
    }

    #[test]
    fn test_embedded_defaults_parse() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.engine.max_retries, 3);
        assert_eq!(config.ingest.pattern, "*.json");
        assert!(config.observability.prometheus_enabled);
    }

    #[test]
    fn test_engine_host_normalization() {
        assert_eq!(normalize_engine_host("localhost"), "http://localhost:9200");
        assert_eq!(normalize_engine_host("es1:9201"), "http://es1:9201");
        assert_eq!(
            normalize_engine_host("https://search.example.org:443/"),
            "https://search.example.org:443"
        );
        assert_eq!(normalize_engine_host("[::1]"), "http://[::1]:9200");
        assert_eq!(normalize_engine_host("[::1]:9300"), "http://[::1]:9300");
    }

    #[test]
    fn test_glob_pattern_joins_path() {
        let ingest = IngestConfig {
            path: PathBuf::from("/data/tenders"),
            ..Default::default()
        };
        assert_eq!(ingest.glob_pattern(), "/data/tenders/*.json");
    }
}
