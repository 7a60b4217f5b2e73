//! Elasticsearch REST client

use crate::config::EngineConfig;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::SearchEngine;
use crate::metrics::{record_engine_request, ENGINE_RETRIES_TOTAL};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Engine client speaking the Elasticsearch REST API
#[derive(Clone)]
pub struct ElasticClient {
    client: Client,
    base_url: String,
    retry_on_timeout: bool,
    max_retries: u32,
}

impl ElasticClient {
    /// Create a client for the engine described by `config`
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        let base_url = config.url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url).map_err(|e| {
            EngineError::InvalidConfiguration(format!("Invalid engine URL '{}': {}", config.url, e))
        })?;

        if config.timeout_secs == 0 {
            return Err(EngineError::InvalidConfiguration(
                "Engine timeout must be at least one second".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                EngineError::InvalidConfiguration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url,
            retry_on_timeout: config.retry_on_timeout,
            max_retries: config.max_retries,
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Send a request, retrying it while it times out and the policy allows
    async fn send<F>(&self, operation: &'static str, request: F) -> EngineResult<Response>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match request().send().await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_timeout() => {
                    if self.retry_on_timeout && attempts <= self.max_retries {
                        warn!(operation, attempts, "Engine request timed out, retrying");
                        ENGINE_RETRIES_TOTAL.with_label_values(&[operation]).inc();
                        continue;
                    }
                    record_engine_request(operation, false);
                    return Err(EngineError::Timeout { attempts });
                }
                Err(e) => {
                    record_engine_request(operation, false);
                    return Err(e.into());
                }
            }
        }
    }

    /// Turn a non-success status into `EngineError::Status`
    async fn expect_success(operation: &'static str, response: Response) -> EngineResult<Response> {
        let status = response.status();
        if status.is_success() {
            record_engine_request(operation, true);
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        record_engine_request(operation, false);
        Err(EngineError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl SearchEngine for ElasticClient {
    async fn index_exists(&self, index: &str) -> EngineResult<bool> {
        let url = self.url(index);
        let response = self
            .send("index_exists", || self.client.head(url.as_str()))
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                record_engine_request("index_exists", true);
                Ok(false)
            }
            _ => Self::expect_success("index_exists", response).await.map(|_| true),
        }
    }

    async fn create_index(&self, index: &str, body: &Value) -> EngineResult<()> {
        let url = self.url(index);
        let response = self
            .send("create_index", || self.client.put(url.as_str()).json(body))
            .await?;
        Self::expect_success("create_index", response).await?;
        debug!(index, "Index created");
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> EngineResult<()> {
        let url = self.url(index);
        let response = self
            .send("delete_index", || self.client.delete(url.as_str()))
            .await?;
        Self::expect_success("delete_index", response).await?;
        debug!(index, "Index deleted");
        Ok(())
    }

    async fn index_document(
        &self,
        index: &str,
        doc_type: &str,
        document: &Value,
    ) -> EngineResult<()> {
        let url = self.url(&format!("{}/{}", index, doc_type));
        let response = self
            .send("index_document", || self.client.post(url.as_str()).json(document))
            .await?;
        Self::expect_success("index_document", response).await?;
        Ok(())
    }

    async fn search(&self, index: &str, body: &Value, from: u64) -> EngineResult<Value> {
        let url = self.url(&format!("{}/_search", index));
        let response = self
            .send("search", || {
                self.client
                    .post(url.as_str())
                    .query(&[("from", from)])
                    .json(body)
            })
            .await?;

        // Engine-side errors come back as JSON and are handed to the caller as-is
        let status = response.status();
        let bytes = response.bytes().await.map_err(EngineError::from)?;
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => {
                record_engine_request("search", status.is_success());
                Ok(value)
            }
            Err(e) if status.is_success() => {
                record_engine_request("search", false);
                Err(EngineError::Decode(e.to_string()))
            }
            Err(_) => {
                record_engine_request("search", false);
                Err(EngineError::Status {
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(&bytes).into_owned(),
                })
            }
        }
    }

    async fn index_stats(&self, index: &str) -> EngineResult<Value> {
        let url = self.url(&format!("{}/_stats", index));
        let response = self
            .send("index_stats", || self.client.get(url.as_str()))
            .await?;
        let response = Self::expect_success("index_stats", response).await?;
        response.json::<Value>().await.map_err(EngineError::from)
    }
}
