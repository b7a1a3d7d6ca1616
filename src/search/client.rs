//! HTTP client for the search engine endpoint.

use async_trait::async_trait;
use serde_json::Value;

use crate::config::Config;
use crate::error::AppError;

/// Query + aggregate execution against the search engine, plus a liveness
/// ping. The engine's response is handed back as raw JSON; parsing is the
/// reconciler's job.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    async fn search(&self, body: &Value) -> Result<Value, AppError>;
    async fn ping(&self) -> Result<(), AppError>;
}

pub struct HttpSearchClient {
    client: reqwest::Client,
    base: String,
    index: String,
}

impl HttpSearchClient {
    pub fn new(cfg: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::internal_from("failed to build search client", e))?;
        Ok(HttpSearchClient {
            client,
            base: cfg.search_url.trim_end_matches('/').to_string(),
            index: cfg.search_index.clone(),
        })
    }
}

#[async_trait]
impl SearchEngine for HttpSearchClient {
    async fn search(&self, body: &Value) -> Result<Value, AppError> {
        let url = format!("{}/{}/_search", self.base, self.index);
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            tracing::error!(%status, %detail, "search engine rejected query");
            return Err(AppError::internal("search engine query failed"));
        }
        Ok(response.json::<Value>().await?)
    }

    async fn ping(&self) -> Result<(), AppError> {
        let response = self.client.get(&self.base).send().await?;
        if !response.status().is_success() {
            return Err(AppError::internal("search engine ping failed"));
        }
        Ok(())
    }
}
