//! `CoreClient` (SPEC_FULL §4.10): the facade's abstraction over the
//! Stateless Core Service, with an in-process implementation (the
//! teacher's/spec's preferred collapse of the adapter layer) and an HTTP
//! implementation for when Core runs as a separate process.
//!
//! Grounded on `original_source/lit_platform/core_client.py`'s `CoreClient`
//! (retry-with-backoff HTTP adapter) for the HTTP variant.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use lc_domain::error::{Error, Result};
use lc_providers::registry::ModelRegistry;

use lc_core::contracts::{AnalyzeRequest, AnalyzeResponse, DiscussRequest, DiscussResponse, ReEvaluateRequest, ReEvaluateResponse};

#[async_trait]
pub trait CoreClient: Send + Sync {
    async fn analyze(&self, req: AnalyzeRequest) -> Result<AnalyzeResponse>;
    async fn discuss(&self, req: DiscussRequest) -> Result<DiscussResponse>;
    async fn re_evaluate(&self, req: ReEvaluateRequest) -> Result<ReEvaluateResponse>;
}

/// Calls `lc_core::service` functions directly — no HTTP round trip, no
/// serialization.
pub struct InProcessCoreClient {
    registry: Arc<ModelRegistry>,
}

impl InProcessCoreClient {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl CoreClient for InProcessCoreClient {
    async fn analyze(&self, req: AnalyzeRequest) -> Result<AnalyzeResponse> {
        lc_core::service::analyze(&self.registry, req).await
    }

    async fn discuss(&self, req: DiscussRequest) -> Result<DiscussResponse> {
        lc_core::service::discuss(&self.registry, req).await
    }

    async fn re_evaluate(&self, req: ReEvaluateRequest) -> Result<ReEvaluateResponse> {
        lc_core::service::re_evaluate(&self.registry, req).await
    }
}

/// HTTP adapter for a Core Service running as a separate process.
/// Retries 5xx/transport failures with linear backoff, mirroring the
/// teacher's manual-retry convention rather than pulling in `tower`'s
/// retry layer (§4.9).
pub struct HttpCoreClient {
    client: reqwest::Client,
    base_url: String,
    retry_attempts: u32,
    retry_backoff: Duration,
}

impl HttpCoreClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self { client, base_url: base_url.into().trim_end_matches('/').to_string(), retry_attempts: 3, retry_backoff: Duration::from_millis(250) })
    }

    async fn post_json<Req: serde::Serialize + Sync, Resp: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        req: &Req,
    ) -> Result<Resp> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self.client.post(&url).json(req).send().await;
            match result {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp.json::<Resp>().await.map_err(|e| Error::Http(e.to_string()));
                    }
                    let body = resp.text().await.unwrap_or_default();
                    if status.is_server_error() && attempt < self.retry_attempts {
                        tokio::time::sleep(self.retry_backoff * attempt).await;
                        continue;
                    }
                    return Err(Error::Http(format!("core API error {status}: {body}")));
                }
                Err(e) if attempt < self.retry_attempts && (e.is_timeout() || e.is_connect()) => {
                    tokio::time::sleep(self.retry_backoff * attempt).await;
                    continue;
                }
                Err(e) => return Err(Error::Http(e.to_string())),
            }
        }
    }
}

#[async_trait]
impl CoreClient for HttpCoreClient {
    async fn analyze(&self, req: AnalyzeRequest) -> Result<AnalyzeResponse> {
        self.post_json("/v1/analyze", &req).await
    }

    async fn discuss(&self, req: DiscussRequest) -> Result<DiscussResponse> {
        self.post_json("/v1/discuss", &req).await
    }

    async fn re_evaluate(&self, req: ReEvaluateRequest) -> Result<ReEvaluateResponse> {
        self.post_json("/v1/re-evaluate-finding", &req).await
    }
}
