//! HTTP client for communicating with formulad

use anyhow::{anyhow, Context, Result};
use formula_shared::{ErrorBody, FormulaRequest, FormulaResponse, GenerateFormulaBody, HealthResponse};
use std::time::Duration;

/// Client-side cap on a single request; the daemon answers within its model
/// deadline, so this only trips when the daemon itself hangs.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the formulad HTTP API
pub struct FormuladClient {
    client: reqwest::Client,
    base_url: String,
}

impl FormuladClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST /generate-formula
    pub async fn generate(&self, request: &FormulaRequest) -> Result<FormulaResponse> {
        let url = format!("{}/generate-formula", self.base_url);
        let body = GenerateFormulaBody {
            range: Some(request.range.clone()),
            description: Some(request.description.clone()),
            sample_data: request.sample_data.clone(),
        };

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Cannot reach formulad at {}", self.base_url))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<ErrorBody>(&text)
                .map(|e| e.error)
                .unwrap_or(text);
            return Err(anyhow!("formulad rejected the request ({}): {}", status, reason));
        }

        resp.json()
            .await
            .context("Failed to parse formulad response")
    }

    /// GET /health
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = format!("{}/health", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Cannot reach formulad at {}", self.base_url))?;

        if !resp.status().is_success() {
            anyhow::bail!("formulad health check failed ({})", resp.status());
        }

        resp.json().await.context("Failed to parse health response")
    }
}
