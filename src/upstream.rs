//! HTTP client for the OpenAI-compatible gateway.
//!
//! This is the only module that performs network I/O. Each call is a single
//! request with a bounded wait; nothing is retried here.

use crate::error::{RelayError, Result};
use crate::translate::openai_types::{ChatCompletionRequest, ChatCompletionResponse, ModelsResponse};

use std::time::Duration;
use tracing::debug;

pub const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";
pub const MODELS_PATH: &str = "/models";

/// Everything the client needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    settings: UpstreamSettings,
    http: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(settings: UpstreamSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| RelayError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { settings, http })
    }

    /// Default model identifier put on every completion request.
    pub fn model(&self) -> &str {
        &self.settings.model
    }

    pub fn base_url(&self) -> &str {
        &self.settings.base_url
    }

    /// POST a completion request.
    ///
    /// # Errors
    /// `Config` when the credential or base URL is missing (no request is
    /// made), `Upstream` for non-2xx answers and network failures,
    /// `UpstreamShape` when a 2xx body is not JSON or lacks `choices`.
    pub async fn send(&self, req: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let api_key = self.credential()?;
        let url = self.endpoint(CHAT_COMPLETIONS_PATH)?;

        debug!(%url, model = %req.model, messages = req.messages.len(), "POST completion");

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(req)
            .send()
            .await
            .map_err(|e| transport_error(&url, &e))?;

        let body = success_body(&url, response).await?;

        let value: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            RelayError::upstream_shape(format!("Completion body is not JSON: {e}"))
        })?;
        if value.get("choices").is_none() {
            return Err(RelayError::upstream_shape(
                "Completion body has no 'choices' field",
            ));
        }

        serde_json::from_value(value)
            .map_err(|e| RelayError::upstream_shape(format!("Malformed completion body: {e}")))
    }

    /// GET the gateway's model identifiers, in the order it lists them.
    ///
    /// # Errors
    /// Same taxonomy as [`UpstreamClient::send`]; a body without `data` is
    /// an `UpstreamShape` error.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let api_key = self.credential()?;
        let url = self.endpoint(MODELS_PATH)?;

        debug!(%url, "GET models");

        let response = self
            .http
            .get(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .send()
            .await
            .map_err(|e| transport_error(&url, &e))?;

        let body = success_body(&url, response).await?;

        let parsed: ModelsResponse = serde_json::from_str(&body)
            .map_err(|e| RelayError::upstream_shape(format!("Malformed models body: {e}")))?;

        Ok(parsed.data.into_iter().map(|m| m.id).collect())
    }

    fn credential(&self) -> Result<&str> {
        let key = self.settings.api_key.trim();
        if key.is_empty() {
            return Err(RelayError::config(
                "No API key configured for the upstream gateway",
            ));
        }
        Ok(key)
    }

    fn endpoint(&self, path: &str) -> Result<String> {
        let base = self.settings.base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(RelayError::config("No upstream base URL configured"));
        }
        Ok(format!("{base}{path}"))
    }
}

/// Read the body, turning a non-2xx status into an `Upstream` error that
/// keeps the status and the body text as received.
async fn success_body(url: &str, response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(url, &e))?;

    debug!(status = status.as_u16(), body_len = body.len(), "Upstream response");

    if !status.is_success() {
        return Err(RelayError::upstream_http(status.as_u16(), body));
    }
    Ok(body)
}

fn transport_error(url: &str, e: &reqwest::Error) -> RelayError {
    if e.is_timeout() {
        RelayError::transport(format!("Request to {url} timed out: {e}"))
    } else {
        RelayError::transport(format!("Request to {url} failed: {e}"))
    }
}
