//! LLM provider adapters behind one completion interface
//! Supports Gemini and OpenAI-compatible APIs (ChatGPT, DeepSeek, Copilot)

pub mod error;
pub mod gemini;
pub mod openai_compatible;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::ProviderConfig;

pub use error::{ErrorKind, ProviderError};

/// Text returned when an upstream answers successfully but the expected
/// field is missing from its response body.
pub const NO_RESPONSE_PLACEHOLDER: &str = "No response";

/// Wire format family spoken by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    OpenAiCompatible,
    Gemini,
}

/// One upstream LLM behind a uniform call signature
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Display name, used as the response key
    fn name(&self) -> &str;

    /// Send `query` and return the answer text, or a classified failure
    async fn complete(&self, query: &str) -> Result<String, ProviderError>;

    /// Cheap reachability check against the provider's models listing
    async fn health_check(&self) -> bool;
}

/// Build the HTTP client shared by every adapter
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(timeout).build()
}

/// Instantiate one adapter per configured provider, preserving order
pub fn build_providers(
    providers: &[ProviderConfig],
    client: &reqwest::Client,
) -> Vec<Arc<dyn CompletionProvider>> {
    providers
        .iter()
        .map(|config| -> Arc<dyn CompletionProvider> {
            match config.dialect {
                Dialect::OpenAiCompatible => Arc::new(
                    openai_compatible::OpenAiCompatibleProvider::new(config, client.clone()),
                ),
                Dialect::Gemini => {
                    Arc::new(gemini::GeminiProvider::new(config, client.clone()))
                }
            }
        })
        .collect()
}

/// Send a prepared request and return its JSON body.
///
/// A 2xx body that is not JSON comes back as `Value::Null` so the caller's
/// extraction falls through to [`NO_RESPONSE_PLACEHOLDER`].
pub(crate) async fn send_json(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<serde_json::Value, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::from_reqwest(provider, e))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(ProviderError::from_status(provider, status, &error_text));
    }

    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::from_reqwest(provider, e))?;

    Ok(serde_json::from_str(&body).unwrap_or_else(|e| {
        tracing::debug!("{} returned a non-JSON body: {}", provider, e);
        serde_json::Value::Null
    }))
}

/// Issue a health request; any 2xx counts as reachable
pub(crate) async fn check_reachable(provider: &str, request: reqwest::RequestBuilder) -> bool {
    match request.send().await {
        Ok(r) if r.status().is_success() => true,
        Ok(r) => {
            tracing::warn!("{} health check returned {}", provider, r.status());
            false
        }
        Err(e) => {
            tracing::warn!("{} health check failed: {}", provider, e);
            false
        }
    }
}
