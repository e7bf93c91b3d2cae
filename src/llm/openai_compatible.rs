//! OpenAI-Compatible API Provider
//! Supports any service that implements the OpenAI Chat Completions API format
//! (e.g., OpenAI, DeepSeek, Copilot, local deployments)

use async_trait::async_trait;
use serde::Serialize;

use super::{CompletionProvider, ProviderError, NO_RESPONSE_PLACEHOLDER};
use crate::config::ProviderConfig;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Chat Completions adapter authenticated with a bearer token
pub struct OpenAiCompatibleProvider {
    name: String,
    base_url: String,
    model: String,
    api_key: String,
    max_tokens: Option<u32>,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: &ProviderConfig, client: reqwest::Client) -> Self {
        Self {
            name: config.name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            max_tokens: config.max_tokens,
            client,
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, query: &str) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: query,
            }],
            max_tokens: self.max_tokens,
        };

        let request = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request);

        let data = super::send_json(&self.name, request).await?;
        Ok(extract_content(&data))
    }

    async fn health_check(&self) -> bool {
        let request = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key);
        super::check_reachable(&self.name, request).await
    }
}

/// `choices[0].message.content`, or the placeholder when that path is absent.
/// Only the first choice is inspected; later entries may have any shape.
fn extract_content(data: &serde_json::Value) -> String {
    data.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .unwrap_or(NO_RESPONSE_PLACEHOLDER)
        .to_string()
}
