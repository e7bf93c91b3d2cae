//! Gemini LLM provider implementation

use async_trait::async_trait;

use super::{CompletionProvider, ProviderError, NO_RESPONSE_PLACEHOLDER};
use crate::config::ProviderConfig;

/// `generateContent` adapter authenticated with a `key` query parameter
pub struct GeminiProvider {
    name: String,
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: &ProviderConfig, client: reqwest::Client) -> Self {
        Self {
            name: config.name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            client,
        }
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, query: &str) -> Result<String, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let request = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&serde_json::json!({
                "contents": [{"parts": [{"text": query}]}]
            }));

        let data = super::send_json(&self.name, request).await?;
        Ok(extract_text(&data))
    }

    async fn health_check(&self) -> bool {
        let request = self
            .client
            .get(format!("{}/models", self.base_url))
            .query(&[("key", self.api_key.as_str())]);
        super::check_reachable(&self.name, request).await
    }
}

/// `candidates[0].content.parts[0].text`, or the placeholder when absent
fn extract_text(data: &serde_json::Value) -> String {
    data.get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str())
        .unwrap_or(NO_RESPONSE_PLACEHOLDER)
        .to_string()
}
