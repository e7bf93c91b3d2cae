//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use llm_fanout::config::{Config, ProviderConfig, RateLimitConfig, RunMode};
use llm_fanout::llm::Dialect;
use wiremock::MockServer;

pub const TEST_KEY: &str = "test-key-0123456789abcdef";

pub fn provider(name: &str, dialect: Dialect, base_url: String, model: &str) -> ProviderConfig {
    ProviderConfig {
        name: name.to_string(),
        dialect,
        base_url,
        model: model.to_string(),
        api_key: TEST_KEY.to_string(),
        max_tokens: match dialect {
            Dialect::OpenAiCompatible => Some(1000),
            Dialect::Gemini => None,
        },
    }
}

/// ChatGPT, Gemini and Deepseek all pointed at one mock server under
/// `/openai/v1`, `/gemini/v1` and `/deepseek/v1`.
pub fn test_config(server: &MockServer) -> Config {
    let uri = server.uri();
    Config {
        port: 0,
        mode: RunMode::Production,
        request_timeout: Duration::from_millis(300),
        max_query_length: 50,
        providers: vec![
            provider(
                "ChatGPT",
                Dialect::OpenAiCompatible,
                format!("{}/openai/v1", uri),
                "gpt-3.5-turbo",
            ),
            provider(
                "Gemini",
                Dialect::Gemini,
                format!("{}/gemini/v1", uri),
                "gemini-pro",
            ),
            provider(
                "Deepseek",
                Dialect::OpenAiCompatible,
                format!("{}/deepseek/v1", uri),
                "deepseek-chat",
            ),
        ],
        allowed_origins: None,
        static_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("public"),
        rate_limit: RateLimitConfig {
            max_requests: NonZeroU32::new(1000).unwrap(),
            window: Duration::from_secs(60),
        },
        health_check_provider: "ChatGPT".to_string(),
    }
}

pub fn openai_answer(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

pub fn gemini_answer(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": {"parts": [{"text": text}], "role": "model"},
            "finishReason": "STOP"
        }]
    })
}
