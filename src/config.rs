//! Process-wide configuration, loaded once at startup
//!
//! Every value comes from the environment (optionally seeded from `.env`).
//! The resulting [`Config`] is immutable and shared behind an `Arc`.

use std::num::NonZeroU32;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::llm::Dialect;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_MAX_QUERY_LENGTH: usize = 1000;
const DEFAULT_RATE_LIMIT_MAX: u32 = 100;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 15 * 60;
const DEFAULT_MAX_TOKENS: u32 = 1000;
const MIN_API_KEY_LENGTH: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid API key format for: {0}")]
    InvalidApiKey(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Whether internal error text may be shown to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Development,
    Production,
}

impl RunMode {
    /// Only `development`, `dev` and `test` enable development mode.
    fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("development" | "dev" | "test") => RunMode::Development,
            _ => RunMode::Production,
        }
    }

    pub fn exposes_details(self) -> bool {
        self != RunMode::Production
    }
}

/// Static description of one upstream LLM provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Display name, also the key in aggregate responses
    pub name: String,
    pub dialect: Dialect,
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_requests: NonZeroU32,
    pub window: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub mode: RunMode,
    pub request_timeout: Duration,
    pub max_query_length: usize,
    /// Providers in response key order
    pub providers: Vec<ProviderConfig>,
    /// `None` allows any origin
    pub allowed_origins: Option<Vec<String>>,
    pub static_dir: PathBuf,
    pub rate_limit: RateLimitConfig,
    pub health_check_provider: String,
}

/// Built-in provider table entry
struct KnownProvider {
    name: &'static str,
    dialect: Dialect,
    key_var: &'static str,
    base_url_var: &'static str,
    model_var: &'static str,
    default_base_url: &'static str,
    default_model: &'static str,
    required: bool,
}

const PROVIDERS: &[KnownProvider] = &[
    KnownProvider {
        name: "ChatGPT",
        dialect: Dialect::OpenAiCompatible,
        key_var: "OPENAI_API_KEY",
        base_url_var: "OPENAI_BASE_URL",
        model_var: "OPENAI_MODEL",
        default_base_url: "https://api.openai.com/v1",
        default_model: "gpt-3.5-turbo",
        required: true,
    },
    KnownProvider {
        name: "Gemini",
        dialect: Dialect::Gemini,
        key_var: "GEMINI_API_KEY",
        base_url_var: "GEMINI_BASE_URL",
        model_var: "GEMINI_MODEL",
        default_base_url: "https://generativelanguage.googleapis.com/v1",
        default_model: "gemini-pro",
        required: true,
    },
    KnownProvider {
        name: "Deepseek",
        dialect: Dialect::OpenAiCompatible,
        key_var: "DEEPSEEK_API_KEY",
        base_url_var: "DEEPSEEK_BASE_URL",
        model_var: "DEEPSEEK_MODEL",
        default_base_url: "https://api.deepseek.com/v1",
        default_model: "deepseek-chat",
        required: true,
    },
    KnownProvider {
        name: "Copilot",
        dialect: Dialect::OpenAiCompatible,
        key_var: "COPILOT_API_KEY",
        base_url_var: "COPILOT_BASE_URL",
        model_var: "COPILOT_MODEL",
        default_base_url: "https://api.copilot.microsoft.com/v1",
        default_model: "copilot",
        required: false,
    },
];

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let providers = PROVIDERS
            .iter()
            .map(|known| provider_from_lookup(known, &lookup))
            .filter_map(Result::transpose)
            .collect::<Result<Vec<_>, _>>()?;

        let max_requests: u32 = parse_var(&lookup, "RATE_LIMIT_MAX", DEFAULT_RATE_LIMIT_MAX)?;
        let max_requests =
            NonZeroU32::new(max_requests).ok_or_else(|| ConfigError::InvalidValue {
                key: "RATE_LIMIT_MAX",
                value: max_requests.to_string(),
            })?;
        let window_secs: u64 = parse_var(
            &lookup,
            "RATE_LIMIT_WINDOW_SECS",
            DEFAULT_RATE_LIMIT_WINDOW_SECS,
        )?;
        if window_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "RATE_LIMIT_WINDOW_SECS",
                value: window_secs.to_string(),
            });
        }

        let timeout_ms: u64 = parse_var(&lookup, "API_TIMEOUT", DEFAULT_TIMEOUT_MS)?;
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "API_TIMEOUT",
                value: timeout_ms.to_string(),
            });
        }

        let allowed_origins = non_empty(&lookup, "ALLOWED_ORIGINS").map(|origins| {
            origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect()
        });

        Ok(Config {
            port: parse_var(&lookup, "PORT", DEFAULT_PORT)?,
            mode: RunMode::parse(lookup("APP_ENV").as_deref()),
            request_timeout: Duration::from_millis(timeout_ms),
            max_query_length: parse_var(&lookup, "MAX_QUERY_LENGTH", DEFAULT_MAX_QUERY_LENGTH)?,
            providers,
            allowed_origins,
            static_dir: non_empty(&lookup, "STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("public")),
            rate_limit: RateLimitConfig {
                max_requests,
                window: Duration::from_secs(window_secs),
            },
            health_check_provider: non_empty(&lookup, "HEALTH_CHECK_PROVIDER")
                .unwrap_or_else(|| "ChatGPT".to_string()),
        })
    }
}

/// Returns `Ok(None)` for an optional provider whose key is not set.
fn provider_from_lookup<F>(
    known: &KnownProvider,
    lookup: &F,
) -> Result<Option<ProviderConfig>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let api_key = match non_empty(lookup, known.key_var) {
        Some(key) => key,
        None if known.required => return Err(ConfigError::MissingVar(known.key_var)),
        None => return Ok(None),
    };
    if api_key.len() < MIN_API_KEY_LENGTH {
        return Err(ConfigError::InvalidApiKey(known.key_var));
    }

    let max_tokens = match known.dialect {
        Dialect::OpenAiCompatible => Some(DEFAULT_MAX_TOKENS),
        Dialect::Gemini => None,
    };

    Ok(Some(ProviderConfig {
        name: known.name.to_string(),
        dialect: known.dialect,
        base_url: non_empty(lookup, known.base_url_var)
            .unwrap_or_else(|| known.default_base_url.to_string()),
        model: non_empty(lookup, known.model_var).unwrap_or_else(|| known.default_model.to_string()),
        api_key,
        max_tokens,
    }))
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match non_empty(lookup, key) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(default),
    }
}
