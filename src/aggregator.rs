//! Concurrent fan-out of one query to every configured provider

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tokio::task::JoinError;
use tracing::{debug, info, warn, Instrument};

use crate::llm::{CompletionProvider, ProviderError};
use crate::query::Query;

/// Settled result of one provider call
pub type ProviderOutcome = Result<String, ProviderError>;

/// Failure of the fan-out itself, never of an individual provider
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("provider task for {provider} did not complete: {source}")]
    TaskFailed {
        provider: String,
        #[source]
        source: JoinError,
    },
}

/// Outcomes keyed by provider name, in configured provider order.
///
/// Serializes to `{"<name>": "<text>" | {"error": true, "message": .., "details"?: ..}}`.
#[derive(Debug)]
pub struct AggregateResponse {
    outcomes: IndexMap<String, ProviderOutcome>,
    expose_details: bool,
}

impl AggregateResponse {
    pub fn get(&self, provider: &str) -> Option<&ProviderOutcome> {
        self.outcomes.get(provider)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProviderOutcome)> {
        self.outcomes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn failures(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_err()).count()
    }
}

#[derive(serde::Serialize)]
struct ErrorEntry<'a> {
    error: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a str>,
}

impl Serialize for AggregateResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.outcomes.len()))?;
        for (provider, outcome) in &self.outcomes {
            match outcome {
                Ok(text) => map.serialize_entry(provider, text)?,
                Err(e) => map.serialize_entry(
                    provider,
                    &ErrorEntry {
                        error: true,
                        message: e.to_string(),
                        details: self.expose_details.then_some(e.details.as_str()),
                    },
                )?,
            }
        }
        map.end()
    }
}

/// Dispatches a query to all providers and waits for every one to settle
pub struct Aggregator {
    providers: Vec<Arc<dyn CompletionProvider>>,
    timeout: Duration,
    expose_details: bool,
}

impl Aggregator {
    pub fn new(
        providers: Vec<Arc<dyn CompletionProvider>>,
        timeout: Duration,
        expose_details: bool,
    ) -> Self {
        Self {
            providers,
            timeout,
            expose_details,
        }
    }

    pub fn provider(&self, name: &str) -> Option<&Arc<dyn CompletionProvider>> {
        self.providers.iter().find(|p| p.name() == name)
    }

    pub fn provider_names(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|p| p.name())
    }

    /// Call every provider concurrently and collect all outcomes.
    ///
    /// Each call runs in its own task under the configured timeout, so a slow
    /// or failing provider never delays or aborts the others beyond that bound.
    pub async fn fan_out(&self, query: &Query) -> Result<AggregateResponse, AggregateError> {
        info!(
            "Dispatching query ({} chars) to {} providers",
            query.as_str().chars().count(),
            self.providers.len()
        );

        let tasks = self.providers.iter().map(|provider| {
            let provider = Arc::clone(provider);
            let query = query.as_str().to_string();
            let timeout = self.timeout;

            tokio::spawn(
                async move {
                    debug!("Calling provider {}", provider.name());
                    match tokio::time::timeout(timeout, provider.complete(&query)).await {
                        Ok(outcome) => outcome,
                        Err(_) => Err(ProviderError::timeout(provider.name(), timeout)),
                    }
                }
                .in_current_span(),
            )
        });

        let results = join_all(tasks).await;

        let mut outcomes = IndexMap::with_capacity(self.providers.len());
        for (provider, joined) in self.providers.iter().zip(results) {
            let outcome = joined.map_err(|source| AggregateError::TaskFailed {
                provider: provider.name().to_string(),
                source,
            })?;

            match &outcome {
                Ok(text) => debug!("{} answered ({} chars)", provider.name(), text.len()),
                Err(e) => warn!(
                    provider = provider.name(),
                    kind = ?e.kind,
                    "{} API Error: {}",
                    provider.name(),
                    e.details
                ),
            }
            outcomes.insert(provider.name().to_string(), outcome);
        }

        let response = AggregateResponse {
            outcomes,
            expose_details: self.expose_details,
        };
        info!(
            "Aggregation completed: {} of {} providers failed",
            response.failures(),
            response.len()
        );

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ErrorKind;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum Behavior {
        Answer(&'static str),
        Fail(ErrorKind),
        Hang,
        Panic,
    }

    struct FakeProvider {
        name: &'static str,
        delay: Duration,
        behavior: Behavior,
        calls: AtomicUsize,
        received: Mutex<Vec<String>>,
    }

    impl FakeProvider {
        fn new(name: &'static str, behavior: Behavior) -> Arc<Self> {
            Self::delayed(name, Duration::ZERO, behavior)
        }

        fn delayed(name: &'static str, delay: Duration, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                name,
                delay,
                behavior,
                calls: AtomicUsize::new(0),
                received: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionProvider for FakeProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn complete(&self, query: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.received.lock().unwrap().push(query.to_string());
            tokio::time::sleep(self.delay).await;
            match &self.behavior {
                Behavior::Answer(text) => Ok(format!("{}: {}", text, query)),
                Behavior::Fail(kind) => Err(ProviderError::new(self.name, *kind, "boom")),
                Behavior::Hang => std::future::pending().await,
                Behavior::Panic => panic!("adapter defect"),
            }
        }

        async fn health_check(&self) -> bool {
            true
        }
    }

    fn aggregator(providers: Vec<Arc<FakeProvider>>, expose_details: bool) -> Aggregator {
        let providers = providers
            .into_iter()
            .map(|p| p as Arc<dyn CompletionProvider>)
            .collect();
        Aggregator::new(providers, Duration::from_secs(5), expose_details)
    }

    fn query(text: &str) -> Query {
        Query::new(text, 100).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn one_entry_per_provider_in_configured_order() {
        // Later providers finish first
        let agg = aggregator(
            vec![
                FakeProvider::delayed("ChatGPT", Duration::from_millis(300), Behavior::Answer("a")),
                FakeProvider::delayed("Gemini", Duration::from_millis(200), Behavior::Answer("b")),
                FakeProvider::delayed("Deepseek", Duration::from_millis(100), Behavior::Answer("c")),
            ],
            false,
        );

        let response = agg.fan_out(&query("hi")).await.unwrap();

        let keys: Vec<_> = response.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["ChatGPT", "Gemini", "Deepseek"]);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"ChatGPT": "a: hi", "Gemini": "b: hi", "Deepseek": "c: hi"})
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_only_affects_the_slow_provider() {
        let fast = FakeProvider::new("ChatGPT", Behavior::Answer("4"));
        let slow = FakeProvider::new("Gemini", Behavior::Hang);
        let unauthorized = FakeProvider::new("Deepseek", Behavior::Fail(ErrorKind::AuthFailed));
        let agg = aggregator(vec![fast, slow, unauthorized], false);

        let response = agg.fan_out(&query("What is 2+2?")).await.unwrap();

        assert_eq!(
            response.get("Gemini").unwrap().as_ref().unwrap_err().kind,
            ErrorKind::Timeout
        );
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "ChatGPT": "4: What is 2+2?",
                "Gemini": {"error": true, "message": "Gemini timeout"},
                "Deepseek": {"error": true, "message": "Deepseek authentication failed"}
            })
        );
    }

    #[tokio::test]
    async fn total_failure_is_still_a_response() {
        let agg = aggregator(
            vec![
                FakeProvider::new("ChatGPT", Behavior::Fail(ErrorKind::RateLimited)),
                FakeProvider::new("Gemini", Behavior::Fail(ErrorKind::NoResponse)),
                FakeProvider::new("Deepseek", Behavior::Fail(ErrorKind::UpstreamError(503))),
            ],
            false,
        );

        let response = agg.fan_out(&query("hello")).await.unwrap();

        assert_eq!(response.len(), 3);
        assert_eq!(response.failures(), 3);
        let body = serde_json::to_value(&response).unwrap();
        assert_eq!(body["Deepseek"]["message"], "Deepseek API error: 503");
        assert_eq!(body["ChatGPT"]["message"], "ChatGPT rate limit exceeded");
        assert!(body["Gemini"].get("details").is_none());
    }

    #[tokio::test]
    async fn details_are_exposed_only_when_enabled() {
        let agg = aggregator(
            vec![FakeProvider::new("Gemini", Behavior::Fail(ErrorKind::NoResponse))],
            true,
        );

        let body = serde_json::to_value(agg.fan_out(&query("hello")).await.unwrap()).unwrap();
        assert_eq!(
            body,
            json!({"Gemini": {"error": true, "message": "Gemini no response received", "details": "boom"}})
        );
    }

    #[tokio::test]
    async fn every_provider_is_called_once_with_the_query() {
        let providers = vec![
            FakeProvider::new("ChatGPT", Behavior::Answer("a")),
            FakeProvider::new("Gemini", Behavior::Fail(ErrorKind::Timeout)),
        ];
        let agg = aggregator(providers.clone(), false);

        agg.fan_out(&query("  spaced  ")).await.unwrap();

        for provider in &providers {
            assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
            assert_eq!(*provider.received.lock().unwrap(), ["spaced"]);
        }
    }

    #[tokio::test]
    async fn panicking_adapter_is_an_aggregate_defect() {
        let agg = aggregator(
            vec![
                FakeProvider::new("ChatGPT", Behavior::Answer("a")),
                FakeProvider::new("Gemini", Behavior::Panic),
            ],
            false,
        );

        let err = agg.fan_out(&query("hello")).await.unwrap_err();
        assert!(matches!(
            err,
            AggregateError::TaskFailed { ref provider, .. } if provider == "Gemini"
        ));
    }

    #[test]
    fn provider_lookup_by_name() {
        let agg = aggregator(
            vec![
                FakeProvider::new("ChatGPT", Behavior::Answer("a")),
                FakeProvider::new("Gemini", Behavior::Answer("b")),
            ],
            false,
        );

        assert!(agg.provider("Gemini").is_some());
        assert!(agg.provider("Copilot").is_none());
        assert_eq!(agg.provider_names().collect::<Vec<_>>(), ["ChatGPT", "Gemini"]);
    }
}
