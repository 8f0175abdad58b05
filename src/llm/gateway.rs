// Copyright 2025 Cowboy AI, LLC.

//! LLM gateway — the single entry point for model calls
//!
//! Wraps a primary client (and an optional fallback) with retry and
//! exponential backoff, an in-memory response cache keyed on
//! prompt+system+temperature, and process-global cost/latency counters.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::client::{LlmClient, LlmFailure, LlmFailureKind, LlmRequest, LlmResponse};
use crate::errors::{KgError, KgResult};

/// Process-global gateway counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayStats {
    /// Calls received
    pub total_requests: u64,
    /// Calls served from cache
    pub cache_hits: u64,
    /// Calls answered by the primary client
    pub primary_success: u64,
    /// Calls answered by the fallback client
    pub fallback_success: u64,
    /// Calls that failed after retries and fallback
    pub total_failures: u64,
    /// Tokens consumed across all successful calls
    pub total_tokens: u64,
    /// Accumulated latency across all successful calls
    pub total_latency_ms: u64,
}

/// Retry/backoff + cache + fallback wrapper over [`LlmClient`]s
pub struct LlmGateway {
    primary: Arc<dyn LlmClient>,
    fallback: Option<Arc<dyn LlmClient>>,
    max_retries: u32,
    base_delay: Duration,
    cache: Option<Mutex<LruCache<String, LlmResponse>>>,
    stats: Mutex<GatewayStats>,
}

impl LlmGateway {
    /// Build a gateway over a primary client
    pub fn new(primary: Arc<dyn LlmClient>, max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            primary,
            fallback: None,
            max_retries: max_retries.max(1),
            base_delay: Duration::from_millis(base_delay_ms),
            cache: None,
            stats: Mutex::new(GatewayStats::default()),
        }
    }

    /// Attach a fallback client consulted when the primary fails retryably
    pub fn with_fallback(mut self, fallback: Arc<dyn LlmClient>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Enable the response cache with the given capacity
    pub fn with_cache(mut self, capacity: usize) -> Self {
        self.cache = NonZeroUsize::new(capacity).map(|c| Mutex::new(LruCache::new(c)));
        self
    }

    /// Generate a completion, retrying and falling back as configured
    pub async fn generate(&self, request: &LlmRequest) -> KgResult<LlmResponse> {
        if let Ok(mut stats) = self.stats.lock() {
            stats.total_requests += 1;
        }

        let cache_key = Self::cache_key(request);
        if let Some(cache) = &self.cache {
            if let Ok(mut cache) = cache.lock() {
                if let Some(hit) = cache.get(&cache_key) {
                    let mut response = hit.clone();
                    response.cached = true;
                    if let Ok(mut stats) = self.stats.lock() {
                        stats.cache_hits += 1;
                    }
                    return Ok(response);
                }
            }
        }

        let (primary_result, last_failure) =
            self.try_with_retry(self.primary.as_ref(), request).await;

        if let Some(response) = primary_result {
            self.record_success(&response, false);
            self.cache_store(&cache_key, &response);
            return Ok(response);
        }

        let failure = last_failure
            .unwrap_or_else(|| LlmFailure::new(LlmFailureKind::Unknown, "no attempts made"));

        if failure.retryable() {
            if let Some(fallback) = &self.fallback {
                tracing::warn!(
                    primary = self.primary.name(),
                    fallback = fallback.name(),
                    error = %failure,
                    "primary LLM failed, trying fallback"
                );
                let (fallback_result, fallback_failure) =
                    self.try_with_retry(fallback.as_ref(), request).await;
                if let Some(response) = fallback_result {
                    self.record_success(&response, true);
                    self.cache_store(&cache_key, &response);
                    return Ok(response);
                }
                if let Ok(mut stats) = self.stats.lock() {
                    stats.total_failures += 1;
                }
                return Err(fallback_failure.unwrap_or(failure).into());
            }
        }

        if let Ok(mut stats) = self.stats.lock() {
            stats.total_failures += 1;
        }
        Err(failure.into())
    }

    /// Generate and parse a JSON object, stripping Markdown fences if present
    pub async fn generate_json(&self, request: &LlmRequest) -> KgResult<serde_json::Value> {
        let mut request = request.clone();
        request.json_mode = true;
        let response = self.generate(&request).await?;
        let content = strip_json_fences(&response.content);
        serde_json::from_str(content).map_err(|e| KgError::LlmService {
            kind: LlmFailureKind::Parse.as_str().to_string(),
            message: format!("JSON parse error: {e}"),
            retryable: false,
        })
    }

    /// Whether the primary backend is reachable
    pub async fn health_check(&self) -> bool {
        self.primary.health_check().await
    }

    /// Current counters
    pub fn stats(&self) -> GatewayStats {
        self.stats.lock().map(|s| *s).unwrap_or_default()
    }

    async fn try_with_retry(
        &self,
        client: &dyn LlmClient,
        request: &LlmRequest,
    ) -> (Option<LlmResponse>, Option<LlmFailure>) {
        let mut last_failure = None;
        for attempt in 0..self.max_retries {
            match client.generate(request).await {
                Ok(response) => return (Some(response), None),
                Err(failure) => {
                    let retryable = failure.retryable();
                    if !retryable {
                        tracing::error!(client = client.name(), error = %failure, "non-retryable LLM error");
                        return (None, Some(failure));
                    }
                    let delay = self.base_delay * 2u32.pow(attempt);
                    tracing::warn!(
                        client = client.name(),
                        attempt = attempt + 1,
                        max = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %failure,
                        "retrying LLM call"
                    );
                    last_failure = Some(failure);
                    if attempt + 1 < self.max_retries {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        (None, last_failure)
    }

    fn record_success(&self, response: &LlmResponse, from_fallback: bool) {
        if let Ok(mut stats) = self.stats.lock() {
            if from_fallback {
                stats.fallback_success += 1;
            } else {
                stats.primary_success += 1;
            }
            stats.total_tokens += response.total_tokens();
            stats.total_latency_ms += response.latency_ms;
        }
    }

    fn cache_store(&self, key: &str, response: &LlmResponse) {
        if let Some(cache) = &self.cache {
            if let Ok(mut cache) = cache.lock() {
                cache.put(key.to_string(), response.clone());
            }
        }
    }

    fn cache_key(request: &LlmRequest) -> String {
        format!(
            "{}::{}::{:.3}",
            request.prompt,
            request.system_prompt.as_deref().unwrap_or(""),
            request.temperature
        )
    }
}

fn strip_json_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop an optional language tag on the fence line
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockLlmClient;

    fn gateway_with(mock: MockLlmClient) -> LlmGateway {
        LlmGateway::new(Arc::new(mock), 3, 1)
    }

    #[tokio::test]
    async fn success_path_updates_counters() {
        let mock = MockLlmClient::new().with_response("fine");
        let gw = gateway_with(mock);

        let response = gw.generate(&LlmRequest::new("hi", 0.1)).await.unwrap();
        assert_eq!(response.content, "fine");

        let stats = gw.stats();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.primary_success, 1);
        assert_eq!(stats.total_failures, 0);
    }

    #[tokio::test]
    async fn retry_then_success() {
        let mock = MockLlmClient::new()
            .with_failure(LlmFailureKind::Timeout, "slow")
            .with_response("eventually");
        let gw = gateway_with(mock);

        let response = gw.generate(&LlmRequest::new("hi", 0.1)).await.unwrap();
        assert_eq!(response.content, "eventually");
    }

    #[tokio::test]
    async fn non_retryable_failure_stops_immediately() {
        let mock = MockLlmClient::new()
            .with_failure(LlmFailureKind::Auth, "bad key")
            .with_response("never reached");
        let calls = mock.call_counter();
        let gw = gateway_with(mock);

        let err = gw.generate(&LlmRequest::new("hi", 0.1)).await.unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fallback_is_consulted_after_retryable_exhaustion() {
        let primary = MockLlmClient::new()
            .with_failure(LlmFailureKind::Network, "down")
            .with_failure(LlmFailureKind::Network, "down")
            .with_failure(LlmFailureKind::Network, "down");
        let fallback = MockLlmClient::new().with_response("from fallback");

        let gw = LlmGateway::new(Arc::new(primary), 3, 1).with_fallback(Arc::new(fallback));
        let response = gw.generate(&LlmRequest::new("hi", 0.1)).await.unwrap();
        assert_eq!(response.content, "from fallback");
        assert_eq!(gw.stats().fallback_success, 1);
    }

    #[tokio::test]
    async fn cache_serves_identical_requests() {
        let mock = MockLlmClient::new().with_response("once");
        let calls = mock.call_counter();
        let gw = gateway_with(mock).with_cache(16);

        let first = gw.generate(&LlmRequest::new("same", 0.1)).await.unwrap();
        let second = gw.generate(&LlmRequest::new("same", 0.1)).await.unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(second.content, "once");
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(gw.stats().cache_hits, 1);
    }

    #[tokio::test]
    async fn generate_json_strips_fences() {
        let mock =
            MockLlmClient::new().with_response("```json\n{\"polarity\": \"+\"}\n```");
        let gw = gateway_with(mock);

        let value = gw
            .generate_json(&LlmRequest::new("probe", 0.1))
            .await
            .unwrap();
        assert_eq!(value["polarity"], "+");
    }

    #[tokio::test]
    async fn generate_json_parse_failure_is_not_retryable() {
        let mock = MockLlmClient::new().with_response("not json at all");
        let gw = gateway_with(mock);

        let err = gw
            .generate_json(&LlmRequest::new("probe", 0.1))
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn fence_stripping_variants() {
        assert_eq!(strip_json_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_json_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_json_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }
}
