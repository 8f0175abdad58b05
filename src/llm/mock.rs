// Copyright 2025 Cowboy AI, LLC.

//! Scripted LLM client for tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::client::{LlmClient, LlmFailure, LlmFailureKind, LlmRequest, LlmResponse};

/// An [`LlmClient`] that replays a scripted sequence of outcomes.
///
/// When the script runs out, further calls fail with a network error so a
/// test never silently consumes more model calls than it scripted.
pub struct MockLlmClient {
    script: Mutex<VecDeque<Result<String, LlmFailure>>>,
    requests: Mutex<Vec<LlmRequest>>,
    calls: Arc<AtomicUsize>,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmClient {
    /// An empty-script mock
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue a successful response
    pub fn with_response(self, content: impl Into<String>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(content.into()));
        self
    }

    /// Queue a failure
    pub fn with_failure(self, kind: LlmFailureKind, message: impl Into<String>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(LlmFailure::new(kind, message)));
        self
    }

    /// Shared call counter, usable after the mock moves into a gateway
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Requests observed so far
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(content)) => Ok(LlmResponse {
                tokens_in: request.prompt.len() as u64 / 4,
                tokens_out: content.len() as u64 / 4,
                latency_ms: 1,
                cached: false,
                content,
            }),
            Some(Err(failure)) => Err(failure),
            None => Err(LlmFailure::new(
                LlmFailureKind::Network,
                "mock script exhausted",
            )),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }

    async fn health_check(&self) -> bool {
        true
    }
}
