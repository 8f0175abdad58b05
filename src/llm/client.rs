// Copyright 2025 Cowboy AI, LLC.

//! LLM client abstraction
//!
//! The engine consults a language model in exactly two places: polarity /
//! semantic probes during validation, and optional conclusion polishing.
//! Everything reaches the model through this trait so backends can be
//! swapped and tests can script responses.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::KgError;

/// A single generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmRequest {
    /// User prompt
    pub prompt: String,
    /// Optional system prompt
    pub system_prompt: Option<String>,
    /// Sampling temperature
    pub temperature: f64,
    /// Completion token budget
    pub max_tokens: u32,
    /// Ask the backend for JSON output
    pub json_mode: bool,
}

impl LlmRequest {
    /// A plain request with the given prompt and temperature
    pub fn new(prompt: impl Into<String>, temperature: f64) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            temperature,
            max_tokens: 1024,
            json_mode: false,
        }
    }

    /// Attach a system prompt
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system_prompt = Some(system.into());
        self
    }

    /// Request JSON output
    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// A completed generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Generated text
    pub content: String,
    /// Prompt tokens consumed
    pub tokens_in: u64,
    /// Completion tokens produced
    pub tokens_out: u64,
    /// Wall-clock latency of the call
    pub latency_ms: u64,
    /// Whether this response was served from the gateway cache
    pub cached: bool,
}

impl LlmResponse {
    /// Total token count for cost accounting
    pub fn total_tokens(&self) -> u64 {
        self.tokens_in + self.tokens_out
    }
}

/// Failure taxonomy for LLM calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmFailureKind {
    /// The call exceeded its deadline
    Timeout,
    /// The backend rate-limited the caller
    RateLimit,
    /// Credentials rejected
    Auth,
    /// Transport-level failure
    Network,
    /// The response could not be parsed as requested
    Parse,
    /// Anything else
    Unknown,
}

impl LlmFailureKind {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmFailureKind::Timeout => "timeout",
            LlmFailureKind::RateLimit => "rate_limit",
            LlmFailureKind::Auth => "auth",
            LlmFailureKind::Network => "network",
            LlmFailureKind::Parse => "parse",
            LlmFailureKind::Unknown => "unknown",
        }
    }

    /// Whether a retry can plausibly succeed
    pub fn retryable(&self) -> bool {
        !matches!(self, LlmFailureKind::Auth | LlmFailureKind::Parse)
    }
}

/// A classified LLM failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmFailure {
    /// Taxonomy entry
    pub kind: LlmFailureKind,
    /// Backend message
    pub message: String,
}

impl LlmFailure {
    /// Build a failure
    pub fn new(kind: LlmFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify a raw error string the way the gateway retries expect
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        let kind = if lower.contains("timeout") || lower.contains("timed out") {
            LlmFailureKind::Timeout
        } else if lower.contains("rate") || lower.contains("429") {
            LlmFailureKind::RateLimit
        } else if lower.contains("auth") || lower.contains("401") || lower.contains("403") {
            LlmFailureKind::Auth
        } else if lower.contains("connection") || lower.contains("network") || lower.contains("dns")
        {
            LlmFailureKind::Network
        } else {
            LlmFailureKind::Unknown
        };
        Self { kind, message }
    }

    /// Whether a retry can plausibly succeed
    pub fn retryable(&self) -> bool {
        self.kind.retryable()
    }
}

impl fmt::Display for LlmFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl From<LlmFailure> for KgError {
    fn from(failure: LlmFailure) -> Self {
        KgError::LlmService {
            kind: failure.kind.as_str().to_string(),
            message: failure.message.clone(),
            retryable: failure.retryable(),
        }
    }
}

/// A pluggable LLM backend
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmFailure>;

    /// Backend name for logs and stats
    fn name(&self) -> &str;

    /// Whether the backend is reachable; defaults to pessimistic
    async fn health_check(&self) -> bool {
        false
    }
}
