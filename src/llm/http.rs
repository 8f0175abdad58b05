// Copyright 2025 Cowboy AI, LLC.

//! HTTP LLM client for an Ollama-compatible backend

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::client::{LlmClient, LlmFailure, LlmFailureKind, LlmRequest, LlmResponse};
use crate::config::LlmParams;

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    #[serde(default)]
    response: String,
    #[serde(default)]
    prompt_eval_count: u64,
    #[serde(default)]
    eval_count: u64,
}

/// [`LlmClient`] over an Ollama-style `/api/generate` endpoint
pub struct HttpLlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl HttpLlmClient {
    /// Build a client from gateway parameters
    pub fn new(params: &LlmParams) -> Result<Self, LlmFailure> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(params.timeout_secs))
            .build()
            .map_err(|e| LlmFailure::new(LlmFailureKind::Network, e.to_string()))?;
        Ok(Self {
            client,
            base_url: params.base_url.trim_end_matches('/').to_string(),
            model: params.model_name.clone(),
        })
    }

    fn classify(err: reqwest::Error) -> LlmFailure {
        let kind = if err.is_timeout() {
            LlmFailureKind::Timeout
        } else if err.is_connect() {
            LlmFailureKind::Network
        } else if let Some(status) = err.status() {
            match status.as_u16() {
                429 => LlmFailureKind::RateLimit,
                401 | 403 => LlmFailureKind::Auth,
                _ => LlmFailureKind::Unknown,
            }
        } else {
            LlmFailureKind::Unknown
        };
        LlmFailure::new(kind, err.to_string())
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmFailure> {
        let body = GenerateBody {
            model: &self.model,
            prompt: &request.prompt,
            system: request.system_prompt.as_deref(),
            stream: false,
            format: request.json_mode.then_some("json"),
            options: GenerateOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        let started = Instant::now();
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(Self::classify)?;

        let status = response.status();
        if !status.is_success() {
            let kind = match status.as_u16() {
                429 => LlmFailureKind::RateLimit,
                401 | 403 => LlmFailureKind::Auth,
                _ => LlmFailureKind::Unknown,
            };
            let text = response.text().await.unwrap_or_default();
            return Err(LlmFailure::new(kind, format!("HTTP {status}: {text}")));
        }

        let reply: GenerateReply = response
            .json()
            .await
            .map_err(|e| LlmFailure::new(LlmFailureKind::Parse, e.to_string()))?;

        Ok(LlmResponse {
            content: reply.response,
            tokens_in: reply.prompt_eval_count,
            tokens_out: reply.eval_count,
            latency_ms: started.elapsed().as_millis() as u64,
            cached: false,
        })
    }

    fn name(&self) -> &str {
        "ollama-http"
    }

    async fn health_check(&self) -> bool {
        self.client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_serialises_json_mode() {
        let body = GenerateBody {
            model: "llama3.2:latest",
            prompt: "probe",
            system: None,
            stream: false,
            format: Some("json"),
            options: GenerateOptions {
                temperature: 0.1,
                num_predict: 512,
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["format"], "json");
        assert_eq!(value["stream"], false);
        assert!(value.get("system").is_none());
        assert_eq!(value["options"]["temperature"], 0.1);
    }

    #[test]
    fn reply_tolerates_missing_counters() {
        let reply: GenerateReply = serde_json::from_str(r#"{"response": "+"}"#).unwrap();
        assert_eq!(reply.response, "+");
        assert_eq!(reply.prompt_eval_count, 0);
        assert_eq!(reply.eval_count, 0);
    }
}
