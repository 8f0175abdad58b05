// Copyright 2025 Cowboy AI, LLC.

//! LLM access: client abstraction, HTTP backend, gateway, test mock

mod client;
mod gateway;
mod http;
mod mock;

pub use client::{LlmClient, LlmFailure, LlmFailureKind, LlmRequest, LlmResponse};
pub use gateway::{GatewayStats, LlmGateway};
pub use http::HttpLlmClient;
pub use mock::MockLlmClient;
