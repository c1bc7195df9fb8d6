// ABOUTME: OpenAI-compatible completion provider over HTTP with explicit timeout
// ABOUTME: Works against OpenAI, Ollama, vLLM, or any chat-completions endpoint
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutribatch Contributors

//! # OpenAI-Compatible Provider
//!
//! Speaks the `/chat/completions` wire format shared by OpenAI and the common
//! self-hosted runtimes (Ollama, vLLM, LocalAI). The request timeout is set
//! on the HTTP client so every completion call carries a hard deadline; the
//! extractor's retry policy decides what happens after that.
//!
//! ## Configuration
//!
//! - `NUTRIBATCH_LLM_BASE_URL`: API endpoint (default: Ollama at
//!   `http://localhost:11434/v1`)
//! - `NUTRIBATCH_LLM_MODEL`: model name (default: `qwen2.5:14b-instruct`)
//! - `NUTRIBATCH_LLM_API_KEY`: bearer token, optional for local runtimes
//! - `NUTRIBATCH_LLM_TIMEOUT_SECS`: request deadline (default: 30)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::debug;

use super::{CompletionProvider, CompletionRequest, CompletionResponse, TokenUsage};
use crate::errors::{NutritionError, NutritionResult};

/// Environment variable for the API base URL
const BASE_URL_ENV: &str = "NUTRIBATCH_LLM_BASE_URL";

/// Environment variable for the model name
const MODEL_ENV: &str = "NUTRIBATCH_LLM_MODEL";

/// Environment variable for the API key
const API_KEY_ENV: &str = "NUTRIBATCH_LLM_API_KEY";

/// Environment variable for the request timeout
const TIMEOUT_ENV: &str = "NUTRIBATCH_LLM_TIMEOUT_SECS";

/// Default endpoint (Ollama's OpenAI-compatible server)
const DEFAULT_BASE_URL: &str = "http://localhost:11434/v1";

/// Default model for local inference
const DEFAULT_MODEL: &str = "qwen2.5:14b-instruct";

/// Default request deadline in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// API Request/Response Types (OpenAI wire format)
// ============================================================================

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    model: String,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

// ============================================================================
// Provider
// ============================================================================

/// Configuration for an OpenAI-compatible provider
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleConfig {
    /// API base URL, without the `/chat/completions` suffix
    pub base_url: String,
    /// Bearer token; `None` for unauthenticated local runtimes
    pub api_key: Option<String>,
    /// Model to request
    pub model: String,
    /// Hard deadline for each completion call
    pub timeout_secs: u64,
}

impl Default for OpenAiCompatibleConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            api_key: None,
            model: DEFAULT_MODEL.to_owned(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Completion provider for any OpenAI-compatible endpoint
pub struct OpenAiCompatibleProvider {
    client: Client,
    config: OpenAiCompatibleConfig,
}

impl OpenAiCompatibleProvider {
    /// Create a provider with explicit configuration
    ///
    /// # Errors
    ///
    /// Returns a config error if the HTTP client cannot be constructed.
    pub fn new(config: OpenAiCompatibleConfig) -> NutritionResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NutritionError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Create a provider from environment variables
    ///
    /// # Errors
    ///
    /// Returns a config error if `NUTRIBATCH_LLM_TIMEOUT_SECS` is set but not
    /// a positive integer, or if the HTTP client cannot be constructed.
    pub fn from_env() -> NutritionResult<Self> {
        let timeout_secs = match env::var(TIMEOUT_ENV) {
            Ok(raw) => raw.parse::<u64>().map_err(|_| {
                NutritionError::config(format!("{TIMEOUT_ENV} must be a positive integer"))
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        let config = OpenAiCompatibleConfig {
            base_url: env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned()),
            api_key: env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()),
            model: env::var(MODEL_ENV).unwrap_or_else(|_| DEFAULT_MODEL.to_owned()),
            timeout_secs,
        };
        Self::new(config)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &'static str {
        "openai-compatible"
    }

    fn default_model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: &CompletionRequest) -> NutritionResult<CompletionResponse> {
        let api_request = ApiRequest {
            model: self.config.model.clone(),
            messages: vec![ApiMessage {
                role: "user",
                content: request.prompt.clone(),
            }],
            max_tokens: request.max_output_tokens,
        };

        debug!(
            model = %self.config.model,
            prompt_chars = request.prompt.len(),
            "dispatching completion request"
        );

        let mut http_request = self.client.post(self.endpoint()).json(&api_request);
        if let Some(key) = &self.config.api_key {
            http_request = http_request.bearer_auth(key);
        }

        let response = http_request.send().await.map_err(|e| {
            if e.is_timeout() {
                NutritionError::ProviderTimeout {
                    timeout_secs: self.config.timeout_secs,
                }
            } else {
                NutritionError::Provider {
                    status: None,
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NutritionError::Provider {
                status: Some(status.as_u16()),
                message: truncate_for_log(&body, 500),
            });
        }

        let api_response: ApiResponse = response.json().await.map_err(|e| {
            NutritionError::Provider {
                status: None,
                message: format!("malformed completion response: {e}"),
            }
        })?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| NutritionError::Provider {
                status: None,
                message: "completion response contained no choices".to_owned(),
            })?;

        Ok(CompletionResponse {
            content,
            model: api_response.model,
            usage: api_response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            }),
        })
    }
}

fn truncate_for_log(body: &str, limit: usize) -> String {
    if body.len() <= limit {
        body.to_owned()
    } else {
        let cut = body
            .char_indices()
            .take_while(|(i, _)| *i < limit)
            .last()
            .map_or(0, |(i, c)| i + c.len_utf8());
        format!("{}... ({} bytes total)", &body[..cut], body.len())
    }
}
