// ABOUTME: LLM provider abstraction for pluggable completion backends
// ABOUTME: Defines the single-call contract the extractor uses to consolidate a day
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutribatch Contributors

//! # LLM Provider Service Provider Interface
//!
//! The extractor talks to exactly one operation: submit a prompt with an
//! output-token ceiling, get text back. Providers implement
//! [`CompletionProvider`] and are injected as `Arc<dyn CompletionProvider>`,
//! so production code and tests differ only in construction:
//!
//! - [`OpenAiCompatibleProvider`]: any OpenAI-compatible chat completions
//!   endpoint (OpenAI, Ollama, vLLM) over HTTP with an explicit timeout
//! - [`FixtureProvider`]: deterministic canned outputs for tests
//!
//! ## Example
//!
//! ```rust,no_run
//! use nutribatch::llm::{CompletionProvider, CompletionRequest, OpenAiCompatibleProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), nutribatch::errors::NutritionError> {
//!     let provider = OpenAiCompatibleProvider::from_env()?;
//!     let request = CompletionRequest::new("Summarize: 2 eggs and toast", 4000);
//!     let response = provider.complete(&request).await?;
//!     println!("{}", response.content);
//!     Ok(())
//! }
//! ```

mod fixture;
mod openai_compatible;
pub mod prompts;

pub use fixture::FixtureProvider;
pub use openai_compatible::{OpenAiCompatibleConfig, OpenAiCompatibleProvider};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::NutritionResult;

/// A single completion request: one prompt, one bounded response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Full prompt text (instruction, schema, and user input)
    pub prompt: String,
    /// Ceiling on generated tokens; nutrition objects with many items need
    /// headroom, so callers typically pass a few thousand
    pub max_output_tokens: u32,
}

impl CompletionRequest {
    /// Create a new completion request
    pub fn new(prompt: impl Into<String>, max_output_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_output_tokens,
        }
    }
}

/// Response from a completion call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated text, expected (but not guaranteed) to be one JSON object
    pub content: String,
    /// Model that produced the response
    pub model: String,
    /// Token usage statistics when the provider reports them
    pub usage: Option<TokenUsage>,
}

/// Token usage statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,
    /// Tokens in the completion
    pub completion_tokens: u32,
}

/// Completion provider trait
///
/// Synchronous from the extractor's point of view: one call in, one text out.
/// Implementations own their transport details (endpoints, auth, timeouts)
/// and map failures onto the crate's provider error variants so the
/// extractor's retry policy can classify them.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Unique provider identifier (e.g. "openai-compatible", "fixture")
    fn name(&self) -> &'static str;

    /// Model this provider will use
    fn default_model(&self) -> &str;

    /// Perform a completion
    ///
    /// # Errors
    ///
    /// Returns `ProviderTimeout` when the deadline is exceeded and `Provider`
    /// for transport or API failures.
    async fn complete(&self, request: &CompletionRequest) -> NutritionResult<CompletionResponse>;
}
