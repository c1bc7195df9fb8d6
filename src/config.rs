// ABOUTME: Environment-driven configuration for the extraction pipeline
// ABOUTME: Output-token ceiling and transport retry policy with sane defaults

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutribatch Contributors

//! # Configuration
//!
//! All tunables come from environment variables with defaults that work out
//! of the box against a local Ollama instance. Provider-specific settings
//! (endpoint, model, API key) live with the provider in `llm`; this module
//! carries the knobs the extractor itself owns.

use std::env;

use crate::errors::{NutritionError, NutritionResult};

/// Environment variable for the completion output-token ceiling
const MAX_OUTPUT_TOKENS_ENV: &str = "NUTRIBATCH_MAX_OUTPUT_TOKENS";

/// Environment variable for the retry attempt ceiling
const RETRY_MAX_ATTEMPTS_ENV: &str = "NUTRIBATCH_RETRY_MAX_ATTEMPTS";

/// Environment variable for the initial retry backoff in milliseconds
const RETRY_INITIAL_BACKOFF_MS_ENV: &str = "NUTRIBATCH_RETRY_INITIAL_BACKOFF_MS";

/// Default output-token ceiling; a many-item day needs headroom
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 4000;

/// Default total attempts per finalize (1 initial + 2 retries)
const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 3;

/// Default first backoff delay; doubles per attempt
const DEFAULT_RETRY_INITIAL_BACKOFF_MS: u64 = 1000;

/// Retry policy for transport-class provider failures
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry; doubles after each failed attempt
    pub initial_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            initial_backoff_ms: DEFAULT_RETRY_INITIAL_BACKOFF_MS,
        }
    }
}

/// Extractor configuration
#[derive(Debug, Clone, Copy)]
pub struct ExtractorConfig {
    /// Ceiling on generated tokens per completion call
    pub max_output_tokens: u32,
    /// Transport retry policy
    pub retry: RetryConfig,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            retry: RetryConfig::default(),
        }
    }
}

impl ExtractorConfig {
    /// Load configuration from environment variables, applying defaults for
    /// anything unset.
    ///
    /// # Errors
    ///
    /// Returns a config error when a variable is set but not a positive
    /// integer.
    pub fn from_env() -> NutritionResult<Self> {
        Ok(Self {
            max_output_tokens: parse_env(MAX_OUTPUT_TOKENS_ENV, DEFAULT_MAX_OUTPUT_TOKENS)?,
            retry: RetryConfig {
                max_attempts: parse_env(RETRY_MAX_ATTEMPTS_ENV, DEFAULT_RETRY_MAX_ATTEMPTS)?,
                initial_backoff_ms: parse_env(
                    RETRY_INITIAL_BACKOFF_MS_ENV,
                    DEFAULT_RETRY_INITIAL_BACKOFF_MS,
                )?,
            },
        })
    }

    /// Backoff delay before the retry following `attempt` (1-based)
    #[must_use]
    pub const fn backoff_ms(&self, attempt: u32) -> u64 {
        self.retry.initial_backoff_ms << attempt.saturating_sub(1)
    }
}

fn parse_env<T>(name: &str, default: T) -> NutritionResult<T>
where
    T: std::str::FromStr,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| NutritionError::config(format!("{name} must be a positive integer"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied() {
        let config = ExtractorConfig::default();
        assert_eq!(config.max_output_tokens, 4000);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_backoff_ms, 1000);
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let config = ExtractorConfig::default();
        assert_eq!(config.backoff_ms(1), 1000);
        assert_eq!(config.backoff_ms(2), 2000);
        assert_eq!(config.backoff_ms(3), 4000);
    }
}
