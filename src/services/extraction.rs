// ABOUTME: Single-call day consolidation pipeline with repair, validation, and retry
// ABOUTME: Turns raw meal texts into a validated DayNutrition via one provider call

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutribatch Contributors

//! # Nutrition Extractor
//!
//! Owns the one model call per finalize. The pipeline is strictly ordered:
//!
//! 1. compose the consolidation prompt from the day's raw texts
//! 2. call the provider, retrying transport-class failures with doubling
//!    backoff
//! 3. repair the output into well-formed JSON
//! 4. decode into [`DayNutrition`]
//! 5. validate claimed totals against recomputed sums
//! 6. collect plausibility warnings (never fatal)
//!
//! Decode, repair, and validation failures are deterministic for a given
//! output and are never retried; only the transport class gets another
//! attempt.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::ExtractorConfig;
use crate::errors::{NutritionError, NutritionResult};
use crate::llm::prompts::build_consolidation_prompt;
use crate::llm::{CompletionProvider, CompletionRequest, CompletionResponse};
use crate::models::{DayNutrition, RawMealInput};
use crate::repair::repair;
use crate::validation::{plausibility_warnings, validate_day};

/// Consolidation pipeline around one completion provider
#[derive(Clone)]
pub struct NutritionExtractor {
    provider: Arc<dyn CompletionProvider>,
    config: ExtractorConfig,
}

impl NutritionExtractor {
    /// Create an extractor over the given provider
    #[must_use]
    pub fn new(provider: Arc<dyn CompletionProvider>, config: ExtractorConfig) -> Self {
        Self { provider, config }
    }

    /// Consolidate the given raw inputs into a validated day payload.
    ///
    /// Returns the decoded nutrition together with any plausibility warnings.
    ///
    /// # Errors
    ///
    /// - provider errors after retries are exhausted
    /// - [`NutritionError::UnrepairableOutput`] when the model output cannot
    ///   be coerced into the expected JSON shape
    /// - [`NutritionError::Validation`] when claimed totals disagree with
    ///   recomputed sums
    pub async fn extract_day(
        &self,
        inputs: &[RawMealInput],
    ) -> NutritionResult<(DayNutrition, Vec<String>)> {
        let prompt = build_consolidation_prompt(inputs);
        let request = CompletionRequest::new(prompt, self.config.max_output_tokens);

        let response = self.complete_with_retry(&request).await?;
        debug!(
            provider = self.provider.name(),
            model = %response.model,
            content_chars = response.content.len(),
            "received consolidation response"
        );

        let repaired = repair(&response.content)?;
        let day: DayNutrition =
            serde_json::from_str(&repaired).map_err(|e| NutritionError::UnrepairableOutput {
                reason: format!("repaired JSON does not match the nutrition schema: {e}"),
                raw: response.content.clone(),
            })?;

        validate_day(&day)?;
        let warnings = plausibility_warnings(&day);
        if !warnings.is_empty() {
            warn!(count = warnings.len(), "plausibility warnings on consolidated day");
        }

        info!(
            meals = day.meals.len(),
            total_kcal = day.total_kcal,
            "day consolidated"
        );
        Ok((day, warnings))
    }

    async fn complete_with_retry(
        &self,
        request: &CompletionRequest,
    ) -> NutritionResult<CompletionResponse> {
        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.provider.complete(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transport() && attempt < max_attempts => {
                    let delay = self.config.backoff_ms(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay,
                        error = %e,
                        "transient provider failure, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
