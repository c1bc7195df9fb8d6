// ABOUTME: Deterministic completion provider for tests, keyed off meal keywords
// ABOUTME: Returns canned nutrition JSON or a caller-supplied raw response
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutribatch Contributors

//! # Fixture Provider
//!
//! Test double selected by dependency injection in place of a network
//! provider. Routes on meal keywords in the prompt the way a real
//! consolidation call would fan out, and always returns the same numbers so
//! assertions can be exact:
//!
//! - breakfast + lunch + dinner → a 3-meal day totaling 1050 kcal
//! - a single meal keyword → that meal alone
//!
//! [`FixtureProvider::with_response`] overrides routing entirely, which is
//! how repair and error paths are exercised without a live model.

use async_trait::async_trait;
use serde_json::json;

use super::{CompletionProvider, CompletionRequest, CompletionResponse, TokenUsage};
use crate::errors::NutritionResult;

/// Deterministic canned-output provider for tests
#[derive(Debug, Default)]
pub struct FixtureProvider {
    canned: Option<String>,
}

impl FixtureProvider {
    /// Create a keyword-routed fixture provider
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider that returns `raw` verbatim for every request
    #[must_use]
    pub fn with_response(raw: impl Into<String>) -> Self {
        Self {
            canned: Some(raw.into()),
        }
    }

    fn route(prompt: &str) -> serde_json::Value {
        let lower = prompt.to_lowercase();
        let has = |word: &str| lower.contains(word);

        if has("breakfast") && has("lunch") && has("dinner") {
            whole_day()
        } else if has("lunch") {
            lunch_only()
        } else if has("dinner") {
            dinner_only()
        } else {
            breakfast_only()
        }
    }
}

#[async_trait]
impl CompletionProvider for FixtureProvider {
    fn name(&self) -> &'static str {
        "fixture"
    }

    fn default_model(&self) -> &str {
        "fixture-v1"
    }

    async fn complete(&self, request: &CompletionRequest) -> NutritionResult<CompletionResponse> {
        let content = match &self.canned {
            Some(raw) => raw.clone(),
            None => Self::route(&request.prompt).to_string(),
        };

        Ok(CompletionResponse {
            content,
            model: "fixture-v1".to_owned(),
            usage: Some(TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 50,
            }),
        })
    }
}

// ============================================================================
// Canned nutrition data
// ============================================================================

fn item(name: &str, grams: f64, protein: f64, carb: f64, fat: f64, kcal: f64) -> serde_json::Value {
    json!({
        "name": name,
        "grams": grams,
        "protein_g": protein,
        "carb_g": carb,
        "fat_g": fat,
        "kcal": kcal,
    })
}

fn meal(
    label: &str,
    items: Vec<serde_json::Value>,
    protein: f64,
    carb: f64,
    fat: f64,
    kcal: f64,
) -> serde_json::Value {
    json!({
        "label": label,
        "items": items,
        "subtotal_protein_g": protein,
        "subtotal_carb_g": carb,
        "subtotal_fat_g": fat,
        "subtotal_kcal": kcal,
    })
}

fn breakfast_meal() -> serde_json::Value {
    meal(
        "Breakfast",
        vec![
            item("Eggs", 100.0, 12.6, 1.1, 9.0, 155.0),
            item("Toast", 60.0, 4.8, 40.2, 2.1, 200.0),
        ],
        17.4,
        41.3,
        11.1,
        355.0,
    )
}

fn breakfast_only() -> serde_json::Value {
    json!({
        "meals": [breakfast_meal()],
        "total_protein_g": 17.4,
        "total_carb_g": 41.3,
        "total_fat_g": 11.1,
        "total_kcal": 355.0,
    })
}

fn lunch_only() -> serde_json::Value {
    json!({
        "meals": [meal(
            "Lunch",
            vec![
                item("Chicken Breast", 150.0, 35.1, 0.0, 3.9, 185.0),
                item("Brown Rice", 100.0, 2.6, 22.0, 0.9, 110.0),
                item("Broccoli", 100.0, 3.0, 7.0, 0.4, 34.0),
            ],
            40.7, 29.0, 5.2, 329.0,
        )],
        "total_protein_g": 40.7,
        "total_carb_g": 29.0,
        "total_fat_g": 5.2,
        "total_kcal": 329.0,
    })
}

fn dinner_only() -> serde_json::Value {
    json!({
        "meals": [meal(
            "Dinner",
            vec![
                item("Salmon", 200.0, 42.0, 0.0, 12.0, 280.0),
                item("Quinoa", 100.0, 4.4, 22.0, 1.9, 120.0),
                item("Mixed Vegetables", 150.0, 4.5, 15.0, 0.6, 80.0),
            ],
            50.9, 37.0, 14.5, 480.0,
        )],
        "total_protein_g": 50.9,
        "total_carb_g": 37.0,
        "total_fat_g": 14.5,
        "total_kcal": 480.0,
    })
}

fn whole_day() -> serde_json::Value {
    json!({
        "meals": [
            breakfast_meal(),
            meal(
                "Lunch",
                vec![
                    item("Chicken Breast", 150.0, 35.1, 0.0, 3.9, 185.0),
                    item("Brown Rice", 100.0, 2.6, 22.0, 0.9, 110.0),
                ],
                37.7, 22.0, 4.8, 295.0,
            ),
            meal(
                "Dinner",
                vec![
                    item("Salmon", 200.0, 42.0, 0.0, 12.0, 280.0),
                    item("Quinoa", 100.0, 4.4, 22.0, 1.9, 120.0),
                ],
                46.4, 22.0, 13.9, 400.0,
            ),
        ],
        "total_protein_g": 101.5,
        "total_carb_g": 85.3,
        "total_fat_g": 29.8,
        "total_kcal": 1050.0,
    })
}
