// ABOUTME: Shared test utilities and fixtures for integration tests
// ABOUTME: Engine construction helpers and consistent nutrition payload builders

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutribatch Contributors
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]
//! Shared test utilities for `nutribatch`
//!
//! Provides common engine setup and payload builders to reduce duplication
//! across integration tests.

use std::sync::Arc;

use chrono::NaiveDate;
use nutribatch::config::{ExtractorConfig, RetryConfig};
use nutribatch::llm::{CompletionProvider, FixtureProvider};
use nutribatch::models::{DayNutrition, Meal, MealItem};
use nutribatch::services::MealBatchingEngine;
use nutribatch::store::InMemoryStore;

/// A fixed test date: 2024-01-15
pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
}

/// Extractor config with millisecond backoff so retry tests run fast
pub fn fast_config() -> ExtractorConfig {
    ExtractorConfig {
        max_output_tokens: 4000,
        retry: RetryConfig {
            max_attempts: 3,
            initial_backoff_ms: 1,
        },
    }
}

/// Engine over an in-memory store and the keyword-routed fixture provider
pub fn fixture_engine() -> MealBatchingEngine {
    engine_with_provider(Arc::new(FixtureProvider::new()))
}

/// Engine over an in-memory store and an arbitrary provider
pub fn engine_with_provider(provider: Arc<dyn CompletionProvider>) -> MealBatchingEngine {
    MealBatchingEngine::new(Arc::new(InMemoryStore::new()), provider, fast_config())
}

/// A single-meal day whose subtotals and totals are arithmetically consistent
pub fn consistent_day(kcal: f64) -> DayNutrition {
    DayNutrition {
        meals: vec![Meal {
            label: "breakfast".into(),
            items: vec![MealItem {
                name: "Oatmeal".into(),
                grams: 80.0,
                protein_g: 10.0,
                carb_g: 50.0,
                fat_g: 5.0,
                kcal,
            }],
            subtotal_protein_g: 10.0,
            subtotal_carb_g: 50.0,
            subtotal_fat_g: 5.0,
            subtotal_kcal: kcal,
        }],
        total_protein_g: 10.0,
        total_carb_g: 50.0,
        total_fat_g: 5.0,
        total_kcal: kcal,
    }
}
