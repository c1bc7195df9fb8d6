// ABOUTME: End-to-end tests for malformed model output flowing through finalize
// ABOUTME: Fenced, truncated, and hopeless outputs via a canned provider response

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutribatch Contributors
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use common::{engine_with_provider, test_date};
use nutribatch::errors::NutritionError;
use nutribatch::llm::FixtureProvider;
use nutribatch::services::{FinalizeDayRequest, LogMealRequest, MealBatchingEngine};

const BREAKFAST_JSON: &str = r#"{"meals":[{"label":"Breakfast","items":[{"name":"Eggs","grams":100,"protein_g":12.6,"carb_g":1.1,"fat_g":9.0,"kcal":155}],"subtotal_protein_g":12.6,"subtotal_carb_g":1.1,"subtotal_fat_g":9.0,"subtotal_kcal":155}],"total_protein_g":12.6,"total_carb_g":1.1,"total_fat_g":9.0,"total_kcal":155}"#;

fn engine_returning(raw: impl Into<String>) -> MealBatchingEngine {
    engine_with_provider(Arc::new(FixtureProvider::with_response(raw)))
}

async fn log_and_finalize(
    engine: &MealBatchingEngine,
) -> Result<nutribatch::services::FinalizeOutcome, NutritionError> {
    engine
        .log_meal(LogMealRequest::new("alice", "2 eggs").with_date(test_date()))
        .await?;
    engine
        .finalize_day(FinalizeDayRequest::new("alice").with_date(test_date()))
        .await
}

#[tokio::test]
async fn fenced_output_is_unwrapped_and_stored() {
    let fenced = format!("Here is your summary:\n```json\n{BREAKFAST_JSON}\n```");
    let engine = engine_returning(fenced);
    let outcome = log_and_finalize(&engine).await.unwrap();
    assert!((outcome.summary.nutrition.total_kcal - 155.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn truncated_output_is_repaired_and_stored() {
    // Final "}" lost to the token ceiling
    let truncated = &BREAKFAST_JSON[..BREAKFAST_JSON.len() - 1];
    assert!(serde_json::from_str::<serde_json::Value>(truncated).is_err());

    let engine = engine_returning(truncated);
    let outcome = log_and_finalize(&engine).await.unwrap();
    assert_eq!(outcome.summary.nutrition.meals.len(), 1);
    assert!((outcome.summary.nutrition.total_kcal - 155.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn missing_meals_array_closer_is_repaired() {
    let mangled = BREAKFAST_JSON.replace("}],\"total_protein_g\"", "},\"total_protein_g\"");
    assert!(serde_json::from_str::<serde_json::Value>(&mangled).is_err());

    let engine = engine_returning(mangled);
    let outcome = log_and_finalize(&engine).await.unwrap();
    assert!((outcome.summary.nutrition.total_protein_g - 12.6).abs() < f64::EPSILON);
}

#[tokio::test]
async fn unrepairable_output_keeps_inputs_pending() {
    let engine = engine_returning("I'm sorry, I could not analyze those meals.");
    let err = log_and_finalize(&engine).await.unwrap_err();
    match err {
        NutritionError::UnrepairableOutput { raw, .. } => {
            assert!(raw.contains("could not analyze"));
        }
        other => panic!("expected UnrepairableOutput, got {other:?}"),
    }

    // Nothing was stored and the input survives for a later retry
    assert!(engine.day_summary("alice", Some(test_date())).await.unwrap().is_none());
    assert_eq!(
        engine.pending_meals("alice", Some(test_date())).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn repaired_but_inconsistent_output_fails_validation() {
    let inconsistent = BREAKFAST_JSON.replace("\"total_kcal\":155", "\"total_kcal\":900");
    let engine = engine_returning(inconsistent);
    let err = log_and_finalize(&engine).await.unwrap_err();
    match err {
        NutritionError::Validation { issues } => {
            assert_eq!(issues.len(), 1);
            assert_eq!(issues[0].field, "total_kcal");
        }
        other => panic!("expected Validation, got {other:?}"),
    }
    assert!(engine.day_summary("alice", Some(test_date())).await.unwrap().is_none());
}
