// ABOUTME: Main library entry point for the nutribatch meal batching engine
// ABOUTME: Batches free-text meal logs into one end-of-day LLM consolidation per user

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutribatch Contributors

#![deny(unsafe_code)]

//! # Nutribatch
//!
//! An end-of-day meal batching and nutrition summary engine. Users log meals
//! as free text all day at zero model cost; a single LLM call at finalize
//! time consolidates the whole day into one structured, arithmetic-validated
//! nutrition summary.
//!
//! ## Features
//!
//! - **Constant per-day cost**: exactly one consolidation call per day, no
//!   matter how many meals are logged
//! - **Structured output repair**: truncated or fenced model JSON is coerced
//!   back into a parsable object before decoding
//! - **Arithmetic validation**: claimed subtotals and totals are recomputed
//!   and checked within tolerance before anything is stored
//! - **Bounded edits**: each day's summary takes at most two post-hoc
//!   revisions, manual or re-finalize
//! - **Pluggable providers and storage**: any OpenAI-compatible endpoint via
//!   [`llm::OpenAiCompatibleProvider`], any backend via
//!   [`store::NutritionStore`]
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use nutribatch::config::ExtractorConfig;
//! use nutribatch::llm::OpenAiCompatibleProvider;
//! use nutribatch::services::{FinalizeDayRequest, LogMealRequest, MealBatchingEngine};
//! use nutribatch::store::InMemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), nutribatch::errors::NutritionError> {
//!     let engine = MealBatchingEngine::new(
//!         Arc::new(InMemoryStore::new()),
//!         Arc::new(OpenAiCompatibleProvider::from_env()?),
//!         ExtractorConfig::from_env()?,
//!     );
//!
//!     engine
//!         .log_meal(LogMealRequest::new("alice", "2 eggs and toast"))
//!         .await?;
//!     let outcome = engine.finalize_day(FinalizeDayRequest::new("alice")).await?;
//!     println!("{}", outcome.summary.nutrition.summarize());
//!     Ok(())
//! }
//! ```

/// Extraction pipeline configuration from environment variables
pub mod config;

/// Unified error taxonomy with transport-class retry detection
pub mod errors;

/// LLM provider abstraction, prompt composition, and concrete providers
pub mod llm;

/// Structured logging configuration
pub mod logging;

/// Core data model: raw inputs, meals, and daily summaries
pub mod models;

/// Structured output repair for malformed model JSON
pub mod repair;

/// Business logic: capture, extraction, summary lifecycle, history, engine
pub mod services;

/// Storage abstraction and the in-memory reference backend
pub mod store;

/// Arithmetic consistency validation and plausibility warnings
pub mod validation;
