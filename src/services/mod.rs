// ABOUTME: Business logic layer for the meal batching pipeline
// ABOUTME: Raw input capture, extraction, summary lifecycle, history, and the engine facade

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutribatch Contributors

//! # Services Layer
//!
//! The pipeline decomposes into small collaborators, each owning one concern:
//!
//! - [`raw_inputs::RawInputStore`]: captures free-text meal logs with zero
//!   model calls and answers pending queries
//! - [`extraction::NutritionExtractor`]: the single end-of-day consolidation
//!   call, with output repair, arithmetic validation, and transport retry
//! - [`summary::SummaryStore`] / [`summary::EditController`]: summary
//!   persistence and the bounded post-hoc edit lifecycle
//! - [`history::HistoryIndex`]: windowed, date-descending summary retrieval
//! - [`engine::MealBatchingEngine`]: the facade wiring the collaborators
//!   together behind per-day writer exclusion
//!
//! Callers construct the engine once and use it; the collaborators are public
//! for composition in tests and embedders.

pub mod engine;
pub mod extraction;
pub mod history;
pub mod raw_inputs;
pub mod summary;

pub use engine::{
    EditDayRequest, FinalizeDayRequest, FinalizeOutcome, HistoryRequest, LogMealRequest,
    MealBatchingEngine,
};
pub use extraction::NutritionExtractor;
pub use history::HistoryIndex;
pub use raw_inputs::RawInputStore;
pub use summary::{EditController, SummaryStore};
