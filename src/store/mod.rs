// ABOUTME: Persistence collaborator boundary for raw inputs and daily summaries
// ABOUTME: Keyed async trait so storage backends swap without touching the engine
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutribatch Contributors

//! # Storage Abstraction Layer
//!
//! The engine is agnostic to where per-day state lives; it only requires
//! keyed, per-key-atomic operations over two collections: raw meal inputs and
//! finalized summaries. [`NutritionStore`] is that contract, injected into
//! every component rather than reached through a module-level singleton, so a
//! relational or embedded backend can replace the bundled
//! [`memory::InMemoryStore`] without changes above this boundary.
//!
//! Nothing in this trait deletes: finalize marks inputs consumed, summaries
//! are overwritten in place. Retention policy belongs to the backend.

pub mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::NutritionResult;
use crate::models::{DayKey, DayNutritionSummary, RawMealInput};

/// Keyed persistence contract for the meal batching engine
///
/// Implementations must make each operation atomic per [`DayKey`]; the engine
/// layers its own per-key writer exclusion on top for multi-step sequences.
#[async_trait]
pub trait NutritionStore: Send + Sync {
    /// Persist a new raw meal input
    async fn append_raw_input(&self, input: RawMealInput) -> NutritionResult<()>;

    /// Every raw input for the key, consumed or not, in append order
    async fn raw_inputs(&self, key: &DayKey) -> NutritionResult<Vec<RawMealInput>>;

    /// Raw inputs for the key not yet consolidated, in append order
    async fn pending_inputs(&self, key: &DayKey) -> NutritionResult<Vec<RawMealInput>>;

    /// Mark the given inputs consumed; records are retained for audit
    async fn mark_consumed(&self, key: &DayKey, ids: &[Uuid]) -> NutritionResult<()>;

    /// The finalized summary for the key, if any
    async fn summary(&self, key: &DayKey) -> NutritionResult<Option<DayNutritionSummary>>;

    /// Overwrite (or create) the summary for its key
    async fn put_summary(&self, summary: DayNutritionSummary) -> NutritionResult<()>;

    /// Every finalized summary belonging to the user, unordered
    async fn user_summaries(&self, user_id: &str) -> NutritionResult<Vec<DayNutritionSummary>>;
}
