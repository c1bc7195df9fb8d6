// ABOUTME: Facade wiring capture, extraction, summary lifecycle, and history together
// ABOUTME: Per-day async mutexes serialize finalize/edit; meal logging never blocks

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutribatch Contributors

//! # Meal Batching Engine
//!
//! The single entry point callers hold. One instance serves every user; all
//! state lives behind the injected [`NutritionStore`].
//!
//! ## Concurrency
//!
//! Finalize and edit for the same (user, date) are serialized on a per-key
//! `tokio::sync::Mutex` kept in a `DashMap`, so two concurrent finalizes
//! cannot both spend a model call: the loser of the race re-reads pending
//! under the lock, finds nothing, and gets `NoPendingMeals`. Logging a meal
//! never takes the lock; a text logged while a finalize is in flight simply
//! lands as new pending input for a later re-finalize.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::ExtractorConfig;
use crate::errors::{NutritionError, NutritionResult};
use crate::llm::CompletionProvider;
use crate::models::{DayKey, DayNutrition, DayNutritionSummary, RawMealInput};
use crate::store::NutritionStore;

use super::extraction::NutritionExtractor;
use super::history::HistoryIndex;
use super::raw_inputs::RawInputStore;
use super::summary::{EditController, SummaryStore};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to log one free-text meal description
#[derive(Debug, Clone)]
pub struct LogMealRequest {
    /// User logging the meal
    pub user_id: String,
    /// Free-form meal text, stored verbatim
    pub text: String,
    /// Day the meal belongs to; defaults to the local calendar date
    pub date: Option<NaiveDate>,
}

impl LogMealRequest {
    /// Create a log request for today
    pub fn new(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            text: text.into(),
            date: None,
        }
    }

    /// Target an explicit date instead of today
    #[must_use]
    pub const fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// Request to finalize a user's day
#[derive(Debug, Clone)]
pub struct FinalizeDayRequest {
    /// User whose day is finalized
    pub user_id: String,
    /// Day to finalize; defaults to the local calendar date
    pub date: Option<NaiveDate>,
}

impl FinalizeDayRequest {
    /// Create a finalize request for today
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            date: None,
        }
    }

    /// Target an explicit date instead of today
    #[must_use]
    pub const fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// Request to replace a day's summary with a caller-submitted payload
#[derive(Debug, Clone)]
pub struct EditDayRequest {
    /// User whose summary is edited
    pub user_id: String,
    /// Complete replacement payload
    pub nutrition: DayNutrition,
    /// Day to edit; defaults to the local calendar date
    pub date: Option<NaiveDate>,
}

impl EditDayRequest {
    /// Create an edit request for today
    pub fn new(user_id: impl Into<String>, nutrition: DayNutrition) -> Self {
        Self {
            user_id: user_id.into(),
            nutrition,
            date: None,
        }
    }

    /// Target an explicit date instead of today
    #[must_use]
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// Request for a user's recent summary history
#[derive(Debug, Clone)]
pub struct HistoryRequest {
    /// User whose history is requested
    pub user_id: String,
    /// Window length in calendar days, ending at `as_of` inclusive
    pub days: u32,
    /// Reference date; defaults to the local calendar date
    pub as_of: Option<NaiveDate>,
}

impl HistoryRequest {
    /// Create a history request ending today
    pub fn new(user_id: impl Into<String>, days: u32) -> Self {
        Self {
            user_id: user_id.into(),
            days,
            as_of: None,
        }
    }

    /// End the window at an explicit date instead of today
    #[must_use]
    pub const fn as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }
}

/// Result of a successful finalize or re-finalize
#[derive(Debug, Clone)]
pub struct FinalizeOutcome {
    /// The stored summary
    pub summary: DayNutritionSummary,
    /// Non-fatal plausibility warnings from the consolidated payload
    pub warnings: Vec<String>,
}

// ============================================================================
// Engine
// ============================================================================

/// Facade over the whole batching pipeline
pub struct MealBatchingEngine {
    raw_inputs: RawInputStore,
    extractor: NutritionExtractor,
    summaries: SummaryStore,
    edits: EditController,
    history: HistoryIndex,
    day_locks: DashMap<DayKey, Arc<Mutex<()>>>,
}

impl MealBatchingEngine {
    /// Wire an engine from a store, a completion provider, and extractor
    /// configuration.
    #[must_use]
    pub fn new(
        store: Arc<dyn NutritionStore>,
        provider: Arc<dyn CompletionProvider>,
        config: ExtractorConfig,
    ) -> Self {
        Self {
            raw_inputs: RawInputStore::new(store.clone()),
            extractor: NutritionExtractor::new(provider, config),
            summaries: SummaryStore::new(store.clone()),
            edits: EditController::new(store.clone()),
            history: HistoryIndex::new(store),
            day_locks: DashMap::new(),
        }
    }

    fn key(user_id: &str, date: Option<NaiveDate>) -> DayKey {
        DayKey::new(
            user_id,
            date.unwrap_or_else(|| Local::now().date_naive()),
        )
    }

    fn day_lock(&self, key: &DayKey) -> Arc<Mutex<()>> {
        // Clone the Arc out so the DashMap shard lock is released before
        // anything awaits.
        self.day_locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Log a free-text meal description. Constant-time, no model call.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the append fails.
    pub async fn log_meal(&self, request: LogMealRequest) -> NutritionResult<RawMealInput> {
        let key = Self::key(&request.user_id, request.date);
        self.raw_inputs.log(&key.user_id, key.date, &request.text).await
    }

    /// Raw inputs not yet consolidated for the user's day, in append order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn pending_meals(
        &self,
        user_id: &str,
        date: Option<NaiveDate>,
    ) -> NutritionResult<Vec<RawMealInput>> {
        self.raw_inputs.pending(&Self::key(user_id, date)).await
    }

    /// Finalize the user's day: consolidate every logged text in one model
    /// call, validate, and store the summary.
    ///
    /// When the day already has a summary and new meals were logged since,
    /// the whole day (earlier texts included) is re-consolidated and the
    /// revision counts against the edit ceiling. The ceiling is checked
    /// before the provider call so a doomed re-finalize costs nothing.
    ///
    /// # Errors
    ///
    /// - [`NutritionError::NoPendingMeals`] when nothing new is logged
    /// - [`NutritionError::EditLimitExceeded`] on a re-finalize past the cap
    /// - extraction errors (provider, repair, validation); the store is left
    ///   untouched and the inputs stay pending
    pub async fn finalize_day(
        &self,
        request: FinalizeDayRequest,
    ) -> NutritionResult<FinalizeOutcome> {
        let key = Self::key(&request.user_id, request.date);
        let lock = self.day_lock(&key);
        let _guard = lock.lock().await;

        // Re-read under the lock: a concurrent finalize may have consumed
        // everything while we waited.
        let pending = self.raw_inputs.pending(&key).await?;
        if pending.is_empty() {
            return Err(NutritionError::NoPendingMeals {
                user_id: key.user_id.clone(),
                date: key.date,
            });
        }

        let existing = self.summaries.get(&key).await?;
        if existing.is_some() {
            // Fail fast before spending the model call.
            self.edits.check_revisable(&key).await?;
        }

        // A re-finalize covers the whole day, not just the late arrivals.
        let inputs = if existing.is_some() {
            self.raw_inputs.all(&key).await?
        } else {
            pending.clone()
        };
        debug!(key = %key, inputs = inputs.len(), refinalize = existing.is_some(), "consolidating day");

        let (day, warnings) = self.extractor.extract_day(&inputs).await?;

        let all_ids = inputs.iter().map(|i| i.id).collect();
        let summary = if existing.is_some() {
            self.edits.apply_refinalize(&key, day, all_ids).await?
        } else {
            self.summaries.put_first(&key, day, all_ids).await?
        };

        let pending_ids: Vec<_> = pending.iter().map(|i| i.id).collect();
        self.raw_inputs.mark_consumed(&key, &pending_ids).await?;

        Ok(FinalizeOutcome { summary, warnings })
    }

    /// Replace the day's summary with a caller-submitted payload.
    ///
    /// # Errors
    ///
    /// - [`NutritionError::SummaryNotFound`] when the day was never finalized
    /// - [`NutritionError::EditLimitExceeded`] past the edit ceiling
    /// - [`NutritionError::Validation`] when the payload is inconsistent; a
    ///   rejected edit does not consume an edit slot
    pub async fn edit_day(&self, request: EditDayRequest) -> NutritionResult<DayNutritionSummary> {
        let key = Self::key(&request.user_id, request.date);
        let lock = self.day_lock(&key);
        let _guard = lock.lock().await;

        self.edits.apply_edit(&key, request.nutrition).await
    }

    /// The stored summary for the user's day, if any.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn day_summary(
        &self,
        user_id: &str,
        date: Option<NaiveDate>,
    ) -> NutritionResult<Option<DayNutritionSummary>> {
        self.summaries.get(&Self::key(user_id, date)).await
    }

    /// Finalized summaries for the requested window, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn meal_history(
        &self,
        request: HistoryRequest,
    ) -> NutritionResult<Vec<DayNutritionSummary>> {
        let as_of = request.as_of.unwrap_or_else(|| Local::now().date_naive());
        self.history.window(&request.user_id, request.days, as_of).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::FixtureProvider;
    use crate::store::InMemoryStore;

    fn engine_with(provider: FixtureProvider) -> MealBatchingEngine {
        MealBatchingEngine::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(provider),
            ExtractorConfig::default(),
        )
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[tokio::test]
    async fn finalize_without_pending_fails() {
        let engine = engine_with(FixtureProvider::new());
        let err = engine
            .finalize_day(FinalizeDayRequest::new("u1").with_date(date()))
            .await
            .unwrap_err();
        assert!(matches!(err, NutritionError::NoPendingMeals { .. }));
    }

    #[tokio::test]
    async fn finalize_consumes_pending_inputs() {
        let engine = engine_with(FixtureProvider::new());
        engine
            .log_meal(LogMealRequest::new("u1", "breakfast: eggs").with_date(date()))
            .await
            .unwrap();

        let outcome = engine
            .finalize_day(FinalizeDayRequest::new("u1").with_date(date()))
            .await
            .unwrap();
        assert_eq!(outcome.summary.edit_count, 0);
        assert_eq!(outcome.summary.source_raw_ids.len(), 1);

        assert!(engine.pending_meals("u1", Some(date())).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_extraction_leaves_inputs_pending() {
        let engine = engine_with(FixtureProvider::with_response("not json"));
        engine
            .log_meal(LogMealRequest::new("u1", "mystery stew").with_date(date()))
            .await
            .unwrap();

        let err = engine
            .finalize_day(FinalizeDayRequest::new("u1").with_date(date()))
            .await
            .unwrap_err();
        assert!(matches!(err, NutritionError::UnrepairableOutput { .. }));

        assert_eq!(engine.pending_meals("u1", Some(date())).await.unwrap().len(), 1);
        assert!(engine.day_summary("u1", Some(date())).await.unwrap().is_none());
    }
}
