// ABOUTME: Summary persistence plus the bounded post-hoc edit lifecycle
// ABOUTME: Wholesale replacement only; edit_count gates both edits and re-finalizes

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutribatch Contributors

//! # Summary Lifecycle
//!
//! A day's summary is written once by the first successful finalize and can
//! then be revised at most [`MAX_EDITS`] times. Two kinds of revision exist
//! and share the same ceiling:
//!
//! - a manual edit, where the caller submits a complete replacement payload
//! - a re-finalize, where meals logged after the first finalize trigger a
//!   fresh consolidation over the whole day
//!
//! Every revision replaces the nutrition payload wholesale; there is no
//! field-level merging. A revision that fails (validation, ceiling) leaves
//! the stored summary untouched.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::errors::{NutritionError, NutritionResult};
use crate::models::{DayKey, DayNutrition, DayNutritionSummary, MAX_EDITS};
use crate::store::NutritionStore;
use crate::validation::validate_day;

/// Read/write access to stored summaries
#[derive(Clone)]
pub struct SummaryStore {
    store: Arc<dyn NutritionStore>,
}

impl SummaryStore {
    /// Create a summary store over the given backend
    #[must_use]
    pub fn new(store: Arc<dyn NutritionStore>) -> Self {
        Self { store }
    }

    /// The stored summary for the key, if any
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn get(&self, key: &DayKey) -> NutritionResult<Option<DayNutritionSummary>> {
        self.store.summary(key).await
    }

    /// Store the first-finalize summary for a key (`edit_count` starts at 0)
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    pub async fn put_first(
        &self,
        key: &DayKey,
        nutrition: DayNutrition,
        source_raw_ids: Vec<Uuid>,
    ) -> NutritionResult<DayNutritionSummary> {
        let summary = DayNutritionSummary::finalized(key, nutrition, source_raw_ids);
        self.store.put_summary(summary.clone()).await?;
        info!(key = %key, sources = summary.source_raw_ids.len(), "day summary finalized");
        Ok(summary)
    }
}

/// Applies bounded revisions to an existing summary
#[derive(Clone)]
pub struct EditController {
    store: Arc<dyn NutritionStore>,
}

impl EditController {
    /// Create an edit controller over the given backend
    #[must_use]
    pub fn new(store: Arc<dyn NutritionStore>) -> Self {
        Self { store }
    }

    /// Whether the key's summary can take another revision.
    ///
    /// Used to fail a re-finalize before the provider call is spent.
    ///
    /// # Errors
    ///
    /// - [`NutritionError::SummaryNotFound`] when the key was never finalized
    /// - [`NutritionError::EditLimitExceeded`] when the ceiling is reached
    pub async fn check_revisable(&self, key: &DayKey) -> NutritionResult<DayNutritionSummary> {
        let summary = self
            .store
            .summary(key)
            .await?
            .ok_or_else(|| NutritionError::SummaryNotFound {
                user_id: key.user_id.clone(),
                date: key.date,
            })?;
        if summary.edit_count >= MAX_EDITS {
            return Err(NutritionError::EditLimitExceeded {
                date: key.date,
                max_edits: MAX_EDITS,
            });
        }
        Ok(summary)
    }

    /// Apply a caller-submitted replacement payload.
    ///
    /// The payload is validated for arithmetic consistency first; a rejected
    /// edit does not consume an edit slot.
    ///
    /// # Errors
    ///
    /// - [`NutritionError::SummaryNotFound`] when the key was never finalized
    /// - [`NutritionError::EditLimitExceeded`] when the ceiling is reached
    /// - [`NutritionError::Validation`] when the payload is inconsistent
    pub async fn apply_edit(
        &self,
        key: &DayKey,
        nutrition: DayNutrition,
    ) -> NutritionResult<DayNutritionSummary> {
        let summary = self.check_revisable(key).await?;
        validate_day(&nutrition)?;
        self.replace(summary, nutrition, None).await
    }

    /// Apply a re-finalize result: a fresh consolidation over the whole day.
    ///
    /// The caller has already validated the payload (the extractor does) and
    /// supplies the complete set of source input ids for the revised summary.
    ///
    /// # Errors
    ///
    /// Same ceiling errors as [`Self::apply_edit`]; returns a storage error if
    /// the write fails.
    pub async fn apply_refinalize(
        &self,
        key: &DayKey,
        nutrition: DayNutrition,
        source_raw_ids: Vec<Uuid>,
    ) -> NutritionResult<DayNutritionSummary> {
        let summary = self.check_revisable(key).await?;
        self.replace(summary, nutrition, Some(source_raw_ids)).await
    }

    async fn replace(
        &self,
        mut summary: DayNutritionSummary,
        nutrition: DayNutrition,
        source_raw_ids: Option<Vec<Uuid>>,
    ) -> NutritionResult<DayNutritionSummary> {
        summary.nutrition = nutrition;
        summary.edit_count += 1;
        if let Some(ids) = source_raw_ids {
            summary.source_raw_ids = ids;
        }
        summary.updated_at = Utc::now();
        self.store.put_summary(summary.clone()).await?;
        info!(
            key = %summary.key(),
            edit_count = summary.edit_count,
            "day summary revised"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Meal, MealItem};
    use crate::store::InMemoryStore;
    use chrono::NaiveDate;

    fn key() -> DayKey {
        DayKey::new("u1", NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
    }

    fn consistent_day(kcal: f64) -> DayNutrition {
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

    #[tokio::test]
    async fn first_finalize_starts_at_zero_edits() {
        let store: Arc<dyn NutritionStore> = Arc::new(InMemoryStore::new());
        let summaries = SummaryStore::new(store);
        let summary = summaries
            .put_first(&key(), consistent_day(300.0), vec![Uuid::new_v4()])
            .await
            .unwrap();
        assert_eq!(summary.edit_count, 0);
        assert_eq!(summary.source_raw_ids.len(), 1);
    }

    #[tokio::test]
    async fn edits_increment_and_hit_the_ceiling() {
        let store: Arc<dyn NutritionStore> = Arc::new(InMemoryStore::new());
        let summaries = SummaryStore::new(store.clone());
        let edits = EditController::new(store);

        summaries
            .put_first(&key(), consistent_day(300.0), vec![])
            .await
            .unwrap();

        let first = edits.apply_edit(&key(), consistent_day(310.0)).await.unwrap();
        assert_eq!(first.edit_count, 1);
        assert!((first.nutrition.total_kcal - 310.0).abs() < f64::EPSILON);

        let second = edits.apply_edit(&key(), consistent_day(320.0)).await.unwrap();
        assert_eq!(second.edit_count, 2);

        let err = edits.apply_edit(&key(), consistent_day(330.0)).await.unwrap_err();
        assert!(matches!(
            err,
            NutritionError::EditLimitExceeded { max_edits: 2, .. }
        ));
    }

    #[tokio::test]
    async fn rejected_edit_leaves_summary_and_count_untouched() {
        let store: Arc<dyn NutritionStore> = Arc::new(InMemoryStore::new());
        let summaries = SummaryStore::new(store.clone());
        let edits = EditController::new(store);

        summaries
            .put_first(&key(), consistent_day(300.0), vec![])
            .await
            .unwrap();

        let mut bad = consistent_day(300.0);
        bad.total_kcal = 900.0;
        let err = edits.apply_edit(&key(), bad).await.unwrap_err();
        assert!(matches!(err, NutritionError::Validation { .. }));

        let stored = summaries.get(&key()).await.unwrap().unwrap();
        assert_eq!(stored.edit_count, 0);
        assert!((stored.nutrition.total_kcal - 300.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn edit_without_summary_is_not_found() {
        let edits = EditController::new(Arc::new(InMemoryStore::new()));
        let err = edits.apply_edit(&key(), consistent_day(300.0)).await.unwrap_err();
        assert!(matches!(err, NutritionError::SummaryNotFound { .. }));
    }

    #[tokio::test]
    async fn refinalize_replaces_source_ids() {
        let store: Arc<dyn NutritionStore> = Arc::new(InMemoryStore::new());
        let summaries = SummaryStore::new(store.clone());
        let edits = EditController::new(store);

        let original_id = Uuid::new_v4();
        summaries
            .put_first(&key(), consistent_day(300.0), vec![original_id])
            .await
            .unwrap();

        let late_id = Uuid::new_v4();
        let revised = edits
            .apply_refinalize(&key(), consistent_day(500.0), vec![original_id, late_id])
            .await
            .unwrap();
        assert_eq!(revised.edit_count, 1);
        assert_eq!(revised.source_raw_ids, vec![original_id, late_id]);
    }
}
