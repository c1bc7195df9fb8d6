// ABOUTME: Windowed retrieval of finalized daily summaries
// ABOUTME: Inclusive day window ending today, returned newest first

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutribatch Contributors

//! # History Index
//!
//! Answers "what did I eat over the last N days" from finalized summaries
//! only; pending raw inputs never appear here. The window is the N calendar
//! days ending at the reference date inclusive, so `days = 7` as of Monday
//! covers the previous Tuesday through Monday. Days that were never
//! finalized simply have no entry.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};

use crate::errors::NutritionResult;
use crate::models::DayNutritionSummary;
use crate::store::NutritionStore;

/// Query service for per-user summary history
#[derive(Clone)]
pub struct HistoryIndex {
    store: Arc<dyn NutritionStore>,
}

impl HistoryIndex {
    /// Create a history index over the given backend
    #[must_use]
    pub fn new(store: Arc<dyn NutritionStore>) -> Self {
        Self { store }
    }

    /// Summaries for the `days`-day window ending at `as_of` inclusive,
    /// newest first. `days = 0` yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn window(
        &self,
        user_id: &str,
        days: u32,
        as_of: NaiveDate,
    ) -> NutritionResult<Vec<DayNutritionSummary>> {
        if days == 0 {
            return Ok(Vec::new());
        }
        let start = as_of - Duration::days(i64::from(days) - 1);

        let mut summaries: Vec<DayNutritionSummary> = self
            .store
            .user_summaries(user_id)
            .await?
            .into_iter()
            .filter(|s| s.date >= start && s.date <= as_of)
            .collect();
        summaries.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DayKey, DayNutrition};
    use crate::store::InMemoryStore;

    fn day(kcal: f64) -> DayNutrition {
        DayNutrition {
            meals: vec![],
            total_protein_g: 0.0,
            total_carb_g: 0.0,
            total_fat_g: 0.0,
            total_kcal: kcal,
        }
    }

    async fn seed(store: &InMemoryStore, user: &str, date: NaiveDate, kcal: f64) {
        let key = DayKey::new(user, date);
        let summary =
            crate::models::DayNutritionSummary::finalized(&key, day(kcal), vec![]);
        store.put_summary(summary).await.unwrap();
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[tokio::test]
    async fn window_is_inclusive_and_newest_first() {
        let store = InMemoryStore::new();
        for (date, kcal) in [(d(10), 1800.0), (d(12), 2000.0), (d(15), 1900.0)] {
            seed(&store, "u1", date, kcal).await;
        }

        let history = HistoryIndex::new(Arc::new(store));
        // 6-day window ending Jan 15 covers Jan 10..=15
        let summaries = history.window("u1", 6, d(15)).await.unwrap();
        let dates: Vec<NaiveDate> = summaries.iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![d(15), d(12), d(10)]);
    }

    #[tokio::test]
    async fn window_excludes_older_days() {
        let store = InMemoryStore::new();
        seed(&store, "u1", d(10), 1800.0).await;
        seed(&store, "u1", d(15), 1900.0).await;

        let history = HistoryIndex::new(Arc::new(store));
        let summaries = history.window("u1", 3, d(15)).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].date, d(15));
    }

    #[tokio::test]
    async fn window_is_per_user() {
        let store = InMemoryStore::new();
        seed(&store, "u1", d(15), 1900.0).await;
        seed(&store, "u2", d(15), 2500.0).await;

        let history = HistoryIndex::new(Arc::new(store));
        let summaries = history.window("u1", 7, d(15)).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].user_id, "u1");
    }

    #[tokio::test]
    async fn zero_days_is_empty() {
        let store = InMemoryStore::new();
        seed(&store, "u1", d(15), 1900.0).await;
        let history = HistoryIndex::new(Arc::new(store));
        assert!(history.window("u1", 0, d(15)).await.unwrap().is_empty());
    }
}
