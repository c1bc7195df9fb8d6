// ABOUTME: Capture service for free-text meal logs
// ABOUTME: Zero model calls at log time; text is stored verbatim for the end-of-day batch

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutribatch Contributors

//! # Raw Input Capture
//!
//! Logging a meal is a pure write: the text goes into the store verbatim,
//! unparsed, and the call returns immediately. All interpretation is deferred
//! to the single consolidation call at finalize time, which is what keeps
//! per-day model cost constant no matter how many meals the user logs.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use crate::errors::NutritionResult;
use crate::models::{DayKey, RawMealInput};
use crate::store::NutritionStore;

/// Capture and query service for raw meal inputs
#[derive(Clone)]
pub struct RawInputStore {
    store: Arc<dyn NutritionStore>,
}

impl RawInputStore {
    /// Create a capture service over the given store
    #[must_use]
    pub fn new(store: Arc<dyn NutritionStore>) -> Self {
        Self { store }
    }

    /// Log a free-text meal description for the given day.
    ///
    /// The text is stored verbatim; no parsing or model call happens here.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the append fails.
    pub async fn log(
        &self,
        user_id: &str,
        date: NaiveDate,
        text: &str,
    ) -> NutritionResult<RawMealInput> {
        let input = RawMealInput::new(user_id, date, text);
        debug!(
            user_id = %user_id,
            date = %date,
            input_id = %input.id,
            chars = text.len(),
            "logging raw meal input"
        );
        self.store.append_raw_input(input.clone()).await?;
        Ok(input)
    }

    /// Raw inputs for the key not yet consolidated, in append order
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn pending(&self, key: &DayKey) -> NutritionResult<Vec<RawMealInput>> {
        self.store.pending_inputs(key).await
    }

    /// Every raw input for the key, consumed or not, in append order
    ///
    /// # Errors
    ///
    /// Returns a storage error if the query fails.
    pub async fn all(&self, key: &DayKey) -> NutritionResult<Vec<RawMealInput>> {
        self.store.raw_inputs(key).await
    }

    /// Flag the given inputs as consolidated; the records are retained
    ///
    /// # Errors
    ///
    /// Returns a storage error if the update fails.
    pub async fn mark_consumed(&self, key: &DayKey, ids: &[Uuid]) -> NutritionResult<()> {
        self.store.mark_consumed(key, ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[tokio::test]
    async fn log_stores_text_verbatim() {
        let service = RawInputStore::new(Arc::new(InMemoryStore::new()));
        let text = "2 eggs, toast with butter, black coffee";
        let input = service.log("u1", date(), text).await.unwrap();
        assert_eq!(input.text, text);
        assert!(!input.consumed);

        let key = DayKey::new("u1", date());
        let pending = service.pending(&key).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].text, text);
    }

    #[tokio::test]
    async fn logs_accumulate_in_order() {
        let service = RawInputStore::new(Arc::new(InMemoryStore::new()));
        for text in ["breakfast", "lunch", "dinner"] {
            service.log("u1", date(), text).await.unwrap();
        }
        let key = DayKey::new("u1", date());
        let pending = service.pending(&key).await.unwrap();
        let texts: Vec<&str> = pending.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["breakfast", "lunch", "dinner"]);
    }
}
