// ABOUTME: In-memory reference implementation of the nutrition store
// ABOUTME: DashMap-backed keyed state with per-key atomic operations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutribatch Contributors

//! In-memory store used by tests and single-process deployments.
//!
//! `DashMap` gives per-entry locking, which is exactly the per-key atomicity
//! the [`NutritionStore`] contract asks for. State lives for the lifetime of
//! the process; nothing is evicted or deleted.

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use super::NutritionStore;
use crate::errors::NutritionResult;
use crate::models::{DayKey, DayNutritionSummary, RawMealInput};

/// DashMap-backed store for raw inputs and summaries
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inputs: DashMap<DayKey, Vec<RawMealInput>>,
    summaries: DashMap<DayKey, DayNutritionSummary>,
}

impl InMemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NutritionStore for InMemoryStore {
    async fn append_raw_input(&self, input: RawMealInput) -> NutritionResult<()> {
        let key = DayKey::new(input.user_id.clone(), input.date);
        self.inputs.entry(key).or_default().push(input);
        Ok(())
    }

    async fn raw_inputs(&self, key: &DayKey) -> NutritionResult<Vec<RawMealInput>> {
        Ok(self
            .inputs
            .get(key)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    async fn pending_inputs(&self, key: &DayKey) -> NutritionResult<Vec<RawMealInput>> {
        Ok(self
            .inputs
            .get(key)
            .map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|input| !input.consumed)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn mark_consumed(&self, key: &DayKey, ids: &[Uuid]) -> NutritionResult<()> {
        if let Some(mut entry) = self.inputs.get_mut(key) {
            for input in entry.value_mut().iter_mut() {
                if ids.contains(&input.id) {
                    input.consumed = true;
                }
            }
        }
        Ok(())
    }

    async fn summary(&self, key: &DayKey) -> NutritionResult<Option<DayNutritionSummary>> {
        Ok(self.summaries.get(key).map(|entry| entry.value().clone()))
    }

    async fn put_summary(&self, summary: DayNutritionSummary) -> NutritionResult<()> {
        self.summaries.insert(summary.key(), summary);
        Ok(())
    }

    async fn user_summaries(&self, user_id: &str) -> NutritionResult<Vec<DayNutritionSummary>> {
        Ok(self
            .summaries
            .iter()
            .filter(|entry| entry.key().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect())
    }
}
