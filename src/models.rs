// ABOUTME: Core data model for meal inputs, meals, and daily nutrition summaries
// ABOUTME: Defines the (user, date) keyed entities that flow through the batching pipeline
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutribatch Contributors

//! # Data Model
//!
//! The engine tracks two entity families, both keyed by [`DayKey`]
//! (user + date):
//!
//! - [`RawMealInput`]: free-text meal descriptions as the user logged them.
//!   Immutable once created; a finalize marks them consumed but never deletes
//!   them, so every summary can be audited back to its raw inputs.
//! - [`DayNutritionSummary`]: the consolidated structured result of a
//!   finalize, replaced wholesale by edits and re-finalizes.
//!
//! [`DayNutrition`] is the nutrition payload itself (meals, items, totals) as
//! decoded from model output or submitted by the caller in an edit.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of post-hoc edits (or re-finalizes) allowed per day.
/// Keeps correction costs bounded; a third attempt always fails.
pub const MAX_EDITS: u8 = 2;

/// Identity key for all per-day state: one user, one calendar date.
///
/// No cross-date aggregation ever happens implicitly; every operation in the
/// engine resolves to exactly one `DayKey`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DayKey {
    /// User identifier
    pub user_id: String,
    /// Calendar date in the caller's locale
    pub date: NaiveDate,
}

impl DayKey {
    /// Create a new day key
    pub fn new(user_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            user_id: user_id.into(),
            date,
        }
    }
}

impl std::fmt::Display for DayKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.user_id, self.date)
    }
}

/// A single free-text meal description logged by the user
///
/// Immutable once created. `consumed` flips to true when a finalize
/// incorporates the text into a summary; the record itself is retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMealInput {
    /// Unique id, referenced by `DayNutritionSummary::source_raw_ids`
    pub id: Uuid,
    /// User who logged the meal
    pub user_id: String,
    /// Day the meal belongs to
    pub date: NaiveDate,
    /// Free-form meal description, stored verbatim
    pub text: String,
    /// When the text was logged; defines pending order
    pub created_at: DateTime<Utc>,
    /// Whether a successful finalize has already consolidated this input
    pub consumed: bool,
}

impl RawMealInput {
    /// Create a new, unconsumed raw input with a fresh id
    pub fn new(user_id: impl Into<String>, date: NaiveDate, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            date,
            text: text.into(),
            created_at: Utc::now(),
            consumed: false,
        }
    }
}

/// Macro and calorie sums, used when recomputing claimed values
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MacroTotals {
    /// Protein in grams
    pub protein_g: f64,
    /// Carbohydrate in grams
    pub carb_g: f64,
    /// Fat in grams
    pub fat_g: f64,
    /// Energy in kilocalories
    pub kcal: f64,
}

/// A single food item within a meal, with macros and calories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealItem {
    /// Food name as the model identified it
    pub name: String,
    /// Estimated portion mass in grams
    pub grams: f64,
    /// Protein in grams
    pub protein_g: f64,
    /// Carbohydrate in grams
    pub carb_g: f64,
    /// Fat in grams
    pub fat_g: f64,
    /// Energy in kilocalories
    pub kcal: f64,
}

/// One meal within a day: a label, its items, and claimed subtotals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meal {
    /// Meal label, e.g. "breakfast"
    pub label: String,
    /// Items in the order the model emitted them
    pub items: Vec<MealItem>,
    /// Claimed protein subtotal in grams
    pub subtotal_protein_g: f64,
    /// Claimed carbohydrate subtotal in grams
    pub subtotal_carb_g: f64,
    /// Claimed fat subtotal in grams
    pub subtotal_fat_g: f64,
    /// Claimed energy subtotal in kilocalories
    pub subtotal_kcal: f64,
}

impl Meal {
    /// Sum this meal's items, ignoring the claimed subtotals
    #[must_use]
    pub fn computed_subtotals(&self) -> MacroTotals {
        self.items.iter().fold(MacroTotals::default(), |acc, item| {
            MacroTotals {
                protein_g: acc.protein_g + item.protein_g,
                carb_g: acc.carb_g + item.carb_g,
                fat_g: acc.fat_g + item.fat_g,
                kcal: acc.kcal + item.kcal,
            }
        })
    }

    /// The claimed subtotals as a [`MacroTotals`]
    #[must_use]
    pub const fn claimed_subtotals(&self) -> MacroTotals {
        MacroTotals {
            protein_g: self.subtotal_protein_g,
            carb_g: self.subtotal_carb_g,
            fat_g: self.subtotal_fat_g,
            kcal: self.subtotal_kcal,
        }
    }
}

/// The consolidated nutrition payload for one day
///
/// This is the shape decoded from model output and the shape callers submit
/// when editing. Claimed totals are validated against recomputed sums before
/// anything is stored; see the `validation` module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayNutrition {
    /// Meals in the order they were described
    pub meals: Vec<Meal>,
    /// Claimed protein total in grams
    pub total_protein_g: f64,
    /// Claimed carbohydrate total in grams
    pub total_carb_g: f64,
    /// Claimed fat total in grams
    pub total_fat_g: f64,
    /// Claimed energy total in kilocalories
    pub total_kcal: f64,
}

impl DayNutrition {
    /// Sum the claimed meal subtotals, ignoring the claimed day totals
    #[must_use]
    pub fn computed_totals(&self) -> MacroTotals {
        self.meals.iter().fold(MacroTotals::default(), |acc, meal| {
            MacroTotals {
                protein_g: acc.protein_g + meal.subtotal_protein_g,
                carb_g: acc.carb_g + meal.subtotal_carb_g,
                fat_g: acc.fat_g + meal.subtotal_fat_g,
                kcal: acc.kcal + meal.subtotal_kcal,
            }
        })
    }

    /// The claimed day totals as a [`MacroTotals`]
    #[must_use]
    pub const fn claimed_totals(&self) -> MacroTotals {
        MacroTotals {
            protein_g: self.total_protein_g,
            carb_g: self.total_carb_g,
            fat_g: self.total_fat_g,
            kcal: self.total_kcal,
        }
    }

    /// Human-readable one-line summary of the day
    #[must_use]
    pub fn summarize(&self) -> String {
        let meals = self
            .meals
            .iter()
            .map(|m| m.label.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Meals: {meals}. Totals: {:.1}g protein, {:.1}g carb, {:.1}g fat, {:.0} kcal.",
            self.total_protein_g, self.total_carb_g, self.total_fat_g, self.total_kcal
        )
    }
}

/// The stored, finalized summary for one (user, date) key
///
/// Exactly one exists per key once the first finalize succeeds. Edits and
/// re-finalizes replace the payload wholesale and increment `edit_count`,
/// never merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayNutritionSummary {
    /// User the summary belongs to
    pub user_id: String,
    /// Day the summary covers
    pub date: NaiveDate,
    /// The consolidated nutrition payload
    pub nutrition: DayNutrition,
    /// Number of post-hoc edits applied so far (0 after first finalize)
    pub edit_count: u8,
    /// Ids of every raw input that fed this summary, for audit
    pub source_raw_ids: Vec<Uuid>,
    /// Last write timestamp
    pub updated_at: DateTime<Utc>,
}

impl DayNutritionSummary {
    /// Build the first-finalize summary for a key (`edit_count` = 0)
    #[must_use]
    pub fn finalized(key: &DayKey, nutrition: DayNutrition, source_raw_ids: Vec<Uuid>) -> Self {
        Self {
            user_id: key.user_id.clone(),
            date: key.date,
            nutrition,
            edit_count: 0,
            source_raw_ids,
            updated_at: Utc::now(),
        }
    }

    /// The identity key of this summary
    #[must_use]
    pub fn key(&self) -> DayKey {
        DayKey::new(self.user_id.clone(), self.date)
    }
}
