// ABOUTME: Arithmetic consistency validation for consolidated nutrition payloads
// ABOUTME: Recomputes meal subtotals and day totals and compares against claimed values
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutribatch Contributors

//! # Nutrition Validator
//!
//! Checks that what the model (or an editing caller) *claims* matches what is
//! *arithmetically true*:
//!
//! - every meal's subtotal fields must equal the sum of its items
//! - every day total must equal the sum of the meal subtotals
//!
//! within a shared tolerance of 0.5 absolute units or 1% relative, whichever
//! is larger. Mismatches are never silently corrected; the validator reports
//! every offending field with claimed value, computed value, and deltas so the
//! caller can present an explainable diff and decide whether to accept a
//! manual edit that resolves the discrepancy.

use serde::{Deserialize, Serialize};

use crate::errors::{NutritionError, NutritionResult};
use crate::models::{DayNutrition, MacroTotals};

/// Absolute tolerance for claimed-vs-computed comparisons (grams or kcal)
pub const ABS_TOLERANCE: f64 = 0.5;

/// Relative tolerance for claimed-vs-computed comparisons
pub const REL_TOLERANCE: f64 = 0.01;

/// One claimed-vs-computed mismatch discovered by validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Path of the mismatching field, e.g. `meals[1].subtotal_protein_g`
    pub field: String,
    /// Value the candidate claimed
    pub claimed: f64,
    /// Value recomputed from the constituent parts
    pub computed: f64,
    /// Absolute difference
    pub delta_abs: f64,
    /// Difference relative to the computed value (0 when computed is 0)
    pub delta_rel: f64,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: claimed {:.1} vs computed {:.1} (delta {:.2})",
            self.field, self.claimed, self.computed, self.delta_abs
        )
    }
}

/// Whether a claimed value is acceptably close to the recomputed one
#[must_use]
pub fn within_tolerance(claimed: f64, computed: f64) -> bool {
    let allowed = ABS_TOLERANCE.max(REL_TOLERANCE * computed.abs());
    (claimed - computed).abs() <= allowed
}

fn issue(field: String, claimed: f64, computed: f64) -> ValidationIssue {
    let delta_abs = (claimed - computed).abs();
    let delta_rel = if computed == 0.0 {
        0.0
    } else {
        delta_abs / computed.abs()
    };
    ValidationIssue {
        field,
        claimed,
        computed,
        delta_abs,
        delta_rel,
    }
}

fn check_totals(
    prefix: &str,
    field_stem: &str,
    claimed: MacroTotals,
    computed: MacroTotals,
    issues: &mut Vec<ValidationIssue>,
) {
    let fields = [
        ("protein_g", claimed.protein_g, computed.protein_g),
        ("carb_g", claimed.carb_g, computed.carb_g),
        ("fat_g", claimed.fat_g, computed.fat_g),
        ("kcal", claimed.kcal, computed.kcal),
    ];
    for (name, claimed_value, computed_value) in fields {
        if !within_tolerance(claimed_value, computed_value) {
            issues.push(issue(
                format!("{prefix}{field_stem}{name}"),
                claimed_value,
                computed_value,
            ));
        }
    }
}

/// Validate a consolidated nutrition payload for internal consistency.
///
/// Recomputes every meal subtotal from its items and every day total from the
/// meal subtotals, and collects one [`ValidationIssue`] per field outside
/// tolerance.
///
/// # Errors
///
/// Returns [`NutritionError::Validation`] carrying every issue found. The
/// candidate itself is never mutated.
pub fn validate_day(day: &DayNutrition) -> NutritionResult<()> {
    let mut issues = Vec::new();

    for (index, meal) in day.meals.iter().enumerate() {
        check_totals(
            &format!("meals[{index}]."),
            "subtotal_",
            meal.claimed_subtotals(),
            meal.computed_subtotals(),
            &mut issues,
        );
    }

    check_totals(
        "",
        "total_",
        day.claimed_totals(),
        day.computed_totals(),
        &mut issues,
    );

    if issues.is_empty() {
        Ok(())
    } else {
        Err(NutritionError::Validation { issues })
    }
}

/// Non-fatal sanity warnings about implausible values.
///
/// These never fail a finalize or edit; they ride along in the result so a
/// caller can flag a suspicious day to the user.
#[must_use]
pub fn plausibility_warnings(day: &DayNutrition) -> Vec<String> {
    let mut warnings = Vec::new();

    if day.total_kcal < 0.0 {
        warnings.push("negative calorie total".to_owned());
    }
    if day.total_kcal > 10_000.0 {
        warnings.push(format!(
            "unusually high calorie total ({:.0} kcal)",
            day.total_kcal
        ));
    }
    if day.total_protein_g < 0.0 {
        warnings.push("negative protein total".to_owned());
    }
    if day.total_carb_g < 0.0 {
        warnings.push("negative carbohydrate total".to_owned());
    }
    if day.total_fat_g < 0.0 {
        warnings.push("negative fat total".to_owned());
    }
    for meal in &day.meals {
        if meal.items.is_empty() {
            warnings.push(format!("meal '{}' has no items", meal.label));
        }
    }

    warnings
}
