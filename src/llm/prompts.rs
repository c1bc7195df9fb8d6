// ABOUTME: Prompt composition for the single end-of-day consolidation call
// ABOUTME: Builds instruction, compact JSON schema, and order-labeled meal texts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutribatch Contributors

//! # Consolidation Prompts
//!
//! One prompt per finalize, carrying every raw meal text of the day labeled
//! by its original order plus the compact JSON schema the model must fill.
//! The schema deliberately stops at macros and calories; micronutrients are
//! out of scope.

use serde_json::json;

use crate::models::RawMealInput;

/// Instruction prefix for the consolidation call
pub const CONSOLIDATION_INSTRUCTION: &str = "Return JSON only. No prose. \
Follow the schema exactly. \
Emit one object covering all meals described. \
Calculate each meal's subtotals as the sum of its items and the day totals as the sum of all meal subtotals. \
Only include protein_g, carb_g, fat_g, and kcal - no micronutrients. \
Be accurate with portion sizes and nutritional values.";

/// Compact JSON schema for the expected day-nutrition object
#[must_use]
pub fn day_nutrition_schema() -> serde_json::Value {
    let mut item_properties = json!({
        "name": {"type": "string"},
        "grams": {"type": "number"},
    });
    merge(&mut item_properties, macro_fields(""));

    let mut meal_properties = json!({
        "label": {"type": "string"},
        "items": {
            "type": "array",
            "items": {
                "type": "object",
                "properties": item_properties,
                "required": ["name", "grams", "protein_g", "carb_g", "fat_g", "kcal"],
            },
        },
    });
    merge(&mut meal_properties, macro_fields("subtotal_"));

    let mut root_properties = json!({
        "meals": {
            "type": "array",
            "items": {
                "type": "object",
                "properties": meal_properties,
                "required": [
                    "label", "items",
                    "subtotal_protein_g", "subtotal_carb_g", "subtotal_fat_g", "subtotal_kcal",
                ],
            },
        },
    });
    merge(&mut root_properties, macro_fields("total_"));

    json!({
        "type": "object",
        "properties": root_properties,
        "required": ["meals", "total_protein_g", "total_carb_g", "total_fat_g", "total_kcal"],
    })
}

fn macro_fields(prefix: &str) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for name in ["protein_g", "carb_g", "fat_g", "kcal"] {
        map.insert(format!("{prefix}{name}"), json!({"type": "number"}));
    }
    serde_json::Value::Object(map)
}

fn merge(target: &mut serde_json::Value, additions: serde_json::Value) {
    if let (Some(target_map), serde_json::Value::Object(addition_map)) =
        (target.as_object_mut(), additions)
    {
        target_map.extend(addition_map);
    }
}

/// Combine the day's raw texts into one block, labeled by original order.
///
/// A single entry is passed through verbatim; multiple entries are numbered
/// with their log time so the model can keep meals apart.
#[must_use]
pub fn combine_meal_texts(inputs: &[RawMealInput]) -> String {
    match inputs {
        [only] => only.text.clone(),
        _ => {
            let entries: Vec<String> = inputs
                .iter()
                .enumerate()
                .map(|(index, input)| {
                    format!(
                        "Meal {} (logged at {}): {}",
                        index + 1,
                        input.created_at.format("%H:%M"),
                        input.text
                    )
                })
                .collect();
            format!(
                "Here are all my meals for today:\n\n{}",
                entries.join("\n\n")
            )
        }
    }
}

/// Build the full consolidation prompt for one finalize call
#[must_use]
pub fn build_consolidation_prompt(inputs: &[RawMealInput]) -> String {
    let schema = day_nutrition_schema().to_string();
    let combined = combine_meal_texts(inputs);
    format!("{CONSOLIDATION_INSTRUCTION}\n\nSchema:\n{schema}\n\nUser input:\n{combined}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn input(text: &str) -> RawMealInput {
        RawMealInput::new("u1", NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), text)
    }

    #[test]
    fn single_text_passes_through_verbatim() {
        let inputs = vec![input("2 eggs and toast")];
        assert_eq!(combine_meal_texts(&inputs), "2 eggs and toast");
    }

    #[test]
    fn multiple_texts_are_numbered_in_order() {
        let inputs = vec![input("eggs"), input("chicken salad"), input("salmon")];
        let combined = combine_meal_texts(&inputs);
        assert!(combined.contains("Meal 1"));
        assert!(combined.contains("Meal 2 "));
        assert!(combined.contains("Meal 3"));
        assert!(combined.find("eggs").unwrap() < combined.find("chicken salad").unwrap());
        assert!(combined.find("chicken salad").unwrap() < combined.find("salmon").unwrap());
    }

    #[test]
    fn prompt_carries_instruction_schema_and_input() {
        let prompt = build_consolidation_prompt(&[input("oatmeal with berries")]);
        assert!(prompt.starts_with("Return JSON only."));
        assert!(prompt.contains("\"total_protein_g\""));
        assert!(prompt.contains("\"subtotal_kcal\""));
        assert!(prompt.contains("oatmeal with berries"));
    }

    #[test]
    fn schema_requires_all_totals() {
        let schema = day_nutrition_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert!(required.contains(&"meals"));
        assert!(required.contains(&"total_kcal"));
    }
}
