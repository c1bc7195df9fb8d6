// ABOUTME: Last-resort syntactic repair of near-valid JSON returned by the model
// ABOUTME: Fixes enumerated structural defects only; never invents semantic values
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutribatch Contributors

//! # Structured Output Repairer
//!
//! Models under token pressure truncate output or drop closing delimiters.
//! This module normalizes such near-valid text before strict schema decoding.
//! It recognizes a small, enumerable set of defects:
//!
//! - prose or a ` ```json ` fence wrapped around the object
//! - a missing `]` closing the meals array immediately before the
//!   `"total_protein_g"` key
//! - unbalanced braces/brackets at end-of-text
//!
//! Repair applies the minimal insertion that balances structure and nothing
//! else. It is idempotent: already well-formed text is returned unchanged,
//! byte for byte. Output that cannot be made to parse surfaces as
//! [`NutritionError::UnrepairableOutput`] with the original text attached for
//! diagnostics.

use tracing::debug;

use crate::errors::{NutritionError, NutritionResult};

/// Key that terminates the meals array in the expected schema
const TOTALS_KEY: &str = "\"total_protein_g\"";

/// Repair near-valid structured text into parseable JSON.
///
/// Returns the input unchanged when it already parses. Otherwise tries, in
/// order: unwrapping fences/prose, reclosing the meals array before the
/// totals key, and appending missing closers at end-of-text. The first
/// candidate that parses wins.
///
/// # Errors
///
/// Returns [`NutritionError::UnrepairableOutput`] when no recognized defect
/// pattern applies or the repaired text still fails to parse.
pub fn repair(raw: &str) -> NutritionResult<String> {
    if parses(raw) {
        return Ok(raw.to_owned());
    }

    let candidates = extract_candidates(raw);
    if candidates.is_empty() {
        return Err(unrepairable(raw, "no JSON object found in output"));
    }

    for candidate in &candidates {
        if parses(candidate) {
            debug!("model output repaired by unwrapping surrounding text");
            return Ok(candidate.clone());
        }
    }

    for candidate in &candidates {
        if let Some(fixed) = close_meals_array(candidate) {
            if parses(&fixed) {
                debug!("model output repaired by reclosing the meals array");
                return Ok(fixed);
            }
        }
    }

    // Balance the end-of-text candidate first: it keeps a truncated totals
    // tail that the last-brace slice would have dropped.
    for candidate in candidates.iter().rev() {
        if let Some(fixed) = balance_delimiters(candidate) {
            if parses(&fixed) {
                debug!("model output repaired by appending trailing closers");
                return Ok(fixed);
            }
        }
    }

    Err(unrepairable(
        raw,
        "structural repair produced no parseable candidate",
    ))
}

fn parses(text: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(text).is_ok()
}

fn unrepairable(raw: &str, reason: &str) -> NutritionError {
    NutritionError::UnrepairableOutput {
        reason: reason.to_owned(),
        raw: raw.to_owned(),
    }
}

/// Candidate object regions pulled from fenced or prose-wrapped output.
///
/// Prefers a ` ```json ` fenced block, then the slice from the first `{` to
/// the last `}` (drops trailing prose), then everything from the first `{` to
/// end-of-text (keeps a truncated tail for the balancing pass to finish).
fn extract_candidates(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let mut candidates = Vec::new();

    if let Some(fenced) = extract_fenced(trimmed) {
        candidates.push(fenced);
    }

    if let Some(start) = trimmed.find('{') {
        if let Some(end) = trimmed.rfind('}') {
            if end > start {
                candidates.push(trimmed[start..=end].to_owned());
            }
        }
        let tail = trimmed[start..].to_owned();
        if !candidates.contains(&tail) {
            candidates.push(tail);
        }
    }

    candidates
}

fn extract_fenced(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    let fence_start = lower.find("```json")?;
    let body_start = fence_start + "```json".len();
    let rest = &text[body_start..];
    let body = match rest.find("```") {
        Some(fence_end) => &rest[..fence_end],
        None => rest,
    };
    let body = body.trim();
    if body.starts_with('{') {
        Some(body.to_owned())
    } else {
        None
    }
}

/// Scan JSON-ish text and return the stack of delimiters still open at the
/// end, skipping string contents. Returns `None` when the text ends inside a
/// string literal: closing a truncated string would require guessing at
/// semantic content, which the repairer never does.
fn open_delimiters(text: &str) -> Option<Vec<char>> {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => stack.push(c),
            '}' => {
                if stack.last() == Some(&'{') {
                    stack.pop();
                }
            }
            ']' => {
                if stack.last() == Some(&'[') {
                    stack.pop();
                }
            }
            _ => {}
        }
    }

    if in_string {
        None
    } else {
        Some(stack)
    }
}

/// Reinsert the `]` that closes the meals array when the totals key follows
/// an unclosed array. Handles the common truncation shape
/// `...}},"total_protein_g":...` where `}]` collapsed to `}`.
fn close_meals_array(candidate: &str) -> Option<String> {
    let idx = candidate.find(TOTALS_KEY)?;
    let prefix = &candidate[..idx];
    let open = open_delimiters(prefix)?;
    if !open.contains(&'[') {
        return None;
    }

    let mut fixed = String::with_capacity(candidate.len() + 2);
    fixed.push_str(prefix);
    fixed.push_str("],");
    fixed.push_str(&candidate[idx..]);
    // The insertion lands after whatever separator already preceded the
    // totals key, so collapse the doubled punctuation it can produce.
    let fixed = fixed
        .replace("},],\"total", "}],\"total")
        .replace(",],\"total", "],\"total");
    Some(fixed)
}

/// Append the closers for any delimiters still open at end-of-text, innermost
/// first.
fn balance_delimiters(candidate: &str) -> Option<String> {
    let open = open_delimiters(candidate)?;
    if open.is_empty() {
        return None;
    }

    let mut fixed = candidate.trim_end().to_owned();
    // A truncated list/object often ends on a dangling comma
    if fixed.ends_with(',') {
        fixed.pop();
    }
    for delimiter in open.iter().rev() {
        fixed.push(match delimiter {
            '[' => ']',
            _ => '}',
        });
    }
    Some(fixed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = r#"{"meals":[{"label":"breakfast","items":[{"name":"Eggs","grams":100,"protein_g":12.6,"carb_g":1.1,"fat_g":9.0,"kcal":155}],"subtotal_protein_g":12.6,"subtotal_carb_g":1.1,"subtotal_fat_g":9.0,"subtotal_kcal":155}],"total_protein_g":12.6,"total_carb_g":1.1,"total_fat_g":9.0,"total_kcal":155}"#;

    #[test]
    fn well_formed_text_is_returned_byte_identical() {
        let repaired = repair(WELL_FORMED).unwrap();
        assert_eq!(repaired, WELL_FORMED);
    }

    #[test]
    fn repair_is_idempotent() {
        let mangled = WELL_FORMED.replace("}],\"total_protein_g\"", "},\"total_protein_g\"");
        let once = repair(&mangled).unwrap();
        let twice = repair(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn unwraps_json_fence() {
        let fenced = format!("Here you go:\n```json\n{WELL_FORMED}\n```\n");
        let repaired = repair(&fenced).unwrap();
        assert_eq!(repaired, WELL_FORMED);
    }

    #[test]
    fn strips_surrounding_prose() {
        let wrapped = format!("Sure! The summary is {WELL_FORMED} - enjoy your day.");
        let repaired = repair(&wrapped).unwrap();
        assert_eq!(repaired, WELL_FORMED);
    }

    #[test]
    fn recloses_meals_array_before_totals_key() {
        // The `]` closing the meals array is missing before the totals key
        let mangled = WELL_FORMED.replace("}],\"total_protein_g\"", "},\"total_protein_g\"");
        assert!(serde_json::from_str::<serde_json::Value>(&mangled).is_err());
        let repaired = repair(&mangled).unwrap();
        let value: serde_json::Value = serde_json::from_str(&repaired).unwrap();
        assert!(value["meals"].is_array());
        assert_eq!(value["total_protein_g"], 12.6);
    }

    #[test]
    fn appends_missing_trailing_closers() {
        // Truncated after the last subtotal value: }],"..."} all lost
        let truncated = &WELL_FORMED[..WELL_FORMED.len() - 2];
        assert!(serde_json::from_str::<serde_json::Value>(truncated).is_err());
        let repaired = repair(truncated).unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(&repaired).is_ok());
    }

    #[test]
    fn drops_dangling_comma_before_closing() {
        let truncated = r#"{"meals":[{"label":"lunch","items":[],"subtotal_protein_g":0,"subtotal_carb_g":0,"subtotal_fat_g":0,"subtotal_kcal":0},"#;
        let repaired = repair(truncated).unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(&repaired).is_ok());
    }

    #[test]
    fn refuses_output_with_no_object() {
        let err = repair("I could not parse any meals from that.").unwrap_err();
        match err {
            NutritionError::UnrepairableOutput { raw, .. } => {
                assert!(raw.contains("could not parse"));
            }
            other => panic!("expected UnrepairableOutput, got {other:?}"),
        }
    }

    #[test]
    fn refuses_text_truncated_inside_a_string() {
        // Closing the string would mean inventing content; repair must not guess
        let truncated = r#"{"meals":[{"label":"din"#;
        assert!(repair(truncated).is_err());
    }

    #[test]
    fn never_touches_bracket_characters_inside_strings() {
        let tricky = r#"{"meals":[{"label":"snack [late]","items":[{"name":"Trail mix {nuts}","grams":40,"protein_g":6,"carb_g":18,"fat_g":14,"kcal":220}],"subtotal_protein_g":6,"subtotal_carb_g":18,"subtotal_fat_g":14,"subtotal_kcal":220}],"total_protein_g":6,"total_carb_g":18,"total_fat_g":14,"total_kcal":220}"#;
        let repaired = repair(tricky).unwrap();
        assert_eq!(repaired, tricky);
    }
}
