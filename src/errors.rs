// ABOUTME: Unified error taxonomy for the meal batching engine
// ABOUTME: Domain errors with structured fields plus transport-class detection for retry policy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nutribatch Contributors

//! # Error Handling
//!
//! Every fallible operation in the crate returns [`NutritionResult`]. The
//! variants mirror the failure taxonomy of the batching pipeline: user-visible
//! domain errors (`NoPendingMeals`, `EditLimitExceeded`, `SummaryNotFound`),
//! model-output failures (`UnrepairableOutput`, `Validation`), and provider
//! transport failures (`ProviderTimeout`, `Provider`).
//!
//! Only the transport class is ever retried internally; decode, repair, and
//! validation failures are deterministic for a given input and always surface
//! to the caller with enough structured detail to explain what went wrong.

use chrono::NaiveDate;

use crate::validation::ValidationIssue;

/// Unified error type for the meal batching engine
#[derive(Debug, thiserror::Error)]
pub enum NutritionError {
    /// Finalize was requested for a key with nothing left to consolidate
    #[error("no pending meals for user '{user_id}' on {date}")]
    NoPendingMeals {
        /// User whose day was being finalized
        user_id: String,
        /// Date that had no pending input
        date: NaiveDate,
    },

    /// Model output could not be coerced into well-formed structured text
    #[error("model output could not be repaired into valid JSON: {reason}")]
    UnrepairableOutput {
        /// Why repair gave up
        reason: String,
        /// The original model output, retained for diagnostics
        raw: String,
    },

    /// Claimed totals disagree with recomputed sums beyond tolerance
    #[error("nutrition arithmetic mismatch in {} field(s)", issues.len())]
    Validation {
        /// One entry per mismatching field, with claimed/computed/delta detail
        issues: Vec<ValidationIssue>,
    },

    /// The per-day edit ceiling has been reached; the stored summary is untouched
    #[error("edit limit ({max_edits}) reached for {date}")]
    EditLimitExceeded {
        /// Date whose summary can no longer be edited
        date: NaiveDate,
        /// The ceiling that was hit
        max_edits: u8,
    },

    /// Edit attempted on a key that was never finalized
    #[error("no daily summary found for user '{user_id}' on {date}")]
    SummaryNotFound {
        /// User whose summary was requested
        user_id: String,
        /// Date with no finalized summary
        date: NaiveDate,
    },

    /// Provider call exceeded its deadline
    #[error("LLM provider timed out after {timeout_secs}s")]
    ProviderTimeout {
        /// Configured request timeout
        timeout_secs: u64,
    },

    /// Provider call failed at the transport or API level
    #[error("LLM provider error{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Provider {
        /// HTTP status, when the failure came from an API response
        status: Option<u16>,
        /// Provider-reported or transport error detail
        message: String,
    },

    /// Missing or invalid configuration
    #[error("configuration error: {message}")]
    Config {
        /// What was missing or invalid
        message: String,
    },

    /// Persistence collaborator failure
    #[error("storage error: {message}")]
    Storage {
        /// Underlying storage failure detail
        message: String,
    },
}

impl NutritionError {
    /// Whether this error belongs to the transport class that the extractor
    /// retries with bounded backoff.
    ///
    /// Timeouts, connection failures (no HTTP status), rate limiting (429),
    /// and server-side failures (5xx) are transient; everything else is
    /// deterministic for the same input and must not be retried.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        match self {
            Self::ProviderTimeout { .. } => true,
            Self::Provider { status, .. } => match status {
                None => true,
                Some(code) => *code == 429 || *code >= 500,
            },
            _ => false,
        }
    }

    /// Convenience constructor for configuration errors
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Convenience constructor for storage errors
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

/// Result type alias for convenience
pub type NutritionResult<T> = Result<T, NutritionError>;
