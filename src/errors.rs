//! Unified error type for the gradebook crate.
//!
//! The computation pipeline never returns these for partially configured data
//! (missing subjects, unmatched grade bands); they cover storage failures and
//! raw input that cannot be persisted at all.

use thiserror::Error;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration or administrative input
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description
        message: String,
    },

    /// Subject configuration lookup failed where one is required
    #[error("Subject not found: {subject_id}")]
    SubjectNotFound {
        /// Subject identifier that was requested
        subject_id: i64,
    },

    /// Grade interval row lookup failed
    #[error("Grade interval not found: {interval_id}")]
    GradeIntervalNotFound {
        /// Interval row identifier that was requested
        interval_id: i64,
    },

    /// A raw component score cannot be stored
    #[error("Invalid {component} marks: {value}")]
    InvalidMarks {
        /// Component name (`subjective`, `objective`, `practical`)
        component: &'static str,
        /// Offending value
        value: f64,
    },

    /// A `min-max` class interval string could not be parsed
    #[error("Invalid class interval '{interval}': {reason}")]
    InvalidInterval {
        /// The raw interval string
        interval: String,
        /// Why it was rejected
        reason: String,
    },

    /// Database error from `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// JSON (de)serialization of a result snapshot failed
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
