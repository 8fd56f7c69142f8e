//! Reference data configuration loading from config.toml
//!
//! The grading policy and subject configurations are admin-managed tables. A fresh
//! database is seeded from the TOML file named by `GRADEBOOK_CONFIG` (default
//! `./config.toml`). Seeding only fills empty tables, so administrators' later edits
//! are never overwritten on restart.

use crate::{
    core::{grading, subject::SubjectConfig},
    entities::{GradeInterval, Subject},
    errors::{Error, Result},
};
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, TransactionTrait};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, instrument};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Default)]
pub struct SeedConfig {
    /// Grading policy rows to seed
    #[serde(default)]
    pub grading_policy: Vec<GradeIntervalConfig>,
    /// Subjects to seed
    #[serde(default)]
    pub subjects: Vec<SubjectConfig>,
}

/// Configuration for a single grading policy row
#[derive(Debug, Deserialize, Clone)]
pub struct GradeIntervalConfig {
    /// Inclusive percentage range, e.g. `"80-100"`
    pub class_interval: String,
    /// Letter grade
    pub letter_grade: String,
    /// Grade point
    pub grade_point: f64,
    /// Whether the row takes part in lookups
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

/// Counts of rows inserted by [`seed_reference_data`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Grading policy rows inserted
    pub grade_intervals: usize,
    /// Subjects inserted
    pub subjects: usize,
}

/// Loads reference data configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SeedConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Path of the seed file, from `GRADEBOOK_CONFIG` or the default `./config.toml`
#[must_use]
pub fn config_path() -> String {
    std::env::var("GRADEBOOK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

/// Loads reference data configuration from [`config_path`]
pub fn load_default_config() -> Result<SeedConfig> {
    load_config(config_path())
}

/// Inserts configured grading policy rows and subjects into empty tables.
///
/// Each table is seeded only when it has no rows. Every row is validated the same way
/// as an administrator's input, and the whole seed runs in one transaction.
#[instrument(skip_all)]
pub async fn seed_reference_data(db: &DatabaseConnection, config: &SeedConfig) -> Result<SeedSummary> {
    let txn = db.begin().await?;
    let mut summary = SeedSummary::default();

    if GradeInterval::find().count(&txn).await? == 0 {
        for row in &config.grading_policy {
            grading::create_grade_interval(
                &txn,
                &row.class_interval,
                &row.letter_grade,
                row.grade_point,
                row.active,
            )
            .await?;
            summary.grade_intervals += 1;
        }
    } else {
        info!("Grading policy already present, skipping seed.");
    }

    if Subject::find().count(&txn).await? == 0 {
        for subject in &config.subjects {
            crate::core::subject::create_subject(&txn, subject).await?;
            summary.subjects += 1;
        }
    } else {
        info!("Subjects already present, skipping seed.");
    }

    txn.commit().await?;
    info!(
        "Seeded {} grade intervals and {} subjects.",
        summary.grade_intervals, summary.subjects
    );
    Ok(summary)
}
