//! Shared test utilities for the gradebook.
//!
//! This module provides common helper functions for setting up test databases
//! and building subjects, marks and grading policies with sensible defaults.

use crate::{
    core::{
        grading::{self, GradeBand, GradingPolicy},
        mark::{MarkInput, MarkKey},
        result::AcademicContext,
        subject::SubjectConfig,
    },
    entities::subject,
    errors::Result,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;

/// Exam used by [`mark_input`]
pub const TEST_EXAM_ID: i64 = 1;
/// Class used by [`mark_input`] and the subject builders in tests
pub const TEST_CLASS_ID: i64 = 1;
/// Session used by [`mark_input`]
pub const TEST_SESSION_ID: i64 = 2025;
/// Section used by [`mark_input`]
pub const TEST_SECTION_ID: i64 = 1;

/// The grading table used throughout the tests, as `(interval, grade, point)`.
const STANDARD_POLICY: [(&str, &str, f64); 7] = [
    ("80-100", "A+", 5.0),
    ("70-79", "A", 4.0),
    ("60-69", "B+", 3.5),
    ("50-59", "B", 3.0),
    ("40-49", "C", 2.0),
    ("33-39", "D", 1.0),
    ("0-32", "F", 0.0),
];

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// In-memory snapshot of the standard grading table.
#[must_use]
pub fn standard_policy() -> GradingPolicy {
    GradingPolicy::new(
        STANDARD_POLICY
            .iter()
            .map(|(interval, letter_grade, grade_point)| {
                let (min, max) = grading::parse_class_interval(interval)
                    .unwrap_or_else(|e| panic!("bad test interval: {e}"));
                GradeBand {
                    min,
                    max,
                    letter_grade: (*letter_grade).to_string(),
                    grade_point: *grade_point,
                }
            })
            .collect(),
    )
}

/// Inserts the standard grading table as active rows.
pub async fn seed_standard_policy(db: &DatabaseConnection) -> Result<()> {
    for (interval, letter_grade, grade_point) in STANDARD_POLICY {
        grading::create_grade_interval(db, interval, letter_grade, grade_point, true).await?;
    }
    Ok(())
}

/// Subject configuration with overall marks only.
///
/// # Defaults
/// * `code`, `group_id`: None
/// * all components unconfigured
#[must_use]
pub fn simple_subject(
    name: &str,
    class_id: i64,
    full_marks: f64,
    passing_marks: Option<f64>,
) -> SubjectConfig {
    SubjectConfig {
        name: name.to_string(),
        code: None,
        class_id,
        group_id: None,
        full_marks,
        passing_marks,
        subjective: component_marks(None, None),
        objective: component_marks(None, None),
        practical: component_marks(None, None),
    }
}

/// Subject configuration with all three components.
///
/// # Defaults
/// * full/passing: 100 / 40
/// * subjective: 50 / none, objective: 25 / none, practical: 25 / none
#[must_use]
pub fn component_subject(name: &str, class_id: i64) -> SubjectConfig {
    SubjectConfig {
        subjective: component_marks(Some(50.0), None),
        objective: component_marks(Some(25.0), None),
        practical: component_marks(Some(25.0), None),
        ..simple_subject(name, class_id, 100.0, Some(40.0))
    }
}

const fn component_marks(
    full_marks: Option<f64>,
    passing_marks: Option<f64>,
) -> crate::core::subject::ComponentConfig {
    crate::core::subject::ComponentConfig {
        full_marks,
        passing_marks,
    }
}

/// Builds a subject row from a configuration without touching a database.
#[must_use]
pub fn subject_model(id: i64, config: &SubjectConfig) -> subject::Model {
    let now = Utc::now();
    subject::Model {
        id,
        name: config.name.clone(),
        code: config.code.clone(),
        class_id: config.class_id,
        group_id: config.group_id,
        full_marks: config.full_marks,
        passing_marks: config.passing_marks,
        subjective_full_marks: config.subjective.full_marks,
        subjective_passing_marks: config.subjective.passing_marks,
        objective_full_marks: config.objective.full_marks,
        objective_passing_marks: config.objective.passing_marks,
        practical_full_marks: config.practical.full_marks,
        practical_passing_marks: config.practical.passing_marks,
        created_at: now,
        updated_at: now,
    }
}

/// Mark input in the standard test context ([`test_context`], [`TEST_EXAM_ID`]).
#[must_use]
pub fn mark_input(
    student_id: i64,
    subject_id: i64,
    subjective_marks: Option<f64>,
    objective_marks: Option<f64>,
    practical_marks: Option<f64>,
) -> MarkInput {
    MarkInput {
        key: MarkKey {
            student_id,
            exam_id: TEST_EXAM_ID,
            subject_id,
            class_id: TEST_CLASS_ID,
            session_id: TEST_SESSION_ID,
            section_id: TEST_SECTION_ID,
            group_id: None,
        },
        subjective_marks,
        objective_marks,
        practical_marks,
        is_absent: false,
    }
}

/// The academic context every [`mark_input`] belongs to.
#[must_use]
pub const fn test_context() -> AcademicContext {
    AcademicContext {
        session_id: TEST_SESSION_ID,
        class_id: TEST_CLASS_ID,
        section_id: TEST_SECTION_ID,
        group_id: None,
    }
}
