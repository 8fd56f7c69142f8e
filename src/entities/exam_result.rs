//! Exam result entity - the finalized snapshot of a student's exam.
//!
//! One row per (`student_id`, `exam_id`, `session_id`, `class_id`, `section_id`, `group_id`).
//! Rows are written by `core::result` when an administrator finalizes an exam and are
//! not kept in sync with later mark edits; finalizing again overwrites the snapshot.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Exam result database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "exam_results")]
pub struct Model {
    /// Unique identifier for the result row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Student the result belongs to
    pub student_id: i64,
    /// Exam that was finalized
    pub exam_id: i64,
    /// Academic session
    pub session_id: i64,
    /// Class of the student
    pub class_id: i64,
    /// Section within the class
    pub section_id: i64,
    /// Group within the class, if any
    pub group_id: Option<i64>,
    /// Sum of obtained marks over subjects that have a mark
    pub total_marks_obtained: f64,
    /// Sum of full marks over subjects that have a mark
    pub total_possible_marks: f64,
    /// Overall percentage (0-100, two decimals)
    pub percentage: f64,
    /// Grade point of the overall percentage, 0.0 on failure
    pub final_grade_point: f64,
    /// Letter grade of the overall percentage, `"F"` on failure
    pub final_letter_grade: String,
    /// `"Pass"` or `"Fail"`
    pub overall_status: String,
    /// JSON array with one breakdown entry per configured subject
    #[sea_orm(column_type = "Text")]
    pub subject_wise_data: String,
    /// When this snapshot was written
    pub published_at: DateTimeUtc,
}

/// `ExamResult` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
