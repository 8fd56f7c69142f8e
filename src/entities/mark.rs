//! Mark entity - a student's scores for one subject within one exam.
//!
//! A row is identified by the tuple (`student_id`, `exam_id`, `subject_id`, `class_id`,
//! `session_id`, `section_id`, `group_id`). The raw component scores are entered by
//! teachers; the `total_marks_obtained`, `subject_*` columns are cached values that
//! `core::mark` recomputes on every save and that report views read back as-is.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Mark database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "marks")]
pub struct Model {
    /// Unique identifier for the mark row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Student the mark belongs to
    pub student_id: i64,
    /// Exam the mark was recorded for
    pub exam_id: i64,
    /// Subject being assessed
    pub subject_id: i64,
    /// Class of the student at the time of the exam
    pub class_id: i64,
    /// Academic session
    pub session_id: i64,
    /// Section within the class
    pub section_id: i64,
    /// Group within the class, if the class is split into groups
    pub group_id: Option<i64>,
    /// Raw subjective component score
    pub subjective_marks: Option<f64>,
    /// Raw objective component score
    pub objective_marks: Option<f64>,
    /// Raw practical component score
    pub practical_marks: Option<f64>,
    /// Whether the student was absent for this subject
    pub is_absent: bool,
    /// Cached sum of the three components
    pub total_marks_obtained: f64,
    /// Cached percentage of the subject's full marks (0-100, two decimals)
    pub subject_percentage: f64,
    /// Cached letter grade (`"F"`, `"Absent"`, `"N/A"` or a policy grade)
    pub subject_letter_grade: String,
    /// Cached grade point
    pub subject_grade_point: f64,
    /// Cached status: `"Pass"`, `"Fail"`, `"Absent"` or `"N/A"`
    pub subject_pass_status: String,
    /// When the mark was first entered
    pub created_at: DateTimeUtc,
    /// When the mark was last saved
    pub updated_at: DateTimeUtc,
}

/// Marks reference subjects by id only. There is no foreign key so a mark can
/// still be stored while its subject configuration is missing.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
