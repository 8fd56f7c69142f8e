//! Grade interval entity - one row of the grading policy table.
//!
//! Rows map an inclusive percentage range, stored as a `"min-max"` string,
//! to a letter grade and grade point. Only active rows take part in lookups.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Grading policy row
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "grade_intervals")]
pub struct Model {
    /// Unique identifier for the row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Inclusive percentage range, e.g. `"80-100"`
    pub class_interval: String,
    /// Letter grade (e.g., `"A+"`)
    pub letter_grade: String,
    /// Grade point awarded for this band
    pub grade_point: f64,
    /// Inactive rows are kept for history but ignored by lookups
    pub is_active: bool,
    /// When the row was created
    pub created_at: DateTimeUtc,
    /// When the row was last modified
    pub updated_at: DateTimeUtc,
}

/// Grading rows are matched by percentage, not joined
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
