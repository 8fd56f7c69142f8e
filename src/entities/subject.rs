//! Subject entity - per-subject maximum and passing marks.
//!
//! Each subject belongs to a class and optionally to a group within that class.
//! Overall full/passing marks drive the subject percentage and pass status; the
//! component columns (subjective, objective, practical) drive the component gate.
//! Component values are optional: `None` means the component is not configured.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Subject configuration database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subjects")]
pub struct Model {
    /// Unique identifier for the subject
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "Physics")
    pub name: String,
    /// Optional short code printed on transcripts
    pub code: Option<String>,
    /// Class this subject is taught in
    pub class_id: i64,
    /// Group within the class, `None` when the subject applies to every group
    pub group_id: Option<i64>,
    /// Overall maximum marks
    pub full_marks: f64,
    /// Overall passing marks, `None` when pass/fail is not assessed
    pub passing_marks: Option<f64>,
    /// Subjective component maximum marks
    pub subjective_full_marks: Option<f64>,
    /// Subjective component passing marks
    pub subjective_passing_marks: Option<f64>,
    /// Objective component maximum marks
    pub objective_full_marks: Option<f64>,
    /// Objective component passing marks
    pub objective_passing_marks: Option<f64>,
    /// Practical component maximum marks
    pub practical_full_marks: Option<f64>,
    /// Practical component passing marks
    pub practical_passing_marks: Option<f64>,
    /// When the subject was created
    pub created_at: DateTimeUtc,
    /// When the configuration was last modified
    pub updated_at: DateTimeUtc,
}

/// `Subject` has no enforced relationships; marks point at it by id
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
