//! Subject configuration - full and passing marks per subject and component.
//!
//! Validation here is the form-level check done when an administrator saves a
//! configuration. The mark pipeline itself trusts whatever is stored and degrades
//! to neutral values when something is missing.

use crate::{
    entities::{Subject, subject},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Full and passing marks of one component (subjective, objective or practical).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentConfig {
    /// Component maximum marks
    pub full_marks: Option<f64>,
    /// Component passing marks
    pub passing_marks: Option<f64>,
}

/// Administrator input for creating or reconfiguring a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectConfig {
    /// Display name
    pub name: String,
    /// Optional short code
    #[serde(default)]
    pub code: Option<String>,
    /// Class the subject is taught in
    pub class_id: i64,
    /// Group within the class, `None` for every group
    #[serde(default)]
    pub group_id: Option<i64>,
    /// Overall maximum marks
    pub full_marks: f64,
    /// Overall passing marks
    #[serde(default)]
    pub passing_marks: Option<f64>,
    /// Subjective component
    #[serde(default)]
    pub subjective: ComponentConfig,
    /// Objective component
    #[serde(default)]
    pub objective: ComponentConfig,
    /// Practical component
    #[serde(default)]
    pub practical: ComponentConfig,
}

impl SubjectConfig {
    /// Checks that the configuration can be saved.
    ///
    /// Every mark must be finite and non-negative, a passing mark may not exceed its
    /// full mark, and when any component full mark is set the component full marks
    /// must add up to at least the overall full marks.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(Error::Config { message });

        if self.name.trim().is_empty() {
            return invalid("Subject name cannot be empty".to_string());
        }

        let pairs = [
            ("overall", Some(self.full_marks), self.passing_marks),
            (
                "subjective",
                self.subjective.full_marks,
                self.subjective.passing_marks,
            ),
            (
                "objective",
                self.objective.full_marks,
                self.objective.passing_marks,
            ),
            (
                "practical",
                self.practical.full_marks,
                self.practical.passing_marks,
            ),
        ];
        for (label, full, passing) in pairs {
            for value in [full, passing].into_iter().flatten() {
                if !value.is_finite() || value < 0.0 {
                    return invalid(format!(
                        "{label} marks must be non-negative numbers, got {value}"
                    ));
                }
            }
            if let (Some(full), Some(passing)) = (full, passing) {
                if passing > full {
                    return invalid(format!(
                        "{label} passing marks {passing} exceed full marks {full}"
                    ));
                }
            }
        }

        let components = [
            self.subjective.full_marks,
            self.objective.full_marks,
            self.practical.full_marks,
        ];
        if components.iter().any(Option::is_some) {
            let component_total: f64 = components.iter().flatten().sum();
            if component_total < self.full_marks {
                return invalid(format!(
                    "component full marks ({component_total}) are less than full marks ({})",
                    self.full_marks
                ));
            }
        }

        Ok(())
    }

    fn apply(&self, model: &mut subject::ActiveModel) {
        model.name = Set(self.name.trim().to_string());
        model.code = Set(self.code.clone());
        model.class_id = Set(self.class_id);
        model.group_id = Set(self.group_id);
        model.full_marks = Set(self.full_marks);
        model.passing_marks = Set(self.passing_marks);
        model.subjective_full_marks = Set(self.subjective.full_marks);
        model.subjective_passing_marks = Set(self.subjective.passing_marks);
        model.objective_full_marks = Set(self.objective.full_marks);
        model.objective_passing_marks = Set(self.objective.passing_marks);
        model.practical_full_marks = Set(self.practical.full_marks);
        model.practical_passing_marks = Set(self.practical.passing_marks);
        model.updated_at = Set(Utc::now());
    }
}

/// Creates a subject after validating its configuration.
pub async fn create_subject<C>(db: &C, config: &SubjectConfig) -> Result<subject::Model>
where
    C: ConnectionTrait,
{
    config.validate()?;

    let mut model = subject::ActiveModel {
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    config.apply(&mut model);
    model.insert(db).await.map_err(Into::into)
}

/// Replaces a subject's configuration and recomputes every cached mark of the subject.
///
/// The new configuration and the recomputed marks are committed together.
#[instrument(skip(db, config), fields(subject = %config.name))]
pub async fn update_subject_config(
    db: &DatabaseConnection,
    subject_id: i64,
    config: &SubjectConfig,
) -> Result<subject::Model> {
    config.validate()?;

    let txn = db.begin().await?;
    let existing = Subject::find_by_id(subject_id)
        .one(&txn)
        .await?
        .ok_or(Error::SubjectNotFound { subject_id })?;

    let mut model: subject::ActiveModel = existing.into();
    config.apply(&mut model);
    let updated = model.update(&txn).await?;

    let recomputed = crate::core::mark::recompute_subject_marks_in(&txn, subject_id).await?;
    txn.commit().await?;
    info!(
        "Subject {} reconfigured, {} cached marks recomputed",
        subject_id, recomputed
    );

    Ok(updated)
}

/// Finds a subject by its unique ID.
pub async fn get_subject_by_id<C>(db: &C, subject_id: i64) -> Result<Option<subject::Model>>
where
    C: ConnectionTrait,
{
    Subject::find_by_id(subject_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves the subjects configured for a class, ordered by ID.
///
/// With a `group_id`, subjects of that group and subjects shared by every group are
/// returned. Without one, only the shared subjects are returned.
pub async fn get_subjects_for_context<C>(
    db: &C,
    class_id: i64,
    group_id: Option<i64>,
) -> Result<Vec<subject::Model>>
where
    C: ConnectionTrait,
{
    let group_filter = match group_id {
        Some(group_id) => Condition::any()
            .add(subject::Column::GroupId.is_null())
            .add(subject::Column::GroupId.eq(group_id)),
        None => Condition::all().add(subject::Column::GroupId.is_null()),
    };

    Subject::find()
        .filter(subject::Column::ClassId.eq(class_id))
        .filter(group_filter)
        .order_by_asc(subject::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
