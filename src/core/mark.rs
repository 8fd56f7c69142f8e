//! Mark computation - turns raw component scores into cached grade columns.
//!
//! Every write of a mark goes through [`compute_derived_mark`], a pure function of the
//! raw components, the absent flag, the subject configuration and a grading policy
//! snapshot. The derived columns are written in the same save as the raw ones and are
//! never set any other way. Missing configuration never blocks a save: the mark is
//! stored with neutral derived values instead.

use crate::{
    core::grading::{FAIL_LETTER_GRADE, GradingPolicy, load_active_policy},
    core::subject::get_subject_by_id,
    entities::{Mark, Subject, mark, subject},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, instrument, warn};

/// Letter grade stored for an absent student
pub const ABSENT_LETTER_GRADE: &str = "Absent";

/// Letter grade stored when the subject is not configured
pub const NOT_APPLICABLE_LETTER_GRADE: &str = "N/A";

/// Per-subject pass status as stored in `marks.subject_pass_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PassStatus {
    /// Passed every gate
    Pass,
    /// Failed a component or the overall passing mark
    Fail,
    /// Marked absent
    Absent,
    /// Pass/fail not assessed (no subject configuration or passing mark)
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl PassStatus {
    /// Get status as stored string
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "Pass",
            Self::Fail => "Fail",
            Self::Absent => "Absent",
            Self::NotApplicable => "N/A",
        }
    }

    /// Parse a stored status string
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pass" => Some(Self::Pass),
            "Fail" => Some(Self::Fail),
            "Absent" => Some(Self::Absent),
            "N/A" => Some(Self::NotApplicable),
            _ => None,
        }
    }
}

impl fmt::Display for PassStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite identity of a mark row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkKey {
    /// Student
    pub student_id: i64,
    /// Exam
    pub exam_id: i64,
    /// Subject
    pub subject_id: i64,
    /// Class
    pub class_id: i64,
    /// Academic session
    pub session_id: i64,
    /// Section
    pub section_id: i64,
    /// Group, if the class is split into groups
    #[serde(default)]
    pub group_id: Option<i64>,
}

impl MarkKey {
    fn condition(&self) -> Condition {
        let group = match self.group_id {
            Some(group_id) => mark::Column::GroupId.eq(group_id),
            None => mark::Column::GroupId.is_null(),
        };
        Condition::all()
            .add(mark::Column::StudentId.eq(self.student_id))
            .add(mark::Column::ExamId.eq(self.exam_id))
            .add(mark::Column::SubjectId.eq(self.subject_id))
            .add(mark::Column::ClassId.eq(self.class_id))
            .add(mark::Column::SessionId.eq(self.session_id))
            .add(mark::Column::SectionId.eq(self.section_id))
            .add(group)
    }
}

/// A mark as submitted by the marks entry form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkInput {
    /// Row identity
    #[serde(flatten)]
    pub key: MarkKey,
    /// Subjective component score
    #[serde(default)]
    pub subjective_marks: Option<f64>,
    /// Objective component score
    #[serde(default)]
    pub objective_marks: Option<f64>,
    /// Practical component score
    #[serde(default)]
    pub practical_marks: Option<f64>,
    /// Whether the student was absent
    #[serde(default)]
    pub is_absent: bool,
}

impl MarkInput {
    /// Rejects component scores that are negative or not finite.
    pub fn validate(&self) -> Result<()> {
        let components = [
            ("subjective", self.subjective_marks),
            ("objective", self.objective_marks),
            ("practical", self.practical_marks),
        ];
        for (component, value) in components {
            if let Some(value) = value {
                if !value.is_finite() || value < 0.0 {
                    return Err(Error::InvalidMarks { component, value });
                }
            }
        }
        Ok(())
    }

    /// Sum of the three components, missing ones counted as 0
    #[must_use]
    pub fn total(&self) -> f64 {
        self.subjective_marks.unwrap_or(0.0)
            + self.objective_marks.unwrap_or(0.0)
            + self.practical_marks.unwrap_or(0.0)
    }
}

impl From<&mark::Model> for MarkInput {
    fn from(model: &mark::Model) -> Self {
        Self {
            key: MarkKey {
                student_id: model.student_id,
                exam_id: model.exam_id,
                subject_id: model.subject_id,
                class_id: model.class_id,
                session_id: model.session_id,
                section_id: model.section_id,
                group_id: model.group_id,
            },
            subjective_marks: model.subjective_marks,
            objective_marks: model.objective_marks,
            practical_marks: model.practical_marks,
            is_absent: model.is_absent,
        }
    }
}

/// Cached columns derived from a mark's raw scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedMark {
    /// Sum of the components
    pub total_marks_obtained: f64,
    /// Percentage of the subject's full marks, two decimals
    pub subject_percentage: f64,
    /// Letter grade
    pub subject_letter_grade: String,
    /// Grade point
    pub subject_grade_point: f64,
    /// Pass status
    pub subject_pass_status: PassStatus,
}

impl DerivedMark {
    fn apply(&self, model: &mut mark::ActiveModel) {
        model.total_marks_obtained = Set(self.total_marks_obtained);
        model.subject_percentage = Set(self.subject_percentage);
        model.subject_letter_grade = Set(self.subject_letter_grade.clone());
        model.subject_grade_point = Set(self.subject_grade_point);
        model.subject_pass_status = Set(self.subject_pass_status.as_str().to_string());
        model.updated_at = Set(Utc::now());
    }
}

/// Rounds to two decimal places, half away from zero.
#[must_use]
pub fn round_to_two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage of `obtained` over `possible`, two decimals; 0 when `possible` is not positive.
#[must_use]
pub fn percentage_of(obtained: f64, possible: f64) -> f64 {
    if possible > 0.0 {
        round_to_two_decimals(obtained * 100.0 / possible)
    } else {
        0.0
    }
}

/// Whether any component score is below that component's configured passing mark.
///
/// A component whose passing mark is unset or 0 never fails the gate.
fn fails_component_gate(input: &MarkInput, subject: &subject::Model) -> bool {
    [
        (input.subjective_marks, subject.subjective_passing_marks),
        (input.objective_marks, subject.objective_passing_marks),
        (input.practical_marks, subject.practical_passing_marks),
    ]
    .into_iter()
    .any(|(obtained, passing)| match passing {
        Some(passing) if passing > 0.0 => obtained.unwrap_or(0.0) < passing,
        _ => false,
    })
}

/// Derives the cached columns of a mark.
///
/// Status precedence is absent, then unassessed (null or zero overall passing mark), then the
/// component gate, then the overall passing mark. Failed and absent marks get a fixed
/// grade with 0.0 points; everything else is looked up in `policy` by percentage.
#[must_use]
pub fn compute_derived_mark(
    input: &MarkInput,
    subject: Option<&subject::Model>,
    policy: &GradingPolicy,
) -> DerivedMark {
    let total_marks_obtained = input.total();

    let Some(subject) = subject else {
        return DerivedMark {
            total_marks_obtained,
            subject_percentage: 0.0,
            subject_letter_grade: NOT_APPLICABLE_LETTER_GRADE.to_string(),
            subject_grade_point: 0.0,
            subject_pass_status: PassStatus::NotApplicable,
        };
    };

    let subject_percentage = percentage_of(total_marks_obtained, subject.full_marks);

    let subject_pass_status = if input.is_absent {
        PassStatus::Absent
    } else {
        match subject.passing_marks {
            None => PassStatus::NotApplicable,
            Some(passing) if passing <= 0.0 => PassStatus::NotApplicable,
            Some(_) if fails_component_gate(input, subject) => PassStatus::Fail,
            Some(passing) if total_marks_obtained >= passing => PassStatus::Pass,
            Some(_) => PassStatus::Fail,
        }
    };

    let (subject_letter_grade, subject_grade_point) = match subject_pass_status {
        PassStatus::Fail => (FAIL_LETTER_GRADE.to_string(), 0.0),
        PassStatus::Absent => (ABSENT_LETTER_GRADE.to_string(), 0.0),
        PassStatus::Pass | PassStatus::NotApplicable => {
            let grade = policy.lookup(subject_percentage);
            (grade.letter_grade.to_string(), grade.grade_point)
        }
    };

    DerivedMark {
        total_marks_obtained,
        subject_percentage,
        subject_letter_grade,
        subject_grade_point,
        subject_pass_status,
    }
}

/// Upserts one mark whose subject has already been resolved.
async fn write_mark<C>(
    db: &C,
    input: &MarkInput,
    subject: Option<&subject::Model>,
    policy: &GradingPolicy,
) -> Result<mark::Model>
where
    C: ConnectionTrait,
{
    if subject.is_none() {
        warn!(
            "Subject {} is not configured, saving mark with neutral grades",
            input.key.subject_id
        );
    }
    let derived = compute_derived_mark(input, subject, policy);

    let existing = Mark::find().filter(input.key.condition()).one(db).await?;
    let is_update = existing.is_some();
    let mut model = match existing {
        Some(existing) => existing.into(),
        None => mark::ActiveModel {
            student_id: Set(input.key.student_id),
            exam_id: Set(input.key.exam_id),
            subject_id: Set(input.key.subject_id),
            class_id: Set(input.key.class_id),
            session_id: Set(input.key.session_id),
            section_id: Set(input.key.section_id),
            group_id: Set(input.key.group_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        },
    };

    model.subjective_marks = Set(input.subjective_marks);
    model.objective_marks = Set(input.objective_marks);
    model.practical_marks = Set(input.practical_marks);
    model.is_absent = Set(input.is_absent);
    derived.apply(&mut model);

    debug!(
        "Mark for student {} subject {}: {} ({})",
        input.key.student_id,
        input.key.subject_id,
        derived.subject_pass_status,
        derived.subject_letter_grade
    );

    let saved = if is_update {
        model.update(db).await?
    } else {
        model.insert(db).await?
    };
    Ok(saved)
}

/// Validates, computes and upserts one mark keyed on its identity tuple.
///
/// The grading policy is passed in so callers saving many marks load it once.
#[instrument(skip(db, input, policy), fields(student = input.key.student_id, subject = input.key.subject_id))]
pub async fn save_mark<C>(db: &C, input: &MarkInput, policy: &GradingPolicy) -> Result<mark::Model>
where
    C: ConnectionTrait,
{
    input.validate()?;
    let subject = get_subject_by_id(db, input.key.subject_id).await?;
    write_mark(db, input, subject.as_ref(), policy).await
}

/// Saves a batch of marks in one transaction with one policy snapshot.
///
/// Either every mark is saved or, if any input is invalid, none is.
#[instrument(skip(db, inputs), fields(count = inputs.len()))]
pub async fn save_marks(db: &DatabaseConnection, inputs: &[MarkInput]) -> Result<Vec<mark::Model>> {
    for input in inputs {
        input.validate()?;
    }

    let txn = db.begin().await?;
    let policy = load_active_policy(&txn).await?;

    let mut subjects: HashMap<i64, Option<subject::Model>> = HashMap::new();
    let mut saved = Vec::with_capacity(inputs.len());
    for input in inputs {
        let subject_id = input.key.subject_id;
        if !subjects.contains_key(&subject_id) {
            let subject = get_subject_by_id(&txn, subject_id).await?;
            subjects.insert(subject_id, subject);
        }
        let subject = subjects.get(&subject_id).and_then(Option::as_ref);
        saved.push(write_mark(&txn, input, subject, &policy).await?);
    }

    txn.commit().await?;
    Ok(saved)
}

/// Recomputes the cached columns of existing marks in place.
async fn recompute_marks<C>(
    db: &C,
    marks: Vec<mark::Model>,
    subjects: &HashMap<i64, subject::Model>,
    policy: &GradingPolicy,
) -> Result<usize>
where
    C: ConnectionTrait,
{
    let count = marks.len();
    for existing in marks {
        let input = MarkInput::from(&existing);
        let derived = compute_derived_mark(&input, subjects.get(&existing.subject_id), policy);
        let mut model: mark::ActiveModel = existing.into();
        derived.apply(&mut model);
        model.update(db).await?;
    }
    Ok(count)
}

/// Recomputes every cached mark of one subject, e.g. after its configuration changed.
///
/// Returns the number of marks recomputed.
#[instrument(skip(db))]
pub async fn recompute_subject_marks(db: &DatabaseConnection, subject_id: i64) -> Result<usize> {
    let txn = db.begin().await?;
    let count = recompute_subject_marks_in(&txn, subject_id).await?;
    txn.commit().await?;
    Ok(count)
}

/// Same as [`recompute_subject_marks`] on a caller-owned connection or transaction.
pub async fn recompute_subject_marks_in<C>(db: &C, subject_id: i64) -> Result<usize>
where
    C: ConnectionTrait,
{
    let policy = load_active_policy(db).await?;

    let subjects: HashMap<i64, subject::Model> = get_subject_by_id(db, subject_id)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();
    let marks = Mark::find()
        .filter(mark::Column::SubjectId.eq(subject_id))
        .all(db)
        .await?;

    recompute_marks(db, marks, &subjects, &policy).await
}

/// Recomputes every cached mark, e.g. after the grading policy was edited.
///
/// Returns the number of marks recomputed.
#[instrument(skip(db))]
pub async fn recompute_all_marks(db: &DatabaseConnection) -> Result<usize> {
    let txn = db.begin().await?;
    let policy = load_active_policy(&txn).await?;

    let subjects: HashMap<i64, subject::Model> = Subject::find()
        .all(&txn)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();
    let marks = Mark::find().all(&txn).await?;

    let count = recompute_marks(&txn, marks, &subjects, &policy).await?;
    txn.commit().await?;
    Ok(count)
}

/// Finds a mark by its identity tuple.
pub async fn get_mark<C>(db: &C, key: &MarkKey) -> Result<Option<mark::Model>>
where
    C: ConnectionTrait,
{
    Mark::find()
        .filter(key.condition())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves all marks of a student in an exam, ordered by subject.
pub async fn get_marks_for_student_exam(
    db: &DatabaseConnection,
    student_id: i64,
    exam_id: i64,
) -> Result<Vec<mark::Model>> {
    Mark::find()
        .filter(mark::Column::StudentId.eq(student_id))
        .filter(mark::Column::ExamId.eq(exam_id))
        .order_by_asc(mark::Column::SubjectId)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::grading::create_grade_interval;
    use crate::core::subject::{create_subject, update_subject_config};
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn test_pass_status_strings() {
        for status in [
            PassStatus::Pass,
            PassStatus::Fail,
            PassStatus::Absent,
            PassStatus::NotApplicable,
        ] {
            assert_eq!(PassStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PassStatus::NotApplicable.to_string(), "N/A");
        assert_eq!(PassStatus::parse("pass"), None);
    }

    #[test]
    fn test_passing_mark_example() {
        let subject = subject_model(1, &simple_subject("Math", 1, 100.0, Some(40.0)));
        let input = mark_input(1, 1, Some(30.0), Some(25.0), Some(10.0));

        let derived = compute_derived_mark(&input, Some(&subject), &standard_policy());

        assert_eq!(derived.total_marks_obtained, 65.0);
        assert_eq!(derived.subject_percentage, 65.0);
        assert_eq!(derived.subject_pass_status, PassStatus::Pass);
        assert_eq!(derived.subject_letter_grade, "B+");
        assert_eq!(derived.subject_grade_point, 3.5);
    }

    #[test]
    fn test_component_gate_overrides_total() {
        let mut config = simple_subject("Physics", 1, 100.0, Some(40.0));
        config.practical.passing_marks = Some(15.0);
        let subject = subject_model(1, &config);
        let input = mark_input(1, 1, Some(30.0), Some(25.0), Some(10.0));

        let derived = compute_derived_mark(&input, Some(&subject), &standard_policy());

        assert_eq!(derived.total_marks_obtained, 65.0);
        assert_eq!(derived.subject_percentage, 65.0);
        assert_eq!(derived.subject_pass_status, PassStatus::Fail);
        assert_eq!(derived.subject_letter_grade, "F");
        assert_eq!(derived.subject_grade_point, 0.0);
    }

    #[test]
    fn test_zero_component_passing_mark_is_satisfied() {
        let mut config = simple_subject("Physics", 1, 100.0, Some(40.0));
        config.practical.passing_marks = Some(0.0);
        config.objective.passing_marks = None;
        let subject = subject_model(1, &config);
        let input = mark_input(1, 1, Some(70.0), None, Some(0.0));

        let derived = compute_derived_mark(&input, Some(&subject), &standard_policy());
        assert_eq!(derived.subject_pass_status, PassStatus::Pass);
        assert_eq!(derived.subject_letter_grade, "A");
    }

    #[test]
    fn test_missing_component_counts_as_zero_in_gate() {
        let mut config = simple_subject("Physics", 1, 100.0, Some(40.0));
        config.objective.passing_marks = Some(5.0);
        let subject = subject_model(1, &config);
        let input = mark_input(1, 1, Some(90.0), None, None);

        let derived = compute_derived_mark(&input, Some(&subject), &standard_policy());
        assert_eq!(derived.subject_pass_status, PassStatus::Fail);
    }

    #[test]
    fn test_absent_ignores_scores() {
        let subject = subject_model(1, &simple_subject("Math", 1, 100.0, Some(40.0)));
        let mut input = mark_input(1, 1, Some(90.0), Some(5.0), None);
        input.is_absent = true;

        let derived = compute_derived_mark(&input, Some(&subject), &standard_policy());

        assert_eq!(derived.subject_pass_status, PassStatus::Absent);
        assert_eq!(derived.subject_letter_grade, "Absent");
        assert_eq!(derived.subject_grade_point, 0.0);
        assert_eq!(derived.subject_percentage, 95.0);
    }

    #[test]
    fn test_absent_wins_over_unassessed() {
        let subject = subject_model(1, &simple_subject("Art", 1, 50.0, None));
        let mut input = mark_input(1, 1, None, None, None);
        input.is_absent = true;

        let derived = compute_derived_mark(&input, Some(&subject), &standard_policy());
        assert_eq!(derived.subject_pass_status, PassStatus::Absent);
    }

    #[test]
    fn test_no_passing_marks_is_unassessed_but_graded() {
        let subject = subject_model(1, &simple_subject("Art", 1, 50.0, None));
        let input = mark_input(1, 1, Some(41.0), None, None);

        let derived = compute_derived_mark(&input, Some(&subject), &standard_policy());

        assert_eq!(derived.subject_pass_status, PassStatus::NotApplicable);
        assert_eq!(derived.subject_percentage, 82.0);
        assert_eq!(derived.subject_letter_grade, "A+");
        assert_eq!(derived.subject_grade_point, 5.0);
    }

    #[test]
    fn test_zero_passing_marks_is_unassessed() {
        let subject = subject_model(1, &simple_subject("Math", 1, 100.0, Some(0.0)));
        let input = mark_input(1, 1, Some(5.0), None, None);

        let derived = compute_derived_mark(&input, Some(&subject), &standard_policy());

        assert_eq!(derived.subject_pass_status, PassStatus::NotApplicable);
        assert_eq!(derived.subject_percentage, 5.0);
        assert_eq!(derived.subject_letter_grade, "F");
        assert_eq!(derived.subject_grade_point, 0.0);
    }

    #[test]
    fn test_below_overall_passing_mark_fails() {
        let subject = subject_model(1, &simple_subject("Math", 1, 100.0, Some(40.0)));
        let input = mark_input(1, 1, Some(20.0), Some(19.5), None);

        let derived = compute_derived_mark(&input, Some(&subject), &standard_policy());

        assert_eq!(derived.total_marks_obtained, 39.5);
        assert_eq!(derived.subject_pass_status, PassStatus::Fail);
        assert_eq!(derived.subject_letter_grade, "F");
    }

    #[test]
    fn test_missing_subject_is_neutral() {
        let input = mark_input(1, 1, Some(30.0), Some(25.0), Some(10.0));

        let derived = compute_derived_mark(&input, None, &standard_policy());

        assert_eq!(derived.total_marks_obtained, 65.0);
        assert_eq!(derived.subject_percentage, 0.0);
        assert_eq!(derived.subject_letter_grade, "N/A");
        assert_eq!(derived.subject_grade_point, 0.0);
        assert_eq!(derived.subject_pass_status, PassStatus::NotApplicable);
    }

    #[test]
    fn test_zero_full_marks_gives_zero_percentage() {
        let subject = subject_model(1, &simple_subject("Club", 1, 0.0, None));
        let input = mark_input(1, 1, Some(10.0), None, None);

        let derived = compute_derived_mark(&input, Some(&subject), &standard_policy());
        assert_eq!(derived.subject_percentage, 0.0);
    }

    #[test]
    fn test_percentage_rounds_to_two_decimals() {
        assert_eq!(percentage_of(2.0, 3.0), 66.67);
        assert_eq!(percentage_of(1.0, 3.0), 33.33);
        assert_eq!(percentage_of(5.0, 0.0), 0.0);
        assert_eq!(round_to_two_decimals(12.345_6), 12.35);
    }

    #[test]
    fn test_unmatched_percentage_falls_back_to_f() {
        let subject = subject_model(1, &simple_subject("Math", 1, 100.0, Some(40.0)));
        let input = mark_input(1, 1, Some(79.5), None, None);

        let derived = compute_derived_mark(&input, Some(&subject), &standard_policy());
        assert_eq!(derived.subject_pass_status, PassStatus::Pass);
        assert_eq!(derived.subject_letter_grade, "F");
        assert_eq!(derived.subject_grade_point, 0.0);
    }

    #[test]
    fn test_validate_rejects_negative_and_non_finite() {
        let input = mark_input(1, 1, Some(-1.0), None, None);
        assert!(matches!(
            input.validate(),
            Err(Error::InvalidMarks {
                component: "subjective",
                ..
            })
        ));

        let input = mark_input(1, 1, None, None, Some(f64::INFINITY));
        assert!(matches!(
            input.validate(),
            Err(Error::InvalidMarks {
                component: "practical",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_save_mark_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let input = mark_input(1, 1, None, Some(f64::NAN), None);

        let result = save_mark(&db, &input, &standard_policy()).await;
        assert!(matches!(result, Err(Error::InvalidMarks { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_save_mark_upserts_on_identity() -> Result<()> {
        let db = setup_test_db().await?;
        let policy = standard_policy();
        let subject = create_subject(&db, &simple_subject("Math", 1, 100.0, Some(40.0))).await?;

        let first = save_mark(
            &db,
            &mark_input(10, subject.id, Some(20.0), Some(10.0), None),
            &policy,
        )
        .await?;
        assert_eq!(first.subject_pass_status, "Fail");
        assert_eq!(first.subject_letter_grade, "F");

        let second = save_mark(
            &db,
            &mark_input(10, subject.id, Some(50.0), Some(35.0), None),
            &policy,
        )
        .await?;
        assert_eq!(second.id, first.id);
        assert_eq!(second.total_marks_obtained, 85.0);
        assert_eq!(second.subject_pass_status, "Pass");
        assert_eq!(second.subject_letter_grade, "A+");
        assert_eq!(second.created_at, first.created_at);

        let stored = get_mark(&db, &key_of(&second)).await?.unwrap();
        assert_eq!(stored, second);
        assert_eq!(Mark::find().all(&db).await?.len(), 1);

        Ok(())
    }

    fn key_of(model: &mark::Model) -> MarkKey {
        MarkInput::from(model).key
    }

    #[tokio::test]
    async fn test_save_mark_distinguishes_groups() -> Result<()> {
        let db = setup_test_db().await?;
        let policy = standard_policy();
        let subject = create_subject(&db, &simple_subject("Math", 1, 100.0, Some(40.0))).await?;

        let ungrouped = mark_input(10, subject.id, Some(50.0), None, None);
        let mut grouped = ungrouped.clone();
        grouped.key.group_id = Some(3);

        let a = save_mark(&db, &ungrouped, &policy).await?;
        let b = save_mark(&db, &grouped, &policy).await?;
        let a_again = save_mark(&db, &ungrouped, &policy).await?;

        assert_ne!(a.id, b.id);
        assert_eq!(a.id, a_again.id);
        assert_eq!(Mark::find().all(&db).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_mark_without_subject_is_stored() -> Result<()> {
        let db = setup_test_db().await?;

        let saved = save_mark(
            &db,
            &mark_input(10, 404, Some(30.0), Some(25.0), Some(10.0)),
            &standard_policy(),
        )
        .await?;

        assert_eq!(saved.total_marks_obtained, 65.0);
        assert_eq!(saved.subject_percentage, 0.0);
        assert_eq!(saved.subject_letter_grade, "N/A");
        assert_eq!(saved.subject_pass_status, "N/A");
        Ok(())
    }

    #[tokio::test]
    async fn test_save_marks_batch() -> Result<()> {
        let db = setup_test_db().await?;
        seed_standard_policy(&db).await?;
        let math = create_subject(&db, &simple_subject("Math", 1, 100.0, Some(40.0))).await?;
        let art = create_subject(&db, &simple_subject("Art", 1, 50.0, None)).await?;

        let saved = save_marks(
            &db,
            &[
                mark_input(1, math.id, Some(70.0), None, None),
                mark_input(2, math.id, Some(30.0), None, None),
                mark_input(1, art.id, Some(45.0), None, None),
            ],
        )
        .await?;

        assert_eq!(saved.len(), 3);
        assert_eq!(saved[0].subject_letter_grade, "A");
        assert_eq!(saved[1].subject_pass_status, "Fail");
        assert_eq!(saved[2].subject_pass_status, "N/A");
        assert_eq!(saved[2].subject_percentage, 90.0);

        let marks = get_marks_for_student_exam(&db, 1, TEST_EXAM_ID).await?;
        assert_eq!(marks.len(), 2);
        assert_eq!(marks[0].subject_id, math.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_marks_rejects_whole_batch() -> Result<()> {
        let db = setup_test_db().await?;
        let math = create_subject(&db, &simple_subject("Math", 1, 100.0, Some(40.0))).await?;

        let result = save_marks(
            &db,
            &[
                mark_input(1, math.id, Some(70.0), None, None),
                mark_input(2, math.id, Some(-3.0), None, None),
            ],
        )
        .await;

        assert!(matches!(result, Err(Error::InvalidMarks { .. })));
        assert!(Mark::find().all(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_subject_update_recomputes_cached_marks() -> Result<()> {
        let db = setup_test_db().await?;
        seed_standard_policy(&db).await?;
        let config = simple_subject("Physics", 1, 100.0, Some(40.0));
        let subject = create_subject(&db, &config).await?;

        let policy = load_active_policy(&db).await?;
        let saved = save_mark(
            &db,
            &mark_input(1, subject.id, Some(30.0), Some(25.0), Some(10.0)),
            &policy,
        )
        .await?;
        assert_eq!(saved.subject_pass_status, "Pass");

        let mut stricter = config.clone();
        stricter.practical.passing_marks = Some(15.0);
        update_subject_config(&db, subject.id, &stricter).await?;

        let recomputed = get_mark(&db, &key_of(&saved)).await?.unwrap();
        assert_eq!(recomputed.id, saved.id);
        assert_eq!(recomputed.subject_pass_status, "Fail");
        assert_eq!(recomputed.subject_letter_grade, "F");
        assert_eq!(recomputed.subject_grade_point, 0.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_recompute_all_marks_after_policy_change() -> Result<()> {
        let db = setup_test_db().await?;
        let subject = create_subject(&db, &simple_subject("Math", 1, 100.0, Some(40.0))).await?;

        // No policy yet: every passing mark falls back to F
        let saved = save_mark(
            &db,
            &mark_input(1, subject.id, Some(65.0), None, None),
            &GradingPolicy::default(),
        )
        .await?;
        assert_eq!(saved.subject_letter_grade, "F");
        assert_eq!(saved.subject_pass_status, "Pass");

        create_grade_interval(&db, "60-69", "B+", 3.5, true).await?;
        let count = recompute_all_marks(&db).await?;
        assert_eq!(count, 1);

        let recomputed = get_mark(&db, &key_of(&saved)).await?.unwrap();
        assert_eq!(recomputed.subject_letter_grade, "B+");
        assert_eq!(recomputed.subject_grade_point, 3.5);
        Ok(())
    }
}
