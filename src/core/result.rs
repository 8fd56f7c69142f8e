//! Exam finalization - combines a student's cached marks into one result snapshot.
//!
//! Finalization is an explicit administrative step. It reads the cached mark columns
//! (never recomputing them), aggregates them against the subjects configured for the
//! academic context, and upserts one `exam_results` row per student. The row is a
//! snapshot: later mark edits do not touch it until the exam is finalized again, and
//! finalizing again overwrites it.

use crate::{
    core::grading::{FAIL_LETTER_GRADE, GradingPolicy, load_active_policy},
    core::mark::{PassStatus, percentage_of},
    core::subject::get_subjects_for_context,
    entities::{ExamResult, Mark, exam_result, mark, subject},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{info, instrument};

/// Breakdown status recorded for a configured subject the student has no mark for
pub const MISSING_STATUS: &str = "Missing";

/// The session/class/section/group a set of marks and results belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AcademicContext {
    /// Academic session
    pub session_id: i64,
    /// Class
    pub class_id: i64,
    /// Section
    pub section_id: i64,
    /// Group, if the class is split into groups
    #[serde(default)]
    pub group_id: Option<i64>,
}

impl AcademicContext {
    fn mark_condition(&self) -> Condition {
        let group = match self.group_id {
            Some(group_id) => mark::Column::GroupId.eq(group_id),
            None => mark::Column::GroupId.is_null(),
        };
        Condition::all()
            .add(mark::Column::SessionId.eq(self.session_id))
            .add(mark::Column::ClassId.eq(self.class_id))
            .add(mark::Column::SectionId.eq(self.section_id))
            .add(group)
    }

    fn result_condition(&self) -> Condition {
        let group = match self.group_id {
            Some(group_id) => exam_result::Column::GroupId.eq(group_id),
            None => exam_result::Column::GroupId.is_null(),
        };
        Condition::all()
            .add(exam_result::Column::SessionId.eq(self.session_id))
            .add(exam_result::Column::ClassId.eq(self.class_id))
            .add(exam_result::Column::SectionId.eq(self.section_id))
            .add(group)
    }
}

/// One entry of a result's `subject_wise_data` snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectBreakdown {
    /// Subject
    pub subject_id: i64,
    /// Subject name at finalization time
    pub subject_name: String,
    /// Subject full marks at finalization time
    pub full_marks: f64,
    /// Cached obtained marks, `None` when the mark is missing
    pub marks_obtained: Option<f64>,
    /// Cached percentage, `None` when the mark is missing
    pub percentage: Option<f64>,
    /// Cached letter grade, `None` when the mark is missing
    pub letter_grade: Option<String>,
    /// Cached grade point, `None` when the mark is missing
    pub grade_point: Option<f64>,
    /// Cached pass status, or [`MISSING_STATUS`]
    pub pass_status: String,
}

/// Aggregate values of one student's exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    /// Sum of obtained marks over subjects with a mark
    pub total_marks_obtained: f64,
    /// Sum of full marks over subjects with a mark
    pub total_possible_marks: f64,
    /// Overall percentage, two decimals
    pub percentage: f64,
    /// Grade point of the overall percentage, 0.0 on failure
    pub final_grade_point: f64,
    /// Letter grade of the overall percentage, `"F"` on failure
    pub final_letter_grade: String,
    /// Only ever `Pass` or `Fail`
    pub overall_status: PassStatus,
    /// Per-subject breakdown in subject order
    pub subjects: Vec<SubjectBreakdown>,
}

/// Aggregates a student's marks over the subjects configured for their context.
///
/// The student fails overall if any subject's cached status is `Fail` or any configured
/// subject has no mark. Totals only count subjects that have a mark. A passing student's
/// grade point comes straight from the policy band of the overall percentage, not from
/// the subject grade points.
#[must_use]
pub fn aggregate_result(
    subjects: &[subject::Model],
    marks: &[mark::Model],
    policy: &GradingPolicy,
) -> ResultSummary {
    let by_subject: HashMap<i64, &mark::Model> = marks.iter().map(|m| (m.subject_id, m)).collect();

    let mut total_marks_obtained = 0.0;
    let mut total_possible_marks = 0.0;
    let mut failed = false;
    let mut breakdown = Vec::with_capacity(subjects.len());

    for subject in subjects {
        let entry = match by_subject.get(&subject.id) {
            Some(mark) => {
                total_marks_obtained += mark.total_marks_obtained;
                total_possible_marks += subject.full_marks;
                if PassStatus::parse(&mark.subject_pass_status) == Some(PassStatus::Fail) {
                    failed = true;
                }
                SubjectBreakdown {
                    subject_id: subject.id,
                    subject_name: subject.name.clone(),
                    full_marks: subject.full_marks,
                    marks_obtained: Some(mark.total_marks_obtained),
                    percentage: Some(mark.subject_percentage),
                    letter_grade: Some(mark.subject_letter_grade.clone()),
                    grade_point: Some(mark.subject_grade_point),
                    pass_status: mark.subject_pass_status.clone(),
                }
            }
            None => {
                failed = true;
                SubjectBreakdown {
                    subject_id: subject.id,
                    subject_name: subject.name.clone(),
                    full_marks: subject.full_marks,
                    marks_obtained: None,
                    percentage: None,
                    letter_grade: None,
                    grade_point: None,
                    pass_status: MISSING_STATUS.to_string(),
                }
            }
        };
        breakdown.push(entry);
    }

    let percentage = percentage_of(total_marks_obtained, total_possible_marks);

    let (overall_status, final_letter_grade, final_grade_point) = if failed {
        (PassStatus::Fail, FAIL_LETTER_GRADE.to_string(), 0.0)
    } else {
        let grade = policy.lookup(percentage);
        (
            PassStatus::Pass,
            grade.letter_grade.to_string(),
            grade.grade_point,
        )
    };

    ResultSummary {
        total_marks_obtained,
        total_possible_marks,
        percentage,
        final_grade_point,
        final_letter_grade,
        overall_status,
        subjects: breakdown,
    }
}

/// Parses the `subject_wise_data` snapshot of a stored result.
pub fn subject_breakdown(result: &exam_result::Model) -> Result<Vec<SubjectBreakdown>> {
    serde_json::from_str(&result.subject_wise_data).map_err(Into::into)
}

/// Upserts the result row of one student, keyed by student, exam and context.
async fn write_result<C>(
    db: &C,
    student_id: i64,
    exam_id: i64,
    ctx: &AcademicContext,
    summary: &ResultSummary,
) -> Result<exam_result::Model>
where
    C: ConnectionTrait,
{
    let subject_wise_data = serde_json::to_string(&summary.subjects)?;

    let existing = ExamResult::find()
        .filter(exam_result::Column::StudentId.eq(student_id))
        .filter(exam_result::Column::ExamId.eq(exam_id))
        .filter(ctx.result_condition())
        .one(db)
        .await?;
    let is_update = existing.is_some();
    let mut model = match existing {
        Some(existing) => existing.into(),
        None => exam_result::ActiveModel {
            student_id: Set(student_id),
            exam_id: Set(exam_id),
            session_id: Set(ctx.session_id),
            class_id: Set(ctx.class_id),
            section_id: Set(ctx.section_id),
            group_id: Set(ctx.group_id),
            ..Default::default()
        },
    };

    model.total_marks_obtained = Set(summary.total_marks_obtained);
    model.total_possible_marks = Set(summary.total_possible_marks);
    model.percentage = Set(summary.percentage);
    model.final_grade_point = Set(summary.final_grade_point);
    model.final_letter_grade = Set(summary.final_letter_grade.clone());
    model.overall_status = Set(summary.overall_status.as_str().to_string());
    model.subject_wise_data = Set(subject_wise_data);
    model.published_at = Set(Utc::now());

    let saved = if is_update {
        model.update(db).await?
    } else {
        model.insert(db).await?
    };
    Ok(saved)
}

async fn context_marks<C>(
    db: &C,
    exam_id: i64,
    ctx: &AcademicContext,
    student_id: Option<i64>,
) -> Result<Vec<mark::Model>>
where
    C: ConnectionTrait,
{
    let mut query = Mark::find()
        .filter(mark::Column::ExamId.eq(exam_id))
        .filter(ctx.mark_condition());
    if let Some(student_id) = student_id {
        query = query.filter(mark::Column::StudentId.eq(student_id));
    }
    query
        .order_by_asc(mark::Column::StudentId)
        .order_by_asc(mark::Column::SubjectId)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finalizes one student's exam result and returns the stored snapshot.
#[instrument(skip(db))]
pub async fn finalize_student_result(
    db: &DatabaseConnection,
    student_id: i64,
    exam_id: i64,
    ctx: &AcademicContext,
) -> Result<exam_result::Model> {
    let txn = db.begin().await?;
    let policy = load_active_policy(&txn).await?;
    let subjects = get_subjects_for_context(&txn, ctx.class_id, ctx.group_id).await?;
    let marks = context_marks(&txn, exam_id, ctx, Some(student_id)).await?;

    let summary = aggregate_result(&subjects, &marks, &policy);
    let saved = write_result(&txn, student_id, exam_id, ctx, &summary).await?;

    txn.commit().await?;
    info!(
        "Finalized exam {} for student {}: {} {}",
        exam_id, student_id, saved.overall_status, saved.final_letter_grade
    );
    Ok(saved)
}

/// Finalizes the exam for every student with at least one mark in the context.
///
/// Policy and subjects are loaded once for the whole batch. Returns the stored
/// snapshots ordered by student.
#[instrument(skip(db))]
pub async fn finalize_exam_results(
    db: &DatabaseConnection,
    exam_id: i64,
    ctx: &AcademicContext,
) -> Result<Vec<exam_result::Model>> {
    let txn = db.begin().await?;
    let policy = load_active_policy(&txn).await?;
    let subjects = get_subjects_for_context(&txn, ctx.class_id, ctx.group_id).await?;
    let marks = context_marks(&txn, exam_id, ctx, None).await?;

    let mut by_student: BTreeMap<i64, Vec<mark::Model>> = BTreeMap::new();
    for mark in marks {
        by_student.entry(mark.student_id).or_default().push(mark);
    }

    let mut results = Vec::with_capacity(by_student.len());
    for (student_id, student_marks) in &by_student {
        let summary = aggregate_result(&subjects, student_marks, &policy);
        results.push(write_result(&txn, *student_id, exam_id, ctx, &summary).await?);
    }

    txn.commit().await?;
    let passed = results
        .iter()
        .filter(|r| r.overall_status == PassStatus::Pass.as_str())
        .count();
    info!(
        "Finalized exam {} for {} students ({} passed)",
        exam_id,
        results.len(),
        passed
    );
    Ok(results)
}

/// Finds the finalized result of a student in an exam and context.
pub async fn get_result(
    db: &DatabaseConnection,
    student_id: i64,
    exam_id: i64,
    ctx: &AcademicContext,
) -> Result<Option<exam_result::Model>> {
    ExamResult::find()
        .filter(exam_result::Column::StudentId.eq(student_id))
        .filter(exam_result::Column::ExamId.eq(exam_id))
        .filter(ctx.result_condition())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves every finalized result of a student, most recently published first.
pub async fn get_results_for_student(
    db: &DatabaseConnection,
    student_id: i64,
) -> Result<Vec<exam_result::Model>> {
    ExamResult::find()
        .filter(exam_result::Column::StudentId.eq(student_id))
        .order_by_desc(exam_result::Column::PublishedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves the finalized results of an exam in a context, highest percentage first.
pub async fn get_exam_results(
    db: &DatabaseConnection,
    exam_id: i64,
    ctx: &AcademicContext,
) -> Result<Vec<exam_result::Model>> {
    ExamResult::find()
        .filter(exam_result::Column::ExamId.eq(exam_id))
        .filter(ctx.result_condition())
        .order_by_desc(exam_result::Column::Percentage)
        .order_by_asc(exam_result::Column::StudentId)
        .all(db)
        .await
        .map_err(Into::into)
}
