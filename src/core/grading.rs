//! Grading policy lookup - maps a percentage to a letter grade and grade point.
//!
//! The policy is an admin-managed table of inclusive percentage bands. Write paths load
//! it once into an immutable [`GradingPolicy`] snapshot and pass that snapshot to every
//! mark or result they compute, so a batch never queries the table per row.
//! Lookups are pure and never fail: a percentage no band covers yields [`FALLBACK_GRADE`].

use crate::{
    entities::{GradeInterval, grade_interval},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Letter grade used when a percentage matches no band or the student failed
pub const FAIL_LETTER_GRADE: &str = "F";

/// Result of a lookup that matched no band
pub const FALLBACK_GRADE: GradeLookup<'static> = GradeLookup {
    letter_grade: FAIL_LETTER_GRADE,
    grade_point: 0.0,
};

/// A parsed, active grading policy row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeBand {
    /// Inclusive lower bound
    pub min: f64,
    /// Inclusive upper bound
    pub max: f64,
    /// Letter grade awarded
    pub letter_grade: String,
    /// Grade point awarded
    pub grade_point: f64,
}

impl GradeBand {
    /// Whether `percentage` falls inside this band (both ends inclusive)
    #[must_use]
    pub fn contains(&self, percentage: f64) -> bool {
        percentage >= self.min && percentage <= self.max
    }
}

/// Letter grade and grade point returned by a lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeLookup<'a> {
    /// Letter grade
    pub letter_grade: &'a str,
    /// Grade point
    pub grade_point: f64,
}

/// Convention violations found by [`GradingPolicy::audit`].
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyIssue {
    /// Two bands share part of their range; the higher grade point wins lookups
    Overlap {
        /// Grade of the band that wins
        winner: String,
        /// Grade of the band that is shadowed
        shadowed: String,
    },
    /// No band covers the range `from..to`
    Gap {
        /// Last covered percentage
        from: f64,
        /// Next covered percentage
        to: f64,
    },
    /// A band with a lower range carries a higher grade point than the band above it
    NonMonotonic {
        /// Grade of the lower band
        lower: String,
        /// Grade of the higher band
        higher: String,
    },
}

/// Immutable snapshot of the active grading policy, ordered by grade point descending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradingPolicy {
    bands: Vec<GradeBand>,
}

impl GradingPolicy {
    /// Builds a policy from already parsed bands.
    #[must_use]
    pub fn new(mut bands: Vec<GradeBand>) -> Self {
        // Stable sort keeps the original row order for equal grade points.
        bands.sort_by(|a, b| {
            b.grade_point
                .partial_cmp(&a.grade_point)
                .unwrap_or(Ordering::Equal)
        });
        Self { bands }
    }

    /// Builds a policy from interval rows, dropping inactive rows.
    ///
    /// A row whose `class_interval` cannot be parsed is skipped with a warning rather
    /// than failing the whole snapshot.
    #[must_use]
    pub fn from_rows(rows: &[grade_interval::Model]) -> Self {
        let bands = rows
            .iter()
            .filter(|row| row.is_active)
            .filter_map(|row| match parse_class_interval(&row.class_interval) {
                Ok((min, max)) => Some(GradeBand {
                    min,
                    max,
                    letter_grade: row.letter_grade.clone(),
                    grade_point: row.grade_point,
                }),
                Err(e) => {
                    warn!("Skipping grade interval {}: {}", row.id, e);
                    None
                }
            })
            .collect();
        Self::new(bands)
    }

    /// Bands in lookup order
    #[must_use]
    pub fn bands(&self) -> &[GradeBand] {
        &self.bands
    }

    /// Whether the policy has no active bands
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Returns the grade of the first band (highest grade point first) containing
    /// `percentage`, or [`FALLBACK_GRADE`] when none does.
    #[must_use]
    pub fn lookup(&self, percentage: f64) -> GradeLookup<'_> {
        match self.bands.iter().find(|band| band.contains(percentage)) {
            Some(band) => GradeLookup {
                letter_grade: &band.letter_grade,
                grade_point: band.grade_point,
            },
            None => {
                debug!("No grade band contains {}%, using fallback", percentage);
                FALLBACK_GRADE
            }
        }
    }

    /// Checks the business conventions the lookup relies on: bands do not overlap,
    /// jointly cover 0-100, and grade points fall as the range falls.
    ///
    /// Only whole-number gaps wider than one point are reported, since interval rows
    /// like `"70-79"` and `"80-100"` are meant to be contiguous. Fractional holes
    /// between such rows (79.5 above) are ignored here; [`lookup`](Self::lookup)
    /// gives them [`FALLBACK_GRADE`].
    #[must_use]
    pub fn audit(&self) -> Vec<PolicyIssue> {
        let mut issues = Vec::new();

        for (i, winner) in self.bands.iter().enumerate() {
            for shadowed in &self.bands[i + 1..] {
                if winner.min <= shadowed.max && shadowed.min <= winner.max {
                    issues.push(PolicyIssue::Overlap {
                        winner: winner.letter_grade.clone(),
                        shadowed: shadowed.letter_grade.clone(),
                    });
                }
            }
        }

        let mut by_range: Vec<&GradeBand> = self.bands.iter().collect();
        by_range.sort_by(|a, b| a.min.partial_cmp(&b.min).unwrap_or(Ordering::Equal));

        let mut covered_to: Option<f64> = None;
        for band in &by_range {
            let from = covered_to.unwrap_or(0.0);
            let gap = if covered_to.is_some() {
                band.min - from > 1.0
            } else {
                band.min > 0.0
            };
            if gap {
                issues.push(PolicyIssue::Gap {
                    from,
                    to: band.min,
                });
            }
            covered_to = Some(covered_to.map_or(band.max, |c| c.max(band.max)));
        }
        match covered_to {
            Some(c) if c < 100.0 => issues.push(PolicyIssue::Gap { from: c, to: 100.0 }),
            None => issues.push(PolicyIssue::Gap {
                from: 0.0,
                to: 100.0,
            }),
            _ => {}
        }

        for pair in by_range.windows(2) {
            if pair[0].grade_point > pair[1].grade_point {
                issues.push(PolicyIssue::NonMonotonic {
                    lower: pair[0].letter_grade.clone(),
                    higher: pair[1].letter_grade.clone(),
                });
            }
        }

        issues
    }
}

/// Parses a `"min-max"` class interval into inclusive bounds.
///
/// Whitespace around either bound is ignored. Both bounds must be finite numbers
/// with `min <= max`.
pub fn parse_class_interval(interval: &str) -> Result<(f64, f64)> {
    let invalid = |reason: &str| Error::InvalidInterval {
        interval: interval.to_string(),
        reason: reason.to_string(),
    };

    let (min, max) = interval
        .split_once('-')
        .ok_or_else(|| invalid("expected 'min-max'"))?;
    let min: f64 = min
        .trim()
        .parse()
        .map_err(|_| invalid("lower bound is not a number"))?;
    let max: f64 = max
        .trim()
        .parse()
        .map_err(|_| invalid("upper bound is not a number"))?;

    if !min.is_finite() || !max.is_finite() {
        return Err(invalid("bounds must be finite"));
    }
    if min > max {
        return Err(invalid("lower bound exceeds upper bound"));
    }
    Ok((min, max))
}

/// Loads every active interval row into a policy snapshot.
pub async fn load_active_policy<C>(db: &C) -> Result<GradingPolicy>
where
    C: ConnectionTrait,
{
    let rows = GradeInterval::find()
        .filter(grade_interval::Column::IsActive.eq(true))
        .order_by_asc(grade_interval::Column::Id)
        .all(db)
        .await?;
    Ok(GradingPolicy::from_rows(&rows))
}

/// Lists all interval rows, active or not, highest grade point first.
pub async fn list_grade_intervals(db: &DatabaseConnection) -> Result<Vec<grade_interval::Model>> {
    GradeInterval::find()
        .order_by_desc(grade_interval::Column::GradePoint)
        .order_by_asc(grade_interval::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Adds a grading policy row after validating the interval string and grade point.
///
/// Cached marks are not recomputed here; callers that edit a live policy follow up
/// with [`crate::core::mark::recompute_all_marks`].
pub async fn create_grade_interval<C>(
    db: &C,
    class_interval: &str,
    letter_grade: &str,
    grade_point: f64,
    is_active: bool,
) -> Result<grade_interval::Model>
where
    C: ConnectionTrait,
{
    parse_class_interval(class_interval)?;

    if letter_grade.trim().is_empty() {
        return Err(Error::Config {
            message: "Letter grade cannot be empty".to_string(),
        });
    }
    if !grade_point.is_finite() || grade_point < 0.0 {
        return Err(Error::Config {
            message: format!("Grade point must be a non-negative number, got {grade_point}"),
        });
    }

    let now = Utc::now();
    let row = grade_interval::ActiveModel {
        class_interval: Set(class_interval.trim().to_string()),
        letter_grade: Set(letter_grade.trim().to_string()),
        grade_point: Set(grade_point),
        is_active: Set(is_active),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    row.insert(db).await.map_err(Into::into)
}

/// Activates or deactivates an interval row.
pub async fn set_grade_interval_active(
    db: &DatabaseConnection,
    interval_id: i64,
    is_active: bool,
) -> Result<grade_interval::Model> {
    let row = GradeInterval::find_by_id(interval_id)
        .one(db)
        .await?
        .ok_or(Error::GradeIntervalNotFound { interval_id })?;

    let mut active: grade_interval::ActiveModel = row.into();
    active.is_active = Set(is_active);
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}
