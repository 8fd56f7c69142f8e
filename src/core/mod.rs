//! Core business logic - framework-agnostic grading, mark and result operations.
//!
//! Pure computations (`compute_derived_mark`, `aggregate_result`, policy lookups) are
//! kept separate from the async functions that load and persist rows, so the web
//! layer and the tests can call either.

/// Grading policy snapshot and interval lookup
pub mod grading;
/// Per-subject mark computation and persistence
pub mod mark;
/// Exam finalization into result snapshots
pub mod result;
/// Subject configuration management
pub mod subject;
