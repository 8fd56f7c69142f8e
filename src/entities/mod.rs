//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables of the marks pipeline.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod exam_result;
pub mod grade_interval;
pub mod mark;
pub mod subject;

// Re-export specific types to avoid conflicts
pub use exam_result::{
    Column as ExamResultColumn, Entity as ExamResult, Model as ExamResultModel,
};
pub use grade_interval::{
    Column as GradeIntervalColumn, Entity as GradeInterval, Model as GradeIntervalModel,
};
pub use mark::{Column as MarkColumn, Entity as Mark, Model as MarkModel};
pub use subject::{Column as SubjectColumn, Entity as Subject, Model as SubjectModel};
