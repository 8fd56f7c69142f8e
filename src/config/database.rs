//! Database configuration module for the gradebook.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. The composite identity tuples of
//! marks and results get their own indexes, which the upsert paths filter on.

use crate::entities::{ExamResult, ExamResultColumn, GradeInterval, Mark, MarkColumn, Subject};
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/gradebook.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
///
/// This function looks for `DATABASE_URL` in the environment and falls back to
/// a default local `SQLite` file if not found.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a default local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    debug!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

fn mark_identity_index() -> IndexCreateStatement {
    Index::create()
        .name("idx_marks_identity")
        .table(Mark)
        .col(MarkColumn::StudentId)
        .col(MarkColumn::ExamId)
        .col(MarkColumn::SubjectId)
        .col(MarkColumn::ClassId)
        .col(MarkColumn::SessionId)
        .col(MarkColumn::SectionId)
        .col(MarkColumn::GroupId)
        .unique()
        .if_not_exists()
        .to_owned()
}

fn result_identity_index() -> IndexCreateStatement {
    Index::create()
        .name("idx_exam_results_identity")
        .table(ExamResult)
        .col(ExamResultColumn::StudentId)
        .col(ExamResultColumn::ExamId)
        .col(ExamResultColumn::SessionId)
        .col(ExamResultColumn::ClassId)
        .col(ExamResultColumn::SectionId)
        .col(ExamResultColumn::GroupId)
        .unique()
        .if_not_exists()
        .to_owned()
}

/// Creates all tables and identity indexes if they do not exist yet.
///
/// Safe to call on every startup.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut tables = [
        schema.create_table_from_entity(Subject),
        schema.create_table_from_entity(GradeInterval),
        schema.create_table_from_entity(Mark),
        schema.create_table_from_entity(ExamResult),
    ];
    for table in &mut tables {
        table.if_not_exists();
        db.execute(builder.build(&*table)).await?;
    }

    db.execute(builder.build(&mark_identity_index())).await?;
    db.execute(builder.build(&result_identity_index())).await?;

    info!("Database tables ensured.");
    Ok(())
}
