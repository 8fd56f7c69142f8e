/// Database configuration and connection management
pub mod database;

/// Reference data (grading policy, subjects) loading from config.toml
pub mod seed;
