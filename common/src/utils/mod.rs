//! Utility functions and helpers.

pub mod sql_statement;

// Re-export commonly used types
pub use sql_statement::StatementKind;
