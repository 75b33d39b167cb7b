//! Validation run before an import touches the warehouse

pub mod columns;

pub use columns::{ColumnValidator, validate_column_name};
