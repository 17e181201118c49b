//! Failure taxonomy for table-level operations.
//!
//! Every cleaning, analysis and geo operation that inspects columns reports
//! problems through [`DataError`] instead of panicking. Callers at the
//! orchestration layer log the error and move on.

use crate::table::DataType;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    #[error("column '{0}' not found")]
    MissingColumn(String),

    #[error("column '{column}' has type {actual}, expected {expected}")]
    WrongType {
        column: String,
        expected: &'static str,
        actual: DataType,
    },

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl DataError {
    pub fn wrong_type(column: &str, expected: &'static str, actual: DataType) -> Self {
        DataError::WrongType {
            column: column.to_string(),
            expected,
            actual,
        }
    }
}

pub type DataResult<T> = Result<T, DataError>;
