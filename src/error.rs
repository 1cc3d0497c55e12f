use thiserror::Error;

/// Failures raised while turning a dataset and chart options into a `ChartSpec`.
///
/// Every variant is recoverable: the caller reports it and keeps going.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("column '{column}' selected for {role} does not exist in the table")]
    InvalidColumnReference { column: String, role: &'static str },

    #[error("column '{column}' cannot be used for {operation}: {reason}")]
    InvalidAxisData {
        column: String,
        operation: &'static str,
        reason: String,
    },
}

pub type ResolveResult<T> = Result<T, ResolveError>;

/// Failures raised while building a `Dataset`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("column '{column}' has {actual} values, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("column name '{0}' appears more than once")]
    DuplicateColumn(String),

    #[error("sheet '{requested}' not found (available: {available})")]
    UnknownSheet { requested: String, available: String },

    #[error("invalid table shape: {0}")]
    InvalidShape(String),
}
