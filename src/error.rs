//! Error types for task construction and data validation.

use crate::data::model::ColumnKind;

/// A per-column violation found by the data validator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("column '{column}' contains infinite values")]
    InfiniteValue { column: String },

    #[error("column '{column}' contains NaN values")]
    NaNValue { column: String },

    #[error("column '{column}' contains empty factor levels: {}", levels.join(", "))]
    EmptyLevel { column: String, levels: Vec<String> },

    #[error("unsupported feature type ({kind}) in column '{column}'")]
    UnsupportedType { column: String, kind: ColumnKind },

    #[error("column '{column}' does not exist")]
    UnknownColumn { column: String },
}

impl ValidationError {
    /// Name of the offending column.
    pub fn column(&self) -> &str {
        match self {
            ValidationError::InfiniteValue { column }
            | ValidationError::NaNValue { column }
            | ValidationError::EmptyLevel { column, .. }
            | ValidationError::UnsupportedType { column, .. }
            | ValidationError::UnknownColumn { column } => column,
        }
    }
}

/// Task construction errors.
///
/// Every variant is raised synchronously by the builder; a task either is
/// fully valid or is not returned at all.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TaskError {
    #[error("schema error: {0}")]
    Schema(String),

    #[error("invalid weights: {0}")]
    Weights(String),

    #[error("invalid blocking: {0}")]
    Blocking(String),

    #[error("weights are not supported for {task_type} tasks")]
    Conflict { task_type: crate::task::TaskType },

    #[error(
        "spatial task requires a coordinate column named '{missing}'; \
         rename your coordinate columns to 'x' and 'y'"
    )]
    SpatialConfig { missing: &'static str },

    #[error("invalid target: {0}")]
    Target(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Errors raised while reading declarative task configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown task type '{0}'")]
    UnknownTaskType(String),

    #[error("unknown fixup policy '{0}'")]
    UnknownFixupPolicy(String),

    #[error("parsing task config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("reading task config: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Task(#[from] TaskError),
}
