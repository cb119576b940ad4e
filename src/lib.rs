//! rusty-task: validated learning tasks over tabular data.
//!
//! A [`task::Task`] binds a [`data::model::Frame`] to a learning objective
//! (classification, regression, survival, cost-sensitive classification,
//! clustering or multilabel). [`task::TaskBuilder`] normalizes the table,
//! validates it against the objective and assembles an immutable task.

pub mod config;
pub mod data;
pub mod error;
pub mod task;

pub use error::{ConfigError, TaskError, ValidationError};
