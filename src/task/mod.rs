//! Learning tasks: a validated binding of a [`Frame`] to a learning objective.
//!
//! Lifecycle:
//! ```text
//!   Frame / RecordBatch + parameters
//!        │
//!        ▼
//!   ┌──────────────┐
//!   │ TaskBuilder  │  normalize → validate → assemble
//!   └──────────────┘
//!        │
//!        ▼
//!   ┌──────────────┐
//!   │ Task         │  validated, undescribed
//!   └──────────────┘
//!        │  Task::described()
//!        ▼
//!   ┌──────────────┐
//!   │ Task         │  description populated (read-only)
//!   └──────────────┘
//! ```

pub mod builder;
pub mod description;
pub mod target;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::model::{Column, Factor, Frame};
use crate::error::ConfigError;

pub use builder::{BuildWarning, FixupPolicy, TableInput, TaskBuilder};
pub use description::{describe, FeatureCounts, TaskDescription};
pub use target::CostMatrix;

// ---------------------------------------------------------------------------
// TaskType
// ---------------------------------------------------------------------------

/// The learning objective a task declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    #[serde(rename = "classif", alias = "classification")]
    Classification,
    #[serde(rename = "regr", alias = "regression")]
    Regression,
    #[serde(rename = "surv", alias = "survival")]
    Survival,
    #[serde(rename = "costsens", alias = "cost-sensitive-classification")]
    CostSensitive,
    #[serde(rename = "cluster", alias = "clustering")]
    Clustering,
    #[serde(rename = "multilabel")]
    Multilabel,
}

impl TaskType {
    /// Short identifier, as used in configuration files.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Classification => "classif",
            TaskType::Regression => "regr",
            TaskType::Survival => "surv",
            TaskType::CostSensitive => "costsens",
            TaskType::Clustering => "cluster",
            TaskType::Multilabel => "multilabel",
        }
    }

    /// Whether the task type learns from a target.
    pub fn is_supervised(self) -> bool {
        self != TaskType::Clustering
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskType::Classification => "classification",
            TaskType::Regression => "regression",
            TaskType::Survival => "survival",
            TaskType::CostSensitive => "cost-sensitive classification",
            TaskType::Clustering => "clustering",
            TaskType::Multilabel => "multilabel",
        };
        f.write_str(name)
    }
}

impl FromStr for TaskType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "classif" | "classification" => Ok(TaskType::Classification),
            "regr" | "regression" => Ok(TaskType::Regression),
            "surv" | "survival" => Ok(TaskType::Survival),
            "costsens" | "cost-sensitive" | "cost-sensitive-classification" => {
                Ok(TaskType::CostSensitive)
            }
            "cluster" | "clustering" => Ok(TaskType::Clustering),
            "multilabel" => Ok(TaskType::Multilabel),
            _ => Err(ConfigError::UnknownTaskType(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// Name of the reserved x coordinate column in spatial tasks.
pub const COORD_X: &str = "x";
/// Name of the reserved y coordinate column in spatial tasks.
pub const COORD_Y: &str = "y";

/// A validated learning task.
///
/// Built once by [`TaskBuilder`] and never mutated afterwards. The task owns
/// its table; [`Task::data`] only hands out a shared borrow.
#[derive(Debug, Clone)]
pub struct Task {
    id: String,
    task_type: TaskType,
    data: Frame,
    target: Vec<String>,
    features: Vec<String>,
    weights: Option<Vec<f64>>,
    blocking: Option<Factor>,
    spatial: bool,
    costs: Option<CostMatrix>,
    positive: Option<String>,
    warnings: Vec<BuildWarning>,
    description: Option<TaskDescription>,
}

impl Task {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn task_type(&self) -> TaskType {
        self.task_type
    }

    /// Number of observations.
    pub fn n_rows(&self) -> usize {
        self.data.n_rows()
    }

    /// Feature column names, in table order.
    ///
    /// Excludes target columns and, for spatial tasks, the coordinates.
    pub fn feature_names(&self) -> &[String] {
        &self.features
    }

    pub fn target_names(&self) -> &[String] {
        &self.target
    }

    /// Feature columns, in table order.
    pub fn features(&self) -> impl Iterator<Item = &Column> {
        self.data
            .columns()
            .iter()
            .filter(|c| self.features.contains(&c.name))
    }

    /// Read-only borrow of the owned table.
    pub fn data(&self) -> &Frame {
        &self.data
    }

    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }

    pub fn blocking(&self) -> Option<&Factor> {
        self.blocking.as_ref()
    }

    pub fn has_weights(&self) -> bool {
        self.weights.is_some()
    }

    pub fn has_blocking(&self) -> bool {
        self.blocking.is_some()
    }

    pub fn is_spatial(&self) -> bool {
        self.spatial
    }

    /// The reserved `x` and `y` columns of a spatial task.
    pub fn coordinates(&self) -> Option<(&Column, &Column)> {
        if !self.spatial {
            return None;
        }
        Some((self.data.column(COORD_X)?, self.data.column(COORD_Y)?))
    }

    pub fn costs(&self) -> Option<&CostMatrix> {
        self.costs.as_ref()
    }

    /// Positive class of a binary classification task.
    pub fn positive(&self) -> Option<&str> {
        self.positive.as_deref()
    }

    /// Non-fatal conditions recorded while building.
    pub fn warnings(&self) -> &[BuildWarning] {
        &self.warnings
    }

    /// The description, once [`Task::described`] has run.
    pub fn description(&self) -> Option<&TaskDescription> {
        self.description.as_ref()
    }

    pub fn is_described(&self) -> bool {
        self.description.is_some()
    }

    /// Compute the description and move into the described state.
    ///
    /// An already described task is returned unchanged.
    pub fn described(mut self) -> Self {
        if self.description.is_none() {
            self.description = Some(describe(&self));
        }
        self
    }

    /// Row indices per blocking label; rows of one group must stay together.
    ///
    /// Returns an empty map when the task has no blocking.
    pub fn blocking_groups(&self) -> BTreeMap<String, Vec<usize>> {
        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        if let Some(blocking) = &self.blocking {
            for row in 0..blocking.len() {
                if let Some(label) = blocking.label(row) {
                    groups.entry(label.to_string()).or_default().push(row);
                }
            }
        }
        groups
    }
}
