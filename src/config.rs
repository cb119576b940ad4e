//! Declarative task configuration.
//!
//! ```json
//! {
//!   "id": "yield",
//!   "type": "regr",
//!   "target": "yield",
//!   "weights": "w",
//!   "blocking": "field",
//!   "fixup": "warn",
//!   "check_data": true,
//!   "spatial": true
//! }
//! ```
//!
//! Columns named by `weights`, `blocking` and `costs` are moved out of the
//! table into the corresponding side channel.

use std::path::Path;

use serde::Deserialize;

use crate::data::model::{Column, ColumnData, Factor, Frame};
use crate::error::{ConfigError, TaskError};
use crate::task::{CostMatrix, FixupPolicy, TaskBuilder, TaskType};

/// One column name or a list of them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum ColumnList {
    One(String),
    Many(Vec<String>),
}

impl Default for ColumnList {
    fn default() -> Self {
        ColumnList::Many(Vec::new())
    }
}

impl ColumnList {
    fn into_vec(self) -> Vec<String> {
        match self {
            ColumnList::One(name) => vec![name],
            ColumnList::Many(names) => names,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Task parameters, as read from a JSON file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    #[serde(default)]
    target: ColumnList,
    #[serde(default)]
    pub positive: Option<String>,
    /// Column holding per-row weights.
    #[serde(default)]
    pub weights: Option<String>,
    /// Column holding per-row group labels.
    #[serde(default)]
    pub blocking: Option<String>,
    /// Columns holding per-class costs, named after their class.
    #[serde(default)]
    pub costs: Vec<String>,
    #[serde(default)]
    pub fixup: FixupPolicy,
    #[serde(default = "default_true")]
    pub check_data: bool,
    #[serde(default)]
    pub spatial: bool,
}

impl TaskConfig {
    /// Minimal configuration for a task type; everything else defaulted.
    pub fn new(task_type: TaskType) -> Self {
        TaskConfig {
            id: None,
            task_type,
            target: ColumnList::default(),
            positive: None,
            weights: None,
            blocking: None,
            costs: Vec::new(),
            fixup: FixupPolicy::default(),
            check_data: true,
            spatial: false,
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn targets(&self) -> Vec<String> {
        self.target.clone().into_vec()
    }

    pub fn set_targets(&mut self, targets: Vec<String>) {
        self.target = ColumnList::Many(targets);
    }

    /// Move side-channel columns out of `data` and prepare a builder.
    pub fn into_builder(self, mut data: Frame) -> Result<TaskBuilder, ConfigError> {
        data.check_names()?;
        let weights = self
            .weights
            .as_deref()
            .map(|name| take(&mut data, name, TaskError::Weights).and_then(weights_from))
            .transpose()?;
        let blocking = self
            .blocking
            .as_deref()
            .map(|name| take(&mut data, name, TaskError::Blocking).and_then(blocking_from))
            .transpose()?;
        let costs = if self.costs.is_empty() {
            None
        } else {
            Some(costs_from(&mut data, &self.costs)?)
        };

        let mut builder = TaskBuilder::new(self.task_type, data)
            .targets(self.target.into_vec())
            .fixup(self.fixup)
            .check_data(self.check_data)
            .spatial(self.spatial);
        if let Some(id) = self.id {
            builder = builder.id(id);
        }
        if let Some(positive) = self.positive {
            builder = builder.positive(positive);
        }
        if let Some(weights) = weights {
            builder = builder.weights(weights);
        }
        if let Some(blocking) = blocking {
            builder = builder.blocking(blocking);
        }
        if let Some(costs) = costs {
            builder = builder.costs(costs);
        }
        Ok(builder)
    }
}

fn take(
    data: &mut Frame,
    name: &str,
    err: fn(String) -> TaskError,
) -> Result<Column, TaskError> {
    data.take_column(name)
        .ok_or_else(|| err(format!("column '{name}' does not exist")))
}

fn numeric_values(col: &Column) -> Option<Vec<f64>> {
    match &col.data {
        ColumnData::Numeric(v) => Some(v.iter().map(|x| x.unwrap_or(f64::NAN)).collect()),
        ColumnData::Integer(v) => Some(
            v.iter()
                .map(|x| x.map(|i| i as f64).unwrap_or(f64::NAN))
                .collect(),
        ),
        _ => None,
    }
}

fn weights_from(col: Column) -> Result<Vec<f64>, TaskError> {
    numeric_values(&col).ok_or_else(|| {
        TaskError::Weights(format!(
            "column '{}' is {}, expected numeric",
            col.name,
            col.kind()
        ))
    })
}

fn blocking_from(col: Column) -> Result<Factor, TaskError> {
    match col.data {
        ColumnData::Categorical(f) => Ok(f),
        ColumnData::Integer(v) => {
            let labels: Vec<Option<String>> = v.iter().map(|x| x.map(|i| i.to_string())).collect();
            Ok(Factor::from_optional(labels.iter().map(|l| l.as_deref())))
        }
        ColumnData::Text(v) => Ok(Factor::from_optional(v.iter().map(|l| l.as_deref()))),
        other => Err(TaskError::Blocking(format!(
            "column '{}' is {}, expected categorical",
            col.name,
            other.kind()
        ))),
    }
}

fn costs_from(data: &mut Frame, classes: &[String]) -> Result<CostMatrix, TaskError> {
    let mut per_class = Vec::with_capacity(classes.len());
    for class in classes {
        let col = take(data, class, TaskError::Target)?;
        let values = numeric_values(&col).ok_or_else(|| {
            TaskError::Target(format!(
                "cost column '{class}' is {}, expected numeric",
                col.kind()
            ))
        })?;
        per_class.push(values);
    }
    let rows = (0..data.n_rows())
        .map(|row| per_class.iter().map(|costs| costs[row]).collect())
        .collect();
    CostMatrix::new(classes.to_vec(), rows)
}
