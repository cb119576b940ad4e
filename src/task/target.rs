//! Target declarations per task type.
//!
//! | type       | targets            | required kinds (checked data)        |
//! |------------|--------------------|--------------------------------------|
//! | classif    | 1                  | factor, no missing                   |
//! | regr       | 1                  | numeric, finite, no missing          |
//! | surv       | 2 (time, event)    | numeric >= 0 / logical, no missing   |
//! | multilabel | >= 2               | logical, no missing                  |
//! | cluster    | 0                  |                                      |
//! | costsens   | 0 + cost matrix    | costs finite and >= 0                |

use std::collections::BTreeSet;

use log::debug;
use serde::Serialize;

use super::TaskType;
use crate::data::model::{ColumnData, Factor, Frame};
use crate::error::TaskError;

// ---------------------------------------------------------------------------
// CostMatrix
// ---------------------------------------------------------------------------

/// Per-observation misclassification costs: one row per observation, one
/// column per class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostMatrix {
    classes: Vec<String>,
    costs: Vec<Vec<f64>>,
}

impl CostMatrix {
    /// Build a cost matrix; classes must be unique, non-empty and at least two,
    /// and every row must have one cost per class.
    pub fn new(classes: Vec<String>, costs: Vec<Vec<f64>>) -> Result<Self, TaskError> {
        if classes.len() < 2 {
            return Err(TaskError::Target(format!(
                "cost matrix needs at least 2 classes, got {}",
                classes.len()
            )));
        }
        let mut seen = BTreeSet::new();
        for class in &classes {
            if class.trim().is_empty() {
                return Err(TaskError::Target("cost matrix has a blank class name".into()));
            }
            if !seen.insert(class.as_str()) {
                return Err(TaskError::Target(format!(
                    "cost matrix has duplicate class '{class}'"
                )));
            }
        }
        if let Some((row, r)) = costs.iter().enumerate().find(|(_, r)| r.len() != classes.len()) {
            return Err(TaskError::Target(format!(
                "cost matrix row {row} has {} entries, expected {}",
                r.len(),
                classes.len()
            )));
        }
        Ok(CostMatrix { classes, costs })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_rows(&self) -> usize {
        self.costs.len()
    }

    /// Costs of observation `row`, one per class.
    pub fn row(&self, row: usize) -> Option<&[f64]> {
        self.costs.get(row).map(Vec::as_slice)
    }

    fn check_values(&self) -> Result<(), TaskError> {
        for (row, costs) in self.costs.iter().enumerate() {
            for (class, &cost) in self.classes.iter().zip(costs) {
                if !cost.is_finite() || cost < 0.0 {
                    return Err(TaskError::Target(format!(
                        "cost for class '{class}' in row {row} must be finite and non-negative, got {cost}"
                    )));
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Declaration (always checked)
// ---------------------------------------------------------------------------

/// Check target arity, target existence and the cost matrix shape.
pub(crate) fn check_declaration(
    task_type: TaskType,
    data: &Frame,
    targets: &[String],
    costs: Option<&CostMatrix>,
) -> Result<(), TaskError> {
    let arity_ok = match task_type {
        TaskType::Classification | TaskType::Regression => targets.len() == 1,
        TaskType::Survival => targets.len() == 2,
        TaskType::Multilabel => targets.len() >= 2,
        TaskType::Clustering | TaskType::CostSensitive => targets.is_empty(),
    };
    if !arity_ok {
        let expected = match task_type {
            TaskType::Classification | TaskType::Regression => "exactly 1 target column",
            TaskType::Survival => "2 target columns (time, event)",
            TaskType::Multilabel => "at least 2 target columns",
            TaskType::Clustering | TaskType::CostSensitive => "no target columns",
        };
        return Err(TaskError::Target(format!(
            "{task_type} tasks take {expected}, got {}",
            targets.len()
        )));
    }

    let mut seen = BTreeSet::new();
    for target in targets {
        if !data.has_column(target) {
            return Err(TaskError::Target(format!("target column '{target}' does not exist")));
        }
        if !seen.insert(target.as_str()) {
            return Err(TaskError::Target(format!("target column '{target}' declared twice")));
        }
    }

    match (task_type, costs) {
        (TaskType::CostSensitive, None) => Err(TaskError::Target(
            "cost-sensitive tasks require a cost matrix".into(),
        )),
        (TaskType::CostSensitive, Some(costs)) if costs.n_rows() != data.n_rows() => {
            Err(TaskError::Target(format!(
                "cost matrix has {} rows, data has {}",
                costs.n_rows(),
                data.n_rows()
            )))
        }
        (TaskType::CostSensitive, Some(_)) | (_, None) => Ok(()),
        (_, Some(_)) => Err(TaskError::Target(format!(
            "a cost matrix is only valid for cost-sensitive tasks, not {task_type}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Fixup (skipped under FixupPolicy::Skip)
// ---------------------------------------------------------------------------

/// Coerce target columns into the kinds their task type expects.
pub(crate) fn fixup(task_type: TaskType, data: &mut Frame, targets: &[String]) {
    for col in data.columns_mut() {
        let Some(pos) = targets.iter().position(|t| *t == col.name) else {
            continue;
        };
        let converted = match (task_type, pos, &col.data) {
            (TaskType::Classification, _, values) => to_factor(values),
            (TaskType::Regression, _, ColumnData::Integer(v)) => Some(int_to_numeric(v)),
            (TaskType::Survival, 0, ColumnData::Integer(v)) => Some(int_to_numeric(v)),
            (TaskType::Survival, 1, values) => binary_to_logical(values),
            _ => None,
        };
        if let Some(converted) = converted {
            debug!(
                "converted target '{}' from {} to {}",
                col.name,
                col.kind(),
                converted.kind()
            );
            col.data = converted;
        }
    }
}

fn int_to_numeric(values: &[Option<i64>]) -> ColumnData {
    ColumnData::Numeric(values.iter().map(|v| v.map(|i| i as f64)).collect())
}

fn to_factor(data: &ColumnData) -> Option<ColumnData> {
    let factor = match data {
        ColumnData::Text(values) => Factor::from_optional(values.iter().map(|v| v.as_deref())),
        ColumnData::Logical(values) => {
            let labels: Vec<Option<&str>> = values
                .iter()
                .map(|v| v.map(|b| if b { "TRUE" } else { "FALSE" }))
                .collect();
            Factor::from_optional(labels)
        }
        ColumnData::Integer(values) => {
            let sorted: BTreeSet<i64> = values.iter().flatten().copied().collect();
            let levels: Vec<i64> = sorted.into_iter().collect();
            let codes = values
                .iter()
                .map(|v| v.and_then(|i| levels.binary_search(&i).ok().map(|c| c as u32)))
                .collect();
            let levels = levels.iter().map(i64::to_string).collect();
            Factor::new(levels, codes).ok()?
        }
        _ => return None,
    };
    Some(ColumnData::Categorical(factor))
}

fn binary_to_logical(data: &ColumnData) -> Option<ColumnData> {
    let values: Vec<Option<f64>> = match data {
        ColumnData::Integer(v) => v.iter().map(|x| x.map(|i| i as f64)).collect(),
        ColumnData::Numeric(v) => v.clone(),
        _ => return None,
    };
    if values.iter().flatten().any(|&v| v != 0.0 && v != 1.0) {
        return None;
    }
    Some(ColumnData::Logical(
        values.iter().map(|v| v.map(|x| x == 1.0)).collect(),
    ))
}

// ---------------------------------------------------------------------------
// Value checks (only with check_data)
// ---------------------------------------------------------------------------

/// Check target kinds and values, and the cost matrix entries.
pub(crate) fn check_values(
    task_type: TaskType,
    data: &Frame,
    targets: &[String],
    costs: Option<&CostMatrix>,
) -> Result<(), TaskError> {
    for (pos, name) in targets.iter().enumerate() {
        let Some(col) = data.column(name) else {
            continue;
        };
        let expected = match (task_type, pos) {
            (TaskType::Classification, _) => "factor",
            (TaskType::Regression, _) | (TaskType::Survival, 0) => "numeric",
            _ => "logical",
        };
        let fail = |what: String| Err(TaskError::Target(format!("target column '{name}' {what}")));

        match (expected, &col.data) {
            ("factor", ColumnData::Categorical(f)) => {
                if f.has_missing() {
                    return fail("contains missing values".into());
                }
            }
            ("numeric", ColumnData::Numeric(v)) => {
                if v.iter().any(Option::is_none) {
                    return fail("contains missing values".into());
                }
                if v.iter().flatten().any(|x| !x.is_finite()) {
                    return fail("contains non-finite values".into());
                }
                if task_type == TaskType::Survival && v.iter().flatten().any(|&x| x < 0.0) {
                    return fail("contains negative survival times".into());
                }
            }
            ("numeric", ColumnData::Integer(v)) => {
                if v.iter().any(Option::is_none) {
                    return fail("contains missing values".into());
                }
                if task_type == TaskType::Survival && v.iter().flatten().any(|&x| x < 0) {
                    return fail("contains negative survival times".into());
                }
            }
            ("logical", ColumnData::Logical(v)) => {
                if v.iter().any(Option::is_none) {
                    return fail("contains missing values".into());
                }
            }
            (expected, _) => {
                return fail(format!("must be {expected}, got {}", col.kind()));
            }
        }
    }

    if let Some(costs) = costs {
        costs.check_values()?;
    }
    Ok(())
}

/// Resolve the positive class of a binary classification task.
///
/// Defaults to the first target level; an explicit class must be a level.
pub(crate) fn resolve_positive(
    task_type: TaskType,
    data: &Frame,
    targets: &[String],
    positive: Option<String>,
) -> Result<Option<String>, TaskError> {
    if task_type != TaskType::Classification {
        return match positive {
            Some(_) => Err(TaskError::Target(format!(
                "a positive class is only valid for classification tasks, not {task_type}"
            ))),
            None => Ok(None),
        };
    }
    let factor = targets
        .first()
        .and_then(|t| data.column(t))
        .and_then(|c| c.as_factor());
    let Some(factor) = factor else {
        return match positive {
            Some(_) => Err(TaskError::Target(
                "a positive class requires a factor target".into(),
            )),
            None => Ok(None),
        };
    };
    let levels = factor.levels();
    match positive {
        Some(p) if levels.len() != 2 => Err(TaskError::Target(format!(
            "positive class '{p}' given, but the target has {} classes",
            levels.len()
        ))),
        Some(p) if !levels.contains(&p) => Err(TaskError::Target(format!(
            "positive class '{p}' is not one of: {}",
            levels.join(", ")
        ))),
        Some(p) => Ok(Some(p)),
        None if levels.len() == 2 => Ok(Some(levels[0].clone())),
        None => Ok(None),
    }
}
