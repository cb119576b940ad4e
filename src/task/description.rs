//! Task description: derived, read-only metadata about a built task.

use std::fmt;

use serde::Serialize;

use super::{Task, TaskType};
use crate::data::model::{ColumnData, ColumnKind};

/// Number of features per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FeatureCounts {
    pub numerics: usize,
    pub factors: usize,
    pub ordered: usize,
    /// Logical and text features (only present when data checks were skipped).
    pub other: usize,
}

impl FeatureCounts {
    pub fn total(&self) -> usize {
        self.numerics + self.factors + self.ordered + self.other
    }
}

/// Summary of a task, computed once by [`describe`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDescription {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub target: Vec<String>,
    pub size: usize,
    pub n_features: FeatureCounts,
    pub has_missings: bool,
    pub has_weights: bool,
    pub has_blocking: bool,
    pub is_spatial: bool,
    /// Class names: target levels, multilabel targets or cost matrix classes.
    pub class_levels: Vec<String>,
    /// Observations per class, aligned with `class_levels` (empty for
    /// cost-sensitive tasks).
    pub class_counts: Vec<usize>,
    pub positive: Option<String>,
    pub negative: Option<String>,
}

/// Compute the description of a task.
pub fn describe(task: &Task) -> TaskDescription {
    let mut n_features = FeatureCounts::default();
    let mut has_missings = false;
    for col in task.features() {
        let kind = col.kind();
        if kind.is_numeric() {
            n_features.numerics += 1;
        } else if kind == ColumnKind::Ordered {
            n_features.ordered += 1;
        } else if kind.is_categorical() {
            n_features.factors += 1;
        } else {
            n_features.other += 1;
        }
        has_missings |= col.data.has_missing();
    }

    let (class_levels, class_counts) = classes(task);
    let negative = task.positive().and_then(|p| {
        class_levels
            .iter()
            .find(|level| level.as_str() != p)
            .cloned()
    });

    TaskDescription {
        id: task.id().to_string(),
        task_type: task.task_type(),
        target: task.target_names().to_vec(),
        size: task.n_rows(),
        n_features,
        has_missings,
        has_weights: task.has_weights(),
        has_blocking: task.has_blocking(),
        is_spatial: task.is_spatial(),
        class_levels,
        class_counts,
        positive: task.positive().map(str::to_string),
        negative,
    }
}

fn classes(task: &Task) -> (Vec<String>, Vec<usize>) {
    match task.task_type() {
        TaskType::Classification => task
            .target_names()
            .first()
            .and_then(|t| task.data().column(t))
            .and_then(|c| c.as_factor())
            .map(|f| (f.levels().to_vec(), f.level_counts()))
            .unwrap_or_default(),
        TaskType::Multilabel => {
            let counts = task
                .target_names()
                .iter()
                .map(|t| match task.data().column(t).map(|c| &c.data) {
                    Some(ColumnData::Logical(v)) => v.iter().filter(|x| **x == Some(true)).count(),
                    _ => 0,
                })
                .collect();
            (task.target_names().to_vec(), counts)
        }
        TaskType::CostSensitive => (
            task.costs()
                .map(|c| c.classes().to_vec())
                .unwrap_or_default(),
            Vec::new(),
        ),
        _ => (Vec::new(), Vec::new()),
    }
}

impl fmt::Display for TaskDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.task_type.is_supervised() {
            "Supervised"
        } else {
            "Unsupervised"
        };
        writeln!(f, "{kind} task: {}", self.id)?;
        writeln!(f, "Type: {}", self.task_type.as_str())?;
        if !self.target.is_empty() {
            writeln!(f, "Target: {}", self.target.join(","))?;
        }
        writeln!(f, "Observations: {}", self.size)?;
        writeln!(f, "Features:")?;
        writeln!(
            f,
            "{:>10} {:>10} {:>10} {:>10}",
            "numerics", "factors", "ordered", "other"
        )?;
        let n = &self.n_features;
        writeln!(
            f,
            "{:>10} {:>10} {:>10} {:>10}",
            n.numerics, n.factors, n.ordered, n.other
        )?;
        writeln!(f, "Missings: {}", self.has_missings)?;
        writeln!(f, "Has weights: {}", self.has_weights)?;
        writeln!(f, "Has blocking: {}", self.has_blocking)?;
        writeln!(f, "Is spatial: {}", self.is_spatial)?;

        if !self.class_levels.is_empty() {
            writeln!(f, "Classes: {}", self.class_levels.len())?;
            if self.class_counts.len() == self.class_levels.len() {
                let cells: Vec<String> = self
                    .class_levels
                    .iter()
                    .zip(&self.class_counts)
                    .map(|(level, count)| format!("{level}={count}"))
                    .collect();
                writeln!(f, "{}", cells.join(" "))?;
            } else {
                writeln!(f, "{}", self.class_levels.join(" "))?;
            }
        }
        if self.task_type == TaskType::Classification {
            writeln!(
                f,
                "Positive class: {}",
                self.positive.as_deref().unwrap_or("NA")
            )?;
        }
        Ok(())
    }
}
