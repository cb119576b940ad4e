//! Task construction: normalize → validate → assemble.

use std::fmt;

use arrow::record_batch::RecordBatch;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::target::{self, CostMatrix};
use super::{Task, TaskType, COORD_X, COORD_Y};
use crate::data::loader::frame_from_record_batch;
use crate::data::model::{ColumnData, Factor, Frame};
use crate::data::validate::validate;
use crate::error::{ConfigError, TaskError};

// ---------------------------------------------------------------------------
// FixupPolicy
// ---------------------------------------------------------------------------

/// How structural defects (unused factor levels, target kinds) are cleaned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FixupPolicy {
    /// No normalization.
    #[serde(rename = "no", alias = "skip")]
    Skip,
    /// Clean silently.
    #[serde(rename = "quiet")]
    Quiet,
    /// Clean and emit one warning naming every changed column.
    #[default]
    #[serde(rename = "warn")]
    Warn,
}

impl std::str::FromStr for FixupPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "no" | "skip" => Ok(FixupPolicy::Skip),
            "quiet" | "quiet-clean" => Ok(FixupPolicy::Quiet),
            "warn" | "warn-and-clean" => Ok(FixupPolicy::Warn),
            _ => Err(ConfigError::UnknownFixupPolicy(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Inputs and warnings
// ---------------------------------------------------------------------------

/// Tabular input accepted by the builder.
///
/// Anything other than a [`Frame`] is converted (with a warning); the task
/// never keeps the caller's container.
#[derive(Debug, Clone)]
pub enum TableInput {
    Frame(Frame),
    Arrow(RecordBatch),
}

impl From<Frame> for TableInput {
    fn from(frame: Frame) -> Self {
        TableInput::Frame(frame)
    }
}

impl From<RecordBatch> for TableInput {
    fn from(batch: RecordBatch) -> Self {
        TableInput::Arrow(batch)
    }
}

/// A non-fatal condition noticed while building a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildWarning {
    /// Empty factor levels were dropped from these columns, in table order.
    DroppedEmptyLevels { columns: Vec<String> },
    /// The input table was converted into a [`Frame`].
    ConvertedTable { from: &'static str },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildWarning::DroppedEmptyLevels { columns } => write!(
                f,
                "Empty factor levels were dropped for columns: {}",
                columns.join(",")
            ),
            BuildWarning::ConvertedTable { from } => write!(
                f,
                "Provided data is not a plain frame but {from}, hence it was converted"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// TaskBuilder
// ---------------------------------------------------------------------------

/// Builder for [`Task`].
///
/// # Example
///
/// ```
/// use rusty_task::data::model::{Column, Factor, Frame};
/// use rusty_task::task::{FixupPolicy, TaskBuilder, TaskType};
///
/// let levels = Factor::with_levels(&["lo", "mid", "lo"], &["lo", "mid", "hi"]).unwrap();
/// let data = Frame::new(vec![
///     Column::categorical("c", levels),
///     Column::numeric("y", vec![0.1, 0.2, 0.3]),
/// ])
/// .unwrap();
///
/// let task = TaskBuilder::new(TaskType::Regression, data)
///     .target("y")
///     .fixup(FixupPolicy::Warn)
///     .build()
///     .unwrap();
///
/// assert_eq!(task.feature_names(), &["c".to_string()]);
/// assert_eq!(task.warnings().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct TaskBuilder {
    task_type: TaskType,
    data: TableInput,
    id: Option<String>,
    targets: Vec<String>,
    weights: Option<Vec<f64>>,
    blocking: Option<Factor>,
    costs: Option<CostMatrix>,
    positive: Option<String>,
    fixup: FixupPolicy,
    check_data: bool,
    spatial: bool,
}

impl TaskBuilder {
    /// Start a task of `task_type` over `data`.
    ///
    /// Defaults: warn-and-clean fixup, data checks on, not spatial.
    pub fn new(task_type: TaskType, data: impl Into<TableInput>) -> Self {
        TaskBuilder {
            task_type,
            data: data.into(),
            id: None,
            targets: Vec::new(),
            weights: None,
            blocking: None,
            costs: None,
            positive: None,
            fixup: FixupPolicy::default(),
            check_data: true,
            spatial: false,
        }
    }

    /// Task identifier; defaults to the short task type name.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a target column.
    pub fn target(mut self, name: impl Into<String>) -> Self {
        self.targets.push(name.into());
        self
    }

    /// Replace the target columns (survival: `[time, event]`).
    pub fn targets<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = names.into_iter().map(Into::into).collect();
        self
    }

    /// Per-row weights; a NaN entry counts as missing.
    pub fn weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Per-row group labels. An empty factor means no blocking.
    pub fn blocking(mut self, blocking: Factor) -> Self {
        self.blocking = Some(blocking);
        self
    }

    /// Cost matrix of a cost-sensitive task.
    pub fn costs(mut self, costs: CostMatrix) -> Self {
        self.costs = Some(costs);
        self
    }

    /// Positive class of a binary classification task.
    pub fn positive(mut self, class: impl Into<String>) -> Self {
        self.positive = Some(class.into());
        self
    }

    pub fn fixup(mut self, policy: FixupPolicy) -> Self {
        self.fixup = policy;
        self
    }

    /// Run structural validation of weights, blocking, targets and features.
    ///
    /// Disabling it is faster but the caller then vouches for the data.
    pub fn check_data(mut self, check: bool) -> Self {
        self.check_data = check;
        self
    }

    /// Reserve the `x` and `y` columns as coordinates.
    pub fn spatial(mut self, spatial: bool) -> Self {
        self.spatial = spatial;
        self
    }

    /// Build the task.
    ///
    /// # Errors
    ///
    /// - [`TaskError::Conflict`]: weights on a cost-sensitive task
    /// - [`TaskError::Schema`]: blank or duplicate column names
    /// - [`TaskError::SpatialConfig`]: `x` or `y` missing in spatial mode
    /// - [`TaskError::Target`]: bad target declaration or values, or a
    ///   spatial coordinate declared as target
    /// - [`TaskError::Weights`], [`TaskError::Blocking`]: bad side channels
    /// - [`TaskError::Validation`]: a feature column failed validation
    pub fn build(self) -> Result<Task, TaskError> {
        let TaskBuilder {
            task_type,
            data,
            id,
            targets,
            weights,
            blocking,
            costs,
            positive,
            fixup,
            check_data,
            spatial,
        } = self;

        if weights.is_some() && task_type == TaskType::CostSensitive {
            return Err(TaskError::Conflict { task_type });
        }

        let mut warnings = Vec::new();
        let mut data = match data {
            TableInput::Frame(frame) => frame,
            TableInput::Arrow(batch) => {
                let converted = BuildWarning::ConvertedTable {
                    from: "an arrow record batch",
                };
                warn!("{converted}");
                warnings.push(converted);
                frame_from_record_batch(&batch)?
            }
        };

        data.check_names()?;
        if spatial {
            for coord in [COORD_X, COORD_Y] {
                if !data.has_column(coord) {
                    return Err(TaskError::SpatialConfig { missing: coord });
                }
                if targets.iter().any(|t| t == coord) {
                    return Err(TaskError::Target(format!(
                        "coordinate column '{coord}' is reserved in spatial tasks"
                    )));
                }
            }
        }
        target::check_declaration(task_type, &data, &targets, costs.as_ref())?;

        if fixup != FixupPolicy::Skip {
            target::fixup(task_type, &mut data, &targets);
            let dropped = drop_empty_levels(&mut data);
            if fixup == FixupPolicy::Warn && !dropped.is_empty() {
                let dropped = BuildWarning::DroppedEmptyLevels { columns: dropped };
                warn!("{dropped}");
                warnings.push(dropped);
            }
        }

        let features: Vec<String> = data
            .columns()
            .iter()
            .map(|c| c.name.clone())
            .filter(|name| !targets.contains(name))
            .filter(|name| !(spatial && (name == COORD_X || name == COORD_Y)))
            .collect();

        if check_data {
            if let Some(weights) = &weights {
                check_weights(weights, data.n_rows())?;
            }
            if let Some(blocking) = &blocking {
                check_blocking(blocking, data.n_rows())?;
            }
            target::check_values(task_type, &data, &targets, costs.as_ref())?;
            let names: Vec<&str> = features.iter().map(String::as_str).collect();
            validate(&data, Some(names.as_slice()))?;
        } else {
            debug!("skipping data checks for {task_type} task");
        }

        let positive = target::resolve_positive(task_type, &data, &targets, positive)?;

        let task = Task {
            id: id.unwrap_or_else(|| task_type.as_str().to_string()),
            task_type,
            data,
            target: targets,
            features,
            weights,
            blocking: blocking.filter(|b| !b.is_empty()),
            spatial,
            costs,
            positive,
            warnings,
            description: None,
        };
        debug!(
            "built {} task '{}': {} rows, {} features",
            task.task_type,
            task.id,
            task.n_rows(),
            task.features.len()
        );
        Ok(task)
    }
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// Drop unused levels of every factor column; returns the changed columns.
fn drop_empty_levels(data: &mut Frame) -> Vec<String> {
    let mut dropped = Vec::new();
    for col in data.columns_mut() {
        let cleaned = match &col.data {
            ColumnData::Categorical(f) if f.has_empty_levels() => f.drop_unused_levels(),
            _ => continue,
        };
        col.data = ColumnData::Categorical(cleaned);
        dropped.push(col.name.clone());
    }
    dropped
}

fn check_weights(weights: &[f64], n_rows: usize) -> Result<(), TaskError> {
    if weights.len() != n_rows {
        return Err(TaskError::Weights(format!(
            "expected {n_rows} weights, got {}",
            weights.len()
        )));
    }
    if let Some(row) = weights.iter().position(|w| w.is_nan()) {
        return Err(TaskError::Weights(format!("missing weight in row {row}")));
    }
    if let Some((row, w)) = weights.iter().enumerate().find(|(_, w)| **w < 0.0) {
        return Err(TaskError::Weights(format!(
            "negative weight {w} in row {row}"
        )));
    }
    Ok(())
}

/// An empty blocking factor is accepted as "no blocking".
fn check_blocking(blocking: &Factor, n_rows: usize) -> Result<(), TaskError> {
    if !blocking.is_empty() && blocking.len() != n_rows {
        return Err(TaskError::Blocking(format!(
            "expected {n_rows} labels, got {}",
            blocking.len()
        )));
    }
    if let Some(row) = blocking.codes().iter().position(Option::is_none) {
        return Err(TaskError::Blocking(format!("missing label in row {row}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;
    use crate::error::ValidationError;

    fn regr_frame() -> Frame {
        Frame::new(vec![
            Column::numeric("a", vec![1.0, 2.0, 3.0]),
            Column::numeric("y", vec![0.0, 1.0, 0.0]),
        ])
        .unwrap()
    }

    #[test]
    fn fixup_policy_parses() {
        assert_eq!("no".parse::<FixupPolicy>().unwrap(), FixupPolicy::Skip);
        assert_eq!("quiet".parse::<FixupPolicy>().unwrap(), FixupPolicy::Quiet);
        assert_eq!(
            "warn-and-clean".parse::<FixupPolicy>().unwrap(),
            FixupPolicy::Warn
        );
        assert!("loud".parse::<FixupPolicy>().is_err());
        assert_eq!(FixupPolicy::default(), FixupPolicy::Warn);
    }

    #[test]
    fn rejects_blank_and_duplicate_names() {
        let blank = Frame::new(vec![Column::numeric(" ", vec![1.0])]).unwrap();
        assert!(matches!(
            TaskBuilder::new(TaskType::Clustering, blank).build(),
            Err(TaskError::Schema(_))
        ));

        let dup = Frame::new(vec![
            Column::numeric("a", vec![1.0]),
            Column::numeric("a", vec![2.0]),
        ])
        .unwrap();
        assert!(matches!(
            TaskBuilder::new(TaskType::Clustering, dup)
                .check_data(false)
                .build(),
            Err(TaskError::Schema(msg)) if msg.contains("'a'")
        ));
    }

    #[test]
    fn default_id_is_type_name() {
        let task = TaskBuilder::new(TaskType::Regression, regr_frame())
            .target("y")
            .build()
            .unwrap();
        assert_eq!(task.id(), "regr");
        assert!(task.warnings().is_empty());
    }

    #[test]
    fn weights_checks() {
        let err = TaskBuilder::new(TaskType::Regression, regr_frame())
            .target("y")
            .weights(vec![1.0, f64::NAN, 1.0])
            .build()
            .unwrap_err();
        assert!(matches!(err, TaskError::Weights(msg) if msg.contains("missing")));

        let err = TaskBuilder::new(TaskType::Regression, regr_frame())
            .target("y")
            .weights(vec![1.0])
            .build()
            .unwrap_err();
        assert!(matches!(err, TaskError::Weights(_)));

        let task = TaskBuilder::new(TaskType::Regression, regr_frame())
            .target("y")
            .weights(vec![0.0, 1.0, 2.0])
            .build()
            .unwrap();
        assert_eq!(task.weights(), Some(&[0.0, 1.0, 2.0][..]));
    }

    #[test]
    fn blocking_checks() {
        let err = TaskBuilder::new(TaskType::Regression, regr_frame())
            .target("y")
            .blocking(Factor::from_labels(&["a", "b"]))
            .build()
            .unwrap_err();
        assert!(matches!(err, TaskError::Blocking(_)));

        let err = TaskBuilder::new(TaskType::Regression, regr_frame())
            .target("y")
            .blocking(Factor::from_optional([Some("a"), None, Some("b")]))
            .build()
            .unwrap_err();
        assert!(matches!(err, TaskError::Blocking(msg) if msg.contains("row 1")));
    }

    #[test]
    fn quiet_fixup_cleans_without_warning() {
        let factor = Factor::with_levels(&["a", "a", "a"], &["a", "b"]).unwrap();
        let data = Frame::new(vec![
            Column::categorical("f", factor),
            Column::numeric("y", vec![1.0, 2.0, 3.0]),
        ])
        .unwrap();
        let task = TaskBuilder::new(TaskType::Regression, data)
            .target("y")
            .fixup(FixupPolicy::Quiet)
            .build()
            .unwrap();
        assert!(task.warnings().is_empty());
        let f = task.data().column("f").unwrap().as_factor().unwrap();
        assert_eq!(f.levels(), &["a".to_string()]);
    }

    #[test]
    fn skip_fixup_reports_empty_level_on_check() {
        let factor = Factor::with_levels(&["a", "a", "a"], &["a", "b"]).unwrap();
        let data = Frame::new(vec![
            Column::categorical("f", factor),
            Column::numeric("y", vec![1.0, 2.0, 3.0]),
        ])
        .unwrap();
        let err = TaskBuilder::new(TaskType::Regression, data)
            .target("y")
            .fixup(FixupPolicy::Skip)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            TaskError::Validation(ValidationError::EmptyLevel { column, .. }) if column == "f"
        ));
    }

    #[test]
    fn targets_are_not_validated_as_features() {
        // A logical feature is unsupported, a logical multilabel target is fine.
        let data = Frame::new(vec![
            Column::numeric("a", vec![1.0, 2.0]),
            Column::logical("l1", vec![true, false]),
            Column::logical("l2", vec![false, false]),
        ])
        .unwrap();
        let task = TaskBuilder::new(TaskType::Multilabel, data)
            .targets(["l1", "l2"])
            .build()
            .unwrap();
        assert_eq!(task.feature_names(), &["a".to_string()]);
    }

    #[test]
    fn spatial_coordinate_cannot_be_target() {
        let data = Frame::new(vec![
            Column::numeric("x", vec![1.0, 2.0]),
            Column::numeric("a", vec![0.5, 0.1]),
            Column::numeric("y", vec![3.0, 4.0]),
        ])
        .unwrap();
        let err = TaskBuilder::new(TaskType::Regression, data.clone())
            .target("y")
            .spatial(true)
            .build()
            .unwrap_err();
        assert!(matches!(err, TaskError::Target(msg) if msg.contains("'y'")));

        let task = TaskBuilder::new(TaskType::Regression, data)
            .target("y")
            .build()
            .unwrap();
        assert_eq!(task.feature_names(), &["x".to_string(), "a".to_string()]);
    }

    #[test]
    fn arrow_input_is_converted_with_warning() {
        use std::sync::Arc;

        use arrow::array::{ArrayRef, Float64Array};
        use arrow::datatypes::{DataType, Field, Schema};

        let schema = Arc::new(Schema::new(vec![
            Field::new("a", DataType::Float64, true),
            Field::new("y", DataType::Float64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Float64Array::from(vec![Some(1.0), None])) as ArrayRef,
                Arc::new(Float64Array::from(vec![0.5, 1.5])) as ArrayRef,
            ],
        )
        .unwrap();

        let task = TaskBuilder::new(TaskType::Regression, batch)
            .target("y")
            .build()
            .unwrap();
        assert_eq!(task.n_rows(), 2);
        assert_eq!(
            task.warnings(),
            &[BuildWarning::ConvertedTable {
                from: "an arrow record batch"
            }]
        );
    }

    #[test]
    fn warning_messages() {
        let w = BuildWarning::DroppedEmptyLevels {
            columns: vec!["c".into(), "d".into()],
        };
        assert_eq!(
            w.to_string(),
            "Empty factor levels were dropped for columns: c,d"
        );
    }
}
