use rusty_task::data::model::{Column, ColumnData, Factor, Frame};
use rusty_task::data::validate::validate;
use rusty_task::task::{BuildWarning, CostMatrix, FixupPolicy, TaskBuilder, TaskType};
use rusty_task::{TaskError, ValidationError};

fn levels(f: &Frame, column: &str) -> Vec<String> {
    f.column(column)
        .and_then(Column::as_factor)
        .map(|f| f.levels().to_vec())
        .unwrap_or_default()
}

/// Three rows; `c` declares "hi" but never uses it, `d` is clean, `e` declares
/// an unused "z".
fn frame_with_empty_levels() -> Frame {
    Frame::new(vec![
        Column::categorical(
            "c",
            Factor::with_levels(&["lo", "mid", "lo"], &["lo", "mid", "hi"]).unwrap(),
        ),
        Column::categorical("d", Factor::from_labels(&["a", "b", "a"])),
        Column::categorical("e", Factor::with_levels(&["u", "u", "u"], &["u", "z"]).unwrap()),
        Column::numeric("target", vec![1.0, 2.0, 3.0]),
    ])
    .unwrap()
}

fn three_rows() -> Frame {
    Frame::new(vec![
        Column::numeric("a", vec![1.0, 2.0, 3.0]),
        Column::numeric("target", vec![0.5, 1.5, 2.5]),
    ])
    .unwrap()
}

// ---------------------------------------------------------------------------
// Fixup
// ---------------------------------------------------------------------------

#[test]
fn warn_and_clean_drops_level_with_single_warning() {
    let data = Frame::new(vec![
        Column::categorical(
            "c",
            Factor::with_levels(&["lo", "mid", "lo"], &["lo", "mid", "hi"]).unwrap(),
        ),
        Column::numeric("target", vec![1.0, 2.0, 3.0]),
    ])
    .unwrap();

    let task = TaskBuilder::new(TaskType::Regression, data)
        .target("target")
        .fixup(FixupPolicy::Warn)
        .build()
        .unwrap();

    assert_eq!(levels(task.data(), "c"), vec!["lo", "mid"]);
    assert_eq!(
        task.warnings(),
        &[BuildWarning::DroppedEmptyLevels {
            columns: vec!["c".into()]
        }]
    );
}

#[test]
fn warn_and_clean_aggregates_columns_in_order() {
    let task = TaskBuilder::new(TaskType::Regression, frame_with_empty_levels())
        .target("target")
        .build()
        .unwrap();

    assert_eq!(task.warnings().len(), 1);
    assert_eq!(
        task.warnings()[0],
        BuildWarning::DroppedEmptyLevels {
            columns: vec!["c".into(), "e".into()]
        }
    );
    assert_eq!(levels(task.data(), "e"), vec!["u"]);
    assert_eq!(levels(task.data(), "d"), vec!["a", "b"]);
}

#[test]
fn cleanup_keeps_row_values() {
    let task = TaskBuilder::new(TaskType::Regression, frame_with_empty_levels())
        .target("target")
        .fixup(FixupPolicy::Quiet)
        .build()
        .unwrap();
    let c = task.data().column("c").unwrap().as_factor().unwrap();
    let labels: Vec<_> = (0..3).map(|i| c.label(i)).collect();
    assert_eq!(labels, vec![Some("lo"), Some("mid"), Some("lo")]);
}

#[test]
fn skip_never_touches_levels() {
    let original = frame_with_empty_levels();
    let task = TaskBuilder::new(TaskType::Regression, original.clone())
        .target("target")
        .fixup(FixupPolicy::Skip)
        .check_data(false)
        .build()
        .unwrap();

    assert_eq!(task.data(), &original);
    assert!(task.warnings().is_empty());
}

#[test]
fn skip_with_checks_reports_empty_level() {
    let err = TaskBuilder::new(TaskType::Regression, frame_with_empty_levels())
        .target("target")
        .fixup(FixupPolicy::Skip)
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        TaskError::Validation(ValidationError::EmptyLevel {
            column: "c".into(),
            levels: vec!["hi".into()],
        })
    );
}

// ---------------------------------------------------------------------------
// Weights and blocking
// ---------------------------------------------------------------------------

#[test]
fn wrong_weight_length_fails_only_when_checked() {
    let err = TaskBuilder::new(TaskType::Regression, three_rows())
        .target("target")
        .weights(vec![1.0, 1.0])
        .build()
        .unwrap_err();
    assert!(matches!(err, TaskError::Weights(_)));

    let task = TaskBuilder::new(TaskType::Regression, three_rows())
        .target("target")
        .weights(vec![1.0, 1.0])
        .check_data(false)
        .build()
        .unwrap();
    assert!(task.has_weights());
}

#[test]
fn negative_weight_fails() {
    let err = TaskBuilder::new(TaskType::Regression, three_rows())
        .target("target")
        .weights(vec![0.5, 0.5, -0.1])
        .build()
        .unwrap_err();
    assert!(matches!(err, TaskError::Weights(msg) if msg.contains("negative")));
}

#[test]
fn weights_conflict_with_cost_sensitive_regardless_of_checks() {
    for check in [true, false] {
        let costs = CostMatrix::new(
            vec!["p".into(), "q".into()],
            vec![vec![0.0, 1.0]; 3],
        )
        .unwrap();
        let err = TaskBuilder::new(TaskType::CostSensitive, three_rows())
            .costs(costs)
            .weights(vec![1.0; 3])
            .check_data(check)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            TaskError::Conflict {
                task_type: TaskType::CostSensitive
            }
        );
    }
}

#[test]
fn empty_blocking_means_no_blocking() {
    let empty: [&str; 0] = [];
    let task = TaskBuilder::new(TaskType::Regression, three_rows())
        .target("target")
        .blocking(Factor::from_labels(&empty))
        .build()
        .unwrap();
    assert!(!task.has_blocking());
    assert!(task.blocking_groups().is_empty());
}

#[test]
fn blocking_is_kept_and_grouped() {
    let task = TaskBuilder::new(TaskType::Regression, three_rows())
        .target("target")
        .blocking(Factor::from_labels(&["a", "b", "a"]))
        .build()
        .unwrap();
    assert!(task.has_blocking());
    assert_eq!(task.blocking_groups()["a"], vec![0, 2]);
}

// ---------------------------------------------------------------------------
// Spatial
// ---------------------------------------------------------------------------

#[test]
fn spatial_requires_y() {
    let data = Frame::new(vec![
        Column::numeric("x", vec![1.0]),
        Column::numeric("lat", vec![1.0]),
        Column::numeric("target", vec![1.0]),
    ])
    .unwrap();
    let err = TaskBuilder::new(TaskType::Regression, data)
        .target("target")
        .spatial(true)
        .build()
        .unwrap_err();
    assert_eq!(err, TaskError::SpatialConfig { missing: "y" });
    assert!(err.to_string().contains("rename"));
}

#[test]
fn spatial_reserves_coordinates() {
    let data = Frame::new(vec![
        Column::numeric("x", vec![1.0, 2.0]),
        Column::numeric("a", vec![1.0, 2.0]),
        Column::numeric("y", vec![3.0, 4.0]),
        Column::numeric("target", vec![1.0, 2.0]),
    ])
    .unwrap();
    let task = TaskBuilder::new(TaskType::Regression, data)
        .target("target")
        .spatial(true)
        .build()
        .unwrap();

    assert_eq!(task.feature_names(), &["a".to_string()]);
    assert!(task.data().has_column("x"));
    let (x, y) = task.coordinates().unwrap();
    assert_eq!((x.name.as_str(), y.name.as_str()), ("x", "y"));
    assert!(task.described().description().unwrap().is_spatial);
}

#[test]
fn coordinates_are_features_when_not_spatial() {
    let data = Frame::new(vec![
        Column::numeric("X", vec![1.0]),
        Column::numeric("y", vec![1.0]),
    ])
    .unwrap();
    let task = TaskBuilder::new(TaskType::Clustering, data).build().unwrap();
    assert_eq!(task.feature_names(), &["X".to_string(), "y".to_string()]);
}

// ---------------------------------------------------------------------------
// Feature validation
// ---------------------------------------------------------------------------

#[test]
fn infinite_feature_fails_construction() {
    let data = Frame::new(vec![
        Column::numeric("a", vec![1.0, 2.0, f64::INFINITY]),
        Column::numeric("target", vec![0.0, 1.0, 0.0]),
    ])
    .unwrap();
    let err = TaskBuilder::new(TaskType::Regression, data)
        .target("target")
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        TaskError::Validation(ValidationError::InfiniteValue { column: "a".into() })
    );
}

#[test]
fn nan_feature_is_accepted_without_checks() {
    let data = Frame::new(vec![Column::numeric("a", vec![f64::NAN])]).unwrap();
    assert!(matches!(
        validate(&data, None),
        Err(ValidationError::NaNValue { .. })
    ));
    let task = TaskBuilder::new(TaskType::Clustering, data)
        .check_data(false)
        .build()
        .unwrap();
    assert_eq!(task.n_rows(), 1);
}

#[test]
fn logical_feature_is_unsupported() {
    let data = Frame::new(vec![
        Column::logical("flag", vec![true, false]),
        Column::new("target", ColumnData::Numeric(vec![Some(1.0), Some(2.0)])),
    ])
    .unwrap();
    let err = TaskBuilder::new(TaskType::Regression, data)
        .target("target")
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        TaskError::Validation(ValidationError::UnsupportedType { column, .. }) if column == "flag"
    ));
}

// ---------------------------------------------------------------------------
// Task types
// ---------------------------------------------------------------------------

#[test]
fn survival_task_from_integer_columns() {
    let data = Frame::new(vec![
        Column::numeric("age", vec![50.0, 61.0, 70.0]),
        Column::integer("time", vec![10, 4, 7]),
        Column::integer("status", vec![1, 0, 1]),
    ])
    .unwrap();
    let task = TaskBuilder::new(TaskType::Survival, data)
        .targets(["time", "status"])
        .build()
        .unwrap();
    assert_eq!(task.feature_names(), &["age".to_string()]);
    assert!(matches!(
        task.data().column("status").unwrap().data,
        ColumnData::Logical(_)
    ));
}

#[test]
fn classification_with_missing_target_fails() {
    let data = Frame::new(vec![
        Column::numeric("a", vec![1.0, 2.0]),
        Column::categorical("label", Factor::from_optional([Some("u"), None])),
    ])
    .unwrap();
    let err = TaskBuilder::new(TaskType::Classification, data)
        .target("label")
        .build()
        .unwrap_err();
    assert!(matches!(err, TaskError::Target(msg) if msg.contains("missing")));
}

#[test]
fn classification_target_empty_level_is_dropped() {
    let data = Frame::new(vec![
        Column::numeric("a", vec![1.0, 2.0]),
        Column::categorical(
            "label",
            Factor::with_levels(&["neg", "pos"], &["neg", "pos", "unknown"]).unwrap(),
        ),
    ])
    .unwrap();
    let task = TaskBuilder::new(TaskType::Classification, data)
        .target("label")
        .build()
        .unwrap()
        .described();
    let desc = task.description().unwrap();
    assert_eq!(desc.class_levels, vec!["neg".to_string(), "pos".to_string()]);
    assert_eq!(task.positive(), Some("neg"));
}

#[test]
fn cost_sensitive_rows_must_match() {
    let costs = CostMatrix::new(vec!["p".into(), "q".into()], vec![vec![0.0, 1.0]]).unwrap();
    let err = TaskBuilder::new(TaskType::CostSensitive, three_rows())
        .costs(costs)
        .build()
        .unwrap_err();
    assert!(matches!(err, TaskError::Target(_)));
}

#[test]
fn task_owns_its_data() {
    let mut data = three_rows();
    let task = TaskBuilder::new(TaskType::Regression, data.clone())
        .target("target")
        .build()
        .unwrap();
    data.take_column("a");
    assert!(task.data().has_column("a"));
    assert_eq!(task.n_rows(), 3);
}
