use std::io::Write;
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, DictionaryArray, Float64Array, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Int32Type, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use rusty_task::config::TaskConfig;
use rusty_task::data::loader::{frame_from_record_batch, load_file};
use rusty_task::data::model::{ColumnData, ColumnKind};
use rusty_task::task::{BuildWarning, TaskBuilder, TaskType};
use rusty_task::{ConfigError, TaskError};

fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn soil_batch() -> RecordBatch {
    let soil = DictionaryArray::<Int32Type>::try_new(
        Int32Array::from(vec![0, 1, 0]),
        Arc::new(StringArray::from(vec!["clay", "loam", "peat"])),
    )
    .unwrap();
    let schema = Arc::new(Schema::new(vec![
        Field::new("a", DataType::Float64, false),
        Field::new(
            "soil",
            DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8)),
            false,
        ),
        Field::new("target", DataType::Float64, false),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0])) as ArrayRef,
            Arc::new(soil),
            Arc::new(Float64Array::from(vec![0.1, 0.2, 0.3])),
        ],
    )
    .unwrap()
}

#[test]
fn csv_columns_are_inferred() {
    let file = write_temp(
        ".csv",
        "a,n,soil,flag\n1.5,1,clay,true\nNA,2,loam,false\nInf,,clay,true\n",
    );
    let frame = load_file(file.path()).unwrap();

    assert_eq!(frame.n_rows(), 3);
    let kinds: Vec<_> = frame.columns().iter().map(|c| c.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            ColumnKind::Numeric,
            ColumnKind::Integer,
            ColumnKind::Factor,
            ColumnKind::Logical
        ]
    );
    match &frame.column("a").unwrap().data {
        ColumnData::Numeric(v) => {
            assert_eq!(v[0], Some(1.5));
            assert_eq!(v[1], None);
            assert_eq!(v[2], Some(f64::INFINITY));
        }
        other => panic!("unexpected column data: {other:?}"),
    }
    assert!(frame.column("n").unwrap().data.has_missing());
}

#[test]
fn json_records_keep_first_seen_order() {
    let file = write_temp(
        ".json",
        r#"[{"b": "lo", "a": 1}, {"a": 2.5, "c": null}, {"b": "hi", "a": 3}]"#,
    );
    let frame = load_file(file.path()).unwrap();

    assert_eq!(frame.column_names(), vec!["b", "a", "c"]);
    assert_eq!(frame.column("a").unwrap().kind(), ColumnKind::Numeric);
    assert_eq!(frame.column("c").unwrap().kind(), ColumnKind::Logical);
    let b = frame.column("b").unwrap().as_factor().unwrap();
    assert_eq!(b.levels(), &["hi".to_string(), "lo".to_string()]);
    assert_eq!(b.label(1), None);
}

#[test]
fn duplicate_csv_header_fails_config_build() {
    let file = write_temp(".csv", "a,w,w,target\n1,1,2,0.5\n2,1,2,0.7\n");
    let frame = load_file(file.path()).unwrap();
    assert_eq!(frame.column_names(), vec!["a", "w", "w", "target"]);

    let config =
        TaskConfig::from_json_str(r#"{"type": "regr", "target": "target", "weights": "w"}"#)
            .unwrap();
    let err = config.into_builder(frame).unwrap_err();
    assert!(matches!(err, ConfigError::Task(TaskError::Schema(_))));
}

#[test]
fn unknown_extension_is_rejected() {
    let file = write_temp(".xlsx", "");
    assert!(load_file(file.path()).is_err());
}

#[test]
fn parquet_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plots.parquet");
    let batch = soil_batch();

    let file = std::fs::File::create(&path).unwrap();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let frame = load_file(&path).unwrap();
    assert_eq!(frame.n_rows(), 3);
    assert_eq!(frame.column_names(), vec!["a", "soil", "target"]);
    let soil = frame.column("soil").unwrap().as_factor().unwrap();
    let labels: Vec<_> = (0..3).map(|i| soil.label(i)).collect();
    assert_eq!(labels, vec![Some("clay"), Some("loam"), Some("clay")]);
}

#[test]
fn dictionary_keeps_unused_levels() {
    let frame = frame_from_record_batch(&soil_batch()).unwrap();
    let soil = frame.column("soil").unwrap().as_factor().unwrap();
    assert_eq!(soil.empty_levels(), vec!["peat"]);
}

#[test]
fn booleans_become_logical() {
    let schema = Arc::new(Schema::new(vec![Field::new("flag", DataType::Boolean, true)]));
    let batch = RecordBatch::try_new(
        schema,
        vec![Arc::new(BooleanArray::from(vec![Some(true), None])) as ArrayRef],
    )
    .unwrap();
    let frame = frame_from_record_batch(&batch).unwrap();
    assert_eq!(
        frame.column("flag").unwrap().data,
        ColumnData::Logical(vec![Some(true), None])
    );
}

#[test]
fn arrow_input_is_converted_with_warning() {
    let task = TaskBuilder::new(TaskType::Regression, soil_batch())
        .target("target")
        .build()
        .unwrap();

    assert!(matches!(
        task.warnings()[0],
        BuildWarning::ConvertedTable { .. }
    ));
    assert_eq!(
        task.warnings()[1],
        BuildWarning::DroppedEmptyLevels {
            columns: vec!["soil".into()]
        }
    );
    assert_eq!(
        task.feature_names(),
        &["a".to_string(), "soil".to_string()]
    );
}
