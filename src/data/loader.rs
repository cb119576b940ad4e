use std::path::Path;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::{cast, concat_batches};
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Column, ColumnData, Factor, Frame};
use crate::error::TaskError;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – any flat schema; dictionary columns become factors
/// * `.json`    – records: `[{ "a": 1.5, "b": "lo", ... }, ...]`
/// * `.csv`     – header row, one column per field
pub fn load_file(path: &Path) -> Result<Frame> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let frame = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }?;
    log::debug!(
        "loaded {}: {} rows, {} columns",
        path.display(),
        frame.n_rows(),
        frame.n_cols()
    );
    Ok(frame)
}

// ---------------------------------------------------------------------------
// Cell – a single parsed value from a text format
// ---------------------------------------------------------------------------

/// A dynamically-typed cell from CSV or JSON, before the column kind is known.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl Cell {
    fn as_text(&self) -> Option<String> {
        match self {
            Cell::Text(s) => Some(s.clone()),
            Cell::Integer(i) => Some(i.to_string()),
            Cell::Float(v) => Some(v.to_string()),
            Cell::Bool(b) => Some(b.to_string()),
            Cell::Null => None,
        }
    }
}

/// Pick the narrowest column kind that holds every cell.
///
/// integer ⊂ numeric; booleans stay logical; anything with text becomes a
/// factor over the textual values; an all-null column is logical.
fn column_from_cells(name: String, cells: Vec<Cell>) -> Column {
    let has = |pred: fn(&Cell) -> bool| cells.iter().any(pred);
    let has_text = has(|c| matches!(c, Cell::Text(_)));
    let has_float = has(|c| matches!(c, Cell::Float(_)));
    let has_int = has(|c| matches!(c, Cell::Integer(_)));
    let has_bool = has(|c| matches!(c, Cell::Bool(_)));

    let data = if has_text || (has_bool && (has_int || has_float)) {
        let labels: Vec<Option<String>> = cells.iter().map(Cell::as_text).collect();
        ColumnData::Categorical(Factor::from_optional(labels.iter().map(|l| l.as_deref())))
    } else if has_float {
        ColumnData::Numeric(
            cells
                .iter()
                .map(|c| match c {
                    Cell::Float(v) => Some(*v),
                    Cell::Integer(i) => Some(*i as f64),
                    _ => None,
                })
                .collect(),
        )
    } else if has_int {
        ColumnData::Integer(
            cells
                .iter()
                .map(|c| match c {
                    Cell::Integer(i) => Some(*i),
                    _ => None,
                })
                .collect(),
        )
    } else {
        ColumnData::Logical(
            cells
                .iter()
                .map(|c| match c {
                    Cell::Bool(b) => Some(*b),
                    _ => None,
                })
                .collect(),
        )
    };
    Column::new(name, data)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   { "x": 4.1, "y": 52.3, "soil": "clay", "yield": 1.5 },
///   ...
/// ]
/// ```
///
/// Columns appear in first-seen order; a key absent from a record is missing.
fn load_json(path: &Path) -> Result<Frame> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut names: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !names.contains(key) {
                names.push(key.clone());
            }
        }
    }

    let columns = names
        .into_iter()
        .map(|name| {
            let cells = records
                .iter()
                .map(|rec| rec.get(&name).map(json_to_cell).unwrap_or(Cell::Null))
                .collect();
            column_from_cells(name, cells)
        })
        .collect();

    Ok(Frame::new(columns)?)
}

fn json_to_cell(val: &JsonValue) -> Cell {
    match val {
        JsonValue::String(s) => Cell::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Cell::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Cell::Float(f)
            } else {
                Cell::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => Cell::Bool(*b),
        JsonValue::Null => Cell::Null,
        other => Cell::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one field per column.
/// Empty fields and `NA` are missing; `NaN` and `Inf` parse as floats.
fn load_csv(path: &Path) -> Result<Frame> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut cells: Vec<Vec<Cell>> = vec![Vec::new(); headers.len()];

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() != headers.len() {
            bail!(
                "CSV row {row_no}: expected {} fields, got {}",
                headers.len(),
                record.len()
            );
        }
        for (col_idx, value) in record.iter().enumerate() {
            cells[col_idx].push(guess_cell(value));
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, cells)| column_from_cells(name, cells))
        .collect();
    Ok(Frame::new(columns)?)
}

fn guess_cell(s: &str) -> Cell {
    let s = s.trim();
    if s.is_empty() || s == "NA" {
        return Cell::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Cell::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return Cell::Float(f);
    }
    match s {
        "true" | "TRUE" => Cell::Bool(true),
        "false" | "FALSE" => Cell::Bool(false),
        _ => Cell::Text(s.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file; all record batches are concatenated into one table.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`); categoricals keep their full level set.
fn load_parquet(path: &Path) -> Result<Frame> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let schema = builder.schema().clone();
    let reader = builder.build().context("building parquet reader")?;

    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .context("reading parquet record batch")?;
    let batch = concat_batches(&schema, &batches).context("concatenating record batches")?;

    Ok(frame_from_record_batch(&batch)?)
}

// ---------------------------------------------------------------------------
// Arrow conversion
// ---------------------------------------------------------------------------

/// Convert an Arrow record batch into a [`Frame`].
///
/// * floats and decimals → numeric, integers → integer, booleans → logical
/// * strings → factor over the observed values
/// * dictionaries → factor over the full dictionary (unused entries stay levels)
/// * anything else → text, formatted per value
pub fn frame_from_record_batch(batch: &RecordBatch) -> Result<Frame, TaskError> {
    let schema = batch.schema();
    let columns = schema
        .fields()
        .iter()
        .zip(batch.columns())
        .map(|(field, array)| {
            let data = column_from_array(array).map_err(|e| {
                TaskError::Schema(format!("converting column '{}': {e}", field.name()))
            })?;
            Ok(Column::new(field.name().clone(), data))
        })
        .collect::<Result<Vec<_>, TaskError>>()?;
    Frame::new(columns)
}

fn column_from_array(array: &ArrayRef) -> Result<ColumnData, String> {
    let dt = array.data_type();
    let data = match dt {
        DataType::Boolean => ColumnData::Logical(array.as_boolean().iter().collect()),
        DataType::Dictionary(_, _) => ColumnData::Categorical(dictionary_to_factor(array)?),
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
            let strings = cast(array, &DataType::Utf8).map_err(|e| e.to_string())?;
            ColumnData::Categorical(Factor::from_optional(strings.as_string::<i32>().iter()))
        }
        dt if dt.is_integer() => {
            let ints = cast(array, &DataType::Int64).map_err(|e| e.to_string())?;
            ColumnData::Integer(ints.as_primitive::<Int64Type>().iter().collect())
        }
        dt if dt.is_floating()
            || matches!(dt, DataType::Decimal128(_, _) | DataType::Decimal256(_, _)) =>
        {
            let floats = cast(array, &DataType::Float64).map_err(|e| e.to_string())?;
            ColumnData::Numeric(floats.as_primitive::<Float64Type>().iter().collect())
        }
        _ => {
            let formatter = ArrayFormatter::try_new(array.as_ref(), &FormatOptions::default())
                .map_err(|e| e.to_string())?;
            ColumnData::Text(
                (0..array.len())
                    .map(|i| (!array.is_null(i)).then(|| formatter.value(i).to_string()))
                    .collect(),
            )
        }
    };
    Ok(data)
}

fn dictionary_to_factor(array: &ArrayRef) -> Result<Factor, String> {
    let dict = array
        .as_any_dictionary_opt()
        .ok_or_else(|| "expected a dictionary array".to_string())?;
    let values = cast(dict.values(), &DataType::Utf8).map_err(|e| e.to_string())?;
    let values = values.as_string::<i32>();
    let levels = (0..values.len())
        .map(|i| values.value(i).to_string())
        .collect();
    let keys = dict.normalized_keys();
    let codes = (0..array.len())
        .map(|i| (!array.is_null(i)).then(|| keys[i] as u32))
        .collect();
    Factor::new(levels, codes).map_err(|e| e.to_string())
}
