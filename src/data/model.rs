use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;

use crate::error::TaskError;

// ---------------------------------------------------------------------------
// ColumnKind – observed storage kind of a column
// ---------------------------------------------------------------------------

/// The kind of values a column stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Integer,
    Factor,
    Ordered,
    Logical,
    Text,
}

impl ColumnKind {
    /// Numeric and integer columns both count as numeric features.
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Numeric | ColumnKind::Integer)
    }

    pub fn is_categorical(self) -> bool {
        matches!(self, ColumnKind::Factor | ColumnKind::Ordered)
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Integer => "integer",
            ColumnKind::Factor => "factor",
            ColumnKind::Ordered => "ordered",
            ColumnKind::Logical => "logical",
            ColumnKind::Text => "character",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Factor – categorical values over a declared level universe
// ---------------------------------------------------------------------------

/// A categorical sequence: a declared set of levels plus one code per row.
///
/// `None` codes are missing values. A level that no row refers to is an
/// *empty* level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Factor {
    levels: Vec<String>,
    codes: Vec<Option<u32>>,
    ordered: bool,
}

impl Factor {
    /// Build a factor from raw codes and levels.
    ///
    /// Levels must be unique and every code must index into `levels`.
    pub fn new(levels: Vec<String>, codes: Vec<Option<u32>>) -> Result<Self, TaskError> {
        let mut seen = BTreeSet::new();
        for level in &levels {
            if !seen.insert(level.as_str()) {
                return Err(TaskError::Schema(format!("duplicate factor level '{level}'")));
            }
        }
        if let Some(bad) = codes.iter().flatten().find(|&&c| c as usize >= levels.len()) {
            return Err(TaskError::Schema(format!(
                "factor code {bad} out of range for {} levels",
                levels.len()
            )));
        }
        Ok(Factor {
            levels,
            codes,
            ordered: false,
        })
    }

    /// Build a factor from labels; levels are the sorted unique labels.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Self {
        Self::from_optional(labels.iter().map(|s| Some(s.as_ref())))
    }

    /// Build a factor from optional labels (`None` = missing).
    pub fn from_optional<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let labels: Vec<Option<&str>> = labels.into_iter().collect();
        let levels: Vec<String> = labels
            .iter()
            .flatten()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();
        let index: HashMap<&str, u32> = levels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.as_str(), i as u32))
            .collect();
        let codes = labels
            .iter()
            .map(|l| l.and_then(|l| index.get(l).copied()))
            .collect();
        Factor {
            levels,
            codes,
            ordered: false,
        }
    }

    /// Build a factor from labels over an explicitly declared level set.
    ///
    /// Declared levels that never occur stay in the level universe.
    pub fn with_levels<S: AsRef<str>, L: AsRef<str>>(
        labels: &[S],
        levels: &[L],
    ) -> Result<Self, TaskError> {
        let levels: Vec<String> = levels.iter().map(|l| l.as_ref().to_string()).collect();
        let index: HashMap<&str, u32> = levels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.as_str(), i as u32))
            .collect();
        let codes = labels
            .iter()
            .map(|label| {
                let label = label.as_ref();
                index.get(label).copied().map(Some).ok_or_else(|| {
                    TaskError::Schema(format!("value '{label}' is not a declared level"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Factor::new(levels, codes)
    }

    /// Mark the factor as ordered.
    pub fn into_ordered(mut self) -> Self {
        self.ordered = true;
        self
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn codes(&self) -> &[Option<u32>] {
        &self.codes
    }

    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Label of row `row`, `None` if missing.
    pub fn label(&self, row: usize) -> Option<&str> {
        self.codes
            .get(row)
            .copied()
            .flatten()
            .map(|c| self.levels[c as usize].as_str())
    }

    pub fn has_missing(&self) -> bool {
        self.codes.iter().any(Option::is_none)
    }

    /// Number of rows observed per level, in level order.
    pub fn level_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.levels.len()];
        for code in self.codes.iter().flatten() {
            counts[*code as usize] += 1;
        }
        counts
    }

    /// Levels with zero observed rows.
    pub fn empty_levels(&self) -> Vec<&str> {
        self.level_counts()
            .iter()
            .zip(&self.levels)
            .filter(|(count, _)| **count == 0)
            .map(|(_, level)| level.as_str())
            .collect()
    }

    pub fn has_empty_levels(&self) -> bool {
        self.level_counts().contains(&0)
    }

    /// Same rows, with unused levels removed from the level universe.
    ///
    /// Remaining levels keep their relative order.
    pub fn drop_unused_levels(&self) -> Factor {
        let counts = self.level_counts();
        let mut remap = vec![None; self.levels.len()];
        let mut levels = Vec::with_capacity(self.levels.len());
        for (old, level) in self.levels.iter().enumerate() {
            if counts[old] > 0 {
                remap[old] = Some(levels.len() as u32);
                levels.push(level.clone());
            }
        }
        let codes = self
            .codes
            .iter()
            .map(|c| c.and_then(|c| remap[c as usize]))
            .collect();
        Factor {
            levels,
            codes,
            ordered: self.ordered,
        }
    }
}

// ---------------------------------------------------------------------------
// Column – one named, homogeneous sequence of values
// ---------------------------------------------------------------------------

/// Storage of a single column.
///
/// Numeric `None` is a missing value; `Some(f64::NAN)` is a NaN.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Integer(Vec<Option<i64>>),
    Categorical(Factor),
    Logical(Vec<Option<bool>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Integer(v) => v.len(),
            ColumnData::Categorical(f) => f.len(),
            ColumnData::Logical(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnData::Numeric(_) => ColumnKind::Numeric,
            ColumnData::Integer(_) => ColumnKind::Integer,
            ColumnData::Categorical(f) if f.is_ordered() => ColumnKind::Ordered,
            ColumnData::Categorical(_) => ColumnKind::Factor,
            ColumnData::Logical(_) => ColumnKind::Logical,
            ColumnData::Text(_) => ColumnKind::Text,
        }
    }

    /// Whether any row is missing.
    pub fn has_missing(&self) -> bool {
        match self {
            ColumnData::Numeric(v) => v.iter().any(Option::is_none),
            ColumnData::Integer(v) => v.iter().any(Option::is_none),
            ColumnData::Categorical(f) => f.has_missing(),
            ColumnData::Logical(v) => v.iter().any(Option::is_none),
            ColumnData::Text(v) => v.iter().any(Option::is_none),
        }
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Column {
            name: name.into(),
            data,
        }
    }

    /// Numeric column without missing values.
    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new(
            name,
            ColumnData::Numeric(values.into_iter().map(Some).collect()),
        )
    }

    pub fn integer(name: impl Into<String>, values: Vec<i64>) -> Self {
        Self::new(
            name,
            ColumnData::Integer(values.into_iter().map(Some).collect()),
        )
    }

    pub fn categorical(name: impl Into<String>, factor: Factor) -> Self {
        Self::new(name, ColumnData::Categorical(factor))
    }

    pub fn logical(name: impl Into<String>, values: Vec<bool>) -> Self {
        Self::new(
            name,
            ColumnData::Logical(values.into_iter().map(Some).collect()),
        )
    }

    pub fn text<S: Into<String>>(name: impl Into<String>, values: Vec<S>) -> Self {
        Self::new(
            name,
            ColumnData::Text(values.into_iter().map(|s| Some(s.into())).collect()),
        )
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn kind(&self) -> ColumnKind {
        self.data.kind()
    }

    /// The factor, if this is a categorical column.
    pub fn as_factor(&self) -> Option<&Factor> {
        match &self.data {
            ColumnData::Categorical(f) => Some(f),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Frame – the canonical in-memory table
// ---------------------------------------------------------------------------

/// An ordered sequence of named columns with aligned rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Frame {
    /// Build a frame; all columns must have the same length.
    pub fn new(columns: Vec<Column>) -> Result<Self, TaskError> {
        let n_rows = columns.first().map(Column::len).unwrap_or(0);
        if let Some(col) = columns.iter().find(|c| c.len() != n_rows) {
            return Err(TaskError::Schema(format!(
                "inconsistent number of rows: column '{}' has {}, expected {n_rows}",
                col.name,
                col.len()
            )));
        }
        Ok(Frame { columns, n_rows })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// First column with the given name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Column names must be non-blank and unique.
    pub fn check_names(&self) -> Result<(), TaskError> {
        let mut seen = BTreeSet::new();
        for (idx, col) in self.columns.iter().enumerate() {
            let name = col.name.as_str();
            if name.trim().is_empty() {
                return Err(TaskError::Schema(format!("column {idx} has a blank name")));
            }
            if !seen.insert(name) {
                return Err(TaskError::Schema(format!("duplicate column name '{name}'")));
            }
        }
        Ok(())
    }

    /// Remove a column and return it.
    pub fn take_column(&mut self, name: &str) -> Option<Column> {
        let idx = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(idx))
    }

    pub(crate) fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }
}
