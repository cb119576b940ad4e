//! Feature column validation.
//!
//! A pure scan over a [`Frame`]: every checked column must be numeric
//! without infinite or NaN entries, or categorical without empty levels.

use super::model::{Column, ColumnData, Frame};
use crate::error::ValidationError;

/// Validate the named columns (all columns when `columns` is `None`).
///
/// Stops at the first violation, scanning columns in the given order.
pub fn validate(frame: &Frame, columns: Option<&[&str]>) -> Result<(), ValidationError> {
    match columns {
        None => frame.columns().iter().try_for_each(check_column),
        Some(names) => names
            .iter()
            .try_for_each(|name| check_column(lookup(frame, name)?)),
    }
}

/// Like [`validate`], but reports every violating column.
pub fn validate_all(frame: &Frame, columns: Option<&[&str]>) -> Vec<ValidationError> {
    let checked: Vec<Result<&Column, ValidationError>> = match columns {
        None => frame.columns().iter().map(Ok).collect(),
        Some(names) => names.iter().map(|name| lookup(frame, name)).collect(),
    };
    checked
        .into_iter()
        .filter_map(|col| col.and_then(check_column).err())
        .collect()
}

fn lookup<'a>(frame: &'a Frame, name: &str) -> Result<&'a Column, ValidationError> {
    frame
        .column(name)
        .ok_or_else(|| ValidationError::UnknownColumn {
            column: name.to_string(),
        })
}

fn check_column(col: &Column) -> Result<(), ValidationError> {
    match &col.data {
        ColumnData::Numeric(values) => {
            if values.iter().flatten().any(|v| v.is_infinite()) {
                return Err(ValidationError::InfiniteValue {
                    column: col.name.clone(),
                });
            }
            if values.iter().flatten().any(|v| v.is_nan()) {
                return Err(ValidationError::NaNValue {
                    column: col.name.clone(),
                });
            }
            Ok(())
        }
        // Integers cannot hold non-finite values.
        ColumnData::Integer(_) => Ok(()),
        ColumnData::Categorical(factor) => {
            let empty = factor.empty_levels();
            if empty.is_empty() {
                Ok(())
            } else {
                Err(ValidationError::EmptyLevel {
                    column: col.name.clone(),
                    levels: empty.into_iter().map(str::to_string).collect(),
                })
            }
        }
        ColumnData::Logical(_) | ColumnData::Text(_) => Err(ValidationError::UnsupportedType {
            column: col.name.clone(),
            kind: col.kind(),
        }),
    }
}
