//! Column-wise type coercion applied before export.

use crate::{FeatureTable, Value};

/// Dominant type observed in a column, ignoring nulls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnShape {
    Empty,
    Integer,
    Numeric,
    Boolean,
    Timestamp,
    Mixed,
}

impl ColumnShape {
    fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Empty,
            Value::Int(_) => Self::Integer,
            Value::Float(_) => Self::Numeric,
            Value::Bool(_) => Self::Boolean,
            Value::Timestamp(_) => Self::Timestamp,
            Value::Text(_) | Value::Date(_) | Value::Json(_) => Self::Mixed,
        }
    }

    fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Empty, shape) | (shape, Self::Empty) => shape,
            (left, right) if left == right => left,
            (Self::Integer | Self::Numeric, Self::Integer | Self::Numeric) => Self::Numeric,
            _ => Self::Mixed,
        }
    }
}

/// Normalise every attribute column to a single storage type.
///
/// Uniformly integer, float, boolean or timestamp columns keep their values;
/// integer and float mixtures are widened to float. Every other column is
/// rendered as text. Nulls are preserved.
pub fn coerce_columns(table: &mut FeatureTable) {
    let shapes: Vec<ColumnShape> = (0..table.columns().len())
        .map(|index| {
            table
                .rows()
                .iter()
                .filter_map(|row| row.values.get(index))
                .map(ColumnShape::of)
                .fold(ColumnShape::Empty, ColumnShape::merge)
        })
        .collect();

    for row in table.rows_mut() {
        for (value, shape) in row.values.iter_mut().zip(&shapes) {
            let taken = std::mem::replace(value, Value::Null);
            *value = match shape {
                ColumnShape::Numeric => widen(taken),
                ColumnShape::Mixed => taken.into_text(),
                ColumnShape::Empty
                | ColumnShape::Integer
                | ColumnShape::Boolean
                | ColumnShape::Timestamp => taken,
            };
        }
    }
}

fn widen(value: Value) -> Value {
    match value.as_f64() {
        Some(number) => Value::Float(number),
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FeatureRow;
    use rstest::rstest;

    fn table(column: Vec<Value>) -> FeatureTable {
        let mut table = FeatureTable::new(vec!["value".into()]);
        for value in column {
            table.push(FeatureRow {
                values: vec![value],
                geometry: None,
            });
        }
        table
    }

    fn coerced(column: Vec<Value>) -> Vec<Value> {
        let mut table = table(column);
        coerce_columns(&mut table);
        table.column_values("value").cloned().collect()
    }

    #[rstest]
    fn uniform_integers_are_untouched() {
        let column = vec![Value::Int(1), Value::Null, Value::Int(3)];
        assert_eq!(coerced(column.clone()), column);
    }

    #[rstest]
    fn mixed_numbers_widen_to_float() {
        assert_eq!(
            coerced(vec![Value::Int(1), Value::Float(2.5)]),
            vec![Value::Float(1.0), Value::Float(2.5)]
        );
    }

    #[rstest]
    fn mixed_kinds_become_text_and_keep_nulls() {
        assert_eq!(
            coerced(vec![Value::Int(1), Value::from("two"), Value::Null]),
            vec![Value::from("1"), Value::from("two"), Value::Null]
        );
    }

    #[rstest]
    fn structured_values_become_text() {
        let column = vec![Value::Json(serde_json::json!([1, 2]))];
        assert_eq!(coerced(column), vec![Value::from("[1,2]")]);
    }

    #[rstest]
    fn all_null_columns_stay_null() {
        assert_eq!(coerced(vec![Value::Null, Value::Null]), vec![Value::Null, Value::Null]);
    }
}
