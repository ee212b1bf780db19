//! In-memory tables passed between the readers, transformers and publisher.

use std::collections::BTreeMap;

use geo::Geometry;

use crate::Value;

/// A raw row keyed by source column name.
pub type Record = BTreeMap<String, Value>;

/// Flat result of reading one or more source tables.
///
/// `columns` keeps first-seen order across every appended table. Rows may
/// omit columns contributed by other tables; such cells read as null.
///
/// # Examples
///
/// ```
/// use parc_core::{Record, RecordTable, Value};
///
/// let mut signs = RecordTable::default();
/// let mut row = Record::new();
/// row.insert("assetid".into(), Value::Int(7));
/// signs.push(row);
///
/// let mut benches = RecordTable::default();
/// let mut row = Record::new();
/// row.insert("material".into(), "cedar".into());
/// benches.push(row);
///
/// signs.append(benches);
/// assert_eq!(signs.columns(), ["assetid", "material"]);
/// assert_eq!(signs.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordTable {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl RecordTable {
    /// Build a table with a declared column order.
    #[must_use]
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row, registering any previously unseen column.
    pub fn push(&mut self, row: Record) {
        for key in row.keys() {
            self.register(key);
        }
        self.rows.push(row);
    }

    /// Concatenate another table onto this one (union of columns).
    pub fn append(&mut self, other: Self) {
        for column in &other.columns {
            self.register(column);
        }
        self.rows.extend(other.rows);
    }

    fn register(&mut self, column: &str) {
        if !self.columns.iter().any(|known| known == column) {
            self.columns.push(column.to_owned());
        }
    }

    /// Ordered column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Report whether a column is present.
    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|known| known == column)
    }

    /// Borrow the rows.
    #[must_use]
    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// Consume the table, yielding its rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<Record> {
        self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Report whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A raw row carrying a geometry in WGS84 longitude/latitude.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpatialRecord {
    /// Non-geometry attributes keyed by source column name.
    pub attributes: Record,
    /// Decoded geometry, absent when the source cell was null.
    pub geometry: Option<Geometry<f64>>,
}

/// Result of a spatial read: attribute columns plus one geometry per row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpatialTable {
    /// Ordered attribute column names.
    pub columns: Vec<String>,
    /// Rows in source order.
    pub rows: Vec<SpatialRecord>,
}

impl SpatialTable {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Report whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One output row: display-ordered values and an optional geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRow {
    /// Values aligned with [`FeatureTable::columns`].
    pub values: Vec<Value>,
    /// Feature geometry.
    pub geometry: Option<Geometry<f64>>,
}

/// A geometry-bearing table ready for publishing.
///
/// Geometries are WGS84 longitude/latitude.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    columns: Vec<String>,
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    /// Create an empty table with the given attribute columns.
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row. Missing trailing values are padded with nulls.
    pub fn push(&mut self, mut row: FeatureRow) {
        row.values.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    /// Attribute column names, excluding the geometry column.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Column count including the geometry column.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len() + 1
    }

    /// Position of an attribute column.
    #[must_use]
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|known| known == column)
    }

    /// Borrow the rows.
    #[must_use]
    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    /// Mutable access to the rows.
    pub fn rows_mut(&mut self) -> &mut [FeatureRow] {
        &mut self.rows
    }

    /// Values of one column, top to bottom.
    pub fn column_values(&self, column: &str) -> impl Iterator<Item = &Value> + '_ {
        let index = self.column_index(column);
        self.rows
            .iter()
            .filter_map(move |row| index.and_then(|i| row.values.get(i)))
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Report whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
