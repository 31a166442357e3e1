use std::fmt;

use indexmap::IndexMap;

/// Two-level column label: the field name and its subfield (tag value).
///
/// Untagged fields use an empty subfield.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ColumnKey {
    pub field: String,
    pub subfield: String,
}

impl ColumnKey {
    pub fn new(field: impl Into<String>, subfield: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            subfield: subfield.into(),
        }
    }

    pub fn untagged(field: impl Into<String>) -> Self {
        Self::new(field, "")
    }

    pub fn is_tagged(&self) -> bool {
        !self.subfield.is_empty()
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.subfield.is_empty() {
            f.write_str(&self.field)
        } else {
            write!(f, "{}[{}]", self.field, self.subfield)
        }
    }
}

/// Rectangular table of strings with a plain `0..n_rows` row index.
///
/// The row count is stored explicitly so that a table can hold rows before
/// any column exists. Every column always has exactly `n_rows` cells;
/// columns keep their insertion order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Table {
    n_rows: usize,
    columns: IndexMap<ColumnKey, Vec<String>>,
}

impl Table {
    /// An empty table indexed `0..n_rows`, without columns.
    pub fn with_rows(n_rows: usize) -> Self {
        Self {
            n_rows,
            columns: IndexMap::new(),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn keys(&self) -> impl Iterator<Item = &ColumnKey> {
        self.columns.keys()
    }

    pub fn columns(&self) -> impl Iterator<Item = (&ColumnKey, &[String])> {
        self.columns.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn column(&self, key: &ColumnKey) -> Option<&[String]> {
        self.columns.get(key).map(Vec::as_slice)
    }

    pub fn contains(&self, key: &ColumnKey) -> bool {
        self.columns.contains_key(key)
    }

    /// Subfields present for `field`, in column order.
    pub fn subfields(&self, field: &str) -> Vec<&str> {
        self.columns
            .keys()
            .filter(|k| k.field == field)
            .map(|k| k.subfield.as_str())
            .collect()
    }

    /// Insert a column, replacing (in place) any column with the same key.
    ///
    /// # Panics
    /// If `values` does not hold exactly one cell per row.
    pub fn insert_column(&mut self, key: ColumnKey, values: Vec<String>) {
        assert_eq!(
            values.len(),
            self.n_rows,
            "column {key} has {} cells for {} rows",
            values.len(),
            self.n_rows
        );
        self.columns.insert(key, values);
    }

    /// Left join on the row index: every column of `other` is appended.
    ///
    /// # Panics
    /// If the two tables do not have the same number of rows.
    pub fn join_columns(&mut self, other: Table) {
        assert_eq!(
            other.n_rows, self.n_rows,
            "joined table has {} rows, expected {}",
            other.n_rows, self.n_rows
        );
        self.columns.extend(other.columns);
    }

    pub fn cell(&self, row: usize, key: &ColumnKey) -> Option<&str> {
        self.columns
            .get(key)
            .and_then(|values| values.get(row))
            .map(String::as_str)
    }

    /// Cells of one row, in column order.
    pub fn row(&self, row: usize) -> Vec<&str> {
        self.columns.values().map(|v| v[row].as_str()).collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<&str>> + '_ {
        (0..self.n_rows).map(|row| self.row(row))
    }
}
