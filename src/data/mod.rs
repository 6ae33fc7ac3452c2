//! `DataFrame` module for named column containers.
//!
//! Provides the minimal row-oriented table the recommender consumes: each
//! column is either free text (raw identifiers, cultural attributes) or
//! numeric (coordinates, ratings). Loading from CSV or other sources is left
//! to the host.

use crate::error::{GeoRecError, Result};
use crate::primitives::Vector;

/// A single named column of a [`DataFrame`].
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Free-text values such as raw user or item identifiers.
    Text(Vec<String>),
    /// Numeric values such as coordinates or ratings.
    Numeric(Vector<f32>),
}

impl Column {
    /// Number of values in the column.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Column::Text(values) => values.len(),
            Column::Numeric(values) => values.len(),
        }
    }

    /// Returns true if the column holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A minimal `DataFrame` with named, typed columns.
///
/// # Examples
///
/// ```
/// use georec::data::{Column, DataFrame};
/// use georec::primitives::Vector;
///
/// let df = DataFrame::new(vec![
///     ("user".to_string(), Column::Text(vec!["u1".into(), "u2".into()])),
///     ("rating".to_string(), Column::Numeric(Vector::from_slice(&[4.0, 2.5]))),
/// ])
/// .expect("DataFrame creation should succeed with valid columns");
/// assert_eq!(df.shape(), (2, 2));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    columns: Vec<(String, Column)>,
    n_rows: usize,
}

impl DataFrame {
    /// Creates a new `DataFrame` from named columns.
    ///
    /// # Errors
    ///
    /// Returns an error if columns have different lengths, a name is empty or
    /// duplicated, or no column is given.
    pub fn new(columns: Vec<(String, Column)>) -> Result<Self> {
        if columns.is_empty() {
            return Err("DataFrame must have at least one column".into());
        }

        let n_rows = columns[0].1.len();

        for (name, col) in &columns {
            if col.len() != n_rows {
                return Err(GeoRecError::dimension_mismatch(
                    &format!("rows in column '{name}'"),
                    n_rows,
                    col.len(),
                ));
            }
            if name.is_empty() {
                return Err("Column names cannot be empty".into());
            }
        }

        let mut names: Vec<&str> = columns.iter().map(|(n, _)| n.as_str()).collect();
        names.sort_unstable();
        if names.windows(2).any(|w| w[0] == w[1]) {
            return Err("Duplicate column names not allowed".into());
        }

        Ok(Self { columns, n_rows })
    }

    /// Returns the shape as (`n_rows`, `n_cols`).
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.columns.len())
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Returns the column names in insertion order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Returns true if a column with this name exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    /// Returns a reference to a column by name.
    ///
    /// # Errors
    ///
    /// Returns [`GeoRecError::Schema`] if the column doesn't exist.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
            .ok_or_else(|| GeoRecError::missing_column(name))
    }

    /// Returns a text column by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the column is missing or numeric.
    pub fn text_column(&self, name: &str) -> Result<&[String]> {
        match self.column(name)? {
            Column::Text(values) => Ok(values),
            Column::Numeric(_) => Err(GeoRecError::ColumnType {
                column: name.to_string(),
                expected: "text".to_string(),
            }),
        }
    }

    /// Returns a numeric column by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the column is missing or textual.
    pub fn numeric_column(&self, name: &str) -> Result<&Vector<f32>> {
        match self.column(name)? {
            Column::Numeric(values) => Ok(values),
            Column::Text(_) => Err(GeoRecError::ColumnType {
                column: name.to_string(),
                expected: "numeric".to_string(),
            }),
        }
    }

    /// Adds a new column to the `DataFrame`.
    ///
    /// # Errors
    ///
    /// Returns an error if column length doesn't match or name already exists.
    pub fn add_column(&mut self, name: String, data: Column) -> Result<()> {
        if data.len() != self.n_rows {
            return Err(GeoRecError::dimension_mismatch(
                "column length",
                self.n_rows,
                data.len(),
            ));
        }

        if name.is_empty() {
            return Err("Column name cannot be empty".into());
        }

        if self.has_column(&name) {
            return Err("Column name already exists".into());
        }

        self.columns.push((name, data));
        Ok(())
    }
}

#[cfg(test)]
#[path = "data_tests.rs"]
mod tests;
