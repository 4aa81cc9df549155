use crate::error::{DataError, DataResult};

use std::collections::HashSet;

/// One column of a [`Frame`]. `None` marks a missing value.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            Column::Numeric(v) => v[row].is_none(),
            Column::Categorical(v) => v[row].is_none(),
        }
    }

    pub fn missing_count(&self) -> usize {
        match self {
            Column::Numeric(v) => v.iter().filter(|x| x.is_none()).count(),
            Column::Categorical(v) => v.iter().filter(|x| x.is_none()).count(),
        }
    }

    /// Gather rows by index, preserving the order of `indices`.
    pub fn take(&self, indices: &[usize]) -> Column {
        match self {
            Column::Numeric(v) => Column::Numeric(indices.iter().map(|&i| v[i]).collect()),
            Column::Categorical(v) => {
                Column::Categorical(indices.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }

    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match self {
            Column::Numeric(v) => Some(v),
            Column::Categorical(_) => None,
        }
    }

    pub fn as_categorical(&self) -> Option<&[Option<String>]> {
        match self {
            Column::Categorical(v) => Some(v),
            Column::Numeric(_) => None,
        }
    }
}

/// A table of named, typed columns of equal length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    names: Vec<String>,
    columns: Vec<Column>,
}

impl Frame {
    /// Build a frame, checking that names are unique and columns equally long.
    pub fn new(names: Vec<String>, columns: Vec<Column>) -> DataResult<Self> {
        if names.len() != columns.len() {
            return Err(DataError::InvalidConfig(format!(
                "{} names given for {} columns",
                names.len(),
                columns.len()
            )));
        }
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(DataError::DuplicateColumn(name.clone()));
            }
        }
        if let Some(first) = columns.first() {
            let expected = first.len();
            for (name, column) in names.iter().zip(&columns) {
                if column.len() != expected {
                    return Err(DataError::LengthMismatch {
                        column: name.clone(),
                        expected,
                        got: column.len(),
                    });
                }
            }
        }
        Ok(Frame { names, columns })
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Iterate `(name, column)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(String::as_str).zip(self.columns.iter())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
    }

    /// Like [`Frame::column`] but absence is an error.
    pub fn require(&self, name: &str) -> DataResult<&Column> {
        self.column(name)
            .ok_or_else(|| DataError::ColumnNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// A copy without the named columns. Every name must exist.
    pub fn drop_columns<S: AsRef<str>>(&self, to_drop: &[S]) -> DataResult<Frame> {
        for name in to_drop {
            if !self.contains(name.as_ref()) {
                return Err(DataError::DropColumnNotFound(name.as_ref().to_string()));
            }
        }
        let (names, columns) = self
            .names
            .iter()
            .zip(&self.columns)
            .filter(|(n, _)| !to_drop.iter().any(|d| d.as_ref() == n.as_str()))
            .map(|(n, c)| (n.clone(), c.clone()))
            .unzip();
        Ok(Frame { names, columns })
    }

    /// Gather rows by index across every column.
    pub fn take_rows(&self, indices: &[usize]) -> Frame {
        Frame {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
        }
    }
}
