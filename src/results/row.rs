use std::collections::HashMap;
use std::sync::Arc;

use crate::types::SqlValue;

/// Column names of one result set, shared by every row in it.
///
/// The name-to-index map is built once per result set and shared via `Arc`,
/// so per-row column lookups never re-scan the name list.
#[derive(Debug, Clone)]
pub struct RowSchema {
    names: Arc<Vec<String>>,
    index: Arc<HashMap<String, usize>>,
}

impl RowSchema {
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        let index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect::<HashMap<_, _>>();
        Self {
            names: Arc::new(names),
            index: Arc::new(index),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Build a row carrying this schema. Values are positional and must
    /// line up with the column order.
    #[must_use]
    pub fn row(&self, values: Vec<SqlValue>) -> DbRow {
        DbRow {
            column_names: Arc::clone(&self.names),
            column_index: Arc::clone(&self.index),
            values,
        }
    }
}

/// A single row from a query result, addressable by column name or index.
#[derive(Debug, Clone)]
pub struct DbRow {
    column_names: Arc<Vec<String>>,
    column_index: Arc<HashMap<String, usize>>,
    values: Vec<SqlValue>,
}

impl DbRow {
    /// Get a value by column name, or `None` if the column is absent.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&SqlValue> {
        self.column_index
            .get(column_name)
            .and_then(|&idx| self.values.get(idx))
    }

    /// Get a value by column position.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    #[must_use]
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }
}
