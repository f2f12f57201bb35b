use serde_json::{Map as JsonMap, Value as JsonValue};

use super::row::{DbRow, RowSchema};
use crate::types::SqlValue;

/// The full tabular result of a query: every delivered row, in delivery
/// order, under one shared column schema.
///
/// A default-constructed set has no schema and no rows; that is what a
/// command returning no result set produces.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    schema: Option<RowSchema>,
    rows: Vec<DbRow>,
}

impl ResultSet {
    #[must_use]
    pub fn new(schema: RowSchema) -> Self {
        Self {
            schema: Some(schema),
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_capacity(schema: RowSchema, capacity: usize) -> Self {
        Self {
            schema: Some(schema),
            rows: Vec::with_capacity(capacity),
        }
    }

    /// Assemble a result set from rows already carrying the schema.
    #[must_use]
    pub fn from_rows(schema: RowSchema, rows: Vec<DbRow>) -> Self {
        Self {
            schema: Some(schema),
            rows,
        }
    }

    /// Append one row of positional values. Ignored when the set carries no
    /// schema (a schema-less set stays empty).
    pub fn add_row_values(&mut self, values: Vec<SqlValue>) {
        if let Some(schema) = &self.schema {
            self.rows.push(schema.row(values));
        }
    }

    #[must_use]
    pub fn rows(&self) -> &[DbRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn column_names(&self) -> Option<&[String]> {
        self.schema.as_ref().map(RowSchema::names)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DbRow> {
        self.rows.iter()
    }

    /// Render every row as a JSON object keyed by column name.
    #[must_use]
    pub fn to_json_rows(&self) -> Vec<JsonValue> {
        self.rows
            .iter()
            .map(|row| {
                let mut object = JsonMap::with_capacity(row.column_names().len());
                for (name, value) in row.column_names().iter().zip(row.values()) {
                    object.insert(name.clone(), value.to_json());
                }
                JsonValue::Object(object)
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a DbRow;
    type IntoIter = std::slice::Iter<'a, DbRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_rows_in_insertion_order() {
        let schema = RowSchema::new(vec!["n".to_string()]);
        let mut rs = ResultSet::new(schema);
        rs.add_row_values(vec![SqlValue::Int(1)]);
        rs.add_row_values(vec![SqlValue::Int(2)]);
        rs.add_row_values(vec![SqlValue::Int(3)]);

        let seen: Vec<i64> = rs
            .iter()
            .map(|row| *row.get("n").unwrap().as_int().unwrap())
            .collect();
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn schema_less_set_stays_empty() {
        let mut rs = ResultSet::default();
        rs.add_row_values(vec![SqlValue::Int(1)]);
        assert!(rs.is_empty());
        assert_eq!(rs.column_names(), None);
    }

    #[test]
    fn renders_json_rows() {
        let schema = RowSchema::new(vec!["id".to_string(), "name".to_string()]);
        let mut rs = ResultSet::new(schema);
        rs.add_row_values(vec![SqlValue::Int(1), SqlValue::Text("a".into())]);

        let rows = rs.to_json_rows();
        assert_eq!(rows, vec![serde_json::json!({"id": 1, "name": "a"})]);
    }
}
