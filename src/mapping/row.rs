use thiserror::Error;

use crate::results::DbRow;
use crate::types::SqlValue;

/// A field-level mapping failure. Recovered locally by resetting the field
/// to its default; never aborts a row or a result set and never converts
/// into [`MssqlAccessError`](crate::MssqlAccessError).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("column '{column}' is not present in the result row")]
    MissingColumn { column: String },

    #[error("column '{column}': {found} value does not fit field type {expected}")]
    Incompatible {
        column: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Association between one field of a record type and a result column.
///
/// `column` is the declared override; when absent the field name doubles as
/// the column name. `set` converts and assigns one value. `reset` restores
/// the field's default; the materializer calls it whenever `set` fails or
/// the column is missing.
pub struct ColumnBinding<T> {
    pub field: &'static str,
    pub column: Option<&'static str>,
    pub set: fn(&mut T, &str, &SqlValue) -> Result<(), MappingError>,
    pub reset: fn(&mut T),
}

impl<T> ColumnBinding<T> {
    /// The column this binding resolves to: the override when declared,
    /// the field name otherwise.
    #[must_use]
    pub fn column_name(&self) -> &'static str {
        self.column.unwrap_or(self.field)
    }
}

/// A record type materializable from result rows.
///
/// `Default` is the construction path for fresh instances; `BINDINGS` is
/// the statically registered mapping table, one entry per mapped field.
/// Register with [`impl_from_row!`](crate::impl_from_row).
pub trait FromRow: Default + 'static {
    const BINDINGS: &'static [ColumnBinding<Self>];
}

/// A materialized record together with the field-level failures that were
/// recovered while producing it. The failures are informational: the record
/// is valid and the affected fields hold their defaults.
#[derive(Debug)]
pub struct Materialized<T> {
    pub record: T,
    pub field_errors: Vec<MappingError>,
}

/// Apply one row onto an existing record, field by field.
///
/// Every binding resolves its column, reads the value, converts, and
/// assigns. Any per-field failure resets that field to its default and
/// processing continues with the next field. Returns the recovered
/// failures.
pub fn apply_row<T: FromRow>(record: &mut T, row: &DbRow) -> Vec<MappingError> {
    let mut failures = Vec::new();
    for binding in T::BINDINGS {
        let column = binding.column_name();
        match row.get(column) {
            Some(value) => {
                if let Err(err) = (binding.set)(record, column, value) {
                    (binding.reset)(record);
                    failures.push(err);
                }
            }
            None => {
                (binding.reset)(record);
                failures.push(MappingError::MissingColumn {
                    column: column.to_string(),
                });
            }
        }
    }
    failures
}

/// Materialize one fresh record from one row.
#[must_use]
pub fn materialize_row<T: FromRow>(row: &DbRow) -> Materialized<T> {
    let mut record = T::default();
    let field_errors = apply_row(&mut record, row);
    Materialized {
        record,
        field_errors,
    }
}

/// Materialize a single record from a sequence of rows with last-row-wins
/// semantics: one instance is constructed up front and every row is applied
/// onto it in order, so later rows overwrite earlier ones and a field that
/// fails on a later row is reset even if an earlier row had populated it.
/// Zero rows yield the default-constructed record.
pub fn materialize_last<'a, T, I>(rows: I) -> Materialized<T>
where
    T: FromRow,
    I: IntoIterator<Item = &'a DbRow>,
{
    let mut record = T::default();
    let mut field_errors = Vec::new();
    for row in rows {
        field_errors.extend(apply_row(&mut record, row));
    }
    Materialized {
        record,
        field_errors,
    }
}

/// Materialize one record per row, in row order.
pub fn materialize_each<'a, T, I>(rows: I) -> Vec<Materialized<T>>
where
    T: FromRow,
    I: IntoIterator<Item = &'a DbRow>,
{
    rows.into_iter().map(materialize_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impl_from_row;
    use crate::results::RowSchema;

    #[derive(Debug, Default, PartialEq)]
    struct Account {
        id: i64,
        email: String,
        active: Option<bool>,
    }

    impl_from_row!(Account {
        id,
        email => "email_address",
        active,
    });

    fn schema() -> RowSchema {
        RowSchema::new(vec![
            "id".to_string(),
            "email_address".to_string(),
            "active".to_string(),
        ])
    }

    #[test]
    fn override_resolves_declared_column() {
        let row = schema().row(vec![
            SqlValue::Int(1),
            SqlValue::Text("a@b.com".into()),
            SqlValue::Bool(true),
        ]);
        let m: Materialized<Account> = materialize_row(&row);
        assert!(m.field_errors.is_empty());
        assert_eq!(
            m.record,
            Account {
                id: 1,
                email: "a@b.com".to_string(),
                active: Some(true),
            }
        );
    }

    #[test]
    fn missing_column_resets_field_and_continues() {
        let partial = RowSchema::new(vec!["id".to_string()]);
        let row = partial.row(vec![SqlValue::Int(9)]);
        let m: Materialized<Account> = materialize_row(&row);

        assert_eq!(m.record.id, 9);
        assert_eq!(m.record.email, String::default());
        assert_eq!(m.record.active, None);
        assert_eq!(m.field_errors.len(), 2);
    }

    #[test]
    fn incompatible_value_resets_field_and_continues() {
        let row = schema().row(vec![
            SqlValue::Text("not an int".into()),
            SqlValue::Text("a@b.com".into()),
            SqlValue::Bool(false),
        ]);
        let m: Materialized<Account> = materialize_row(&row);

        assert_eq!(m.record.id, 0);
        assert_eq!(m.record.email, "a@b.com");
        assert_eq!(m.record.active, Some(false));
        assert_eq!(
            m.field_errors,
            vec![MappingError::Incompatible {
                column: "id".to_string(),
                expected: std::any::type_name::<i64>(),
                found: "text",
            }]
        );
    }

    #[test]
    fn null_into_non_nullable_resets_but_null_into_option_maps() {
        let row = schema().row(vec![
            SqlValue::Null,
            SqlValue::Text("a@b.com".into()),
            SqlValue::Null,
        ]);
        let m: Materialized<Account> = materialize_row(&row);

        assert_eq!(m.record.id, 0);
        assert_eq!(m.record.active, None);
        assert_eq!(m.field_errors.len(), 1);
    }

    #[test]
    fn last_row_wins_over_earlier_rows() {
        let s = schema();
        let rows = vec![
            s.row(vec![
                SqlValue::Int(1),
                SqlValue::Text("first@b.com".into()),
                SqlValue::Bool(true),
            ]),
            s.row(vec![
                SqlValue::Int(2),
                SqlValue::Text("last@b.com".into()),
                SqlValue::Bool(false),
            ]),
        ];
        let m: Materialized<Account> = materialize_last(&rows);
        assert_eq!(m.record.id, 2);
        assert_eq!(m.record.email, "last@b.com");
    }

    #[test]
    fn later_row_failure_resets_field_populated_by_earlier_row() {
        let s = schema();
        let rows = vec![
            s.row(vec![
                SqlValue::Int(1),
                SqlValue::Text("kept@b.com".into()),
                SqlValue::Bool(true),
            ]),
            s.row(vec![
                SqlValue::Int(2),
                SqlValue::Null,
                SqlValue::Bool(true),
            ]),
        ];
        let m: Materialized<Account> = materialize_last(&rows);
        assert_eq!(m.record.id, 2);
        // The second row's null reset the email even though the first row
        // had populated it.
        assert_eq!(m.record.email, String::default());
    }

    #[test]
    fn zero_rows_yield_default_record() {
        let rows: Vec<DbRow> = Vec::new();
        let m: Materialized<Account> = materialize_last(&rows);
        assert_eq!(m.record, Account::default());
        assert!(m.field_errors.is_empty());
    }

    #[test]
    fn each_row_materializes_in_delivery_order() {
        let s = schema();
        let rows = vec![
            s.row(vec![
                SqlValue::Int(1),
                SqlValue::Text("a@b.com".into()),
                SqlValue::Null,
            ]),
            s.row(vec![
                SqlValue::Int(2),
                SqlValue::Text("b@b.com".into()),
                SqlValue::Null,
            ]),
        ];
        let all: Vec<Materialized<Account>> = materialize_each(&rows);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].record.id, 1);
        assert_eq!(all[1].record.id, 2);
    }
}
