use mssql_access::impl_from_row;
use mssql_access::mapping::{
    Materialized, MappingError, materialize_each, materialize_last, materialize_row,
};
use mssql_access::results::{DbRow, RowSchema};
use mssql_access::types::SqlValue;

#[derive(Debug, Default, PartialEq)]
struct User {
    id: i64,
    email: String,
    name: String,
}

impl_from_row!(User {
    id,
    email => "email_address",
    name => "Name",
});

fn user_schema() -> RowSchema {
    RowSchema::new(vec![
        "id".to_string(),
        "email_address".to_string(),
        "Name".to_string(),
    ])
}

fn user_row(schema: &RowSchema, id: i64, email: &str, name: &str) -> DbRow {
    schema.row(vec![
        SqlValue::Int(id),
        SqlValue::Text(email.to_string()),
        SqlValue::Text(name.to_string()),
    ])
}

#[test]
fn override_reads_declared_column_fallback_reads_field_name() {
    let schema = user_schema();
    let m: Materialized<User> =
        materialize_row(&user_row(&schema, 1, "a@b.com", "A"));
    assert!(m.field_errors.is_empty());
    assert_eq!(
        m.record,
        User {
            id: 1,
            email: "a@b.com".to_string(),
            name: "A".to_string(),
        }
    );
}

#[test]
fn single_record_keeps_data_from_last_row() {
    let schema = user_schema();
    let rows = vec![
        user_row(&schema, 1, "first@b.com", "A"),
        user_row(&schema, 2, "last@b.com", "B"),
    ];
    let m: Materialized<User> = materialize_last(&rows);
    assert_eq!(m.record.name, "B");
    assert_eq!(m.record.id, 2);
}

#[test]
fn single_record_from_zero_rows_is_the_default_instance() {
    let rows: Vec<DbRow> = Vec::new();
    let m: Materialized<User> = materialize_last(&rows);
    assert_eq!(m.record, User::default());
}

#[test]
fn collection_has_one_record_per_row_in_delivery_order() {
    let schema = user_schema();
    let rows = vec![
        user_row(&schema, 1, "a@b.com", "A"),
        user_row(&schema, 2, "b@b.com", "B"),
        user_row(&schema, 3, "c@b.com", "C"),
    ];
    let all: Vec<Materialized<User>> = materialize_each(&rows);
    assert_eq!(all.len(), rows.len());
    let names: Vec<&str> = all.iter().map(|m| m.record.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
}

#[test]
fn one_failing_field_never_blocks_the_others() {
    let schema = user_schema();
    let row = schema.row(vec![
        SqlValue::Text("not an id".to_string()),
        SqlValue::Text("a@b.com".to_string()),
        SqlValue::Text("A".to_string()),
    ]);
    let m: Materialized<User> = materialize_row(&row);

    assert_eq!(m.record.id, 0);
    assert_eq!(m.record.email, "a@b.com");
    assert_eq!(m.record.name, "A");
    assert_eq!(m.field_errors.len(), 1);
    assert!(matches!(
        m.field_errors[0],
        MappingError::Incompatible { .. }
    ));
}

#[test]
fn schema_drift_leaves_missing_fields_at_defaults() {
    // Procedure output lost a column; the record still materializes.
    let drifted = RowSchema::new(vec!["id".to_string()]);
    let row = drifted.row(vec![SqlValue::Int(5)]);
    let m: Materialized<User> = materialize_row(&row);

    assert_eq!(m.record.id, 5);
    assert_eq!(m.record.email, String::default());
    assert!(
        m.field_errors
            .iter()
            .all(|e| matches!(e, MappingError::MissingColumn { .. }))
    );
}
