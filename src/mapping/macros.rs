//! Declarative registration of mapping tables.
//!
//! `impl_to_params!` registers a struct's fields as named query parameters;
//! `impl_from_row!` registers the column bindings the row materializer
//! consults. Both build their tables at compile time, so no introspection
//! happens per row.

/// Register a parameter record: every listed field becomes one named
/// parameter, in declaration order, named after the field.
///
/// Field types must convert into [`SqlValue`](crate::types::SqlValue) via
/// `From` and be `Clone`.
///
/// ```
/// use mssql_access::impl_to_params;
///
/// struct UserFilter {
///     user_id: i64,
///     name: String,
/// }
///
/// impl_to_params!(UserFilter { user_id, name });
/// ```
#[macro_export]
macro_rules! impl_to_params {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl $crate::mapping::ToParams for $ty {
            fn to_params(&self) -> Vec<$crate::mapping::BoundParam> {
                vec![
                    $(
                        $crate::mapping::BoundParam {
                            name: stringify!($field),
                            value: $crate::types::SqlValue::from(self.$field.clone()),
                        }
                    ),+
                ]
            }
        }
    };
}

/// Register a result record's column bindings, one per listed field, at
/// most one per field. `field => "column"` declares a column-name override;
/// a bare `field` resolves under its own name.
///
/// The type must implement `Default` (the construction path for fresh
/// records) and every listed field type must implement
/// [`FromSqlValue`](crate::mapping::FromSqlValue) and `Default`.
///
/// ```
/// use mssql_access::impl_from_row;
///
/// #[derive(Default)]
/// struct Account {
///     id: i64,
///     email: String,
/// }
///
/// impl_from_row!(Account {
///     id,
///     email => "email_address",
/// });
/// ```
#[macro_export]
macro_rules! impl_from_row {
    ($ty:ty { $($field:ident $(=> $column:literal)?),+ $(,)? }) => {
        impl $crate::mapping::FromRow for $ty {
            const BINDINGS: &'static [$crate::mapping::ColumnBinding<Self>] = &[
                $(
                    $crate::mapping::ColumnBinding {
                        field: stringify!($field),
                        column: $crate::__from_row_column!($($column)?),
                        set: |record, column, value| {
                            match $crate::mapping::FromSqlValue::from_sql_value(value) {
                                Some(converted) => {
                                    record.$field = converted;
                                    Ok(())
                                }
                                None => Err($crate::mapping::MappingError::Incompatible {
                                    column: column.to_string(),
                                    expected: std::any::type_name_of_val(&record.$field),
                                    found: value.kind(),
                                }),
                            }
                        },
                        reset: |record| record.$field = Default::default(),
                    }
                ),+
            ];
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __from_row_column {
    () => {
        None
    };
    ($column:literal) => {
        Some($column)
    };
}
