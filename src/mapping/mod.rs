//! The mapping core: binding parameter records to named query parameters,
//! and materializing typed records from result rows.
//!
//! Both directions work off explicit, statically registered mapping tables
//! (see [`impl_to_params!`](crate::impl_to_params) and
//! [`impl_from_row!`](crate::impl_from_row)) rather than runtime
//! introspection.

mod macros;
mod params;
mod row;

pub use crate::types::FromSqlValue;
pub use params::{BoundParam, ToParams, matching_command};
pub use row::{
    ColumnBinding, FromRow, Materialized, MappingError, apply_row, materialize_each,
    materialize_last, materialize_row,
};
