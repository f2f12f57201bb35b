//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and traits to make
//! it easier to get started with the library.

pub use crate::connection::{
    ConnectionProvider, ConnectionString, ConnectionStringBuilder, MssqlClient,
};
pub use crate::error::MssqlAccessError;
pub use crate::manager::{DatabaseManager, DbManager};
pub use crate::mapping::{
    BoundParam, ColumnBinding, FromRow, FromSqlValue, Materialized, MappingError, ToParams,
};
pub use crate::results::{DbRow, ResultSet, RowSchema};
pub use crate::types::SqlValue;

pub use crate::{impl_from_row, impl_to_params};

pub use tokio_util::sync::CancellationToken;
