//! Orchestration: acquire a verified connection, build and parameterize the
//! command, execute, and map results.

mod command;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use tokio_util::sync::CancellationToken;

use crate::cancel::cancellable;
use crate::connection::{ConnectionProvider, ConnectionString};
use crate::error::MssqlAccessError;
use crate::mapping::{self, BoundParam, FromRow, ToParams};
use crate::results::{DbRow, ResultSet, RowSchema};
use crate::types::FromSqlValue;

use command::{CommandKind, bind_params, prepare_command, read_value};

/// The operation surface of the data-access layer.
///
/// Every operation is independently awaitable, takes a cancellation
/// signal, acquires one verified connection scoped to the call, and
/// releases the connection and all command resources on every exit path.
/// Driver-reported execution failures propagate verbatim; field-level
/// mapping failures are recovered silently per field.
#[async_trait]
pub trait DbManager {
    /// Run command text and return the full tabular result, unmapped.
    async fn execute_raw(
        &self,
        cmd: &str,
        cancel: &CancellationToken,
    ) -> Result<ResultSet, MssqlAccessError>;

    async fn execute_raw_with_params<P>(
        &self,
        cmd: &str,
        parameters: &P,
        cancel: &CancellationToken,
    ) -> Result<ResultSet, MssqlAccessError>
    where
        P: ToParams + Sync;

    /// Run a command expected to return only an affected-row count.
    async fn execute_dml(
        &self,
        cmd: &str,
        cancel: &CancellationToken,
    ) -> Result<u64, MssqlAccessError>;

    async fn execute_dml_with_params<P>(
        &self,
        cmd: &str,
        parameters: &P,
        cancel: &CancellationToken,
    ) -> Result<u64, MssqlAccessError>
    where
        P: ToParams + Sync;

    /// Run a command and coerce its single scalar result.
    async fn execute_scalar<R>(
        &self,
        cmd: &str,
        cancel: &CancellationToken,
    ) -> Result<R, MssqlAccessError>
    where
        R: FromSqlValue + Send;

    async fn execute_scalar_with_params<R, P>(
        &self,
        cmd: &str,
        parameters: &P,
        cancel: &CancellationToken,
    ) -> Result<R, MssqlAccessError>
    where
        R: FromSqlValue + Send,
        P: ToParams + Sync;

    /// Run command text and materialize a single record. The read loop
    /// runs to completion and the last delivered row wins; zero rows yield
    /// the default-constructed record.
    async fn query_one<T>(
        &self,
        cmd: &str,
        cancel: &CancellationToken,
    ) -> Result<T, MssqlAccessError>
    where
        T: FromRow + Send;

    async fn query_one_with_params<T, P>(
        &self,
        cmd: &str,
        parameters: &P,
        cancel: &CancellationToken,
    ) -> Result<T, MssqlAccessError>
    where
        T: FromRow + Send,
        P: ToParams + Sync;

    /// Run command text and materialize one record per delivered row, in
    /// delivery order.
    async fn query_many<T>(
        &self,
        cmd: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>, MssqlAccessError>
    where
        T: FromRow + Send;

    async fn query_many_with_params<T, P>(
        &self,
        cmd: &str,
        parameters: &P,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>, MssqlAccessError>
    where
        T: FromRow + Send,
        P: ToParams + Sync;

    /// Call a stored procedure and materialize a single record,
    /// last-row-wins.
    async fn call_procedure_one<T>(
        &self,
        procedure: &str,
        cancel: &CancellationToken,
    ) -> Result<T, MssqlAccessError>
    where
        T: FromRow + Send;

    async fn call_procedure_one_with_params<T, P>(
        &self,
        procedure: &str,
        parameters: &P,
        cancel: &CancellationToken,
    ) -> Result<T, MssqlAccessError>
    where
        T: FromRow + Send,
        P: ToParams + Sync;

    /// Call a stored procedure and materialize one record per row.
    async fn call_procedure_many<T>(
        &self,
        procedure: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>, MssqlAccessError>
    where
        T: FromRow + Send;

    async fn call_procedure_many_with_params<T, P>(
        &self,
        procedure: &str,
        parameters: &P,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>, MssqlAccessError>
    where
        T: FromRow + Send,
        P: ToParams + Sync;

    /// Call a stored procedure and coerce its single scalar result.
    async fn call_procedure_scalar<R>(
        &self,
        procedure: &str,
        cancel: &CancellationToken,
    ) -> Result<R, MssqlAccessError>
    where
        R: FromSqlValue + Send;

    async fn call_procedure_scalar_with_params<R, P>(
        &self,
        procedure: &str,
        parameters: &P,
        cancel: &CancellationToken,
    ) -> Result<R, MssqlAccessError>
    where
        R: FromSqlValue + Send,
        P: ToParams + Sync;
}

/// Default [`DbManager`] implementation over a [`ConnectionProvider`].
#[derive(Debug)]
pub struct DatabaseManager {
    provider: ConnectionProvider,
}

impl DatabaseManager {
    #[must_use]
    pub fn new(provider: ConnectionProvider) -> Self {
        Self { provider }
    }

    #[must_use]
    pub fn from_connection_string(connection_string: ConnectionString) -> Self {
        Self::new(ConnectionProvider::with_connection_string(connection_string))
    }

    /// The provider this manager acquires connections from; use it to swap
    /// the connection descriptor at runtime.
    #[must_use]
    pub fn provider(&self) -> &ConnectionProvider {
        &self.provider
    }

    /// Acquire a verified connection, execute, and feed each delivered row
    /// to `on_row` in order. Returns the result schema, or `None` when the
    /// command produced no result set. The connection and the row stream
    /// unwind on every exit path, including cancellation mid-stream.
    async fn for_each_row<F>(
        &self,
        kind: CommandKind,
        cmd: &str,
        params: Vec<BoundParam>,
        cancel: &CancellationToken,
        mut on_row: F,
    ) -> Result<Option<RowSchema>, MssqlAccessError>
    where
        F: FnMut(DbRow) + Send,
    {
        let mut client = self.provider.connect_safe(cancel).await?;
        let (sql, bound) = prepare_command(kind, cmd, params);
        let mut query = tiberius::Query::new(sql);
        bind_params(&mut query, &bound);

        let mut stream = cancellable(cancel, "query dispatch", query.query(&mut client)).await?;
        let names: Option<Vec<String>> = {
            let columns = cancellable(cancel, "column fetch", stream.columns()).await?;
            columns.map(|cols| cols.iter().map(|c| c.name().to_string()).collect())
        };
        let Some(names) = names else {
            return Ok(None);
        };
        let schema = RowSchema::new(names);

        let mut rows = stream.into_row_stream();
        while let Some(row) = cancellable(cancel, "row fetch", rows.try_next()).await? {
            let mut values = Vec::with_capacity(schema.len());
            for idx in 0..schema.len() {
                values.push(read_value(&row, idx));
            }
            on_row(schema.row(values));
        }
        Ok(Some(schema))
    }

    async fn fetch_result_set(
        &self,
        kind: CommandKind,
        cmd: &str,
        params: Vec<BoundParam>,
        cancel: &CancellationToken,
    ) -> Result<ResultSet, MssqlAccessError> {
        let mut rows = Vec::new();
        let schema = self
            .for_each_row(kind, cmd, params, cancel, |row| rows.push(row))
            .await?;
        Ok(match schema {
            Some(schema) => ResultSet::from_rows(schema, rows),
            None => ResultSet::default(),
        })
    }

    async fn fetch_one<T>(
        &self,
        kind: CommandKind,
        cmd: &str,
        params: Vec<BoundParam>,
        cancel: &CancellationToken,
    ) -> Result<T, MssqlAccessError>
    where
        T: FromRow + Send,
    {
        let mut record = T::default();
        let mut recovered = 0usize;
        self.for_each_row(kind, cmd, params, cancel, |row| {
            recovered += mapping::apply_row(&mut record, &row).len();
        })
        .await?;
        if recovered > 0 {
            tracing::debug!(recovered, "field mapping fallback applied");
        }
        Ok(record)
    }

    async fn fetch_many<T>(
        &self,
        kind: CommandKind,
        cmd: &str,
        params: Vec<BoundParam>,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>, MssqlAccessError>
    where
        T: FromRow + Send,
    {
        let mut records = Vec::new();
        let mut recovered = 0usize;
        self.for_each_row(kind, cmd, params, cancel, |row| {
            let materialized = mapping::materialize_row::<T>(&row);
            recovered += materialized.field_errors.len();
            records.push(materialized.record);
        })
        .await?;
        if recovered > 0 {
            tracing::debug!(recovered, "field mapping fallback applied");
        }
        Ok(records)
    }

    async fn fetch_scalar<R>(
        &self,
        kind: CommandKind,
        cmd: &str,
        params: Vec<BoundParam>,
        cancel: &CancellationToken,
    ) -> Result<R, MssqlAccessError>
    where
        R: FromSqlValue,
    {
        let mut client = self.provider.connect_safe(cancel).await?;
        let (sql, bound) = prepare_command(kind, cmd, params);
        let mut query = tiberius::Query::new(sql);
        bind_params(&mut query, &bound);

        let stream = cancellable(cancel, "query dispatch", query.query(&mut client)).await?;
        let row = cancellable(cancel, "row fetch", stream.into_row())
            .await?
            .ok_or_else(|| {
                MssqlAccessError::ExecutionError("scalar query returned no rows".to_string())
            })?;
        let value = read_value(&row, 0);
        R::from_sql_value(&value).ok_or_else(|| {
            MssqlAccessError::ExecutionError(format!(
                "scalar {} value does not fit the requested type",
                value.kind()
            ))
        })
    }

    async fn run_dml(
        &self,
        cmd: &str,
        params: Vec<BoundParam>,
        cancel: &CancellationToken,
    ) -> Result<u64, MssqlAccessError> {
        let mut client = self.provider.connect_safe(cancel).await?;
        let (sql, bound) = prepare_command(CommandKind::Text, cmd, params);
        let mut query = tiberius::Query::new(sql);
        bind_params(&mut query, &bound);

        let result = cancellable(cancel, "execution", query.execute(&mut client)).await?;
        Ok(result.rows_affected().iter().sum())
    }
}

#[async_trait]
impl DbManager for DatabaseManager {
    async fn execute_raw(
        &self,
        cmd: &str,
        cancel: &CancellationToken,
    ) -> Result<ResultSet, MssqlAccessError> {
        self.fetch_result_set(CommandKind::Text, cmd, Vec::new(), cancel)
            .await
    }

    async fn execute_raw_with_params<P>(
        &self,
        cmd: &str,
        parameters: &P,
        cancel: &CancellationToken,
    ) -> Result<ResultSet, MssqlAccessError>
    where
        P: ToParams + Sync,
    {
        self.fetch_result_set(CommandKind::Text, cmd, parameters.to_params(), cancel)
            .await
    }

    async fn execute_dml(
        &self,
        cmd: &str,
        cancel: &CancellationToken,
    ) -> Result<u64, MssqlAccessError> {
        self.run_dml(cmd, Vec::new(), cancel).await
    }

    async fn execute_dml_with_params<P>(
        &self,
        cmd: &str,
        parameters: &P,
        cancel: &CancellationToken,
    ) -> Result<u64, MssqlAccessError>
    where
        P: ToParams + Sync,
    {
        self.run_dml(cmd, parameters.to_params(), cancel).await
    }

    async fn execute_scalar<R>(
        &self,
        cmd: &str,
        cancel: &CancellationToken,
    ) -> Result<R, MssqlAccessError>
    where
        R: FromSqlValue + Send,
    {
        self.fetch_scalar(CommandKind::Text, cmd, Vec::new(), cancel)
            .await
    }

    async fn execute_scalar_with_params<R, P>(
        &self,
        cmd: &str,
        parameters: &P,
        cancel: &CancellationToken,
    ) -> Result<R, MssqlAccessError>
    where
        R: FromSqlValue + Send,
        P: ToParams + Sync,
    {
        self.fetch_scalar(CommandKind::Text, cmd, parameters.to_params(), cancel)
            .await
    }

    async fn query_one<T>(
        &self,
        cmd: &str,
        cancel: &CancellationToken,
    ) -> Result<T, MssqlAccessError>
    where
        T: FromRow + Send,
    {
        self.fetch_one(CommandKind::Text, cmd, Vec::new(), cancel)
            .await
    }

    async fn query_one_with_params<T, P>(
        &self,
        cmd: &str,
        parameters: &P,
        cancel: &CancellationToken,
    ) -> Result<T, MssqlAccessError>
    where
        T: FromRow + Send,
        P: ToParams + Sync,
    {
        self.fetch_one(CommandKind::Text, cmd, parameters.to_params(), cancel)
            .await
    }

    async fn query_many<T>(
        &self,
        cmd: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>, MssqlAccessError>
    where
        T: FromRow + Send,
    {
        self.fetch_many(CommandKind::Text, cmd, Vec::new(), cancel)
            .await
    }

    async fn query_many_with_params<T, P>(
        &self,
        cmd: &str,
        parameters: &P,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>, MssqlAccessError>
    where
        T: FromRow + Send,
        P: ToParams + Sync,
    {
        self.fetch_many(CommandKind::Text, cmd, parameters.to_params(), cancel)
            .await
    }

    async fn call_procedure_one<T>(
        &self,
        procedure: &str,
        cancel: &CancellationToken,
    ) -> Result<T, MssqlAccessError>
    where
        T: FromRow + Send,
    {
        self.fetch_one(CommandKind::Procedure, procedure, Vec::new(), cancel)
            .await
    }

    async fn call_procedure_one_with_params<T, P>(
        &self,
        procedure: &str,
        parameters: &P,
        cancel: &CancellationToken,
    ) -> Result<T, MssqlAccessError>
    where
        T: FromRow + Send,
        P: ToParams + Sync,
    {
        self.fetch_one(
            CommandKind::Procedure,
            procedure,
            parameters.to_params(),
            cancel,
        )
        .await
    }

    async fn call_procedure_many<T>(
        &self,
        procedure: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>, MssqlAccessError>
    where
        T: FromRow + Send,
    {
        self.fetch_many(CommandKind::Procedure, procedure, Vec::new(), cancel)
            .await
    }

    async fn call_procedure_many_with_params<T, P>(
        &self,
        procedure: &str,
        parameters: &P,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>, MssqlAccessError>
    where
        T: FromRow + Send,
        P: ToParams + Sync,
    {
        self.fetch_many(
            CommandKind::Procedure,
            procedure,
            parameters.to_params(),
            cancel,
        )
        .await
    }

    async fn call_procedure_scalar<R>(
        &self,
        procedure: &str,
        cancel: &CancellationToken,
    ) -> Result<R, MssqlAccessError>
    where
        R: FromSqlValue + Send,
    {
        self.fetch_scalar(CommandKind::Procedure, procedure, Vec::new(), cancel)
            .await
    }

    async fn call_procedure_scalar_with_params<R, P>(
        &self,
        procedure: &str,
        parameters: &P,
        cancel: &CancellationToken,
    ) -> Result<R, MssqlAccessError>
    where
        R: FromSqlValue + Send,
        P: ToParams + Sync,
    {
        self.fetch_scalar(
            CommandKind::Procedure,
            procedure,
            parameters.to_params(),
            cancel,
        )
        .await
    }
}
