use thiserror::Error;

/// Errors surfaced by connection acquisition and command execution.
///
/// Field-level mapping failures are deliberately absent here: they are
/// recovered per field and reported through
/// [`MappingError`](crate::mapping::MappingError) instead.
#[derive(Debug, Error)]
pub enum MssqlAccessError {
    #[error(transparent)]
    Tiberius(#[from] tiberius::error::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Operation canceled: {0}")]
    Canceled(String),
}
