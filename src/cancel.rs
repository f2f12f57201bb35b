//! Cancellation checkpoints shared by the connection provider and the
//! database manager.

use tokio_util::sync::CancellationToken;

use crate::error::MssqlAccessError;

/// Fail immediately, before any I/O, when the token already fired.
pub(crate) fn ensure_not_cancelled(
    cancel: &CancellationToken,
    phase: &str,
) -> Result<(), MssqlAccessError> {
    if cancel.is_cancelled() {
        Err(MssqlAccessError::Canceled(format!(
            "canceled before {phase}"
        )))
    } else {
        Ok(())
    }
}

/// Race a fallible future against the cancellation token. Cancellation wins
/// ties; the abandoned future's resources unwind via drop.
pub(crate) async fn cancellable<T, E, F>(
    cancel: &CancellationToken,
    phase: &str,
    fut: F,
) -> Result<T, MssqlAccessError>
where
    E: Into<MssqlAccessError>,
    F: Future<Output = Result<T, E>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(MssqlAccessError::Canceled(format!(
            "canceled during {phase}"
        ))),
        result = fut => result.map_err(Into::into),
    }
}
