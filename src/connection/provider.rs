use std::net::ToSocketAddrs;
use std::sync::RwLock;

use tiberius::Client;
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tokio_util::sync::CancellationToken;

use super::string::ConnectionString;
use crate::cancel::{cancellable, ensure_not_cancelled};
use crate::error::MssqlAccessError;

/// A live SQL Server connection.
pub type MssqlClient = Client<Compat<TcpStream>>;

/// Produces driver-level connections from one logical connection
/// descriptor.
///
/// The descriptor is read-mostly and replaced wholesale: concurrent readers
/// observe either the old or the new value, never a partial one. Every
/// acquisition opens a fresh connection scoped to the caller's operation;
/// there is no pooling, reuse, or retry here beyond what the driver itself
/// provides.
#[derive(Debug, Default)]
pub struct ConnectionProvider {
    descriptor: RwLock<Option<ConnectionString>>,
}

impl ConnectionProvider {
    /// An unconfigured provider. Acquisition fails with a configuration
    /// error until a descriptor is set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_connection_string(connection_string: ConnectionString) -> Self {
        Self {
            descriptor: RwLock::new(Some(connection_string)),
        }
    }

    /// Convenience constructor from a raw descriptor.
    ///
    /// # Errors
    ///
    /// Returns `MssqlAccessError::ConfigError` when the descriptor is
    /// empty.
    pub fn from_raw(raw: impl Into<String>) -> Result<Self, MssqlAccessError> {
        Ok(Self::with_connection_string(ConnectionString::new(raw)?))
    }

    /// Swap the descriptor atomically. Callers mid-acquisition keep the
    /// value they already read.
    ///
    /// # Errors
    ///
    /// Returns `MssqlAccessError::ConfigError` when the new descriptor is
    /// empty.
    pub fn update_connection_string(
        &self,
        raw: impl Into<String>,
    ) -> Result<(), MssqlAccessError> {
        let replacement = ConnectionString::new(raw)?;
        let mut slot = self
            .descriptor
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *slot = Some(replacement);
        Ok(())
    }

    /// The currently configured descriptor, if any.
    #[must_use]
    pub fn connection_string(&self) -> Option<ConnectionString> {
        self.descriptor
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn required_descriptor(&self) -> Result<ConnectionString, MssqlAccessError> {
        self.connection_string().ok_or_else(|| {
            MssqlAccessError::ConfigError("no connection string configured".to_string())
        })
    }

    /// Open a connection using the stored descriptor, without a probe.
    ///
    /// # Errors
    ///
    /// Configuration, connectivity, or cancellation errors; see
    /// [`MssqlAccessError`].
    pub async fn connect(
        &self,
        cancel: &CancellationToken,
    ) -> Result<MssqlClient, MssqlAccessError> {
        let descriptor = self.required_descriptor()?;
        self.connect_with(descriptor.as_str(), cancel).await
    }

    /// Open a connection using an explicit raw descriptor, without a
    /// probe.
    ///
    /// # Errors
    ///
    /// Configuration, connectivity, or cancellation errors; see
    /// [`MssqlAccessError`].
    pub async fn connect_with(
        &self,
        raw: &str,
        cancel: &CancellationToken,
    ) -> Result<MssqlClient, MssqlAccessError> {
        ensure_not_cancelled(cancel, "connection open")?;
        open_client(raw, cancel).await
    }

    /// Probe connectivity with the stored descriptor: open a throwaway
    /// connection and release it.
    ///
    /// # Errors
    ///
    /// Configuration, connectivity, or cancellation errors; see
    /// [`MssqlAccessError`].
    pub async fn verify(&self, cancel: &CancellationToken) -> Result<(), MssqlAccessError> {
        let descriptor = self.required_descriptor()?;
        self.verify_with(descriptor.as_str(), cancel).await
    }

    /// Probe connectivity with an explicit raw descriptor.
    ///
    /// # Errors
    ///
    /// Configuration, connectivity, or cancellation errors; see
    /// [`MssqlAccessError`].
    pub async fn verify_with(
        &self,
        raw: &str,
        cancel: &CancellationToken,
    ) -> Result<(), MssqlAccessError> {
        match self.connect_with(raw, cancel).await {
            Ok(client) => {
                drop(client);
                tracing::debug!("connectivity probe succeeded");
                Ok(())
            }
            Err(err) => {
                tracing::debug!(error = %err, "connectivity probe failed");
                Err(err)
            }
        }
    }

    /// Probe connectivity first, then hand back a fresh live connection.
    /// A failed probe is fatal; nothing is retried.
    ///
    /// # Errors
    ///
    /// Configuration, connectivity, or cancellation errors; see
    /// [`MssqlAccessError`].
    pub async fn connect_safe(
        &self,
        cancel: &CancellationToken,
    ) -> Result<MssqlClient, MssqlAccessError> {
        let descriptor = self.required_descriptor()?;
        self.connect_safe_with(descriptor.as_str(), cancel).await
    }

    /// Probe-then-connect with an explicit raw descriptor.
    ///
    /// # Errors
    ///
    /// Configuration, connectivity, or cancellation errors; see
    /// [`MssqlAccessError`].
    pub async fn connect_safe_with(
        &self,
        raw: &str,
        cancel: &CancellationToken,
    ) -> Result<MssqlClient, MssqlAccessError> {
        self.verify_with(raw, cancel).await?;
        self.connect_with(raw, cancel).await
    }
}

async fn open_client(
    raw: &str,
    cancel: &CancellationToken,
) -> Result<MssqlClient, MssqlAccessError> {
    let config = tiberius::Config::from_ado_string(raw).map_err(|e| {
        MssqlAccessError::ConfigError(format!("invalid connection string: {e}"))
    })?;

    let addr = config
        .get_addr()
        .to_socket_addrs()
        .map_err(|e| {
            MssqlAccessError::ConnectionError(format!("failed to resolve server address: {e}"))
        })?
        .next()
        .ok_or_else(|| {
            MssqlAccessError::ConnectionError(format!(
                "no valid address found for {}",
                config.get_addr()
            ))
        })?;

    let tcp = cancellable(cancel, "tcp connect", async {
        TcpStream::connect(addr)
            .await
            .map_err(|e| MssqlAccessError::ConnectionError(format!("TCP connection error: {e}")))
    })
    .await?;

    cancellable(cancel, "sql server login", async {
        Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| {
                MssqlAccessError::ConnectionError(format!("SQL Server connection error: {e}"))
            })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_provider_is_a_config_error() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let provider = ConnectionProvider::new();
            let err = provider
                .connect_safe(&CancellationToken::new())
                .await
                .unwrap_err();
            assert!(matches!(err, MssqlAccessError::ConfigError(_)));
        });
    }

    #[test]
    fn descriptor_swap_is_wholesale() {
        let provider = ConnectionProvider::from_raw("Server=a;").unwrap();
        provider.update_connection_string("Server=b;").unwrap();
        assert_eq!(
            provider.connection_string().unwrap().as_str(),
            "Server=b;"
        );
    }

    #[test]
    fn empty_replacement_is_rejected_and_keeps_old_value() {
        let provider = ConnectionProvider::from_raw("Server=a;").unwrap();
        assert!(provider.update_connection_string("").is_err());
        assert_eq!(
            provider.connection_string().unwrap().as_str(),
            "Server=a;"
        );
    }

    #[test]
    fn pre_cancelled_acquisition_issues_no_io() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            // The descriptor points nowhere; if any I/O were attempted the
            // error would be ConnectionError, not Canceled.
            let provider =
                ConnectionProvider::from_raw("Server=127.0.0.1,1;User Id=x;Password=y;").unwrap();
            let token = CancellationToken::new();
            token.cancel();
            let err = provider.connect_safe(&token).await.unwrap_err();
            assert!(matches!(err, MssqlAccessError::Canceled(_)));
        });
    }
}
