use crate::error::MssqlAccessError;

/// An immutable, validated connection descriptor.
///
/// Validity is non-emptiness; the contents are an opaque ADO.NET-style
/// `key=value;` sequence consumed verbatim by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString(String);

impl ConnectionString {
    /// Wrap a raw descriptor, rejecting empty or whitespace-only input.
    ///
    /// # Errors
    ///
    /// Returns `MssqlAccessError::ConfigError` when the descriptor is
    /// empty.
    pub fn new(raw: impl Into<String>) -> Result<Self, MssqlAccessError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(MssqlAccessError::ConfigError(
                "connection string is empty".to_string(),
            ));
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_blank_input() {
        assert!(ConnectionString::new("").is_err());
        assert!(ConnectionString::new("   ").is_err());
    }

    #[test]
    fn keeps_raw_descriptor_verbatim() {
        let cs = ConnectionString::new("Server=.;Database=master;").unwrap();
        assert_eq!(cs.as_str(), "Server=.;Database=master;");
    }
}
