use super::string::ConnectionString;
use crate::error::MssqlAccessError;

/// Fluent accumulator for ADO.NET connection-string options.
///
/// Each call appends one `Key=value;` pair; terminal operations emit the
/// accumulated descriptor as a raw string or a validated
/// [`ConnectionString`].
#[derive(Debug, Clone, Default)]
pub struct ConnectionStringBuilder {
    buffer: String,
}

impl ConnectionStringBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn append(mut self, key: &str, value: &str) -> Self {
        self.buffer.push_str(key);
        self.buffer.push('=');
        self.buffer.push_str(value);
        self.buffer.push(';');
        self
    }

    /// Server address to connect to. `.` is the conventional local default.
    #[must_use]
    pub fn server(self, server: &str) -> Self {
        self.append("Server", server)
    }

    /// Database name on the server.
    #[must_use]
    pub fn database(self, database: &str) -> Self {
        self.append("Database", database)
    }

    /// User id or username.
    #[must_use]
    pub fn user_id(self, user_id: &str) -> Self {
        self.append("User Id", user_id)
    }

    /// Password for the user.
    #[must_use]
    pub fn password(self, password: &str) -> Self {
        self.append("Password", password)
    }

    #[must_use]
    pub fn enable_encryption(self) -> Self {
        self.append("Encrypt", "true")
    }

    #[must_use]
    pub fn disable_encryption(self) -> Self {
        self.append("Encrypt", "false")
    }

    #[must_use]
    pub fn enable_trusted_connection(self) -> Self {
        self.append("Trusted_Connection", "true")
    }

    /// Multiple active result sets on one connection.
    #[must_use]
    pub fn enable_mars(self) -> Self {
        self.append("MultipleActiveResultSets", "true")
    }

    #[must_use]
    pub fn network_library(self, network_library: &str) -> Self {
        self.append("Network Library", network_library)
    }

    /// Path of an .mdf file to attach.
    #[must_use]
    pub fn attach_db_filename(self, path: &str) -> Self {
        self.append("AttachDbFilename", path)
    }

    #[must_use]
    pub fn enable_integrated_security(self) -> Self {
        self.append("Integrated Security", "true")
    }

    #[must_use]
    pub fn enable_asynchronous_processing(self) -> Self {
        self.append("Asynchronous Processing", "true")
    }

    #[must_use]
    pub fn enable_user_instance(self) -> Self {
        self.append("User Instance", "true")
    }

    /// Maximum query packet size, in bytes.
    #[must_use]
    pub fn max_packet_size(self, size: u32) -> Self {
        self.append("Packet Size", &size.to_string())
    }

    /// Emit the accumulated descriptor as a raw string.
    #[must_use]
    pub fn build_as_string(self) -> String {
        self.buffer
    }

    /// Emit the accumulated descriptor as a validated [`ConnectionString`].
    ///
    /// # Errors
    ///
    /// Returns `MssqlAccessError::ConfigError` when no option was set.
    pub fn build(self) -> Result<ConnectionString, MssqlAccessError> {
        ConnectionString::new(self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_options_in_call_order() {
        let raw = ConnectionStringBuilder::new()
            .server("10.0.0.5")
            .database("orders")
            .user_id("app")
            .password("hunter2")
            .disable_encryption()
            .build_as_string();
        assert_eq!(
            raw,
            "Server=10.0.0.5;Database=orders;User Id=app;Password=hunter2;Encrypt=false;"
        );
    }

    #[test]
    fn flag_options_render_fixed_pairs() {
        let raw = ConnectionStringBuilder::new()
            .server(".")
            .enable_trusted_connection()
            .enable_mars()
            .enable_integrated_security()
            .build_as_string();
        assert_eq!(
            raw,
            "Server=.;Trusted_Connection=true;MultipleActiveResultSets=true;Integrated Security=true;"
        );
    }

    #[test]
    fn empty_builder_fails_validation() {
        assert!(ConnectionStringBuilder::new().build().is_err());
    }

    #[test]
    fn build_emits_validated_descriptor() {
        let cs = ConnectionStringBuilder::new()
            .server(".")
            .max_packet_size(4096)
            .build()
            .unwrap();
        assert_eq!(cs.as_str(), "Server=.;Packet Size=4096;");
    }
}
