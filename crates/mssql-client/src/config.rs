//! Connection configuration.

use tds_protocol::packet::{DEFAULT_PACKET_SIZE, MAX_PACKET_SIZE, MIN_PACKET_SIZE};

use crate::error::Error;

/// Connection and login parameters.
///
/// ```rust
/// use mssql_client::Config;
///
/// let config = Config::new("db.example.com")
///     .with_port(1433)
///     .with_credentials("sa", "hunter2")
///     .with_database("master")
///     .with_app_name("inventory-sync");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Server hostname or IP address.
    pub host: String,
    /// TCP port, 1433 by default.
    pub port: u16,
    /// Database to open after login.
    pub database: String,
    /// SQL authentication user name.
    pub username: String,
    /// SQL authentication password.
    pub password: String,
    /// Application name reported to the server.
    pub app_name: String,
    /// Client machine name reported to the server.
    pub client_name: String,
    /// Requested TDS packet size.
    pub packet_size: u32,
    /// Capacity of the connection's message buffer.
    pub buffer_capacity: usize,
}

impl Config {
    /// Create a configuration for `host` with defaults for everything
    /// else.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 1433,
            database: String::new(),
            username: String::new(),
            password: String::new(),
            app_name: String::new(),
            client_name: String::new(),
            packet_size: DEFAULT_PACKET_SIZE as u32,
            buffer_capacity: MAX_PACKET_SIZE,
        }
    }

    /// Set the TCP port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set SQL authentication credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Set the database to open after login.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the application name reported to the server.
    #[must_use]
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    /// Set the client machine name reported to the server.
    #[must_use]
    pub fn with_client_name(mut self, client_name: impl Into<String>) -> Self {
        self.client_name = client_name.into();
        self
    }

    /// Set the requested TDS packet size.
    #[must_use]
    pub fn with_packet_size(mut self, packet_size: u32) -> Self {
        self.packet_size = packet_size;
        self
    }

    /// Set the message buffer capacity.
    ///
    /// The buffer must be able to hold at least one packet of the
    /// negotiated size for untruncated operation; the receive path can
    /// stream larger messages through a smaller buffer as long as the
    /// token layer keeps draining it.
    #[must_use]
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Validate the parameters.
    pub fn validate(&self) -> Result<(), Error> {
        if self.host.is_empty() {
            return Err(Error::ServerNameEmpty);
        }
        if self.packet_size < MIN_PACKET_SIZE as u32 || self.packet_size > MAX_PACKET_SIZE as u32 {
            return Err(Error::PacketSizeInvalid(self.packet_size));
        }
        Ok(())
    }
}
