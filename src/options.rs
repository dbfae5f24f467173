use std::{fmt, sync::Arc, time::Duration};

use crate::transport::{Dialer, TokioDialer, DEFAULT_DIAL_TIMEOUT, DEFAULT_IO_TIMEOUT};

/// How [Server::connect](crate::server::Server::connect) should reach the
/// server.
///
/// ```
/// use sourcon::options::ConnectOptions;
/// use std::time::Duration;
///
/// let options = ConnectOptions::default()
///     .with_rcon_password("hunter2")
///     .with_io_timeout(Duration::from_secs(1));
/// assert!(options.rcon_password().is_some());
/// ```
#[derive(Clone)]
pub struct ConnectOptions {
    dialer: Option<Arc<dyn Dialer>>,
    rcon_password: Option<String>,
    io_timeout: Duration,
    dial_timeout: Duration,
    first_request_id: i32,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        ConnectOptions {
            dialer: None,
            rcon_password: None,
            io_timeout: DEFAULT_IO_TIMEOUT,
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            first_request_id: 1,
        }
    }
}

impl ConnectOptions {
    /// Replaces the default tokio sockets.
    pub fn with_dialer(mut self, dialer: Arc<dyn Dialer>) -> Self {
        self.dialer = Some(dialer);
        self
    }

    /// Enables rcon. An empty password leaves it disabled.
    pub fn with_rcon_password(mut self, password: impl Into<String>) -> Self {
        let password = password.into();
        self.rcon_password = (!password.is_empty()).then_some(password);
        self
    }

    /// Deadline for each individual read or write.
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Deadline for opening connections. Only used by the default dialer.
    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    /// First rcon packet id handed out on this connection.
    pub fn with_first_request_id(mut self, id: i32) -> Self {
        self.first_request_id = id;
        self
    }

    pub fn rcon_password(&self) -> Option<&str> {
        self.rcon_password.as_deref()
    }

    pub fn io_timeout(&self) -> Duration {
        self.io_timeout
    }

    pub fn first_request_id(&self) -> i32 {
        self.first_request_id
    }

    pub fn dialer(&self) -> Arc<dyn Dialer> {
        match &self.dialer {
            Some(dialer) => Arc::clone(dialer),
            None => Arc::new(TokioDialer::new(self.dial_timeout)),
        }
    }
}

impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("custom_dialer", &self.dialer.is_some())
            .field("rcon", &self.rcon_password.is_some())
            .field("io_timeout", &self.io_timeout)
            .field("dial_timeout", &self.dial_timeout)
            .field("first_request_id", &self.first_request_id)
            .finish()
    }
}
