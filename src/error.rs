use thiserror::Error;
use tokio::time::error::Elapsed;

/// Failures while decoding bytes received from the server.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The buffer ended before the value being read was complete.
    #[error("could not read data")]
    CouldNotReadData,
    /// A frame declared more bytes than the server actually sent.
    #[error("not enough data in response")]
    NotEnoughDataInResponse,
    /// The bytes were all there but made no sense (bad prefix, unknown tag,
    /// unparsable number).
    #[error("bad data in response")]
    BadData,
}

/// Possible errors for the package.
#[derive(Error, Debug)]
pub enum Error {
    /// Returned by `connect` when given an empty address.
    #[error("server needs an address")]
    MissingAddress,
    /// Returned if the host is down or behind a firewall.
    #[error("cannot open {0} connection to host")]
    UnreachableHost(Network, #[source] std::io::Error),
    /// The connection was established, but there was a problem writing to
    /// the socket.
    #[error("cannot send message to host")]
    SendError(#[source] std::io::Error),
    /// The connection was established, but there was a problem reading from
    /// the socket.
    #[error("cannot receive response from host")]
    ReceiveError(#[source] std::io::Error),
    /// Returned if the server did not respond in time.
    #[error("timeout")]
    TimeoutError(#[from] Elapsed),
    /// A response could not be decoded.
    #[error("malformed response: {0}")]
    Parse(#[from] ParseError),
    /// A rcon reply carried an id that belongs to no request in flight.
    #[error("invalid response id from server (expected {expected}, got {actual})")]
    InvalidResponseId { expected: i32, actual: i32 },
    /// A rcon reply had a packet type that is not allowed at this point.
    #[error("invalid response type from server: {0}")]
    InvalidResponseType(i32),
    /// The packet after the mirrored one was not the expected trailer.
    #[error("invalid response trailer from server")]
    InvalidResponseTrailer,
    /// Returned if you can't remember the password.
    #[error("bad password")]
    AuthenticationError,
    /// A command was sent over a connection without an authenticated rcon
    /// session.
    #[error("rcon is not initialized")]
    RconNotInitialized,
}

/// Which of the two sockets an error relates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Udp,
    Tcp,
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Udp => f.write_str("udp"),
            Network::Tcp => f.write_str("tcp"),
        }
    }
}

impl Error {
    /// True when the failure came from the connection itself. Reconnecting
    /// may help.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::UnreachableHost(..)
                | Error::SendError(_)
                | Error::ReceiveError(_)
                | Error::TimeoutError(_)
                | Error::Parse(ParseError::NotEnoughDataInResponse)
        )
    }

    /// True when the server answered, but not in a way this client
    /// understands, or when rcon was used without a session. Retrying on
    /// the same connection will not help.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Error::Parse(ParseError::CouldNotReadData | ParseError::BadData)
                | Error::InvalidResponseId { .. }
                | Error::InvalidResponseType(_)
                | Error::InvalidResponseTrailer
                | Error::AuthenticationError
                | Error::RconNotInitialized
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::TimeoutError(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
