use std::{fmt, time::Duration};

use log::debug;
use tokio::sync::Mutex;

use crate::{
    a2s::{InfoResponse, PlayersInfoResponse},
    client::{RconClient, RequestIds},
    error::{Error, Result},
    options::ConnectOptions,
    query,
    transport::{QuerySocket, RconSocket},
};

/// A Source engine game server.
///
/// Every operation takes the same lock for its whole exchange, so calls
/// made concurrently on one `Server` run one after another instead of
/// mixing their packets on the wire.
///
/// ## Example
/// ```no_run
/// use sourcon::{options::ConnectOptions, server::Server};
/// use std::error::Error;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn Error>> {
///     let options = ConnectOptions::default().with_rcon_password("<put rcon password here>");
///     let server = Server::connect("dev.viora.sh:27016", options).await?;
///
///     println!("{}", server.info().await?.name);
///     assert_eq!(server.send("echo hi").await?, "hi\n");
///
///     server.close().await;
///     Ok(())
/// }
/// ```
pub struct Server {
    addr: String,
    inner: Mutex<Connection>,
}

struct Connection {
    query: QuerySocket,
    rcon: Option<RconClient>,
    ids: RequestIds,
}

impl Server {
    /// Opens the query socket and, if a password was given, logs in over
    /// rcon. Nothing stays open when this fails.
    pub async fn connect(addr: &str, options: ConnectOptions) -> Result<Self> {
        if addr.is_empty() {
            return Err(Error::MissingAddress);
        }
        let dialer = options.dialer();

        let query = QuerySocket::open(dialer.as_ref(), addr, options.io_timeout()).await?;
        debug!("opened query socket to {}", addr);

        let mut ids = RequestIds::starting_at(options.first_request_id());
        let rcon = match options.rcon_password() {
            Some(password) => {
                let socket = RconSocket::open(dialer.as_ref(), addr, options.io_timeout()).await?;
                debug!("opened rcon socket to {}, attempting auth", addr);
                Some(RconClient::authenticate(socket, password, &mut ids).await?)
            }
            None => None,
        };

        Ok(Server {
            addr: addr.to_owned(),
            inner: Mutex::new(Connection { query, rcon, ids }),
        })
    }

    /// Shorthand for [Server::connect] without rcon.
    pub async fn connect_default(addr: &str) -> Result<Self> {
        Self::connect(addr, ConnectOptions::default()).await
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Round-trip time of one query datagram.
    pub async fn ping(&self) -> Result<Duration> {
        let conn = self.inner.lock().await;
        query::ping(&conn.query).await
    }

    pub async fn info(&self) -> Result<InfoResponse> {
        let conn = self.inner.lock().await;
        query::info(&conn.query).await
    }

    pub async fn players_info(&self) -> Result<PlayersInfoResponse> {
        let conn = self.inner.lock().await;
        query::players(&conn.query).await
    }

    /// Runs a rcon command and returns its complete output.
    ///
    /// If the exchange fails for any reason, or the returned future is
    /// dropped before it completes, the rcon session is closed: frames of
    /// the unfinished command may still be in flight, so the stream cannot
    /// be reused. Later calls return [Error::RconNotInitialized] and
    /// [Server::is_rcon_enabled] reports `false`. The query socket is not
    /// affected.
    pub async fn send(&self, command: &str) -> Result<String> {
        let mut conn = self.inner.lock().await;
        // Owned by this future until the command completes, so a cancelled
        // call drops the session along with it.
        let mut rcon = conn.rcon.take().ok_or(Error::RconNotInitialized)?;
        match rcon.command(command, &mut conn.ids).await {
            Ok(output) => {
                conn.rcon = Some(rcon);
                Ok(output)
            }
            Err(e) => {
                debug!("rcon command failed, closing session to {}: {}", self.addr, e);
                rcon.close().await;
                Err(e)
            }
        }
    }

    pub async fn is_rcon_enabled(&self) -> bool {
        self.inner.lock().await.rcon.is_some()
    }

    /// Releases both sockets.
    pub async fn close(self) {
        let conn = self.inner.into_inner();
        if let Some(rcon) = conn.rcon {
            rcon.close().await;
        }
        drop(conn.query);
        debug!("closed connection to {}", self.addr);
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.addr)
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server").field("addr", &self.addr).finish()
    }
}
