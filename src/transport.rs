//! The two sockets a [Server](crate::server::Server) talks over, and the
//! [Dialer] seam that opens them.
//!
//! Every read and write gets its own short deadline. That deadline only
//! protects against a peer that stopped talking; it is not a protocol
//! timeout and nothing here retries.

use std::{
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr},
    time::Duration,
};

use async_trait::async_trait;
use log::trace;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::{lookup_host, TcpStream, UdpSocket},
    time,
};

use crate::{
    error::{Error, Network, ParseError, Result},
    wire::WireReader,
};

/// Default deadline for a single read or write.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_millis(400);
/// Default deadline for opening the tcp connection.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(1);
/// Receive buffer for one query datagram.
pub const MAX_DATAGRAM_SIZE: usize = 1500;

const READ_CHUNK: usize = 4096;

/// Anything that can carry the rcon byte stream.
pub trait RconStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> RconStream for T {}

/// A connected, message-oriented channel to one peer.
#[async_trait]
pub trait Datagram: Send + Sync {
    async fn send(&self, buf: &[u8]) -> io::Result<usize>;
    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;
}

#[async_trait]
impl Datagram for UdpSocket {
    async fn send(&self, buf: &[u8]) -> io::Result<usize> {
        UdpSocket::send(self, buf).await
    }

    async fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        UdpSocket::recv(self, buf).await
    }
}

/// Opens connections to a game server. Swap this out to run the protocol
/// over something other than plain tokio sockets, or to test without a
/// network.
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial_stream(&self, addr: &str) -> io::Result<Box<dyn RconStream>>;
    async fn dial_datagram(&self, addr: &str) -> io::Result<Box<dyn Datagram>>;
}

/// The default [Dialer]: tcp and udp sockets from tokio.
#[derive(Debug, Clone)]
pub struct TokioDialer {
    timeout: Duration,
}

impl TokioDialer {
    pub fn new(timeout: Duration) -> Self {
        TokioDialer { timeout }
    }
}

impl Default for TokioDialer {
    fn default() -> Self {
        TokioDialer::new(DEFAULT_DIAL_TIMEOUT)
    }
}

fn dial_timed_out() -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, "dial timed out")
}

#[async_trait]
impl Dialer for TokioDialer {
    async fn dial_stream(&self, addr: &str) -> io::Result<Box<dyn RconStream>> {
        let stream = time::timeout(self.timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| dial_timed_out())??;
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }

    async fn dial_datagram(&self, addr: &str) -> io::Result<Box<dyn Datagram>> {
        let target = time::timeout(self.timeout, lookup_host(addr))
            .await
            .map_err(|_| dial_timed_out())??
            .next()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "address did not resolve")
            })?;
        let local: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(target).await?;
        Ok(Box::new(socket))
    }
}

/// Connectionless query socket. Holds nothing between calls but the handle.
pub struct QuerySocket {
    conn: Box<dyn Datagram>,
    timeout: Duration,
}

impl QuerySocket {
    pub fn new(conn: Box<dyn Datagram>, timeout: Duration) -> Self {
        QuerySocket { conn, timeout }
    }

    pub async fn open(dialer: &dyn Dialer, addr: &str, timeout: Duration) -> Result<Self> {
        let conn = dialer
            .dial_datagram(addr)
            .await
            .map_err(|e| Error::UnreachableHost(Network::Udp, e))?;
        Ok(QuerySocket::new(conn, timeout))
    }

    pub async fn send(&self, datagram: &[u8]) -> Result<()> {
        trace!("udp send {:x?}", datagram);
        let sent = time::timeout(self.timeout, self.conn.send(datagram))
            .await?
            .map_err(Error::SendError)?;
        if sent != datagram.len() {
            return Err(Error::SendError(io::Error::new(
                io::ErrorKind::WriteZero,
                "datagram was truncated",
            )));
        }
        Ok(())
    }

    /// Waits for one datagram and returns exactly the bytes in it.
    pub async fn receive(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let len = time::timeout(self.timeout, self.conn.recv(&mut buf))
            .await?
            .map_err(Error::ReceiveError)?;
        buf.truncate(len);
        trace!("udp receive {:x?}", buf);
        Ok(buf)
    }
}

/// Length-framed rcon socket.
pub struct RconSocket {
    conn: Box<dyn RconStream>,
    timeout: Duration,
}

impl RconSocket {
    pub fn new(conn: Box<dyn RconStream>, timeout: Duration) -> Self {
        RconSocket { conn, timeout }
    }

    pub async fn open(dialer: &dyn Dialer, addr: &str, timeout: Duration) -> Result<Self> {
        let conn = dialer
            .dial_stream(addr)
            .await
            .map_err(|e| Error::UnreachableHost(Network::Tcp, e))?;
        Ok(RconSocket::new(conn, timeout))
    }

    /// Writes a whole frame. `frame` already carries its length prefix.
    pub async fn send(&mut self, frame: &[u8]) -> Result<()> {
        trace!("tcp send {:x?}", frame);
        time::timeout(self.timeout, self.conn.write_all(frame))
            .await?
            .map_err(Error::SendError)?;
        time::timeout(self.timeout, self.conn.flush())
            .await?
            .map_err(Error::SendError)
    }

    /// Reads one frame: the length prefix followed by exactly that many
    /// bytes. The prefix is returned too, so the frame can be decoded as a
    /// whole.
    pub async fn receive(&mut self) -> Result<Vec<u8>> {
        let mut frame = Vec::with_capacity(READ_CHUNK);
        self.read_into(&mut frame, 4).await?;
        let size = WireReader::new(&frame).read_long()?;
        let size = usize::try_from(size).map_err(|_| ParseError::BadData)?;
        self.read_into(&mut frame, size).await?;
        trace!("tcp receive {:x?}", frame);
        Ok(frame)
    }

    async fn read_into(&mut self, out: &mut Vec<u8>, mut wanted: usize) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        while wanted > 0 {
            let limit = wanted.min(READ_CHUNK);
            let read = time::timeout(self.timeout, self.conn.read(&mut chunk[..limit]))
                .await?
                .map_err(Error::ReceiveError)?;
            if read == 0 {
                return Err(ParseError::NotEnoughDataInResponse.into());
            }
            out.extend_from_slice(&chunk[..read]);
            wanted -= read;
        }
        Ok(())
    }

    pub async fn close(mut self) {
        if let Ok(Err(e)) = time::timeout(self.timeout, self.conn.shutdown()).await {
            trace!("tcp shutdown failed: {}", e);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::{mock::ScriptedDatagram, *};
    use tokio::io::duplex;

    const SHORT: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn rcon_receive_joins_partial_reads() {
        let (client, mut server) = duplex(64);
        let mut socket = RconSocket::new(Box::new(client), DEFAULT_IO_TIMEOUT);

        let writer = tokio::spawn(async move {
            let mut frame = 6i32.to_le_bytes().to_vec();
            frame.extend_from_slice(b"abcdef");
            for byte in frame {
                server.write_all(&[byte]).await.unwrap();
                tokio::task::yield_now().await;
            }
            server
        });

        let frame = socket.receive().await.unwrap();
        assert_eq!(&frame[..4], &6i32.to_le_bytes());
        assert_eq!(&frame[4..], b"abcdef");
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn rcon_receive_reports_short_stream() {
        let (client, mut server) = duplex(64);
        let mut socket = RconSocket::new(Box::new(client), DEFAULT_IO_TIMEOUT);

        server.write_all(&10i32.to_le_bytes()).await.unwrap();
        server.write_all(b"abc").await.unwrap();
        drop(server);

        let err = socket.receive().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Parse(ParseError::NotEnoughDataInResponse)
        ));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn rcon_receive_rejects_negative_size() {
        let (client, mut server) = duplex(64);
        let mut socket = RconSocket::new(Box::new(client), DEFAULT_IO_TIMEOUT);

        server.write_all(&(-4i32).to_le_bytes()).await.unwrap();

        let err = socket.receive().await.unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::BadData)));
    }

    #[tokio::test]
    async fn rcon_receive_times_out_on_silent_peer() {
        let (client, _server) = duplex(64);
        let mut socket = RconSocket::new(Box::new(client), SHORT);

        let err = socket.receive().await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn query_receive_times_out_on_silent_peer() {
        let socket = QuerySocket::new(Box::new(ScriptedDatagram::default()), SHORT);

        let started = std::time::Instant::now();
        let err = socket.receive().await.unwrap_err();
        assert!(err.is_timeout());
        assert!(started.elapsed() >= SHORT);
    }

    #[tokio::test]
    async fn query_socket_round_trip_over_loopback() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = peer.local_addr().unwrap().to_string();

        let socket = QuerySocket::open(&TokioDialer::default(), &addr, DEFAULT_IO_TIMEOUT)
            .await
            .unwrap();
        socket.send(b"ping").await.unwrap();

        let mut buf = [0u8; 16];
        let (len, from) = peer.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], b"ping");
        peer.send_to(b"pong!", from).await.unwrap();

        assert_eq!(socket.receive().await.unwrap(), b"pong!");
    }
}
