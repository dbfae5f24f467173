//! A scripted game server on the loopback interface.

#![allow(dead_code)]

use std::net::SocketAddr;

use sourcon::packet::{Packet, PacketType};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream, UdpSocket},
};

pub const TRAILER: [u8; 4] = [0x00, 0x01, 0x00, 0x00];

pub struct FakeServer {
    pub addr: String,
    udp: UdpSocket,
    tcp: Option<TcpListener>,
}

impl FakeServer {
    /// Listens for queries and rcon connections on the same port.
    pub async fn start() -> Self {
        let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = tcp.local_addr().unwrap();
        let udp = UdpSocket::bind(addr).await.unwrap();
        FakeServer {
            addr: addr.to_string(),
            udp,
            tcp: Some(tcp),
        }
    }

    /// Only answers queries; rcon connections are refused.
    pub async fn start_without_rcon() -> Self {
        let udp = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        FakeServer {
            addr: udp.local_addr().unwrap().to_string(),
            udp,
            tcp: None,
        }
    }

    pub async fn recv_query(&self) -> (Vec<u8>, SocketAddr) {
        let mut buf = vec![0u8; 1500];
        let (len, from) = self.udp.recv_from(&mut buf).await.unwrap();
        buf.truncate(len);
        (buf, from)
    }

    pub async fn answer(&self, to: SocketAddr, data: &[u8]) {
        self.udp.send_to(data, to).await.unwrap();
    }

    pub async fn accept(&self) -> TcpStream {
        let listener = self.tcp.as_ref().expect("rcon is disabled");
        listener.accept().await.unwrap().0
    }
}

/// A request as the server sees it: id, raw type number, body.
pub async fn read_request(stream: &mut TcpStream) -> (i32, i32, Vec<u8>) {
    let size = stream.read_i32_le().await.unwrap();
    let id = stream.read_i32_le().await.unwrap();
    let kind = stream.read_i32_le().await.unwrap();
    let mut rest = vec![0u8; size as usize - 8];
    stream.read_exact(&mut rest).await.unwrap();
    rest.truncate(rest.len() - 2);
    (id, kind, rest)
}

pub async fn reply(stream: &mut TcpStream, id: i32, kind: PacketType, body: &[u8]) {
    stream
        .write_all(&Packet::new(id, kind, body).pack())
        .await
        .unwrap();
}

/// Plays the server side of a login. Returns the auth packet id.
pub async fn accept_login(stream: &mut TcpStream, password: &str) -> i32 {
    let (id, kind, body) = read_request(stream).await;
    assert_eq!(kind, 3);
    reply(stream, id, PacketType::Response, b"").await;
    let verdict = if body == password.as_bytes() { id } else { -1 };
    reply(stream, verdict, PacketType::AuthResponse, b"").await;
    id
}

/// Plays the server side of one command, sending each piece of `output`
/// as its own packet. Returns the command text.
pub async fn answer_command(stream: &mut TcpStream, output: &[&str]) -> String {
    let (command_id, kind, command) = read_request(stream).await;
    assert_eq!(kind, 2);
    let (mirror_id, kind, body) = read_request(stream).await;
    assert_eq!(kind, 0);
    assert!(body.is_empty());

    for chunk in output {
        reply(stream, command_id, PacketType::Response, chunk.as_bytes()).await;
    }
    reply(stream, mirror_id, PacketType::Response, b"").await;
    reply(stream, mirror_id, PacketType::Response, &TRAILER).await;
    String::from_utf8(command).unwrap()
}

pub fn challenge(value: i32) -> Vec<u8> {
    let mut buf = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x41];
    buf.extend_from_slice(&value.to_le_bytes());
    buf
}

pub fn info(name: &str) -> Vec<u8> {
    let mut buf = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x49, 17];
    for s in [name, "de_nuke", "csgo", "Counter-Strike: Global Offensive"] {
        buf.extend_from_slice(s.as_bytes());
        buf.push(0);
    }
    buf.extend_from_slice(&730i16.to_le_bytes());
    buf.extend_from_slice(&[4, 10, 1, b'd', b'w', 0, 1]);
    buf.extend_from_slice(b"1.38.7.9\0");
    buf.push(0x80);
    buf.extend_from_slice(&27015i16.to_le_bytes());
    buf
}

pub fn players(names: &[&str]) -> Vec<u8> {
    let mut buf = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x44, names.len() as u8];
    for (index, name) in names.iter().enumerate() {
        buf.push(index as u8);
        buf.extend_from_slice(name.as_bytes());
        buf.push(0);
        buf.extend_from_slice(&(index as i32 * 5).to_le_bytes());
        buf.extend_from_slice(&90.0f32.to_bits().to_le_bytes());
    }
    buf
}
