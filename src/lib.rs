//! Pure Rust async client for the [Source RCON protocol](https://developer.valvesoftware.com/wiki/Source_RCON_Protocol)
//! and the [Source server queries](https://developer.valvesoftware.com/wiki/Server_queries).
pub mod a2s;
pub mod client;
pub mod error;
pub mod options;
pub mod packet;
pub mod query;
pub mod server;
#[cfg(test)]
mod testlog;
pub mod transport;
pub mod wire;

pub use error::{Error, ParseError, Result};
pub use options::ConnectOptions;
pub use server::Server;
