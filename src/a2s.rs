//! Request and response frames of the Source
//! [server query protocol](https://developer.valvesoftware.com/wiki/Server_queries).
//! Only single-datagram responses are understood.

use crate::{
    error::ParseError,
    wire::{WireReader, WireWrite, REQUEST_PREFIX},
};

const A2S_INFO: u8 = 0x54;
const A2S_PLAYER: u8 = 0x55;
const S2A_INFO: u8 = 0x49;
const S2A_PLAYER: u8 = 0x44;
const S2C_CHALLENGE: u8 = 0x41;

const INFO_PAYLOAD: &str = "Source Engine Query";
/// Sent in place of a challenge to ask the server for one.
const NO_CHALLENGE: i32 = -1;
/// The Ship adds game mode fields to its info response.
const THE_SHIP_APP_ID: i16 = 2400;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InfoRequest {
    pub challenge: Option<i32>,
}

impl InfoRequest {
    pub fn pack(&self) -> Vec<u8> {
        let mut buf: Vec<u8> = Vec::with_capacity(29);
        buf.write_request_prefix();
        buf.write_byte(A2S_INFO);
        buf.write_string(INFO_PAYLOAD);
        if let Some(challenge) = self.challenge {
            buf.write_long(challenge);
        }
        buf
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayersRequest {
    pub challenge: Option<i32>,
}

impl PlayersRequest {
    pub fn pack(&self) -> Vec<u8> {
        let mut buf: Vec<u8> = Vec::with_capacity(9);
        buf.write_request_prefix();
        buf.write_byte(A2S_PLAYER);
        buf.write_long(self.challenge.unwrap_or(NO_CHALLENGE));
        buf
    }
}

/// Opens a response and checks that it carries the expected type tag.
fn open_response(data: &[u8], tag: u8) -> Result<WireReader<'_>, ParseError> {
    let mut reader = WireReader::new(data);
    if reader.read_bytes(REQUEST_PREFIX.len())? != REQUEST_PREFIX {
        return Err(ParseError::BadData);
    }
    if reader.read_byte()? != tag {
        return Err(ParseError::BadData);
    }
    Ok(reader)
}

/// Whether a datagram is the server asking for a challenge number instead
/// of answering.
pub fn is_challenge_response(data: &[u8]) -> bool {
    data.len() > REQUEST_PREFIX.len()
        && data[..REQUEST_PREFIX.len()] == REQUEST_PREFIX
        && data[REQUEST_PREFIX.len()] == S2C_CHALLENGE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeResponse {
    pub challenge: i32,
}

impl ChallengeResponse {
    pub fn unpack(data: &[u8]) -> Result<Self, ParseError> {
        let mut reader = open_response(data, S2C_CHALLENGE)?;
        Ok(ChallengeResponse {
            challenge: reader.read_long()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerType {
    Dedicated,
    NonDedicated,
    SourceTv,
    Other(u8),
}

impl From<u8> for ServerType {
    fn from(v: u8) -> Self {
        match v {
            b'd' | b'D' => ServerType::Dedicated,
            b'l' | b'L' => ServerType::NonDedicated,
            b'p' | b'P' => ServerType::SourceTv,
            other => ServerType::Other(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Linux,
    Windows,
    Mac,
    Other(u8),
}

impl From<u8> for Environment {
    fn from(v: u8) -> Self {
        match v {
            b'l' | b'L' => Environment::Linux,
            b'w' | b'W' => Environment::Windows,
            b'm' | b'o' => Environment::Mac,
            other => Environment::Other(other),
        }
    }
}

/// Game mode fields only sent by The Ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TheShipInfo {
    pub mode: u8,
    pub witnesses: u8,
    pub duration: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTvInfo {
    pub port: i16,
    pub name: String,
}

/// Optional trailing fields, present when the server sets the matching bit
/// in the extra data flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedInfo {
    pub port: Option<i16>,
    pub steam_id: Option<u64>,
    pub source_tv: Option<SourceTvInfo>,
    pub keywords: Option<String>,
    pub game_id: Option<u64>,
}

impl ExtendedInfo {
    const PORT: u8 = 0x80;
    const STEAM_ID: u8 = 0x10;
    const SOURCE_TV: u8 = 0x40;
    const KEYWORDS: u8 = 0x20;
    const GAME_ID: u8 = 0x01;

    fn read(flags: u8, r: &mut WireReader<'_>) -> Result<Self, ParseError> {
        let mut ext = ExtendedInfo::default();
        if flags & Self::PORT != 0 {
            ext.port = Some(r.read_short()?);
        }
        if flags & Self::STEAM_ID != 0 {
            ext.steam_id = Some(r.read_ulong_long()?);
        }
        if flags & Self::SOURCE_TV != 0 {
            ext.source_tv = Some(SourceTvInfo {
                port: r.read_short()?,
                name: r.read_string()?,
            });
        }
        if flags & Self::KEYWORDS != 0 {
            ext.keywords = Some(r.read_string()?);
        }
        if flags & Self::GAME_ID != 0 {
            ext.game_id = Some(r.read_ulong_long()?);
        }
        Ok(ext)
    }
}

/// Server metadata as answered to an info request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoResponse {
    pub protocol: u8,
    pub name: String,
    pub map: String,
    pub folder: String,
    pub game: String,
    pub app_id: i16,
    pub players: u8,
    pub max_players: u8,
    pub bots: u8,
    pub server_type: ServerType,
    pub environment: Environment,
    pub private: bool,
    pub vac: bool,
    pub the_ship: Option<TheShipInfo>,
    pub version: String,
    pub extended: Option<ExtendedInfo>,
}

impl InfoResponse {
    pub fn unpack(data: &[u8]) -> Result<Self, ParseError> {
        let mut r = open_response(data, S2A_INFO)?;

        let protocol = r.read_byte()?;
        let name = r.read_string()?;
        let map = r.read_string()?;
        let folder = r.read_string()?;
        let game = r.read_string()?;
        let app_id = r.read_short()?;
        let players = r.read_byte()?;
        let max_players = r.read_byte()?;
        let bots = r.read_byte()?;
        let server_type = ServerType::from(r.read_byte()?);
        let environment = Environment::from(r.read_byte()?);
        let private = r.read_byte()? != 0;
        let vac = r.read_byte()? != 0;
        let the_ship = if app_id == THE_SHIP_APP_ID {
            Some(TheShipInfo {
                mode: r.read_byte()?,
                witnesses: r.read_byte()?,
                duration: r.read_byte()?,
            })
        } else {
            None
        };
        let version = r.read_string()?;
        let extended = if r.is_empty() {
            None
        } else {
            let flags = r.read_byte()?;
            Some(ExtendedInfo::read(flags, &mut r)?)
        };

        Ok(InfoResponse {
            protocol,
            name,
            map,
            folder,
            game,
            app_id,
            players,
            max_players,
            bots,
            server_type,
            environment,
            private,
            vac,
            the_ship,
            version,
            extended,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub index: u8,
    pub name: String,
    pub score: i32,
    /// Seconds connected.
    pub duration: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayersInfoResponse {
    pub players: Vec<Player>,
}

impl PlayersInfoResponse {
    pub fn unpack(data: &[u8]) -> Result<Self, ParseError> {
        let mut r = open_response(data, S2A_PLAYER)?;

        let count = usize::from(r.read_byte()?);
        let mut players = Vec::with_capacity(count);
        for _ in 0..count {
            players.push(Player {
                index: r.read_byte()?,
                name: r.read_string()?,
                score: r.read_long()?,
                duration: r.read_float()?,
            });
        }

        Ok(PlayersInfoResponse { players })
    }
}
