use crate::{
    error::ParseError,
    wire::{WireReader, WireWrite},
};

/// Rcon packet types. `Exec` and `AuthResponse` share the same number on
/// the wire, so decoding only ever produces the server-to-client variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    // SERVERDATA_AUTH
    Auth,
    // SERVERDATA_EXECCOMMAND
    Exec,
    // SERVERDATA_AUTH_RESPONSE
    AuthResponse,
    // SERVERDATA_RESPONSE_VALUE
    Response,
}

impl PacketType {
    pub fn value(&self) -> i32 {
        match self {
            PacketType::Auth => 3,
            PacketType::Exec => 2,
            PacketType::AuthResponse => 2,
            PacketType::Response => 0,
        }
    }
}

impl TryFrom<i32> for PacketType {
    type Error = ParseError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(PacketType::AuthResponse),
            0 => Ok(PacketType::Response),
            _ => Err(ParseError::BadData),
        }
    }
}

/// A single rcon frame. The size field and the two terminating nulls only
/// exist on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    id: i32,
    packet_type: PacketType,
    body: Vec<u8>,
}

impl Packet {
    /// id + type + body terminator + empty string terminator
    pub const BASE_PACKET_SIZE: i32 = 10;

    pub fn new(id: i32, packet_type: PacketType, body: impl Into<Vec<u8>>) -> Self {
        Packet {
            id,
            packet_type,
            body: body.into(),
        }
    }

    // Since the only one of these values that can change in length is the body,
    // an easy way to calculate the size of a packet is to find the byte-length
    // of the packet body, then add 10 to it.
    pub fn size(&self) -> i32 {
        self.body.len() as i32 + Self::BASE_PACKET_SIZE
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn pack(&self) -> Vec<u8> {
        // Size, ID, Type, Body, Terminator
        let mut payload: Vec<u8> = Vec::with_capacity(self.size() as usize + 4);
        payload.write_long(self.size());
        payload.write_long(self.id);
        payload.write_long(self.packet_type.value());
        payload.extend_from_slice(&self.body);
        // null terminate the body, then the trailing empty string
        payload.write_null();
        payload.write_null();
        payload
    }

    /// Decodes a frame sent by the server, size prefix included. Bytes past
    /// the declared size are ignored.
    pub fn unpack(incoming: &[u8]) -> Result<Self, ParseError> {
        let mut reader = WireReader::new(incoming);
        let size = reader.read_long()?;
        if size < Self::BASE_PACKET_SIZE {
            return Err(ParseError::BadData);
        }
        if reader.remaining() < size as usize {
            return Err(ParseError::NotEnoughDataInResponse);
        }
        let id = reader.read_long()?;
        let packet_type = PacketType::try_from(reader.read_long()?)?;
        let body = reader.read_bytes((size - Self::BASE_PACKET_SIZE) as usize)?;

        Ok(Packet::new(id, packet_type, body))
    }
}
