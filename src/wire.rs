//! Little-endian primitives shared by the query and rcon framing.

use crate::error::ParseError;

/// Every query datagram (in both directions) starts with these four bytes.
pub const REQUEST_PREFIX: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];

/// Cursor over a received buffer. Every read either consumes exactly the
/// bytes it needs or fails with [ParseError::CouldNotReadData] and leaves
/// the cursor where it was.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        WireReader { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ParseError> {
        if self.remaining() < n {
            return Err(ParseError::CouldNotReadData);
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ParseError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_byte(&mut self) -> Result<u8, ParseError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_short(&mut self) -> Result<i16, ParseError> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_long(&mut self) -> Result<i32, ParseError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_ulong(&mut self) -> Result<u32, ParseError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_long_long(&mut self) -> Result<i64, ParseError> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_ulong_long(&mut self) -> Result<u64, ParseError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_float(&mut self) -> Result<f32, ParseError> {
        Ok(f32::from_bits(self.read_ulong()?))
    }

    /// Reads up to (and consumes) the next zero byte. The zero is not part
    /// of the result. Invalid UTF-8 is replaced rather than rejected, as
    /// server names are frequently in legacy encodings.
    pub fn read_string(&mut self) -> Result<String, ParseError> {
        let rest = &self.buf[self.pos..];
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(ParseError::CouldNotReadData)?;
        let s = String::from_utf8_lossy(&rest[..len]).into_owned();
        self.pos += len + 1;
        Ok(s)
    }
}

/// Write side of the codec, as an extension of the output buffer.
pub trait WireWrite {
    fn write_byte(&mut self, v: u8);
    fn write_long(&mut self, v: i32);
    /// Payload followed by a zero byte.
    fn write_string(&mut self, v: &str);
    fn write_null(&mut self);
    fn write_request_prefix(&mut self);
}

impl WireWrite for Vec<u8> {
    fn write_byte(&mut self, v: u8) {
        self.push(v);
    }

    fn write_long(&mut self, v: i32) {
        self.extend_from_slice(&v.to_le_bytes());
    }

    fn write_string(&mut self, v: &str) {
        self.extend_from_slice(v.as_bytes());
        self.push(0);
    }

    fn write_null(&mut self) {
        self.push(0);
    }

    fn write_request_prefix(&mut self) {
        self.extend_from_slice(&REQUEST_PREFIX);
    }
}

/// One primitive as produced by [WireReader], for callers decoding a field
/// whose wire kind differs between games (some servers send a count as a
/// byte, others as a long or as decimal text) and only care about its
/// integer value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireValue {
    Byte(u8),
    Short(i16),
    Long(i32),
    LongLong(i64),
    Str(String),
}

impl WireValue {
    pub fn to_int(&self) -> Result<i64, ParseError> {
        match self {
            WireValue::Byte(v) => Ok(i64::from(*v)),
            WireValue::Short(v) => Ok(i64::from(*v)),
            WireValue::Long(v) => Ok(i64::from(*v)),
            WireValue::LongLong(v) => Ok(*v),
            WireValue::Str(s) => s.trim().parse().map_err(|_| ParseError::BadData),
        }
    }
}
