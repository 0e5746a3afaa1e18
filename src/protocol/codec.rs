//! Protocol codec
//!
//! ZMTP/3.0 framing for MEM-GR messages, so the client can talk to a stock
//! ZeroMQ REP socket over plain TCP.
//!
//! ## Wire Format
//!
//! ### Greeting (64 bytes, exchanged once per connection)
//! ```text
//! ┌───────────────┬─────────┬────────────────┬──────────┬─────────────┐
//! │ Signature(10) │ Ver (2) │ Mechanism (20) │ Server(1)│ Filler (31) │
//! │ FF 00..00 7F  │ 03 00   │ "NULL" + zeros │   00     │   zeros     │
//! └───────────────┴─────────┴────────────────┴──────────┴─────────────┘
//! ```
//!
//! ### Frame
//! ```text
//! ┌──────────┬───────────────────────┬─────────────────────────────┐
//! │ Flags(1) │ Size (1, or 8 if LONG)│           Body              │
//! └──────────┴───────────────────────┴─────────────────────────────┘
//! ```
//!
//! ### Message
//! An empty delimiter frame followed by one frame per field; every frame but
//! the last carries the MORE flag.

use std::io::{Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{GuideError, Result};

/// Greeting size in bytes (fixed, exactly 64)
pub const GREETING_SIZE: usize = 64;

/// ZMTP version we announce
pub const ZMTP_MAJOR: u8 = 3;
pub const ZMTP_MINOR: u8 = 0;

/// Security mechanism (no authentication, no encryption)
pub const MECHANISM_NULL: &[u8] = b"NULL";

/// Maximum frame body size (16 MB)
pub const MAX_FRAME_SIZE: u64 = 16 * 1024 * 1024;

/// Maximum total body size of one message (64 MB)
pub const MAX_MESSAGE_SIZE: u64 = 64 * 1024 * 1024;

/// Maximum number of frames in one message, delimiter included
pub const MAX_MESSAGE_FRAMES: usize = 64 * 1024;

/// Largest body that fits a short (1-byte size) frame
const MAX_SHORT_SIZE: usize = u8::MAX as usize;

const READY_COMMAND: &[u8] = b"READY";
const ERROR_COMMAND: &[u8] = b"ERROR";
const SOCKET_TYPE_PROPERTY: &str = "Socket-Type";

/// Frame flag bits
pub mod flags {
    /// More frames follow in this message
    pub const MORE: u8 = 0b0000_0001;
    /// Size is 8 bytes instead of 1
    pub const LONG: u8 = 0b0000_0010;
    /// Frame is a command, not message data
    pub const COMMAND: u8 = 0b0000_0100;

    /// Reserved bits (must be zero)
    pub const RESERVED_MASK: u8 = 0b1111_1000;
}

// =============================================================================
// Socket Types
// =============================================================================

/// ZeroMQ socket types relevant to request-reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketType {
    Req,
    Rep,
    Dealer,
    Router,
}

impl SocketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SocketType::Req => "REQ",
            SocketType::Rep => "REP",
            SocketType::Dealer => "DEALER",
            SocketType::Router => "ROUTER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [
            SocketType::Req,
            SocketType::Rep,
            SocketType::Dealer,
            SocketType::Router,
        ]
        .into_iter()
        .find(|t| t.as_str().eq_ignore_ascii_case(s))
    }

    /// Whether a socket of this type may be connected to `peer`
    pub fn is_compatible(&self, peer: SocketType) -> bool {
        use SocketType::*;
        matches!(
            (*self, peer),
            (Req, Rep)
                | (Req, Router)
                | (Rep, Req)
                | (Rep, Dealer)
                | (Dealer, Rep)
                | (Dealer, Dealer)
                | (Dealer, Router)
                | (Router, Req)
                | (Router, Dealer)
                | (Router, Router)
        )
    }
}

// =============================================================================
// Greeting
// =============================================================================

/// Encode our greeting (NULL mechanism, client role)
pub fn encode_greeting() -> [u8; GREETING_SIZE] {
    let mut greeting = [0u8; GREETING_SIZE];
    greeting[0] = 0xFF;
    greeting[9] = 0x7F;
    greeting[10] = ZMTP_MAJOR;
    greeting[11] = ZMTP_MINOR;
    greeting[12..12 + MECHANISM_NULL.len()].copy_from_slice(MECHANISM_NULL);
    greeting
}

/// Validate a peer greeting
pub fn decode_greeting(greeting: &[u8]) -> Result<()> {
    if greeting.len() < GREETING_SIZE {
        return Err(GuideError::Handshake(format!(
            "Incomplete greeting: expected {} bytes, got {}",
            GREETING_SIZE,
            greeting.len()
        )));
    }

    if greeting[0] != 0xFF || greeting[9] & 0x01 != 0x01 {
        return Err(GuideError::Handshake(
            "Invalid ZMTP signature".to_string(),
        ));
    }

    if greeting[10] < ZMTP_MAJOR {
        return Err(GuideError::Handshake(format!(
            "Unsupported ZMTP version: {}.{}",
            greeting[10], greeting[11]
        )));
    }

    let mechanism = &greeting[12..32];
    let end = mechanism.iter().position(|&b| b == 0).unwrap_or(mechanism.len());
    if &mechanism[..end] != MECHANISM_NULL {
        return Err(GuideError::Handshake(format!(
            "Unsupported security mechanism: {:?}",
            String::from_utf8_lossy(&mechanism[..end])
        )));
    }

    Ok(())
}

// =============================================================================
// Frames
// =============================================================================

/// A single ZMTP frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub flags: u8,
    pub body: Vec<u8>,
}

impl Frame {
    pub fn has_more(&self) -> bool {
        self.flags & flags::MORE != 0
    }

    pub fn is_command(&self) -> bool {
        self.flags & flags::COMMAND != 0
    }
}

/// Append one frame to `buf`, picking the short or long size form
pub fn encode_frame(buf: &mut BytesMut, frame_flags: u8, body: &[u8]) {
    if body.len() > MAX_SHORT_SIZE {
        buf.put_u8(frame_flags | flags::LONG);
        buf.put_u64(body.len() as u64);
    } else {
        buf.put_u8(frame_flags);
        buf.put_u8(body.len() as u8);
    }
    buf.put_slice(body);
}

/// Read one frame from a stream
///
/// Blocks until the frame is complete or the reader fails
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Frame> {
    let mut head = [0u8; 2];
    reader.read_exact(&mut head)?;

    let frame_flags = head[0];
    if frame_flags & flags::RESERVED_MASK != 0 {
        return Err(GuideError::ProtocolViolation(format!(
            "Reserved frame flag bits set: 0x{:02x}",
            frame_flags
        )));
    }

    let size = if frame_flags & flags::LONG != 0 {
        let mut size_bytes = [0u8; 8];
        size_bytes[0] = head[1];
        reader.read_exact(&mut size_bytes[1..])?;
        u64::from_be_bytes(size_bytes)
    } else {
        head[1] as u64
    };

    if size > MAX_FRAME_SIZE {
        return Err(GuideError::ProtocolViolation(format!(
            "Frame too large: {} bytes (max {})",
            size, MAX_FRAME_SIZE
        )));
    }

    let mut body = vec![0u8; size as usize];
    reader.read_exact(&mut body)?;

    Ok(Frame {
        flags: frame_flags,
        body,
    })
}

// =============================================================================
// Commands
// =============================================================================

/// Encode a READY command announcing our socket type
pub fn encode_ready(socket_type: SocketType) -> Bytes {
    let mut body = BytesMut::new();
    body.put_u8(READY_COMMAND.len() as u8);
    body.put_slice(READY_COMMAND);

    let value = socket_type.as_str().as_bytes();
    body.put_u8(SOCKET_TYPE_PROPERTY.len() as u8);
    body.put_slice(SOCKET_TYPE_PROPERTY.as_bytes());
    body.put_u32(value.len() as u32);
    body.put_slice(value);

    let mut buf = BytesMut::with_capacity(2 + body.len());
    encode_frame(&mut buf, flags::COMMAND, &body);
    buf.freeze()
}

/// Decode a READY command body, returning the peer's socket type
pub fn decode_ready(body: &[u8]) -> Result<SocketType> {
    let (name, mut rest) = split_short(body)
        .ok_or_else(|| GuideError::Handshake("Truncated command name".to_string()))?;

    if name == ERROR_COMMAND {
        let reason = split_short(rest)
            .map(|(reason, _)| String::from_utf8_lossy(reason).into_owned())
            .unwrap_or_default();
        return Err(GuideError::Handshake(format!("Peer rejected connection: {}", reason)));
    }
    if name != READY_COMMAND {
        return Err(GuideError::Handshake(format!(
            "Expected READY command, got {:?}",
            String::from_utf8_lossy(name)
        )));
    }

    let mut socket_type = None;
    while !rest.is_empty() {
        let (prop_name, after_name) = split_short(rest)
            .ok_or_else(|| GuideError::Handshake("Truncated property name".to_string()))?;

        if after_name.len() < 4 {
            return Err(GuideError::Handshake("Truncated property length".to_string()));
        }
        let value_len =
            u32::from_be_bytes([after_name[0], after_name[1], after_name[2], after_name[3]]) as usize;
        let value = after_name[4..]
            .get(..value_len)
            .ok_or_else(|| GuideError::Handshake("Truncated property value".to_string()))?;

        if prop_name.eq_ignore_ascii_case(SOCKET_TYPE_PROPERTY.as_bytes()) {
            let text = String::from_utf8_lossy(value);
            socket_type = Some(SocketType::parse(&text).ok_or_else(|| {
                GuideError::Handshake(format!("Unknown socket type: {:?}", text))
            })?);
        }

        rest = &after_name[4 + value_len..];
    }

    socket_type.ok_or_else(|| GuideError::Handshake("READY without Socket-Type".to_string()))
}

/// Split a 1-byte length-prefixed string off the front of `bytes`
fn split_short(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
    let (&len, rest) = bytes.split_first()?;
    let len = len as usize;
    if rest.len() < len {
        return None;
    }
    Some(rest.split_at(len))
}

/// Perform the ZMTP greeting and READY exchange on a fresh stream
///
/// Returns the peer's socket type.
pub fn handshake<S: Read + Write>(stream: &mut S, local: SocketType) -> Result<SocketType> {
    stream.write_all(&encode_greeting())?;
    stream.flush()?;

    let mut greeting = [0u8; GREETING_SIZE];
    stream.read_exact(&mut greeting)?;
    decode_greeting(&greeting)?;

    stream.write_all(&encode_ready(local))?;
    stream.flush()?;

    let frame = read_frame(stream)?;
    if !frame.is_command() {
        return Err(GuideError::Handshake(
            "Expected READY command, got a message frame".to_string(),
        ));
    }

    let peer = decode_ready(&frame.body)?;
    if !local.is_compatible(peer) {
        return Err(GuideError::Handshake(format!(
            "{} socket cannot talk to a {} peer",
            local.as_str(),
            peer.as_str()
        )));
    }

    Ok(peer)
}

// =============================================================================
// Messages
// =============================================================================

/// Encode a multipart message: empty delimiter + one frame per field
///
/// The whole message lands in one buffer so it can be written in one go.
pub fn encode_message<S: AsRef<[u8]>>(fields: &[S]) -> Bytes {
    let body_len: usize = fields.iter().map(|f| f.as_ref().len() + 9).sum();
    let mut buf = BytesMut::with_capacity(2 + body_len);

    let delimiter_flags = if fields.is_empty() { 0 } else { flags::MORE };
    encode_frame(&mut buf, delimiter_flags, &[]);

    for (i, field) in fields.iter().enumerate() {
        let more = if i + 1 < fields.len() { flags::MORE } else { 0 };
        encode_frame(&mut buf, more, field.as_ref());
    }

    buf.freeze()
}

/// Write a multipart message to a stream
pub fn write_message<W: Write, S: AsRef<[u8]>>(writer: &mut W, fields: &[S]) -> Result<()> {
    let bytes = encode_message(fields);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete multipart message, stripping the empty delimiter
///
/// Command frames between messages (e.g. heartbeats) are skipped. The
/// message is bounded by `MAX_MESSAGE_FRAMES` and `MAX_MESSAGE_SIZE`.
pub fn read_message<R: Read>(reader: &mut R) -> Result<Vec<Vec<u8>>> {
    let mut parts = Vec::new();
    let mut total_size = 0u64;

    loop {
        let frame = read_frame(reader)?;

        if frame.is_command() {
            if !parts.is_empty() {
                return Err(GuideError::ProtocolViolation(
                    "Command frame inside a multipart message".to_string(),
                ));
            }
            tracing::trace!("Skipping command frame of {} bytes", frame.body.len());
            continue;
        }

        if parts.len() >= MAX_MESSAGE_FRAMES {
            return Err(GuideError::ProtocolViolation(format!(
                "Message has too many frames (max {})",
                MAX_MESSAGE_FRAMES
            )));
        }

        total_size += frame.body.len() as u64;
        if total_size > MAX_MESSAGE_SIZE {
            return Err(GuideError::ProtocolViolation(format!(
                "Message too large: over {} bytes",
                MAX_MESSAGE_SIZE
            )));
        }

        let more = frame.has_more();
        parts.push(frame.body);
        if !more {
            break;
        }
    }

    match parts.first() {
        Some(delimiter) if delimiter.is_empty() => {
            parts.remove(0);
            Ok(parts)
        }
        _ => Err(GuideError::ProtocolViolation(
            "Message is missing the empty delimiter frame".to_string(),
        )),
    }
}

/// Decode message parts as UTF-8 text fields
pub fn decode_fields(parts: Vec<Vec<u8>>) -> Result<Vec<String>> {
    parts
        .into_iter()
        .enumerate()
        .map(|(i, part)| {
            String::from_utf8(part).map_err(|e| {
                GuideError::ProtocolViolation(format!("Field {} is not valid UTF-8: {}", i, e))
            })
        })
        .collect()
}
