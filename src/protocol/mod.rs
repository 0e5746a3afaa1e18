//! Protocol Module
//!
//! Defines the MEM-GR request-reply protocol and its ZMTP framing.
//!
//! ## Message Layout
//!
//! ### Request
//! ```text
//! ┌──────────────┬──────────┬──────────┬─────┬──────────┐
//! │ "MEM-GR/0.1" │ Code (3) │  Arg 1   │ ... │  Arg N   │
//! └──────────────┴──────────┴──────────┴─────┴──────────┘
//! ```
//!
//! ### Commands
//! - IDN: server identification
//! - ADD: serialized measurement record
//! - RMV: optional index set (JSON array)
//! - QUE: queue contents
//! - LEN: queue length
//! - FCH: optional new fetch counter
//!
//! ### Reply
//! ```text
//! ┌──────────────┬───────────┬─────┬───────────┐
//! │ "MEM-GR/0.1" │ Payload 1 │ ... │ Payload N │
//! └──────────────┴───────────┴─────┴───────────┘
//! ```
//!
//! Every field is one UTF-8 ZMTP frame.

mod command;
mod reply;
mod codec;

pub use command::{CommandCode, Request, PROTOCOL_ID};
pub use reply::Reply;
pub use codec::{
    decode_fields, decode_greeting, decode_ready, encode_frame, encode_greeting, encode_message,
    encode_ready, flags, handshake, read_frame, read_message, write_message, Frame, SocketType,
    GREETING_SIZE, MAX_FRAME_SIZE, MAX_MESSAGE_FRAMES, MAX_MESSAGE_SIZE,
};
