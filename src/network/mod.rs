//! Network Module
//!
//! Client-side transport to a MEM-GR server.
//!
//! ## Architecture
//! - One TCP connection per session, ZMTP REQ role
//! - Strict request-then-reply, enforced by ownership
//! - Every wait bounded by the configured timeout

mod session;

pub use session::{PendingReply, Session};
