//! # Guide Client
//!
//! A client for the MEM-GR measurement queue protocol with:
//! - Strict request-reply over one ZMTP (ZeroMQ REQ) connection
//! - Bounded reply waits; a timeout closes the connection
//! - Slice-style queue index resolution for removals
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        GuideClient                           │
//! │        IDN · ADD · RMV · QUE · LEN · FCH  (+ logger span)    │
//! └──────────────┬──────────────────────────────┬───────────────┘
//!                │                              │ RMV
//!                │                              ▼
//!                │                      ┌───────────────┐
//!                │                      │ Index Resolver│
//!                │                      │ (LEN snapshot)│
//!                │                      └───────────────┘
//!                ▼
//!   ┌─────────────────────────┐        ┌─────────────────────────┐
//!   │   Session / PendingReply│◄──────►│   Protocol (envelope +  │
//!   │   (TCP, deadline reads) │        │   ZMTP frame codec)     │
//!   └─────────────────────────┘        └─────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;
pub mod index;
pub mod record;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{GuideError, Result};
pub use config::{ClientConfig, Endpoint};
pub use client::{GuideClient, RemovalOutcome};
pub use index::{IndexResolutionError, IndexSpecifier, Resolution};
pub use record::MeasurementRecord;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the guide client
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
