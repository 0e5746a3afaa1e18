//! Index Module
//!
//! Resolves shell-style queue positions for removal requests.
//!
//! ## Responsibilities
//! - Parse single indices and `start:stop:step` ranges
//! - Resolve them against the current queue length
//! - Deduplicate; the server treats removal as a set operation
//! - Report specifiers that select nothing instead of dropping them
//!
//! The queue length is a snapshot: the queue may change between the LEN and
//! RMV round trips, and the server validates indices again on removal.

mod specifier;
mod resolver;

pub use specifier::{IndexSpecifier, ParseIndexError};
pub use resolver::{
    resolve, single_index, slice_indices, IndexResolutionError, Resolution, ResolutionErrorKind,
};
