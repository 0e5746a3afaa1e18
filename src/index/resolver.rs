//! Index resolution
//!
//! Turns a list of index specifiers into the set of absolute queue positions
//! to remove, against a snapshot of the queue length.
//!
//! ## Clamping rules
//!
//! For a queue of length `n` and a non-zero `step`:
//! - step > 0: bounds clamp to `[0, n]`; open start = 0, open stop = n
//! - step < 0: bounds clamp to `[-1, n - 1]`; open start = n - 1, open stop = -1
//! - a negative bound has `n` added before clamping
//!
//! Single indices are not clamped: anything outside `[-n, n - 1]` is an error
//! for that specifier.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

use crate::error::{GuideError, Result};

use super::IndexSpecifier;

/// Why a specifier contributed no indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionErrorKind {
    /// Single index outside the queue
    OutOfRange,
    /// Range with a step of zero
    ZeroStep,
}

impl fmt::Display for ResolutionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionErrorKind::OutOfRange => f.write_str("index out of range"),
            ResolutionErrorKind::ZeroStep => f.write_str("slice step cannot be zero"),
        }
    }
}

/// A specifier that could not be resolved; the rest of the batch still is
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{specifier}: {kind} (queue length {queue_len})")]
pub struct IndexResolutionError {
    pub specifier: IndexSpecifier,
    pub queue_len: usize,
    pub kind: ResolutionErrorKind,
}

/// Outcome of resolving a batch of specifiers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Deduplicated absolute indices, ascending
    pub indices: Vec<usize>,

    /// One entry per specifier that resolved to nothing
    pub errors: Vec<IndexResolutionError>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Resolve specifiers against a queue of `queue_len` entries
///
/// Fails only with `EmptyQueue`; bad specifiers are collected in
/// `Resolution::errors`.
pub fn resolve(specifiers: &[IndexSpecifier], queue_len: usize) -> Result<Resolution> {
    if queue_len == 0 {
        return Err(GuideError::EmptyQueue);
    }

    let mut indices = BTreeSet::new();
    let mut errors = Vec::new();

    for &specifier in specifiers {
        let resolved = match specifier {
            IndexSpecifier::Single(index) => single_index(index, queue_len).map(|i| vec![i]),
            IndexSpecifier::Range { start, stop, step } => {
                slice_indices(start, stop, step, queue_len)
            }
        };

        match resolved {
            Ok(found) => indices.extend(found),
            Err(kind) => errors.push(IndexResolutionError {
                specifier,
                queue_len,
                kind,
            }),
        }
    }

    Ok(Resolution {
        indices: indices.into_iter().collect(),
        errors,
    })
}

/// Bounded single-position lookup; negative counts from the end
pub fn single_index(
    index: i64,
    len: usize,
) -> std::result::Result<usize, ResolutionErrorKind> {
    let n = len as i64;
    let absolute = if index < 0 { index.saturating_add(n) } else { index };

    if (0..n).contains(&absolute) {
        Ok(absolute as usize)
    } else {
        Err(ResolutionErrorKind::OutOfRange)
    }
}

/// Positions selected by `start:stop:step` over `[0, len)`
pub fn slice_indices(
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
    len: usize,
) -> std::result::Result<Vec<usize>, ResolutionErrorKind> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(ResolutionErrorKind::ZeroStep);
    }

    let n = len as i64;
    let (lower, upper) = if step < 0 { (-1, n - 1) } else { (0, n) };

    let clamp = |bound: Option<i64>, open: i64| match bound {
        None => open,
        Some(b) if b < 0 => b.saturating_add(n).max(lower),
        Some(b) => b.min(upper),
    };

    let (start, stop) = if step < 0 {
        (clamp(start, upper), clamp(stop, lower))
    } else {
        (clamp(start, lower), clamp(stop, upper))
    };

    let mut selected = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        selected.push(i as usize);
        i = match i.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }

    Ok(selected)
}
