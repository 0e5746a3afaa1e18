//! Index specifiers
//!
//! Queue positions as typed in a shell: `3`, `-1`, `1:3`, `:`, `::2`, `4::-1`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A position or range of positions in the measurement queue
///
/// Negative values count from the end of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexSpecifier {
    /// One position
    Single(i64),

    /// A slice; any bound may be left open
    Range {
        start: Option<i64>,
        stop: Option<i64>,
        step: Option<i64>,
    },
}

impl IndexSpecifier {
    /// The whole queue (`:`)
    pub fn all() -> Self {
        IndexSpecifier::Range {
            start: None,
            stop: None,
            step: None,
        }
    }

    pub fn range(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Self {
        IndexSpecifier::Range { start, stop, step }
    }
}

impl From<i64> for IndexSpecifier {
    fn from(index: i64) -> Self {
        IndexSpecifier::Single(index)
    }
}

/// Error parsing an index specifier from text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid index specifier {input:?}: {reason}")]
pub struct ParseIndexError {
    pub input: String,
    pub reason: String,
}

impl FromStr for IndexSpecifier {
    type Err = ParseIndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let fail = |reason: &str| ParseIndexError {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        if text.is_empty() {
            return Err(fail("empty"));
        }

        if !text.contains(':') {
            return text
                .parse::<i64>()
                .map(IndexSpecifier::Single)
                .map_err(|_| fail("not an integer"));
        }

        let parts: Vec<&str> = text.split(':').collect();
        if parts.len() > 3 {
            return Err(fail("too many ':' separators"));
        }

        let bound = |part: Option<&&str>| -> Result<Option<i64>, ParseIndexError> {
            match part.map(|p| p.trim()) {
                None | Some("") => Ok(None),
                Some(p) => p
                    .parse::<i64>()
                    .map(Some)
                    .map_err(|_| fail("slice bound is not an integer")),
            }
        };

        Ok(IndexSpecifier::Range {
            start: bound(parts.first())?,
            stop: bound(parts.get(1))?,
            step: bound(parts.get(2))?,
        })
    }
}

impl fmt::Display for IndexSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexSpecifier::Single(index) => write!(f, "{}", index),
            IndexSpecifier::Range { start, stop, step } => {
                if let Some(start) = start {
                    write!(f, "{}", start)?;
                }
                f.write_str(":")?;
                if let Some(stop) = stop {
                    write!(f, "{}", stop)?;
                }
                if let Some(step) = step {
                    write!(f, ":{}", step)?;
                }
                Ok(())
            }
        }
    }
}
