//! Reply definitions
//!
//! Represents MEM-GR replies from the server.

use crate::error::{GuideError, Result};

use super::command::PROTOCOL_ID;

/// A MEM-GR reply
///
/// The protocol field says nothing about success: error replies use the same
/// envelope, so callers inspect the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Protocol identifier as sent by the server
    protocol: String,

    /// Payload fields with the envelope stripped
    payload: Vec<String>,
}

impl Reply {
    /// Create a reply in the MEM-GR envelope
    pub fn new<I, S>(payload: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            protocol: PROTOCOL_ID.to_string(),
            payload: payload.into_iter().map(Into::into).collect(),
        }
    }

    /// Split decoded reply fields into envelope and payload
    pub fn from_fields(fields: Vec<String>) -> Result<Self> {
        let mut fields = fields.into_iter();
        let protocol = fields
            .next()
            .ok_or_else(|| GuideError::ProtocolViolation("Empty reply".to_string()))?;

        Ok(Self {
            protocol,
            payload: fields.collect(),
        })
    }

    /// Layout: [protocol, payload...]
    pub fn to_fields(&self) -> Vec<String> {
        let mut fields = Vec::with_capacity(1 + self.payload.len());
        fields.push(self.protocol.clone());
        fields.extend(self.payload.iter().cloned());
        fields
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn payload(&self) -> &[String] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<String> {
        self.payload
    }

    /// The single payload field, parsed as an integer
    ///
    /// Anything other than exactly one integer field is a protocol violation.
    pub fn single_integer<T: std::str::FromStr>(&self, what: &str) -> Result<T> {
        match self.payload.as_slice() {
            [field] => field.trim().parse::<T>().map_err(|_| {
                GuideError::ProtocolViolation(format!(
                    "{} reply is not an integer: {:?}",
                    what, field
                ))
            }),
            other => Err(GuideError::ProtocolViolation(format!(
                "{} reply should carry one field, got {}: {:?}",
                what,
                other.len(),
                other
            ))),
        }
    }
}
