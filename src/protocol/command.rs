//! Request definitions
//!
//! Represents MEM-GR requests sent to the server.

use std::fmt;
use std::str::FromStr;

use crate::error::{GuideError, Result};

/// Protocol identifier carried in field 0 of every request and reply
pub const PROTOCOL_ID: &str = "MEM-GR/0.1";

/// MEM-GR command codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandCode {
    /// Server identification
    Idn,
    /// Add a measurement to the queue
    Add,
    /// Remove measurements from the queue
    Rmv,
    /// Query the queue contents
    Que,
    /// Queue length
    Len,
    /// Fetch counter query or update
    Fch,
}

impl CommandCode {
    /// The 3-letter wire header
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandCode::Idn => "IDN",
            CommandCode::Add => "ADD",
            CommandCode::Rmv => "RMV",
            CommandCode::Que => "QUE",
            CommandCode::Len => "LEN",
            CommandCode::Fch => "FCH",
        }
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandCode {
    type Err = GuideError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "IDN" => Ok(CommandCode::Idn),
            "ADD" => Ok(CommandCode::Add),
            "RMV" => Ok(CommandCode::Rmv),
            "QUE" => Ok(CommandCode::Que),
            "LEN" => Ok(CommandCode::Len),
            "FCH" => Ok(CommandCode::Fch),
            _ => Err(GuideError::ProtocolViolation(format!(
                "Unknown command header: {:?}",
                s
            ))),
        }
    }
}

/// A MEM-GR request: command header plus argument fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    code: CommandCode,
    args: Vec<String>,
}

impl Request {
    /// Create a request with no arguments
    pub fn new(code: CommandCode) -> Self {
        Self {
            code,
            args: Vec::new(),
        }
    }

    /// Append an argument field
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn code(&self) -> CommandCode {
        self.code
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Wrap the request in the protocol envelope
    ///
    /// Layout: [PROTOCOL_ID, CODE, args...]
    pub fn to_fields(&self) -> Vec<String> {
        let mut fields = Vec::with_capacity(2 + self.args.len());
        fields.push(PROTOCOL_ID.to_string());
        fields.push(self.code.as_str().to_string());
        fields.extend(self.args.iter().cloned());
        fields
    }

    /// Unwrap a request from its envelope (server side)
    pub fn from_fields(fields: Vec<String>) -> Result<Self> {
        let mut fields = fields.into_iter();

        match fields.next() {
            Some(ref id) if id == PROTOCOL_ID => {}
            Some(id) => {
                return Err(GuideError::ProtocolViolation(format!(
                    "Unexpected protocol identifier: {:?}",
                    id
                )))
            }
            None => {
                return Err(GuideError::ProtocolViolation(
                    "Empty request".to_string(),
                ))
            }
        }

        let code = fields
            .next()
            .ok_or_else(|| GuideError::ProtocolViolation("Missing command header".to_string()))?
            .parse()?;

        Ok(Self {
            code,
            args: fields.collect(),
        })
    }
}
