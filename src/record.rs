//! Measurement records
//!
//! The server stores measurements as serialized JSON text. The client treats
//! that text as opaque on the wire; it only checks that a record loaded from
//! disk is a JSON object, and knows enough of the layout to print it.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{GuideError, Result};

/// Width of the `====` rule around a printed record
const RULE_WIDTH: usize = 59;

/// A serialized measurement record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementRecord {
    serialized: String,
}

impl MeasurementRecord {
    /// Serialize a JSON value compactly; the top level must be an object
    pub fn from_json(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(GuideError::Record(
                "top level of a measurement must be a JSON object".to_string(),
            ));
        }
        Ok(Self {
            serialized: serde_json::to_string(&value)?,
        })
    }

    /// Load a record from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&text).map_err(|e| {
            GuideError::Record(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json(value)
    }

    /// Wrap a record as received from the server, unchecked
    pub fn from_wire(serialized: impl Into<String>) -> Self {
        Self {
            serialized: serialized.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.serialized
    }

    pub fn into_string(self) -> String {
        self.serialized
    }

    /// Human-readable rendering, optionally headed by its queue position
    ///
    /// Records that don't parse as a measurement are printed verbatim.
    pub fn pretty(&self, index: Option<usize>) -> String {
        let mut out = String::new();

        match index {
            Some(index) => {
                let _ = write!(out, "== Index {:<4}", index);
                out.push_str(&"=".repeat(RULE_WIDTH - 13));
            }
            None => out.push_str(&"=".repeat(RULE_WIDTH)),
        }
        out.push('\n');

        match serde_json::from_str::<RecordView>(&self.serialized) {
            Ok(view) => view.render(&mut out),
            Err(_) => {
                out.push_str(&self.serialized);
                out.push('\n');
            }
        }

        out.push_str(&"=".repeat(RULE_WIDTH));
        out.push('\n');
        out
    }
}

/// The parts of a measurement worth printing
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RecordView {
    submitter: Option<Value>,
    metadata: Map<String, Value>,
    setvals: Map<String, Value>,
    sweep: Vec<Map<String, Value>>,
}

impl RecordView {
    fn render(&self, out: &mut String) {
        let submitter = self.submitter.as_ref().map(plain).unwrap_or_default();
        let _ = writeln!(out, "Submitter: {}", submitter);

        out.push_str("Metadata:\n");
        for (key, value) in &self.metadata {
            let _ = writeln!(out, "    {:-<20}: {}", key, plain(value));
        }

        out.push_str("Setvals:\n");
        for (instrument, values) in &self.setvals {
            match values {
                Value::Object(params) => {
                    let _ = writeln!(out, "--> {}:", instrument);
                    for (param, value) in params {
                        let _ = writeln!(out, "      {:-<20}: {}", param, plain(value));
                    }
                }
                other => {
                    let _ = writeln!(out, "--> {}: {}", instrument, plain(other));
                }
            }
        }

        if !self.sweep.is_empty() {
            out.push_str("Sweep: (Dims are SLOW to FAST)\n");
            for (dim, params) in self.sweep.iter().enumerate() {
                let _ = writeln!(out, "--> Dim {}:", dim);
                for (param, value) in params {
                    let _ = writeln!(out, "      {:-<20}: {}", param, plain(value));
                }
            }
        }
    }
}

/// Strings without JSON quotes, everything else as JSON
fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
