//! Guide client
//!
//! The MEM-GR operations on top of a single request-reply session.
//!
//! ## Connection lifecycle
//! - Created disconnected; `connect` must be called explicitly
//! - A timeout (or a dead peer) closes the connection
//! - Nothing reconnects or retries implicitly; the next call returns
//!   `NotConnected` until `connect` is called again
//!
//! ## Logging
//! The client logs through the `tracing::Span` it is given at construction;
//! it never installs or mutates a global subscriber.

use std::io::Write;
use std::path::Path;

use tracing::Span;

use crate::config::{ClientConfig, Endpoint};
use crate::error::{GuideError, Result};
use crate::index::{resolve, IndexResolutionError, IndexSpecifier};
use crate::network::Session;
use crate::protocol::{CommandCode, Reply, Request};
use crate::record::MeasurementRecord;

/// Result of a removal request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalOutcome {
    /// The queue was empty; no RMV was sent
    EmptyQueue,

    /// Specifiers were given but none selected a queue position; no RMV was sent
    NothingResolved { errors: Vec<IndexResolutionError> },

    /// RMV was sent
    Removed {
        /// Absolute indices submitted (empty = server default removal)
        requested: Vec<usize>,
        /// Server confirmation payload
        reply: Vec<String>,
        /// Specifiers that were skipped
        errors: Vec<IndexResolutionError>,
    },
}

/// Client for a MEM-GR measurement queue server
///
/// Owns at most one connection. Access is not internally synchronized:
/// callers sharing a client must serialize their calls.
pub struct GuideClient {
    config: ClientConfig,

    /// `None` while disconnected
    session: Option<Session>,

    /// Logger handle
    span: Span,
}

impl GuideClient {
    /// Create a disconnected client logging under `span`
    pub fn new(config: ClientConfig, span: Span) -> Self {
        Self {
            config,
            session: None,
            span,
        }
    }

    /// Create a disconnected client with its own `guide_client` span
    pub fn with_config(config: ClientConfig) -> Self {
        let span = tracing::info_span!("guide_client", endpoint = %config.endpoint);
        Self::new(config, span)
    }

    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to the server, optionally switching to a new endpoint first
    ///
    /// Any existing connection is closed before the new one is opened.
    pub fn connect(&mut self, endpoint: Option<&str>) -> Result<()> {
        let span = self.span.clone();
        let _enter = span.enter();

        if let Some(endpoint) = endpoint {
            Endpoint::parse(endpoint)?;
            self.config.endpoint = endpoint.to_string();
        }
        let endpoint = Endpoint::parse(&self.config.endpoint)?;

        if self.session.take().is_some() {
            tracing::debug!("Closing previous connection");
        }

        tracing::info!("Connecting to server at {}", endpoint);
        let session = Session::connect(&endpoint, self.config.timeout())?;
        tracing::info!(
            "Connected to server at {} (reply timeout {:?}).",
            session.endpoint(),
            session.timeout()
        );
        self.session = Some(session);

        Ok(())
    }

    /// Close the connection; returns whether one was open
    pub fn disconnect(&mut self) -> bool {
        let was_open = self.session.take().is_some();
        if was_open {
            let _enter = self.span.enter();
            tracing::info!("Disconnected from {}", self.config.endpoint);
        }
        was_open
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Endpoint used by the next `connect(None)`
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // =========================================================================
    // Generic request-reply
    // =========================================================================

    /// Perform one request-reply exchange
    ///
    /// Fails with `NotConnected` (no I/O) when there is no open connection.
    /// A timeout closes the connection.
    pub fn send_request(&mut self, request: Request) -> Result<Reply> {
        let span = self.span.clone();
        let _enter = span.enter();

        let session = match self.session.take() {
            Some(session) => session,
            None => {
                tracing::warn!("Connection has not been opened or is closed; aborting.");
                return Err(GuideError::NotConnected);
            }
        };

        tracing::debug!("Sending request {} {:?}", request.code(), request.args());
        let pending = session.send(&request).map_err(log_exchange_failure)?;
        tracing::debug!("Request sent. Awaiting {} reply...", pending.code());

        let (session, reply) = pending.wait().map_err(log_exchange_failure)?;
        self.session = Some(session);

        tracing::info!("Reply received for {}: {:?}", request.code(), reply.payload());
        Ok(reply)
    }

    // =========================================================================
    // MEM-GR operations
    // =========================================================================

    /// IDN: server identification
    pub fn identify(&mut self) -> Result<Vec<String>> {
        let reply = self.send_request(Request::new(CommandCode::Idn))?;
        Ok(reply.into_payload())
    }

    /// ADD: queue a serialized measurement
    pub fn add(&mut self, record: &str) -> Result<Vec<String>> {
        let reply = self.send_request(Request::new(CommandCode::Add).arg(record))?;
        Ok(reply.into_payload())
    }

    pub fn add_record(&mut self, record: &MeasurementRecord) -> Result<Vec<String>> {
        self.add(record.as_str())
    }

    /// Load a measurement from a JSON file and queue it
    pub fn add_from_file(&mut self, path: impl AsRef<Path>) -> Result<Vec<String>> {
        let path = path.as_ref();
        {
            let _enter = self.span.enter();
            tracing::debug!("Loading measurement from file: {}", path.display());
        }
        let record = MeasurementRecord::from_file(path)?;
        self.add_record(&record)
    }

    /// RMV with already-resolved absolute indices
    ///
    /// `None` sends the bare header, which asks the server to apply its
    /// default removal policy.
    pub fn send_remove(&mut self, indices: Option<&[usize]>) -> Result<Vec<String>> {
        let mut request = Request::new(CommandCode::Rmv);
        if let Some(indices) = indices {
            request = request.arg(serde_json::to_string(indices)?);
        }
        let reply = self.send_request(request)?;
        Ok(reply.into_payload())
    }

    /// RMV by index specifiers, resolved against the current queue length
    ///
    /// An empty specifier list requests the server's default removal.
    pub fn remove(&mut self, specifiers: &[IndexSpecifier]) -> Result<RemovalOutcome> {
        let queue_len = self.queue_len()?;

        let span = self.span.clone();
        let _enter = span.enter();

        let resolution = match resolve(specifiers, queue_len) {
            Ok(resolution) => resolution,
            Err(GuideError::EmptyQueue) => {
                tracing::warn!("Measurement queue is empty; cannot remove.");
                return Ok(RemovalOutcome::EmptyQueue);
            }
            Err(e) => return Err(e),
        };

        for error in &resolution.errors {
            tracing::warn!("Skipping index specifier {}", error);
        }

        if !specifiers.is_empty() && resolution.is_empty() {
            tracing::warn!("No index specifier selected a queued measurement; nothing removed.");
            return Ok(RemovalOutcome::NothingResolved {
                errors: resolution.errors,
            });
        }

        let indices = (!specifiers.is_empty()).then_some(resolution.indices.as_slice());
        let reply = self.send_remove(indices)?;
        tracing::info!("Successfully removed indices {:?}", reply);

        Ok(RemovalOutcome::Removed {
            requested: resolution.indices,
            reply,
            errors: resolution.errors,
        })
    }

    /// QUE: serialized records currently queued, in queue order
    pub fn query(&mut self) -> Result<Vec<String>> {
        let reply = self.send_request(Request::new(CommandCode::Que))?;
        Ok(reply.into_payload())
    }

    /// LEN: number of queued measurements
    pub fn queue_len(&mut self) -> Result<usize> {
        let reply = self.send_request(Request::new(CommandCode::Len))?;
        reply.single_integer("LEN")
    }

    /// FCH with free-text input
    ///
    /// Text that doesn't parse as an integer is sent as a plain query, so the
    /// server state is left unchanged.
    pub fn fetch(&mut self, counter: Option<&str>) -> Result<i64> {
        let counter = counter.and_then(|text| match text.trim().parse::<i64>() {
            Ok(value) => Some(value),
            Err(_) => {
                let _enter = self.span.enter();
                tracing::debug!("Fetch counter {:?} is not an integer; treating as a query", text);
                None
            }
        });

        let mut request = Request::new(CommandCode::Fch);
        if let Some(value) = counter {
            request = request.arg(value.to_string());
        }

        let reply = self.send_request(request)?;
        reply.single_integer("FCH")
    }

    /// FCH query
    pub fn get_fetch_counter(&mut self) -> Result<i64> {
        let counter = self.fetch(None)?;
        let _enter = self.span.enter();
        tracing::info!("Fetch counter is {}", counter);
        Ok(counter)
    }

    /// FCH update; returns the value the server reports afterwards
    pub fn set_fetch_counter(&mut self, value: i64) -> Result<i64> {
        let reply = self.send_request(Request::new(CommandCode::Fch).arg(value.to_string()))?;
        let counter = reply.single_integer("FCH")?;
        let _enter = self.span.enter();
        tracing::info!("Fetch counter set to {}", counter);
        Ok(counter)
    }

    /// Pretty-print the queue contents to `target`; returns the record count
    pub fn dump_queue<W: Write>(&mut self, target: &mut W) -> Result<usize> {
        let records = self.query()?;
        for (index, serialized) in records.iter().enumerate() {
            let record = MeasurementRecord::from_wire(serialized.as_str());
            target.write_all(record.pretty(Some(index)).as_bytes())?;
        }
        target.flush()?;
        Ok(records.len())
    }
}

/// Log why an exchange invalidated the connection
fn log_exchange_failure(err: GuideError) -> GuideError {
    match &err {
        GuideError::Timeout { .. } => {
            tracing::warn!("Request timeout; no reply received.");
            tracing::warn!("Connection closed; needs to be reconnected.");
        }
        other => {
            tracing::warn!("Exchange failed ({}); connection closed, needs to be reconnected.", other);
        }
    }
    err
}
