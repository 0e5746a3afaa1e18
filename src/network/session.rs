//! Request-reply session
//!
//! One TCP connection speaking ZMTP as a REQ socket. The request-reply
//! discipline is carried by ownership:
//!
//! ```text
//!   Session ──send()──► PendingReply ──wait()──► (Session, Reply)
//!  (Connected)        (Awaiting reply)      │
//!                                           └─ Err: session dropped (Disconnected)
//! ```
//!
//! A `Session` is consumed by `send`, so a second request cannot be issued
//! until the first reply has been received.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use crate::config::Endpoint;
use crate::error::{GuideError, Result};
use crate::protocol::{
    decode_fields, encode_message, handshake, read_message, CommandCode, Reply, Request,
    SocketType,
};

/// An open, idle connection to a MEM-GR server
#[derive(Debug)]
pub struct Session {
    stream: TcpStream,

    endpoint: Endpoint,

    /// Upper bound on each reply wait
    timeout: Duration,
}

impl Session {
    /// Connect and complete the ZMTP handshake
    ///
    /// TCP connect and handshake are both bounded by `timeout`.
    pub fn connect(endpoint: &Endpoint, timeout: Duration) -> Result<Self> {
        let connect_failed = |reason: String| GuideError::ConnectFailed {
            endpoint: endpoint.to_string(),
            reason,
        };

        let addrs: Vec<SocketAddr> = endpoint
            .socket_addr()
            .to_socket_addrs()
            .map_err(|e| connect_failed(e.to_string()))?
            .collect();

        let mut last_error = None;
        let mut connected = None;
        for addr in &addrs {
            match TcpStream::connect_timeout(addr, timeout) {
                Ok(stream) => {
                    connected = Some(stream);
                    break;
                }
                Err(e) => {
                    tracing::debug!("Connect to {} failed: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }

        let stream = match connected {
            Some(stream) => stream,
            None => {
                let reason = last_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no addresses resolved".to_string());
                return Err(connect_failed(reason));
            }
        };

        // Disable Nagle's algorithm; every request is a single small write
        stream
            .set_nodelay(true)
            .map_err(|e| connect_failed(e.to_string()))?;

        let deadline = Instant::now() + timeout;
        let peer = handshake(&mut DeadlineStream::new(&stream, deadline), SocketType::Req)
            .map_err(|e| connect_failed(e.to_string()))?;

        tracing::debug!("ZMTP handshake with {} complete (peer is {})", endpoint, peer.as_str());

        Ok(Self {
            stream,
            endpoint: endpoint.clone(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send a request, handing back the pending reply
    ///
    /// All frames go out in a single write. On failure the session is
    /// dropped and the connection closed.
    pub fn send(self, request: &Request) -> Result<PendingReply> {
        let bytes = encode_message(&request.to_fields());

        let deadline = Instant::now() + self.timeout;
        let mut writer = DeadlineStream::new(&self.stream, deadline);
        writer
            .write_all(&bytes)
            .and_then(|_| writer.flush())
            .map_err(|e| self.classify(e))?;

        Ok(PendingReply {
            code: request.code(),
            deadline: Instant::now() + self.timeout,
            session: self,
        })
    }

    /// Map a transport error to the client taxonomy
    fn classify(&self, err: io::Error) -> GuideError {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => GuideError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            },
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => GuideError::ConnectionClosed,
            _ => GuideError::Io(err),
        }
    }
}

/// A request that has been sent and whose reply has not yet been read
#[must_use = "the reply must be awaited before the session can be reused"]
#[derive(Debug)]
pub struct PendingReply {
    session: Session,
    code: CommandCode,
    deadline: Instant,
}

impl PendingReply {
    /// Command the reply belongs to
    pub fn code(&self) -> CommandCode {
        self.code
    }

    /// Block until the reply arrives or the deadline passes
    ///
    /// On success the session is handed back for the next request. On any
    /// failure (timeout, peer gone, malformed framing) it is dropped, which
    /// closes the connection.
    pub fn wait(self) -> Result<(Session, Reply)> {
        let mut reader = DeadlineStream::new(&self.session.stream, self.deadline);

        let parts = match read_message(&mut reader) {
            Ok(parts) => parts,
            Err(GuideError::Io(e)) => return Err(self.session.classify(e)),
            Err(e) => return Err(e),
        };

        let reply = Reply::from_fields(decode_fields(parts)?)?;
        Ok((self.session, reply))
    }
}

// =============================================================================
// Deadline-bounded I/O
// =============================================================================

/// Stream adapter that bounds every read and write by one absolute deadline
///
/// Socket timeouts apply per call; re-arming them with the remaining time
/// turns a multi-read message into a single bounded wait.
struct DeadlineStream<'a> {
    stream: &'a TcpStream,
    deadline: Instant,
}

impl<'a> DeadlineStream<'a> {
    fn new(stream: &'a TcpStream, deadline: Instant) -> Self {
        Self { stream, deadline }
    }

    fn remaining(&self) -> io::Result<Duration> {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "deadline elapsed"));
        }
        Ok(remaining)
    }
}

impl Read for DeadlineStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.remaining()?;
        self.stream.set_read_timeout(Some(remaining))?;
        let mut stream = self.stream;
        stream.read(buf)
    }
}

impl Write for DeadlineStream<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let remaining = self.remaining()?;
        self.stream.set_write_timeout(Some(remaining))?;
        let mut stream = self.stream;
        stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut stream = self.stream;
        stream.flush()
    }
}
