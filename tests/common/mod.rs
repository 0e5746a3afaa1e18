//! Test support: an in-process MEM-GR server speaking ZMTP as a REP socket

#![allow(dead_code)]

use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use guideclient::protocol::{
    decode_fields, handshake, read_message, write_message, CommandCode, Reply, Request,
    SocketType,
};
use guideclient::ClientConfig;

/// What the server does with a request
pub enum Action {
    /// Answer normally
    Reply(Reply),
    /// Write these bytes as the answer, bypassing the message encoder
    Raw(Vec<u8>),
    /// Never answer on this connection
    Silent,
    /// Drop the connection without answering
    Close,
}

/// Decides the action for each request
pub type Responder = Box<dyn FnMut(&Request) -> Action + Send>;

/// A REP server on 127.0.0.1 handling one connection at a time
pub struct MockServer {
    endpoint: String,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl MockServer {
    pub fn start(mut responder: Responder) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                serve_connection(stream, &mut responder, &seen);
            }
        });

        Self {
            endpoint: format!("tcp://127.0.0.1:{}", port),
            requests,
        }
    }

    /// A server backed by an in-memory queue
    pub fn with_queue(queue: Vec<&str>, fetch_counter: i64) -> Self {
        let mut state = QueueState {
            queue: queue.into_iter().map(String::from).collect(),
            fetch_counter,
        };
        Self::start(Box::new(move |request| Action::Reply(state.handle(request))))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn config(&self, timeout_ms: u64) -> ClientConfig {
        ClientConfig::builder()
            .endpoint(&self.endpoint)
            .timeout_ms(timeout_ms)
            .build()
            .unwrap()
    }

    /// Every request received so far, in order
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn codes(&self) -> Vec<CommandCode> {
        self.requests().iter().map(|r| r.code()).collect()
    }
}

fn serve_connection(
    mut stream: TcpStream,
    responder: &mut Responder,
    seen: &Arc<Mutex<Vec<Request>>>,
) {
    if handshake(&mut stream, SocketType::Rep).is_err() {
        return;
    }

    let mut answering = true;
    loop {
        let parts = match read_message(&mut stream) {
            Ok(parts) => parts,
            Err(_) => return,
        };
        let request = Request::from_fields(decode_fields(parts).unwrap()).unwrap();
        seen.lock().unwrap().push(request.clone());

        if !answering {
            continue;
        }
        let written = match responder(&request) {
            Action::Reply(reply) => write_message(&mut stream, &reply.to_fields()).is_ok(),
            Action::Raw(bytes) => stream.write_all(&bytes).is_ok(),
            // A REP socket that never replies; keep draining until the peer leaves
            Action::Silent => {
                answering = false;
                true
            }
            Action::Close => return,
        };
        if !written {
            return;
        }
    }
}

/// Minimal server-side queue model
struct QueueState {
    queue: Vec<String>,
    fetch_counter: i64,
}

impl QueueState {
    fn handle(&mut self, request: &Request) -> Reply {
        match request.code() {
            CommandCode::Idn => Reply::new(["MockMEM", "0.1"]),
            CommandCode::Add => {
                let record = request.args().first().cloned().unwrap_or_default();
                self.queue.push(record);
                Reply::new(["OK"])
            }
            CommandCode::Rmv => {
                let mut indices: Vec<usize> = match request.args().first() {
                    Some(arg) => serde_json::from_str(arg).unwrap(),
                    None if self.queue.is_empty() => vec![],
                    None => vec![0],
                };
                indices.sort_unstable_by(|a, b| b.cmp(a));
                let mut removed = Vec::new();
                for index in indices {
                    if index < self.queue.len() {
                        self.queue.remove(index);
                        removed.push(index.to_string());
                    }
                }
                removed.reverse();
                Reply::new(removed)
            }
            CommandCode::Que => Reply::new(self.queue.clone()),
            CommandCode::Len => Reply::new([self.queue.len().to_string()]),
            CommandCode::Fch => {
                if let Some(arg) = request.args().first() {
                    self.fetch_counter = arg.parse().unwrap();
                }
                Reply::new([self.fetch_counter.to_string()])
            }
        }
    }
}
