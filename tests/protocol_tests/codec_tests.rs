//! Codec Tests
//!
//! Tests for the MEM-GR envelope and ZMTP framing.

use std::io::Cursor;
use std::net::{TcpListener, TcpStream};
use std::thread;

use bytes::BytesMut;
use guideclient::protocol::{
    decode_fields, decode_greeting, decode_ready, encode_frame, encode_greeting, encode_message,
    encode_ready, flags, handshake, read_frame, read_message, write_message, CommandCode, Reply,
    Request, SocketType, GREETING_SIZE, MAX_MESSAGE_FRAMES, PROTOCOL_ID,
};
use guideclient::GuideError;

// =============================================================================
// Envelope Tests
// =============================================================================

#[test]
fn test_request_envelope() {
    let request = Request::new(CommandCode::Fch).arg("10");
    assert_eq!(request.to_fields(), vec!["MEM-GR/0.1", "FCH", "10"]);
}

#[test]
fn test_request_without_args() {
    let request = Request::new(CommandCode::Idn);
    assert_eq!(request.to_fields(), vec![PROTOCOL_ID, "IDN"]);
}

#[test]
fn test_request_from_fields() {
    let fields = vec!["MEM-GR/0.1".to_string(), "RMV".to_string(), "[1,2]".to_string()];
    let request = Request::from_fields(fields).unwrap();

    assert_eq!(request.code(), CommandCode::Rmv);
    assert_eq!(request.args(), ["[1,2]".to_string()]);
}

#[test]
fn test_request_from_fields_errors() {
    assert!(Request::from_fields(vec![]).is_err());
    assert!(Request::from_fields(vec!["MEM-GR/0.1".to_string()]).is_err());
    assert!(Request::from_fields(vec!["HTTP/1.1".to_string(), "IDN".to_string()]).is_err());

    let result = Request::from_fields(vec!["MEM-GR/0.1".to_string(), "XYZ".to_string()]);
    assert!(result.unwrap_err().to_string().contains("Unknown command header"));
}

#[test]
fn test_command_codes() {
    for code in [
        CommandCode::Idn,
        CommandCode::Add,
        CommandCode::Rmv,
        CommandCode::Que,
        CommandCode::Len,
        CommandCode::Fch,
    ] {
        assert_eq!(code.as_str().len(), 3);
        assert_eq!(code.as_str().parse::<CommandCode>().unwrap(), code);
    }
}

#[test]
fn test_reply_strips_protocol() {
    let fields = vec!["MEM-GR/0.1".to_string(), "a".to_string(), "b".to_string()];
    let reply = Reply::from_fields(fields).unwrap();

    assert_eq!(reply.protocol(), "MEM-GR/0.1");
    assert_eq!(reply.payload(), ["a".to_string(), "b".to_string()]);
}

#[test]
fn test_empty_reply_is_violation() {
    let result = Reply::from_fields(vec![]);
    assert!(matches!(result, Err(GuideError::ProtocolViolation(_))));
}

#[test]
fn test_reply_single_integer() {
    assert_eq!(Reply::new(["42"]).single_integer::<usize>("LEN").unwrap(), 42);
    assert_eq!(Reply::new([" 7 "]).single_integer::<i64>("FCH").unwrap(), 7);

    assert!(Reply::new(["forty"]).single_integer::<usize>("LEN").is_err());
    assert!(Reply::new(["-1"]).single_integer::<usize>("LEN").is_err());
    assert!(Reply::new(["1", "2"]).single_integer::<usize>("LEN").is_err());
    assert!(Reply::new(Vec::<String>::new()).single_integer::<usize>("LEN").is_err());
}

// =============================================================================
// Greeting Tests
// =============================================================================

#[test]
fn test_greeting_layout() {
    let greeting = encode_greeting();

    assert_eq!(greeting.len(), GREETING_SIZE);
    assert_eq!(greeting[0], 0xFF);
    assert_eq!(&greeting[1..9], &[0u8; 8]);
    assert_eq!(greeting[9], 0x7F);
    assert_eq!(&greeting[10..12], &[3, 0]);
    assert_eq!(&greeting[12..16], b"NULL");
    assert!(greeting[16..].iter().all(|&b| b == 0));

    decode_greeting(&greeting).unwrap();
}

#[test]
fn test_greeting_accepts_newer_minor() {
    let mut greeting = encode_greeting();
    greeting[11] = 1;
    decode_greeting(&greeting).unwrap();
}

#[test]
fn test_greeting_rejects_bad_signature() {
    let mut greeting = encode_greeting();
    greeting[0] = 0x00;
    assert!(matches!(decode_greeting(&greeting), Err(GuideError::Handshake(_))));
}

#[test]
fn test_greeting_rejects_old_version() {
    let mut greeting = encode_greeting();
    greeting[10] = 2;
    assert!(matches!(decode_greeting(&greeting), Err(GuideError::Handshake(_))));
}

#[test]
fn test_greeting_rejects_curve() {
    let mut greeting = encode_greeting();
    greeting[12..17].copy_from_slice(b"CURVE");
    let err = decode_greeting(&greeting).unwrap_err();
    assert!(err.to_string().contains("CURVE"));
}

#[test]
fn test_greeting_too_short() {
    assert!(decode_greeting(&[0xFF; 10]).is_err());
}

// =============================================================================
// READY Command Tests
// =============================================================================

#[test]
fn test_ready_wire_format() {
    let bytes = encode_ready(SocketType::Req);

    // [0x04][size][0x05 READY][0x0B Socket-Type][00 00 00 03 REQ]
    assert_eq!(bytes[0], flags::COMMAND);
    assert_eq!(bytes[1] as usize, bytes.len() - 2);
    assert_eq!(&bytes[2..8], b"\x05READY");
    assert_eq!(&bytes[8..20], b"\x0BSocket-Type");
    assert_eq!(&bytes[20..24], &[0, 0, 0, 3]);
    assert_eq!(&bytes[24..], b"REQ");
}

#[test]
fn test_ready_round_trip() {
    let bytes = encode_ready(SocketType::Rep);
    let frame = read_frame(&mut Cursor::new(bytes.to_vec())).unwrap();

    assert!(frame.is_command());
    assert_eq!(decode_ready(&frame.body).unwrap(), SocketType::Rep);
}

#[test]
fn test_ready_with_extra_properties() {
    let mut body = b"\x05READY".to_vec();
    body.extend_from_slice(b"\x08Identity\x00\x00\x00\x02id");
    body.extend_from_slice(b"\x0Bsocket-type\x00\x00\x00\x06ROUTER");

    assert_eq!(decode_ready(&body).unwrap(), SocketType::Router);
}

#[test]
fn test_ready_errors() {
    // Missing Socket-Type
    assert!(decode_ready(b"\x05READY").is_err());
    // Truncated value
    assert!(decode_ready(b"\x05READY\x0BSocket-Type\x00\x00\x00\x09REQ").is_err());
    // Peer ERROR command
    let err = decode_ready(b"\x05ERROR\x06denied").unwrap_err();
    assert!(err.to_string().contains("denied"));
}

#[test]
fn test_socket_compatibility() {
    assert!(SocketType::Req.is_compatible(SocketType::Rep));
    assert!(SocketType::Req.is_compatible(SocketType::Router));
    assert!(!SocketType::Req.is_compatible(SocketType::Req));
    assert!(!SocketType::Req.is_compatible(SocketType::Dealer));
}

// =============================================================================
// Frame Tests
// =============================================================================

#[test]
fn test_short_frame() {
    let mut buf = BytesMut::new();
    encode_frame(&mut buf, flags::MORE, b"hi");

    assert_eq!(&buf[..], &[flags::MORE, 2, b'h', b'i']);
}

#[test]
fn test_long_frame() {
    let body = vec![0xAB; 300];
    let mut buf = BytesMut::new();
    encode_frame(&mut buf, 0, &body);

    assert_eq!(buf[0], flags::LONG);
    assert_eq!(&buf[1..9], &300u64.to_be_bytes());
    assert_eq!(buf.len(), 9 + 300);

    let frame = read_frame(&mut Cursor::new(buf.to_vec())).unwrap();
    assert_eq!(frame.body, body);
    assert!(!frame.has_more());
}

#[test]
fn test_frame_boundary_255() {
    let mut buf = BytesMut::new();
    encode_frame(&mut buf, 0, &[1u8; 255]);
    assert_eq!(buf[0], 0);
    assert_eq!(buf[1], 255);
}

#[test]
fn test_reserved_flags_rejected() {
    let result = read_frame(&mut Cursor::new(vec![0x80, 0x00]));
    assert!(matches!(result, Err(GuideError::ProtocolViolation(_))));
}

#[test]
fn test_oversized_frame_rejected() {
    let mut bytes = vec![flags::LONG];
    bytes.extend_from_slice(&(64u64 * 1024 * 1024).to_be_bytes());
    let result = read_frame(&mut Cursor::new(bytes));
    assert!(result.unwrap_err().to_string().contains("too large"));
}

#[test]
fn test_truncated_frame() {
    let result = read_frame(&mut Cursor::new(vec![0x00, 0x05, b'a']));
    assert!(matches!(result, Err(GuideError::Io(_))));
}

// =============================================================================
// Message Tests
// =============================================================================

#[test]
fn test_message_wire_format() {
    let encoded = encode_message(&["MEM-GR/0.1", "LEN"]);

    // [MORE 0][MORE 10 MEM-GR/0.1][0 3 LEN]
    assert_eq!(&encoded[0..2], &[flags::MORE, 0]);
    assert_eq!(&encoded[2..4], &[flags::MORE, 10]);
    assert_eq!(&encoded[4..14], b"MEM-GR/0.1");
    assert_eq!(&encoded[14..16], &[0, 3]);
    assert_eq!(&encoded[16..], b"LEN");
}

#[test]
fn test_message_round_trip() {
    let long = "x".repeat(1000);
    let fields = vec![
        "MEM-GR/0.1".to_string(),
        "ADD".to_string(),
        String::new(),
        "µ-sweep ✓".to_string(),
        long,
    ];

    let mut buffer = Vec::new();
    write_message(&mut buffer, &fields).unwrap();

    let parts = read_message(&mut Cursor::new(buffer)).unwrap();
    assert_eq!(decode_fields(parts).unwrap(), fields);
}

#[test]
fn test_stream_multiple_messages() {
    let messages = vec![
        Request::new(CommandCode::Len).to_fields(),
        Request::new(CommandCode::Add).arg("{}").to_fields(),
        Reply::new(["3"]).to_fields(),
    ];

    let mut buffer = Vec::new();
    for message in &messages {
        write_message(&mut buffer, message).unwrap();
    }

    let mut cursor = Cursor::new(buffer);
    for expected in &messages {
        let parts = read_message(&mut cursor).unwrap();
        assert_eq!(&decode_fields(parts).unwrap(), expected);
    }
}

#[test]
fn test_message_skips_leading_command() {
    let mut buffer = Vec::new();
    let mut ping = BytesMut::new();
    encode_frame(&mut ping, flags::COMMAND, b"\x04PING\x00\x00");
    buffer.extend_from_slice(&ping);
    buffer.extend_from_slice(&encode_message(&["MEM-GR/0.1", "ok"]));

    let parts = read_message(&mut Cursor::new(buffer)).unwrap();
    assert_eq!(decode_fields(parts).unwrap(), vec!["MEM-GR/0.1", "ok"]);
}

#[test]
fn test_message_missing_delimiter() {
    let mut buf = BytesMut::new();
    encode_frame(&mut buf, 0, b"MEM-GR/0.1");

    let result = read_message(&mut Cursor::new(buf.to_vec()));
    assert!(result.unwrap_err().to_string().contains("delimiter"));
}

#[test]
fn test_message_frame_count_limit() {
    // Delimiter plus empty MORE frames, one past the limit
    let mut buffer = Vec::new();
    for _ in 0..MAX_MESSAGE_FRAMES {
        buffer.extend_from_slice(&[flags::MORE, 0]);
    }
    buffer.extend_from_slice(&[0, 0]);

    let result = read_message(&mut Cursor::new(buffer));
    assert!(result.unwrap_err().to_string().contains("too many frames"));
}

#[test]
fn test_message_at_frame_count_limit() {
    let mut buffer = Vec::new();
    for _ in 0..MAX_MESSAGE_FRAMES - 1 {
        buffer.extend_from_slice(&[flags::MORE, 0]);
    }
    buffer.extend_from_slice(&[0, 0]);

    let parts = read_message(&mut Cursor::new(buffer)).unwrap();
    assert_eq!(parts.len(), MAX_MESSAGE_FRAMES - 1);
}

#[test]
fn test_invalid_utf8_field() {
    let result = decode_fields(vec![b"ok".to_vec(), vec![0xFF, 0xFE]]);
    let err = result.unwrap_err();
    assert!(err.to_string().contains("Field 1"));
}

// =============================================================================
// Handshake Tests
// =============================================================================

fn socket_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
    let (server, _) = listener.accept().unwrap();
    (client, server)
}

#[test]
fn test_handshake_req_rep() {
    let (mut client, mut server) = socket_pair();

    let peer = thread::spawn(move || handshake(&mut server, SocketType::Rep).unwrap());

    assert_eq!(handshake(&mut client, SocketType::Req).unwrap(), SocketType::Rep);
    assert_eq!(peer.join().unwrap(), SocketType::Req);
}

#[test]
fn test_handshake_rejects_incompatible_peer() {
    let (mut client, mut server) = socket_pair();

    let peer = thread::spawn(move || handshake(&mut server, SocketType::Req));

    let result = handshake(&mut client, SocketType::Req);
    assert!(matches!(result, Err(GuideError::Handshake(_))));
    assert!(peer.join().unwrap().is_err());
}
