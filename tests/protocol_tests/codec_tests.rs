//! Codec Tests
//!
//! Tests verify:
//! - Response lines for every response kind
//! - Client-side decoding of response lines
//! - Line framing limits
//! - Request encoding parses back on the server side

use std::io::{BufReader, Cursor};

use bytes::Bytes;
use knowsql::protocol::{
    decode_response, encode_command, encode_response, is_reserved, parse_command, read_line,
    read_response, write_response, Command, Response,
};
use knowsql::KnowsqlError;

// =============================================================================
// Response Encoding Tests
// =============================================================================

#[test]
fn test_encode_status_responses() {
    assert_eq!(encode_response(&Response::Ok), b"OK\n");
    assert_eq!(encode_response(&Response::NotFound), b"NIL\n");
    assert_eq!(encode_response(&Response::Bye), b"BYE\n");
}

#[test]
fn test_encode_value() {
    assert_eq!(
        encode_response(&Response::value("hello world")),
        b"hello world\n"
    );
}

#[test]
fn test_encode_error() {
    assert_eq!(
        encode_response(&Response::error("unknown command 'x'")),
        b"ERR unknown command 'x'\n"
    );
    assert_eq!(encode_response(&Response::error("")), b"ERR\n");
}

#[test]
fn test_encode_error_stays_on_one_line() {
    assert_eq!(
        encode_response(&Response::error("line one\nline two")),
        b"ERR line one line two\n"
    );
}

#[test]
fn test_encode_keys() {
    let keys = Response::Keys(vec![Bytes::from_static(b"a"), Bytes::from_static(b"bc")]);
    assert_eq!(encode_response(&keys), b"a bc\n");

    assert_eq!(encode_response(&Response::Keys(Vec::new())), b"\n");
}

// =============================================================================
// Response Decoding Tests
// =============================================================================

#[test]
fn test_decode_responses() {
    assert_eq!(decode_response(b"OK\n"), Response::Ok);
    assert_eq!(decode_response(b"NIL"), Response::NotFound);
    assert_eq!(decode_response(b"BYE\r\n"), Response::Bye);
    assert_eq!(decode_response(b"ERR server busy\n"), Response::error("server busy"));
    assert_eq!(decode_response(b"ERR"), Response::error(""));
    assert_eq!(decode_response(b"world\n"), Response::value("world"));
}

#[test]
fn test_decode_err_prefix_needs_space() {
    assert_eq!(decode_response(b"ERRATA"), Response::value("ERRATA"));
}

#[test]
fn test_every_storable_value_decodes_as_value() {
    for value in [&b"world"[..], b"nil", b"OKAY", b"ERRATA", b"BYEBYE", b"NIL NIL"] {
        assert!(!is_reserved(value));
        let line = encode_response(&Response::Value(Bytes::copy_from_slice(value)));
        assert_eq!(decode_response(&line), Response::Value(Bytes::copy_from_slice(value)));
    }
}

#[test]
fn test_status_lines_are_reserved() {
    for token in [&b"OK"[..], b"NIL", b"BYE", b"ERR", b"ERR busy", b"NIL\r"] {
        assert!(is_reserved(token), "{:?} not reserved", token);
    }
}

#[test]
fn test_read_response_from_stream() {
    let mut buf = Vec::new();
    write_response(&mut buf, &Response::value("v")).unwrap();
    write_response(&mut buf, &Response::NotFound).unwrap();
    let mut reader = BufReader::new(Cursor::new(buf));

    assert_eq!(read_response(&mut reader, 1024).unwrap(), Response::value("v"));
    assert_eq!(read_response(&mut reader, 1024).unwrap(), Response::NotFound);

    let eof = read_response(&mut reader, 1024);
    assert!(matches!(eof, Err(KnowsqlError::Io(_))));
}

// =============================================================================
// Framing Tests
// =============================================================================

#[test]
fn test_read_line_strips_terminators() {
    let mut reader = BufReader::new(Cursor::new(b"get a\r\nget b\nlast".to_vec()));

    assert_eq!(read_line(&mut reader, 64).unwrap(), Some(b"get a".to_vec()));
    assert_eq!(read_line(&mut reader, 64).unwrap(), Some(b"get b".to_vec()));
    assert_eq!(read_line(&mut reader, 64).unwrap(), Some(b"last".to_vec()));
    assert_eq!(read_line(&mut reader, 64).unwrap(), None);
}

#[test]
fn test_read_line_at_limit() {
    let mut reader = BufReader::new(Cursor::new(b"abcd\r\n".to_vec()));

    assert_eq!(read_line(&mut reader, 4).unwrap(), Some(b"abcd".to_vec()));
}

#[test]
fn test_read_line_too_long() {
    let mut reader = BufReader::new(Cursor::new(b"abcdefgh\n".to_vec()));

    let result = read_line(&mut reader, 4);

    assert!(matches!(result, Err(KnowsqlError::LineTooLong { limit: 4 })));
}

#[test]
fn test_read_line_unbounded_limit() {
    let mut reader = BufReader::new(Cursor::new(b"get k\n".to_vec()));

    assert_eq!(read_line(&mut reader, usize::MAX).unwrap(), Some(b"get k".to_vec()));
}

#[test]
fn test_read_line_too_long_without_terminator() {
    let mut reader = BufReader::new(Cursor::new(vec![b'x'; 100]));

    assert!(matches!(
        read_line(&mut reader, 10),
        Err(KnowsqlError::LineTooLong { .. })
    ));
}

// =============================================================================
// Command Encoding Tests
// =============================================================================

#[test]
fn test_encode_command_lines() {
    let set = Command::Set {
        key: b"k".to_vec(),
        value: b"two words".to_vec(),
    };
    assert_eq!(encode_command(&set), b"set k two words\n");
    assert_eq!(encode_command(&Command::Delete { key: b"k".to_vec() }), b"del k\n");
    assert_eq!(encode_command(&Command::List), b"list\n");
}

#[test]
fn test_encoded_commands_parse_back() {
    let commands = [
        Command::Set {
            key: b"greeting".to_vec(),
            value: b"hello there".to_vec(),
        },
        Command::Get { key: b"greeting".to_vec() },
        Command::Incr { key: b"n".to_vec() },
        Command::Ping,
        Command::Exit,
    ];

    for command in commands {
        assert_eq!(parse_command(&encode_command(&command)).unwrap(), command);
    }
}
