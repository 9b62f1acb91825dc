//! Protocol codec
//!
//! Line framing plus encoding and decoding of requests and responses.
//!
//! ## Wire Format
//!
//! One request per line, one response per line, `\n` terminated (`\r\n`
//! is accepted on input).
//!
//! | Response        | Line                          |
//! |-----------------|-------------------------------|
//! | `Ok`            | `OK`                          |
//! | `Value(v)`      | `v`                           |
//! | `NotFound`      | `NIL`                         |
//! | `Error(reason)` | `ERR reason`                  |
//! | `Keys(ks)`      | keys joined by a single space |
//! | `Bye`           | `BYE`                         |

use std::io::{BufRead, ErrorKind, Read, Write};

use bytes::Bytes;

use crate::error::{KnowsqlError, Result};
use super::parser::strip_terminator;
use super::{Command, Response};

pub const OK_TOKEN: &[u8] = b"OK";
pub const NOT_FOUND_TOKEN: &[u8] = b"NIL";
pub const ERROR_TOKEN: &[u8] = b"ERR";
pub const BYE_TOKEN: &[u8] = b"BYE";

/// Whether `bytes` would decode as a status line rather than a value
///
/// A trailing `\r` is ignored, since readers strip it with the `\n`.
pub fn is_reserved(bytes: &[u8]) -> bool {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    bytes == OK_TOKEN
        || bytes == NOT_FOUND_TOKEN
        || bytes == BYE_TOKEN
        || bytes == ERROR_TOKEN
        || bytes.starts_with(b"ERR ")
}

// =============================================================================
// Framing
// =============================================================================

/// Read one line of at most `max_len` bytes (terminator excluded)
///
/// Returns `Ok(None)` on a clean end of stream. A final line without a
/// terminator is still returned. A longer line fails with
/// [`KnowsqlError::LineTooLong`]; its remaining bytes are left unread.
pub fn read_line<R: BufRead>(reader: &mut R, max_len: usize) -> Result<Option<Vec<u8>>> {
    let mut line = Vec::new();
    // Room for the content, an optional '\r' and the '\n'
    let limit = (max_len as u64).saturating_add(2);
    let read = reader.by_ref().take(limit).read_until(b'\n', &mut line)?;

    if read == 0 {
        return Ok(None);
    }

    let content_len = strip_terminator(&line).len();
    if content_len > max_len {
        return Err(KnowsqlError::LineTooLong { limit: max_len });
    }

    line.truncate(content_len);
    Ok(Some(line))
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response as a terminated line
pub fn encode_response(response: &Response) -> Vec<u8> {
    let mut line = match response {
        Response::Ok => OK_TOKEN.to_vec(),
        Response::Value(value) => value.to_vec(),
        Response::NotFound => NOT_FOUND_TOKEN.to_vec(),
        Response::Error(reason) => {
            let mut line = ERROR_TOKEN.to_vec();
            if !reason.is_empty() {
                line.push(b' ');
                // Keep the reply on one line
                line.extend(reason.bytes().map(|b| if b == b'\n' || b == b'\r' { b' ' } else { b }));
            }
            line
        }
        Response::Keys(keys) => keys.join(&b' '),
        Response::Bye => BYE_TOKEN.to_vec(),
    };
    line.push(b'\n');
    line
}

/// Decode a response line as a client sees it
///
/// The wire format does not tag values, so anything that is not a status
/// token is a value. `list` replies also decode as a value.
pub fn decode_response(line: &[u8]) -> Response {
    let line = strip_terminator(line);
    match line {
        OK_TOKEN => Response::Ok,
        NOT_FOUND_TOKEN => Response::NotFound,
        BYE_TOKEN => Response::Bye,
        _ if line == ERROR_TOKEN => Response::Error(String::new()),
        _ if line.starts_with(b"ERR ") => {
            Response::Error(String::from_utf8_lossy(&line[ERROR_TOKEN.len() + 1..]).into_owned())
        }
        _ => Response::Value(Bytes::copy_from_slice(line)),
    }
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    writer.write_all(&encode_response(response))?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: BufRead>(reader: &mut R, max_len: usize) -> Result<Response> {
    match read_line(reader, max_len)? {
        Some(line) => Ok(decode_response(&line)),
        None => Err(KnowsqlError::Io(std::io::Error::new(
            ErrorKind::UnexpectedEof,
            "server closed the connection",
        ))),
    }
}

// =============================================================================
// Command Encoding
// =============================================================================

/// Encode a command as a terminated request line
pub fn encode_command(command: &Command) -> Vec<u8> {
    let mut line = command.verb().as_bytes().to_vec();
    match command {
        Command::Set { key, value } => {
            line.push(b' ');
            line.extend_from_slice(key);
            line.push(b' ');
            line.extend_from_slice(value);
        }
        Command::Get { key } | Command::Delete { key } | Command::Incr { key } => {
            line.push(b' ');
            line.extend_from_slice(key);
        }
        Command::List | Command::Ping | Command::Exit => {}
    }
    line.push(b'\n');
    line
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    writer.write_all(&encode_command(command))?;
    writer.flush()?;
    Ok(())
}
