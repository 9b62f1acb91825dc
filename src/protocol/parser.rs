//! Command parser
//!
//! Turns one request line into a [`Command`].
//!
//! Tokens are separated by ASCII whitespace and verbs are lowercase. The
//! value of a `set` is everything after the key, so it may contain spaces.
//!
//! Bytes that read back as a status line (`OK`, `NIL`, `BYE`, `ERR ...`)
//! cannot be stored, neither as a value nor as a key, so that `get` and
//! `list` replies stay unambiguous.

use crate::error::{KnowsqlError, Result};
use super::codec::is_reserved;
use super::Command;

/// Parse a single request line
///
/// A trailing `\n` or `\r\n` is ignored if still present.
pub fn parse_command(line: &[u8]) -> Result<Command> {
    let line = strip_terminator(line);
    let (verb, args) = next_token(line);

    if verb.is_empty() {
        return Err(protocol("empty command"));
    }

    match verb {
        b"set" => {
            let (key, rest) = next_token(args);
            if key.is_empty() {
                return Err(protocol("missing key for 'set'"));
            }
            let value = trim_start(rest);
            if value.is_empty() {
                return Err(protocol("missing value for 'set'"));
            }
            if is_reserved(key) {
                return Err(protocol("reserved key"));
            }
            if is_reserved(value) {
                return Err(protocol("reserved value"));
            }
            Ok(Command::Set {
                key: key.to_vec(),
                value: value.to_vec(),
            })
        }
        b"get" => single_key("get", args).map(|key| Command::Get { key }),
        b"del" => single_key("del", args).map(|key| Command::Delete { key }),
        b"incr" => {
            let key = single_key("incr", args)?;
            if is_reserved(&key) {
                return Err(protocol("reserved key"));
            }
            Ok(Command::Incr { key })
        }
        b"list" => no_args("list", args).map(|_| Command::List),
        b"ping" => no_args("ping", args).map(|_| Command::Ping),
        b"exit" => no_args("exit", args).map(|_| Command::Exit),
        other => Err(KnowsqlError::Protocol(format!(
            "unknown command '{}'",
            String::from_utf8_lossy(other)
        ))),
    }
}

fn single_key(verb: &str, args: &[u8]) -> Result<Vec<u8>> {
    let (key, rest) = next_token(args);
    if key.is_empty() {
        return Err(KnowsqlError::Protocol(format!("missing key for '{}'", verb)));
    }
    if !trim_start(rest).is_empty() {
        return Err(wrong_arity(verb));
    }
    Ok(key.to_vec())
}

fn no_args(verb: &str, args: &[u8]) -> Result<()> {
    if trim_start(args).is_empty() {
        Ok(())
    } else {
        Err(wrong_arity(verb))
    }
}

fn wrong_arity(verb: &str) -> KnowsqlError {
    KnowsqlError::Protocol(format!("wrong number of arguments for '{}'", verb))
}

fn protocol(reason: &str) -> KnowsqlError {
    KnowsqlError::Protocol(reason.to_string())
}

/// Split off the first whitespace-delimited token
///
/// Returns `(token, remainder)`; the remainder starts at the whitespace
/// following the token.
fn next_token(input: &[u8]) -> (&[u8], &[u8]) {
    let input = trim_start(input);
    let end = input
        .iter()
        .position(|b| b.is_ascii_whitespace())
        .unwrap_or(input.len());
    input.split_at(end)
}

fn trim_start(input: &[u8]) -> &[u8] {
    let start = input
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(input.len());
    &input[start..]
}

pub(crate) fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
