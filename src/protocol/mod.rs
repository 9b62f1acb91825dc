//! Protocol Module
//!
//! Defines the line-oriented text protocol spoken over TCP.
//!
//! ## Requests
//! ```text
//! set <key> <value...>   -> OK
//! get <key>              -> <value> | NIL
//! del <key>              -> OK | NIL
//! incr <key>             -> <new integer>
//! list                   -> <key> <key> ...
//! ping                   -> PONG
//! exit                   -> BYE (connection closes)
//! ```
//!
//! Any failure is reported as `ERR <reason>` and the connection stays open.
//! Values and keys that look like a status line are refused with
//! `ERR reserved value` / `ERR reserved key`.

mod command;
mod response;
mod parser;
mod codec;

pub use command::Command;
pub use response::Response;
pub use parser::parse_command;
pub use codec::{
    decode_response, encode_command, encode_response, is_reserved, read_line, read_response,
    write_command, write_response, BYE_TOKEN, ERROR_TOKEN, NOT_FOUND_TOKEN, OK_TOKEN,
};
