//! Codec for the engine's line-oriented scripting protocol.
//!
//! This crate is pure: it builds single-line command strings and parses
//! response text into typed values, but performs no I/O. The pieces:
//! - `RemotePath` - dotted/bracketed addresses into the remote object tree
//! - `Command` / `Arg` - command construction and value encoding
//! - `Value` + decoding - the `RETVAL:` envelope, scalar classification
//!   and the bracketed matrix label grammar
//! - `NodeSchema` - introspection (`help`) text parsed into node shapes

pub mod command;
pub mod decode;
pub mod error;
pub mod path;
pub mod schema;
pub mod value;

pub use command::{Arg, Command};
pub use decode::{decode_body, decode_response, strip_envelope, EMPTY_MARKER};
pub use error::ProtocolError;
pub use path::RemotePath;
pub use schema::{parse_help, ChildDesc, NodeSchema, NodeType};
pub use value::{classify, Value};
