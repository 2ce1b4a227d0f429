//! Transcoder command construction
//!
//! Turns a stream's declarative configuration into the flat, ordered
//! argument list the external transcoder is invoked with. Building a
//! command never touches shared state: identical inputs always produce a
//! byte-identical argument list, so a failed start can be retried or
//! diffed against a previous invocation.

mod builder;
mod error;

pub use builder::{build_stream_command, parse_resolution};
pub use error::CommandError;
