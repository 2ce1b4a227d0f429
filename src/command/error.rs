//! Command builder error types

use thiserror::Error;

/// Validation failures while constructing a transcoder command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The source (or destination) cannot possibly produce a working command
    #[error("invalid source: {0}")]
    InvalidSource(String),

    /// A resolution option that is not of the form `WIDTHxHEIGHT`
    #[error("malformed resolution '{0}', expected WIDTHxHEIGHT")]
    MalformedResolution(String),
}
