//! Registry error types

use thiserror::Error;

use crate::command::CommandError;
use crate::persist::PersistError;
use crate::supervisor::SpawnError;

/// Error type for registry operations
///
/// Every failure is scoped to one stream id; none of these ever tears down
/// the registry or other streams.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A stream with this id already exists
    #[error("stream already exists: {0}")]
    DuplicateId(String),

    /// No stream with this id
    #[error("stream not found: {0}")]
    NotFound(String),

    /// Command construction failed for this stream
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The transcoder could not be started or died during startup
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    /// Explicit persistence request failed
    #[error(transparent)]
    Persist(#[from] PersistError),
}
