//! Crate-level error type
//!
//! Each module defines its own error enum; this wraps them for callers
//! that do not care which layer failed.

use thiserror::Error;

use crate::command::CommandError;
use crate::persist::PersistError;
use crate::registry::RegistryError;
use crate::supervisor::SpawnError;

/// Any error this crate can produce
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Spawn(#[from] SpawnError),

    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, Error>;
