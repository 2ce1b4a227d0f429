//! Transcoder process supervision
//!
//! Spawns the external transcoder, captures its diagnostic output, and
//! tracks liveness and exit. A freshly spawned process only counts as
//! started once it has survived a short grace window; one that dies inside
//! it is reported as an immediate exit with the stderr collected so far.
//!
//! # Ownership
//!
//! The spawned child is owned by a background reaper task. Handles only
//! carry channels: a kill signal sender and a watch receiver that observes
//! the exit. That keeps `kill` idempotent and lets any number of tasks
//! `wait` on the same process.

mod diagnostics;
mod error;
mod process;

pub use diagnostics::ProgressStats;
pub use error::SpawnError;
pub use process::{
    ExitInfo, ProcessHandle, Supervisor, DEFAULT_DIAGNOSTIC_CAPACITY, DEFAULT_KILL_TIMEOUT,
    DEFAULT_SPAWN_GRACE,
};
