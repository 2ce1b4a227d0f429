//! Observer notifications

use super::record::StreamSnapshot;

/// Events published to registry observers
///
/// Delivered over a broadcast channel in transition order. Because
/// observers consume from their own receiver, no observer code ever runs
/// while the registry lock is held — an observer re-entering the registry
/// cannot deadlock it.
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    /// A record transitioned to a new status
    StatusChanged {
        id: String,
        snapshot: StreamSnapshot,
    },

    /// A record was removed from the registry
    Removed { id: String },
}
