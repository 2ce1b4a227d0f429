//! Durable stream configuration storage
//!
//! The registry persists the durable subset of every record (identity,
//! source, destination, options) as one JSON document read and written
//! whole. Runtime state is never stored; reloaded streams always come back
//! idle.

mod store;

pub use store::{ConfigStore, PersistError};
