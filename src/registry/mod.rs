//! Stream registry and lifecycle orchestration
//!
//! The registry owns the in-memory collection of stream records and drives
//! each one through its status state machine, coordinating the command
//! builder, the source resolver and the process supervisor.
//!
//! # Architecture
//!
//! ```text
//!                         StreamManager (Arc)
//!                  ┌────────────────────────────┐
//!                  │ streams: Mutex<HashMap<    │
//!                  │   String, StreamRecord {   │
//!                  │     config,                │
//!                  │     runtime: Idle | ...    │
//!                  │       | Running{handle}    │
//!                  │   }                        │
//!                  │ >>                         │
//!                  └──────────────┬─────────────┘
//!          add/update/remove      │        start/stop
//!                                 │
//!            ┌────────────────────┼──────────────────────┐
//!            ▼                    ▼                      ▼
//!       [Resolver]         [Command Builder]       [Supervisor]
//!       resolve URL        build argument list     spawn / kill
//!                                                       │
//!                                                monitor task per
//!                                                running stream
//! ```
//!
//! # State machine
//!
//! ```text
//! Idle ──start──► Starting ──spawn ok──► Running ──stop──► Stopping ──► Stopped
//!                    │                      │                              │
//!                    │ build/spawn fail     │ process exit (async)         │
//!                    ▼                      ▼                              │
//!                  Error ◄──── non-zero ────┴──── zero ──► Stopped         │
//!                    └────────────── start ────────────────────────◄──────┘
//! ```
//!
//! Every transition publishes a [`RegistryEvent`] on a broadcast channel so
//! a presentation layer can refresh without polling.

pub mod config;
pub mod error;
pub mod event;
pub mod record;
pub mod store;

pub use config::ManagerConfig;
pub use error::RegistryError;
pub use event::RegistryEvent;
pub use record::{
    Destination, SourceKind, StreamConfig, StreamOptions, StreamSnapshot, StreamStats,
    StreamStatus,
};
pub use store::StreamManager;
