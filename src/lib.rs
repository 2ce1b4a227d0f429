//! # livecast
//!
//! Orchestration of concurrent live-video publishing jobs, each backed by
//! an external transcoder subprocess (ffmpeg or compatible).
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                        StreamManager (registry)                      │
//! │                                                                      │
//! │   Mutex<HashMap<id, StreamRecord>>        broadcast events ────────────► observers
//! │        │                                                             │   (GUI, logs)
//! │        │  per-stream lifecycle: Idle → Starting → Running → ...      │
//! │        │                                                             │
//! │   ┌────┴─────┐      ┌──────────────────┐     ┌───────────────────┐   │
//! │   │ Resolver │      │  Command Builder │     │    Supervisor     │   │
//! │   │ (yt-dlp) │─url─►│  (pure, per-     │─args►│ spawn / monitor / │   │
//! │   └──────────┘      │   stream args)   │     │ kill transcoder   │   │
//! │                     └──────────────────┘     └─────────┬─────────┘   │
//! │                                                        │             │
//! │   ConfigStore (JSON) ◄── durable subset                ▼             │
//! │                                              ffmpeg subprocesses     │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sources can be local files, remote video references (resolved to
//! playable URLs by a yt-dlp style helper, best-effort) or the local
//! display. Each stream publishes to an RTMP-style endpoint, either as a
//! passthrough copy or re-encoded with a filter chain (scaling, speed,
//! brightness, text overlay, volume).
//!
//! # Example
//!
//! ```no_run
//! use livecast::{
//!     Destination, ManagerConfig, SourceKind, StreamConfig, StreamManager, StreamOptions,
//! };
//!
//! # async fn example() -> livecast::Result<()> {
//! let manager = StreamManager::new(ManagerConfig::default());
//!
//! manager
//!     .add(StreamConfig {
//!         id: "night-loop".into(),
//!         source: "/media/loop.mp4".into(),
//!         kind: SourceKind::File,
//!         destination: Destination::new("rtmp://a.rtmp.youtube.com/live2", "xxxx-xxxx"),
//!         options: StreamOptions::default(),
//!     })
//!     .await?;
//!
//! manager.start("night-loop").await?;
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod error;
pub mod persist;
pub mod registry;
pub mod resolver;
pub mod supervisor;

pub use error::{Error, Result};
pub use registry::{
    Destination, ManagerConfig, RegistryError, RegistryEvent, SourceKind, StreamConfig,
    StreamManager, StreamOptions, StreamSnapshot, StreamStats, StreamStatus,
};
pub use resolver::Resolver;
pub use supervisor::{ProcessHandle, Supervisor};
