//! Stream records and runtime state types
//!
//! A record is the durable configuration of one publishing job plus its
//! runtime half. The runtime is a tagged state: the process handle lives
//! inside the states where the subprocess may be alive, so an idle record
//! physically cannot carry a handle and a running one cannot lack it. The
//! registry's operations are the only code that moves records between
//! states.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::supervisor::ProcessHandle;

/// Where a stream's media comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Local media file, paced at native frame rate
    File,
    /// Remote video reference: YouTube, playlist, Facebook or a generic URL
    RemoteVideo,
    /// Live capture of the local display
    ScreenCapture,
}

/// Publishing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    /// Base ingest URL, e.g. `rtmp://live.example.com/app`
    pub url: String,
    /// Stream key appended to the base URL
    pub key: String,
}

impl Destination {
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key: key.into(),
        }
    }

    /// Full output target: base URL (trailing slash stripped) plus key.
    pub fn target(&self) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), self.key)
    }
}

/// Per-stream settings
///
/// Absent keys take these defaults when loading persisted configuration;
/// unknown keys in stored documents are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamOptions {
    /// Loop file input forever
    pub loop_input: bool,
    /// Force the re-encode path even when no filter requires it
    pub transcode: bool,
    /// Playback speed multiplier
    pub speed: f64,
    /// Brightness delta in percent, -100..100
    pub brightness: i32,
    /// Audio volume multiplier
    pub volume: f64,
    /// Target resolution as `WIDTHxHEIGHT`
    pub resolution: Option<String>,
    /// Video bitrate on the re-encode path
    pub bitrate: String,
    /// Encoder preset on the re-encode path
    pub preset: String,
    /// Text drawn over the video
    pub overlay_text: Option<String>,
    pub text_size: u32,
    pub text_color: String,
    pub text_x: u32,
    pub text_y: u32,
    /// Clip to play before the main source (not yet spliced into the command)
    pub intro: Option<String>,
    /// Clip to play after the main source (not yet spliced into the command)
    pub outro: Option<String>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            loop_input: true,
            transcode: false,
            speed: 1.0,
            brightness: 0,
            volume: 1.0,
            resolution: None,
            bitrate: "2500k".to_string(),
            preset: "veryfast".to_string(),
            overlay_text: None,
            text_size: 24,
            text_color: "white".to_string(),
            text_x: 10,
            text_y: 10,
            intro: None,
            outro: None,
        }
    }
}

/// Durable subset of a record: what `add`/`update` accept and what the
/// config store persists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Unique registry key, immutable after creation
    pub id: String,
    /// Source locator: file path, URL, or a sentinel for screen capture
    pub source: String,
    pub kind: SourceKind,
    pub destination: Destination,
    #[serde(default)]
    pub options: StreamOptions,
}

/// Public stream status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamStatus {
    Idle,
    Starting,
    Running,
    Stopping,
    Stopped,
    Error,
}

impl StreamStatus {
    /// States during which a transcoder process exists
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            StreamStatus::Starting | StreamStatus::Running | StreamStatus::Stopping
        )
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StreamStatus::Idle => "idle",
            StreamStatus::Starting => "starting",
            StreamStatus::Running => "running",
            StreamStatus::Stopping => "stopping",
            StreamStatus::Stopped => "stopped",
            StreamStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// Runtime half of a record
#[derive(Debug, Default)]
pub(crate) enum Runtime {
    #[default]
    Idle,
    Starting,
    Running {
        handle: ProcessHandle,
        started_at: Instant,
    },
    Stopping {
        handle: ProcessHandle,
    },
    Stopped,
    Failed {
        detail: String,
    },
}

impl Runtime {
    pub(crate) fn status(&self) -> StreamStatus {
        match self {
            Runtime::Idle => StreamStatus::Idle,
            Runtime::Starting => StreamStatus::Starting,
            Runtime::Running { .. } => StreamStatus::Running,
            Runtime::Stopping { .. } => StreamStatus::Stopping,
            Runtime::Stopped => StreamStatus::Stopped,
            Runtime::Failed { .. } => StreamStatus::Error,
        }
    }

    pub(crate) fn handle(&self) -> Option<&ProcessHandle> {
        match self {
            Runtime::Running { handle, .. } | Runtime::Stopping { handle } => Some(handle),
            _ => None,
        }
    }

    pub(crate) fn error_detail(&self) -> Option<&str> {
        match self {
            Runtime::Failed { detail } => Some(detail),
            _ => None,
        }
    }
}

/// One managed stream: durable config plus runtime state
#[derive(Debug)]
pub(crate) struct StreamRecord {
    pub(crate) config: StreamConfig,
    pub(crate) runtime: Runtime,
}

impl StreamRecord {
    pub(crate) fn new(config: StreamConfig) -> Self {
        Self {
            config,
            runtime: Runtime::Idle,
        }
    }

    /// Read-only copy handed to callers and observers.
    pub(crate) fn snapshot(&self) -> StreamSnapshot {
        let stats = match &self.runtime {
            Runtime::Running { handle, started_at } => {
                let progress = handle.progress();
                StreamStats {
                    elapsed: started_at.elapsed(),
                    frames: progress.frames,
                    bitrate_kbps: progress.bitrate_kbps,
                }
            }
            _ => StreamStats::default(),
        };

        StreamSnapshot {
            id: self.config.id.clone(),
            source: self.config.source.clone(),
            kind: self.config.kind,
            destination: self.config.destination.clone(),
            options: self.config.options.clone(),
            status: self.runtime.status(),
            pid: self.runtime.handle().map(ProcessHandle::pid),
            error_detail: self.runtime.error_detail().map(String::from),
            stats,
        }
    }
}

/// Read-only view of one stream at a point in time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamSnapshot {
    pub id: String,
    pub source: String,
    pub kind: SourceKind,
    pub destination: Destination,
    pub options: StreamOptions,
    pub status: StreamStatus,
    /// Transcoder process id while one exists
    pub pid: Option<u32>,
    /// Last failure description; present only in the error state
    pub error_detail: Option<String>,
    pub stats: StreamStats,
}

/// Best-effort runtime metrics for a running stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StreamStats {
    /// Time since the stream entered the running state
    pub elapsed: Duration,
    /// Frames processed by the transcoder
    pub frames: u64,
    /// Measured output bitrate in kbit/s
    pub bitrate_kbps: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_target_strips_trailing_slash() {
        assert_eq!(Destination::new("rtmp://x/", "abc").target(), "rtmp://x/abc");
        assert_eq!(Destination::new("rtmp://x", "abc").target(), "rtmp://x/abc");
    }

    #[test]
    fn test_options_defaults() {
        let options = StreamOptions::default();

        assert!(options.loop_input);
        assert!(!options.transcode);
        assert_eq!(options.speed, 1.0);
        assert_eq!(options.volume, 1.0);
        assert_eq!(options.bitrate, "2500k");
        assert_eq!(options.preset, "veryfast");
        assert!(options.resolution.is_none());
        assert!(options.overlay_text.is_none());
    }

    #[test]
    fn test_status_projection_and_handle_presence() {
        assert_eq!(Runtime::Idle.status(), StreamStatus::Idle);
        assert_eq!(Runtime::Starting.status(), StreamStatus::Starting);
        assert_eq!(Runtime::Stopped.status(), StreamStatus::Stopped);
        assert_eq!(
            Runtime::Failed {
                detail: "boom".into()
            }
            .status(),
            StreamStatus::Error
        );

        assert!(Runtime::Idle.handle().is_none());
        assert!(Runtime::Stopped.handle().is_none());
        assert_eq!(
            Runtime::Failed {
                detail: "boom".into()
            }
            .error_detail(),
            Some("boom")
        );
    }

    #[test]
    fn test_busy_states() {
        assert!(StreamStatus::Starting.is_busy());
        assert!(StreamStatus::Running.is_busy());
        assert!(StreamStatus::Stopping.is_busy());
        assert!(!StreamStatus::Idle.is_busy());
        assert!(!StreamStatus::Stopped.is_busy());
        assert!(!StreamStatus::Error.is_busy());
    }

    #[test]
    fn test_stream_config_serde_round_trip() {
        let config = StreamConfig {
            id: "s1".into(),
            source: "https://youtu.be/abc".into(),
            kind: SourceKind::RemoteVideo,
            destination: Destination::new("rtmp://x", "k"),
            options: StreamOptions {
                resolution: Some("1280x720".into()),
                ..StreamOptions::default()
            },
        };

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"remote_video\""));

        let back: StreamConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_fresh_record_snapshot_is_idle() {
        let record = StreamRecord::new(StreamConfig {
            id: "s1".into(),
            source: "/clip.mp4".into(),
            kind: SourceKind::File,
            destination: Destination::new("rtmp://x", "k"),
            options: StreamOptions::default(),
        });

        let snapshot = record.snapshot();
        assert_eq!(snapshot.status, StreamStatus::Idle);
        assert_eq!(snapshot.pid, None);
        assert_eq!(snapshot.error_detail, None);
        assert_eq!(snapshot.stats, StreamStats::default());
    }
}
