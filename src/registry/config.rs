//! Manager configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::resolver::{DEFAULT_HELPER_BIN, DEFAULT_RESOLVE_TIMEOUT};
use crate::supervisor::{DEFAULT_DIAGNOSTIC_CAPACITY, DEFAULT_KILL_TIMEOUT, DEFAULT_SPAWN_GRACE};

/// Configuration options for a [`StreamManager`](super::StreamManager)
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Transcoder binary, located via `PATH` when not absolute
    pub transcoder_path: PathBuf,

    /// URL-resolution helper binary; `None` disables resolution entirely
    pub resolver_path: Option<PathBuf>,

    /// Persisted stream set location; `None` disables persistence
    pub config_path: Option<PathBuf>,

    /// Wait after spawn before a stream counts as running
    pub spawn_grace: Duration,

    /// Bound on waiting for a killed transcoder to exit
    pub kill_timeout: Duration,

    /// Bound on one URL resolution attempt
    pub resolve_timeout: Duration,

    /// Observer event channel capacity
    pub event_capacity: usize,

    /// Recent transcoder stderr lines retained per stream for diagnostics
    pub diagnostic_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            transcoder_path: "ffmpeg".into(),
            resolver_path: Some(DEFAULT_HELPER_BIN.into()),
            config_path: None,
            spawn_grace: DEFAULT_SPAWN_GRACE,
            kill_timeout: DEFAULT_KILL_TIMEOUT,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
            event_capacity: 64,
            diagnostic_capacity: DEFAULT_DIAGNOSTIC_CAPACITY,
        }
    }
}

impl ManagerConfig {
    /// Set the transcoder binary.
    pub fn transcoder_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.transcoder_path = path.into();
        self
    }

    /// Set the URL-resolution helper binary.
    pub fn resolver_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.resolver_path = Some(path.into());
        self
    }

    /// Disable URL resolution; remote sources always stream raw.
    pub fn disable_resolver(mut self) -> Self {
        self.resolver_path = None;
        self
    }

    /// Persist the stream set at the given path.
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Set the post-spawn grace window.
    pub fn spawn_grace(mut self, grace: Duration) -> Self {
        self.spawn_grace = grace;
        self
    }

    /// Set the bound on waiting for a killed transcoder.
    pub fn kill_timeout(mut self, timeout: Duration) -> Self {
        self.kill_timeout = timeout;
        self
    }

    /// Set the bound on one URL resolution attempt.
    pub fn resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    /// Set the observer event channel capacity.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Set how many recent stderr lines are retained per stream.
    pub fn diagnostic_capacity(mut self, capacity: usize) -> Self {
        self.diagnostic_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ManagerConfig::default();

        assert_eq!(config.transcoder_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.resolver_path, Some(PathBuf::from("yt-dlp")));
        assert!(config.config_path.is_none());
        assert_eq!(config.spawn_grace, DEFAULT_SPAWN_GRACE);
        assert_eq!(config.kill_timeout, DEFAULT_KILL_TIMEOUT);
        assert_eq!(config.event_capacity, 64);
        assert_eq!(config.diagnostic_capacity, DEFAULT_DIAGNOSTIC_CAPACITY);
    }

    #[test]
    fn test_builder_chaining() {
        let config = ManagerConfig::default()
            .transcoder_path("/opt/ffmpeg/bin/ffmpeg")
            .disable_resolver()
            .config_path("/var/lib/livecast/streams.json")
            .spawn_grace(Duration::from_secs(1))
            .kill_timeout(Duration::from_secs(10))
            .resolve_timeout(Duration::from_secs(5))
            .event_capacity(128);

        assert_eq!(config.transcoder_path, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert!(config.resolver_path.is_none());
        assert_eq!(
            config.config_path,
            Some(PathBuf::from("/var/lib/livecast/streams.json"))
        );
        assert_eq!(config.spawn_grace, Duration::from_secs(1));
        assert_eq!(config.kill_timeout, Duration::from_secs(10));
        assert_eq!(config.resolve_timeout, Duration::from_secs(5));
        assert_eq!(config.event_capacity, 128);
    }

    #[test]
    fn test_resolver_path_reenables_resolution() {
        let config = ManagerConfig::default()
            .disable_resolver()
            .resolver_path("yt-dlp-nightly");

        assert_eq!(config.resolver_path, Some(PathBuf::from("yt-dlp-nightly")));
    }
}
