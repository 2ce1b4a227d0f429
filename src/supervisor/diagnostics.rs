//! Diagnostic capture for supervised processes
//!
//! The transcoder writes everything to stderr: startup errors, warnings and
//! the periodic progress line. Recent non-progress lines are kept in a
//! bounded ring buffer so a failure can be reported with context; progress
//! lines are scraped for runtime metrics instead.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Bounded ring buffer of the most recent stderr lines
#[derive(Debug, Clone)]
pub(super) struct DiagnosticBuffer {
    lines: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl DiagnosticBuffer {
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub(super) fn push(&self, line: String) {
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Captured lines, oldest first.
    pub(super) fn snapshot(&self) -> Vec<String> {
        let lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.iter().cloned().collect()
    }

    pub(super) fn tail(&self) -> String {
        self.snapshot().join("\n")
    }
}

/// Metrics scraped from the transcoder's progress output (best-effort)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressStats {
    /// Frames processed so far
    pub frames: u64,
    /// Measured output bitrate in kbit/s
    pub bitrate_kbps: f64,
}

/// Latest progress metrics, shared between the stderr reader and handles
#[derive(Debug, Clone, Default)]
pub(super) struct SharedProgress {
    inner: Arc<Mutex<ProgressStats>>,
}

impl SharedProgress {
    pub(super) fn set(&self, stats: ProgressStats) {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner()) = stats;
    }

    pub(super) fn get(&self) -> ProgressStats {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Scrape frame count and bitrate from one progress line.
///
/// A typical line looks like
/// `frame=  123 fps= 30 q=28.0 size= 1024KiB time=00:00:04.10 bitrate=2045.8kbits/s speed=1x`.
/// Returns `None` for anything that is not a progress line.
pub(super) fn parse_progress(line: &str) -> Option<ProgressStats> {
    let frames = parse_field(line, "frame=")?.parse().ok()?;
    let bitrate_kbps = parse_field(line, "bitrate=")
        .and_then(|value| value.strip_suffix("kbits/s"))
        .and_then(|value| value.parse().ok())
        .unwrap_or(0.0);

    Some(ProgressStats {
        frames,
        bitrate_kbps,
    })
}

fn parse_field<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let rest = line[line.find(key)? + key.len()..].trim_start();
    let end = rest
        .find(|c: char| c.is_whitespace())
        .unwrap_or(rest.len());
    Some(&rest[..end])
}
