//! Transcoder spawning and lifecycle tracking

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, Command};
use tokio::sync::{mpsc, watch};

use super::diagnostics::{parse_progress, DiagnosticBuffer, ProgressStats, SharedProgress};
use super::error::SpawnError;

/// Default wait after spawn before the process counts as started
pub const DEFAULT_SPAWN_GRACE: Duration = Duration::from_secs(2);

/// Default bound on waiting for a killed process to exit
pub const DEFAULT_KILL_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of recent stderr lines retained per process
pub const DEFAULT_DIAGNOSTIC_CAPACITY: usize = 50;

/// How a supervised process finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    /// OS exit code; `None` when the process was killed by a signal
    pub code: Option<i32>,
}

impl ExitInfo {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Spawns and supervises transcoder subprocesses
#[derive(Debug, Clone)]
pub struct Supervisor {
    binary: PathBuf,
    spawn_grace: Duration,
    kill_timeout: Duration,
    diagnostic_capacity: usize,
}

impl Supervisor {
    /// Supervisor for the given transcoder binary with default timings.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            spawn_grace: DEFAULT_SPAWN_GRACE,
            kill_timeout: DEFAULT_KILL_TIMEOUT,
            diagnostic_capacity: DEFAULT_DIAGNOSTIC_CAPACITY,
        }
    }

    /// Set the post-spawn grace window.
    pub fn spawn_grace(mut self, grace: Duration) -> Self {
        self.spawn_grace = grace;
        self
    }

    /// Set the bound on waiting for a killed process.
    pub fn kill_timeout(mut self, timeout: Duration) -> Self {
        self.kill_timeout = timeout;
        self
    }

    /// Set how many recent stderr lines are retained per process.
    pub fn diagnostic_capacity(mut self, capacity: usize) -> Self {
        self.diagnostic_capacity = capacity;
        self
    }

    /// The supervised transcoder binary.
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Launch the transcoder and confirm it survives the grace window.
    pub async fn spawn(&self, args: &[String]) -> Result<ProcessHandle, SpawnError> {
        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => {
                    SpawnError::ExecutableNotFound(self.binary.display().to_string())
                }
                _ => SpawnError::Spawn(e),
            })?;

        let pid = child.id().unwrap_or_default();
        let diagnostics = DiagnosticBuffer::new(self.diagnostic_capacity);
        let progress = SharedProgress::default();

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(read_stderr(stderr, pid, diagnostics.clone(), progress.clone()));
        }

        let (kill_tx, mut kill_rx) = mpsc::channel::<()>(1);
        let (status_tx, status_rx) = watch::channel(None::<ExitInfo>);

        // Reaper: sole owner of the child. Waits for natural exit or a kill
        // request, then publishes the exit on the watch channel.
        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                _ = kill_rx.recv() => {
                    if let Err(e) = child.start_kill() {
                        tracing::warn!(pid, error = %e, "failed to signal transcoder");
                    }
                    child.wait().await
                }
            };
            let exit = match status {
                Ok(status) => ExitInfo {
                    code: status.code(),
                },
                Err(e) => {
                    tracing::warn!(pid, error = %e, "failed to reap transcoder");
                    ExitInfo { code: None }
                }
            };
            let _ = status_tx.send(Some(exit));
        });

        let handle = ProcessHandle {
            pid,
            kill_tx,
            status: status_rx,
            diagnostics,
            progress,
            kill_timeout: self.kill_timeout,
        };

        match tokio::time::timeout(self.spawn_grace, handle.wait()).await {
            Ok(exit) => {
                // Let the stderr reader drain the tail before reporting
                tokio::time::sleep(Duration::from_millis(50)).await;
                Err(SpawnError::ImmediateExit {
                    code: exit.code,
                    diagnostics: handle.diagnostics_tail(),
                })
            }
            Err(_) => {
                tracing::debug!(pid, "transcoder alive past grace window");
                Ok(handle)
            }
        }
    }
}

/// Handle to a supervised transcoder process
///
/// Clones observe the same underlying process. The registry record keeps
/// the long-term copy; monitor tasks wait through short-lived clones.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    pid: u32,
    kill_tx: mpsc::Sender<()>,
    status: watch::Receiver<Option<ExitInfo>>,
    diagnostics: DiagnosticBuffer,
    progress: SharedProgress,
    kill_timeout: Duration,
}

impl ProcessHandle {
    /// OS process id.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Whether the process has not exited yet.
    pub fn is_alive(&self) -> bool {
        self.status.borrow().is_none()
    }

    /// Exit information, once the process has exited.
    pub fn exit(&self) -> Option<ExitInfo> {
        *self.status.borrow()
    }

    /// Suspend until the process exits.
    pub async fn wait(&self) -> ExitInfo {
        let mut status = self.status.clone();
        let result = match status.wait_for(|exit| exit.is_some()).await {
            Ok(exit) => (*exit).unwrap_or(ExitInfo { code: None }),
            // Reaper gone without publishing: treat as killed
            Err(_) => ExitInfo { code: None },
        };
        result
    }

    /// Request hard termination and wait (bounded) until the process is
    /// confirmed gone. Idempotent on an already-exited process.
    pub async fn kill(&self) -> ExitInfo {
        if let Some(exit) = self.exit() {
            return exit;
        }
        let _ = self.kill_tx.try_send(());
        match tokio::time::timeout(self.kill_timeout, self.wait()).await {
            Ok(exit) => exit,
            Err(_) => {
                tracing::warn!(pid = self.pid, "timed out waiting for killed transcoder");
                ExitInfo { code: None }
            }
        }
    }

    /// Recently captured stderr lines, oldest first.
    pub fn diagnostics(&self) -> Vec<String> {
        self.diagnostics.snapshot()
    }

    pub(crate) fn diagnostics_tail(&self) -> String {
        self.diagnostics.tail()
    }

    /// Latest scraped progress metrics (best-effort, may be stale).
    pub fn progress(&self) -> ProgressStats {
        self.progress.get()
    }
}

async fn read_stderr(
    stderr: ChildStderr,
    pid: u32,
    diagnostics: DiagnosticBuffer,
    progress: SharedProgress,
) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if let Some(stats) = parse_progress(&line) {
            progress.set(stats);
            continue;
        }
        tracing::debug!(target: "livecast::transcoder", pid, line = %line);
        diagnostics.push(line);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    /// Script standing in for the transcoder; ignores its arguments.
    fn fake_transcoder(body: &str) -> tempfile::TempPath {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let mut script = tempfile::NamedTempFile::new().unwrap();
        writeln!(script, "#!/bin/sh\n{}", body).unwrap();
        let mut perms = script.as_file().metadata().unwrap().permissions();
        perms.set_mode(0o755);
        script.as_file().set_permissions(perms).unwrap();
        // Close the write handle so the script can be exec'd (an open
        // writable fd yields ETXTBSY); the file stays on disk until drop.
        script.into_temp_path()
    }

    fn supervisor_for(script: &tempfile::TempPath) -> Supervisor {
        Supervisor::new(&**script)
            .spawn_grace(Duration::from_millis(150))
            .kill_timeout(Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_missing_binary_reported() {
        let supervisor = Supervisor::new("/definitely/not/a/transcoder");

        let err = supervisor.spawn(&[]).await.unwrap_err();
        assert!(matches!(err, SpawnError::ExecutableNotFound(_)));
    }

    #[tokio::test]
    async fn test_immediate_exit_reports_code() {
        let script = fake_transcoder("exit 3");

        let err = supervisor_for(&script).spawn(&[]).await.unwrap_err();
        match err {
            SpawnError::ImmediateExit { code, .. } => assert_eq!(code, Some(3)),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_immediate_exit_attaches_diagnostics() {
        let script = fake_transcoder("echo boom >&2\nexit 1");

        let err = supervisor_for(&script).spawn(&[]).await.unwrap_err();
        match err {
            SpawnError::ImmediateExit { diagnostics, .. } => {
                assert!(diagnostics.contains("boom"), "got: {}", diagnostics)
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_spawn_and_kill() {
        let script = fake_transcoder("sleep 30");

        let handle = supervisor_for(&script).spawn(&[]).await.unwrap();
        assert!(handle.is_alive());
        assert!(handle.pid() > 0);

        let exit = handle.kill().await;
        assert_eq!(exit.code, None); // killed by signal
        assert!(!handle.is_alive());

        // Killing again is a no-op returning the same exit
        assert_eq!(handle.kill().await, exit);
    }

    #[tokio::test]
    async fn test_wait_observes_natural_exit() {
        let script = fake_transcoder("sleep 0.3\nexit 0");

        let handle = supervisor_for(&script).spawn(&[]).await.unwrap();
        let exit = handle.wait().await;

        assert!(exit.success());
        assert!(!handle.is_alive());
        assert_eq!(handle.exit(), Some(exit));
    }

    #[tokio::test]
    async fn test_stderr_lines_captured() {
        let script = fake_transcoder("echo warn-a >&2\necho warn-b >&2\nsleep 30");

        let handle = supervisor_for(&script).spawn(&[]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let diagnostics = handle.diagnostics();
        assert!(diagnostics.iter().any(|l| l == "warn-a"));
        assert!(diagnostics.iter().any(|l| l == "warn-b"));

        handle.kill().await;
    }

    #[tokio::test]
    async fn test_progress_lines_scraped_not_buffered() {
        let script = fake_transcoder(
            "echo 'frame=   42 fps= 30 q=28.0 size=     256KiB time=00:00:01.40 bitrate=1497.6kbits/s speed=1x' >&2\nsleep 30",
        );

        let handle = supervisor_for(&script).spawn(&[]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(handle.progress().frames, 42);
        assert!(handle.diagnostics().is_empty());

        handle.kill().await;
    }
}
