//! Supervisor error types

use std::io;

use thiserror::Error;

/// Failures launching or confirming the transcoder subprocess
#[derive(Debug, Error)]
pub enum SpawnError {
    /// The transcoder binary could not be located
    #[error("transcoder executable not found: {0}")]
    ExecutableNotFound(String),

    /// The OS refused to spawn the process
    #[error("failed to spawn transcoder: {0}")]
    Spawn(#[from] io::Error),

    /// The process died inside the startup grace window, indicating a bad
    /// command or environment
    #[error("transcoder exited during startup ({}): {diagnostics}", describe_exit(.code))]
    ImmediateExit {
        code: Option<i32>,
        diagnostics: String,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "killed by signal".to_string(),
    }
}
