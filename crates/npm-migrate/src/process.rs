//! External tool invocation.
//!
//! Tools always run with an explicit working directory and environment; the
//! process-wide working directory and environment are never modified.

use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use crate::config::ToolCommand;

/// Captured result of a finished tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Exit code, `None` if terminated by a signal.
    pub exit_code: Option<i32>,
    /// Whether the tool exited successfully.
    pub success: bool,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

/// Runs `command` followed by `args` and captures its output.
///
/// Arguments and environment values are passed through as `OsStr`, so
/// paths reach the child byte for byte. The child is killed if it outlives
/// `timeout`.
///
/// # Errors
///
/// Returns an error if the program cannot be started, or
/// [`io::ErrorKind::TimedOut`] if it does not finish in time.
pub async fn run_tool(
    command: &ToolCommand,
    args: &[&OsStr],
    cwd: Option<&Path>,
    envs: &[(&str, &OsStr)],
    timeout: Duration,
) -> io::Result<ToolOutput> {
    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    for (key, value) in envs {
        cmd.env(key, value);
    }

    debug!(
        "Running command: {} {}",
        command,
        args.iter()
            .map(|arg| arg.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    );

    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(output) => output?,
        Err(_) => {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("{} timed out after {}s", command.program, timeout.as_secs()),
            ))
        }
    };

    Ok(ToolOutput {
        exit_code: output.status.code(),
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Drops the `npm warn Unknown user config` noise npm prints for legacy
/// `.npmrc` keys such as `email` and `always-auth`.
pub fn filter_npm_noise(stderr: &str) -> String {
    stderr
        .lines()
        .filter(|line| {
            !(line.contains("npm warn Unknown user config")
                && (line.contains("email") || line.contains("always-auth")))
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
