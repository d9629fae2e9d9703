//! External command execution
//!
//! Every subprocess the helper spawns goes through the [`CommandRunner`]
//! trait. That is the single seam between this tool and the system, so
//! tests can substitute a recording runner and assert that validation
//! rejected input before anything external ran.
//!
//! Execution is strictly sequential and blocking, with no timeouts: a
//! hung upgrade blocks until interrupted, which is the accepted
//! behavior for an operator-driven maintenance tool.

use std::path::Path;
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{Result, SoltrosError};

/// Captured result of a subprocess that did not inherit stdio.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

pub trait CommandRunner {
    /// Run a command with inherited stdio, so the wrapped tool's own
    /// output reaches the terminal unmodified. Non-zero exit maps to
    /// [`SoltrosError::ExternalCommand`].
    fn run(&self, program: &str, args: &[&str]) -> Result<()>;

    /// Run a command with captured output. Only a spawn failure is an
    /// error; a non-zero exit is reported through [`CommandOutput`] so
    /// the caller can decide (used by the `info` fallback).
    fn capture(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;

    /// Is `program` on PATH? Used once at startup for capability
    /// discovery, never re-probed per call.
    fn has(&self, program: &str) -> bool;

    /// Signal running processes by name, best-effort. Signalling a
    /// process that does not exist is not an error.
    fn signal(&self, process_name: &str, signal: &str);
}

/// The real runner, backed by `std::process::Command`.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<()> {
        debug!("running: {program} {}", args.join(" "));
        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|_| SoltrosError::ExternalCommand {
                program: program.to_string(),
                code: None,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(SoltrosError::ExternalCommand {
                program: program.to_string(),
                code: status.code(),
            })
        }
    }

    fn capture(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        debug!("running (captured): {program} {}", args.join(" "));
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|_| SoltrosError::ExternalCommand {
                program: program.to_string(),
                code: None,
            })?;
        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn has(&self, program: &str) -> bool {
        find_on_path(program)
    }

    fn signal(&self, process_name: &str, signal: &str) {
        // pkill exits 1 when no process matched; both outcomes are fine.
        let signal_flag = format!("-{signal}");
        match Command::new("pkill")
            .args([signal_flag.as_str(), "-x", process_name])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) => debug!("pkill {signal} {process_name}: {status}"),
            Err(err) => debug!("pkill unavailable: {err}"),
        }
    }
}

fn find_on_path(program: &str) -> bool {
    let Some(path) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&path).any(|dir| is_executable(&dir.join(program)))
}

#[cfg(unix)]
fn is_executable(candidate: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    candidate
        .metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(candidate: &Path) -> bool {
    candidate.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_reports_exit_code_without_erroring() {
        let runner = SystemRunner;
        let output = runner.capture("false", &[]).expect("spawn must succeed");
        assert!(!output.success());
    }

    #[test]
    fn run_maps_nonzero_exit_to_external_command_error() {
        let runner = SystemRunner;
        let err = runner.run("false", &[]).unwrap_err();
        assert!(matches!(
            err,
            SoltrosError::ExternalCommand { code: Some(1), .. }
        ));
    }

    #[test]
    fn has_finds_a_ubiquitous_tool_and_not_a_missing_one() {
        let runner = SystemRunner;
        assert!(runner.has("sh"));
        assert!(!runner.has("definitely-not-a-real-binary-xyz"));
    }

    #[test]
    fn signalling_a_missing_process_does_not_panic() {
        let runner = SystemRunner;
        runner.signal("definitely-not-a-real-process-xyz", "HUP");
    }
}
