//! Error taxonomy for the maintenance helper
//!
//! Four failure classes with distinct handling policies: bad input is
//! rejected before anything external runs, missing tools are caught once
//! at startup, wrapped-tool failures propagate with a remediation hint,
//! and policy-write failures trigger exactly one corrective restore.
//! Advisory desktop-refresh failures never appear here; they are
//! swallowed inside the refresher and logged at debug level.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SoltrosError {
    /// Bad CLI input, caught before any external call.
    #[error("{0}")]
    Validation(String),

    /// A required external tool is absent. Checked eagerly at startup.
    #[error("required tool '{tool}' was not found on PATH.\n\n{hint}")]
    Environment { tool: String, hint: String },

    /// The wrapped tool itself returned a failure.
    #[error("'{program}' {}", exit_description(.code))]
    ExternalCommand {
        program: String,
        code: Option<i32>,
    },

    /// The trust-policy document could not be written or did not
    /// validate; the previous document has been restored from backup.
    #[error("trust policy update failed: {reason}\n\nThe previous policy document was restored. Nothing was changed.")]
    PolicyWrite { reason: String },

    /// A policy backup or restore touched the filesystem and failed.
    #[error("failed to access policy file {path}")]
    PolicyIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SoltrosError>;

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {code}"),
        None => "could not be run (missing or killed by a signal)".to_string(),
    }
}

impl SoltrosError {
    pub fn validation(message: impl Into<String>) -> Self {
        SoltrosError::Validation(message.into())
    }

    /// Exit code reported to the shell. Every failure class maps to 1;
    /// the distinction between classes is in the message, not the code.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
