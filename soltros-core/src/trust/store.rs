//! On-disk policy document handling
//!
//! One protocol for every mutation: back up the existing document to a
//! timestamped sibling, write the complete replacement atomically (temp
//! file in the same directory, then rename), read the result back and
//! parse it, and restore the backup if the read-back fails. Backups are
//! never pruned.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, SoltrosError};
use crate::trust::policy::TrustPolicy;

/// Well-known location the container runtime reads on every pull.
pub const SYSTEM_POLICY_PATH: &str = "/etc/containers/policy.json";

/// Marker recording that trust is currently relaxed, consulted by the
/// system-update wrapper to decide whether to re-relax afterwards.
pub const RELAXED_MARKER_NAME: &str = ".soltros-trust-relaxed";

#[derive(Debug, Clone)]
pub struct PolicyStore {
    policy_path: PathBuf,
    marker_path: PathBuf,
}

impl PolicyStore {
    pub fn system() -> Self {
        Self::for_policy_file(PathBuf::from(SYSTEM_POLICY_PATH))
    }

    /// Store rooted at an arbitrary directory. Tests use this; the
    /// document is named `policy.json` inside `root`.
    pub fn at(root: &Path) -> Self {
        Self::for_policy_file(root.join("policy.json"))
    }

    fn for_policy_file(policy_path: PathBuf) -> Self {
        let marker_path = policy_path
            .parent()
            .unwrap_or_else(|| Path::new("/"))
            .join(RELAXED_MARKER_NAME);
        PolicyStore {
            policy_path,
            marker_path,
        }
    }

    pub fn policy_path(&self) -> &Path {
        &self.policy_path
    }

    pub fn exists(&self) -> bool {
        self.policy_path.exists()
    }

    pub fn load(&self) -> Result<TrustPolicy> {
        let text = fs::read_to_string(&self.policy_path).map_err(|source| {
            SoltrosError::PolicyIo {
                path: self.policy_path.clone(),
                source,
            }
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Copy the current document to a timestamped sibling. Best-effort:
    /// always attempted before a mutation, but failure to back up is
    /// logged rather than fatal.
    pub fn backup(&self) -> Option<PathBuf> {
        if !self.policy_path.exists() {
            return None;
        }
        let backup_path = self.next_backup_path();
        match fs::copy(&self.policy_path, &backup_path) {
            Ok(_) => {
                debug!("backed up policy to {}", backup_path.display());
                Some(backup_path)
            }
            Err(err) => {
                warn!(
                    "could not back up {} to {}: {err}",
                    self.policy_path.display(),
                    backup_path.display()
                );
                None
            }
        }
    }

    fn next_backup_path(&self) -> PathBuf {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let base = format!("{}.backup-{stamp}", self.policy_path.display());
        let mut candidate = PathBuf::from(&base);
        let mut counter = 1;
        while candidate.exists() {
            candidate = PathBuf::from(format!("{base}-{counter}"));
            counter += 1;
        }
        candidate
    }

    /// Replace the document with `policy`: backup, atomic write,
    /// read-back verification. Returns the backup path when one was
    /// made, so the operator can be told where the previous document
    /// went.
    pub fn apply(&self, policy: &TrustPolicy) -> Result<Option<PathBuf>> {
        let mut text = serde_json::to_string_pretty(policy)?;
        text.push('\n');
        self.apply_document(&text)
    }

    /// Same protocol, but for a complete document supplied as text.
    /// The read-back parse is the validation step: if `text` is not a
    /// well-formed policy, the previous document is restored.
    pub fn apply_document(&self, text: &str) -> Result<Option<PathBuf>> {
        let backup = self.backup();
        self.write_atomic(text)?;

        if let Err(parse_err) = self.load() {
            match &backup {
                Some(path) => {
                    self.restore(path)?;
                    warn!("restored previous policy from {}", path.display());
                }
                None => {
                    // No prior document to fall back to; an unparseable
                    // policy blocks every pull, so remove it.
                    fs::remove_file(&self.policy_path).ok();
                }
            }
            return Err(SoltrosError::PolicyWrite {
                reason: format!("written document failed validation: {parse_err}"),
            });
        }

        Ok(backup)
    }

    /// Put a backup document back as the live policy, atomically.
    pub fn restore(&self, backup: &Path) -> Result<()> {
        let text = fs::read_to_string(backup).map_err(|source| SoltrosError::PolicyIo {
            path: backup.to_path_buf(),
            source,
        })?;
        self.write_atomic(&text)
    }

    fn write_atomic(&self, text: &str) -> Result<()> {
        let parent = self
            .policy_path
            .parent()
            .unwrap_or_else(|| Path::new("/"));
        fs::create_dir_all(parent)?;
        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        temp.write_all(text.as_bytes())?;
        temp.persist(&self.policy_path)
            .map_err(|err| SoltrosError::PolicyIo {
                path: self.policy_path.clone(),
                source: err.error,
            })?;
        Ok(())
    }

    // Marker handling is best-effort throughout: the marker is an
    // operator convenience, never a gate on correctness.

    pub fn is_relaxed(&self) -> bool {
        self.marker_path.exists()
    }

    pub fn mark_relaxed(&self) {
        if let Err(err) = fs::write(&self.marker_path, "trust relaxed by soltros\n") {
            warn!(
                "could not write marker {}: {err}",
                self.marker_path.display()
            );
        }
    }

    pub fn clear_relaxed(&self) {
        if self.marker_path.exists() {
            if let Err(err) = fs::remove_file(&self.marker_path) {
                warn!(
                    "could not remove marker {}: {err}",
                    self.marker_path.display()
                );
            }
        }
    }
}
