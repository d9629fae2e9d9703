//! Declarative package-manager wrapper
//!
//! Uniform, validated interface over `nix profile` operations against
//! the configured system flake. Validation happens before anything
//! external runs; on state-changing success the desktop refresher is
//! triggered best-effort (its outcome never affects the reported result
//! of the package operation).

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Result, SoltrosError};
use crate::process::CommandRunner;
use crate::refresh::DesktopRefresh;

/// Eager startup check: the wrapped package manager must exist. Never
/// re-checked per command.
pub fn ensure_environment(runner: &dyn CommandRunner) -> Result<()> {
    if runner.has("nix") {
        Ok(())
    } else {
        Err(SoltrosError::Environment {
            tool: "nix".to_string(),
            hint: "SoltrOS images ship Nix by default; if it was removed, reinstall it \
                   or run this command from a standard SoltrOS image."
                .to_string(),
        })
    }
}

/// Install names are interpolated into a flake reference, so they take
/// a strict grammar. Removal identifiers are deliberately NOT validated
/// here: names, numeric profile indices and store paths are all valid
/// and only the underlying tool can judge them.
pub fn is_valid_package_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || b == b'-')
}

pub struct PackageManager<'a, R: CommandRunner, D: DesktopRefresh> {
    config: &'a Config,
    runner: &'a R,
    refresher: &'a D,
}

impl<'a, R: CommandRunner, D: DesktopRefresh> PackageManager<'a, R, D> {
    pub fn new(config: &'a Config, runner: &'a R, refresher: &'a D) -> Self {
        PackageManager {
            config,
            runner,
            refresher,
        }
    }

    pub fn install(&self, name: &str) -> Result<()> {
        if !is_valid_package_name(name) {
            return Err(SoltrosError::validation(format!(
                "invalid package name '{name}': names may only contain letters, digits, \
                 '.', '_' and '-'"
            )));
        }

        let flake_ref = format!("{}#{name}", self.config.flake_path.display());
        match self
            .runner
            .run("nix", &["profile", "install", flake_ref.as_str()])
        {
            Ok(()) => {
                self.refresher.refresh();
                Ok(())
            }
            Err(err) => {
                warn!("install of '{name}' failed; try 'soltros search {name}' to find the exact name");
                Err(err)
            }
        }
    }

    pub fn remove(&self, identifier: &str) -> Result<()> {
        if identifier.is_empty() {
            return Err(SoltrosError::validation(
                "remove requires a package name, index or store path",
            ));
        }

        self.runner.run("nix", &["profile", "remove", identifier])?;
        self.refresher.refresh();
        Ok(())
    }

    pub fn list(&self) -> Result<()> {
        self.runner.run("nix", &["profile", "list"])
    }

    pub fn search(&self, query: &str) -> Result<()> {
        self.runner.run("nix", &["search", "nixpkgs", query])
    }

    /// Structured JSON lookup first; on failure or an empty result fall
    /// back to the plain search. The fallback is a legitimate two-tier
    /// strategy, so the structured path's failure is only logged at
    /// debug, never surfaced.
    pub fn info(&self, name: &str) -> Result<()> {
        match self
            .runner
            .capture("nix", &["search", "nixpkgs", name, "--json"])
        {
            Ok(output) if output.success() && !json_result_is_empty(&output.stdout) => {
                print!("{}", output.stdout);
                Ok(())
            }
            Ok(output) => {
                debug!(
                    "structured lookup for '{name}' returned {:?} with no results; \
                     falling back to search",
                    output.code
                );
                self.search(name)
            }
            Err(err) => {
                debug!("structured lookup for '{name}' failed ({err}); falling back to search");
                self.search(name)
            }
        }
    }

    pub fn upgrade(&self) -> Result<()> {
        self.runner.run("nix", &["profile", "upgrade", ".*"])?;
        self.refresher.refresh();
        Ok(())
    }

    /// Update the flake lock for the configured source. When the
    /// configured path is absent on disk (e.g. a custom image stripped
    /// it), fall back to a global pathless update - a deliberate
    /// recovery path, not a swallowed error.
    pub fn update(&self) -> Result<()> {
        if self.config.flake_path.exists() {
            let flake = self.config.flake_path.display().to_string();
            self.runner
                .run("nix", &["flake", "update", "--flake", flake.as_str()])
        } else {
            debug!(
                "flake path {} does not exist; updating without a path",
                self.config.flake_path.display()
            );
            self.runner.run("nix", &["flake", "update"])
        }
    }

    pub fn history(&self) -> Result<()> {
        self.runner.run("nix", &["profile", "history"])
    }

    pub fn rollback(&self, generation: Option<&str>) -> Result<()> {
        match generation {
            Some(generation) => {
                self.runner
                    .run("nix", &["profile", "rollback", "--to", generation])?
            }
            None => self.runner.run("nix", &["profile", "rollback"])?,
        }
        self.refresher.refresh();
        Ok(())
    }

    /// Garbage-collect the store. Idempotent, and no refresh: nothing
    /// desktop-visible changes.
    pub fn clean(&self) -> Result<()> {
        self.runner.run("nix", &["store", "gc"])
    }
}

fn json_result_is_empty(stdout: &str) -> bool {
    let trimmed = stdout.trim();
    trimmed.is_empty() || trimmed == "{}"
}
