//! Desktop integration refresher
//!
//! After a package-state change, newly (un)installed launchers, icons
//! and MIME associations should show up in the running session without a
//! logout. Every step here is advisory: individually guarded by a
//! capability probe and a directory check, with failures logged at debug
//! and swallowed. The refresher never reports failure to its caller.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::process::CommandRunner;

/// Optional desktop tools discovered once at startup. The refresher
/// consults this immutable set instead of re-probing PATH per call.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    pub desktop_database: bool,
    pub mime_database: bool,
    pub icon_cache: bool,
    pub kbuildsycoca6: bool,
    pub kbuildsycoca5: bool,
    pub xdg_desktop_menu: bool,
    pub systemctl: bool,
    pub pkill: bool,
}

impl Capabilities {
    pub fn discover(runner: &dyn CommandRunner) -> Self {
        Capabilities {
            desktop_database: runner.has("update-desktop-database"),
            mime_database: runner.has("update-mime-database"),
            icon_cache: runner.has("gtk-update-icon-cache"),
            kbuildsycoca6: runner.has("kbuildsycoca6"),
            kbuildsycoca5: runner.has("kbuildsycoca5"),
            xdg_desktop_menu: runner.has("xdg-desktop-menu"),
            systemctl: runner.has("systemctl"),
            pkill: runner.has("pkill"),
        }
    }
}

/// Closed classification of the running desktop session. Unrecognized
/// environments land on `Other`, which performs no DE-specific action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesktopEnvironment {
    Kde,
    Gnome,
    Other,
}

impl DesktopEnvironment {
    pub fn detect() -> Self {
        Self::detect_from(|name| std::env::var(name).ok())
    }

    pub fn detect_from(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let session = lookup("XDG_CURRENT_DESKTOP")
            .or_else(|| lookup("DESKTOP_SESSION"))
            .unwrap_or_default()
            .to_ascii_lowercase();
        if session.contains("kde") || session.contains("plasma") {
            DesktopEnvironment::Kde
        } else if session.contains("gnome") {
            DesktopEnvironment::Gnome
        } else {
            DesktopEnvironment::Other
        }
    }
}

/// Seam between the package manager and the refresher, so tests can
/// count invocations without touching a desktop session.
pub trait DesktopRefresh {
    fn refresh(&self);
}

pub struct DesktopRefresher<'a, R: CommandRunner> {
    runner: &'a R,
    capabilities: Capabilities,
    desktop: DesktopEnvironment,
    home: PathBuf,
}

impl<'a, R: CommandRunner> DesktopRefresher<'a, R> {
    pub fn new(runner: &'a R, capabilities: Capabilities, desktop: DesktopEnvironment) -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
        Self::with_home(runner, capabilities, desktop, home)
    }

    pub fn with_home(
        runner: &'a R,
        capabilities: Capabilities,
        desktop: DesktopEnvironment,
        home: PathBuf,
    ) -> Self {
        DesktopRefresher {
            runner,
            capabilities,
            desktop,
            home,
        }
    }

    /// Application launcher directories: the Nix profile's share tree
    /// plus the user's own local applications.
    fn application_dirs(&self) -> [PathBuf; 2] {
        [
            self.home.join(".nix-profile/share/applications"),
            self.home.join(".local/share/applications"),
        ]
    }

    fn mime_dirs(&self) -> [PathBuf; 2] {
        [
            self.home.join(".nix-profile/share/mime"),
            self.home.join(".local/share/mime"),
        ]
    }

    fn icon_dirs(&self) -> [PathBuf; 2] {
        [
            self.home.join(".nix-profile/share/icons/hicolor"),
            self.home.join(".local/share/icons/hicolor"),
        ]
    }

    /// Run one advisory step with captured output; log and move on when
    /// it fails.
    fn advisory(&self, program: &str, args: &[&str]) {
        match self.runner.capture(program, args) {
            Ok(output) if output.success() => {}
            Ok(output) => debug!(
                "advisory step '{program}' exited with {:?}: {}",
                output.code,
                output.stderr.trim()
            ),
            Err(err) => debug!("advisory step '{program}' could not run: {err}"),
        }
    }

    fn advisory_for_dirs(&self, program: &str, dirs: &[PathBuf]) {
        for dir in dirs {
            if dir.is_dir() {
                let dir = dir.display().to_string();
                self.advisory(program, &[dir.as_str()]);
            }
        }
    }

    fn refresh_kde_cache(&self) {
        if self.capabilities.kbuildsycoca6 {
            self.advisory("kbuildsycoca6", &[]);
        } else if self.capabilities.kbuildsycoca5 {
            self.advisory("kbuildsycoca5", &[]);
        }
    }
}

impl<R: CommandRunner> DesktopRefresh for DesktopRefresher<'_, R> {
    fn refresh(&self) {
        debug!("refreshing desktop integration ({:?})", self.desktop);

        if self.capabilities.desktop_database {
            self.advisory_for_dirs("update-desktop-database", &self.application_dirs());
        }
        if self.capabilities.mime_database {
            self.advisory_for_dirs("update-mime-database", &self.mime_dirs());
        }
        if self.capabilities.icon_cache {
            self.advisory_for_dirs("gtk-update-icon-cache", &self.icon_dirs());
        }

        match self.desktop {
            DesktopEnvironment::Kde => self.refresh_kde_cache(),
            // GNOME picks up desktop-database and icon-cache changes on
            // its own; no shell-specific rebuild tool exists.
            DesktopEnvironment::Gnome => {}
            DesktopEnvironment::Other => {}
        }

        if self.capabilities.xdg_desktop_menu {
            self.advisory("xdg-desktop-menu", &["forceupdate"]);
        }
        if self.capabilities.systemctl {
            self.advisory("systemctl", &["--user", "daemon-reload"]);
        }

        if self.capabilities.pkill {
            match self.desktop {
                DesktopEnvironment::Kde => self.runner.signal("plasmashell", "HUP"),
                DesktopEnvironment::Gnome => self.runner.signal("gnome-shell", "HUP"),
                DesktopEnvironment::Other => {}
            }
        }
    }
}
