//! Runtime configuration
//!
//! One `Config` is built at startup from the environment plus CLI flags
//! and passed by reference into every handler. Nothing reads the process
//! environment after startup.

use std::path::PathBuf;

/// Default package source: the system flake shipped with the OS image.
pub const DEFAULT_FLAKE_PATH: &str = "/usr/share/soltros/flake";

#[derive(Debug, Clone)]
pub struct Config {
    /// Flake used as the package source for installs and lock updates.
    pub flake_path: PathBuf,
    /// Emit extra diagnostic lines (maps to a `debug` log filter).
    pub verbose: bool,
    /// Suppress informational and warning lines, never error output.
    pub quiet: bool,
}

impl Config {
    /// Build from an arbitrary variable lookup. Pure, so tests never
    /// have to mutate the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Config {
            flake_path: lookup("SOLTROS_FLAKE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FLAKE_PATH)),
            verbose: flag_set(lookup("SOLTROS_VERBOSE")),
            quiet: flag_set(lookup("SOLTROS_QUIET")),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Apply CLI overrides on top of environment defaults.
    pub fn with_overrides(
        mut self,
        flake_path: Option<PathBuf>,
        verbose: bool,
        quiet: bool,
    ) -> Self {
        if let Some(path) = flake_path {
            self.flake_path = path;
        }
        self.verbose = self.verbose || verbose;
        self.quiet = self.quiet || quiet;
        self
    }
}

fn flag_set(value: Option<String>) -> bool {
    match value.as_deref() {
        Some("") | Some("0") | Some("false") | None => false,
        Some(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup_from<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.flake_path, PathBuf::from(DEFAULT_FLAKE_PATH));
        assert!(!config.verbose);
        assert!(!config.quiet);
    }

    #[test]
    fn environment_overrides_flake_path_and_flags() {
        let config = Config::from_lookup(lookup_from(&[
            ("SOLTROS_FLAKE_PATH", "/var/home/user/flake"),
            ("SOLTROS_VERBOSE", "1"),
        ]));
        assert_eq!(config.flake_path, PathBuf::from("/var/home/user/flake"));
        assert!(config.verbose);
        assert!(!config.quiet);
    }

    #[test]
    fn zero_and_false_do_not_enable_flags() {
        let config = Config::from_lookup(lookup_from(&[
            ("SOLTROS_VERBOSE", "0"),
            ("SOLTROS_QUIET", "false"),
        ]));
        assert!(!config.verbose);
        assert!(!config.quiet);
    }

    #[test]
    fn cli_overrides_win_over_environment() {
        let config = Config::from_lookup(lookup_from(&[(
            "SOLTROS_FLAKE_PATH",
            "/from/env",
        )]))
        .with_overrides(Some(PathBuf::from("/from/cli")), false, true);
        assert_eq!(config.flake_path, PathBuf::from("/from/cli"));
        assert!(config.quiet);
    }
}
