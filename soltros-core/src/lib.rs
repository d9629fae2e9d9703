//! soltros-core - library behind the `soltros` maintenance helper
//!
//! SoltrOS is an immutable, image-based desktop; day-to-day package
//! management happens through a declarative Nix profile and OS updates
//! arrive as signed container images. This crate wraps those external
//! tools behind a validated, uniformly-logged interface:
//!
//! - [`pkg`] - the `nix profile` wrapper (install, remove, rollback, ...)
//! - [`refresh`] - best-effort desktop integration refresh after
//!   package-state changes
//! - [`trust`] - the container signature-policy store and the scoped
//!   relax/enforce guards used around privileged image updates

pub mod config;
pub mod error;
pub mod pkg;
pub mod process;
pub mod refresh;
pub mod trust;

pub use config::Config;
pub use error::{Result, SoltrosError};
