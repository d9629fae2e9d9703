//! Container signature-policy management
//!
//! SoltrOS pulls its OS image from a signed container repository; the
//! container runtime consults `/etc/containers/policy.json` on every
//! pull. This module owns the only code that writes that document:
//!
//! - [`policy`] - the serde model of the policy format and the two
//!   states the system alternates between (permissive / enforcing)
//! - [`store`] - backup, atomic replace and read-back verification of
//!   the live document
//! - [`guard`] - scoped policy toggles around a privileged upgrade, so
//!   a permissive document is never the last-written state after a
//!   failure
//!
//! The system must never be left simultaneously without a policy and
//! mid-write; every replacement is backup-then-atomic-swap.

pub mod guard;
pub mod policy;
pub mod store;

pub use guard::{with_enforced_policy, with_permissive_policy};
pub use policy::{PolicyRequirement, SignedIdentity, TrustPolicy};
pub use store::PolicyStore;
