//! Serde model of the container trust-policy document
//!
//! Mirrors the containers-policy.json(5) format closely enough that the
//! runtime accepts everything we write, while only modelling the rules
//! SoltrOS actually uses.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Public key the OS images are signed with.
pub const SIGNING_KEY_PATH: &str = "/etc/pki/containers/soltros.pub";

/// Fully-qualified repository prefixes pinned to signature verification
/// in the enforcing policy.
pub const SIGNED_REPOSITORIES: &[&str] = &[
    "ghcr.io/soltros/soltros",
    "ghcr.io/soltros/soltros-gnome",
    "ghcr.io/soltros/soltros-kde",
];

/// One rule in a policy requirement list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PolicyRequirement {
    #[serde(rename = "insecureAcceptAnything")]
    InsecureAcceptAnything,
    #[serde(rename = "reject")]
    Reject,
    #[serde(rename = "signedBy")]
    SignedBy {
        #[serde(rename = "keyType")]
        key_type: String,
        #[serde(rename = "keyPath")]
        key_path: PathBuf,
        #[serde(rename = "signedIdentity", skip_serializing_if = "Option::is_none")]
        signed_identity: Option<SignedIdentity>,
    },
}

impl PolicyRequirement {
    fn signed_by_soltros() -> Self {
        PolicyRequirement::SignedBy {
            key_type: "GPGKeys".to_string(),
            key_path: PathBuf::from(SIGNING_KEY_PATH),
            signed_identity: Some(SignedIdentity::MatchRepository),
        }
    }
}

/// Identity constraint on a signed image: the pulled image must claim
/// the repository it was pulled from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SignedIdentity {
    #[serde(rename = "matchRepository")]
    MatchRepository,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Transports {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub docker: BTreeMap<String, Vec<PolicyRequirement>>,
}

impl Transports {
    fn is_empty(&self) -> bool {
        self.docker.is_empty()
    }
}

/// The complete trust-policy document. `default` is a required key; a
/// document without one does not parse and therefore never validates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustPolicy {
    pub default: Vec<PolicyRequirement>,
    #[serde(default, skip_serializing_if = "Transports::is_empty")]
    pub transports: Transports,
}

impl TrustPolicy {
    /// Transient bootstrap state: accept any image from anywhere. Only
    /// ever written inside a scoped guard or an explicit `trust relax`.
    pub fn permissive() -> Self {
        TrustPolicy {
            default: vec![PolicyRequirement::InsecureAcceptAnything],
            transports: Transports::default(),
        }
    }

    /// Steady state: accept everything by default, but pin the SoltrOS
    /// image repositories to signature verification so a spoofed OS
    /// image cannot slip in through the front door.
    pub fn enforcing() -> Self {
        let docker = SIGNED_REPOSITORIES
            .iter()
            .map(|repo| {
                (
                    repo.to_string(),
                    vec![PolicyRequirement::signed_by_soltros()],
                )
            })
            .collect();
        TrustPolicy {
            default: vec![PolicyRequirement::InsecureAcceptAnything],
            transports: Transports { docker },
        }
    }

    pub fn is_permissive(&self) -> bool {
        self.transports.docker.is_empty()
            && self
                .default
                .iter()
                .all(|rule| matches!(rule, PolicyRequirement::InsecureAcceptAnything))
    }

    /// Human-readable name of the default rule, for `trust status`.
    pub fn default_rule_name(&self) -> &'static str {
        match self.default.first() {
            Some(PolicyRequirement::InsecureAcceptAnything) => "insecureAcceptAnything",
            Some(PolicyRequirement::Reject) => "reject",
            Some(PolicyRequirement::SignedBy { .. }) => "signedBy",
            None => "(empty)",
        }
    }
}
