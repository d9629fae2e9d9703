//! Scoped policy toggles around a privileged operation
//!
//! The emergency-fix flow needs a permissive policy just long enough to
//! pull one image, and the routine update flow needs an enforcing
//! policy just long enough to do the same. Both are resource scopes:
//! acquire the temporary policy, run the operation, and put the policy
//! back on every exit path, so a transient state is never the
//! last-written document after a failure.

use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::error::Result;
use crate::trust::policy::TrustPolicy;
use crate::trust::store::PolicyStore;

/// Relax trust, run `op` (typically the privileged image pull), then
/// enforce. If `op` fails, the pre-run document is restored from the
/// backup taken on entry and the failure propagates; the permissive
/// policy never survives the scope.
///
/// Returns the backup path of the pre-run document, when one was made.
pub fn with_permissive_policy<F>(store: &PolicyStore, op: F) -> Result<Option<PathBuf>>
where
    F: FnOnce() -> Result<()>,
{
    let backup = store.apply(&TrustPolicy::permissive())?;
    store.mark_relaxed();
    info!("trust policy relaxed for the duration of this operation");

    match op() {
        Ok(()) => {
            store.apply(&TrustPolicy::enforcing())?;
            store.clear_relaxed();
            info!("trust policy re-enforced");
            Ok(backup)
        }
        Err(op_err) => {
            match &backup {
                Some(path) => match store.restore(path) {
                    Ok(()) => warn!("operation failed; restored policy from {}", path.display()),
                    Err(restore_err) => error!(
                        "operation failed AND the policy backup at {} could not be \
                         restored: {restore_err}. Restore it manually before pulling images.",
                        path.display()
                    ),
                },
                None => {
                    // Nothing to restore; fall back to the enforcing
                    // document rather than leave the system permissive.
                    if let Err(apply_err) = store.apply(&TrustPolicy::enforcing()) {
                        error!("could not re-enforce trust policy: {apply_err}");
                    }
                }
            }
            store.clear_relaxed();
            Err(op_err)
        }
    }
}

/// Enforce trust for the duration of `op`, then return to the relaxed
/// state only if the marker file said trust was relaxed beforehand.
/// `op`'s outcome propagates either way.
pub fn with_enforced_policy<F>(store: &PolicyStore, op: F) -> Result<Option<PathBuf>>
where
    F: FnOnce() -> Result<()>,
{
    let was_relaxed = store.is_relaxed();
    let backup = store.apply(&TrustPolicy::enforcing())?;

    let outcome = op();

    if was_relaxed {
        match store.apply(&TrustPolicy::permissive()) {
            Ok(_) => info!("returned trust policy to its previous relaxed state"),
            Err(err) => warn!("could not restore relaxed policy: {err}"),
        }
    }

    outcome.map(|()| backup)
}
