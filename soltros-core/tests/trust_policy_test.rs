//! Integration tests for the policy store and the scoped guards

use std::fs;

use pretty_assertions::assert_eq;
use soltros_core::trust::{
    with_enforced_policy, with_permissive_policy, PolicyStore, TrustPolicy,
};
use soltros_core::SoltrosError;
use tempfile::TempDir;

fn backups_in(dir: &TempDir) -> Vec<std::path::PathBuf> {
    let mut backups: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("policy.json.backup-"))
        })
        .collect();
    backups.sort();
    backups
}

#[test]
fn apply_over_existing_policy_leaves_one_identical_backup() {
    let dir = TempDir::new().unwrap();
    let store = PolicyStore::at(dir.path());

    store.apply(&TrustPolicy::permissive()).unwrap();
    let before = fs::read(store.policy_path()).unwrap();

    let backup = store.apply(&TrustPolicy::enforcing()).unwrap();

    let backups = backups_in(&dir);
    assert_eq!(backups.len(), 1);
    assert_eq!(backup.as_deref(), Some(backups[0].as_path()));
    assert_eq!(fs::read(&backups[0]).unwrap(), before);

    // Live document is valid JSON with a `default` key.
    let live: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.policy_path()).unwrap()).unwrap();
    assert!(live.get("default").is_some());
}

#[test]
fn first_apply_makes_no_backup() {
    let dir = TempDir::new().unwrap();
    let store = PolicyStore::at(dir.path());

    let backup = store.apply(&TrustPolicy::enforcing()).unwrap();

    assert_eq!(backup, None);
    assert!(backups_in(&dir).is_empty());
    assert_eq!(store.load().unwrap(), TrustPolicy::enforcing());
}

#[test]
fn malformed_document_is_rolled_back_to_the_previous_one() {
    let dir = TempDir::new().unwrap();
    let store = PolicyStore::at(dir.path());

    store.apply(&TrustPolicy::enforcing()).unwrap();
    let before = fs::read(store.policy_path()).unwrap();

    let err = store.apply_document("{ this is not json").unwrap_err();

    assert!(matches!(err, SoltrosError::PolicyWrite { .. }));
    assert_eq!(fs::read(store.policy_path()).unwrap(), before);
}

#[test]
fn malformed_document_with_no_prior_policy_is_removed() {
    let dir = TempDir::new().unwrap();
    let store = PolicyStore::at(dir.path());

    let err = store.apply_document("[]").unwrap_err();

    assert!(matches!(err, SoltrosError::PolicyWrite { .. }));
    assert!(!store.exists());
}

#[test]
fn valid_but_non_policy_json_also_fails_validation() {
    let dir = TempDir::new().unwrap();
    let store = PolicyStore::at(dir.path());

    store.apply(&TrustPolicy::enforcing()).unwrap();
    let before = fs::read(store.policy_path()).unwrap();

    // Well-formed JSON, but no `default` key.
    let err = store
        .apply_document(r#"{"transports": {"docker": {}}}"#)
        .unwrap_err();

    assert!(matches!(err, SoltrosError::PolicyWrite { .. }));
    assert_eq!(fs::read(store.policy_path()).unwrap(), before);
}

#[test]
fn permissive_guard_enforces_after_a_successful_operation() {
    let dir = TempDir::new().unwrap();
    let store = PolicyStore::at(dir.path());
    store.apply(&TrustPolicy::enforcing()).unwrap();

    let backup = with_permissive_policy(&store, || Ok(())).unwrap();

    assert!(backup.is_some());
    assert_eq!(store.load().unwrap(), TrustPolicy::enforcing());
    assert!(!store.is_relaxed());
}

#[test]
fn permissive_guard_restores_the_pre_run_document_on_failure() {
    let dir = TempDir::new().unwrap();
    let store = PolicyStore::at(dir.path());
    store.apply(&TrustPolicy::enforcing()).unwrap();
    let before = fs::read(store.policy_path()).unwrap();

    let err = with_permissive_policy(&store, || {
        // The privileged upgrade failing mid-scope.
        Err(SoltrosError::ExternalCommand {
            program: "bootc".to_string(),
            code: Some(1),
        })
    })
    .unwrap_err();

    assert!(matches!(err, SoltrosError::ExternalCommand { .. }));
    assert_eq!(fs::read(store.policy_path()).unwrap(), before);
    assert!(!store.is_relaxed());
}

#[test]
fn permissive_guard_with_no_prior_policy_still_ends_enforcing() {
    let dir = TempDir::new().unwrap();
    let store = PolicyStore::at(dir.path());

    let err = with_permissive_policy(&store, || {
        Err(SoltrosError::ExternalCommand {
            program: "bootc".to_string(),
            code: Some(1),
        })
    })
    .unwrap_err();

    assert!(matches!(err, SoltrosError::ExternalCommand { .. }));
    // Never left permissive as the last-written state.
    assert_eq!(store.load().unwrap(), TrustPolicy::enforcing());
}

#[test]
fn enforced_guard_returns_to_relaxed_state_when_marker_was_set() {
    let dir = TempDir::new().unwrap();
    let store = PolicyStore::at(dir.path());
    store.apply(&TrustPolicy::permissive()).unwrap();
    store.mark_relaxed();

    with_enforced_policy(&store, || Ok(())).unwrap();

    assert!(store.load().unwrap().is_permissive());
    assert!(store.is_relaxed());
}

#[test]
fn enforced_guard_stays_enforcing_without_the_marker() {
    let dir = TempDir::new().unwrap();
    let store = PolicyStore::at(dir.path());
    store.apply(&TrustPolicy::enforcing()).unwrap();

    with_enforced_policy(&store, || Ok(())).unwrap();

    assert_eq!(store.load().unwrap(), TrustPolicy::enforcing());
}

#[test]
fn enforced_guard_propagates_failure_but_still_restores_relaxed_state() {
    let dir = TempDir::new().unwrap();
    let store = PolicyStore::at(dir.path());
    store.apply(&TrustPolicy::permissive()).unwrap();
    store.mark_relaxed();

    let err = with_enforced_policy(&store, || {
        Err(SoltrosError::ExternalCommand {
            program: "bootc".to_string(),
            code: Some(2),
        })
    })
    .unwrap_err();

    assert!(matches!(err, SoltrosError::ExternalCommand { code: Some(2), .. }));
    assert!(store.load().unwrap().is_permissive());
}

#[test]
fn repeated_applies_keep_every_backup() {
    let dir = TempDir::new().unwrap();
    let store = PolicyStore::at(dir.path());

    store.apply(&TrustPolicy::permissive()).unwrap();
    store.apply(&TrustPolicy::enforcing()).unwrap();
    store.apply(&TrustPolicy::permissive()).unwrap();
    store.apply(&TrustPolicy::enforcing()).unwrap();

    // Three mutations over an existing file, three backups, even within
    // the same clock second.
    assert_eq!(backups_in(&dir).len(), 3);
}
