// manager.rs — ImmutabilityManager: approve (lock) and verify decisions.
//
// Approval records the digest of a decision's canonical form in the lock
// store. Verification recomputes the digest from the decision's current
// on-disk form and compares.
//
// Marking the file read-only is a second, best-effort step. The lock record
// is authoritative: if the permission change fails the lock stays, the
// failure is reported, and `is_readonly` remains false.

use std::fs;
use std::path::Path;

use adr_core::{parse_markdown, CoreError, Decision, DecisionStatus, LoadFailure};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::canonical::digest;
use crate::error::LockError;
use crate::store::{LockRecord, LockStore};

/// Result of `approve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    pub lock: LockRecord,
    /// Set when the read-only step was requested and failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readonly_error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerifyStatus {
    /// Digest matches the lock.
    Intact,
    /// Digest differs from the lock.
    Tampered,
    /// No lock exists for this decision.
    Unlocked,
    /// A lock exists but its decision file is gone.
    Missing,
}

impl std::fmt::Display for VerifyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerifyStatus::Intact => write!(f, "intact"),
            VerifyStatus::Tampered => write!(f, "TAMPERED"),
            VerifyStatus::Unlocked => write!(f, "unlocked"),
            VerifyStatus::Missing => write!(f, "missing"),
        }
    }
}

/// Result of verifying one decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verification {
    pub decision_id: String,
    pub status: VerifyStatus,
    pub tampered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_digest: Option<String>,
    /// Non-tamper irregularity, e.g. an accepted decision that was never locked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<String>,
}

pub struct ImmutabilityManager {
    store: LockStore,
}

impl ImmutabilityManager {
    pub fn new(store: LockStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &LockStore {
        &self.store
    }

    /// Lock a decision's current form. Re-approving overwrites the lock.
    pub fn approve(
        &self,
        decision: &Decision,
        make_readonly: bool,
    ) -> Result<Approval, LockError> {
        let current = current_form(decision)?;
        let mut lock = LockRecord {
            decision_id: current.id().to_string(),
            digest: digest(&current)?,
            locked_at: Utc::now(),
            is_readonly: false,
            file: decision.path.clone(),
        };
        self.store.put(lock.clone())?;
        tracing::info!(id = %lock.decision_id, digest = %lock.digest, "decision locked");

        let mut readonly_error = None;
        if make_readonly {
            match decision.path.as_deref().map(set_readonly) {
                Some(Ok(())) => {
                    lock.is_readonly = true;
                    self.store.put(lock.clone())?;
                }
                Some(Err(e)) => {
                    tracing::warn!(
                        id = %lock.decision_id,
                        "could not mark decision read-only: {}",
                        e
                    );
                    readonly_error = Some(e.to_string());
                }
                None => {
                    readonly_error = Some("decision has no file to mark read-only".to_string());
                }
            }
        }

        Ok(Approval {
            lock,
            readonly_error,
        })
    }

    /// Compare a decision's current on-disk form with its lock.
    pub fn verify(&self, decision: &Decision) -> Result<Verification, LockError> {
        let lock = self.store.get(decision.id())?;
        self.verify_against(decision, lock)
    }

    /// Verify every decision plus every lock whose decision was not loaded.
    ///
    /// `failures` are the files the store could not parse. A lock whose file
    /// is still on disk but did not yield its decision (unparsable, or its id
    /// was edited) counts as tampered; a lock whose file is gone is missing.
    pub fn verify_all(
        &self,
        decisions: &[Decision],
        failures: &[LoadFailure],
    ) -> Result<Vec<Verification>, LockError> {
        let mut locks = self.store.load()?;
        let mut out = Vec::new();
        for decision in decisions {
            let lock = locks.remove(decision.id());
            out.push(self.verify_against(decision, lock)?);
        }
        for (id, lock) in locks {
            let failure = lock
                .file
                .as_deref()
                .and_then(|file| failures.iter().find(|f| f.path == file));
            let on_disk = lock.file.as_deref().is_some_and(Path::exists);
            let (status, anomaly) = match failure {
                Some(f) => (
                    VerifyStatus::Tampered,
                    format!("locked decision no longer loads: {}", f.reason),
                ),
                None if on_disk => (
                    VerifyStatus::Tampered,
                    format!("locked decision file no longer holds {}", id),
                ),
                None => (
                    VerifyStatus::Missing,
                    "locked decision no longer exists".to_string(),
                ),
            };
            let tampered = status == VerifyStatus::Tampered;
            if tampered {
                tracing::warn!(id = %id, "{}", anomaly);
            }
            out.push(Verification {
                decision_id: id,
                status,
                tampered,
                expected_digest: Some(lock.digest),
                actual_digest: None,
                anomaly: Some(anomaly),
            });
        }
        Ok(out)
    }

    fn verify_against(
        &self,
        decision: &Decision,
        lock: Option<LockRecord>,
    ) -> Result<Verification, LockError> {
        let current = current_form(decision)?;
        let actual = digest(&current)?;
        let id = decision.id().to_string();

        let Some(lock) = lock else {
            let anomaly = (current.status() == DecisionStatus::Accepted)
                .then(|| "accepted decision has no lock record".to_string());
            return Ok(Verification {
                decision_id: id,
                status: VerifyStatus::Unlocked,
                tampered: false,
                expected_digest: None,
                actual_digest: Some(actual),
                anomaly,
            });
        };

        let tampered = lock.digest != actual;
        if tampered {
            tracing::warn!(
                id = %id,
                expected = %lock.digest,
                actual = %actual,
                "decision modified after approval"
            );
        }
        Ok(Verification {
            decision_id: id,
            status: if tampered {
                VerifyStatus::Tampered
            } else {
                VerifyStatus::Intact
            },
            tampered,
            expected_digest: Some(lock.digest),
            actual_digest: Some(actual),
            anomaly: None,
        })
    }
}

/// The decision as it is on disk now, or the given value when it has no file.
fn current_form(decision: &Decision) -> Result<Decision, LockError> {
    let Some(path) = decision.path.as_deref() else {
        return Ok(decision.clone());
    };
    let text = fs::read_to_string(path).map_err(|source| CoreError::IoError {
        path: path.to_path_buf(),
        source,
    })?;
    let mut loaded = parse_markdown(&text, path)?;
    loaded.path = Some(path.to_path_buf());
    Ok(loaded)
}

fn set_readonly(path: &Path) -> std::io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(true);
    fs::set_permissions(path, perms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use adr_core::{DecisionStore, FrontMatter};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn setup(dir: &Path) -> (DecisionStore, ImmutabilityManager, Decision) {
        let store = DecisionStore::new(dir.join("docs/adr"));
        let mut fm = FrontMatter::new(
            "ADR-0001",
            "Use FastAPI",
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        );
        fm.status = DecisionStatus::Accepted;
        let mut decision = Decision::new(fm, "## Decision\n\nUse FastAPI.\n");
        let path = store.path_for(&decision);
        store.save(&decision, &path).unwrap();
        decision.path = Some(path);
        let manager = ImmutabilityManager::new(LockStore::new(dir.join(".adr/locks.json")));
        (store, manager, decision)
    }

    #[test]
    fn approve_then_verify_is_intact() {
        let dir = tempdir().unwrap();
        let (_, manager, decision) = setup(dir.path());
        let approval = manager.approve(&decision, false).unwrap();
        assert!(approval.readonly_error.is_none());

        let v = manager.verify(&decision).unwrap();
        assert_eq!(v.status, VerifyStatus::Intact);
        assert!(!v.tampered);
        assert_eq!(v.expected_digest, v.actual_digest);
    }

    #[test]
    fn edited_body_is_tampered() {
        let dir = tempdir().unwrap();
        let (store, manager, decision) = setup(dir.path());
        manager.approve(&decision, false).unwrap();

        let path = decision.path.clone().unwrap();
        let mut edited = store.load(&path).unwrap();
        edited.body.push_str("\nActually, use Flask.\n");
        store.save(&edited, &path).unwrap();

        // The stale in-memory value still verifies against the disk form.
        let v = manager.verify(&decision).unwrap();
        assert!(v.tampered);
        assert_eq!(v.status, VerifyStatus::Tampered);
        assert_ne!(v.expected_digest, v.actual_digest);
    }

    #[test]
    fn reapproval_overwrites_lock() {
        let dir = tempdir().unwrap();
        let (store, manager, decision) = setup(dir.path());
        let first = manager.approve(&decision, false).unwrap();

        let path = decision.path.clone().unwrap();
        let mut edited = store.load(&path).unwrap();
        edited.front_matter.tags.push("backend".to_string());
        store.save(&edited, &path).unwrap();

        let second = manager.approve(&edited, false).unwrap();
        assert_ne!(first.lock.digest, second.lock.digest);
        assert_eq!(manager.verify(&edited).unwrap().status, VerifyStatus::Intact);
        assert_eq!(manager.store().load().unwrap().len(), 1);
    }

    #[test]
    fn unlocked_accepted_decision_is_an_anomaly_not_tamper() {
        let dir = tempdir().unwrap();
        let (_, manager, decision) = setup(dir.path());
        let v = manager.verify(&decision).unwrap();
        assert_eq!(v.status, VerifyStatus::Unlocked);
        assert!(!v.tampered);
        assert!(v.anomaly.is_some());
    }

    #[test]
    fn readonly_step_sets_flag() {
        let dir = tempdir().unwrap();
        let (_, manager, decision) = setup(dir.path());
        let approval = manager.approve(&decision, true).unwrap();
        assert!(approval.readonly_error.is_none());
        assert!(approval.lock.is_readonly);
        let path = decision.path.clone().unwrap();
        assert!(fs::metadata(&path).unwrap().permissions().readonly());
        assert!(manager.store().get("ADR-0001").unwrap().unwrap().is_readonly);
    }

    #[test]
    fn readonly_failure_keeps_the_lock() {
        let dir = tempdir().unwrap();
        let manager = ImmutabilityManager::new(LockStore::new(dir.path().join("locks.json")));
        let decision = Decision::new(
            FrontMatter::new(
                "ADR-0009",
                "In memory",
                NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            ),
            "Body.",
        );
        let approval = manager.approve(&decision, true).unwrap();
        assert!(approval.readonly_error.is_some());
        assert!(!approval.lock.is_readonly);
        assert!(manager.store().get("ADR-0009").unwrap().is_some());
    }

    #[test]
    fn verify_all_reports_missing_decisions() {
        let dir = tempdir().unwrap();
        let (_, manager, decision) = setup(dir.path());
        manager.approve(&decision, false).unwrap();
        fs::remove_file(decision.path.as_ref().unwrap()).unwrap();
        let results = manager.verify_all(&[], &[]).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, VerifyStatus::Missing);
        assert!(!results[0].tampered);
    }

    #[test]
    fn unparsable_locked_decision_is_tampered() {
        let dir = tempdir().unwrap();
        let (store, manager, decision) = setup(dir.path());
        manager.approve(&decision, false).unwrap();

        let path = decision.path.clone().unwrap();
        let text = fs::read_to_string(&path).unwrap();
        fs::write(&path, text.replace("status: accepted", "status: [broken")).unwrap();

        let snapshot = store.load_all().unwrap();
        assert!(snapshot.decisions.is_empty());
        assert_eq!(snapshot.failures.len(), 1);

        let results = manager
            .verify_all(&snapshot.decisions, &snapshot.failures)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].decision_id, "ADR-0001");
        assert_eq!(results[0].status, VerifyStatus::Tampered);
        assert!(results[0].tampered);
        assert!(results[0]
            .anomaly
            .as_deref()
            .unwrap()
            .contains("no longer loads"));
    }

    #[test]
    fn edited_id_is_tampered() {
        let dir = tempdir().unwrap();
        let (store, manager, decision) = setup(dir.path());
        manager.approve(&decision, false).unwrap();

        let path = decision.path.clone().unwrap();
        let text = fs::read_to_string(&path).unwrap();
        fs::write(&path, text.replace("ADR-0001", "ADR-0042")).unwrap();

        let snapshot = store.load_all().unwrap();
        let results = manager
            .verify_all(&snapshot.decisions, &snapshot.failures)
            .unwrap();
        let old = results.iter().find(|v| v.decision_id == "ADR-0001").unwrap();
        assert_eq!(old.status, VerifyStatus::Tampered);
    }
}
