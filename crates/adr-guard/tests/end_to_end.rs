// end_to_end.rs — Decisions on disk through index, guard, and lock.
//
// Flow:
//   1. Write decision files into docs/adr of a temporary project
//   2. Guard a diff (index rebuilt from the directory on the way)
//   3. Approve a decision, verify it, edit it, verify again

use std::fs;

use adr_core::{
    AdrConfig, BoundaryRule, Decision, DecisionStatus, DecisionStore, FrontMatter, Layer,
    PolicyModel,
};
use adr_guard::{GuardSystem, NoticeSource, Severity, ViolationKind};
use adr_lock::{ImmutabilityManager, LockStore, VerifyStatus};
use chrono::NaiveDate;
use tempfile::TempDir;

fn write_decision(
    store: &DecisionStore,
    id: &str,
    title: &str,
    body: &str,
    policy: Option<PolicyModel>,
) -> Decision {
    let mut fm = FrontMatter::new(id, title, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    fm.status = DecisionStatus::Accepted;
    fm.policy = policy;
    let mut decision = Decision::new(fm, body);
    let path = store.path_for(&decision);
    store.save(&decision, &path).unwrap();
    decision.path = Some(path);
    decision
}

fn project() -> (TempDir, AdrConfig, DecisionStore) {
    let dir = TempDir::new().unwrap();
    let config = AdrConfig::for_project(dir.path());
    let store = DecisionStore::new(&config.adr_dir);
    (dir, config, store)
}

#[test]
fn flask_import_violates_accepted_decision() {
    let (_dir, config, store) = project();
    let mut policy = PolicyModel::default();
    policy.imports.disallow.insert("flask".to_string());
    write_decision(
        &store,
        "K-0001",
        "Standardise on FastAPI",
        "## Decision\n\nAll new services use FastAPI.\n",
        Some(policy),
    );

    let diff = "\
diff --git a/app.py b/app.py
--- a/app.py
+++ b/app.py
@@ -1,2 +1,3 @@
 import os
+import flask

";
    let report = GuardSystem::new(config).analyze(diff, true).unwrap();

    assert_eq!(report.violations.len(), 1);
    let v = &report.violations[0];
    assert_eq!(v.severity, Severity::Error);
    assert_eq!(v.kind, ViolationKind::DisallowedImport);
    assert_eq!(v.file, "app.py");
    assert_eq!(v.decision_id, "K-0001");
    assert!(report.has_errors);
    assert_eq!(report.analyzed_files, vec!["app.py"]);

    let json = serde_json::to_value(&report).unwrap();
    let first = &json["violations"][0];
    for field in ["kind", "severity", "message", "file", "line", "decision_id", "suggested_fix"] {
        assert!(!first[field].is_null(), "missing {}", field);
    }
    assert_eq!(first["kind"], "disallowed_import");
}

#[test]
fn utils_importing_components_is_one_boundary_violation() {
    let (_dir, config, store) = project();
    let mut policy = PolicyModel::default();
    policy.boundaries.layers = vec![
        Layer {
            name: "utils".to_string(),
            path: "src/utils/**".to_string(),
        },
        Layer {
            name: "components".to_string(),
            path: "src/components/**".to_string(),
        },
    ];
    policy.boundaries.rules = vec![BoundaryRule {
        forbid: "utils → components".to_string(),
    }];
    write_decision(&store, "ADR-0007", "Layered frontend", "Keep utilities UI-free.", Some(policy));

    let diff = "\
--- a/src/utils/format.ts
+++ b/src/utils/format.ts
@@ -1,1 +1,3 @@
 export const pad = (s: string) => s;
+import { Button } from '../components/Button';
+import { clamp } from './math';
--- a/src/components/Card.tsx
+++ b/src/components/Card.tsx
@@ -1,0 +2,1 @@
+import { pad } from '../utils/format';
";
    let report = GuardSystem::new(config).analyze(diff, true).unwrap();

    let boundary: Vec<_> = report
        .violations
        .iter()
        .filter(|v| v.kind == ViolationKind::BoundaryViolation)
        .collect();
    assert_eq!(boundary.len(), 1);
    assert_eq!(boundary[0].file, "src/utils/format.ts");
    assert_eq!(boundary[0].line, Some(2));
    assert!(boundary[0].message.contains("utils → components"));
    assert_eq!(report.violations.len(), 1);
}

#[test]
fn malformed_hunk_is_contained() {
    let (_dir, config, store) = project();
    let mut policy = PolicyModel::default();
    policy.imports.disallow.insert("requests".to_string());
    write_decision(&store, "ADR-0002", "Use httpx", "Use httpx for HTTP.", Some(policy));

    let diff = "\
--- a/client.py
+++ b/client.py
@@ -1,2 +1,3 @@
 import os
?garbage line
+import requests
@@ -20,1 +21,2 @@
 x = 1
+import requests
";
    let report = GuardSystem::new(config).analyze(diff, true).unwrap();

    assert_eq!(report.errors().count(), 1);
    assert_eq!(report.violations[0].line, Some(22));
    let diff_notices: Vec<_> = report
        .notices
        .iter()
        .filter(|n| n.source == NoticeSource::Diff)
        .collect();
    assert_eq!(diff_notices.len(), 1);
    assert!(report.has_warnings);
}

#[test]
fn unreadable_decision_becomes_a_notice() {
    let (_dir, config, store) = project();
    let mut policy = PolicyModel::default();
    policy.imports.disallow.insert("flask".to_string());
    write_decision(&store, "ADR-0001", "No Flask", "", Some(policy));
    fs::write(config.adr_dir.join("ADR-0002-broken.md"), "no front matter here").unwrap();

    let diff = "--- a/app.py\n+++ b/app.py\n@@ -0,0 +1 @@\n+import flask\n";
    let report = GuardSystem::new(config).analyze(diff, true).unwrap();
    assert_eq!(report.errors().count(), 1);
    assert!(report
        .notices
        .iter()
        .any(|n| n.source == NoticeSource::Decision));
}

#[test]
fn approve_verify_and_detect_tampering() {
    let (_dir, config, store) = project();
    let decision = write_decision(&store, "ADR-0003", "Use PostgreSQL", "## Decision\n\nUse PostgreSQL.\n", None);
    let manager = ImmutabilityManager::new(LockStore::new(&config.lock_file));

    manager.approve(&decision, false).unwrap();
    let clean = manager.verify(&decision).unwrap();
    assert!(!clean.tampered);
    assert_eq!(clean.status, VerifyStatus::Intact);

    let path = decision.path.clone().unwrap();
    let text = fs::read_to_string(&path).unwrap();
    fs::write(&path, text.replace("Use PostgreSQL.", "Use MySQL.")).unwrap();

    let dirty = manager.verify(&decision).unwrap();
    assert!(dirty.tampered);
    assert_ne!(dirty.expected_digest, dirty.actual_digest);
    assert!(config.lock_file.is_file());
}
