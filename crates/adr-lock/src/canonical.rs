// canonical.rs — Canonical serialization of a decision for digesting.
//
// Layout:
//
//   <front matter as compact JSON, object keys sorted at every level>
//   \n---\n
//   <body with CRLF/CR turned into LF and trailing whitespace removed>
//
// Two decisions with the same canonical form are the same decision for
// tamper-detection purposes, no matter how their YAML was laid out.

use adr_core::Decision;
use serde_json::{Map, Value};

use crate::error::LockError;
use crate::hasher::hash_str;

const SEPARATOR: &str = "\n---\n";

pub fn canonical_form(decision: &Decision) -> Result<String, LockError> {
    let front_matter = sort_keys(serde_json::to_value(&decision.front_matter)?);
    let json = serde_json::to_string(&front_matter)?;
    Ok(format!("{}{}{}", json, SEPARATOR, normalize_body(&decision.body)))
}

/// SHA-256 of the canonical form.
pub fn digest(decision: &Decision) -> Result<String, LockError> {
    Ok(hash_str(&canonical_form(decision)?))
}

fn normalize_body(body: &str) -> String {
    body.replace("\r\n", "\n")
        .replace('\r', "\n")
        .trim_end()
        .to_string()
}

/// Rebuild every object with keys in sorted order, independent of how the
/// JSON map type orders insertions.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (k, v) in entries {
                sorted.insert(k, sort_keys(v));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adr_core::{parse_markdown, DecisionStatus};
    use std::path::Path;

    const DOC: &str = "---\nid: ADR-0001\ntitle: Use FastAPI\nstatus: accepted\ndate: 2024-01-15\ntags: [api]\n---\n\n## Decision\n\nUse FastAPI.\n";

    #[test]
    fn yaml_layout_does_not_change_digest() {
        let a = parse_markdown(DOC, Path::new("a.md")).unwrap();
        let reordered = "---\ntags:\n  - api\ndate: 2024-01-15\nstatus: accepted\ntitle: Use FastAPI\nid: ADR-0001\n---\n## Decision\r\n\r\nUse FastAPI.\r\n\r\n";
        let b = parse_markdown(reordered, Path::new("b.md")).unwrap();
        assert_eq!(digest(&a).unwrap(), digest(&b).unwrap());
    }

    #[test]
    fn body_and_metadata_changes_change_digest() {
        let a = parse_markdown(DOC, Path::new("a.md")).unwrap();
        let mut body = a.clone();
        body.body.push_str("\nMore.");
        let mut status = a.clone();
        status.front_matter.status = DecisionStatus::Deprecated;
        let base = digest(&a).unwrap();
        assert_ne!(base, digest(&body).unwrap());
        assert_ne!(base, digest(&status).unwrap());
    }

    #[test]
    fn canonical_keys_are_sorted() {
        let a = parse_markdown(DOC, Path::new("a.md")).unwrap();
        let form = canonical_form(&a).unwrap();
        let date = form.find("\"date\"").unwrap();
        let id = form.find("\"id\"").unwrap();
        let title = form.find("\"title\"").unwrap();
        assert!(date < id && id < title);
        assert!(form.ends_with("---\n## Decision\n\nUse FastAPI."));
    }
}
