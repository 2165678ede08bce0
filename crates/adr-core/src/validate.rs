// validate.rs — Semantic validation rules for decision metadata.
//
// These checks cover lifecycle consistency that the YAML shape alone cannot
// express. Errors mark a record as invalid; warnings are advisory.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::decision::{Decision, DecisionStatus};

static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9]*-\d{4}$").expect("static regex"));

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum IssueLevel {
    Warning,
    Error,
}

impl std::fmt::Display for IssueLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueLevel::Warning => write!(f, "warning"),
            IssueLevel::Error => write!(f, "error"),
        }
    }
}

/// A single finding against one decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationIssue {
    pub level: IssueLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Short rule identifier, e.g. `superseded_requires_superseded_by`.
    pub rule: String,
}

impl ValidationIssue {
    fn error(field: &str, rule: &str, message: impl Into<String>) -> Self {
        Self {
            level: IssueLevel::Error,
            message: message.into(),
            field: Some(field.to_string()),
            rule: rule.to_string(),
        }
    }

    fn warning(field: &str, rule: &str, message: impl Into<String>) -> Self {
        Self {
            level: IssueLevel::Warning,
            message: message.into(),
            field: Some(field.to_string()),
            rule: rule.to_string(),
        }
    }
}

/// Run every metadata rule against a decision.
pub fn validate_decision(decision: &Decision) -> Vec<ValidationIssue> {
    let fm = &decision.front_matter;
    let mut issues = Vec::new();

    if !ID_RE.is_match(&fm.id) {
        issues.push(ValidationIssue::error(
            "id",
            "id_format",
            format!("id '{}' does not match KIND-NNNN", fm.id),
        ));
    }

    if fm.title.trim().is_empty() {
        issues.push(ValidationIssue::error("title", "title_required", "title is empty"));
    }

    if fm.status == DecisionStatus::Superseded && fm.superseded_by.is_empty() {
        issues.push(ValidationIssue::error(
            "superseded_by",
            "superseded_requires_superseded_by",
            "decisions with status 'superseded' must specify 'superseded_by'",
        ));
    }

    if fm.supersedes.iter().any(|id| id == &fm.id) {
        issues.push(ValidationIssue::error(
            "supersedes",
            "no_self_reference",
            "decision cannot supersede itself",
        ));
    }

    if fm.superseded_by.iter().any(|id| id == &fm.id) {
        issues.push(ValidationIssue::error(
            "superseded_by",
            "no_self_reference",
            "decision cannot be superseded by itself",
        ));
    }

    if fm.status == DecisionStatus::Proposed && !fm.superseded_by.is_empty() {
        issues.push(ValidationIssue::warning(
            "superseded_by",
            "proposed_not_superseded",
            "proposed decisions typically should not have 'superseded_by'",
        ));
    }

    issues
}

/// True when no issue is an error.
pub fn is_valid(issues: &[ValidationIssue]) -> bool {
    issues.iter().all(|i| i.level != IssueLevel::Error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::FrontMatter;
    use chrono::NaiveDate;

    fn decision(id: &str, status: DecisionStatus) -> Decision {
        let mut fm = FrontMatter::new(id, "Title", NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        fm.status = status;
        Decision::new(fm, "")
    }

    fn rules(issues: &[ValidationIssue]) -> Vec<&str> {
        issues.iter().map(|i| i.rule.as_str()).collect()
    }

    #[test]
    fn clean_decision_has_no_issues() {
        let issues = validate_decision(&decision("ADR-0001", DecisionStatus::Accepted));
        assert!(issues.is_empty());
        assert!(is_valid(&issues));
    }

    #[test]
    fn custom_kind_prefix_is_accepted() {
        assert!(validate_decision(&decision("SEC-0042", DecisionStatus::Proposed)).is_empty());
    }

    #[test]
    fn bad_id_is_an_error() {
        let issues = validate_decision(&decision("adr-1", DecisionStatus::Proposed));
        assert_eq!(rules(&issues), vec!["id_format"]);
        assert!(!is_valid(&issues));
    }

    #[test]
    fn superseded_without_successor_is_an_error() {
        let issues = validate_decision(&decision("ADR-0002", DecisionStatus::Superseded));
        assert_eq!(rules(&issues), vec!["superseded_requires_superseded_by"]);
    }

    #[test]
    fn self_references_are_errors() {
        let mut d = decision("ADR-0002", DecisionStatus::Accepted);
        d.front_matter.supersedes = vec!["ADR-0002".to_string()];
        d.front_matter.superseded_by = vec!["ADR-0002".to_string()];
        let issues = validate_decision(&d);
        assert_eq!(rules(&issues), vec!["no_self_reference", "no_self_reference"]);
    }

    #[test]
    fn proposed_with_successor_is_only_a_warning() {
        let mut d = decision("ADR-0002", DecisionStatus::Proposed);
        d.front_matter.superseded_by = vec!["ADR-0003".to_string()];
        let issues = validate_decision(&d);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].level, IssueLevel::Warning);
        assert!(is_valid(&issues));
    }
}
