// report.rs — Guard findings and the report returned by analysis.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    DisallowedImport,
    MissingPreferredImport,
    BoundaryViolation,
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViolationKind::DisallowedImport => write!(f, "disallowed_import"),
            ViolationKind::MissingPreferredImport => write!(f, "missing_preferred_import"),
            ViolationKind::BoundaryViolation => write!(f, "boundary_violation"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A change that conflicts with an accepted decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    pub severity: Severity,
    pub message: String,
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub decision_id: String,
    pub decision_title: String,
    pub suggested_fix: String,
    /// The offending source line, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Where a non-violation notice came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoticeSource {
    /// A hunk of the input diff was dropped.
    Diff,
    /// A decision file could not be loaded.
    Decision,
    /// Index build or search trouble.
    Index,
}

/// A warning about the analysis itself rather than about the change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuardNotice {
    pub source: NoticeSource,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// How a decision came to be checked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Relevance {
    /// Retrieved by semantic search.
    Retrieved,
    /// Its policy names an import in the change or a layer covering a changed file.
    DirectPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelevantDecision {
    pub decision_id: String,
    pub title: String,
    /// Best retrieval score; 0 for decisions found only through their policy.
    pub score: f32,
    pub relevance: Relevance,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GuardReport {
    pub violations: Vec<Violation>,
    pub analyzed_files: Vec<String>,
    pub relevant_decisions: Vec<RelevantDecision>,
    pub summary: String,
    pub has_errors: bool,
    pub has_warnings: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<GuardNotice>,
}

impl GuardReport {
    /// Assemble a report, ordering violations by file, line, and decision.
    pub fn new(
        mut violations: Vec<Violation>,
        analyzed_files: Vec<String>,
        relevant_decisions: Vec<RelevantDecision>,
        notices: Vec<GuardNotice>,
    ) -> Self {
        violations.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then(a.line.unwrap_or(usize::MAX).cmp(&b.line.unwrap_or(usize::MAX)))
                .then(a.decision_id.cmp(&b.decision_id))
                .then(a.kind.cmp(&b.kind))
        });
        let mut report = Self {
            violations,
            analyzed_files,
            relevant_decisions,
            notices,
            ..Default::default()
        };
        report.refresh();
        report
    }

    pub fn errors(&self) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Warning)
    }

    /// Add notices gathered outside the diff analysis.
    pub fn add_notices(&mut self, notices: impl IntoIterator<Item = GuardNotice>) {
        self.notices.extend(notices);
        self.refresh();
    }

    fn refresh(&mut self) {
        let errors = self.errors().count();
        let warnings = self.warnings().count();
        self.has_errors = errors > 0;
        self.has_warnings = warnings > 0 || !self.notices.is_empty();

        let files = self.analyzed_files.len();
        let decisions = self.relevant_decisions.len();
        let mut summary = if errors == 0 && warnings == 0 {
            format!(
                "no violations in {} file{} ({} decision{} checked)",
                files,
                plural(files),
                decisions,
                plural(decisions)
            )
        } else {
            format!(
                "{} error{}, {} warning{} in {} file{} ({} decision{} checked)",
                errors,
                plural(errors),
                warnings,
                plural(warnings),
                files,
                plural(files),
                decisions,
                plural(decisions)
            )
        };
        if !self.notices.is_empty() {
            summary.push_str(&format!(
                "; {} notice{}",
                self.notices.len(),
                plural(self.notices.len())
            ));
        }
        self.summary = summary;
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(file: &str, line: Option<usize>, severity: Severity) -> Violation {
        Violation {
            kind: ViolationKind::DisallowedImport,
            severity,
            message: "m".to_string(),
            file: file.to_string(),
            line,
            decision_id: "ADR-0001".to_string(),
            decision_title: "t".to_string(),
            suggested_fix: "f".to_string(),
            context: None,
        }
    }

    #[test]
    fn summary_and_flags() {
        let report = GuardReport::new(
            vec![
                violation("b.py", Some(2), Severity::Error),
                violation("a.py", None, Severity::Warning),
                violation("a.py", Some(9), Severity::Error),
            ],
            vec!["a.py".to_string(), "b.py".to_string()],
            Vec::new(),
            Vec::new(),
        );
        assert!(report.has_errors);
        assert!(report.has_warnings);
        assert_eq!(report.summary, "2 errors, 1 warning in 2 files (0 decisions checked)");
        let order: Vec<(&str, Option<usize>)> = report
            .violations
            .iter()
            .map(|v| (v.file.as_str(), v.line))
            .collect();
        assert_eq!(order, vec![("a.py", Some(9)), ("a.py", None), ("b.py", Some(2))]);
    }

    #[test]
    fn clean_report_with_notice_has_warnings() {
        let mut report = GuardReport::new(Vec::new(), vec!["a.py".to_string()], Vec::new(), Vec::new());
        assert!(!report.has_errors);
        assert!(!report.has_warnings);
        assert_eq!(report.summary, "no violations in 1 file (0 decisions checked)");

        report.add_notices([GuardNotice {
            source: NoticeSource::Diff,
            message: "skipped".to_string(),
            file: None,
        }]);
        assert!(report.has_warnings);
        assert!(report.summary.ends_with("; 1 notice"));
    }

    #[test]
    fn kinds_serialize_snake_case() {
        let json = serde_json::to_string(&ViolationKind::MissingPreferredImport).unwrap();
        assert_eq!(json, "\"missing_preferred_import\"");
    }
}
