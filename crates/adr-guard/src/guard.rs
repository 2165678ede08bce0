// guard.rs — GuardSystem: check a diff against accepted decisions.
//
// Analysis runs in three steps:
//
//   1. Parse the diff and extract imports from added and pre-existing lines.
//   2. Find relevant decisions. Each changed file is turned into a query
//      for the semantic index (accepted decisions only). Accepted decisions
//      whose policy directly names an import in the change, or whose
//      boundary layers cover a changed file, are added regardless of rank.
//   3. Evaluate every relevant decision's policy against every file.
//
// Rules:
//   disallowed_import         (error)   an added import matches a disallowed symbol
//   missing_preferred_import  (warning) the file already imports a disallowed
//                                       symbol and the change adds none of the
//                                       preferred ones
//   boundary_violation        (error)   an added import crosses a forbidden
//                                       layer direction

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use adr_core::{AdrConfig, Decision, DecisionStatus, DecisionStore, PolicyModel};
use adr_index::{Embedder, HashingEmbedder, SemanticIndex};
use adr_policy::PolicyExtractor;

use crate::boundary::{check_import, layer_contains};
use crate::diff::{parse_unified_diff, FileDiff};
use crate::error::GuardError;
use crate::imports::{extract_imports, ImportRef, Language};
use crate::report::{
    GuardNotice, GuardReport, NoticeSource, Relevance, RelevantDecision, Severity, Violation,
    ViolationKind,
};

/// Added lines beyond this many are left out of a file's retrieval query.
const QUERY_LINES: usize = 20;

/// A changed file with its imports extracted.
struct FileChanges<'a> {
    diff: &'a FileDiff,
    language: Option<Language>,
    /// Imports on added lines, with the line text.
    added: Vec<(ImportRef, &'a str)>,
    /// Imports on context and removed lines.
    preexisting: Vec<(ImportRef, &'a str)>,
}

impl<'a> FileChanges<'a> {
    fn new(diff: &'a FileDiff) -> Self {
        let language = Language::from_path(&diff.path);
        let mut added = Vec::new();
        let mut preexisting = Vec::new();
        if let Some(lang) = language {
            for l in &diff.added {
                for i in extract_imports(lang, &l.text, l.line) {
                    added.push((i, l.text.as_str()));
                }
            }
            for l in diff.preexisting() {
                for i in extract_imports(lang, &l.text, l.line) {
                    preexisting.push((i, l.text.as_str()));
                }
            }
        }
        Self {
            diff,
            language,
            added,
            preexisting,
        }
    }

    fn path(&self) -> &str {
        &self.diff.path
    }

    fn query(&self) -> String {
        let mut parts: Vec<&str> = vec![self.path()];
        parts.extend(self.added.iter().map(|(i, _)| i.module.as_str()));
        parts.extend(
            self.diff
                .added
                .iter()
                .take(QUERY_LINES)
                .map(|l| l.text.trim())
                .filter(|t| !t.is_empty()),
        );
        parts.join("\n")
    }
}

/// Symbols a policy disallows in a file of the given language.
fn disallowed_for(model: &PolicyModel, language: Option<Language>) -> BTreeSet<String> {
    let mut out = model.imports.disallow.clone();
    if let Some(lang) = language {
        for key in lang.rule_keys() {
            for (rule_lang, symbols) in &model.language_rules {
                if rule_lang.eq_ignore_ascii_case(key) {
                    out.extend(symbols.iter().cloned());
                }
            }
        }
    }
    out
}

/// Retrieval only considers decisions that are in force.
const ACCEPTED: &[DecisionStatus] = &[DecisionStatus::Accepted];

pub struct GuardSystem {
    config: AdrConfig,
    embedder: Arc<dyn Embedder>,
    extractor: PolicyExtractor,
}

impl GuardSystem {
    /// Guard with the built-in hashing embedder.
    pub fn new(config: AdrConfig) -> Self {
        let embedder = Arc::new(HashingEmbedder::new(config.index.dimensions));
        Self::with_embedder(config, embedder)
    }

    pub fn with_embedder(config: AdrConfig, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            config,
            embedder,
            extractor: PolicyExtractor::new(),
        }
    }

    pub fn config(&self) -> &AdrConfig {
        &self.config
    }

    /// Analyze a diff against the project's decisions.
    ///
    /// Loads the decision directory, opens the index under the state
    /// directory and, when `rebuild_index` is set, brings it up to date
    /// first. Unreadable decision files, per-decision index failures, and
    /// index write failures become notices on the report.
    pub fn analyze(&self, diff: &str, rebuild_index: bool) -> Result<GuardReport, GuardError> {
        self.check_size(diff)?;

        let store = DecisionStore::new(&self.config.adr_dir);
        let snapshot = store.load_all()?;
        let mut notices: Vec<GuardNotice> = snapshot
            .failures
            .iter()
            .map(|f| GuardNotice {
                source: NoticeSource::Decision,
                message: format!("decision not loaded: {}", f.reason),
                file: Some(f.path.display().to_string()),
            })
            .collect();

        let mut index = SemanticIndex::open(
            &self.config.index_dir,
            self.embedder.clone(),
            self.config.index.chunk_threshold,
        );
        if rebuild_index {
            match index.build(&snapshot.decisions, false) {
                Ok(stats) => notices.extend(stats.failures.into_iter().map(|f| GuardNotice {
                    source: NoticeSource::Index,
                    message: format!("{} not indexed: {}", f.decision_id, f.reason),
                    file: None,
                })),
                Err(e) => {
                    tracing::warn!("index not saved: {}", e);
                    notices.push(GuardNotice {
                        source: NoticeSource::Index,
                        message: format!("index not saved: {}", e),
                        file: None,
                    });
                }
            }
        }

        let mut report = self.analyze_with(diff, &index, &snapshot.decisions)?;
        report.add_notices(notices);
        Ok(report)
    }

    /// Analyze a diff against an already opened index and loaded decisions.
    pub fn analyze_with(
        &self,
        diff: &str,
        index: &SemanticIndex,
        decisions: &[Decision],
    ) -> Result<GuardReport, GuardError> {
        self.check_size(diff)?;

        let parsed = parse_unified_diff(diff);
        let mut notices: Vec<GuardNotice> = parsed
            .skipped
            .iter()
            .map(|s| GuardNotice {
                source: NoticeSource::Diff,
                message: format!("skipped hunk {:?}: {}", s.header, s.reason),
                file: s.file.clone(),
            })
            .collect();

        let files: Vec<FileChanges> = parsed.files.iter().map(FileChanges::new).collect();

        let accepted: BTreeMap<&str, (&Decision, PolicyModel)> = decisions
            .iter()
            .filter(|d| d.is_accepted())
            .map(|d| (d.id(), (d, self.extractor.extract(d))))
            .collect();

        let mut relevant: BTreeMap<String, RelevantDecision> = BTreeMap::new();

        for file in &files {
            let matches =
                match index.search(&file.query(), self.config.index.search_k, Some(ACCEPTED)) {
                    Ok(m) => m,
                    Err(e) => {
                        notices.push(GuardNotice {
                            source: NoticeSource::Index,
                            message: format!("search failed: {}", e),
                            file: Some(file.path().to_string()),
                        });
                        continue;
                    }
                };
            for m in matches {
                // The index may be older than the decision directory.
                if !accepted.contains_key(m.decision_id.as_str()) {
                    continue;
                }
                let entry = relevant
                    .entry(m.decision_id.clone())
                    .or_insert_with(|| RelevantDecision {
                        decision_id: m.decision_id.clone(),
                        title: m.title.clone(),
                        score: m.score,
                        relevance: Relevance::Retrieved,
                    });
                if m.score > entry.score {
                    entry.score = m.score;
                }
            }
        }

        for (id, (decision, model)) in &accepted {
            if relevant.contains_key(*id) {
                continue;
            }
            if files.iter().any(|f| applies_directly(model, f)) {
                relevant.insert(
                    id.to_string(),
                    RelevantDecision {
                        decision_id: id.to_string(),
                        title: decision.title().to_string(),
                        score: 0.0,
                        relevance: Relevance::DirectPolicy,
                    },
                );
            }
        }

        let mut relevant: Vec<RelevantDecision> = relevant.into_values().collect();
        relevant.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.decision_id.cmp(&b.decision_id))
        });
        tracing::debug!(
            files = files.len(),
            relevant = relevant.len(),
            "guard relevance resolved"
        );

        let mut violations = Vec::new();
        let mut seen: BTreeSet<(ViolationKind, String, Option<usize>, String, String)> =
            BTreeSet::new();
        for r in &relevant {
            let Some((decision, model)) = accepted.get(r.decision_id.as_str()) else {
                continue;
            };
            for file in &files {
                for (v, key) in check_file(decision, model, file) {
                    if seen.insert((v.kind, v.file.clone(), v.line, v.decision_id.clone(), key)) {
                        violations.push(v);
                    }
                }
            }
        }

        let analyzed_files = files.iter().map(|f| f.path().to_string()).collect();
        let report = GuardReport::new(violations, analyzed_files, relevant, notices);
        tracing::info!(
            errors = report.errors().count(),
            warnings = report.warnings().count(),
            "guard analysis complete: {}",
            report.summary
        );
        Ok(report)
    }

    fn check_size(&self, diff: &str) -> Result<(), GuardError> {
        let limit = self.config.guard.max_diff_bytes;
        if diff.len() > limit {
            return Err(GuardError::DiffTooLarge {
                size: diff.len(),
                limit,
            });
        }
        Ok(())
    }
}

/// Whether a policy can produce a finding for this file on its own terms.
fn applies_directly(model: &PolicyModel, file: &FileChanges) -> bool {
    let disallowed = disallowed_for(model, file.language);
    let names = |imports: &[(ImportRef, &str)]| {
        imports
            .iter()
            .any(|(i, _)| disallowed.iter().any(|s| i.matches(s)))
    };
    if names(&file.added) {
        return true;
    }
    if !model.imports.prefer.is_empty() && !file.diff.added.is_empty() && names(&file.preexisting)
    {
        return true;
    }
    !file.added.is_empty()
        && model.boundaries.rules.iter().any(|rule| {
            rule.direction()
                .and_then(|(from, _)| model.boundaries.layer(&from))
                .is_some_and(|layer| layer_contains(layer, file.path()))
        })
}

/// Findings for one decision and one file, each with a dedupe key.
fn check_file(
    decision: &Decision,
    model: &PolicyModel,
    file: &FileChanges,
) -> Vec<(Violation, String)> {
    let mut out = Vec::new();
    let disallowed = disallowed_for(model, file.language);
    let prefer = &model.imports.prefer;
    let violation = |kind, severity, message: String, line, suggested_fix: String, context: Option<&str>| Violation {
        kind,
        severity,
        message,
        file: file.path().to_string(),
        line,
        decision_id: decision.id().to_string(),
        decision_title: decision.title().to_string(),
        suggested_fix,
        context: context.map(|c| c.trim().to_string()),
    };

    for (import, text) in &file.added {
        if prefer.iter().any(|p| import.matches(p)) {
            continue;
        }
        let Some(symbol) = disallowed.iter().find(|s| import.matches(s)) else {
            continue;
        };
        let fix = if prefer.is_empty() {
            format!("Remove the '{}' import", symbol)
        } else {
            format!("Use {} instead of '{}'", join_quoted(prefer), symbol)
        };
        out.push((
            violation(
                ViolationKind::DisallowedImport,
                Severity::Error,
                format!(
                    "'{}' is disallowed by {} ({})",
                    import.module,
                    decision.id(),
                    decision.title()
                ),
                Some(import.line),
                fix,
                Some(text),
            ),
            import.module.to_ascii_lowercase(),
        ));
    }

    let adopts_preferred = file
        .added
        .iter()
        .any(|(i, _)| prefer.iter().any(|p| i.matches(p)));
    if !prefer.is_empty() && !file.diff.added.is_empty() && !adopts_preferred {
        let legacy = file
            .preexisting
            .iter()
            .find_map(|(i, text)| disallowed.iter().find(|s| i.matches(s)).map(|s| (s, *text)));
        if let Some((symbol, text)) = legacy {
            out.push((
                violation(
                    ViolationKind::MissingPreferredImport,
                    Severity::Warning,
                    format!(
                        "file still uses '{}' and the change does not adopt {} as {} prefers",
                        symbol,
                        join_quoted(prefer),
                        decision.id()
                    ),
                    None,
                    format!("Migrate from '{}' to {}", symbol, join_quoted(prefer)),
                    Some(text),
                ),
                symbol.clone(),
            ));
        }
    }

    for (import, text) in &file.added {
        for hit in check_import(&model.boundaries, file.path(), import) {
            out.push((
                violation(
                    ViolationKind::BoundaryViolation,
                    Severity::Error,
                    format!(
                        "{} layer imports '{}' from {} layer; {} forbids {}",
                        hit.from_layer,
                        import.module,
                        hit.to_layer,
                        decision.id(),
                        hit.rule
                    ),
                    Some(import.line),
                    format!(
                        "Move the shared code out of the {} layer or invert the dependency",
                        hit.to_layer
                    ),
                    Some(text),
                ),
                format!("{}|{}", hit.rule, import.module),
            ));
        }
    }

    out
}

fn join_quoted(symbols: &BTreeSet<String>) -> String {
    symbols
        .iter()
        .map(|s| format!("'{}'", s))
        .collect::<Vec<_>>()
        .join(" or ")
}
