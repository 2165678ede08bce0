// extractor.rs — PolicyExtractor: structured block + prose directives → PolicyModel.
//
// Extraction runs in two independent passes that are merged afterwards:
//
// 1. Structured: the decision's `policy` front-matter block, including the
//    legacy per-language shape `python: { disallow_imports: [...] }`.
// 2. Pattern: directive phrases in the title and body (see patterns.rs).
//
// Merge order for `imports`:
// - A symbol named by the structured block keeps its structured disposition;
//   a conflicting prose directive is dropped.
// - Within one provenance, disallow wins over prefer for the same symbol.
//
// Extraction never fails. Anything doubtful is surfaced by
// `validate_completeness` as an advisory warning.

use std::collections::{BTreeMap, BTreeSet};

use adr_core::{Decision, DecisionStatus, PolicyModel, SectionKind};
use serde::{Deserialize, Serialize};

use crate::patterns::{self, Disposition, PatternHit};
use crate::suggest::suggest_policy;

/// Legacy per-language key holding a denylist.
const LEGACY_DISALLOW_KEY: &str = "disallow_imports";

/// Where an extracted rule came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Structured,
    Pattern,
}

/// One import rule that survived the merge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractedRule {
    pub symbol: String,
    pub disposition: Disposition,
    pub provenance: Provenance,
    /// Set when the rule only applies to one language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Full extraction result: the merged model plus how it was derived.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyExtraction {
    pub model: PolicyModel,
    pub rules: Vec<ExtractedRule>,
    pub pattern_hits: Vec<PatternHit>,
}

impl PolicyExtraction {
    /// Directive matches where every token was rejected.
    pub fn unusable_hits(&self) -> impl Iterator<Item = &PatternHit> {
        self.pattern_hits.iter().filter(|h| h.is_unusable())
    }

    /// True when the model has something enforceable or some directive
    /// matched at all.
    pub fn is_extractable(&self) -> bool {
        self.model.is_enforceable() || self.unusable_hits().next().is_some()
    }
}

/// The kind of advisory finding raised about a decision's policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// An accepted decision yields an empty policy.
    MissingPolicy,
    /// A heuristic suggestion for the missing policy.
    SuggestedPolicy,
    /// A directive matched but produced no usable symbol.
    UnusablePattern,
    /// A boundary rule cannot be enforced as written.
    InvalidBoundary,
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WarningKind::MissingPolicy => write!(f, "missing_policy"),
            WarningKind::SuggestedPolicy => write!(f, "suggested_policy"),
            WarningKind::UnusablePattern => write!(f, "unusable_pattern"),
            WarningKind::InvalidBoundary => write!(f, "invalid_boundary"),
        }
    }
}

/// An advisory finding. Never blocks anything.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicyWarning {
    pub decision_id: String,
    pub kind: WarningKind,
    pub message: String,
}

/// Stateless policy extractor.
#[derive(Debug, Clone, Default)]
pub struct PolicyExtractor;

impl PolicyExtractor {
    pub fn new() -> Self {
        Self
    }

    /// The merged policy model for a decision.
    pub fn extract(&self, decision: &Decision) -> PolicyModel {
        self.extract_detailed(decision).model
    }

    /// Extraction with provenance and raw pattern matches.
    pub fn extract_detailed(&self, decision: &Decision) -> PolicyExtraction {
        let structured = structured_model(decision);

        // symbol → (disposition, provenance) for `imports`.
        let mut dispositions: BTreeMap<String, (Disposition, Provenance)> = BTreeMap::new();
        for symbol in &structured.imports.prefer {
            dispositions.insert(symbol.clone(), (Disposition::Prefer, Provenance::Structured));
        }
        for symbol in &structured.imports.disallow {
            dispositions.insert(symbol.clone(), (Disposition::Disallow, Provenance::Structured));
        }

        // Structured per-language denylists also count as structured disallows
        // when deciding whether a prose directive conflicts.
        let structured_lang: BTreeSet<String> = structured
            .language_rules
            .values()
            .flatten()
            .map(|s| s.to_ascii_lowercase())
            .collect();

        let text = format!("{}\n{}", decision.title(), decision.body);
        let pattern_hits = patterns::scan(&text);

        for hit in &pattern_hits {
            for (symbol, disposition) in &hit.accepted {
                if structured_lang.contains(symbol) {
                    continue;
                }
                match dispositions.get(symbol) {
                    Some((_, Provenance::Structured)) => {}
                    Some((Disposition::Disallow, Provenance::Pattern)) => {}
                    _ => {
                        dispositions.insert(symbol.clone(), (*disposition, Provenance::Pattern));
                    }
                }
            }
        }

        let mut model = structured.clone();
        model.imports.disallow.clear();
        model.imports.prefer.clear();
        let mut rules = Vec::new();

        for (symbol, (disposition, provenance)) in &dispositions {
            match disposition {
                Disposition::Disallow => model.imports.disallow.insert(symbol.clone()),
                Disposition::Prefer => model.imports.prefer.insert(symbol.clone()),
            };
            rules.push(ExtractedRule {
                symbol: symbol.clone(),
                disposition: *disposition,
                provenance: *provenance,
                language: None,
            });
        }
        for (language, symbols) in &structured.language_rules {
            for symbol in symbols {
                rules.push(ExtractedRule {
                    symbol: symbol.clone(),
                    disposition: Disposition::Disallow,
                    provenance: Provenance::Structured,
                    language: Some(language.clone()),
                });
            }
        }

        for rationale in &decision.front_matter.rationales {
            if !model.rationales.contains(rationale) {
                model.rationales.push(rationale.clone());
            }
        }

        tracing::debug!(
            id = %decision.id(),
            rules = rules.len(),
            pattern_hits = pattern_hits.len(),
            "extracted policy"
        );

        PolicyExtraction {
            model,
            rules,
            pattern_hits,
        }
    }

    /// True when the merged model has something enforceable, or a directive matched even
    /// though none of its tokens could be used.
    pub fn has_extractable_policy(&self, decision: &Decision) -> bool {
        self.extract_detailed(decision).is_extractable()
    }

    /// Advisory warnings about a decision's enforceability.
    pub fn validate_completeness(&self, decision: &Decision) -> Vec<PolicyWarning> {
        let extraction = self.extract_detailed(decision);
        let id = decision.id().to_string();
        let mut warnings = Vec::new();

        if decision.status() == DecisionStatus::Accepted && !extraction.model.is_enforceable() {
            warnings.push(PolicyWarning {
                decision_id: id.clone(),
                kind: WarningKind::MissingPolicy,
                message: format!(
                    "{} ({}) is accepted but has no enforceable policy. Add a structured \
                     `policy` block to the front matter, or state the decision with directive \
                     language such as \"Don't use X\" or \"Prefer X over Y\".",
                    id,
                    decision.title()
                ),
            });

            let decision_text = decision
                .section_text(SectionKind::Decision)
                .unwrap_or_default();
            let alternatives_text = decision
                .section_text(SectionKind::Alternatives)
                .unwrap_or_default();
            if let Some(suggested) = suggest_policy(&decision_text, &alternatives_text) {
                warnings.push(PolicyWarning {
                    decision_id: id.clone(),
                    kind: WarningKind::SuggestedPolicy,
                    message: format!("Suggested policy: {}", describe_imports(&suggested)),
                });
            }
        }

        for hit in extraction.unusable_hits() {
            warnings.push(PolicyWarning {
                decision_id: id.clone(),
                kind: WarningKind::UnusablePattern,
                message: format!(
                    "policy detected but unusable: \"{}\" ({}) matched but {} is not a package name",
                    hit.matched,
                    hit.directive,
                    hit.rejected
                        .iter()
                        .map(|t| format!("'{}'", t))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            });
        }

        let boundaries = &extraction.model.boundaries;
        for rule in &boundaries.rules {
            let message = match rule.direction() {
                None => Some(format!(
                    "boundary rule \"{}\" has no direction; write it as \"A -> B\"",
                    rule.forbid
                )),
                Some((from, to)) => {
                    let missing: Vec<&str> = [from.as_str(), to.as_str()]
                        .into_iter()
                        .filter(|name| boundaries.layer(name).is_none())
                        .collect();
                    if missing.is_empty() {
                        None
                    } else {
                        Some(format!(
                            "boundary rule \"{}\" names undefined layer(s): {}",
                            rule.forbid,
                            missing.join(", ")
                        ))
                    }
                }
            };
            if let Some(message) = message {
                warnings.push(PolicyWarning {
                    decision_id: id.clone(),
                    kind: WarningKind::InvalidBoundary,
                    message,
                });
            }
        }

        warnings
    }
}

/// The structured policy block with legacy language keys lifted into
/// `language_rules`.
fn structured_model(decision: &Decision) -> PolicyModel {
    let Some(policy) = decision.front_matter.policy.clone() else {
        return PolicyModel::default();
    };
    let mut model = policy;

    let mut lifted = Vec::new();
    for (key, value) in &model.extensions {
        let Some(list) = value
            .as_mapping()
            .and_then(|m| m.get(LEGACY_DISALLOW_KEY))
            .and_then(|v| v.as_sequence())
        else {
            continue;
        };
        let symbols: BTreeSet<String> = list
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .collect();
        if !symbols.is_empty() {
            lifted.push((key.clone(), symbols));
        }
    }
    for (language, symbols) in lifted {
        model.extensions.remove(&language);
        model
            .language_rules
            .entry(language.to_ascii_lowercase())
            .or_default()
            .extend(symbols);
    }
    model
}

/// One-line rendering of a model's import sets.
pub fn describe_imports(model: &PolicyModel) -> String {
    let mut parts = Vec::new();
    if !model.imports.disallow.is_empty() {
        parts.push(format!(
            "disallow [{}]",
            model.imports.disallow.iter().cloned().collect::<Vec<_>>().join(", ")
        ));
    }
    if !model.imports.prefer.is_empty() {
        parts.push(format!(
            "prefer [{}]",
            model.imports.prefer.iter().cloned().collect::<Vec<_>>().join(", ")
        ));
    }
    if parts.is_empty() {
        "(empty)".to_string()
    } else {
        parts.join("; ")
    }
}
