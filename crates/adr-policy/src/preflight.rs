// preflight.rs — Check a technical choice against accepted decisions before
// writing any code.
//
// Verdicts:
// - Blocked:     an accepted decision disallows the choice.
// - Allowed:     an accepted decision prefers the choice.
// - RequiresAdr: no accepted decision speaks to it; document it first.
//
// Blocked wins over Allowed when decisions disagree.

use adr_core::Decision;
use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::extractor::PolicyExtractor;
use crate::patterns::normalize_symbol;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PreflightVerdict {
    Allowed,
    RequiresAdr,
    Blocked,
}

impl std::fmt::Display for PreflightVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreflightVerdict::Allowed => write!(f, "ALLOWED"),
            PreflightVerdict::RequiresAdr => write!(f, "REQUIRES_ADR"),
            PreflightVerdict::Blocked => write!(f, "BLOCKED"),
        }
    }
}

/// A decision cited by a preflight outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DecisionRef {
    pub id: String,
    pub title: String,
}

impl From<&Decision> for DecisionRef {
    fn from(d: &Decision) -> Self {
        Self {
            id: d.id().to_string(),
            title: d.title().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreflightOutcome {
    pub choice: String,
    pub verdict: PreflightVerdict,
    /// Accepted decisions that disallow the choice.
    pub conflicting: Vec<DecisionRef>,
    /// Accepted decisions that prefer the choice.
    pub supporting: Vec<DecisionRef>,
    /// Decisions of any status that mention the choice in their text.
    pub related: Vec<DecisionRef>,
    /// Preferred alternatives named by conflicting decisions.
    pub alternatives: Vec<String>,
    pub reasoning: String,
}

/// Evaluate `choice` (a package or technology name) against `decisions`.
pub fn preflight(
    choice: &str,
    decisions: &[Decision],
    extractor: &PolicyExtractor,
) -> Result<PreflightOutcome, PolicyError> {
    let symbol = normalize_symbol(choice).ok_or_else(|| PolicyError::InvalidChoice {
        choice: choice.to_string(),
        reason: "expected a package or technology name".to_string(),
    })?;
    let needle = choice.trim().to_ascii_lowercase();

    let mut conflicting = Vec::new();
    let mut supporting = Vec::new();
    let mut related = Vec::new();
    let mut alternatives: Vec<String> = Vec::new();

    for decision in decisions {
        let haystack = format!("{}\n{}", decision.title(), decision.body).to_ascii_lowercase();
        if haystack.contains(&needle) || haystack.contains(&symbol) {
            related.push(DecisionRef::from(decision));
        }
        if !decision.is_accepted() {
            continue;
        }

        let model = extractor.extract(decision);
        if contains_ignore_case(model.all_disallowed().iter(), &symbol) {
            conflicting.push(DecisionRef::from(decision));
            for preferred in &model.imports.prefer {
                if !alternatives.contains(preferred) {
                    alternatives.push(preferred.clone());
                }
            }
        } else if contains_ignore_case(model.imports.prefer.iter(), &symbol) {
            supporting.push(DecisionRef::from(decision));
        }
    }

    let (verdict, reasoning) = if !conflicting.is_empty() {
        let ids = join_ids(&conflicting);
        let reasoning = if alternatives.is_empty() {
            format!("'{}' is disallowed by {}", choice, ids)
        } else {
            format!(
                "'{}' is disallowed by {}; use {} instead",
                choice,
                ids,
                alternatives.join(" or ")
            )
        };
        (PreflightVerdict::Blocked, reasoning)
    } else if !supporting.is_empty() {
        (
            PreflightVerdict::Allowed,
            format!("'{}' is the preferred choice in {}", choice, join_ids(&supporting)),
        )
    } else {
        (
            PreflightVerdict::RequiresAdr,
            format!(
                "no accepted decision covers '{}'; record a decision before adopting it",
                choice
            ),
        )
    };

    tracing::debug!(choice = %choice, verdict = %verdict, "preflight evaluated");

    Ok(PreflightOutcome {
        choice: choice.to_string(),
        verdict,
        conflicting,
        supporting,
        related,
        alternatives,
        reasoning,
    })
}

fn contains_ignore_case<'a>(mut set: impl Iterator<Item = &'a String>, symbol: &str) -> bool {
    set.any(|s| s.eq_ignore_ascii_case(symbol))
}

fn join_ids(refs: &[DecisionRef]) -> String {
    refs.iter()
        .map(|r| r.id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
