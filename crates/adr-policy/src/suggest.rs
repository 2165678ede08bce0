// suggest.rs — Heuristic policy suggestion for authoring.
//
// Reads two places where authors commonly state policy without meaning to:
//
//   Alternatives:   "Rejected: Flask"            → disallow flask
//                   "Rejected Flask and Django"  → disallow flask, django
//                   "### Rejected" + bullet list → disallow each item
//   Decision:       "Use FastAPI as our ..."     → prefer FastAPI
//
// Only the opening clause of the decision text is considered. When nothing
// matches the result is `None`; ambiguous prose never produces a policy.

use std::sync::LazyLock;

use adr_core::PolicyModel;
use regex::Regex;

use crate::patterns::{normalize_symbol, split_list};

static OPENING_USE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:we\s+(?:will|shall)\s+)?use\s+([A-Za-z0-9_@/-]+)").expect("static regex")
});

static LEADING_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_@/-]+").expect("static regex"));

/// Where a rejected-item list stops being a list of names.
const CLAUSE_ENDS: &[&str] = &[".", ";", ":", "(", " - ", " because", " due ", " since "];

/// Headings that introduce a bullet list of rejected options.
const REJECTED_HEADINGS: &[&str] = &[
    "rejected",
    "rejected alternatives",
    "rejected options",
];

/// Suggest a policy from a decision's Decision and Alternatives sections.
pub fn suggest_policy(decision_text: &str, alternatives_text: &str) -> Option<PolicyModel> {
    let mut model = PolicyModel::default();

    for symbol in rejected_symbols(alternatives_text) {
        model.imports.disallow.insert(symbol);
    }

    if let Some(preferred) = opening_use(decision_text) {
        if !model.imports.disallow.contains(&preferred.to_ascii_lowercase()) {
            model.imports.prefer.insert(preferred);
        }
    }

    if model.imports.is_empty() {
        None
    } else {
        Some(model)
    }
}

fn rejected_symbols(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut in_block = false;

    for line in text.lines() {
        let cleaned = line.replace("**", "").replace('`', "");
        let trimmed = cleaned.trim();
        let item = strip_bullet(trimmed);
        let heading = trimmed.trim_start_matches('#').trim().trim_end_matches(':');

        if REJECTED_HEADINGS.contains(&heading.to_ascii_lowercase().as_str()) {
            in_block = true;
            continue;
        }

        if let Some(rest) = strip_prefix_ignore_case(item, "rejected") {
            in_block = false;
            let rest = rest.trim_start().trim_start_matches(':').trim();
            for part in split_list(cut_clause(rest)) {
                if let Some(symbol) = leading_symbol(part) {
                    out.push(symbol);
                }
            }
            continue;
        }

        if in_block {
            if trimmed.is_empty() {
                continue;
            }
            if item.len() == trimmed.len() {
                // Not a bullet: the list is over.
                in_block = false;
                continue;
            }
            if let Some(symbol) = leading_symbol(item) {
                out.push(symbol);
            }
        }
    }

    out.dedup();
    out
}

/// The `X` of a "Use X ..." opening clause, in its original spelling.
fn opening_use(text: &str) -> Option<String> {
    let first = text
        .lines()
        .map(|l| l.replace("**", "").replace('`', ""))
        .find(|l| !l.trim().is_empty())?;
    let caps = OPENING_USE_RE.captures(first.trim())?;
    let raw = caps.get(1)?.as_str();
    let normalized = normalize_symbol(raw)?;
    if normalized == raw.to_ascii_lowercase() {
        Some(raw.to_string())
    } else {
        Some(normalized)
    }
}

fn leading_symbol(text: &str) -> Option<String> {
    let token = LEADING_TOKEN_RE.find(text.trim())?;
    normalize_symbol(token.as_str())
}

fn strip_bullet(line: &str) -> &str {
    for bullet in ["- ", "* ", "+ "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return rest.trim_start();
        }
    }
    line
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        let rest = &text[prefix.len()..];
        // "Rejected" must be a whole word.
        if rest.is_empty() || rest.starts_with([' ', ':', '\t']) {
            return Some(rest);
        }
    }
    None
}

fn cut_clause(text: &str) -> &str {
    let lower = format!(" {}", text.to_ascii_lowercase());
    let end = CLAUSE_ENDS
        .iter()
        .filter_map(|marker| lower.find(marker))
        .min()
        .map(|i| i.saturating_sub(1))
        .unwrap_or(text.len());
    text.get(..end).unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_lines_become_disallow() {
        let model = suggest_policy("", "Rejected: Flask\nRejected: Django").unwrap();
        assert!(model.imports.disallow.contains("flask"));
        assert!(model.imports.disallow.contains("django"));
        assert!(model.imports.prefer.is_empty());
    }

    #[test]
    fn rejected_list_with_reason() {
        let model = suggest_policy("", "- Rejected Flask and Bottle because they are sync.").unwrap();
        assert_eq!(model.imports.disallow.len(), 2);
        assert!(model.imports.disallow.contains("bottle"));
    }

    #[test]
    fn rejected_heading_with_bullets() {
        let text = "### Rejected\n\n- Django: too heavy\n- Tornado (older)\n\nOther notes.\n- not-this";
        let model = suggest_policy("", text).unwrap();
        let disallow: Vec<&str> = model.imports.disallow.iter().map(String::as_str).collect();
        assert_eq!(disallow, vec!["django", "tornado"]);
    }

    #[test]
    fn opening_use_keeps_spelling() {
        let model = suggest_policy("Use FastAPI as our framework", "").unwrap();
        assert!(model.imports.prefer.contains("FastAPI"));
    }

    #[test]
    fn only_the_opening_clause_counts() {
        assert!(suggest_policy("We looked around.\nUse FastAPI later.", "").is_none());
    }

    #[test]
    fn ambiguous_prose_suggests_nothing() {
        assert!(suggest_policy("We decided this approach is better", "").is_none());
        assert!(suggest_policy("", "Several options were weighed.").is_none());
    }

    #[test]
    fn rejected_because_is_not_a_symbol() {
        assert!(suggest_policy("", "Rejected because of cost.").is_none());
    }
}
