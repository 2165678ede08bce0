// patterns.rs — Prose directive rules for policy extraction.
//
// Rules are evaluated in a fixed order over the whole text. A byte span
// matched by an earlier rule is consumed: later rules never re-match any part
// of it, so "Prefer FastAPI over Flask" is read once as a preference and not
// again as anything else.
//
//   1. PreferOver   "use/prefer A instead of/over/rather than B"  prefer A, disallow B
//   2. Replace      "replace A with B"                            disallow A, prefer B
//   3. Ban          "don't use / avoid / ban / ... A[, B or C]"   disallow each

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Characters a package-like token may contain.
const TOKEN: &str = r"[A-Za-z0-9_@/-]+";

/// Grammar filler that must never be harvested as a package name.
const STOP_WORDS: &[&str] = &[
    "a", "all", "an", "and", "any", "are", "as", "at", "be", "but", "by", "for", "from", "in",
    "is", "it", "its", "nor", "of", "on", "or", "our", "that", "the", "their", "them", "these",
    "this", "those", "to", "use", "using", "we", "with",
];

/// Common spellings mapped onto the name actually imported.
const ALIASES: &[(&str, &str)] = &[
    ("react-query", "@tanstack/react-query"),
    ("tanstack-query", "@tanstack/react-query"),
    ("vue-query", "@tanstack/vue-query"),
];

static PREFER_OVER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:use|prefer)\s+({TOKEN})\s+(?:instead\s+of|over|rather\s+than)\s+({TOKEN})"
    ))
    .expect("static regex")
});

static REPLACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\breplace\s+({TOKEN})\s+with\s+({TOKEN})")).expect("static regex")
});

static BAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    let list = format!(r"{TOKEN}(?:\s*,\s*(?:(?:or|and|nor)\s+)?{TOKEN}|\s+(?:or|and|nor)\s+{TOKEN})*");
    Regex::new(&format!(
        r"(?i)\b(?:don['’]?t\s+use|do\s+not\s+use|never\s+use|no\s+longer\s+use|(?:should|must)\s+not\s+use|(?:shouldn|mustn)['’]?t\s+use|avoid(?:\s+using)?|ban)\s+({list})"
    ))
    .expect("static regex")
});

static LIST_SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*,\s*(?:(?:or|and|nor)\s+)?|\s+(?:or|and|nor)\s+").expect("static regex")
});

static TOKEN_SHAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^{TOKEN}$")).expect("static regex"));

/// Whether a symbol should be denied or recommended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Disallow,
    Prefer,
}

/// Which directive rule produced a match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveKind {
    PreferOver,
    Replace,
    Ban,
}

impl std::fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DirectiveKind::PreferOver => write!(f, "prefer-over"),
            DirectiveKind::Replace => write!(f, "replace-with"),
            DirectiveKind::Ban => write!(f, "ban"),
        }
    }
}

/// One directive match in the prose, with its tokens after normalisation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatternHit {
    pub directive: DirectiveKind,
    /// The matched text (emphasis markers already stripped).
    pub matched: String,
    pub accepted: Vec<(String, Disposition)>,
    /// Raw tokens that failed normalisation.
    pub rejected: Vec<String>,
}

impl PatternHit {
    /// A match whose every token was rejected.
    pub fn is_unusable(&self) -> bool {
        self.accepted.is_empty()
    }
}

/// Run every directive rule over `text` in priority order.
pub fn scan(text: &str) -> Vec<PatternHit> {
    let text = strip_emphasis(text);
    let mut consumed: Vec<Range<usize>> = Vec::new();
    let mut hits = Vec::new();

    for caps in PREFER_OVER_RE.captures_iter(&text) {
        let Some(span) = caps.get(0) else { continue };
        if overlaps(&consumed, span.range()) {
            continue;
        }
        consumed.push(span.range());
        let mut hit = PatternHit::new(DirectiveKind::PreferOver, span.as_str());
        hit.push(&caps[1], Disposition::Prefer);
        hit.push(&caps[2], Disposition::Disallow);
        hits.push(hit);
    }

    for caps in REPLACE_RE.captures_iter(&text) {
        let Some(span) = caps.get(0) else { continue };
        if overlaps(&consumed, span.range()) {
            continue;
        }
        consumed.push(span.range());
        let mut hit = PatternHit::new(DirectiveKind::Replace, span.as_str());
        hit.push(&caps[1], Disposition::Disallow);
        hit.push(&caps[2], Disposition::Prefer);
        hits.push(hit);
    }

    for caps in BAN_RE.captures_iter(&text) {
        let Some(span) = caps.get(0) else { continue };
        if overlaps(&consumed, span.range()) {
            continue;
        }
        consumed.push(span.range());
        let mut hit = PatternHit::new(DirectiveKind::Ban, span.as_str());
        for item in split_list(&caps[1]) {
            hit.push(item, Disposition::Disallow);
        }
        hits.push(hit);
    }

    hits
}

impl PatternHit {
    fn new(directive: DirectiveKind, matched: &str) -> Self {
        Self {
            directive,
            matched: matched.to_string(),
            accepted: Vec::new(),
            rejected: Vec::new(),
        }
    }

    fn push(&mut self, raw: &str, disposition: Disposition) {
        match normalize_symbol(raw) {
            Some(symbol) => self.accepted.push((symbol, disposition)),
            None => self.rejected.push(raw.to_string()),
        }
    }
}

/// Split an enumerated list ("Flask, Django or Bottle") into its items.
pub fn split_list(list: &str) -> Vec<&str> {
    LIST_SEPARATOR_RE
        .split(list.trim())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Lower-case a raw token and map it through the alias table.
///
/// Returns `None` for tokens that are too short, are stop words, or do not
/// look like a package name.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_matches(|c| c == '_' || c == '-' || c == '/');
    let name = trimmed.to_ascii_lowercase();
    if let Some((_, target)) = ALIASES.iter().find(|(alias, _)| *alias == name) {
        return Some((*target).to_string());
    }
    if name.chars().count() < 2 || STOP_WORDS.contains(&name.as_str()) {
        return None;
    }
    if !TOKEN_SHAPE_RE.is_match(&name) {
        return None;
    }
    Some(name)
}

/// Remove Markdown emphasis and inline-code markers.
fn strip_emphasis(text: &str) -> String {
    text.chars().filter(|c| *c != '*' && *c != '`').collect()
}

fn overlaps(consumed: &[Range<usize>], span: Range<usize>) -> bool {
    consumed
        .iter()
        .any(|r| r.start < span.end && span.start < r.end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepted(hits: &[PatternHit]) -> Vec<(String, Disposition)> {
        hits.iter().flat_map(|h| h.accepted.clone()).collect()
    }

    #[test]
    fn ban_list_and_prefer_over() {
        let hits = scan("Don't use Flask or Django. Prefer FastAPI over Flask.");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].directive, DirectiveKind::PreferOver);
        assert_eq!(hits[1].directive, DirectiveKind::Ban);
        let all = accepted(&hits);
        assert!(all.contains(&("fastapi".to_string(), Disposition::Prefer)));
        assert!(all.contains(&("flask".to_string(), Disposition::Disallow)));
        assert!(all.contains(&("django".to_string(), Disposition::Disallow)));
    }

    #[test]
    fn replace_with() {
        let hits = scan("We will replace moment with dayjs across the app.");
        assert_eq!(
            accepted(&hits),
            vec![
                ("moment".to_string(), Disposition::Disallow),
                ("dayjs".to_string(), Disposition::Prefer),
            ]
        );
    }

    #[test]
    fn consumed_span_is_not_rematched() {
        // "use axios instead of fetch" must not also be read as a ban on "axios".
        let hits = scan("You should not use axios instead of fetch? No: use axios instead of fetch.");
        let bans: Vec<_> = hits
            .iter()
            .filter(|h| h.directive == DirectiveKind::Ban)
            .collect();
        assert!(bans.is_empty());
    }

    #[test]
    fn emphasis_markers_are_ignored() {
        let hits = scan("**Avoid** `lodash` in new code.");
        assert_eq!(
            accepted(&hits),
            vec![("lodash".to_string(), Disposition::Disallow)]
        );
    }

    #[test]
    fn aliases_apply() {
        let hits = scan("Use React-Query instead of axios");
        assert_eq!(hits[0].accepted[0].0, "@tanstack/react-query");
    }

    #[test]
    fn stop_words_are_rejected_but_recorded() {
        let hits = scan("Avoid the temptation.");
        assert_eq!(hits.len(), 1);
        assert!(hits[0].is_unusable());
        assert_eq!(hits[0].rejected, vec!["the"]);
    }

    #[test]
    fn no_directive_no_hits() {
        assert!(scan("We decided to go with a layered approach.").is_empty());
    }

    #[test]
    fn normalize_rules() {
        assert_eq!(normalize_symbol("Flask"), Some("flask".to_string()));
        assert_eq!(normalize_symbol("__requests__"), Some("requests".to_string()));
        assert_eq!(normalize_symbol("@scope/pkg"), Some("@scope/pkg".to_string()));
        assert_eq!(normalize_symbol("x"), None);
        assert_eq!(normalize_symbol("with"), None);
        assert_eq!(normalize_symbol("foo.bar"), None);
    }

    #[test]
    fn split_list_handles_commas_and_conjunctions() {
        assert_eq!(
            split_list("Flask, Django, or Bottle"),
            vec!["Flask", "Django", "Bottle"]
        );
        assert_eq!(split_list("jquery and underscore"), vec!["jquery", "underscore"]);
    }
}
