// policy.rs — The structured, enforceable policy attached to a decision.
//
// The same type serves two roles: it is the shape of the optional `policy`
// block in a decision's front matter, and it is the merged model the
// extractor produces from that block plus the decision's prose.
//
// Keys the model does not know are kept in `extensions` so that loading and
// saving a decision never drops author-supplied data.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// An enforceable ruleset derived from a decision.
///
/// ```yaml
/// policy:
///   imports:
///     disallow: [flask, django]
///     prefer: [fastapi]
///   language_rules:
///     python: [flask]
///   boundaries:
///     layers:
///       - name: utils
///         path: "src/utils/**"
///       - name: components
///         path: "src/components/**"
///     rules:
///       - forbid: "utils -> components"
///   rationales:
///     - "Native async support"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PolicyModel {
    #[serde(default, skip_serializing_if = "ImportPolicy::is_empty")]
    pub imports: ImportPolicy,

    /// Language tag (e.g. "python", "typescript") → disallowed imports.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub language_rules: BTreeMap<String, BTreeSet<String>>,

    #[serde(default, skip_serializing_if = "BoundaryPolicy::is_empty")]
    pub boundaries: BoundaryPolicy,

    /// Human-readable justifications. Used for explanations, never enforcement.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rationales: Vec<String>,

    /// Unknown keys, preserved verbatim.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, serde_yaml::Value>,
}

impl PolicyModel {
    /// True when no enforceable or explanatory collection has content.
    ///
    /// Extensions are deliberately not counted: nothing enforces them.
    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
            && self.language_rules.values().all(|v| v.is_empty())
            && self.boundaries.is_empty()
            && self.rationales.is_empty()
    }

    /// True when imports, language rules, or boundaries have content.
    /// Rationales explain a policy but never enforce one.
    pub fn is_enforceable(&self) -> bool {
        !self.imports.is_empty()
            || self.language_rules.values().any(|v| !v.is_empty())
            || !self.boundaries.is_empty()
    }

    /// Every disallowed symbol that applies to a file of the given language.
    pub fn disallowed_for(&self, language: Option<&str>) -> BTreeSet<String> {
        let mut out = self.imports.disallow.clone();
        if let Some(lang) = language {
            if let Some(extra) = self.language_rules.get(lang) {
                out.extend(extra.iter().cloned());
            }
        }
        out
    }

    /// All disallowed symbols across every language.
    pub fn all_disallowed(&self) -> BTreeSet<String> {
        let mut out = self.imports.disallow.clone();
        for rules in self.language_rules.values() {
            out.extend(rules.iter().cloned());
        }
        out
    }
}

/// Package-level allow/deny sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportPolicy {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub disallow: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub prefer: BTreeSet<String>,
}

impl ImportPolicy {
    pub fn is_empty(&self) -> bool {
        self.disallow.is_empty() && self.prefer.is_empty()
    }
}

/// Named architectural layers and the forbidden dependency directions between them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoundaryPolicy {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub layers: Vec<Layer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<BoundaryRule>,
}

impl BoundaryPolicy {
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty() && self.rules.is_empty()
    }

    /// Look up a layer by name (case-insensitive).
    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(name))
    }
}

/// A named layer and the path glob its files live under.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Layer {
    pub name: String,
    pub path: String,
}

/// A directional constraint, written `forbid: "A -> B"` (A must not depend on B).
///
/// `→`, `<-` and `←` are accepted too; `"B <- A"` means the same as `"A -> B"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoundaryRule {
    pub forbid: String,
}

impl BoundaryRule {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            forbid: format!("{} -> {}", from, to),
        }
    }

    /// Split the rule into `(from, to)` layer names.
    ///
    /// Returns `None` when the rule has no recognised arrow or an empty side.
    pub fn direction(&self) -> Option<(String, String)> {
        const FORWARD: &[&str] = &["->", "→"];
        const BACKWARD: &[&str] = &["<-", "←"];

        for arrow in FORWARD {
            if let Some((a, b)) = self.forbid.split_once(arrow) {
                return non_empty_pair(a, b);
            }
        }
        for arrow in BACKWARD {
            if let Some((b, a)) = self.forbid.split_once(arrow) {
                return non_empty_pair(a, b);
            }
        }
        None
    }
}

fn non_empty_pair(a: &str, b: &str) -> Option<(String, String)> {
    let (a, b) = (a.trim(), b.trim());
    if a.is_empty() || b.is_empty() {
        None
    } else {
        Some((a.to_string(), b.to_string()))
    }
}
