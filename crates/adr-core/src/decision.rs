// decision.rs — Decision record types.
//
// A decision record is a Markdown file with YAML front matter:
//
//   ---
//   id: ADR-0001
//   title: Use FastAPI as web framework
//   status: accepted
//   date: 2024-01-15
//   policy:
//     imports:
//       disallow: [flask]
//   ---
//
//   ## Context
//   ...
//
// The body is split into sections on level-2 headings. Four section names
// carry meaning for indexing and policy suggestion: Context, Decision,
// Consequences, Alternatives.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::policy::PolicyModel;

/// Lifecycle state of a decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    Proposed,
    Accepted,
    Superseded,
    Deprecated,
}

impl std::fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionStatus::Proposed => write!(f, "proposed"),
            DecisionStatus::Accepted => write!(f, "accepted"),
            DecisionStatus::Superseded => write!(f, "superseded"),
            DecisionStatus::Deprecated => write!(f, "deprecated"),
        }
    }
}

impl FromStr for DecisionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "proposed" => Ok(DecisionStatus::Proposed),
            "accepted" => Ok(DecisionStatus::Accepted),
            "superseded" => Ok(DecisionStatus::Superseded),
            "deprecated" => Ok(DecisionStatus::Deprecated),
            other => Err(format!(
                "unknown status '{}' (expected proposed, accepted, superseded or deprecated)",
                other
            )),
        }
    }
}

/// Structured metadata at the top of a decision file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrontMatter {
    /// Identifier in `KIND-NNNN` form (e.g. `ADR-0007`).
    pub id: String,
    pub title: String,
    pub status: DecisionStatus,
    /// When the decision was made.
    pub date: NaiveDate,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deciders: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supersedes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub superseded_by: Vec<String>,

    /// Optional structured policy block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<PolicyModel>,

    /// Free-standing justifications outside the policy block.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rationales: Vec<String>,

    /// Unknown front-matter keys, preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl FrontMatter {
    pub fn new(id: impl Into<String>, title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            status: DecisionStatus::Proposed,
            date,
            deciders: Vec::new(),
            tags: Vec::new(),
            supersedes: Vec::new(),
            superseded_by: Vec::new(),
            policy: None,
            rationales: Vec::new(),
            extra: BTreeMap::new(),
        }
    }
}

/// The sections of a decision body that carry meaning for the engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Context,
    Decision,
    Consequences,
    Alternatives,
}

impl SectionKind {
    /// Classify a heading. MADR variants such as "Decision Outcome" and
    /// "Considered Options" map onto the four kinds.
    pub fn from_heading(heading: &str) -> Option<Self> {
        let h = heading.trim().to_ascii_lowercase();
        if h.starts_with("context") {
            Some(SectionKind::Context)
        } else if h.starts_with("decision") {
            Some(SectionKind::Decision)
        } else if h.starts_with("consequence") {
            Some(SectionKind::Consequences)
        } else if h.starts_with("alternative")
            || h.starts_with("considered option")
            || h.starts_with("options considered")
        {
            Some(SectionKind::Alternatives)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Context => "Context",
            SectionKind::Decision => "Decision",
            SectionKind::Consequences => "Consequences",
            SectionKind::Alternatives => "Alternatives",
        }
    }
}

/// One `## Heading` block of the body. Text before the first heading has an
/// empty heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: String,
    pub kind: Option<SectionKind>,
    pub text: String,
}

/// A complete decision: front matter plus Markdown body.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub front_matter: FrontMatter,
    pub body: String,
    /// Where the decision was loaded from, if it came from disk.
    pub path: Option<PathBuf>,
}

impl Decision {
    pub fn new(front_matter: FrontMatter, body: impl Into<String>) -> Self {
        Self {
            front_matter,
            body: body.into(),
            path: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.front_matter.id
    }

    pub fn title(&self) -> &str {
        &self.front_matter.title
    }

    pub fn status(&self) -> DecisionStatus {
        self.front_matter.status
    }

    pub fn is_accepted(&self) -> bool {
        self.front_matter.status == DecisionStatus::Accepted
    }

    /// Split the body on level-2 headings.
    pub fn sections(&self) -> Vec<Section> {
        let mut sections = Vec::new();
        let mut heading = String::new();
        let mut buf: Vec<&str> = Vec::new();

        for line in self.body.lines() {
            if let Some(h) = line.strip_prefix("## ") {
                push_section(&mut sections, &heading, &buf);
                heading = h.trim().to_string();
                buf.clear();
            } else {
                buf.push(line);
            }
        }
        push_section(&mut sections, &heading, &buf);
        sections
    }

    /// Text of the first section of the given kind.
    pub fn section_text(&self, kind: SectionKind) -> Option<String> {
        self.sections()
            .into_iter()
            .find(|s| s.kind == Some(kind))
            .map(|s| s.text)
    }
}

fn push_section(out: &mut Vec<Section>, heading: &str, lines: &[&str]) {
    let text = lines.join("\n").trim().to_string();
    if heading.is_empty() && text.is_empty() {
        return;
    }
    out.push(Section {
        heading: heading.to_string(),
        kind: SectionKind::from_heading(heading),
        text,
    });
}
