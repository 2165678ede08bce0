// store.rs — DecisionStore: Markdown + YAML front matter files in one directory.
//
// Each decision lives in `<adr_dir>/<ID>-<slug>.md`. The store lists the
// directory once per call, so callers that need a consistent view of the
// decision set should take a `Snapshot` via `load_all()` and work from it.
//
// A file that fails to parse never aborts a bulk load: it is reported in
// `Snapshot::failures` and the remaining files are still returned.

use std::fs;
use std::path::{Path, PathBuf};

use crate::decision::{Decision, FrontMatter};
use crate::error::CoreError;

const FRONT_MATTER_FENCE: &str = "---";

/// Files in the decision directory that are never decisions.
const IGNORED_FILES: &[&str] = &["readme.md", "index.md", "template.md"];

/// Decision records loaded from a single directory listing.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub decisions: Vec<Decision>,
    pub failures: Vec<LoadFailure>,
}

/// A file that could not be loaded as a decision.
#[derive(Debug, Clone)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// File-backed decision store.
pub struct DecisionStore {
    dir: PathBuf,
}

impl DecisionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// List decision files, sorted by file name. A missing directory is empty.
    pub fn find_decisions(&self) -> Result<Vec<PathBuf>, CoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.dir).map_err(|source| CoreError::IoError {
            path: self.dir.clone(),
            source,
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| CoreError::IoError {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            let is_markdown = path.extension().is_some_and(|ext| ext == "md");
            let ignored = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| IGNORED_FILES.contains(&n.to_ascii_lowercase().as_str()));
            if path.is_file() && is_markdown && !ignored {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Load and parse one decision file.
    pub fn load(&self, path: &Path) -> Result<Decision, CoreError> {
        let text = fs::read_to_string(path).map_err(|source| CoreError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        let mut decision = parse_markdown(&text, path)?;
        decision.path = Some(path.to_path_buf());
        Ok(decision)
    }

    /// Write a decision to `path`, creating parent directories as needed.
    pub fn save(&self, decision: &Decision, path: &Path) -> Result<(), CoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| CoreError::IoError {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let markdown = to_markdown(decision)?;
        fs::write(path, markdown).map_err(|source| CoreError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(id = %decision.id(), path = %path.display(), "saved decision");
        Ok(())
    }

    /// Load every decision from one directory listing.
    ///
    /// Listing failures are fatal; per-file failures are collected.
    pub fn load_all(&self) -> Result<Snapshot, CoreError> {
        let mut snapshot = Snapshot::default();
        for path in self.find_decisions()? {
            match self.load(&path) {
                Ok(decision) => snapshot.decisions.push(decision),
                Err(e) => {
                    tracing::warn!(path = %path.display(), "skipping unreadable decision: {}", e);
                    snapshot.failures.push(LoadFailure {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }
        Ok(snapshot)
    }

    /// Find a decision by its ID.
    pub fn find_by_id(&self, id: &str) -> Result<Decision, CoreError> {
        self.load_all()?
            .decisions
            .into_iter()
            .find(|d| d.id() == id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))
    }

    /// Conventional file path for a decision in this store.
    pub fn path_for(&self, decision: &Decision) -> PathBuf {
        self.dir
            .join(format!("{}-{}.md", decision.id(), slugify(decision.title())))
    }

    /// Next free ID with the given prefix: highest existing number + 1.
    pub fn next_id(&self, prefix: &str) -> Result<String, CoreError> {
        let snapshot = self.load_all()?;
        let lead = format!("{}-", prefix);
        let max = snapshot
            .decisions
            .iter()
            .filter_map(|d| d.id().strip_prefix(&lead))
            .filter_map(|n| n.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        Ok(format!("{}-{:04}", prefix, max + 1))
    }
}

/// Parse a Markdown document with YAML front matter into a decision.
pub fn parse_markdown(text: &str, path: &Path) -> Result<Decision, CoreError> {
    let text = text.trim_start_matches('\u{feff}');
    let parse_error = |reason: String| CoreError::ParseError {
        path: path.to_path_buf(),
        reason,
    };

    let mut lines = text.split_inclusive('\n');
    match lines.next() {
        Some(first) if first.trim_end() == FRONT_MATTER_FENCE => {}
        _ => return Err(parse_error("missing front matter".to_string())),
    }

    let mut yaml = String::new();
    let mut closed = false;
    for line in lines.by_ref() {
        if line.trim_end() == FRONT_MATTER_FENCE {
            closed = true;
            break;
        }
        yaml.push_str(line);
    }
    if !closed {
        return Err(parse_error("unterminated front matter".to_string()));
    }

    let front_matter: FrontMatter =
        serde_yaml::from_str(&yaml).map_err(|e| parse_error(e.to_string()))?;
    let body: String = lines.collect();

    Ok(Decision {
        front_matter,
        body: body.trim_start_matches(['\n', '\r']).to_string(),
        path: None,
    })
}

/// Render a decision back to Markdown with YAML front matter.
pub fn to_markdown(decision: &Decision) -> Result<String, CoreError> {
    let yaml = serde_yaml::to_string(&decision.front_matter)?;
    Ok(format!(
        "{fence}\n{yaml}{fence}\n\n{body}",
        fence = FRONT_MATTER_FENCE,
        yaml = yaml,
        body = decision.body
    ))
}

/// Lowercase, hyphen-separated file-name slug for a title.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_dash = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::DecisionStatus;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"---
id: ADR-0003
title: Use FastAPI as Web Framework
status: accepted
date: 2024-01-15
tags: [backend]
policy:
  imports:
    disallow: [flask]
    prefer: [fastapi]
reviewers: [alice]
---

## Context

Need async.
"#;

    #[test]
    fn parse_front_matter_and_body() {
        let d = parse_markdown(SAMPLE, Path::new("x.md")).unwrap();
        assert_eq!(d.id(), "ADR-0003");
        assert_eq!(d.status(), DecisionStatus::Accepted);
        assert_eq!(d.front_matter.tags, vec!["backend"]);
        let policy = d.front_matter.policy.as_ref().unwrap();
        assert!(policy.imports.disallow.contains("flask"));
        assert!(d.front_matter.extra.contains_key("reviewers"));
        assert!(d.body.starts_with("## Context"));
    }

    #[test]
    fn missing_front_matter_is_a_parse_error() {
        let err = parse_markdown("# Just markdown\n", Path::new("x.md")).unwrap_err();
        assert!(matches!(err, CoreError::ParseError { .. }));
    }

    #[test]
    fn unterminated_front_matter_is_a_parse_error() {
        let err = parse_markdown("---\nid: ADR-0001\n", Path::new("x.md")).unwrap_err();
        assert!(err.to_string().contains("unterminated"));
    }

    #[test]
    fn markdown_round_trip() {
        let d = parse_markdown(SAMPLE, Path::new("x.md")).unwrap();
        let rendered = to_markdown(&d).unwrap();
        let again = parse_markdown(&rendered, Path::new("x.md")).unwrap();
        assert_eq!(d.front_matter, again.front_matter);
        assert_eq!(d.body, again.body);
    }

    #[test]
    fn store_save_find_and_load() {
        let dir = tempdir().unwrap();
        let store = DecisionStore::new(dir.path().join("adr"));
        let d = parse_markdown(SAMPLE, Path::new("x.md")).unwrap();
        let path = store.path_for(&d);
        store.save(&d, &path).unwrap();
        std::fs::write(dir.path().join("adr").join("README.md"), "# index").unwrap();

        let found = store.find_decisions().unwrap();
        assert_eq!(found, vec![path.clone()]);
        assert!(path.ends_with("ADR-0003-use-fastapi-as-web-framework.md"));

        let loaded = store.load(&path).unwrap();
        assert_eq!(loaded.path.as_deref(), Some(path.as_path()));
        assert_eq!(store.find_by_id("ADR-0003").unwrap().title(), d.title());
        assert!(matches!(
            store.find_by_id("ADR-0099"),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn load_all_contains_bad_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("ADR-0001-good.md"), SAMPLE).unwrap();
        std::fs::write(dir.path().join("ADR-0002-bad.md"), "no front matter").unwrap();
        let store = DecisionStore::new(dir.path());

        let snapshot = store.load_all().unwrap();
        assert_eq!(snapshot.decisions.len(), 1);
        assert_eq!(snapshot.failures.len(), 1);
        assert!(snapshot.failures[0].path.ends_with("ADR-0002-bad.md"));
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let store = DecisionStore::new(dir.path().join("nope"));
        assert!(store.find_decisions().unwrap().is_empty());
        assert_eq!(store.next_id("ADR").unwrap(), "ADR-0001");
    }

    #[test]
    fn next_id_increments_highest() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), SAMPLE).unwrap();
        let store = DecisionStore::new(dir.path());
        assert_eq!(store.next_id("ADR").unwrap(), "ADR-0004");
        assert_eq!(store.next_id("SEC").unwrap(), "SEC-0001");
    }

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Use React Query (v5)!"), "use-react-query-v5");
        assert_eq!(slugify("  spaced  "), "spaced");
    }
}
