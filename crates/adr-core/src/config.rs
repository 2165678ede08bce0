// config.rs — Project layout and tunables.
//
// `AdrConfig::for_project()` gives the standard layout:
//
//   <root>/docs/adr/           decision records
//   <root>/.adr/index/         semantic index artifacts (regenerable cache)
//   <root>/.adr/locks.json     lock records for approved decisions
//
// An optional `<root>/.adr/config.toml` overrides any of the defaults:
//
//   adr_dir = "architecture/decisions"
//   id_prefix = "ADR"
//
//   [index]
//   dimensions = 384
//   chunk_threshold = 1200
//   search_k = 5
//
//   [guard]
//   max_diff_bytes = 5242880

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Resolved configuration for one project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdrConfig {
    pub project_root: PathBuf,
    /// Directory holding decision Markdown files.
    pub adr_dir: PathBuf,
    /// Engine state directory (`.adr/`).
    pub state_dir: PathBuf,
    /// Directory for index artifacts.
    pub index_dir: PathBuf,
    /// Lock record file.
    pub lock_file: PathBuf,
    /// Prefix for newly allocated decision IDs.
    pub id_prefix: String,
    pub index: IndexSettings,
    pub guard: GuardSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexSettings {
    /// Embedding vector length for the built-in embedder.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    /// Section length (bytes) above which extra paragraph chunks are produced.
    #[serde(default = "default_chunk_threshold")]
    pub chunk_threshold: usize,
    /// Default number of decisions returned by a search.
    #[serde(default = "default_search_k")]
    pub search_k: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            dimensions: default_dimensions(),
            chunk_threshold: default_chunk_threshold(),
            search_k: default_search_k(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuardSettings {
    /// Diffs larger than this are refused before parsing.
    #[serde(default = "default_max_diff_bytes")]
    pub max_diff_bytes: usize,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            max_diff_bytes: default_max_diff_bytes(),
        }
    }
}

/// On-disk shape of `.adr/config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
struct ProjectSettings {
    adr_dir: Option<PathBuf>,
    id_prefix: Option<String>,
    #[serde(default)]
    index: Option<IndexSettings>,
    #[serde(default)]
    guard: Option<GuardSettings>,
}

// Serde default functions
fn default_dimensions() -> usize {
    384
}

fn default_chunk_threshold() -> usize {
    1200
}

fn default_search_k() -> usize {
    5
}

fn default_max_diff_bytes() -> usize {
    5 * 1024 * 1024
}

impl AdrConfig {
    /// Standard layout with built-in defaults. Does not touch the filesystem.
    pub fn for_project(project_root: impl AsRef<Path>) -> Self {
        let root = project_root.as_ref().to_path_buf();
        let state_dir = root.join(".adr");
        Self {
            adr_dir: root.join("docs").join("adr"),
            index_dir: state_dir.join("index"),
            lock_file: state_dir.join("locks.json"),
            state_dir,
            project_root: root,
            id_prefix: "ADR".to_string(),
            index: IndexSettings::default(),
            guard: GuardSettings::default(),
        }
    }

    /// Standard layout with `.adr/config.toml` applied when it exists.
    pub fn load(project_root: impl AsRef<Path>) -> Result<Self, CoreError> {
        let mut config = Self::for_project(project_root);
        let path = config.config_file();
        if !path.exists() {
            return Ok(config);
        }

        let text = fs::read_to_string(&path).map_err(|source| CoreError::IoError {
            path: path.clone(),
            source,
        })?;
        let settings: ProjectSettings = toml::from_str(&text)
            .map_err(|source| CoreError::ConfigError { path, source })?;

        if let Some(dir) = settings.adr_dir {
            config.adr_dir = if dir.is_absolute() {
                dir
            } else {
                config.project_root.join(dir)
            };
        }
        if let Some(prefix) = settings.id_prefix {
            config.id_prefix = prefix;
        }
        if let Some(index) = settings.index {
            config.index = index;
        }
        if let Some(guard) = settings.guard {
            config.guard = guard;
        }
        Ok(config)
    }

    pub fn config_file(&self) -> PathBuf {
        self.state_dir.join("config.toml")
    }
}
