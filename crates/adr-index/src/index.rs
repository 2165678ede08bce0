// index.rs — SemanticIndex: incremental build and nearest-neighbour search.
//
// One index is owned per project root and handed to callers by reference.
// `build` takes a snapshot of decisions, re-embeds only those whose indexed
// text changed, and rewrites the artifacts. `search` embeds the query and
// scores every chunk; a decision's score is the best of its chunks.
//
// Ranking is fully ordered: score descending, then date descending (newer
// decisions first), then id ascending.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use adr_core::{Decision, DecisionStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::chunker::{chunk_decision, Chunk, ChunkType};
use crate::embedding::Embedder;
use crate::error::IndexError;
use crate::persist::{self, Artifacts, DecisionEntry, IndexMeta};

/// How many chunks a search match reports.
const BEST_CHUNKS: usize = 3;

/// Counters from one `build`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildStats {
    pub total_decisions: usize,
    pub total_chunks: usize,
    /// Decisions whose chunks were (re)computed.
    pub reembedded: usize,
    /// Decisions whose cached chunks were kept.
    pub reused: usize,
    /// Decisions left out because embedding failed.
    pub skipped: usize,
    /// Previously indexed decisions no longer in the input.
    pub removed: usize,
    pub failures: Vec<BuildFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildFailure {
    pub decision_id: String,
    pub reason: String,
}

/// A chunk that contributed to a match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkHit {
    pub ordinal: usize,
    pub chunk_type: ChunkType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_name: Option<String>,
    pub text: String,
    pub score: f32,
}

/// One decision returned by `search`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchMatch {
    pub decision_id: String,
    pub title: String,
    pub status: DecisionStatus,
    pub date: NaiveDate,
    pub score: f32,
    pub best_chunks: Vec<ChunkHit>,
}

pub struct SemanticIndex {
    dir: PathBuf,
    embedder: Arc<dyn Embedder>,
    chunk_threshold: usize,
    meta: IndexMeta,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
}

impl SemanticIndex {
    /// Open the index stored in `dir`.
    ///
    /// Missing or unreadable artifacts leave the index empty; the next
    /// `build` recreates them.
    pub fn open(
        dir: impl Into<PathBuf>,
        embedder: Arc<dyn Embedder>,
        chunk_threshold: usize,
    ) -> Self {
        let dir = dir.into();
        let empty = IndexMeta::empty(embedder.name(), embedder.dimensions(), chunk_threshold);
        let (meta, chunks, vectors) = match persist::load(&dir) {
            Ok(Some(a)) => (a.meta, a.chunks, a.vectors),
            Ok(None) => (empty, Vec::new(), Vec::new()),
            Err(e) => {
                tracing::warn!(dir = %dir.display(), "discarding unreadable index: {}", e);
                (empty, Vec::new(), Vec::new())
            }
        };
        Self {
            dir,
            embedder,
            chunk_threshold,
            meta,
            chunks,
            vectors,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of indexed decisions.
    pub fn len(&self) -> usize {
        self.meta.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meta.decisions.is_empty()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn status_of(&self, id: &str) -> Option<DecisionStatus> {
        self.entry(id).map(|e| e.status)
    }

    /// Chunks of one decision, in ordinal order.
    pub fn chunks_for(&self, id: &str) -> &[Chunk] {
        match self.entry(id) {
            Some(e) => &self.chunks[e.offset..e.offset + e.count],
            None => &[],
        }
    }

    fn entry(&self, id: &str) -> Option<&DecisionEntry> {
        self.meta
            .decisions
            .binary_search_by(|e| e.id.as_str().cmp(id))
            .ok()
            .map(|i| &self.meta.decisions[i])
    }

    /// True when cached vectors cannot be reused as-is.
    fn is_stale(&self) -> bool {
        self.meta.embedder != self.embedder.name()
            || self.meta.dimensions != self.embedder.dimensions()
            || self.meta.chunk_threshold != self.chunk_threshold
    }

    /// Index `decisions`, reusing cached chunks for unchanged ones, and
    /// persist the result.
    ///
    /// Decisions absent from `decisions` are dropped from the index. A
    /// decision whose embedding fails is left out and listed in
    /// `BuildStats::failures`; the build itself still succeeds. If the
    /// artifacts cannot be written, the in-memory index is still updated
    /// and the write error is returned.
    pub fn build(
        &mut self,
        decisions: &[Decision],
        force_rebuild: bool,
    ) -> Result<BuildStats, IndexError> {
        let stale = self.is_stale();
        if stale && !self.meta.decisions.is_empty() {
            tracing::info!(
                previous = %self.meta.embedder,
                current = %self.embedder.name(),
                "embedder or chunking settings changed; re-embedding all decisions"
            );
        }
        let reuse_allowed = !force_rebuild && !stale;

        let mut ordered: Vec<&Decision> = decisions.iter().collect();
        ordered.sort_by(|a, b| a.id().cmp(b.id()));
        let mut seen = BTreeSet::new();
        ordered.retain(|d| {
            let first = seen.insert(d.id().to_string());
            if !first {
                tracing::warn!(
                    id = %d.id(),
                    "duplicate decision id; indexing the first occurrence only"
                );
            }
            first
        });

        let previous: BTreeMap<&str, &DecisionEntry> = self
            .meta
            .decisions
            .iter()
            .map(|e| (e.id.as_str(), e))
            .collect();

        let mut stats = BuildStats::default();
        let mut meta = IndexMeta::empty(
            self.embedder.name(),
            self.embedder.dimensions(),
            self.chunk_threshold,
        );
        let mut chunks: Vec<Chunk> = Vec::new();
        let mut vectors: Vec<Vec<f32>> = Vec::new();

        for decision in &ordered {
            let content_hash = content_hash(decision);
            let cached = previous
                .get(decision.id())
                .filter(|e| reuse_allowed && e.content_hash == content_hash);

            let (new_chunks, new_vectors) = match cached {
                Some(entry) => {
                    stats.reused += 1;
                    let range = entry.offset..entry.offset + entry.count;
                    (self.chunks[range.clone()].to_vec(), self.vectors[range].to_vec())
                }
                None => match self.embed_decision(decision) {
                    Ok(embedded) => {
                        stats.reembedded += 1;
                        embedded
                    }
                    Err(e) => {
                        tracing::warn!(id = %decision.id(), "skipping decision: {}", e);
                        stats.skipped += 1;
                        stats.failures.push(BuildFailure {
                            decision_id: decision.id().to_string(),
                            reason: e.to_string(),
                        });
                        continue;
                    }
                },
            };

            meta.decisions.push(DecisionEntry {
                id: decision.id().to_string(),
                title: decision.title().to_string(),
                status: decision.status(),
                date: decision.front_matter.date,
                content_hash,
                offset: chunks.len(),
                count: new_chunks.len(),
            });
            chunks.extend(new_chunks);
            vectors.extend(new_vectors);
        }

        stats.removed = previous
            .keys()
            .filter(|id| !seen.contains(**id))
            .count();
        stats.total_decisions = meta.decisions.len();
        stats.total_chunks = chunks.len();

        let artifacts = Artifacts {
            meta,
            chunks,
            vectors,
        };
        let saved = persist::save(&self.dir, &artifacts);
        self.meta = artifacts.meta;
        self.chunks = artifacts.chunks;
        self.vectors = artifacts.vectors;
        saved?;

        tracing::info!(
            decisions = stats.total_decisions,
            chunks = stats.total_chunks,
            reembedded = stats.reembedded,
            reused = stats.reused,
            skipped = stats.skipped,
            "index built"
        );
        Ok(stats)
    }

    fn embed_decision(
        &self,
        decision: &Decision,
    ) -> Result<(Vec<Chunk>, Vec<Vec<f32>>), IndexError> {
        let chunks = chunk_decision(decision, self.chunk_threshold);
        let expected = self.embedder.dimensions();
        let mut vectors = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let vector = self.embedder.embed(&chunk.text)?;
            if vector.len() != expected {
                return Err(IndexError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
            vectors.push(vector);
        }
        tracing::debug!(id = %decision.id(), chunks = chunks.len(), "embedded decision");
        Ok((chunks, vectors))
    }

    /// The `k` decisions most similar to `query`.
    ///
    /// `filter_status` keeps only decisions whose status is in the given
    /// set. It is applied after scoring, so it never changes the scores or
    /// relative order of the decisions that remain.
    pub fn search(
        &self,
        query: &str,
        k: usize,
        filter_status: Option<&[DecisionStatus]>,
    ) -> Result<Vec<SearchMatch>, IndexError> {
        if k == 0 || self.meta.decisions.is_empty() {
            return Ok(Vec::new());
        }
        let q = self.embedder.embed(query)?;

        let mut matches: Vec<SearchMatch> = Vec::new();
        for entry in &self.meta.decisions {
            let mut scored: Vec<(f32, usize)> = (entry.offset..entry.offset + entry.count)
                .map(|row| (self.embedder.similarity(&q, &self.vectors[row]), row))
                .collect();
            scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
            let Some(&(best, _)) = scored.first() else {
                continue;
            };
            if filter_status.is_some_and(|set| !set.contains(&entry.status)) {
                continue;
            }

            let best_chunks = scored
                .iter()
                .take(BEST_CHUNKS)
                .map(|&(score, row)| {
                    let chunk = &self.chunks[row];
                    ChunkHit {
                        ordinal: chunk.ordinal,
                        chunk_type: chunk.chunk_type,
                        section_name: chunk.section_name.clone(),
                        text: chunk.text.clone(),
                        score,
                    }
                })
                .collect();

            matches.push(SearchMatch {
                decision_id: entry.id.clone(),
                title: entry.title.clone(),
                status: entry.status,
                date: entry.date,
                score: best,
                best_chunks,
            });
        }

        matches.sort_by(rank);
        matches.truncate(k);
        Ok(matches)
    }
}

fn rank(a: &SearchMatch, b: &SearchMatch) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.date.cmp(&a.date))
        .then_with(|| a.decision_id.cmp(&b.decision_id))
}

/// SHA-256 over the text that feeds the chunker.
fn content_hash(decision: &Decision) -> String {
    let mut hasher = Sha256::new();
    hasher.update(decision.title().as_bytes());
    hasher.update([0u8]);
    hasher.update(decision.body.as_bytes());
    format!("{:x}", hasher.finalize())
}
