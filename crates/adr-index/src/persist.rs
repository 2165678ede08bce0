// persist.rs — On-disk index artifacts.
//
//   <index_dir>/chunks.jsonl   one Chunk per line, ordered by decision id then ordinal
//   <index_dir>/vectors.bin    little-endian f32 rows, one per chunk line
//   <index_dir>/meta.json      embedder identity and per-decision offsets
//
// Each file is written to a uniquely named temp file and renamed into place. `meta.json`
// is written last. The artifacts hold no timestamps, so rebuilding from
// unchanged input reproduces them byte for byte.

use std::fs;
use std::io::Write;
use std::path::Path;

use adr_core::DecisionStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::chunker::Chunk;
use crate::error::IndexError;

pub const CHUNKS_FILE: &str = "chunks.jsonl";
pub const VECTORS_FILE: &str = "vectors.bin";
pub const META_FILE: &str = "meta.json";

/// Bumped when the artifact layout changes; older artifacts are discarded.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexMeta {
    pub format_version: u32,
    pub embedder: String,
    pub dimensions: usize,
    pub chunk_threshold: usize,
    /// Sorted by id. `offset`/`count` address rows in chunks and vectors.
    pub decisions: Vec<DecisionEntry>,
}

impl IndexMeta {
    pub fn empty(embedder: &str, dimensions: usize, chunk_threshold: usize) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            embedder: embedder.to_string(),
            dimensions,
            chunk_threshold,
            decisions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionEntry {
    pub id: String,
    pub title: String,
    pub status: DecisionStatus,
    pub date: NaiveDate,
    /// SHA-256 of the indexed text.
    pub content_hash: String,
    pub offset: usize,
    pub count: usize,
}

/// Everything the index keeps on disk.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub meta: IndexMeta,
    pub chunks: Vec<Chunk>,
    pub vectors: Vec<Vec<f32>>,
}

/// Write `bytes` to `path` via a uniquely named sibling temp file and rename.
///
/// Concurrent writers never share a temp file; the last rename wins.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), IndexError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|source| IndexError::IoError {
        path: parent.to_path_buf(),
        source,
    })?;
    let io_err = |source: std::io::Error| IndexError::IoError {
        path: path.to_path_buf(),
        source,
    };
    let mut tmp = NamedTempFile::new_in(parent).map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// Persist all three artifacts into `dir`.
pub fn save(dir: &Path, artifacts: &Artifacts) -> Result<(), IndexError> {
    let mut lines = String::new();
    for chunk in &artifacts.chunks {
        lines.push_str(&serde_json::to_string(chunk)?);
        lines.push('\n');
    }

    let mut vectors = Vec::with_capacity(artifacts.vectors.len() * artifacts.meta.dimensions * 4);
    for row in &artifacts.vectors {
        for value in row {
            vectors.extend_from_slice(&value.to_le_bytes());
        }
    }

    let mut meta = serde_json::to_vec_pretty(&artifacts.meta)?;
    meta.push(b'\n');

    write_atomic(&dir.join(CHUNKS_FILE), lines.as_bytes())?;
    write_atomic(&dir.join(VECTORS_FILE), &vectors)?;
    write_atomic(&dir.join(META_FILE), &meta)?;
    Ok(())
}

/// Load artifacts from `dir`. `Ok(None)` when no index has been written.
///
/// Any inconsistency between the three files is a `CorruptIndex` error.
pub fn load(dir: &Path) -> Result<Option<Artifacts>, IndexError> {
    let meta_path = dir.join(META_FILE);
    if !meta_path.exists() {
        return Ok(None);
    }
    let meta_bytes = read(&meta_path)?;
    let meta: IndexMeta =
        serde_json::from_slice(&meta_bytes).map_err(|e| corrupt(&meta_path, e.to_string()))?;
    if meta.format_version != FORMAT_VERSION {
        return Err(corrupt(
            &meta_path,
            format!("format version {} is not supported", meta.format_version),
        ));
    }

    let chunks_path = dir.join(CHUNKS_FILE);
    let text = String::from_utf8(read(&chunks_path)?)
        .map_err(|e| corrupt(&chunks_path, e.to_string()))?;
    let mut chunks = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let chunk: Chunk = serde_json::from_str(line)
            .map_err(|e| corrupt(&chunks_path, format!("line {}: {}", n + 1, e)))?;
        chunks.push(chunk);
    }

    let vectors_path = dir.join(VECTORS_FILE);
    let raw = read(&vectors_path)?;
    let row_bytes = meta.dimensions * 4;
    if meta.dimensions == 0 || raw.len() != chunks.len() * row_bytes {
        return Err(corrupt(
            &vectors_path,
            format!(
                "expected {} rows of {} dimensions, found {} bytes",
                chunks.len(),
                meta.dimensions,
                raw.len()
            ),
        ));
    }
    let vectors: Vec<Vec<f32>> = raw
        .chunks_exact(row_bytes)
        .map(|row| {
            row.chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect()
        })
        .collect();

    let mut expected_offset = 0;
    for entry in &meta.decisions {
        let in_range = entry.offset == expected_offset
            && entry.offset + entry.count <= chunks.len()
            && chunks[entry.offset..entry.offset + entry.count]
                .iter()
                .all(|c| c.decision_id == entry.id);
        if !in_range {
            return Err(corrupt(
                &meta_path,
                format!("chunk range for {} does not match chunks file", entry.id),
            ));
        }
        expected_offset += entry.count;
    }
    if expected_offset != chunks.len() {
        return Err(corrupt(&meta_path, "chunks file has unindexed rows".to_string()));
    }

    Ok(Some(Artifacts {
        meta,
        chunks,
        vectors,
    }))
}

fn read(path: &Path) -> Result<Vec<u8>, IndexError> {
    fs::read(path).map_err(|source| IndexError::IoError {
        path: path.to_path_buf(),
        source,
    })
}

fn corrupt(path: &Path, reason: String) -> IndexError {
    IndexError::CorruptIndex {
        path: path.to_path_buf(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::ChunkType;
    use tempfile::tempdir;

    fn sample() -> Artifacts {
        let chunk = Chunk {
            decision_id: "ADR-0001".to_string(),
            ordinal: 0,
            chunk_type: ChunkType::Title,
            section_name: None,
            text: "Use FastAPI".to_string(),
        };
        let mut meta = IndexMeta::empty("test", 2, 100);
        meta.decisions.push(DecisionEntry {
            id: "ADR-0001".to_string(),
            title: "Use FastAPI".to_string(),
            status: DecisionStatus::Accepted,
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            content_hash: "abc".to_string(),
            offset: 0,
            count: 1,
        });
        Artifacts {
            meta,
            chunks: vec![chunk],
            vectors: vec![vec![0.6, 0.8]],
        }
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        save(dir.path(), &sample()).unwrap();
        let loaded = load(dir.path()).unwrap().unwrap();
        assert_eq!(loaded.meta, sample().meta);
        assert_eq!(loaded.chunks, sample().chunks);
        assert_eq!(loaded.vectors, vec![vec![0.6f32, 0.8]]);
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|n| ![CHUNKS_FILE, VECTORS_FILE, META_FILE].iter().any(|f| n == f))
            .collect();
        assert!(leftovers.is_empty(), "{:?}", leftovers);
    }

    #[test]
    fn concurrent_saves_do_not_collide() {
        let dir = tempdir().unwrap();
        let artifacts = sample();
        let (path, artifacts) = (dir.path(), &artifacts);
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(move || {
                        for _ in 0..20 {
                            save(path, artifacts)?;
                        }
                        Ok::<(), IndexError>(())
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap().unwrap();
            }
        });
        let loaded = load(dir.path()).unwrap().unwrap();
        assert_eq!(loaded.meta, sample().meta);
    }

    #[test]
    fn missing_index_is_none() {
        let dir = tempdir().unwrap();
        assert!(load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn truncated_vectors_are_corrupt() {
        let dir = tempdir().unwrap();
        save(dir.path(), &sample()).unwrap();
        fs::write(dir.path().join(VECTORS_FILE), [0u8; 3]).unwrap();
        assert!(matches!(
            load(dir.path()),
            Err(IndexError::CorruptIndex { .. })
        ));
    }

    #[test]
    fn garbage_meta_is_corrupt() {
        let dir = tempdir().unwrap();
        save(dir.path(), &sample()).unwrap();
        fs::write(dir.path().join(META_FILE), "{not json").unwrap();
        assert!(matches!(
            load(dir.path()),
            Err(IndexError::CorruptIndex { .. })
        ));
    }
}
