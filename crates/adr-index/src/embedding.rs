// embedding.rs — Pluggable text embedding for the semantic index.
//
// The index never talks to a model directly; it is handed an `Embedder`.
// The built-in `HashingEmbedder` needs no network or model files: terms are
// hashed into a fixed number of buckets (FNV-1a), weighted by term frequency
// and a length-based IDF approximation, then L2-normalised.

use std::collections::BTreeMap;

use crate::error::IndexError;

/// Text → vector capability used by the index.
pub trait Embedder: Send + Sync {
    /// Embed one text. The vector must have `dimensions()` entries.
    fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError>;

    /// Length of every vector this embedder produces.
    fn dimensions(&self) -> usize;

    /// Stable identifier. Changing it invalidates a persisted index.
    fn name(&self) -> &str;

    /// Similarity of two vectors; higher is closer.
    fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        cosine_similarity(a, b)
    }
}

/// Cosine similarity. Zero vectors (and mismatched lengths) score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

/// Deterministic feature-hashing TF-IDF embedder.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub const NAME: &'static str = "hashing-tfidf";

    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn bucket(term: &str, dims: usize) -> usize {
        let mut h: u64 = 0xcbf29ce484222325;
        for b in term.as_bytes() {
            h ^= *b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        (h % dims as u64) as usize
    }

    /// Lowercase terms of two or more characters. Package punctuation
    /// (`@`, `/`, `-`, `_`, `.`) stays inside a term so `@tanstack/react-query`
    /// is one feature; its parts are added as features too.
    fn terms(text: &str) -> Vec<String> {
        let mut out = Vec::new();
        for raw in text.split(|c: char| !(c.is_alphanumeric() || "@/-_.".contains(c))) {
            let word = raw.trim_matches(|c: char| "/-_.".contains(c));
            if word.chars().count() < 2 {
                continue;
            }
            let word = word.to_lowercase();
            if word.contains(|c: char| !c.is_alphanumeric()) {
                for part in word.split(|c: char| !c.is_alphanumeric()) {
                    if part.chars().count() >= 2 {
                        out.push(part.to_string());
                    }
                }
            }
            out.push(word);
        }
        out
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        let terms = Self::terms(text);
        let mut vector = vec![0.0f32; self.dimensions];
        if terms.is_empty() {
            return Ok(vector);
        }

        // Ordered map: bucket sums are accumulated in the same order every run.
        let mut tf: BTreeMap<&str, f32> = BTreeMap::new();
        for term in &terms {
            *tf.entry(term.as_str()).or_default() += 1.0;
        }

        let total = terms.len() as f32;
        for (term, count) in &tf {
            let idf = 1.0 + (term.len() as f32).ln();
            vector[Self::bucket(term, self.dimensions)] += (count / total) * idf;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}
