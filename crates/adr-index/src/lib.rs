//! # adr-index
//!
//! Semantic retrieval over decision records.
//!
//! Decisions are split into chunks (title, named sections, remaining body),
//! each chunk is embedded through an injected [`Embedder`], and queries are
//! answered by cosine similarity. The index is persisted under
//! `.adr/index/` and rebuilt incrementally: only decisions whose text
//! changed are re-embedded.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use adr_index::{HashingEmbedder, SemanticIndex};
//!
//! let embedder = Arc::new(HashingEmbedder::new(384));
//! let mut index = SemanticIndex::open(".adr/index", embedder, 1200);
//! index.build(&[], false).unwrap();
//! for m in index.search("python web framework", 5, None).unwrap() {
//!     println!("{} {:.3}", m.decision_id, m.score);
//! }
//! ```

pub mod chunker;
pub mod embedding;
pub mod error;
pub mod index;
pub mod persist;

pub use chunker::{chunk_decision, Chunk, ChunkType};
pub use embedding::{cosine_similarity, Embedder, HashingEmbedder};
pub use error::IndexError;
pub use index::{BuildFailure, BuildStats, ChunkHit, SearchMatch, SemanticIndex};
