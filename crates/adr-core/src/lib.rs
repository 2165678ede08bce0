//! # adr-core
//!
//! Decision records, the policy model they carry, and the file-backed store
//! that loads them.
//!
//! A decision record is a Markdown file with YAML front matter. The optional
//! `policy` block in the front matter deserializes straight into a
//! [`PolicyModel`]; everything else in the engine (extraction, indexing,
//! guarding, locking) works from [`Decision`] values produced here.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use adr_core::{AdrConfig, DecisionStore};
//!
//! let config = AdrConfig::load(".").unwrap();
//! let store = DecisionStore::new(&config.adr_dir);
//! for decision in store.load_all().unwrap().decisions {
//!     println!("{} {}", decision.id(), decision.title());
//! }
//! ```

pub mod config;
pub mod decision;
pub mod error;
pub mod policy;
pub mod store;
pub mod validate;

pub use config::{AdrConfig, GuardSettings, IndexSettings};
pub use decision::{Decision, DecisionStatus, FrontMatter, Section, SectionKind};
pub use error::CoreError;
pub use policy::{BoundaryPolicy, BoundaryRule, ImportPolicy, Layer, PolicyModel};
pub use store::{parse_markdown, slugify, to_markdown, DecisionStore, LoadFailure, Snapshot};
pub use validate::{is_valid, validate_decision, IssueLevel, ValidationIssue};
