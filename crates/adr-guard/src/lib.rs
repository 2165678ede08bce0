//! # adr-guard
//!
//! Diff-time enforcement of accepted decisions.
//!
//! [`GuardSystem::analyze`] parses a unified diff, finds the decisions
//! relevant to each changed file (semantic retrieval plus direct policy
//! matches), and evaluates their policies:
//!
//! - an added import of a disallowed symbol is an **error**;
//! - a file that keeps using a disallowed symbol without adopting a
//!   preferred one draws a **warning**;
//! - an added import that crosses a forbidden layer boundary is an **error**.
//!
//! Malformed hunks are skipped and reported as notices; the rest of the
//! diff is still analyzed.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use adr_core::AdrConfig;
//! use adr_guard::GuardSystem;
//!
//! let guard = GuardSystem::new(AdrConfig::for_project("."));
//! let diff = std::fs::read_to_string("change.diff").unwrap();
//! let report = guard.analyze(&diff, true).unwrap();
//! for v in &report.violations {
//!     println!("{}:{:?} [{}] {}", v.file, v.line, v.decision_id, v.message);
//! }
//! ```

pub mod boundary;
pub mod diff;
pub mod error;
pub mod guard;
pub mod imports;
pub mod report;

pub use boundary::{check_import, layer_contains, resolve_candidates, BoundaryHit};
pub use diff::{parse_unified_diff, DiffLine, FileDiff, ParsedDiff, SkippedHunk};
pub use error::GuardError;
pub use guard::GuardSystem;
pub use imports::{extract_imports, package_of, ImportRef, Language};
pub use report::{
    GuardNotice, GuardReport, NoticeSource, Relevance, RelevantDecision, Severity, Violation,
    ViolationKind,
};
