//! # adr-policy
//!
//! Turns a decision record into an enforceable [`PolicyModel`].
//!
//! The [`PolicyExtractor`] reads the structured `policy` block first, then
//! scans the prose for directive phrases ("Don't use X", "Prefer X over Y",
//! "Replace X with Y"). Each extracted rule keeps its provenance so callers can
//! tell authored policy from inferred policy. Extraction never fails; anything
//! doubtful comes back from [`PolicyExtractor::validate_completeness`] as a
//! [`PolicyWarning`].
//!
//! [`PolicyModel`]: adr_core::PolicyModel

pub mod error;
pub mod extractor;
pub mod patterns;
pub mod preflight;
pub mod suggest;

pub use error::PolicyError;
pub use extractor::{
    describe_imports, ExtractedRule, PolicyExtraction, PolicyExtractor, PolicyWarning,
    Provenance, WarningKind,
};
pub use patterns::{normalize_symbol, DirectiveKind, Disposition, PatternHit};
pub use preflight::{preflight, DecisionRef, PreflightOutcome, PreflightVerdict};
pub use suggest::suggest_policy;
