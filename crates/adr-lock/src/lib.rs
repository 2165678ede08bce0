//! # adr-lock
//!
//! Tamper detection for approved decisions.
//!
//! Approving a decision records a SHA-256 digest of its canonical form in
//! `.adr/locks.json`. Verifying recomputes the digest from the file on disk;
//! any edit to the front matter or body after approval shows up as
//! [`VerifyStatus::Tampered`]. Optionally the decision file is also marked
//! read-only, as a convenience that the lock never depends on.

pub mod canonical;
pub mod error;
pub mod hasher;
pub mod manager;
pub mod store;

pub use canonical::{canonical_form, digest};
pub use error::LockError;
pub use manager::{Approval, ImmutabilityManager, Verification, VerifyStatus};
pub use store::{LockRecord, LockStore};
