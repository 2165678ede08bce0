// mod.rs — Subcommand implementations for the `adr` binary.

pub mod guard;
pub mod index;
pub mod lock;
pub mod policy;
pub mod preflight;
pub mod validate;
