//! # adr-cli
//!
//! Command-line interface for architectural decision governance.
//!
//! - `adr validate` — check decision metadata
//! - `adr policy show/check/suggest` — inspect extracted policies
//! - `adr index build/search` — maintain and query the semantic index
//! - `adr guard` — check a diff against accepted decisions
//! - `adr approve/verify` — lock decisions and detect tampering
//! - `adr preflight` — ask whether a technology choice is allowed
//! - `adr next-id` — next free decision ID

mod commands;

use std::path::PathBuf;

use adr_core::AdrConfig;
use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// ADR governance: keep code changes consistent with accepted decisions.
#[derive(Parser)]
#[command(name = "adr", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".", global = true)]
    project_root: PathBuf,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate decision metadata.
    Validate {
        /// Only validate this decision.
        id: Option<String>,
    },
    /// Inspect extracted policies.
    Policy {
        #[command(subcommand)]
        command: commands::policy::PolicyCommands,
    },
    /// Build or query the semantic index.
    Index {
        #[command(subcommand)]
        command: commands::index::IndexCommands,
    },
    /// Check a unified diff against accepted decisions.
    Guard {
        /// Diff file to read (defaults to stdin).
        #[arg(long)]
        diff: Option<PathBuf>,
        /// Use the index as it is instead of updating it first.
        #[arg(long)]
        no_rebuild: bool,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Accept a decision and lock its current content.
    Approve {
        /// Decision ID (e.g., ADR-0001).
        id: String,
        /// Also mark the decision file read-only.
        #[arg(long)]
        readonly: bool,
    },
    /// Verify locked decisions against their digests.
    Verify {
        /// Only verify this decision.
        id: Option<String>,
        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Check whether a technology choice is allowed by accepted decisions.
    Preflight {
        /// Package or technology name (e.g., flask, @tanstack/react-query).
        choice: String,
        /// Print the outcome as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the next free decision ID.
    NextId,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json)?;

    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let config = AdrConfig::load(&project_root)
        .with_context(|| format!("loading configuration for {}", project_root.display()))?;

    match &cli.command {
        Commands::Validate { id } => commands::validate::execute(&config, id.as_deref()),
        Commands::Policy { command } => commands::policy::execute(command, &config),
        Commands::Index { command } => commands::index::execute(command, &config),
        Commands::Guard {
            diff,
            no_rebuild,
            json,
        } => commands::guard::execute(&config, diff.as_deref(), !*no_rebuild, *json),
        Commands::Approve { id, readonly } => commands::lock::approve(&config, id, *readonly),
        Commands::Verify { id, json } => commands::lock::verify(&config, id.as_deref(), *json),
        Commands::Preflight { choice, json } => {
            commands::preflight::execute(&config, choice, *json)
        }
        Commands::NextId => commands::validate::next_id(&config),
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing(verbose: bool, json: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let mut filter = EnvFilter::from_default_env();
    for target in ["adr", "adr_core", "adr_policy", "adr_index", "adr_guard", "adr_lock"] {
        filter = filter.add_directive(format!("{}={}", target, level).parse()?);
    }
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}
