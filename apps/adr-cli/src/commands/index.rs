// index.rs — Index subcommands: build, search.

use std::sync::Arc;

use adr_core::{AdrConfig, DecisionStatus, DecisionStore};
use adr_index::{HashingEmbedder, SemanticIndex};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum IndexCommands {
    /// Build or update the index from the decision directory.
    Build {
        /// Re-embed every decision even if unchanged.
        #[arg(long)]
        force: bool,
    },
    /// Search decisions by meaning.
    Search {
        /// Free-text query.
        query: String,
        /// Number of decisions to return (defaults to the configured k).
        #[arg(short)]
        k: Option<usize>,
        /// Only return decisions with one of these statuses (repeatable).
        #[arg(long = "status")]
        statuses: Vec<DecisionStatus>,
        /// Print matches as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn open_index(config: &AdrConfig) -> SemanticIndex {
    let embedder = Arc::new(HashingEmbedder::new(config.index.dimensions));
    SemanticIndex::open(&config.index_dir, embedder, config.index.chunk_threshold)
}

pub fn execute(cmd: &IndexCommands, config: &AdrConfig) -> anyhow::Result<()> {
    match cmd {
        IndexCommands::Build { force } => {
            let snapshot = DecisionStore::new(&config.adr_dir).load_all()?;
            for failure in &snapshot.failures {
                println!("skipped {}: {}", failure.path.display(), failure.reason);
            }

            let mut index = open_index(config);
            let stats = index.build(&snapshot.decisions, *force)?;
            println!(
                "Indexed {} decision(s), {} chunk(s): {} embedded, {} reused, {} skipped, {} removed.",
                stats.total_decisions,
                stats.total_chunks,
                stats.reembedded,
                stats.reused,
                stats.skipped,
                stats.removed
            );
            for failure in &stats.failures {
                println!("  not indexed {}: {}", failure.decision_id, failure.reason);
            }
        }

        IndexCommands::Search {
            query,
            k,
            statuses,
            json,
        } => {
            let index = open_index(config);
            if index.is_empty() {
                println!("Index is empty. Run `adr index build` first.");
                return Ok(());
            }
            let filter = (!statuses.is_empty()).then_some(statuses.as_slice());
            let matches = index.search(query, k.unwrap_or(config.index.search_k), filter)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&matches)?);
                return Ok(());
            }
            if matches.is_empty() {
                println!("No matching decisions.");
                return Ok(());
            }

            println!("{:<12} {:<7} {:<11} TITLE", "ID", "SCORE", "STATUS");
            println!("{}", "-".repeat(72));
            for m in &matches {
                println!(
                    "{:<12} {:<7.3} {:<11} {}",
                    m.decision_id,
                    m.score,
                    m.status.to_string(),
                    m.title
                );
                if let Some(best) = m.best_chunks.first() {
                    let snippet: String = best.text.chars().take(100).collect();
                    println!("             {}", snippet.replace('\n', " "));
                }
            }
        }
    }

    Ok(())
}
