// policy.rs — Policy subcommands: show, check, suggest.

use adr_core::{AdrConfig, DecisionStore, SectionKind};
use adr_policy::{describe_imports, suggest_policy, PolicyExtractor, Provenance};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum PolicyCommands {
    /// Show the merged policy of one decision.
    Show {
        /// Decision ID.
        id: String,
        /// Print the full extraction as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Report accepted decisions whose policy is missing or doubtful.
    Check,
    /// Suggest a policy block from a decision's prose.
    Suggest {
        /// Decision ID (defaults to every decision without a policy).
        id: Option<String>,
    },
}

pub fn execute(cmd: &PolicyCommands, config: &AdrConfig) -> anyhow::Result<()> {
    let store = DecisionStore::new(&config.adr_dir);
    let extractor = PolicyExtractor::new();

    match cmd {
        PolicyCommands::Show { id, json } => {
            let decision = store.find_by_id(id)?;
            let extraction = extractor.extract_detailed(&decision);
            if *json {
                println!("{}", serde_json::to_string_pretty(&extraction)?);
                return Ok(());
            }

            println!("{} — {} [{}]", decision.id(), decision.title(), decision.status());
            println!("Imports: {}", describe_imports(&extraction.model));
            for rule in &extraction.rules {
                let source = match rule.provenance {
                    Provenance::Structured => "policy block",
                    Provenance::Pattern => "prose",
                };
                let scope = rule.language.as_deref().unwrap_or("all languages");
                println!(
                    "  {:<10} {:<28} {:<14} {}",
                    format!("{:?}", rule.disposition).to_lowercase(),
                    rule.symbol,
                    source,
                    scope
                );
            }
            for layer in &extraction.model.boundaries.layers {
                println!("Layer {:<16} {}", layer.name, layer.path);
            }
            for rule in &extraction.model.boundaries.rules {
                println!("Forbid {}", rule.forbid);
            }
            for rationale in &extraction.model.rationales {
                println!("Rationale: {}", rationale);
            }
        }

        PolicyCommands::Check => {
            let snapshot = store.load_all()?;
            let mut count = 0usize;
            for decision in snapshot.decisions.iter().filter(|d| d.is_accepted()) {
                for warning in extractor.validate_completeness(decision) {
                    println!("{}: {}: {}", warning.decision_id, warning.kind, warning.message);
                    count += 1;
                }
            }
            if count == 0 {
                println!("All accepted decisions carry an enforceable policy.");
            } else {
                println!("{} policy warning(s).", count);
            }
        }

        PolicyCommands::Suggest { id } => {
            let decisions = match id {
                Some(id) => vec![store.find_by_id(id)?],
                None => store
                    .load_all()?
                    .decisions
                    .into_iter()
                    .filter(|d| !extractor.has_extractable_policy(d))
                    .collect(),
            };

            let mut suggested = 0usize;
            for decision in &decisions {
                let decision_text = decision.section_text(SectionKind::Decision).unwrap_or_default();
                let alternatives = decision
                    .section_text(SectionKind::Alternatives)
                    .unwrap_or_default();
                let Some(model) = suggest_policy(&decision_text, &alternatives) else {
                    continue;
                };
                suggested += 1;
                println!("# {} — {}", decision.id(), decision.title());
                println!("policy:");
                for line in serde_yaml::to_string(&model)?.lines() {
                    println!("  {}", line);
                }
                println!();
            }
            if suggested == 0 {
                println!("No policy could be suggested.");
            }
        }
    }

    Ok(())
}
