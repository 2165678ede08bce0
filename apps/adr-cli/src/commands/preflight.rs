// preflight.rs — `adr preflight`: is a technology choice allowed?

use adr_core::{AdrConfig, DecisionStore};
use adr_policy::{preflight, PolicyExtractor, PreflightVerdict};

pub fn execute(config: &AdrConfig, choice: &str, json: bool) -> anyhow::Result<()> {
    let snapshot = DecisionStore::new(&config.adr_dir).load_all()?;
    let outcome = preflight(choice, &snapshot.decisions, &PolicyExtractor::new())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}: {}", outcome.choice, outcome.verdict);
        println!("{}", outcome.reasoning);
        for d in &outcome.conflicting {
            println!("  conflicts with {} — {}", d.id, d.title);
        }
        for d in &outcome.supporting {
            println!("  supported by   {} — {}", d.id, d.title);
        }
        for d in &outcome.related {
            println!("  related        {} — {}", d.id, d.title);
        }
        if !outcome.alternatives.is_empty() {
            println!("  alternatives:  {}", outcome.alternatives.join(", "));
        }
    }

    if outcome.verdict == PreflightVerdict::Blocked {
        anyhow::bail!("{} is blocked by an accepted decision", outcome.choice);
    }
    Ok(())
}
