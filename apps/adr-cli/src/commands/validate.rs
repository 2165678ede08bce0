// validate.rs — `adr validate` and `adr next-id`.

use adr_core::{validate_decision, AdrConfig, DecisionStore, IssueLevel};

pub fn execute(config: &AdrConfig, id: Option<&str>) -> anyhow::Result<()> {
    let store = DecisionStore::new(&config.adr_dir);
    let snapshot = store.load_all()?;

    let mut errors = 0usize;
    let mut warnings = 0usize;

    if id.is_none() {
        for failure in &snapshot.failures {
            println!("{}: error: {}", failure.path.display(), failure.reason);
            errors += 1;
        }
    }

    let decisions: Vec<_> = snapshot
        .decisions
        .iter()
        .filter(|d| id.map_or(true, |id| d.id() == id))
        .collect();
    if let Some(id) = id {
        if decisions.is_empty() {
            anyhow::bail!("Decision {} not found in {}", id, config.adr_dir.display());
        }
    }

    for decision in &decisions {
        for issue in validate_decision(decision) {
            match issue.level {
                IssueLevel::Error => errors += 1,
                IssueLevel::Warning => warnings += 1,
            }
            println!(
                "{}: {}: {} [{}]",
                decision.id(),
                issue.level,
                issue.message,
                issue.rule
            );
        }
    }

    println!(
        "Checked {} decision(s): {} error(s), {} warning(s).",
        decisions.len(),
        errors,
        warnings
    );
    if errors > 0 {
        anyhow::bail!("Validation failed");
    }
    Ok(())
}

pub fn next_id(config: &AdrConfig) -> anyhow::Result<()> {
    let store = DecisionStore::new(&config.adr_dir);
    println!("{}", store.next_id(&config.id_prefix)?);
    Ok(())
}
