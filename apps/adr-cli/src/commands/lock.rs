// lock.rs — `adr approve` and `adr verify`.

use adr_core::{validate_decision, AdrConfig, DecisionStatus, DecisionStore, IssueLevel};
use adr_lock::{Approval, ImmutabilityManager, LockStore, VerifyStatus};
use anyhow::Context;

fn manager(config: &AdrConfig) -> ImmutabilityManager {
    ImmutabilityManager::new(LockStore::new(&config.lock_file))
}

/// Mark a decision accepted (saving it if its status changes) and lock it.
fn approve_decision(config: &AdrConfig, id: &str, readonly: bool) -> anyhow::Result<Approval> {
    let store = DecisionStore::new(&config.adr_dir);
    let mut decision = store.find_by_id(id)?;
    let path = decision
        .path
        .clone()
        .with_context(|| format!("decision {} has no file", id))?;

    match decision.status() {
        DecisionStatus::Accepted => {}
        DecisionStatus::Proposed => {
            let errors: Vec<String> = validate_decision(&decision)
                .into_iter()
                .filter(|i| i.level == IssueLevel::Error)
                .map(|i| i.message)
                .collect();
            if !errors.is_empty() {
                anyhow::bail!("Cannot approve {}: {}", id, errors.join("; "));
            }
            decision.front_matter.status = DecisionStatus::Accepted;
            store.save(&decision, &path)?;
            tracing::info!(id = %id, "decision accepted");
        }
        status => anyhow::bail!("Cannot approve {}: status is {}", id, status),
    }

    Ok(manager(config).approve(&decision, readonly)?)
}

pub fn approve(config: &AdrConfig, id: &str, readonly: bool) -> anyhow::Result<()> {
    let approval = approve_decision(config, id, readonly)?;
    println!("Approved {}", approval.lock.decision_id);
    println!("  digest:    {}", approval.lock.digest);
    println!(
        "  locked at: {}",
        approval.lock.locked_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if approval.lock.is_readonly {
        println!("  file marked read-only");
    }
    if let Some(err) = &approval.readonly_error {
        println!("  warning: could not mark file read-only: {}", err);
    }
    Ok(())
}

pub fn verify(config: &AdrConfig, id: Option<&str>, json: bool) -> anyhow::Result<()> {
    let store = DecisionStore::new(&config.adr_dir);
    let manager = manager(config);

    let results = match id {
        Some(id) => vec![manager.verify(&store.find_by_id(id)?)?],
        None => {
            let snapshot = store.load_all()?;
            manager.verify_all(&snapshot.decisions, &snapshot.failures)?
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for v in &results {
            println!("{:<12} {}", v.decision_id, v.status);
            if v.status == VerifyStatus::Tampered {
                println!(
                    "  expected {}",
                    v.expected_digest.as_deref().unwrap_or("-")
                );
                println!("  actual   {}", v.actual_digest.as_deref().unwrap_or("-"));
            }
            if let Some(anomaly) = &v.anomaly {
                println!("  warning: {}", anomaly);
            }
        }
    }

    let tampered = results.iter().filter(|v| v.tampered).count();
    if tampered > 0 {
        anyhow::bail!("{} decision(s) modified after approval", tampered);
    }
    Ok(())
}
