// guard.rs — `adr guard`: check a diff against accepted decisions.

use std::io::Read;
use std::path::Path;

use adr_core::AdrConfig;
use adr_guard::{GuardReport, GuardSystem};
use anyhow::Context;

pub fn execute(
    config: &AdrConfig,
    diff_path: Option<&Path>,
    rebuild_index: bool,
    json: bool,
) -> anyhow::Result<()> {
    let bytes = match diff_path {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("reading diff {}", path.display()))?
        }
        None => {
            let mut bytes = Vec::new();
            std::io::stdin()
                .read_to_end(&mut bytes)
                .context("reading diff from stdin")?;
            bytes
        }
    };
    let diff = decode_diff(&bytes);

    let guard = GuardSystem::new(config.clone());
    let report = guard.analyze(&diff, rebuild_index)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.has_errors {
        anyhow::bail!("{}", report.summary);
    }
    Ok(())
}

/// Invalid UTF-8 (e.g. a Latin-1 source file) becomes U+FFFD so only the
/// affected lines lose fidelity.
fn decode_diff(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if let std::borrow::Cow::Owned(_) = text {
        tracing::warn!("diff is not valid UTF-8; invalid bytes were replaced");
    }
    text.into_owned()
}

fn print_report(report: &GuardReport) {
    for v in &report.violations {
        let location = match v.line {
            Some(line) => format!("{}:{}", v.file, line),
            None => v.file.clone(),
        };
        println!("{}: {} [{}] {}", location, v.severity, v.kind, v.message);
        if let Some(context) = &v.context {
            println!("    {}", context);
        }
        println!("    fix: {}", v.suggested_fix);
        println!("    see: {} — {}", v.decision_id, v.decision_title);
    }
    for notice in &report.notices {
        match &notice.file {
            Some(file) => println!("notice: {}: {}", file, notice.message),
            None => println!("notice: {}", notice.message),
        }
    }
    if !report.relevant_decisions.is_empty() {
        let ids: Vec<&str> = report
            .relevant_decisions
            .iter()
            .map(|d| d.decision_id.as_str())
            .collect();
        println!("Checked against: {}", ids.join(", "));
    }
    println!("{}", report.summary);
}
