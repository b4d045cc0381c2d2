use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use haul_catalog::{RuleDisposition, RulePolicy, RuleRecord, evaluate_rule, usable_rses};

pub fn run(
    target: &str,
    rules_path: &str,
    stuck_limit_days: u64,
    format: &str,
) -> anyhow::Result<()> {
    let rules = load_rules(Path::new(rules_path))?;
    let policy = RulePolicy { stuck_limit_days };
    let now = epoch_secs();

    let usable = usable_rses(target, Some(&rules), now, &policy).unwrap_or_default();

    match format {
        "json" => {
            let entries: Vec<serde_json::Value> = rules
                .iter()
                .map(|rule| {
                    serde_json::json!({
                        "id": rule.id,
                        "state": rule.state,
                        "rse_expression": rule.rse_expression,
                        "disposition": disposition_label(evaluate_rule(rule, now, &policy)),
                    })
                })
                .collect();
            let report = serde_json::json!({
                "target": target,
                "usable_destinations": usable,
                "rules": entries,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            println!("{} rule(s) guarding {target}", rules.len());
            for rule in &rules {
                let disposition = evaluate_rule(rule, now, &policy);
                println!(
                    "  {} [{:?}] {} -> {}",
                    rule.id,
                    rule.state,
                    rule.rse_expression,
                    disposition_label(disposition)
                );
            }
            if usable.is_empty() {
                println!("no usable destinations");
            } else {
                println!("usable destinations: {}", usable.join(", "));
            }
        }
    }

    Ok(())
}

fn load_rules(path: &Path) -> anyhow::Result<Vec<RuleRecord>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn disposition_label(disposition: RuleDisposition) -> &'static str {
    match disposition {
        RuleDisposition::Usable => "usable",
        RuleDisposition::Recreatable => "recreatable",
        RuleDisposition::PermanentlyFailed => "permanently-failed",
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
