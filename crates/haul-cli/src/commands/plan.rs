use std::path::Path;

use tracing::warn;

use haul_chunk::chunk;
use haul_core::Workflow;

pub fn run(workflow_path: &str, chunks: usize, format: &str) -> anyhow::Result<()> {
    let mut workflow = load_workflow(Path::new(workflow_path))?;

    for block in workflow.check_linkage() {
        warn!(block = %block, "linked parent blocks missing from the snapshot");
    }
    let pruned = workflow.prune_parent_blocks();
    if pruned > 0 {
        warn!(pruned, "dropped parent blocks with no locations");
    }

    let plan = chunk(&workflow, chunks);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        _ => {
            println!(
                "{} chunk(s) for {} ({} primary blocks, {} bytes)",
                plan.len(),
                workflow.primary_dataset,
                workflow.primary_blocks.len(),
                workflow.primary_size(),
            );
            for (index, piece) in plan.iter().enumerate() {
                println!(
                    "chunk {index}: {} bytes across {} blocks",
                    piece.bytes,
                    piece.blocks.len()
                );
                for block in &piece.blocks {
                    println!("  {block}");
                }
            }
        }
    }

    Ok(())
}

fn load_workflow(path: &Path) -> anyhow::Result<Workflow> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn snapshot_json() -> String {
        serde_json::json!({
            "primary_dataset": "/Cosmics/Run2024A-v1/RAW",
            "parent_dataset": null,
            "secondary_datasets": [],
            "primary_blocks": {
                "/Cosmics/Run2024A-v1/RAW#b1": { "bytes": 100, "locations": ["T1_US_FNAL_Disk"] },
                "/Cosmics/Run2024A-v1/RAW#b2": { "bytes": 60, "locations": ["T1_US_FNAL_Disk"] }
            },
            "parent_blocks": {},
            "child_to_parent": {},
            "secondary_summaries": {}
        })
        .to_string()
    }

    #[test]
    fn test_load_workflow_from_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workflow.json");
        fs::write(&path, snapshot_json()).unwrap();

        let workflow = load_workflow(&path).unwrap();
        assert_eq!(workflow.primary_blocks.len(), 2);
        assert_eq!(workflow.primary_size(), 160);
    }

    #[test]
    fn test_run_accepts_both_formats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workflow.json");
        fs::write(&path, snapshot_json()).unwrap();

        run(path.to_str().unwrap(), 2, "text").unwrap();
        run(path.to_str().unwrap(), 2, "json").unwrap();
    }

    #[test]
    fn test_run_missing_file_fails() {
        assert!(run("/nonexistent/workflow.json", 1, "text").is_err());
    }
}
