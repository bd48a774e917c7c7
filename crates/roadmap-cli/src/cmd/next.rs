use super::{load_tasks, FilterArgs};
use crate::output::print_json;
use anyhow::Context;
use roadmap_core::schedule::sort_tasks;
use roadmap_core::select::select_next;
use roadmap_core::task::Materialization;
use std::path::Path;

pub fn run(root: &Path, issues: &Path, filter: &FilterArgs, json: bool) -> anyhow::Result<()> {
    let (_, tasks) = load_tasks(root, filter)?;
    let materialized: Materialization = roadmap_core::io::read_yaml(issues)
        .with_context(|| format!("failed to read issue map '{}'", issues.display()))?;

    // Same order a sync run would create them in.
    let ready = select_next(&sort_tasks(&tasks), &materialized);

    match ready {
        None => {
            if json {
                print_json(&serde_json::Value::Null)?;
            } else {
                println!("No ready task. Every created task has open dependencies.");
            }
        }
        Some(r) => {
            if json {
                print_json(&r)?;
            } else {
                let title = tasks.get(&r.key).map(|t| t.title.as_str()).unwrap_or_default();
                println!("Next: {} #{}  {}", r.key, r.issue_number, title);
                println!("  node: {}", r.node_id);
            }
        }
    }
    Ok(())
}
