use super::{load_tasks, FilterArgs};
use crate::output::{ellipsize, print_json, print_table};
use std::path::Path;

pub fn run(root: &Path, filter: &FilterArgs, json: bool) -> anyhow::Result<()> {
    let (_, tasks) = load_tasks(root, filter)?;

    if json {
        print_json(&tasks.as_slice())?;
        return Ok(());
    }

    if tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }

    let rows = tasks
        .iter()
        .map(|t| {
            vec![
                t.key.clone(),
                ellipsize(&t.title, 40),
                t.milestone.clone(),
                t.priority.to_string(),
                t.ai_effectiveness.to_string(),
                t.effort.to_string(),
                t.dependencies.join(","),
            ]
        })
        .collect();
    print_table(
        &["KEY", "TITLE", "MILESTONE", "PRIORITY", "AI", "EFFORT", "DEPENDS ON"],
        rows,
    );
    Ok(())
}
