use super::{load_tasks, FilterArgs};
use crate::output::{ellipsize, print_json, print_table};
use roadmap_core::schedule::topological_order;
use std::path::Path;

pub fn run(root: &Path, filter: &FilterArgs, json: bool) -> anyhow::Result<()> {
    let (_, tasks) = load_tasks(root, filter)?;
    let order = topological_order(&tasks);

    if json {
        print_json(&serde_json::json!({
            "order": order.ordered.iter().chain(&order.unresolved).map(|t| &t.key).collect::<Vec<_>>(),
            "unresolved": order.unresolved.iter().map(|t| &t.key).collect::<Vec<_>>(),
        }))?;
        return Ok(());
    }

    if tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }

    let rows = order
        .ordered
        .iter()
        .map(|t| (t, ""))
        .chain(order.unresolved.iter().map(|t| (t, "cycle")))
        .enumerate()
        .map(|(i, (t, note))| {
            vec![
                (i + 1).to_string(),
                t.key.clone(),
                ellipsize(&t.title, 40),
                t.dependencies.join(","),
                note.to_string(),
            ]
        })
        .collect();
    print_table(&["#", "KEY", "TITLE", "DEPENDS ON", "NOTE"], rows);

    if order.has_cycles() {
        println!(
            "\n{} task(s) are in or behind a dependency cycle and are listed last.",
            order.unresolved.len()
        );
    }
    Ok(())
}
