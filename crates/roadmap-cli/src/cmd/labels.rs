use crate::output::print_json;
use anyhow::Context;
use roadmap_core::config::Config;
use roadmap_core::github::GhCli;
use roadmap_core::labels::{load_labels, plan_labels, LabelAction};
use roadmap_core::sync::sync_labels;
use std::collections::HashSet;
use std::path::Path;

pub fn run(root: &Path, dry_run: bool, update: bool, json: bool) -> anyhow::Result<()> {
    // A dry run only needs the catalogue, so an uninitialized project is fine.
    let config = if dry_run {
        Config::load_or_default(root)
    } else {
        Config::load(root)
    }
    .context("failed to load config")?;
    let labels_path = config.labels_path(root);
    let wanted = load_labels(&labels_path)
        .with_context(|| format!("failed to load labels from '{}'", labels_path.display()))?;

    if dry_run {
        // Nothing is fetched from GitHub, so every label is planned as new.
        let plan = plan_labels(&wanted, &HashSet::new(), update);
        if json {
            print_json(&serde_json::json!({ "dry_run": true, "actions": plan }))?;
        } else {
            println!("Dry run: {} label(s) in catalogue\n", wanted.len());
            for action in &plan {
                if let LabelAction::Create(spec) = action {
                    println!("  Would create: {} (#{})", spec.name, spec.color);
                }
            }
        }
        return Ok(());
    }

    let tracker = GhCli::new(&config).context("cannot reach GitHub")?;
    let report = sync_labels(&tracker, &wanted, update).context("label sync failed")?;

    if json {
        print_json(&report)?;
    } else {
        println!("Created: {}", report.created);
        if update {
            println!("Updated: {}", report.updated);
        }
        println!("Skipped: {}", report.skipped);
        println!("Total:   {}", wanted.len());
        for f in &report.failures {
            println!("  [failed] {}: {}", f.key, f.error);
        }
    }

    if !report.failures.is_empty() {
        anyhow::bail!("{} label(s) failed", report.failures.len());
    }
    Ok(())
}
