use super::{load_tasks, FilterArgs};
use crate::output::print_json;
use anyhow::Context;
use roadmap_core::config::Config;
use roadmap_core::github::GhCli;
use roadmap_core::render::{issue_labels, issue_title};
use roadmap_core::schedule::topological_order;
use roadmap_core::sync::{sync_issues, SyncOptions, SyncReport};
use roadmap_core::task::TaskSet;
use std::io::{BufRead, Write};
use std::path::Path;

/// Above this many issues a run asks before touching GitHub.
const CONFIRM_THRESHOLD: usize = 5;

pub struct SyncFlags {
    pub dry_run: bool,
    pub yes: bool,
    pub assign: bool,
}

pub fn run(root: &Path, filter: &FilterArgs, flags: SyncFlags, json: bool) -> anyhow::Result<()> {
    let (_, tasks) = load_tasks(root, filter)?;

    if flags.dry_run {
        return dry_run(&tasks, json);
    }

    let config = Config::load(root).context("failed to load config")?;
    if tasks.is_empty() {
        println!("No tasks to sync.");
        return Ok(());
    }

    if tasks.len() > CONFIRM_THRESHOLD && !flags.yes && !confirm(tasks.len())? {
        println!("Cancelled.");
        return Ok(());
    }

    let tracker = GhCli::new(&config).context("cannot reach GitHub")?;
    let report = sync_issues(
        root,
        &tasks,
        &tracker,
        &config,
        &SyncOptions {
            assign_agent: flags.assign,
        },
    );

    if json {
        print_json(&report)?;
    } else {
        print_report(&report, &config);
    }

    if !report.failures.is_empty() {
        anyhow::bail!(
            "{} of {} issue(s) could not be created",
            report.failures.len(),
            report.planned
        );
    }
    Ok(())
}

fn dry_run(tasks: &TaskSet, json: bool) -> anyhow::Result<()> {
    let order = topological_order(tasks);

    if json {
        let plan: Vec<_> = order
            .ordered
            .iter()
            .chain(&order.unresolved)
            .map(|t| {
                serde_json::json!({
                    "key": t.key,
                    "title": issue_title(t),
                    "milestone": t.milestone,
                    "ai_effectiveness": t.ai_effectiveness,
                    "labels": issue_labels(t),
                })
            })
            .collect();
        print_json(&serde_json::json!({
            "dry_run": true,
            "plan": plan,
            "unresolved": order.unresolved.iter().map(|t| &t.key).collect::<Vec<_>>(),
        }))?;
        return Ok(());
    }

    println!("Dry run: would create {} issue(s):\n", tasks.len());
    for t in order.ordered.iter().chain(&order.unresolved) {
        println!("  • {}: {} ({}, {})", t.key, t.title, t.milestone, t.ai_effectiveness);
    }
    if order.has_cycles() {
        println!(
            "\nwarning: {} task(s) are in or behind a dependency cycle",
            order.unresolved.len()
        );
    }
    Ok(())
}

fn confirm(count: usize) -> anyhow::Result<bool> {
    print!("Create {count} GitHub issue(s)? (y/n): ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("failed to read confirmation")?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

fn print_report(report: &SyncReport, config: &Config) {
    println!(
        "\nCreated {}/{} issue(s), {} blocking relationship(s).",
        report.created, report.planned, report.relationships
    );
    for f in &report.failures {
        println!("  [failed]  {}: {}", f.key, f.error);
    }
    for w in &report.warnings {
        println!("  [warning] {w}");
    }
    if !report.unresolved.is_empty() {
        println!("  [warning] dependency cycle: {}", report.unresolved.join(", "));
    }

    match &report.ready {
        Some(r) if report.assigned => {
            println!("\nAssigned {} to #{} ({}).", config.agent.login, r.issue_number, r.key)
        }
        Some(r) => println!("\nNext ready task: #{} ({}).", r.issue_number, r.key),
        None => println!("\nNo ready task found."),
    }
    println!(
        "View issues: https://github.com/{}/{}/issues",
        config.repo.owner, config.repo.name
    );
}
