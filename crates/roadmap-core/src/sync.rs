//! Turns a task set into tracked issues.
//!
//! A sync run has four phases:
//! 1. order tasks so dependencies are created before their dependents;
//! 2. create each issue and place it on the project board;
//! 3. link `blockedBy` relationships once both ends exist;
//! 4. pick the next ready task and hand it to the coding agent.
//!
//! Only a failed issue creation counts as a task failure. Everything after it
//! (project fields, parent links, relationships, assignment) degrades to a
//! warning so one bad field id does not stop the run.

use crate::config::Config;
use crate::error::{Result, RoadmapError};
use crate::github::{IssueTracker, NewIssue};
use crate::labels::{plan_labels, LabelAction, LabelSpec};
use crate::paths;
use crate::planning::{find_research_file, find_spec_doc};
use crate::render;
use crate::schedule::topological_order;
use crate::select::{select_next, ReadyTask};
use crate::task::{Materialization, Task, TaskSet};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Assign the configured agent to the selected ready task.
    pub assign_agent: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self { assign_agent: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub key: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub planned: usize,
    pub created: usize,
    pub failures: Vec<SyncFailure>,
    pub warnings: Vec<String>,
    pub relationships: usize,
    /// Tasks left over by the sort because of cycles, in input order.
    pub unresolved: Vec<String>,
    pub materialized: Materialization,
    pub ready: Option<ReadyTask>,
    pub assigned: bool,
}

impl SyncReport {
    fn warn(&mut self, key: &str, what: &str, err: &RoadmapError) {
        warn!(key = %key, error = %err, "{what} failed");
        self.warnings.push(format!("{key}: {what}: {err}"));
    }
}

pub fn sync_issues(
    root: &Path,
    tasks: &TaskSet,
    tracker: &dyn IssueTracker,
    config: &Config,
    opts: &SyncOptions,
) -> SyncReport {
    let order = topological_order(tasks);
    let mut report = SyncReport {
        planned: tasks.len(),
        unresolved: order.unresolved.iter().map(|t| t.key.clone()).collect(),
        ..SyncReport::default()
    };
    if order.has_cycles() {
        warn!(tasks = ?report.unresolved, "dependency cycle detected; these tasks are created last");
    }
    let sorted = order.into_task_set();

    // Phase 2: issues
    for task in sorted.iter() {
        match create_task_issue(root, task, tracker, config, &mut report) {
            Ok(number) => {
                info!(key = %task.key, number, "created issue");
                report.created += 1;
            }
            Err(e) => {
                warn!(key = %task.key, error = %e, "issue creation failed");
                report.failures.push(SyncFailure {
                    key: task.key.clone(),
                    error: e.to_string(),
                });
            }
        }
        pace(config);
    }

    // Phase 3: relationships
    link_dependencies(&sorted, tracker, config, &mut report);

    // Phase 4: agent
    report.ready = select_next(&sorted, &report.materialized);
    match report.ready.clone() {
        Some(ready) if opts.assign_agent => {
            if let Some(task) = sorted.get(&ready.key) {
                match assign_agent(task, &ready, tracker, config) {
                    Ok(()) => {
                        info!(key = %ready.key, number = ready.issue_number, "agent assigned");
                        report.assigned = true;
                    }
                    Err(e) => report.warn(&ready.key, "agent assignment", &e),
                }
            }
        }
        Some(_) => {}
        None => info!("no ready task to assign"),
    }

    report
}

fn create_task_issue(
    root: &Path,
    task: &Task,
    tracker: &dyn IssueTracker,
    config: &Config,
    report: &mut SyncReport,
) -> Result<u64> {
    let spec_doc = find_spec_doc(&config.docs_dir(root), &task.key, &task.milestone)
        .map(|p| paths::relative_display(root, &p));
    let research = find_research_file(&config.issues_dir(root), &task.key)
        .map(|p| paths::relative_display(root, &p));
    let effort_map = paths::relative_display(root, &config.effort_map_path(root));
    let title = render::issue_title(task);
    let body = render::issue_body(
        task,
        &render::BodyRefs {
            spec_doc: spec_doc.as_deref(),
            research: research.as_deref(),
            effort_map: &effort_map,
        },
    );
    let labels = render::issue_labels(task);

    let number = tracker.create_issue(&NewIssue {
        title: &title,
        body: &body,
        labels: &labels,
        milestone: config.milestone_number(&task.milestone),
    })?;

    let node_id = match tracker.issue_node_id(number) {
        Ok(id) => id,
        Err(e) => {
            report.warn(&task.key, "node id lookup", &e);
            return Ok(number);
        }
    };

    if let Some(type_id) = &config.issue_types.feature {
        if let Err(e) = tracker.set_issue_type(&node_id, type_id) {
            report.warn(&task.key, "set issue type", &e);
        }
    }

    if let Some(project_id) = &config.project.id {
        place_on_project(task, project_id, &node_id, tracker, config, report);
    }

    report.materialized.record(task.key.as_str(), number, node_id.as_str());

    if let Some(parent) = config.parents.get(&task.key) {
        match report.materialized.node_id(parent).map(str::to_string) {
            Some(parent_node) => {
                if let Err(e) = tracker.add_sub_issue(&parent_node, &node_id) {
                    report.warn(&task.key, "parent link", &e);
                }
            }
            None => {
                warn!(key = %task.key, parent = %parent, "parent not created yet; skipping link");
                report
                    .warnings
                    .push(format!("{}: parent {parent} not created yet", task.key));
            }
        }
    }

    Ok(number)
}

fn place_on_project(
    task: &Task,
    project_id: &str,
    node_id: &str,
    tracker: &dyn IssueTracker,
    config: &Config,
    report: &mut SyncReport,
) {
    let item = match tracker.add_to_project(project_id, node_id) {
        Ok(item) => item,
        Err(e) => {
            report.warn(&task.key, "add to project", &e);
            return;
        }
    };
    let fields = &config.project.fields;

    if let (Some(field), Some(todo)) = (&fields.status, &config.project.status_todo) {
        if let Err(e) = tracker.set_single_select(&item, field, todo) {
            report.warn(&task.key, "set status", &e);
        }
    }

    if let (Some(field), Some(iteration)) = (&fields.iteration, config.iteration(&task.iteration)) {
        if let Err(e) = tracker.set_iteration(&item, field, &iteration.id) {
            report.warn(&task.key, "set iteration", &e);
        }
    }

    if let Some(field) = &fields.blocked_by {
        let (text, missing) = render::blocked_by_text(task, &report.materialized);
        if !text.is_empty() {
            if let Err(e) = tracker.set_text_field(&item, field, &text) {
                report.warn(&task.key, "set blocked-by", &e);
            }
        }
        if !missing.is_empty() {
            warn!(key = %task.key, missing = ?missing, "dependencies without an issue");
        }
    }
}

fn link_dependencies(
    tasks: &TaskSet,
    tracker: &dyn IssueTracker,
    config: &Config,
    report: &mut SyncReport,
) {
    for task in tasks.iter() {
        let Some(blocked) = report.materialized.node_id(&task.key).map(str::to_string) else {
            continue;
        };
        let mut seen = HashSet::new();
        for dep in &task.dependencies {
            if !seen.insert(dep.as_str()) {
                continue;
            }
            let Some(blocking) = report.materialized.node_id(dep).map(str::to_string) else {
                continue;
            };
            match tracker.add_blocked_by(&blocked, &blocking) {
                Ok(()) => report.relationships += 1,
                Err(e) => report.warn(&task.key, &format!("blocked-by {dep}"), &e),
            }
            pace(config);
        }
    }
}

fn assign_agent(
    task: &Task,
    ready: &ReadyTask,
    tracker: &dyn IssueTracker,
    config: &Config,
) -> Result<()> {
    let login = &config.agent.login;
    let actor = tracker
        .find_assignable_actor(login)?
        .ok_or_else(|| RoadmapError::AgentUnavailable(login.clone()))?;
    let instructions = render::clamp_instructions(
        &render::agent_instructions(task),
        config.agent.max_instruction_chars,
    );
    tracker.assign_agent(&ready.node_id, &actor, &config.agent.base_ref, &instructions)
}

fn pace(config: &Config) {
    if config.request_delay_ms > 0 {
        std::thread::sleep(Duration::from_millis(config.request_delay_ms));
    }
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct LabelReport {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failures: Vec<SyncFailure>,
}

/// Create missing labels, and refresh existing ones when `update` is set.
pub fn sync_labels(
    tracker: &dyn IssueTracker,
    wanted: &[LabelSpec],
    update: bool,
) -> Result<LabelReport> {
    let existing: HashSet<String> = tracker.list_labels()?.into_iter().collect();
    let mut report = LabelReport::default();

    for action in plan_labels(wanted, &existing, update) {
        let result = match &action {
            LabelAction::Create(spec) => tracker.create_label(spec).map(|_| report.created += 1),
            LabelAction::Update(spec) => tracker.update_label(spec).map(|_| report.updated += 1),
            LabelAction::Skip { .. } => {
                report.skipped += 1;
                Ok(())
            }
        };
        if let Err(e) = result {
            warn!(label = %action.name(), error = %e, "label sync failed");
            report.failures.push(SyncFailure {
                key: action.name().to_string(),
                error: e.to_string(),
            });
        }
    }
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IterationConfig;
    use crate::github::ProjectItem;
    use crate::types::{AiEffectiveness, Priority};
    use std::cell::{Cell, RefCell};
    use tempfile::TempDir;

    /// In-memory tracker that records every call.
    #[derive(Default)]
    struct FakeTracker {
        calls: RefCell<Vec<String>>,
        bodies: RefCell<Vec<String>>,
        created: Cell<u64>,
        fail_create: Vec<String>,
        fail_blocked_by: bool,
        actor: Option<String>,
        labels: Vec<String>,
    }

    impl FakeTracker {
        fn log(&self, call: String) {
            self.calls.borrow_mut().push(call);
        }

        fn calls_with(&self, prefix: &str) -> Vec<String> {
            self.calls
                .borrow()
                .iter()
                .filter(|c| c.starts_with(prefix))
                .cloned()
                .collect()
        }
    }

    fn boom() -> RoadmapError {
        RoadmapError::GhFailed {
            command: "api graphql".into(),
            stderr: "boom".into(),
        }
    }

    impl IssueTracker for FakeTracker {
        fn create_issue(&self, issue: &NewIssue<'_>) -> Result<u64> {
            if self
                .fail_create
                .iter()
                .any(|k| issue.title.starts_with(&format!("{k}:")))
            {
                return Err(boom());
            }
            let n = 100 + self.created.get();
            self.created.set(self.created.get() + 1);
            self.log(format!("create #{n} {} m={:?}", issue.title, issue.milestone));
            self.bodies.borrow_mut().push(issue.body.to_string());
            Ok(n)
        }
        fn issue_node_id(&self, number: u64) -> Result<String> {
            Ok(format!("I_{number}"))
        }
        fn add_to_project(&self, project_id: &str, issue_node_id: &str) -> Result<ProjectItem> {
            self.log(format!("project {issue_node_id}"));
            Ok(ProjectItem {
                project_id: project_id.to_string(),
                item_id: format!("PVTI_{issue_node_id}"),
            })
        }
        fn set_single_select(&self, item: &ProjectItem, field: &str, option: &str) -> Result<()> {
            self.log(format!("select {} {field}={option}", item.item_id));
            Ok(())
        }
        fn set_text_field(&self, item: &ProjectItem, field: &str, text: &str) -> Result<()> {
            self.log(format!("text {} {field}={text}", item.item_id));
            Ok(())
        }
        fn set_iteration(&self, item: &ProjectItem, field: &str, iteration: &str) -> Result<()> {
            self.log(format!("iteration {} {field}={iteration}", item.item_id));
            Ok(())
        }
        fn set_issue_type(&self, node: &str, type_id: &str) -> Result<()> {
            self.log(format!("type {node} {type_id}"));
            Ok(())
        }
        fn add_sub_issue(&self, parent: &str, child: &str) -> Result<()> {
            self.log(format!("sub {parent} <- {child}"));
            Ok(())
        }
        fn add_blocked_by(&self, blocked: &str, blocking: &str) -> Result<()> {
            if self.fail_blocked_by {
                return Err(boom());
            }
            self.log(format!("blocked {blocked} by {blocking}"));
            Ok(())
        }
        fn find_assignable_actor(&self, login: &str) -> Result<Option<String>> {
            self.log(format!("actor {login}"));
            Ok(self.actor.clone())
        }
        fn assign_agent(&self, node: &str, actor: &str, base: &str, text: &str) -> Result<()> {
            self.log(format!("assign {node} {actor} {base} {}", text.chars().count()));
            Ok(())
        }
        fn list_labels(&self) -> Result<Vec<String>> {
            Ok(self.labels.clone())
        }
        fn create_label(&self, label: &LabelSpec) -> Result<()> {
            if label.name == "broken" {
                return Err(boom());
            }
            self.log(format!("label+ {}", label.name));
            Ok(())
        }
        fn update_label(&self, label: &LabelSpec) -> Result<()> {
            self.log(format!("label~ {}", label.name));
            Ok(())
        }
    }

    fn config() -> Config {
        let mut cfg = Config::new("acme", "roadmap");
        cfg.request_delay_ms = 0;
        cfg.project.id = Some("PVT_1".into());
        cfg.project.fields.status = Some("F_STATUS".into());
        cfg.project.fields.blocked_by = Some("F_BLOCKED".into());
        cfg.project.fields.iteration = Some("F_ITER".into());
        cfg.project.status_todo = Some("OPT_TODO".into());
        cfg.issue_types.feature = Some("IT_FEATURE".into());
        cfg.milestones.insert("M0 - Setup".into(), 1);
        cfg.iterations.insert(
            "I1".into(),
            IterationConfig {
                id: "ITER_1".into(),
                name: None,
            },
        );
        cfg.agent.max_instruction_chars = 120;
        cfg
    }

    fn tasks() -> TaskSet {
        [
            Task::new("T3", "API").depends_on(&["T1", "T2"]).in_milestone("M1 - Backend"),
            Task::new("T2", "Schema").depends_on(&["T1"]).in_milestone("M0 - Setup"),
            Task::new("T1", "Infra")
                .in_milestone("M0 - Setup")
                .in_iteration("I1")
                .with_priority(Priority::Critical)
                .with_ai(AiEffectiveness::High),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn creates_in_dependency_order_and_links() {
        let dir = TempDir::new().unwrap();
        let tracker = FakeTracker {
            actor: Some("BOT_1".into()),
            ..FakeTracker::default()
        };
        let report = sync_issues(dir.path(), &tasks(), &tracker, &config(), &SyncOptions::default());

        assert_eq!(report.planned, 3);
        assert_eq!(report.created, 3);
        assert!(report.failures.is_empty());
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);

        let creates = tracker.calls_with("create");
        assert_eq!(
            creates,
            vec![
                "create #100 T1: Infra m=Some(1)",
                "create #101 T2: Schema m=Some(1)",
                "create #102 T3: API m=None",
            ]
        );

        assert_eq!(report.materialized.issue_number("T3"), Some(102));
        assert_eq!(report.materialized.node_id("T1"), Some("I_100"));

        // Blocked-by text uses issue numbers of already created dependencies.
        assert!(tracker
            .calls_with("text")
            .contains(&"text PVTI_I_102 F_BLOCKED=#100, #101".to_string()));
        assert_eq!(
            tracker.calls_with("iteration"),
            vec!["iteration PVTI_I_100 F_ITER=ITER_1"]
        );
        assert_eq!(tracker.calls_with("select").len(), 3);
        assert_eq!(tracker.calls_with("type").len(), 3);

        assert_eq!(report.relationships, 3);
        assert_eq!(
            tracker.calls_with("blocked"),
            vec![
                "blocked I_101 by I_100",
                "blocked I_102 by I_100",
                "blocked I_102 by I_101",
            ]
        );

        let ready = report.ready.as_ref().unwrap();
        assert_eq!(ready.key, "T1");
        assert_eq!(ready.issue_number, 100);
        assert!(report.assigned);
        assert_eq!(
            tracker.calls_with("assign"),
            vec!["assign I_100 BOT_1 main 120"]
        );
    }

    #[test]
    fn issue_bodies_point_at_planning_files() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("planning/issues")).unwrap();
        std::fs::write(dir.path().join("planning/issues/t1.yaml"), "issues: []\n").unwrap();

        let tracker = FakeTracker::default();
        let opts = SyncOptions {
            assign_agent: false,
        };
        sync_issues(dir.path(), &tasks(), &tracker, &config(), &opts);

        let bodies = tracker.bodies.borrow();
        assert_eq!(bodies.len(), 3);
        assert!(bodies[0].contains("- Research: `planning/issues/t1.yaml` (search for T1)\n"));
        assert!(bodies[0].contains("- Estimate: `planning/estimates/effort-map.yaml` (T1)\n"));
        assert!(!bodies[1].contains("- Research:"));
    }

    #[test]
    fn failed_create_is_counted_and_run_continues() {
        let dir = TempDir::new().unwrap();
        let tracker = FakeTracker {
            fail_create: vec!["T2".into()],
            ..FakeTracker::default()
        };
        let opts = SyncOptions {
            assign_agent: false,
        };
        let report = sync_issues(dir.path(), &tasks(), &tracker, &config(), &opts);

        assert_eq!(report.created, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].key, "T2");
        assert!(!report.materialized.is_materialized("T2"));
        // Only the T3 -> T1 edge has both ends.
        assert_eq!(report.relationships, 1);
        assert!(!report.assigned);
        assert!(tracker.calls_with("actor").is_empty());
    }

    #[test]
    fn relationship_failures_are_warnings() {
        let dir = TempDir::new().unwrap();
        let tracker = FakeTracker {
            fail_blocked_by: true,
            ..FakeTracker::default()
        };
        let report = sync_issues(
            dir.path(),
            &tasks(),
            &tracker,
            &config(),
            &SyncOptions {
                assign_agent: false,
            },
        );
        assert_eq!(report.created, 3);
        assert_eq!(report.relationships, 0);
        assert_eq!(report.warnings.len(), 3);
    }

    #[test]
    fn missing_agent_is_a_warning() {
        let dir = TempDir::new().unwrap();
        let tracker = FakeTracker::default();
        let report = sync_issues(dir.path(), &tasks(), &tracker, &config(), &SyncOptions::default());
        assert!(report.ready.is_some());
        assert!(!report.assigned);
        assert!(report.warnings.iter().any(|w| w.contains("copilot-swe-agent")));
    }

    #[test]
    fn parent_links_only_when_parent_exists() {
        let dir = TempDir::new().unwrap();
        let mut cfg = config();
        cfg.parents.insert("T2".into(), "T1".into());
        cfg.parents.insert("T1".into(), "T3".into());
        let tracker = FakeTracker::default();
        let report = sync_issues(
            dir.path(),
            &tasks(),
            &tracker,
            &cfg,
            &SyncOptions {
                assign_agent: false,
            },
        );
        assert_eq!(tracker.calls_with("sub"), vec!["sub I_100 <- I_101"]);
        assert!(report.warnings.iter().any(|w| w.contains("parent T3")));
    }

    #[test]
    fn cycles_are_reported_and_still_created() {
        let dir = TempDir::new().unwrap();
        let set: TaskSet = [
            Task::new("A", "a").depends_on(&["B"]),
            Task::new("B", "b").depends_on(&["A"]),
            Task::new("C", "c"),
        ]
        .into_iter()
        .collect();
        let tracker = FakeTracker::default();
        let report = sync_issues(
            dir.path(),
            &set,
            &tracker,
            &config(),
            &SyncOptions {
                assign_agent: false,
            },
        );
        assert_eq!(report.unresolved, vec!["A", "B"]);
        assert_eq!(report.created, 3);
        assert_eq!(tracker.calls_with("create")[0], "create #100 C: c m=None");
        assert_eq!(report.ready.unwrap().key, "C");
    }

    #[test]
    fn labels_create_update_and_record_failures() {
        let tracker = FakeTracker {
            labels: vec!["Task".into()],
            ..FakeTracker::default()
        };
        let wanted = vec![
            LabelSpec::for_name("Task"),
            LabelSpec::for_name("Bug"),
            LabelSpec::for_name("broken"),
        ];

        let report = sync_labels(&tracker, &wanted, false).unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].key, "broken");

        let report = sync_labels(&tracker, &wanted, true).unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(tracker.calls_with("label~"), vec!["label~ Task"]);
    }
}
