//! Loads tasks from the planning tree.
//!
//! Two sources are merged:
//! - the effort map (`estimates:` keyed by task key) carries priority, effort,
//!   phase labels and the estimator's reasoning;
//! - issue files (`issues:` lists in every `*.yaml` of the issues directory)
//!   carry dependencies and acceptance criteria.

use crate::config::Config;
use crate::error::{Result, RoadmapError};
use crate::paths;
use crate::task::{AgentNotes, Task, TaskSet, DEFAULT_EFFORT};
use crate::types::{AiEffectiveness, Priority};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// File shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct EffortMapFile {
    #[serde(default)]
    estimates: serde_yaml::Mapping,
}

#[derive(Debug, Default, Deserialize)]
struct EstimateEntry {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    milestone: String,
    #[serde(default)]
    iteration: String,
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    effort: Option<f64>,
    #[serde(default)]
    estimated_days: Option<f64>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    ai_effectiveness: Option<AiEffectiveness>,
    #[serde(default, alias = "dependsOn")]
    dependencies: Vec<String>,
    #[serde(default)]
    agent_notes: Option<AgentNotes>,
}

#[derive(Debug, Default, Deserialize)]
struct IssueFile {
    #[serde(default)]
    issues: Vec<IssueRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct IssueRecord {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    milestone: String,
    #[serde(default, rename = "dependsOn", alias = "dependencies")]
    depends_on: Vec<String>,
    #[serde(default)]
    acceptance_criteria: Vec<String>,
    #[serde(default)]
    priority: Option<Priority>,
}

// ---------------------------------------------------------------------------
// AI effectiveness extraction
// ---------------------------------------------------------------------------

static AI_LABELLED_RE: OnceLock<Regex> = OnceLock::new();
static AI_SUFFIX_RE: OnceLock<Regex> = OnceLock::new();

fn ai_labelled_re() -> &'static Regex {
    AI_LABELLED_RE.get_or_init(|| {
        Regex::new(r"(?i)\bAI\s+(?:impact|effectiveness)\s*:\s*(high|medium|low)\b").unwrap()
    })
}

fn ai_suffix_re() -> &'static Regex {
    AI_SUFFIX_RE
        .get_or_init(|| Regex::new(r"(?i)\b(high|medium|low)\s+AI\s+effectiveness\b").unwrap())
}

/// Pull the AI effectiveness rating out of an estimator's free-text reasoning
/// (`AI Impact: HIGH`, `AI effectiveness: low`, `MEDIUM AI effectiveness`).
pub fn extract_ai_effectiveness(reasoning: &str) -> AiEffectiveness {
    ai_labelled_re()
        .captures(reasoning)
        .or_else(|| ai_suffix_re().captures(reasoning))
        .and_then(|c| c.get(1))
        .map(|m| AiEffectiveness::parse(m.as_str()))
        .unwrap_or(AiEffectiveness::Unknown)
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load and merge all planned tasks, effort-map order first, then tasks that
/// only appear in issue files.
pub fn load_tasks(root: &Path, config: &Config) -> Result<TaskSet> {
    let effort_map = config.effort_map_path(root);
    if !effort_map.exists() {
        return Err(RoadmapError::PlanningNotFound(
            paths::relative_display(root, &effort_map),
        ));
    }
    let estimates: EffortMapFile = crate::io::read_yaml(&effort_map)?;
    let issues = load_issue_records(&config.issues_dir(root))?;
    merge(estimates, issues)
}

/// Read every `*.yaml` in `dir` in file-name order. A missing directory yields
/// no records.
fn load_issue_records(dir: &Path) -> Result<Vec<IssueRecord>> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "no issues directory");
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "yaml"))
        .collect();
    files.sort();

    let mut records = Vec::new();
    for file in files {
        let parsed: IssueFile = crate::io::read_yaml(&file)?;
        debug!(file = %file.display(), issues = parsed.issues.len(), "loaded issue file");
        records.extend(parsed.issues);
    }
    Ok(records)
}

fn merge(estimates: EffortMapFile, records: Vec<IssueRecord>) -> Result<TaskSet> {
    // Later files override earlier ones for the same key.
    let mut by_key: HashMap<String, IssueRecord> = HashMap::new();
    let mut record_order: Vec<String> = Vec::new();
    for record in records {
        let Some(key) = record.key.clone() else {
            continue;
        };
        if by_key.insert(key.clone(), record).is_some() {
            warn!(key = %key, "task defined in more than one issue file; last one wins");
        } else {
            record_order.push(key);
        }
    }

    let mut tasks = TaskSet::new();
    for (raw_key, value) in estimates.estimates {
        let key = match raw_key {
            serde_yaml::Value::String(s) => s,
            other => serde_yaml::to_string(&other)?.trim().to_string(),
        };
        let entry: EstimateEntry = serde_yaml::from_value(value)?;
        let task = task_from_estimate(key, entry, &mut by_key);
        tasks.insert(task);
    }

    for key in record_order {
        if tasks.contains(&key) {
            continue;
        }
        if let Some(record) = by_key.remove(&key) {
            tasks.insert(task_from_record(key, record));
        }
    }

    Ok(tasks)
}

fn task_from_estimate(
    key: String,
    entry: EstimateEntry,
    records: &mut HashMap<String, IssueRecord>,
) -> Task {
    let reasoning_ai = entry
        .reasoning
        .as_deref()
        .map(extract_ai_effectiveness)
        .unwrap_or_default();
    let ai_effectiveness = match entry.ai_effectiveness {
        Some(explicit) if explicit != AiEffectiveness::Unknown => explicit,
        _ => reasoning_ai,
    };

    let mut task = Task {
        key: key.clone(),
        title: entry.title,
        description: entry.description,
        dependencies: entry.dependencies,
        priority: entry.priority,
        effort: entry.effort.filter(|e| *e > 0.0).unwrap_or(DEFAULT_EFFORT),
        ai_effectiveness,
        milestone: entry.milestone,
        iteration: entry.iteration,
        acceptance_criteria: Vec::new(),
        estimated_days: entry.estimated_days,
        reasoning: entry.reasoning,
        agent_notes: entry.agent_notes,
    };

    if let Some(record) = records.remove(&key) {
        task.dependencies = record.depends_on;
        task.acceptance_criteria = record.acceptance_criteria;
        if task.title.is_empty() {
            task.title = record.title;
        }
        if task.description.is_none() {
            task.description = record.description;
        }
        if task.milestone.is_empty() {
            task.milestone = record.milestone;
        }
    }
    task
}

fn task_from_record(key: String, record: IssueRecord) -> Task {
    let mut task = Task::new(key, record.title);
    task.description = record.description;
    task.dependencies = record.depends_on;
    task.acceptance_criteria = record.acceptance_criteria;
    task.milestone = record.milestone;
    task.priority = record.priority.unwrap_or_default();
    task
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Narrow the working set the same way for every command.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Exact task keys; empty means all.
    pub keys: Vec<String>,
    /// Milestone title prefix, e.g. `M1`.
    pub milestone: Option<String>,
    /// Only tasks rated HIGH for AI effectiveness.
    pub ai_high_only: bool,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if !self.keys.is_empty() && !self.keys.iter().any(|k| *k == task.key) {
            return false;
        }
        if let Some(prefix) = &self.milestone {
            if !task.milestone.starts_with(prefix.as_str()) {
                return false;
            }
        }
        if self.ai_high_only && task.ai_effectiveness != AiEffectiveness::High {
            return false;
        }
        true
    }

    pub fn apply(&self, mut tasks: TaskSet) -> TaskSet {
        tasks.retain(|t| self.matches(t));
        tasks
    }
}

// ---------------------------------------------------------------------------
// Spec documents
// ---------------------------------------------------------------------------

/// Find the detailed spec document for a task: `<docs>/<m0>*/<key>-*.md`,
/// then `<docs>/*/<key>-*.md`. The first match in sorted order wins.
pub fn find_spec_doc(docs_dir: &Path, key: &str, milestone: &str) -> Option<PathBuf> {
    let milestone_prefix = milestone
        .to_lowercase()
        .replace(' ', "-")
        .split('-')
        .next()
        .unwrap_or_default()
        .to_string();
    let file_prefix = format!("{}-", key.to_lowercase());

    let mut subdirs: Vec<PathBuf> = std::fs::read_dir(docs_dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    subdirs.sort();

    let in_milestone = subdirs.iter().filter(|d| {
        !milestone_prefix.is_empty()
            && d.file_name()
                .is_some_and(|n| n.to_string_lossy().to_lowercase().starts_with(&milestone_prefix))
    });

    in_milestone
        .chain(subdirs.iter())
        .find_map(|dir| first_doc_in(dir, &file_prefix))
}

/// The per-task issue file `<issues>/<key lowercase>.yaml`, if it exists.
pub fn find_research_file(issues_dir: &Path, key: &str) -> Option<PathBuf> {
    let path = issues_dir.join(format!("{}.yaml", key.to_lowercase()));
    path.is_file().then_some(path)
}

fn first_doc_in(dir: &Path, file_prefix: &str) -> Option<PathBuf> {
    let mut matches: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension().is_some_and(|ext| ext == "md")
                && p.file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with(file_prefix))
        })
        .collect();
    matches.sort();
    matches.into_iter().next()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const EFFORT_MAP: &str = r#"
estimates:
  T2:
    title: Backend core API
    milestone: M1 - Backend Services
    iteration: I2
    priority: p1
    effort: 3
    estimated_days: 2
    reasoning: "Mostly CRUD. AI Impact: HIGH"
  T1:
    title: Infrastructure setup
    milestone: M0 - Infrastructure & Setup
    iteration: I1
    priority: critical
    reasoning: "Needs manual cloud work, LOW AI effectiveness"
"#;

    const ISSUES_M1: &str = r#"
issues:
  - key: T2
    title: Backend core API (issue title)
    dependsOn: [T1]
    acceptance_criteria:
      - Endpoints respond
  - key: T9
    title: Only in issues
    milestone: M1 - Backend Services
    dependsOn: [T2]
"#;

    fn setup(dir: &TempDir) -> Config {
        let root = dir.path();
        std::fs::create_dir_all(root.join("planning/estimates")).unwrap();
        std::fs::create_dir_all(root.join("planning/issues")).unwrap();
        std::fs::write(root.join(paths::DEFAULT_EFFORT_MAP), EFFORT_MAP).unwrap();
        std::fs::write(root.join("planning/issues/m1.yaml"), ISSUES_M1).unwrap();
        Config::default()
    }

    #[test]
    fn extracts_ai_effectiveness_variants() {
        assert_eq!(
            extract_ai_effectiveness("blah. AI Impact: HIGH"),
            AiEffectiveness::High
        );
        assert_eq!(
            extract_ai_effectiveness("AI effectiveness: medium (boilerplate)"),
            AiEffectiveness::Medium
        );
        assert_eq!(
            extract_ai_effectiveness("this has LOW AI effectiveness overall"),
            AiEffectiveness::Low
        );
        assert_eq!(
            extract_ai_effectiveness("no rating here"),
            AiEffectiveness::Unknown
        );
    }

    #[test]
    fn merges_effort_map_and_issue_files() {
        let dir = TempDir::new().unwrap();
        let cfg = setup(&dir);
        let tasks = load_tasks(dir.path(), &cfg).unwrap();

        let keys: Vec<&str> = tasks.keys().collect();
        assert_eq!(keys, vec!["T2", "T1", "T9"]);

        let t2 = tasks.get("T2").unwrap();
        assert_eq!(t2.title, "Backend core API");
        assert_eq!(t2.dependencies, vec!["T1"]);
        assert_eq!(t2.acceptance_criteria, vec!["Endpoints respond"]);
        assert_eq!(t2.priority, Priority::High);
        assert_eq!(t2.effort, 3.0);
        assert_eq!(t2.ai_effectiveness, AiEffectiveness::High);

        let t1 = tasks.get("T1").unwrap();
        assert!(t1.dependencies.is_empty());
        assert_eq!(t1.effort, DEFAULT_EFFORT);
        assert_eq!(t1.ai_effectiveness, AiEffectiveness::Low);

        let t9 = tasks.get("T9").unwrap();
        assert_eq!(t9.dependencies, vec!["T2"]);
        assert_eq!(t9.priority, Priority::Medium);
    }

    #[test]
    fn missing_effort_map_is_error() {
        let dir = TempDir::new().unwrap();
        let err = load_tasks(dir.path(), &Config::default()).unwrap_err();
        assert!(matches!(err, RoadmapError::PlanningNotFound(_)));
    }

    #[test]
    fn missing_issues_dir_is_fine() {
        let dir = TempDir::new().unwrap();
        let cfg = setup(&dir);
        std::fs::remove_dir_all(dir.path().join("planning/issues")).unwrap();
        let tasks = load_tasks(dir.path(), &cfg).unwrap();
        assert_eq!(tasks.len(), 2);
    }

    #[test]
    fn later_issue_file_overrides_dependencies() {
        let dir = TempDir::new().unwrap();
        let cfg = setup(&dir);
        std::fs::write(
            dir.path().join("planning/issues/z-late.yaml"),
            "issues:\n  - key: T2\n    dependsOn: []\n",
        )
        .unwrap();
        let tasks = load_tasks(dir.path(), &cfg).unwrap();
        assert!(tasks.get("T2").unwrap().dependencies.is_empty());
    }

    #[test]
    fn keys_are_taken_verbatim() {
        let dir = TempDir::new().unwrap();
        let cfg = setup(&dir);
        std::fs::write(
            dir.path().join(paths::DEFAULT_EFFORT_MAP),
            "estimates:\n  T1:\n    title: a\n  T1.1:\n    title: b\n  \"M2 / search\":\n    title: c\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("planning/issues/m1.yaml"),
            "issues:\n  - key: T1.1\n    dependsOn: [T1]\n",
        )
        .unwrap();

        let tasks = load_tasks(dir.path(), &cfg).unwrap();
        assert_eq!(tasks.keys().collect::<Vec<_>>(), vec!["T1", "T1.1", "M2 / search"]);
        assert_eq!(tasks.get("T1.1").unwrap().dependencies, vec!["T1"]);
    }

    #[test]
    fn filter_by_milestone_keys_and_ai() {
        let dir = TempDir::new().unwrap();
        let cfg = setup(&dir);
        let tasks = load_tasks(dir.path(), &cfg).unwrap();

        let m1 = TaskFilter {
            milestone: Some("M1".into()),
            ..TaskFilter::default()
        }
        .apply(tasks.clone());
        assert_eq!(m1.keys().collect::<Vec<_>>(), vec!["T2", "T9"]);

        let high = TaskFilter {
            ai_high_only: true,
            ..TaskFilter::default()
        }
        .apply(tasks.clone());
        assert_eq!(high.keys().collect::<Vec<_>>(), vec!["T2"]);

        let picked = TaskFilter {
            keys: vec!["T9".into(), "T1".into()],
            ..TaskFilter::default()
        }
        .apply(tasks);
        assert_eq!(picked.keys().collect::<Vec<_>>(), vec!["T1", "T9"]);
    }

    #[test]
    fn spec_doc_prefers_milestone_directory() {
        let dir = TempDir::new().unwrap();
        let docs = dir.path().join("docs");
        std::fs::create_dir_all(docs.join("m0-infra")).unwrap();
        std::fs::create_dir_all(docs.join("a-misc")).unwrap();
        std::fs::write(docs.join("a-misc/t1-old.md"), "").unwrap();
        std::fs::write(docs.join("m0-infra/t1-setup.md"), "").unwrap();

        let found = find_spec_doc(&docs, "T1", "M0 - Infrastructure & Setup").unwrap();
        assert_eq!(found, docs.join("m0-infra/t1-setup.md"));

        let fallback = find_spec_doc(&docs, "T1", "M4 - ML").unwrap();
        assert_eq!(fallback, docs.join("a-misc/t1-old.md"));

        assert!(find_spec_doc(&docs, "T7", "M0").is_none());
        assert!(find_spec_doc(&dir.path().join("nope"), "T1", "M0").is_none());
    }

    #[test]
    fn research_file_is_per_task_issue_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("t24.yaml"), "issues: []\n").unwrap();
        std::fs::create_dir_all(dir.path().join("t25.yaml")).unwrap();

        assert_eq!(
            find_research_file(dir.path(), "T24"),
            Some(dir.path().join("t24.yaml"))
        );
        assert!(find_research_file(dir.path(), "T25").is_none());
        assert!(find_research_file(dir.path(), "T26").is_none());
    }
}
