use crate::types::{AiEffectiveness, Priority};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const DEFAULT_EFFORT: f64 = 5.0;

fn default_effort() -> f64 {
    DEFAULT_EFFORT
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, alias = "dependsOn")]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default = "default_effort")]
    pub effort: f64,
    #[serde(default)]
    pub ai_effectiveness: AiEffectiveness,
    #[serde(default)]
    pub milestone: String,
    #[serde(default)]
    pub iteration: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acceptance_criteria: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_days: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_notes: Option<AgentNotes>,
}

impl Task {
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            description: None,
            dependencies: Vec::new(),
            priority: Priority::default(),
            effort: DEFAULT_EFFORT,
            ai_effectiveness: AiEffectiveness::default(),
            milestone: String::new(),
            iteration: String::new(),
            acceptance_criteria: Vec::new(),
            estimated_days: None,
            reasoning: None,
            agent_notes: None,
        }
    }

    pub fn depends_on(mut self, deps: &[&str]) -> Self {
        self.dependencies = deps.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_effort(mut self, effort: f64) -> Self {
        self.effort = effort;
        self
    }

    pub fn with_ai(mut self, ai: AiEffectiveness) -> Self {
        self.ai_effectiveness = ai;
        self
    }

    pub fn in_milestone(mut self, milestone: impl Into<String>) -> Self {
        self.milestone = milestone.into();
        self
    }

    pub fn in_iteration(mut self, iteration: impl Into<String>) -> Self {
        self.iteration = iteration.into();
        self
    }
}

/// Research notes attached to a task by the planning process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentNotes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_findings: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation_approach: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub design_decisions: Vec<DesignDecision>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DesignDecision {
    #[serde(default)]
    pub decision: Option<String>,
    #[serde(default)]
    pub rationale: Option<String>,
}

// ---------------------------------------------------------------------------
// TaskSet
// ---------------------------------------------------------------------------

/// Insertion-ordered collection of tasks with unique keys.
///
/// Inserting a key that is already present replaces the earlier record in
/// place: the last definition wins, the first position is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskSet {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a task. Returns `true` if it replaced an existing key.
    pub fn insert(&mut self, task: Task) -> bool {
        if let Some(&pos) = self.index.get(&task.key) {
            self.tasks[pos] = task;
            return true;
        }
        self.index.insert(task.key.clone(), self.tasks.len());
        self.tasks.push(task);
        false
    }

    pub fn get(&self, key: &str) -> Option<&Task> {
        self.index.get(key).map(|&i| &self.tasks[i])
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Task> {
        self.index.get(key).map(|&i| &mut self.tasks[i])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Position of `key` in insertion order.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Task> {
        self.tasks.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.key.as_str())
    }

    pub fn as_slice(&self) -> &[Task] {
        &self.tasks
    }

    pub fn into_vec(self) -> Vec<Task> {
        self.tasks
    }

    /// Keep only tasks matching `f`, preserving order.
    pub fn retain(&mut self, f: impl FnMut(&Task) -> bool) {
        let tasks = std::mem::take(&mut self.tasks);
        *self = tasks.into_iter().filter(f).collect();
    }
}

impl FromIterator<Task> for TaskSet {
    fn from_iter<I: IntoIterator<Item = Task>>(iter: I) -> Self {
        let mut set = TaskSet::new();
        for task in iter {
            set.insert(task);
        }
        set
    }
}

impl IntoIterator for TaskSet {
    type Item = Task;
    type IntoIter = std::vec::IntoIter<Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.into_iter()
    }
}

impl<'a> IntoIterator for &'a TaskSet {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}

// ---------------------------------------------------------------------------
// Materialization
// ---------------------------------------------------------------------------

/// Which tasks already exist in the issue tracker.
///
/// A task counts as materialized only when both its issue number and its
/// node id are known.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Materialization {
    #[serde(default)]
    pub issues: BTreeMap<String, u64>,
    #[serde(default)]
    pub nodes: BTreeMap<String, String>,
}

impl Materialization {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: impl Into<String>, number: u64, node_id: impl Into<String>) {
        let key = key.into();
        self.issues.insert(key.clone(), number);
        self.nodes.insert(key, node_id.into());
    }

    pub fn issue_number(&self, key: &str) -> Option<u64> {
        self.issues.get(key).copied()
    }

    pub fn node_id(&self, key: &str) -> Option<&str> {
        self.nodes.get(key).map(String::as_str)
    }

    pub fn is_materialized(&self, key: &str) -> bool {
        self.issues.contains_key(key) && self.nodes.contains_key(key)
    }

    /// Number of fully materialized tasks.
    pub fn len(&self) -> usize {
        self.issues
            .keys()
            .filter(|k| self.nodes.contains_key(k.as_str()))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
