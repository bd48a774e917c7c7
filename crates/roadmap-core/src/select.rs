//! Picks the single task a coding agent should start on next.

use crate::task::{Materialization, Task, TaskSet};
use serde::Serialize;

/// Milestone substring marking the earliest planning phase.
pub const FIRST_MILESTONE_MARKER: &str = "M0";
/// Iteration label marking the earliest planning phase.
pub const FIRST_ITERATION: &str = "I1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadyTask {
    pub key: String,
    pub issue_number: u64,
    pub node_id: String,
}

/// Whether the task belongs to the first milestone or iteration.
pub fn in_first_phase(task: &Task) -> bool {
    task.milestone.contains(FIRST_MILESTONE_MARKER) || task.iteration == FIRST_ITERATION
}

/// Find the best materialized task with no declared dependencies.
///
/// Any listed dependency disqualifies a task, whether or not that dependency
/// has already been created. Tasks in the first phase are preferred when any
/// exist; the remaining candidates are ranked by priority, then AI
/// effectiveness, then effort, with input order breaking ties.
pub fn select_next(tasks: &TaskSet, materialized: &Materialization) -> Option<ReadyTask> {
    let ready: Vec<&Task> = tasks
        .iter()
        .filter(|t| materialized.is_materialized(&t.key))
        .filter(|t| t.dependencies.is_empty())
        .collect();

    let preferred: Vec<&Task> = ready.iter().copied().filter(|t| in_first_phase(t)).collect();
    let mut candidates = if preferred.is_empty() { ready } else { preferred };

    // sort_by is stable, so equal scores keep input order.
    candidates.sort_by(|a, b| {
        (a.priority.rank(), a.ai_effectiveness.rank())
            .cmp(&(b.priority.rank(), b.ai_effectiveness.rank()))
            .then_with(|| a.effort.total_cmp(&b.effort))
    });

    let best = candidates.first()?;
    Some(ReadyTask {
        key: best.key.clone(),
        issue_number: materialized.issue_number(&best.key)?,
        node_id: materialized.node_id(&best.key)?.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
