//! Repository label catalogue and the plan to bring GitHub in line with it.

use crate::error::{Result, RoadmapError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

pub const DEFAULT_COLOR: &str = "ededed";

/// Labels every planned repository needs regardless of `labels.yaml`.
pub const BUILTIN_LABELS: &[&str] = &["auto-generated", "from-planning", "milestone-complete"];

// (name, colour, description)
const KNOWN_LABELS: &[(&str, &str, &str)] = &[
    ("priority:p0", "b60205", "Critical priority"),
    ("priority:p1", "d93f0b", "High priority"),
    ("priority:p2", "fbca04", "Medium priority"),
    ("priority:p3", "c5def5", "Low priority"),
    ("priority:critical", "b60205", "Critical priority"),
    ("priority:high", "d93f0b", "High priority"),
    ("status:triage", "ededed", "Needs triage"),
    ("status:ready", "0e8a16", "Ready for implementation"),
    ("status:in-progress", "fbca04", "Currently being worked on"),
    ("status:blocked", "b60205", "Blocked by dependencies"),
    ("status:done", "0e8a16", "Completed"),
    ("automation:ready", "0e8a16", "Suitable for agent implementation"),
    ("automation:partial", "fbca04", "Agent can help with parts of this task"),
    ("Task", "0075ca", "Development task"),
    ("Feature", "a2eeef", "New feature or enhancement"),
    ("Bug", "d73a4a", "Bug report"),
    ("auto-generated", "fef2c0", "Auto-generated by automation"),
    ("from-planning", "c5def5", "Created from planning system"),
    ("milestone-complete", "0e8a16", "Milestone completion celebration"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelSpec {
    pub name: String,
    pub color: String,
    pub description: String,
}

impl LabelSpec {
    pub fn for_name(name: impl Into<String>) -> Self {
        let name = name.into();
        let (color, description) = KNOWN_LABELS
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(_, c, d)| (c.to_string(), d.to_string()))
            .unwrap_or_else(|| (DEFAULT_COLOR.to_string(), String::new()));
        Self {
            name,
            color,
            description,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LabelsFile {
    #[serde(default)]
    issue_types: Vec<String>,
    #[serde(default)]
    labels: BTreeMap<String, Vec<String>>,
}

/// Read `labels.yaml`: issue types first, then every category in name order, then the
/// built-in labels. The first occurrence of a name wins.
pub fn load_labels(path: &Path) -> Result<Vec<LabelSpec>> {
    if !path.exists() {
        return Err(RoadmapError::PlanningNotFound(path.display().to_string()));
    }
    let file: LabelsFile = crate::io::read_yaml(path)?;
    let names = file
        .issue_types
        .into_iter()
        .chain(file.labels.into_values().flatten())
        .chain(BUILTIN_LABELS.iter().map(|s| s.to_string()));
    Ok(dedup_specs(names))
}

fn dedup_specs(names: impl IntoIterator<Item = String>) -> Vec<LabelSpec> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|n| !n.trim().is_empty() && seen.insert(n.clone()))
        .map(LabelSpec::for_name)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum LabelAction {
    Create(LabelSpec),
    Update(LabelSpec),
    Skip { name: String },
}

impl LabelAction {
    pub fn name(&self) -> &str {
        match self {
            LabelAction::Create(s) | LabelAction::Update(s) => &s.name,
            LabelAction::Skip { name } => name,
        }
    }
}

/// Decide what to do with each wanted label given the names already present
/// in the repository. Existing labels are skipped unless `update` is set.
pub fn plan_labels(wanted: &[LabelSpec], existing: &HashSet<String>, update: bool) -> Vec<LabelAction> {
    wanted
        .iter()
        .map(|spec| match (existing.contains(&spec.name), update) {
            (false, _) => LabelAction::Create(spec.clone()),
            (true, true) => LabelAction::Update(spec.clone()),
            (true, false) => LabelAction::Skip {
                name: spec.name.clone(),
            },
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
