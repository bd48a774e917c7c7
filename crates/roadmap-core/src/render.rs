//! Text rendered for the issue tracker: titles, labels, issue bodies, and the
//! instructions handed to a coding agent.

use crate::task::{Materialization, Task};
use crate::types::{AiEffectiveness, Priority};

pub const LABEL_FROM_PLANNING: &str = "from-planning";
pub const LABEL_AUTOMATION_READY: &str = "automation:ready";
pub const LABEL_AUTOMATION_PARTIAL: &str = "automation:partial";

const MAX_RESEARCH_CHARS: usize = 500;
const MAX_DESIGN_DECISIONS: usize = 2;

pub fn issue_title(task: &Task) -> String {
    format!("{}: {}", task.key, task.title)
}

pub fn issue_labels(task: &Task) -> Vec<String> {
    let mut labels = vec![LABEL_FROM_PLANNING.to_string()];
    match task.ai_effectiveness {
        AiEffectiveness::High => labels.push(LABEL_AUTOMATION_READY.to_string()),
        AiEffectiveness::Medium => labels.push(LABEL_AUTOMATION_PARTIAL.to_string()),
        AiEffectiveness::Low | AiEffectiveness::Unknown => {}
    }
    if matches!(task.priority, Priority::Critical | Priority::High) {
        labels.push(format!("priority:{}", task.priority));
    }
    labels
}

/// Project-relative paths of the planning files an issue body points back to.
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyRefs<'a> {
    /// Detailed spec document, if one exists for the task.
    pub spec_doc: Option<&'a str>,
    /// Per-task issue file holding research notes, if present.
    pub research: Option<&'a str>,
    pub effort_map: &'a str,
}

/// Markdown body for a new issue. Milestone and dependencies are carried by
/// tracker fields and relationships, so they are not repeated here.
pub fn issue_body(task: &Task, refs: &BodyRefs<'_>) -> String {
    let mut body = String::new();

    body.push_str("## 📋 Description\n\n");
    let description = task.description.as_deref().unwrap_or(&task.title);
    body.push_str(&format!("{description}\n\n"));
    body.push_str(&format!("**AI Effectiveness**: {}\n", task.ai_effectiveness));
    match task.estimated_days {
        Some(days) => body.push_str(&format!("**Estimated Effort**: {days} days\n")),
        None => body.push_str("**Estimated Effort**: ? days\n"),
    }
    if let Some(doc) = refs.spec_doc {
        body.push_str(&format!("\n**Detailed Spec**: `{doc}`\n"));
    }

    if !task.acceptance_criteria.is_empty() {
        body.push_str("\n## ✅ Acceptance Criteria\n\n");
        for criterion in &task.acceptance_criteria {
            body.push_str(&format!("- [ ] {criterion}\n"));
        }
    }

    body.push_str("\n## 🤖 Automation Available\n\n");
    body.push_str("### Automation Status:\n\n");
    if task.ai_effectiveness == AiEffectiveness::High {
        body.push_str("- [x] ✅ Automation available for this task type\n");
    } else {
        body.push_str("- [ ] ⚠️ Automation not recommended (manual implementation preferred)\n");
    }
    body.push_str("- [ ] Auto-generation triggered (comment `/automate`)\n");
    body.push_str("- [ ] PR created with generated code\n");
    body.push_str("- [ ] Code reviewed and refined\n");

    body.push_str("\n### Implementation Notes:\n\n");
    body.push_str("**Related Files:**\n");
    if let Some(doc) = refs.spec_doc {
        body.push_str(&format!("- Spec: `{doc}`\n"));
    }
    if let Some(research) = refs.research {
        body.push_str(&format!("- Research: `{research}` (search for {})\n", task.key));
    }
    body.push_str(&format!("- Estimate: `{}` ({})\n", refs.effort_map, task.key));

    body
}

/// Text for the project's "Blocked By" field (`#36, #41`) plus the
/// dependencies that have no issue yet.
pub fn blocked_by_text(task: &Task, materialized: &Materialization) -> (String, Vec<String>) {
    let mut numbers = Vec::new();
    let mut missing = Vec::new();
    for dep in &task.dependencies {
        match materialized.issue_number(dep) {
            Some(n) => numbers.push(format!("#{n}")),
            None => missing.push(dep.clone()),
        }
    }
    (numbers.join(", "), missing)
}

/// Instructions handed to the coding agent together with the assignment.
pub fn agent_instructions(task: &Task) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}: {}\n\n", task.key, task.title));

    if let Some(description) = &task.description {
        out.push_str(&format!("## Description\n{description}\n\n"));
    }

    if let Some(notes) = &task.agent_notes {
        if let Some(findings) = &notes.research_findings {
            out.push_str(&format!(
                "## Research Findings\n{}\n\n",
                truncate_chars(findings, MAX_RESEARCH_CHARS)
            ));
        }
        if let Some(approach) = &notes.implementation_approach {
            out.push_str(&format!("## Implementation Approach\n{approach}\n\n"));
        }
        if !notes.design_decisions.is_empty() {
            out.push_str("## Key Design Decisions\n");
            for d in notes.design_decisions.iter().take(MAX_DESIGN_DECISIONS) {
                out.push_str(&format!(
                    "- **{}**: {}\n",
                    d.decision.as_deref().unwrap_or("N/A"),
                    d.rationale.as_deref().unwrap_or("N/A")
                ));
            }
            out.push('\n');
        }
    }

    out.push_str("## Technical Requirements\n");
    out.push_str(&format!("- Priority: {}\n", task.priority));
    out.push_str(&format!("- Effort: {} points\n", task.effort));
    out.push_str(&format!("- AI Effectiveness: {}\n\n", task.ai_effectiveness));

    out.push_str("## Quality Standards\n");
    out.push_str("- Follow SOLID, DRY, KISS principles\n");
    out.push_str("- Write unit tests\n");
    out.push_str("- Add comprehensive error handling\n");
    out.push_str("- Use strict type checking\n\n");

    out.push_str("## Expected Files\n");
    out.push_str("- Refer to project structure in .github/copilot-instructions.md\n");
    out.push_str("- Follow existing patterns from similar files");

    out
}

/// Keep agent instructions within the assignment API's size limit.
pub fn clamp_instructions(text: &str, max_chars: usize) -> String {
    truncate_chars(text, max_chars)
}

/// Cut `text` to at most `max` characters, marking the cut with `...`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut cut: String = text.chars().take(keep).collect();
    cut.push_str("...");
    cut
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
