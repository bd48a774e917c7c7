//! The seam between sync orchestration and GitHub.
//!
//! [`IssueTracker`] lists every remote operation sync needs. [`GhCli`] is the
//! production implementation and drives the `gh` CLI (`gh api` for both REST
//! and GraphQL) so authentication stays with the user's existing `gh` login.

use crate::config::Config;
use crate::error::{Result, RoadmapError};
use crate::labels::LabelSpec;
use serde_json::{json, Value};
use std::io::Write as _;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::debug;

/// GraphQL preview features required for agent assignment.
const AGENT_FEATURES_HEADER: &str =
    "GraphQL-Features: issues_copilot_assignment_api_support,coding_agent_model_selection";

/// Issue contents for the REST create call.
#[derive(Debug, Clone)]
pub struct NewIssue<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub labels: &'a [String],
    pub milestone: Option<u64>,
}

/// A project item, addressed by its project and item node ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectItem {
    pub project_id: String,
    pub item_id: String,
}

pub trait IssueTracker {
    /// Create an issue and return its number.
    fn create_issue(&self, issue: &NewIssue<'_>) -> Result<u64>;
    fn issue_node_id(&self, number: u64) -> Result<String>;
    /// Add an issue to a project and return the new project item.
    fn add_to_project(&self, project_id: &str, issue_node_id: &str) -> Result<ProjectItem>;
    fn set_single_select(&self, item: &ProjectItem, field_id: &str, option_id: &str) -> Result<()>;
    fn set_text_field(&self, item: &ProjectItem, field_id: &str, text: &str) -> Result<()>;
    fn set_iteration(&self, item: &ProjectItem, field_id: &str, iteration_id: &str) -> Result<()>;
    fn set_issue_type(&self, issue_node_id: &str, issue_type_id: &str) -> Result<()>;
    fn add_sub_issue(&self, parent_node_id: &str, child_node_id: &str) -> Result<()>;
    fn add_blocked_by(&self, blocked_node_id: &str, blocking_node_id: &str) -> Result<()>;
    /// Node id of the assignable actor with `login`, if the repository offers one.
    fn find_assignable_actor(&self, login: &str) -> Result<Option<String>>;
    fn assign_agent(
        &self,
        issue_node_id: &str,
        actor_id: &str,
        base_ref: &str,
        instructions: &str,
    ) -> Result<()>;
    fn list_labels(&self) -> Result<Vec<String>>;
    fn create_label(&self, label: &LabelSpec) -> Result<()>;
    fn update_label(&self, label: &LabelSpec) -> Result<()>;
}

// ---------------------------------------------------------------------------
// GhCli
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GhCli {
    bin: PathBuf,
    owner: String,
    name: String,
}

impl GhCli {
    pub fn new(config: &Config) -> Result<Self> {
        config.repo_slug()?;
        Ok(Self {
            bin: gh_bin()?,
            owner: config.repo.owner.clone(),
            name: config.repo.name.clone(),
        })
    }

    fn repo_path(&self) -> String {
        format!("/repos/{}/{}", self.owner, self.name)
    }

    fn label_endpoint(&self, name: &str) -> String {
        format!("{}/labels/{}", self.repo_path(), urlencoding::encode(name))
    }

    fn run(&self, args: &[String], stdin: Option<&str>) -> Result<Value> {
        let stdout = self.run_raw(args, stdin)?;
        if stdout.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&stdout)?)
    }

    /// Run `gh` and return its stdout unparsed.
    fn run_raw(&self, args: &[String], stdin: Option<&str>) -> Result<String> {
        let command = args.iter().take(2).cloned().collect::<Vec<_>>().join(" ");
        debug!(command = %command, "running gh");

        let mut cmd = Command::new(&self.bin);
        cmd.args(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let mut child = cmd.spawn()?;
        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(RoadmapError::GhFailed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn rest(&self, method: &str, endpoint: &str, payload: Option<&Value>) -> Result<Value> {
        let mut args = vec![
            "api".to_string(),
            endpoint.to_string(),
            "-X".to_string(),
            method.to_string(),
        ];
        let body = match payload {
            Some(p) => {
                args.extend(["--input".to_string(), "-".to_string()]);
                Some(serde_json::to_string(p)?)
            }
            None => None,
        };
        self.run(&args, body.as_deref())
    }

    /// Run a GraphQL document. String variables go through `-f`, so values
    /// are never spliced into the query text.
    fn graphql(&self, query: &str, vars: &[(&str, &str)], header: Option<&str>) -> Result<Value> {
        let mut args = vec!["api".to_string(), "graphql".to_string()];
        if let Some(h) = header {
            args.extend(["-H".to_string(), h.to_string()]);
        }
        args.extend(["-f".to_string(), format!("query={query}")]);
        for (name, value) in vars {
            args.extend(["-f".to_string(), format!("{name}={value}")]);
        }
        check_graphql(self.run(&args, None)?)
    }

    fn update_field(&self, item: &ProjectItem, field_id: &str, value_kind: &str, value: &str) -> Result<()> {
        let query = format!(
            "mutation($projectId: ID!, $itemId: ID!, $fieldId: ID!, $value: String!) {{ \
             updateProjectV2ItemFieldValue(input: {{ projectId: $projectId, itemId: $itemId, \
             fieldId: $fieldId, value: {{ {value_kind}: $value }} }}) {{ projectV2Item {{ id }} }} }}"
        );
        let data = self.graphql(
            &query,
            &[
                ("projectId", item.project_id.as_str()),
                ("itemId", item.item_id.as_str()),
                ("fieldId", field_id),
                ("value", value),
            ],
            None,
        )?;
        require(&data, &["updateProjectV2ItemFieldValue"])?;
        Ok(())
    }
}

fn gh_bin() -> Result<PathBuf> {
    which::which("gh").map_err(|_| RoadmapError::GhNotFound)
}

impl IssueTracker for GhCli {
    fn create_issue(&self, issue: &NewIssue<'_>) -> Result<u64> {
        let mut payload = json!({
            "title": issue.title,
            "body": issue.body,
            "labels": issue.labels,
        });
        if let Some(m) = issue.milestone {
            payload["milestone"] = json!(m);
        }
        let created = self.rest("POST", &format!("{}/issues", self.repo_path()), Some(&payload))?;
        created["number"]
            .as_u64()
            .ok_or_else(|| RoadmapError::UnexpectedResponse("issue number missing".into()))
    }

    fn issue_node_id(&self, number: u64) -> Result<String> {
        let issue = self.rest("GET", &format!("{}/issues/{number}", self.repo_path()), None)?;
        issue["node_id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RoadmapError::UnexpectedResponse(format!("node_id missing for #{number}")))
    }

    fn add_to_project(&self, project_id: &str, issue_node_id: &str) -> Result<ProjectItem> {
        let data = self.graphql(
            "mutation($projectId: ID!, $contentId: ID!) { \
             addProjectV2ItemById(input: { projectId: $projectId, contentId: $contentId }) \
             { item { id } } }",
            &[("projectId", project_id), ("contentId", issue_node_id)],
            None,
        )?;
        let item_id = require(&data, &["addProjectV2ItemById", "item", "id"])?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RoadmapError::UnexpectedResponse("project item id missing".into()))?;
        Ok(ProjectItem {
            project_id: project_id.to_string(),
            item_id,
        })
    }

    fn set_single_select(&self, item: &ProjectItem, field_id: &str, option_id: &str) -> Result<()> {
        self.update_field(item, field_id, "singleSelectOptionId", option_id)
    }

    fn set_text_field(&self, item: &ProjectItem, field_id: &str, text: &str) -> Result<()> {
        self.update_field(item, field_id, "text", text)
    }

    fn set_iteration(&self, item: &ProjectItem, field_id: &str, iteration_id: &str) -> Result<()> {
        self.update_field(item, field_id, "iterationId", iteration_id)
    }

    fn set_issue_type(&self, issue_node_id: &str, issue_type_id: &str) -> Result<()> {
        let data = self.graphql(
            "mutation($issueId: ID!, $issueTypeId: ID!) { \
             updateIssue(input: { id: $issueId, issueTypeId: $issueTypeId }) { issue { id } } }",
            &[("issueId", issue_node_id), ("issueTypeId", issue_type_id)],
            None,
        )?;
        require(&data, &["updateIssue"])?;
        Ok(())
    }

    fn add_sub_issue(&self, parent_node_id: &str, child_node_id: &str) -> Result<()> {
        let data = self.graphql(
            "mutation($issueId: ID!, $subIssueId: ID!) { \
             addSubIssue(input: { issueId: $issueId, subIssueId: $subIssueId, replaceParent: true }) \
             { issue { id } } }",
            &[("issueId", parent_node_id), ("subIssueId", child_node_id)],
            None,
        )?;
        require(&data, &["addSubIssue"])?;
        Ok(())
    }

    fn add_blocked_by(&self, blocked_node_id: &str, blocking_node_id: &str) -> Result<()> {
        let data = self.graphql(
            "mutation($issueId: ID!, $blockingIssueId: ID!) { \
             addBlockedBy(input: { issueId: $issueId, blockingIssueId: $blockingIssueId }) \
             { issue { id } } }",
            &[("issueId", blocked_node_id), ("blockingIssueId", blocking_node_id)],
            None,
        )?;
        require(&data, &["addBlockedBy"])?;
        Ok(())
    }

    fn find_assignable_actor(&self, login: &str) -> Result<Option<String>> {
        let data = self.graphql(
            "query($owner: String!, $name: String!) { repository(owner: $owner, name: $name) { \
             suggestedActors(capabilities: [CAN_BE_ASSIGNED], first: 100) { nodes { login \
             ... on Bot { id } ... on User { id } } } } }",
            &[("owner", self.owner.as_str()), ("name", self.name.as_str())],
            None,
        )?;
        Ok(actor_id(&data, login))
    }

    fn assign_agent(
        &self,
        issue_node_id: &str,
        actor_id: &str,
        base_ref: &str,
        instructions: &str,
    ) -> Result<()> {
        let data = self.graphql(
            "mutation($issueId: ID!, $actorId: ID!, $baseRef: String!, $instructions: String!) { \
             addAssigneesToAssignable(input: { assignableId: $issueId, assigneeIds: [$actorId], \
             agentAssignment: { baseRef: $baseRef, customInstructions: $instructions } }) \
             { assignable { ... on Issue { id } } } }",
            &[
                ("issueId", issue_node_id),
                ("actorId", actor_id),
                ("baseRef", base_ref),
                ("instructions", instructions),
            ],
            Some(AGENT_FEATURES_HEADER),
        )?;
        require(&data, &["addAssigneesToAssignable"])?;
        Ok(())
    }

    fn list_labels(&self) -> Result<Vec<String>> {
        let args = [
            "api".to_string(),
            format!("{}/labels?per_page=100", self.repo_path()),
            "--paginate".to_string(),
        ];
        label_names(&self.run_raw(&args, None)?)
    }

    fn create_label(&self, label: &LabelSpec) -> Result<()> {
        let payload = json!({
            "name": label.name,
            "color": label.color,
            "description": label.description,
        });
        self.rest("POST", &format!("{}/labels", self.repo_path()), Some(&payload))?;
        Ok(())
    }

    fn update_label(&self, label: &LabelSpec) -> Result<()> {
        let payload = json!({
            "new_name": label.name,
            "color": label.color,
            "description": label.description,
        });
        self.rest(
            "PATCH",
            &self.label_endpoint(&label.name),
            Some(&payload),
        )?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

/// Return the `data` object of a GraphQL response, or the joined messages of
/// its `errors` array.
fn check_graphql(response: Value) -> Result<Value> {
    if let Some(errors) = response.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let messages: Vec<&str> = errors
                .iter()
                .map(|e| e["message"].as_str().unwrap_or("unknown error"))
                .collect();
            return Err(RoadmapError::GraphQl(messages.join("; ")));
        }
    }
    match response.get("data") {
        Some(data) if !data.is_null() => Ok(data.clone()),
        _ => Err(RoadmapError::UnexpectedResponse(
            "GraphQL response has no data".into(),
        )),
    }
}

fn require<'a>(data: &'a Value, path: &[&str]) -> Result<&'a Value> {
    let mut cur = data;
    for key in path {
        cur = cur
            .get(key)
            .filter(|v| !v.is_null())
            .ok_or_else(|| RoadmapError::UnexpectedResponse(format!("missing '{}'", path.join("."))))?;
    }
    Ok(cur)
}

fn actor_id(data: &Value, login: &str) -> Option<String> {
    data["repository"]["suggestedActors"]["nodes"]
        .as_array()?
        .iter()
        .find(|n| n["login"].as_str() == Some(login))
        .and_then(|n| n["id"].as_str())
        .map(str::to_string)
}

/// Collect label names from `gh api --paginate` output, which prints one JSON
/// array per page back to back.
fn label_names(pages: &str) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for page in serde_json::Deserializer::from_str(pages).into_iter::<Value>() {
        if let Some(labels) = page?.as_array() {
            names.extend(
                labels
                    .iter()
                    .filter_map(|l| l["name"].as_str().map(str::to_string)),
            );
        }
    }
    Ok(names)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
