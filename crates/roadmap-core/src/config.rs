use crate::error::{Result, RoadmapError};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// RepoConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoConfig {
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub name: String,
}

// ---------------------------------------------------------------------------
// ProjectConfig
// ---------------------------------------------------------------------------

/// GitHub Projects v2 board the created issues are added to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub fields: ProjectFields,
    /// Option id of the "Todo" value of the status field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_todo: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueTypes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationConfig {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

// ---------------------------------------------------------------------------
// AgentConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_agent_login")]
    pub login: String,
    #[serde(default = "default_base_ref")]
    pub base_ref: String,
    #[serde(default = "default_max_instruction_chars")]
    pub max_instruction_chars: usize,
}

fn default_agent_login() -> String {
    "copilot-swe-agent".to_string()
}

fn default_base_ref() -> String {
    "main".to_string()
}

fn default_max_instruction_chars() -> usize {
    2000
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            login: default_agent_login(),
            base_ref: default_base_ref(),
            max_instruction_chars: default_max_instruction_chars(),
        }
    }
}

// ---------------------------------------------------------------------------
// PathsConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_effort_map")]
    pub effort_map: PathBuf,
    #[serde(default = "default_issues_dir")]
    pub issues_dir: PathBuf,
    #[serde(default = "default_docs_dir")]
    pub docs_dir: PathBuf,
    #[serde(default = "default_labels")]
    pub labels: PathBuf,
}

fn default_effort_map() -> PathBuf {
    PathBuf::from(paths::DEFAULT_EFFORT_MAP)
}

fn default_issues_dir() -> PathBuf {
    PathBuf::from(paths::DEFAULT_ISSUES_DIR)
}

fn default_docs_dir() -> PathBuf {
    PathBuf::from(paths::DEFAULT_DOCS_DIR)
}

fn default_labels() -> PathBuf {
    PathBuf::from(paths::DEFAULT_LABELS_FILE)
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            effort_map: default_effort_map(),
            issues_dir: default_issues_dir(),
            docs_dir: default_docs_dir(),
            labels: default_labels(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub repo: RepoConfig,
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub issue_types: IssueTypes,
    /// Milestone title → GitHub milestone number.
    #[serde(default)]
    pub milestones: BTreeMap<String, u64>,
    /// Iteration key (e.g. `I1`) → project iteration.
    #[serde(default)]
    pub iterations: BTreeMap<String, IterationConfig>,
    /// Child task key → parent task key.
    #[serde(default)]
    pub parents: BTreeMap<String, String>,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    /// Pause between GitHub mutations.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
}

fn default_request_delay_ms() -> u64 {
    500
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repo: RepoConfig::default(),
            project: ProjectConfig::default(),
            issue_types: IssueTypes::default(),
            milestones: BTreeMap::new(),
            iterations: BTreeMap::new(),
            parents: BTreeMap::new(),
            agent: AgentConfig::default(),
            paths: PathsConfig::default(),
            request_delay_ms: default_request_delay_ms(),
        }
    }
}

impl Config {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            repo: RepoConfig {
                owner: owner.into(),
                name: name.into(),
            },
            ..Self::default()
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(RoadmapError::NotInitialized);
        }
        crate::io::read_yaml(&path)
    }

    /// Load the config, falling back to defaults when the file is absent.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        match Self::load(root) {
            Err(RoadmapError::NotInitialized) => Ok(Self::default()),
            other => other,
        }
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        crate::io::write_yaml(&path, self)
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    /// `owner/name`, or an error when either half is unset.
    pub fn repo_slug(&self) -> Result<String> {
        if self.repo.owner.trim().is_empty() {
            return Err(RoadmapError::MissingConfig("repo.owner".into()));
        }
        if self.repo.name.trim().is_empty() {
            return Err(RoadmapError::MissingConfig("repo.name".into()));
        }
        Ok(format!("{}/{}", self.repo.owner, self.repo.name))
    }

    pub fn milestone_number(&self, title: &str) -> Option<u64> {
        if title.is_empty() {
            return None;
        }
        self.milestones.get(title).copied()
    }

    pub fn iteration(&self, key: &str) -> Option<&IterationConfig> {
        self.iterations.get(key)
    }

    pub fn effort_map_path(&self, root: &Path) -> PathBuf {
        paths::resolve(root, &self.paths.effort_map)
    }

    pub fn issues_dir(&self, root: &Path) -> PathBuf {
        paths::resolve(root, &self.paths.issues_dir)
    }

    pub fn docs_dir(&self, root: &Path) -> PathBuf {
        paths::resolve(root, &self.paths.docs_dir)
    }

    pub fn labels_path(&self, root: &Path) -> PathBuf {
        paths::resolve(root, &self.paths.labels)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        // 1. Repository coordinates are required for any GitHub call
        for (field, value) in [("repo.owner", &self.repo.owner), ("repo.name", &self.repo.name)] {
            if value.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("{field} is not set"),
                });
            }
        }

        // 2. A project without field ids can only receive the issue itself
        if self.project.id.is_some() && self.project.fields.status.is_none() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "project.id is set but project.fields.status is not; \
                          status will not be set"
                    .to_string(),
            });
        }
        if self.project.fields.status.is_some() && self.project.status_todo.is_none() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "project.fields.status is set but project.status_todo is not"
                    .to_string(),
            });
        }

        // 3. Iterations need ids
        for (key, it) in &self.iterations {
            if it.id.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("iteration '{key}' has an empty id"),
                });
            }
        }

        // 4. Milestone numbers start at 1 on GitHub
        for (title, number) in &self.milestones {
            if *number == 0 {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("milestone '{title}' has number 0"),
                });
            }
        }

        // 5. Parent links must form a forest
        for (child, parent) in &self.parents {
            if child == parent {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("task '{child}' is listed as its own parent"),
                });
                continue;
            }
            let mut seen: HashSet<&str> = HashSet::from([child.as_str()]);
            let mut cursor = parent.as_str();
            while let Some(next) = self.parents.get(cursor) {
                if !seen.insert(cursor) {
                    break;
                }
                if next == child {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Error,
                        message: format!("parent chain starting at '{child}' forms a cycle"),
                    });
                    break;
                }
                cursor = next.as_str();
            }
        }

        // 6. Agent instructions have to fit somewhere
        if self.agent.max_instruction_chars < 16 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "agent.max_instruction_chars={} leaves almost no room for instructions",
                    self.agent.max_instruction_chars
                ),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
