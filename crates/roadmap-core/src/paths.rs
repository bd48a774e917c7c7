use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const ROADMAP_DIR: &str = ".roadmap";
pub const CONFIG_FILE: &str = ".roadmap/config.yaml";

pub const DEFAULT_EFFORT_MAP: &str = "planning/estimates/effort-map.yaml";
pub const DEFAULT_ISSUES_DIR: &str = "planning/issues";
pub const DEFAULT_DOCS_DIR: &str = "planning/docs";
pub const DEFAULT_LABELS_FILE: &str = "planning/labels.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn roadmap_dir(root: &Path) -> PathBuf {
    root.join(ROADMAP_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

/// Resolve a configured path against the project root. Absolute paths are
/// returned unchanged.
pub fn resolve(root: &Path, configured: &Path) -> PathBuf {
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        root.join(configured)
    }
}

/// Display `path` relative to `root` when it lives under it.
pub fn relative_display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
