use crate::output::print_json;
use anyhow::Context;
use roadmap_core::{config::Config, paths};
use std::path::Path;

pub fn run(root: &Path, repo: Option<&str>, json: bool) -> anyhow::Result<()> {
    let config_path = paths::config_path(root);
    let created = !config_path.exists();

    if created {
        let cfg = match repo {
            Some(slug) => {
                let (owner, name) = slug
                    .split_once('/')
                    .filter(|(o, n)| !o.is_empty() && !n.is_empty() && !n.contains('/'))
                    .with_context(|| format!("invalid --repo '{slug}': expected owner/name"))?;
                Config::new(owner, name)
            }
            None => {
                let name = root
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Config::new("", name)
            }
        };
        cfg.save(root).context("failed to write config.yaml")?;
    }

    if json {
        print_json(&serde_json::json!({
            "root": root.display().to_string(),
            "config": paths::CONFIG_FILE,
            "created": created,
        }))?;
    } else {
        println!("Initializing roadmap in: {}", root.display());
        if created {
            println!("  created: {}", paths::CONFIG_FILE);
        } else {
            println!("  exists:  {}", paths::CONFIG_FILE);
        }
    }
    Ok(())
}
