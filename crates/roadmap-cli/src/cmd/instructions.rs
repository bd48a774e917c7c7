use crate::output::print_json;
use anyhow::Context;
use roadmap_core::config::Config;
use roadmap_core::render::{agent_instructions, clamp_instructions};
use roadmap_core::{planning, RoadmapError};
use std::path::Path;

pub fn run(root: &Path, key: &str, full: bool, json: bool) -> anyhow::Result<()> {
    let config = Config::load_or_default(root).context("failed to load config")?;
    let tasks = planning::load_tasks(root, &config).context("failed to load planning data")?;
    let task = tasks
        .get(key)
        .ok_or_else(|| RoadmapError::TaskNotFound(key.to_string()))?;

    let text = agent_instructions(task);
    let text = if full {
        text
    } else {
        clamp_instructions(&text, config.agent.max_instruction_chars)
    };

    if json {
        print_json(&serde_json::json!({
            "key": task.key,
            "chars": text.chars().count(),
            "instructions": text,
        }))?;
    } else {
        println!("{text}");
    }
    Ok(())
}
