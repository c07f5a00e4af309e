//! Runner configuration: optional JSON file plus command-line overrides.

use std::path::Path;

use anyhow::{Context, Result};
use engine::RunnerConfig;
use tracing::debug;

/// Parse a JSON runner configuration. Missing fields keep their defaults.
pub fn parse_runner_config(raw: &str) -> Result<RunnerConfig> {
    serde_json::from_str(raw).context("invalid runner configuration")
}

/// Load the runner configuration from `path` (if given) and apply overrides.
pub fn load_runner_config(
    path: Option<&Path>,
    max_repeats: Option<u32>,
    max_passes: Option<u32>,
) -> Result<RunnerConfig> {
    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read config file {}", path.display()))?;
            parse_runner_config(&raw)
                .with_context(|| format!("in config file {}", path.display()))?
        }
        None => RunnerConfig::default(),
    };

    if max_repeats.is_some() {
        config.max_repeat_iterations = max_repeats;
    }
    if max_passes.is_some() {
        config.max_workflow_passes = max_passes;
    }

    debug!(?config, "runner configuration loaded");
    Ok(config)
}
