//! Loading of simulation settings from TOML files.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use rowfall_core::SimulationConfig;

/// Reads the configuration at `path`, or the defaults when no path is given.
///
/// Keys missing from the file keep their default values.
pub(crate) fn load(path: Option<&Path>) -> Result<SimulationConfig> {
    let Some(path) = path else {
        return Ok(SimulationConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration from {}", path.display()))?;
    parse(&text).with_context(|| format!("invalid configuration in {}", path.display()))
}

fn parse(text: &str) -> Result<SimulationConfig> {
    toml::from_str(text).context("failed to parse TOML")
}
