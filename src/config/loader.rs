//! Loading simulator configuration from disk

use std::path::Path;

use tracing::info;

use super::SimulatorConfig;
use crate::{Error, Result};

/// Load configuration from a YAML file, or the defaults when no path is given
///
/// Sections missing from the file are taken from [`SimulatorConfig::default`].
/// The result is validated before it is returned.
pub fn load_from_file(path: Option<&Path>) -> Result<SimulatorConfig> {
    let Some(path) = path else {
        info!("no configuration file given, using defaults");
        return Ok(SimulatorConfig::default());
    };

    let raw = std::fs::read_to_string(path).map_err(|e| {
        Error::validation(format!(
            "failed to read config file {}: {e}",
            path.display()
        ))
    })?;

    let config = parse_config(&raw)?;
    info!(path = %path.display(), "loaded simulator configuration");
    Ok(config)
}

/// Parse and validate configuration from YAML (JSON is accepted too)
pub fn parse_config(raw: &str) -> Result<SimulatorConfig> {
    let config: SimulatorConfig = serde_yaml::from_str(raw)
        .map_err(|e| Error::validation(format!("failed to parse config: {e}")))?;
    config.validate()?;
    Ok(config)
}
