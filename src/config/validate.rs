// src/config/validate.rs

use std::path::PathBuf;

use crate::config::model::{
    ActionConfig, ConfigFile, ConfigSection, RawConfigFile, RawConfigSection, builtin_actions,
};
use crate::errors::{AssetRunError, Result};
use crate::types::{LaunchPolicy, parse_duration};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AssetRunError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let config = validate_section(&raw.config)?;

        let mut action = builtin_actions();

        for (name, cfg) in raw.action {
            validate_action(&name, &cfg)?;
            action.insert(name, cfg);
        }

        Ok(ConfigFile { config, action })
    }
}

fn validate_section(raw: &RawConfigSection) -> Result<ConfigSection> {
    let launch_policy: LaunchPolicy = raw
        .launch_policy
        .parse()
        .map_err(AssetRunError::ConfigError)?;

    let shutdown_grace = parse_duration(&raw.shutdown_grace)
        .map_err(|e| AssetRunError::ConfigError(format!("invalid shutdown_grace: {e}")))?;

    if raw.resource_dir.trim().is_empty() {
        return Err(AssetRunError::ConfigError(
            "resource_dir must not be empty".to_string(),
        ));
    }

    Ok(ConfigSection {
        launch_policy,
        shutdown_grace,
        resource_dir: PathBuf::from(&raw.resource_dir),
        resolve_program: raw.resolve_program,
        working_dir: raw.working_dir.as_ref().map(PathBuf::from),
    })
}

fn validate_action(name: &str, action: &ActionConfig) -> Result<()> {
    if name.trim().is_empty() || name.chars().any(char::is_whitespace) {
        return Err(AssetRunError::ConfigError(format!(
            "invalid action name {name:?}: must be non-empty without whitespace"
        )));
    }
    if action.cmd.trim().is_empty() {
        return Err(AssetRunError::ConfigError(format!(
            "action '{name}' has an empty cmd"
        )));
    }
    Ok(())
}
