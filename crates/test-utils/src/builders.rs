#![allow(dead_code)]

use std::collections::BTreeMap;

use assetrun::config::{ActionConfig, ConfigFile, RawConfigFile, RawConfigSection};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Goes through the same `TryFrom<RawConfigFile>` path as a loaded file.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: RawConfigSection::default(),
                action: BTreeMap::new(),
            },
        }
    }

    pub fn with_action(mut self, name: &str, cmd: &str) -> Self {
        self.config
            .action
            .insert(name.to_string(), ActionConfig::new(cmd));
        self
    }

    pub fn launch_policy(mut self, policy: &str) -> Self {
        self.config.config.launch_policy = policy.to_string();
        self
    }

    pub fn shutdown_grace(mut self, grace: &str) -> Self {
        self.config.config.shutdown_grace = grace.to_string();
        self
    }

    pub fn resource_dir(mut self, dir: &str) -> Self {
        self.config.config.resource_dir = dir.to_string();
        self
    }

    pub fn resolve_program(mut self, val: bool) -> Self {
        self.config.config.resolve_program = val;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
