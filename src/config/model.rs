// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::LaunchPolicy;

/// Built-in actions, available even without a config file.
pub const DEFAULT_ACTIONS: &[(&str, &str, &str)] = &[
    ("export", "export_assets.bat", "Run Export Script"),
    ("build-game", "build n game", "Build Game"),
    ("build-platform", "build win32", "Build Platform"),
    ("build-physics", "build physics", "Build Physics"),
    ("build-tests", "build tests", "Build Tests"),
    ("run", "run", "Launch"),
    ("run-tests", "run tests", "Run Tests"),
];

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// launch_policy = "reject"
/// shutdown_grace = "2s"
/// resource_dir = "res"
///
/// [action.export]
/// cmd = "export_assets.bat"
/// label = "Run Export Script"
/// ```
///
/// All sections are optional.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: RawConfigSection,

    /// Extra or overriding actions from `[action.<name>]`.
    #[serde(default)]
    pub action: BTreeMap<String, ActionConfig>,
}

/// `[config]` section as written by the user.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigSection {
    /// `"reject"` or `"replace"`.
    #[serde(default = "default_launch_policy")]
    pub launch_policy: String,

    /// How long shutdown waits for a terminated process to be reaped.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace: String,

    /// Folder the browser starts in.
    #[serde(default = "default_resource_dir")]
    pub resource_dir: String,

    /// Look up the program of each command before spawning it.
    #[serde(default = "default_resolve_program")]
    pub resolve_program: bool,

    /// Working directory for launched commands.
    #[serde(default)]
    pub working_dir: Option<String>,
}

fn default_launch_policy() -> String {
    "reject".to_string()
}

fn default_shutdown_grace() -> String {
    "2s".to_string()
}

fn default_resource_dir() -> String {
    "res".to_string()
}

fn default_resolve_program() -> bool {
    true
}

impl Default for RawConfigSection {
    fn default() -> Self {
        Self {
            launch_policy: default_launch_policy(),
            shutdown_grace: default_shutdown_grace(),
            resource_dir: default_resource_dir(),
            resolve_program: default_resolve_program(),
            working_dir: None,
        }
    }
}

/// `[action.<name>]`: a logical action mapped to a shell command line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActionConfig {
    /// Shell command line, executed as-is.
    pub cmd: String,

    /// Human-readable label for listings.
    #[serde(default)]
    pub label: Option<String>,
}

impl ActionConfig {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    /// Built-in actions merged with the ones from the file.
    pub action: BTreeMap<String, ActionConfig>,
}

/// Validated `[config]` section.
#[derive(Debug, Clone)]
pub struct ConfigSection {
    pub launch_policy: LaunchPolicy,
    pub shutdown_grace: Duration,
    pub resource_dir: PathBuf,
    pub resolve_program: bool,
    pub working_dir: Option<PathBuf>,
}

impl ConfigFile {
    /// Look up the command line of an action.
    pub fn command_for(&self, action: &str) -> Option<&str> {
        self.action.get(action).map(|a| a.cmd.as_str())
    }
}

/// The built-in action table.
pub fn builtin_actions() -> BTreeMap<String, ActionConfig> {
    DEFAULT_ACTIONS
        .iter()
        .map(|(name, cmd, label)| (name.to_string(), ActionConfig::new(*cmd).with_label(*label)))
        .collect()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            launch_policy: LaunchPolicy::Reject,
            shutdown_grace: Duration::from_secs(2),
            resource_dir: PathBuf::from(default_resource_dir()),
            resolve_program: default_resolve_program(),
            working_dir: None,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            config: ConfigSection::default(),
            action: builtin_actions(),
        }
    }
}
