// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `assetrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetrun",
    version,
    about = "Browse game resources and run asset pipeline scripts with live output.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `AssetRun.toml` in the current working directory; built-in
    /// actions are used if it does not exist.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Disable coloured output.
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a configured action and stream its output.
    Run {
        /// Action name, e.g. `build-platform`.
        action: String,
    },
    /// Run an arbitrary shell command line and stream its output.
    Exec {
        /// The command line; joined with spaces and passed to the shell.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        cmdline: Vec<String>,
    },
    /// Print the configured actions.
    Actions,
    /// List a directory the way the browser does.
    Ls {
        /// Directory to list; defaults to the configured resource folder.
        dir: Option<String>,
    },
    /// Open a file with the OS default application.
    Open { path: String },
    /// Interactive console: browse resources and trigger actions.
    Console,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
