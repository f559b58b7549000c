// src/lib.rs

pub mod browser;
pub mod cli;
pub mod config;
pub mod console;
pub mod decode;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, anyhow};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::browser::{FileOpener, FileSystemBrowser, SystemOpener};
use crate::cli::{CliArgs, Command};
use crate::config::{ConfigFile, default_config_path, load_or_default};
use crate::engine::{
    AppEvent, ConsoleCommand, Notice, Presentation, PresentationSink, Runtime, RuntimeOptions,
    TerminalSink,
};
use crate::exec::{ProcessSupervisor, SupervisorSettings};
use crate::fs::RealFileSystem;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - supervisor / browser / runtime
/// - console input (interactive mode)
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let (config_path, explicit) = match &args.config {
        Some(path) => (PathBuf::from(path), true),
        None => (default_config_path(), false),
    };
    let mut cfg = load_or_default(&config_path, explicit)?;
    anchor_paths(&mut cfg, &config_root_dir(&config_path));

    let color = !args.no_color && std::io::stdout().is_terminal();

    match args.command {
        Command::Run { action } => {
            run_one_shot(cfg, ConsoleCommand::RunAction(action), color).await
        }
        Command::Exec { cmdline } => {
            run_one_shot(cfg, ConsoleCommand::Exec(cmdline.join(" ")), color).await
        }
        Command::Actions => {
            let rows = cfg
                .action
                .iter()
                .map(|(name, action)| engine::ActionRow {
                    name: name.clone(),
                    label: action.label.clone(),
                    cmd: action.cmd.clone(),
                })
                .collect();
            TerminalSink::stdout(color).present(Presentation::Actions(rows))?;
            Ok(())
        }
        Command::Ls { dir } => {
            let dir = dir
                .map(PathBuf::from)
                .unwrap_or_else(|| cfg.config.resource_dir.clone());
            let browser = FileSystemBrowser::new(RealFileSystem, SystemOpener, &dir);
            let listing = browser.list()?;
            TerminalSink::stdout(color).present(Presentation::Listing(listing))?;
            Ok(())
        }
        Command::Open { path } => {
            if let Err(e) = SystemOpener.open(Path::new(&path)) {
                TerminalSink::stdout(color).present(Presentation::Notice(Notice::warning(
                    format!("Cannot open file. ({e})"),
                )))?;
            }
            Ok(())
        }
        Command::Console => run_console(cfg, color).await,
    }
}

type TerminalRuntime = Runtime<TerminalSink<std::io::Stdout>, RealFileSystem, SystemOpener>;

fn build_runtime(cfg: ConfigFile, color: bool, options: RuntimeOptions) -> TerminalRuntime {
    let supervisor = Arc::new(ProcessSupervisor::new(SupervisorSettings {
        policy: cfg.config.launch_policy,
        working_dir: cfg.config.working_dir.clone(),
        resolve_program: cfg.config.resolve_program,
    }));
    let browser = FileSystemBrowser::new(RealFileSystem, SystemOpener, &cfg.config.resource_dir);

    Runtime::new(cfg, supervisor, browser, TerminalSink::stdout(color), options)
}

/// Launch one command, stream it, and return once it has finished.
///
/// A non-zero exit status is reported but not an error; a failed launch is.
async fn run_one_shot(cfg: ConfigFile, command: ConsoleCommand, color: bool) -> Result<()> {
    let runtime = build_runtime(cfg, color, RuntimeOptions {
        exit_when_idle: true,
    });
    let tx = runtime.sender();
    spawn_ctrl_c(tx.clone());

    tx.send(AppEvent::Command(command)).await?;
    let report = runtime.run().await?;

    match report.launch_failures.first() {
        Some(failure) => Err(anyhow!("{failure}")),
        None => Ok(()),
    }
}

async fn run_console(cfg: ConfigFile, color: bool) -> Result<()> {
    info!(resource_dir = %cfg.config.resource_dir.display(), "starting console");
    let runtime = build_runtime(cfg, color, RuntimeOptions::default());
    let tx = runtime.sender();
    spawn_ctrl_c(tx.clone());

    tx.send(AppEvent::Command(ConsoleCommand::List)).await?;
    console::spawn_stdin_reader(tx)?;

    let report = runtime.run().await?;
    debug!(sessions = report.finished.len(), "console finished");
    Ok(())
}

// Ctrl-C → graceful shutdown.
fn spawn_ctrl_c(tx: mpsc::Sender<AppEvent>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        let _ = tx.send(AppEvent::ShutdownRequested).await;
    });
}

/// Figure out the directory relative config paths are anchored to.
///
/// - If the config path has a non-empty parent (e.g. "tools/AssetRun.toml"),
///   we use that directory.
/// - If it's just a bare filename like "AssetRun.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn anchor_paths(cfg: &mut ConfigFile, root: &Path) {
    if cfg.config.resource_dir.is_relative() {
        cfg.config.resource_dir = root.join(&cfg.config.resource_dir);
    }
    if let Some(dir) = cfg.config.working_dir.as_mut() {
        if dir.is_relative() {
            *dir = root.join(&*dir);
        }
    }
}
