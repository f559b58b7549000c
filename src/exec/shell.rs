// src/exec/shell.rs

//! Shell command construction and program pre-flight lookup.
//!
//! Commands are whole shell lines (`build win32`, `export_assets.bat`); they
//! are handed to the platform shell unparsed. The only inspection done here
//! is finding the first program word so that an unresolvable command fails
//! up front instead of spawning a shell that exits with "not found".

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

/// Builtins and keywords that never resolve to a file on `PATH`.
#[cfg(not(windows))]
const SHELL_BUILTINS: &[&str] = &[
    ".", ":", "[", "alias", "break", "case", "cd", "command", "continue", "echo", "eval",
    "exec", "exit", "export", "false", "for", "if", "kill", "printf", "pwd", "read",
    "return", "set", "shift", "source", "test", "trap", "true", "type", "ulimit", "umask",
    "unset", "wait", "while", "{", "!",
];

#[cfg(windows)]
const SHELL_BUILTINS: &[&str] = &[
    "assoc", "call", "cd", "chdir", "cls", "copy", "date", "del", "dir", "echo", "erase",
    "exit", "for", "ftype", "if", "md", "mkdir", "mklink", "move", "path", "popd", "prompt",
    "pushd", "rd", "ren", "rename", "rmdir", "set", "setlocal", "start", "time", "title",
    "type", "ver", "vol",
];

/// Build a shell command appropriate for the platform, with both output
/// pipes captured.
///
/// On Unix the child gets its own process group so the whole tree can be
/// signalled at once.
pub fn shell_command(command_line: &str, working_dir: Option<&Path>) -> Command {
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command_line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command_line);
        c
    };

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }

    cmd
}

/// Check that the first program word of `command_line` can be found.
///
/// Returns the reason on failure; callers wrap it into a spawn error.
pub fn preflight(command_line: &str, working_dir: &Path) -> Result<(), String> {
    if command_line.trim().is_empty() {
        return Err("empty command".to_string());
    }

    let Some(program) = first_program(command_line) else {
        // Not tokenizable here (e.g. unbalanced quotes); the shell decides.
        return Ok(());
    };

    if is_builtin(&program) {
        return Ok(());
    }

    match resolve_program(&program, working_dir) {
        Some(_) => Ok(()),
        None => Err(format!("program `{program}` not found")),
    }
}

/// First word of the command line that names a program.
#[cfg(not(windows))]
fn first_program(command_line: &str) -> Option<String> {
    let tokens = shell_words::split(command_line).ok()?;
    tokens
        .into_iter()
        .find(|t| !is_env_assignment(t))
}

/// `cmd.exe` has no backslash escaping, so only double quotes group.
#[cfg(windows)]
fn first_program(command_line: &str) -> Option<String> {
    let trimmed = command_line.trim_start().trim_start_matches('@');
    if let Some(rest) = trimmed.strip_prefix('"') {
        let end = rest.find('"')?;
        return Some(rest[..end].to_string());
    }
    trimmed
        .split(|c: char| c.is_whitespace() || matches!(c, '&' | '|' | '<' | '>'))
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(not(windows))]
fn is_env_assignment(token: &str) -> bool {
    match token.split_once('=') {
        Some((name, _)) => {
            !name.is_empty()
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                && !name.starts_with(|c: char| c.is_ascii_digit())
        }
        None => false,
    }
}

fn is_builtin(program: &str) -> bool {
    let lowered = program.to_lowercase();
    let name = if cfg!(windows) { lowered.as_str() } else { program };
    SHELL_BUILTINS.contains(&name) || program.starts_with('(')
}

/// Resolve a program word to a file, the way the platform shell would.
pub fn resolve_program(program: &str, working_dir: &Path) -> Option<PathBuf> {
    let path = Path::new(program);
    let has_separator = program.contains('/') || (cfg!(windows) && program.contains('\\'));

    if path.is_absolute() || has_separator {
        return with_extensions(&working_dir.join(path));
    }

    // cmd.exe looks in the current directory before PATH.
    if cfg!(windows) {
        if let Some(found) = with_extensions(&working_dir.join(path)) {
            return Some(found);
        }
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| with_extensions(&dir.join(program)))
}

fn with_extensions(candidate: &Path) -> Option<PathBuf> {
    if candidate.is_file() {
        return Some(candidate.to_path_buf());
    }
    if !cfg!(windows) {
        return None;
    }

    let pathext = std::env::var("PATHEXT").unwrap_or_else(|_| ".COM;.EXE;.BAT;.CMD".to_string());
    pathext
        .split(';')
        .filter(|ext| !ext.is_empty())
        .map(|ext| {
            let mut name = candidate.as_os_str().to_owned();
            name.push(ext);
            PathBuf::from(name)
        })
        .find(|p| p.is_file())
}
