// src/engine/commands.rs

//! Console command parsing.

use super::ActionName;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// List the browser's current directory.
    List,
    /// Navigate to an entry (index or name) or a path.
    ChangeDir(String),
    /// Open an entry: folders navigate, files go to the OS default handler.
    Open(String),
    Actions,
    RunAction(ActionName),
    /// Run a raw shell command line.
    Exec(String),
    Kill,
    Status,
    Clear,
    Help,
    Quit,
}

/// Parse one console line. `None` for blank input.
///
/// A single unknown word is taken as an action name, so `build-game` works
/// as well as `run build-game`. A bare `run` is the action named `run`.
pub fn parse_command(line: &str) -> Option<Result<ConsoleCommand, String>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    let needs_arg = |cmd: fn(String) -> ConsoleCommand, usage: &str| {
        if rest.is_empty() {
            Err(format!("usage: {usage}"))
        } else {
            Ok(cmd(rest.to_string()))
        }
    };

    let parsed = match head {
        "ls" | "list" => Ok(ConsoleCommand::List),
        "cd" => needs_arg(ConsoleCommand::ChangeDir, "cd <entry|path>"),
        "open" => needs_arg(ConsoleCommand::Open, "open <entry>"),
        "actions" => Ok(ConsoleCommand::Actions),
        "run" if rest.is_empty() => Ok(ConsoleCommand::RunAction("run".to_string())),
        "run" => Ok(ConsoleCommand::RunAction(rest.to_string())),
        "exec" => needs_arg(ConsoleCommand::Exec, "exec <command line>"),
        "kill" | "stop" => Ok(ConsoleCommand::Kill),
        "status" => Ok(ConsoleCommand::Status),
        "clear" => Ok(ConsoleCommand::Clear),
        "help" | "?" => Ok(ConsoleCommand::Help),
        "quit" | "exit" | "q" => Ok(ConsoleCommand::Quit),
        action if rest.is_empty() => Ok(ConsoleCommand::RunAction(action.to_string())),
        other => Err(format!("unknown command: {other}")),
    };

    Some(parsed)
}
