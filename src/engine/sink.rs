// src/engine/sink.rs

//! Presentation sinks.

use std::io::{self, Write};

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};

use crate::decode::LineCategory;
use crate::exec::SessionOutcome;

use super::{NoticeLevel, Presentation};

/// Receives presentation items from the runtime, in order.
///
/// Only the runtime calls this, from a single task.
pub trait PresentationSink: Send {
    fn present(&mut self, item: Presentation) -> io::Result<()>;
}

const HELP: &str = "\
commands:
  ls                 list the current folder
  cd <entry|path>    enter a folder (`..` goes up)
  open <entry>       open a file with its default application, or enter a folder
  actions            show the configured actions
  run <action>       run an action (a bare action name works too;
                     a bare `run` is the `run` action)
  exec <cmdline>     run an arbitrary shell command line
  kill               terminate the running command
  status             show the supervisor state
  clear              clear the screen
  quit               terminate anything running and exit";

/// Writes presentation items to a terminal (or any writer), colouring
/// output lines by category.
pub struct TerminalSink<W: Write + Send> {
    out: W,
    color: bool,
}

impl TerminalSink<io::Stdout> {
    pub fn stdout(color: bool) -> Self {
        Self::new(io::stdout(), color)
    }
}

impl<W: Write + Send> TerminalSink<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn colored_line(&mut self, color: Color, text: &str) -> io::Result<()> {
        if self.color {
            queue!(
                self.out,
                SetForegroundColor(color),
                Print(text),
                ResetColor,
                Print("\n")
            )
        } else {
            writeln!(self.out, "{text}")
        }
    }

    fn bold_line(&mut self, text: &str) -> io::Result<()> {
        if self.color {
            queue!(
                self.out,
                SetAttribute(Attribute::Bold),
                Print(text),
                SetAttribute(Attribute::Reset),
                Print("\n")
            )
        } else {
            writeln!(self.out, "{text}")
        }
    }
}

impl<W: Write + Send> PresentationSink for TerminalSink<W> {
    fn present(&mut self, item: Presentation) -> io::Result<()> {
        match item {
            Presentation::SessionStarted { session, command } => {
                self.bold_line(&format!("── {session} {command} ──"))?;
            }
            Presentation::Line { line, .. } => {
                let color = match line.category {
                    LineCategory::Success => Color::Green,
                    LineCategory::Error => Color::Red,
                };
                self.colored_line(color, &line.text)?;
            }
            Presentation::SessionFinished {
                session,
                outcome,
                elapsed,
            } => {
                let secs = elapsed.as_secs_f64();
                let text = match outcome {
                    SessionOutcome::Exited(info) => match info.code {
                        Some(code) => format!("── {session} exited with code {code} ({secs:.1}s) ──"),
                        None => format!("── {session} ended by signal ({secs:.1}s) ──"),
                    },
                    SessionOutcome::ForceKilled => format!("── {session} terminated ({secs:.1}s) ──"),
                };
                self.bold_line(&text)?;
            }
            Presentation::Notice(notice) => match notice.level {
                NoticeLevel::Info => writeln!(self.out, "{}", notice.text)?,
                NoticeLevel::Warning => {
                    self.colored_line(Color::Yellow, &format!("warning: {}", notice.text))?
                }
                NoticeLevel::Error => {
                    self.colored_line(Color::Red, &format!("error: {}", notice.text))?
                }
            },
            Presentation::Listing(listing) => {
                self.bold_line(&listing.dir.display().to_string())?;
                for (idx, entry) in listing.entries.iter().enumerate() {
                    writeln!(self.out, "  {idx:>3}  {:<6}  {}", entry.kind.to_string(), entry.name)?;
                }
            }
            Presentation::Actions(rows) => {
                for row in rows {
                    let label = row.label.as_deref().unwrap_or("");
                    writeln!(self.out, "  {:<16} {:<24} {}", row.name, label, row.cmd)?;
                }
            }
            Presentation::Clear => {
                if self.color {
                    queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
                }
            }
            Presentation::Help => writeln!(self.out, "{HELP}")?,
        }
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use crate::browser::{BrowserEntry, DirListing, EntryKind};
    use crate::decode::{OutputChunk, decode};
    use crate::engine::Notice;
    use crate::exec::{ExitInfo, SessionId};
    use crate::types::StreamKind;

    fn render(items: Vec<Presentation>) -> String {
        let mut sink = TerminalSink::new(Vec::new(), false);
        for item in items {
            sink.present(item).unwrap();
        }
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn plain_rendering_of_a_session() {
        let session = SessionId(1);
        let out = render(vec![
            Presentation::SessionStarted {
                session,
                command: "build win32".into(),
            },
            Presentation::Line {
                session,
                line: decode(&OutputChunk::new(StreamKind::Stdout, 0, "\x1b[32mlinking\x1b[0m")),
            },
            Presentation::SessionFinished {
                session,
                outcome: SessionOutcome::Exited(ExitInfo {
                    code: Some(2),
                    success: false,
                }),
                elapsed: Duration::from_millis(1500),
            },
        ]);

        assert!(out.contains("#1 build win32"));
        assert!(out.contains("\nlinking\n"));
        assert!(out.contains("exited with code 2 (1.5s)"));
        assert!(!out.contains('\x1b'));
    }

    #[test]
    fn colored_output_is_wrapped_in_escape_codes() {
        let mut sink = TerminalSink::new(Vec::new(), true);
        sink.present(Presentation::Line {
            session: SessionId(1),
            line: decode(&OutputChunk::new(StreamKind::Stderr, 0, "boom")),
        })
        .unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert!(out.contains("boom"));
        assert!(out.starts_with('\x1b'));
    }

    #[test]
    fn listing_and_notices() {
        let out = render(vec![
            Presentation::Listing(DirListing {
                dir: PathBuf::from("/res"),
                entries: vec![
                    BrowserEntry {
                        name: "..".into(),
                        kind: EntryKind::Folder,
                        path: PathBuf::from("/res/.."),
                    },
                    BrowserEntry {
                        name: "hero.fbx".into(),
                        kind: EntryKind::Mesh,
                        path: PathBuf::from("/res/hero.fbx"),
                    },
                ],
            }),
            Presentation::Notice(Notice::warning("Cannot open file.")),
        ]);
        assert!(out.contains("0  Folder  .."));
        assert!(out.contains("1  Mesh    hero.fbx"));
        assert!(out.contains("warning: Cannot open file."));
    }
}
