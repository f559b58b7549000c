#![cfg(unix)]

mod common;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::sync::Arc;

use assetrun::browser::FileSystemBrowser;
use assetrun::config::ConfigFile;
use assetrun::decode::LineCategory;
use assetrun::engine::{
    AppEvent, ConsoleCommand, NoticeLevel, Presentation, RunReport, Runtime, RuntimeOptions,
};
use assetrun::exec::{ProcessSupervisor, SessionOutcome, SessionState, SupervisorSettings, SupervisorState};
use assetrun::fs::mock::MockFileSystem;
use assetrun_test_utils::builders::ConfigFileBuilder;
use assetrun_test_utils::recording::{RecordingOpener, RecordingSink};

type TestResult = Result<(), Box<dyn Error>>;

struct Harness {
    sink: RecordingSink,
    supervisor: Arc<ProcessSupervisor>,
    runtime: Runtime<RecordingSink, MockFileSystem, RecordingOpener>,
}

fn harness(cfg: ConfigFile, options: RuntimeOptions) -> Harness {
    let fs = MockFileSystem::new();
    fs.add_dir("/res");

    let supervisor = Arc::new(ProcessSupervisor::new(SupervisorSettings {
        policy: cfg.config.launch_policy,
        working_dir: None,
        resolve_program: cfg.config.resolve_program,
    }));
    let browser = FileSystemBrowser::new(fs, RecordingOpener::new(), "/res");
    let sink = RecordingSink::new();
    let runtime = Runtime::new(cfg, supervisor.clone(), browser, sink.clone(), options);

    Harness {
        sink,
        supervisor,
        runtime,
    }
}

async fn run_commands(runtime: Runtime<RecordingSink, MockFileSystem, RecordingOpener>, commands: Vec<ConsoleCommand>) -> Result<RunReport, Box<dyn Error>> {
    let tx = runtime.sender();
    for command in commands {
        tx.send(AppEvent::Command(command)).await?;
    }
    drop(tx);
    Ok(with_timeout(runtime.run()).await?)
}

const ONE_SHOT: RuntimeOptions = RuntimeOptions {
    exit_when_idle: true,
};

#[tokio::test]
async fn one_shot_exec_presents_output_before_completion() -> TestResult {
    init_tracing();
    let h = harness(ConfigFileBuilder::new().build(), ONE_SHOT);

    let report = run_commands(
        h.runtime,
        vec![ConsoleCommand::Exec("echo hello; echo oops >&2".to_string())],
    )
    .await?;

    assert_eq!(report.finished.len(), 1);
    let (session, outcome) = report.finished[0];
    assert!(matches!(outcome, SessionOutcome::Exited(info) if info.code == Some(0)));
    assert!(report.launch_failures.is_empty());

    let items = h.sink.items();
    assert!(matches!(
        items.first(),
        Some(Presentation::SessionStarted { session: s, .. }) if *s == session
    ));
    assert!(matches!(
        items.last(),
        Some(Presentation::SessionFinished { session: s, .. }) if *s == session
    ));

    let lines = h.sink.lines_of(session);
    assert_eq!(lines.len(), 2);
    let hello = lines.iter().find(|l| l.text == "hello").ok_or("missing stdout line")?;
    assert_eq!(hello.category, LineCategory::Success);
    let oops = lines.iter().find(|l| l.text == "oops").ok_or("missing stderr line")?;
    assert_eq!(oops.category, LineCategory::Error);
    Ok(())
}

#[tokio::test]
async fn configured_action_runs_its_command() -> TestResult {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .with_action("greet", "echo hi from action")
        .build();
    let h = harness(cfg, ONE_SHOT);

    let report = run_commands(h.runtime, vec![ConsoleCommand::RunAction("greet".to_string())]).await?;

    let (session, _) = report.finished[0];
    let texts: Vec<_> = h.sink.lines_of(session).into_iter().map(|l| l.text).collect();
    assert_eq!(texts, ["hi from action"]);
    Ok(())
}

#[tokio::test]
async fn unknown_action_is_a_launch_failure() -> TestResult {
    init_tracing();
    let h = harness(ConfigFileBuilder::new().build(), ONE_SHOT);

    let report = run_commands(h.runtime, vec![ConsoleCommand::RunAction("nope".to_string())]).await?;

    assert!(report.finished.is_empty());
    assert_eq!(report.launch_failures.len(), 1);
    let notices = h.sink.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert!(notices[0].text.contains("nope"));
    Ok(())
}

#[tokio::test]
async fn spawn_failure_is_reported_as_a_notice() -> TestResult {
    init_tracing();
    let h = harness(ConfigFileBuilder::new().build(), ONE_SHOT);

    let report = run_commands(
        h.runtime,
        vec![ConsoleCommand::Exec("assetrun-no-such-program".to_string())],
    )
    .await?;

    assert_eq!(report.launch_failures.len(), 1);
    assert!(report.launch_failures[0].contains("failed to spawn"));
    assert_eq!(h.supervisor.state(), SupervisorState::Idle);
    assert!(
        !h.sink
            .items()
            .iter()
            .any(|i| matches!(i, Presentation::SessionStarted { .. }))
    );
    Ok(())
}

#[tokio::test]
async fn kill_command_force_kills_the_running_session() -> TestResult {
    init_tracing();
    let h = harness(ConfigFileBuilder::new().build(), ONE_SHOT);

    let report = run_commands(
        h.runtime,
        vec![
            ConsoleCommand::Exec("sleep 30".to_string()),
            ConsoleCommand::Kill,
        ],
    )
    .await?;

    assert_eq!(report.finished.len(), 1);
    assert_eq!(report.finished[0].1, SessionOutcome::ForceKilled);
    assert!(
        h.sink
            .notices()
            .iter()
            .any(|n| n.text == "termination requested")
    );
    Ok(())
}

#[tokio::test]
async fn second_launch_is_rejected_while_busy() -> TestResult {
    init_tracing();
    let cfg = ConfigFileBuilder::new().shutdown_grace("5s").build();
    let h = harness(cfg, RuntimeOptions::default());

    let tx = h.runtime.sender();
    tx.send(AppEvent::Command(ConsoleCommand::Exec("sleep 30".to_string()))).await?;
    tx.send(AppEvent::Command(ConsoleCommand::Exec("echo second".to_string()))).await?;
    tx.send(AppEvent::Command(ConsoleCommand::Status)).await?;
    tx.send(AppEvent::ShutdownRequested).await?;
    drop(tx);

    let report = with_timeout(h.runtime.run()).await?;
    assert_eq!(report.launch_failures.len(), 1);
    assert!(report.launch_failures[0].contains("already running"));

    let notices = h.sink.notices();
    assert!(notices.iter().any(|n| n.level == NoticeLevel::Error && n.text.contains("sleep 30")));
    assert!(notices.iter().any(|n| n.text.starts_with("running #1")));

    let started = h
        .sink
        .items()
        .iter()
        .filter(|i| matches!(i, Presentation::SessionStarted { .. }))
        .count();
    assert_eq!(started, 1);

    // Shutdown force-killed the running session and waited for its reaper.
    let current = h.supervisor.current().ok_or("no current session")?;
    assert_eq!(current.state(), SessionState::ForceKilled);
    Ok(())
}

#[tokio::test]
async fn actions_lists_builtin_and_configured_actions() -> TestResult {
    init_tracing();
    let cfg = ConfigFileBuilder::new().with_action("greet", "echo hi").build();
    let h = harness(cfg, RuntimeOptions::default());

    run_commands(h.runtime, vec![ConsoleCommand::Actions, ConsoleCommand::Quit]).await?;

    let rows = h
        .sink
        .items()
        .into_iter()
        .find_map(|i| match i {
            Presentation::Actions(rows) => Some(rows),
            _ => None,
        })
        .ok_or("no action table presented")?;
    assert!(rows.iter().any(|r| r.name == "greet" && r.cmd == "echo hi"));
    assert!(rows.iter().any(|r| r.name == "export"));
    Ok(())
}
