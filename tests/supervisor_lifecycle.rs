#![cfg(unix)]

mod common;
use crate::common::{init_tracing, supervisor, with_timeout};

use std::error::Error;
use std::time::{Duration, Instant};

use assetrun::decode::{LineCategory, decode};
use assetrun::errors::AssetRunError;
use assetrun::exec::{ProcessSupervisor, SessionOutcome, SessionState, SupervisorSettings, SupervisorState};
use assetrun::types::{LaunchPolicy, StreamKind};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn echo_produces_one_success_line_and_exit_zero() -> TestResult {
    init_tracing();
    let sup = supervisor(LaunchPolicy::Reject);

    let handle = sup.launch("echo hello")?;
    let streams = sup.stream(&handle)?;
    let (output, outcome) = with_timeout(async { tokio::join!(streams.collect(), sup.wait(&handle)) }).await;

    assert_eq!(output.stdout.len(), 1);
    assert_eq!(output.stdout[0].text, "hello");
    assert_eq!(output.stdout[0].category, LineCategory::Success);
    assert!(output.stderr.is_empty());

    match outcome {
        SessionOutcome::Exited(info) => {
            assert_eq!(info.code, Some(0));
            assert!(info.success);
        }
        other => panic!("expected a natural exit, got {other:?}"),
    }
    assert_eq!(sup.state(), SupervisorState::Exited);
    Ok(())
}

#[tokio::test]
async fn colored_stderr_is_stripped_and_tagged_error() -> TestResult {
    init_tracing();
    let sup = supervisor(LaunchPolicy::Reject);

    let handle = sup.launch(r"printf '\033[31mERR\033[0m\n' >&2")?;
    let streams = sup.stream(&handle)?;
    let (output, _) = with_timeout(async { tokio::join!(streams.collect(), handle.wait()) }).await;

    assert!(output.stdout.is_empty());
    assert_eq!(output.stderr.len(), 1);
    let line = &output.stderr[0];
    assert_eq!(line.text, "ERR");
    assert_eq!(line.stream, StreamKind::Stderr);
    assert_eq!(line.category, LineCategory::Error);
    Ok(())
}

#[tokio::test]
async fn non_zero_exit_is_reported_not_an_error() -> TestResult {
    init_tracing();
    let sup = supervisor(LaunchPolicy::Reject);

    let handle = sup.launch("exit 3")?;
    let outcome = with_timeout(sup.wait(&handle)).await;

    match outcome {
        SessionOutcome::Exited(info) => {
            assert_eq!(info.code, Some(3));
            assert!(!info.success);
        }
        other => panic!("expected a natural exit, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn missing_program_is_a_spawn_error_and_leaves_supervisor_idle() -> TestResult {
    init_tracing();
    let sup = supervisor(LaunchPolicy::Reject);

    let err = sup
        .launch("assetrun-no-such-program --flag")
        .expect_err("launch should fail");
    assert!(matches!(err, AssetRunError::SpawnError { .. }), "got {err:?}");
    assert_eq!(sup.state(), SupervisorState::Idle);
    assert!(sup.current().is_none());
    Ok(())
}

#[tokio::test]
async fn without_program_lookup_the_shell_reports_127() -> TestResult {
    init_tracing();
    let sup = ProcessSupervisor::new(SupervisorSettings {
        resolve_program: false,
        ..SupervisorSettings::default()
    });

    let handle = sup.launch("assetrun-no-such-program")?;
    let streams = sup.stream(&handle)?;
    let (output, outcome) = with_timeout(async { tokio::join!(streams.collect(), handle.wait()) }).await;

    assert!(!output.stderr.is_empty());
    match outcome {
        SessionOutcome::Exited(info) => assert_eq!(info.code, Some(127)),
        other => panic!("expected a natural exit, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn terminate_after_exit_is_a_no_op() -> TestResult {
    init_tracing();
    let sup = supervisor(LaunchPolicy::Reject);

    let handle = sup.launch("true")?;
    let outcome = with_timeout(sup.wait(&handle)).await;
    assert!(matches!(outcome, SessionOutcome::Exited(_)));

    assert!(!sup.terminate(&handle));
    assert!(matches!(handle.state(), SessionState::Exited(_)));
    assert!(!sup.terminate_current());
    Ok(())
}

#[tokio::test]
async fn terminate_running_session_force_kills_it() -> TestResult {
    init_tracing();
    let sup = supervisor(LaunchPolicy::Reject);

    let handle = sup.launch("sleep 30")?;
    let streams = sup.stream(&handle)?;
    assert_eq!(sup.state(), SupervisorState::Running);

    assert!(sup.terminate(&handle));
    assert_eq!(handle.state(), SessionState::ForceKilled);
    assert!(!sup.terminate(&handle), "second terminate must be a no-op");

    let (output, outcome) = with_timeout(async { tokio::join!(streams.collect(), handle.wait()) }).await;
    assert_eq!(outcome, SessionOutcome::ForceKilled);
    assert!(output.stdout.is_empty());

    with_timeout(handle.wait_reaped()).await;
    assert_eq!(sup.state(), SupervisorState::ForceKilled);
    Ok(())
}

#[tokio::test]
async fn terminate_kills_background_children_too() -> TestResult {
    init_tracing();
    let sup = supervisor(LaunchPolicy::Reject);

    // The background sleeps hold the stdout pipe open; the streams only end
    // once every process in the tree is gone.
    let handle = sup.launch("sleep 30 & sleep 30 & echo started; wait")?;
    let mut streams = sup.stream(&handle)?;

    let first = with_timeout(streams.stdout.next_chunk()).await;
    assert!(first.is_some(), "expected the `started` line");

    assert!(sup.terminate(&handle));
    let output = with_timeout(streams.collect()).await;
    assert!(output.stdout.is_empty());
    with_timeout(handle.wait_reaped()).await;
    Ok(())
}

#[tokio::test]
async fn session_keeps_running_while_background_children_hold_the_pipes() -> TestResult {
    init_tracing();
    let sup = supervisor(LaunchPolicy::Reject);

    let handle = sup.launch("sleep 3 & echo started")?;
    let mut streams = sup.stream(&handle)?;

    let first = with_timeout(streams.stdout.next_chunk())
        .await
        .ok_or("expected the `started` line")?;
    assert_eq!(decode(&first).text, "started");

    // The shell is gone by now; the background sleep still holds stdout.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(handle.state(), SessionState::Running);
    assert_eq!(sup.state(), SupervisorState::Running);

    let err = sup.launch("echo second").expect_err("output is still streaming");
    assert!(matches!(err, AssetRunError::SessionBusy { .. }), "got {err:?}");

    let started = Instant::now();
    assert!(sup.terminate(&handle));
    let output = with_timeout(streams.collect()).await;
    assert!(output.stdout.is_empty());
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "drain took {:?} after terminate",
        started.elapsed()
    );

    assert_eq!(with_timeout(handle.wait()).await, SessionOutcome::ForceKilled);
    with_timeout(handle.wait_reaped()).await;
    Ok(())
}

#[tokio::test]
async fn natural_exit_waits_for_background_output() -> TestResult {
    init_tracing();
    let sup = supervisor(LaunchPolicy::Reject);

    let handle = sup.launch("(sleep 0.3; echo late) & echo early")?;
    let streams = sup.stream(&handle)?;
    let (output, outcome) = with_timeout(async { tokio::join!(streams.collect(), handle.wait()) }).await;

    let texts: Vec<_> = output.stdout.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, ["early", "late"]);
    assert!(matches!(outcome, SessionOutcome::Exited(info) if info.success));
    Ok(())
}

#[tokio::test]
async fn untaken_streams_do_not_keep_the_session_running() -> TestResult {
    init_tracing();
    let sup = supervisor(LaunchPolicy::Reject);

    let handle = sup.launch("echo nobody reads this; echo nor this >&2")?;
    let outcome = with_timeout(handle.wait()).await;
    assert!(matches!(outcome, SessionOutcome::Exited(info) if info.success));

    // The session drained them itself.
    let err = sup.stream(&handle).expect_err("streams were discarded");
    assert!(matches!(err, AssetRunError::StreamsTaken(_)));
    Ok(())
}

#[tokio::test]
async fn reject_policy_refuses_a_second_launch() -> TestResult {
    init_tracing();
    let sup = supervisor(LaunchPolicy::Reject);

    let first = sup.launch("sleep 30")?;
    let err = sup.launch("echo second").expect_err("second launch should be rejected");
    assert!(matches!(err, AssetRunError::SessionBusy { .. }), "got {err:?}");

    // The running session is untouched.
    assert!(first.is_running());
    assert_eq!(sup.current().map(|s| s.id()), Some(first.id()));

    with_timeout(sup.shutdown(std::time::Duration::from_secs(5))).await;
    assert_eq!(first.state(), SessionState::ForceKilled);
    Ok(())
}

#[tokio::test]
async fn replace_policy_kills_the_previous_session() -> TestResult {
    init_tracing();
    let sup = supervisor(LaunchPolicy::Replace);

    let first = sup.launch("sleep 30")?;
    let second = sup.launch("echo replaced")?;

    assert_eq!(first.state(), SessionState::ForceKilled);
    assert_ne!(first.id(), second.id());
    assert_eq!(sup.current().map(|s| s.id()), Some(second.id()));

    let streams = sup.stream(&second)?;
    let output = with_timeout(streams.collect()).await;
    assert_eq!(output.stdout.len(), 1);
    assert_eq!(output.stdout[0].text, "replaced");

    with_timeout(first.wait_reaped()).await;
    Ok(())
}

#[tokio::test]
async fn a_new_launch_is_allowed_after_the_previous_exited() -> TestResult {
    init_tracing();
    let sup = supervisor(LaunchPolicy::Reject);

    let first = sup.launch("true")?;
    with_timeout(first.wait()).await;

    let second = sup.launch("true")?;
    assert!(second.id() > first.id());
    with_timeout(second.wait()).await;
    Ok(())
}

#[tokio::test]
async fn streams_can_only_be_taken_once() -> TestResult {
    init_tracing();
    let sup = supervisor(LaunchPolicy::Reject);

    let handle = sup.launch("echo once")?;
    let streams = sup.stream(&handle)?;

    let err = sup.stream(&handle).expect_err("second take should fail");
    assert!(matches!(err, AssetRunError::StreamsTaken(id) if id == handle.id()));

    with_timeout(streams.collect()).await;
    with_timeout(handle.wait()).await;
    Ok(())
}

#[tokio::test]
async fn shutdown_terminates_the_running_session() -> TestResult {
    init_tracing();
    let sup = supervisor(LaunchPolicy::Reject);

    let handle = sup.launch("sleep 30")?;
    with_timeout(sup.shutdown(std::time::Duration::from_secs(5))).await;

    assert_eq!(handle.state(), SessionState::ForceKilled);
    // The reaper has already finished; this returns at once.
    with_timeout(handle.wait_reaped()).await;
    Ok(())
}

#[tokio::test]
async fn shutdown_when_idle_returns_immediately() -> TestResult {
    init_tracing();
    let sup = supervisor(LaunchPolicy::Reject);
    with_timeout(sup.shutdown(std::time::Duration::from_millis(100))).await;
    assert_eq!(sup.state(), SupervisorState::Idle);
    Ok(())
}
