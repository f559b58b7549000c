#![cfg(unix)]

mod common;
use crate::common::{init_tracing, supervisor, with_timeout};

use std::error::Error;
use std::time::Duration;

use assetrun::exec::{SessionOutcome, SessionState};
use assetrun::types::LaunchPolicy;

type TestResult = Result<(), Box<dyn Error>>;

/// A terminate racing a natural exit must leave exactly one terminal state,
/// and whoever won decides it for every observer.
#[tokio::test]
async fn terminate_racing_exit_yields_exactly_one_terminal_state() -> TestResult {
    init_tracing();
    let sup = supervisor(LaunchPolicy::Reject);

    for round in 0..25u64 {
        let handle = sup.launch("true")?;
        if round % 2 == 1 {
            tokio::time::sleep(Duration::from_millis(round % 5)).await;
        }

        let won = sup.terminate(&handle);
        let outcome = with_timeout(handle.wait()).await;

        if won {
            assert_eq!(outcome, SessionOutcome::ForceKilled, "round {round}");
        } else {
            assert!(matches!(outcome, SessionOutcome::Exited(_)), "round {round}");
        }
        assert_eq!(handle.state().outcome(), Some(outcome), "round {round}");

        // Later calls never change the state again.
        assert!(!sup.terminate(&handle));
        with_timeout(handle.wait_reaped()).await;
        assert_eq!(handle.state().outcome(), Some(outcome), "round {round}");
    }
    Ok(())
}

#[tokio::test]
async fn concurrent_terminate_calls_only_one_wins() -> TestResult {
    init_tracing();
    let sup = std::sync::Arc::new(supervisor(LaunchPolicy::Reject));
    let handle = sup.launch("sleep 30")?;

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let sup = sup.clone();
        let handle = handle.clone();
        tasks.push(tokio::spawn(async move { sup.terminate(&handle) }));
    }

    let mut winners = 0;
    for task in tasks {
        if with_timeout(task).await? {
            winners += 1;
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(handle.state(), SessionState::ForceKilled);
    with_timeout(handle.wait_reaped()).await;
    Ok(())
}
