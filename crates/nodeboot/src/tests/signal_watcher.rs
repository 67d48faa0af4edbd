//! Tests for the thread that turns termination signals into an exit.

use std::sync::Arc;
use std::time::Duration;

use rstest::rstest;

use super::support::RecordingTerminator;
use crate::outcome::ExitOutcome;
use crate::process::{
    ExitHooks, SIGNAL_THREAD_NAME, ShutdownError, ShutdownSignal, Terminator,
    spawn_signal_watcher,
};

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Listener that reports a fixed result instead of waiting.
struct FixedSignal(Option<i32>);

impl ShutdownSignal for FixedSignal {
    fn wait(&self) -> Result<i32, ShutdownError> {
        self.0.ok_or(ShutdownError::Closed)
    }
}

fn terminator() -> (Arc<ExitHooks>, Arc<RecordingTerminator>) {
    let hooks = Arc::new(ExitHooks::new());
    let terminator = Arc::new(RecordingTerminator::new(Arc::clone(&hooks)));
    (hooks, terminator)
}

#[rstest]
fn signal_terminates_through_the_exit_hooks() {
    let (hooks, recording) = terminator();
    hooks.register("pid file", || {});

    let handle = spawn_signal_watcher(
        FixedSignal(Some(15)),
        Arc::clone(&recording) as Arc<dyn Terminator>,
    )
    .expect("watcher spawns");

    assert_eq!(handle.thread().name(), Some(SIGNAL_THREAD_NAME));
    assert_eq!(
        recording.wait_for_outcome(WAIT_TIMEOUT),
        Some(ExitOutcome::Terminated { signal: 15 })
    );
    handle.join().expect("watcher thread finishes");
    assert_eq!(hooks.pending(), 0);
}

#[rstest]
fn closed_listener_stops_without_terminating() {
    let (hooks, recording) = terminator();
    hooks.register("pid file", || {});

    spawn_signal_watcher(FixedSignal(None), Arc::clone(&recording) as Arc<dyn Terminator>)
        .expect("watcher spawns")
        .join()
        .expect("watcher thread finishes");

    assert!(recording.outcomes().is_empty());
    assert_eq!(hooks.pending(), 1);
}
