use std::process::ExitCode;
use std::sync::Arc;

use nodeboot::{
    Boot, CheckedNodeStarter, ControllerIo, ExitHooks, ExitOutcome, IdleNode, ProcessTerminator,
    Supervisor, SystemShutdownSignal, Terminator, render_chain, spawn_signal_watcher,
};

fn main() -> ExitCode {
    let hooks = Arc::new(ExitHooks::new());
    let terminator: Arc<dyn Terminator> = Arc::new(ProcessTerminator::new(Arc::clone(&hooks)));

    // Watched from the start so a signal during bootstrap still runs the exit
    // hooks instead of waiting behind a blocked read.
    let watcher = SystemShutdownSignal::install()
        .and_then(|signals| spawn_signal_watcher(signals, Arc::clone(&terminator)));

    let supervisor = Supervisor::new(
        CheckedNodeStarter::with_default_checks(IdleNode),
        hooks,
        Arc::clone(&terminator),
    );
    let report = supervisor.boot(ControllerIo::stdio());

    // The monitor and the watcher end the process themselves; a join that
    // returns means the thread stopped without deciding.
    let outcome = match (report.boot, watcher) {
        (Boot::Failed(outcome), _) => outcome,
        (Boot::Attached(monitor), _) => {
            monitor.join().ok();
            stalled("shutdown monitor")
        }
        (Boot::Detached, Ok(watcher)) => {
            watcher.join().ok();
            stalled("signal watcher")
        }
        (Boot::Detached, Err(error)) => ExitOutcome::UnknownError {
            cause: render_chain(&error),
        },
    };
    terminator.terminate(outcome);
    ExitCode::FAILURE
}

fn stalled(thread: &str) -> ExitOutcome {
    ExitOutcome::UnknownError {
        cause: format!("{thread} stopped without ending the process"),
    }
}
