//! Watches the controller's input stream for the shutdown request.

use std::io::{self, Read};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

use super::PROCESS_TARGET;
use super::exit::Terminator;
use crate::channel::{ControllerChannel, ControllerSignal, SignalMode};
use crate::outcome::ExitOutcome;

/// Name of the monitor thread.
pub const MONITOR_THREAD_NAME: &str = "nodeboot[controller-monitor]";

/// Background task owning the exit decision once the server is ready.
#[derive(Debug)]
pub struct ShutdownMonitor;

impl ShutdownMonitor {
    /// Starts the monitor thread.
    ///
    /// The thread performs a single blocking read. The shutdown marker maps to
    /// a graceful exit; any other byte, end of stream or read error maps to a
    /// lost connection. Either way the thread hands the outcome to the
    /// terminator and does not read again.
    ///
    /// # Errors
    ///
    /// Returns the IO error raised when the thread cannot be spawned.
    pub fn spawn<R>(
        channel: ControllerChannel<R, SignalMode>,
        terminator: Arc<dyn Terminator>,
    ) -> io::Result<JoinHandle<()>>
    where
        R: Read + Send + 'static,
    {
        thread::Builder::new()
            .name(MONITOR_THREAD_NAME.to_owned())
            .spawn(move || {
                let outcome = match channel.read_signal() {
                    ControllerSignal::Shutdown => {
                        info!(
                            target: PROCESS_TARGET,
                            "controller requested shutdown"
                        );
                        ExitOutcome::ShutdownRequested
                    }
                    ControllerSignal::Lost(reason) => {
                        warn!(
                            target: PROCESS_TARGET,
                            %reason,
                            "controller connection lost; shutting down"
                        );
                        ExitOutcome::ConnectionLost { reason }
                    }
                };
                terminator.terminate(outcome);
            })
    }
}
