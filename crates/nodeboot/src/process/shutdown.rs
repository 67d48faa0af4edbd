//! Termination signals and the thread that turns them into an exit.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::{info, warn};

use super::PROCESS_TARGET;
use super::exit::Terminator;
use crate::markers::render_chain;
use crate::outcome::ExitOutcome;

/// Name of the signal watcher thread.
pub const SIGNAL_THREAD_NAME: &str = "nodeboot[signal-watcher]";

/// Signals that end the process through the exit hooks.
pub const TERMINATION_SIGNALS: [i32; 4] = [SIGTERM, SIGINT, SIGQUIT, SIGHUP];

/// Abstraction over termination signal listeners.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until a termination signal arrives and returns its number.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError::Closed`] when the listener stops without
    /// delivering a signal.
    fn wait(&self) -> Result<i32, ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The watcher thread could not be started.
    #[error("failed to spawn the signal watcher: {source}")]
    Spawn {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The signal iterator ended without delivering a signal.
    #[error("signal listener closed without delivering a signal")]
    Closed,
}

/// Shutdown listener that waits for process termination signals.
///
/// Handlers are registered when the listener is installed, so signals
/// delivered between installation and [`ShutdownSignal::wait`] are queued
/// rather than killing the process.
pub struct SystemShutdownSignal {
    signals: Mutex<Signals>,
}

impl SystemShutdownSignal {
    /// Registers handlers for [`TERMINATION_SIGNALS`].
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError::Install`] when registration fails.
    pub fn install() -> Result<Self, ShutdownError> {
        let signals =
            Signals::new(TERMINATION_SIGNALS).map_err(|source| ShutdownError::Install { source })?;
        Ok(Self {
            signals: Mutex::new(signals),
        })
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<i32, ShutdownError> {
        let mut signals = self.signals.lock().unwrap_or_else(PoisonError::into_inner);
        let signal = signals.forever().next().ok_or(ShutdownError::Closed)?;
        info!(target: PROCESS_TARGET, signal, "termination signal received");
        Ok(signal)
    }
}

/// Starts a thread that ends the process when a termination signal arrives.
///
/// The watcher runs for the whole life of the process, so a signal received
/// while bootstrap is still blocked on the controller terminates the process
/// through the exit hooks. If the listener closes without a signal the thread
/// logs the failure and stops.
///
/// # Errors
///
/// Returns [`ShutdownError::Spawn`] when the thread cannot be started.
pub fn spawn_signal_watcher<S>(
    signal: S,
    terminator: Arc<dyn Terminator>,
) -> Result<JoinHandle<()>, ShutdownError>
where
    S: ShutdownSignal + 'static,
{
    thread::Builder::new()
        .name(SIGNAL_THREAD_NAME.to_owned())
        .spawn(move || match signal.wait() {
            Ok(signal) => terminator.terminate(ExitOutcome::Terminated { signal }),
            Err(error) => warn!(
                target: PROCESS_TARGET,
                error = %render_chain(&error),
                "signal watcher stopped"
            ),
        })
        .map_err(|source| ShutdownError::Spawn { source })
}
