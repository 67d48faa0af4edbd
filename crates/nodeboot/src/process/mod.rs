//! Process-level lifecycle: exit hooks, pid file, controller streams,
//! shutdown monitoring, and signal handling.

mod exit;
mod files;
mod monitor;
mod pidfile;
mod shutdown;
mod streams;

pub use exit::{ExitHooks, HookId, ProcessTerminator, Terminator};
pub use monitor::{MONITOR_THREAD_NAME, ShutdownMonitor};
pub use pidfile::{PidFileError, PidFileHandle, register_pid_file};
pub use shutdown::{
    SIGNAL_THREAD_NAME, ShutdownError, ShutdownSignal, SystemShutdownSignal, TERMINATION_SIGNALS,
    spawn_signal_watcher,
};
pub use streams::{ControllerStream, StdStream};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
