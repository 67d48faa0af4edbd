//! Startup supervisor for a server process launched by a controller.
//!
//! The controller starts the server with standard input, standard output and
//! standard error attached to pipes. It writes a single length-prefixed
//! startup record to standard input and then watches standard error, where
//! the server answers with out-of-band markers: one byte announcing that the
//! server is ready, or a marker-prefixed line describing a user-facing
//! failure. After readiness the controller either lets the server detach or
//! keeps the input stream open and later sends a single shutdown byte.
//!
//! ## Bootstrap
//!
//! [`Supervisor::boot`] runs two phases:
//!
//! 1. **Before logging**: security overrides are applied, the startup record
//!    is decoded, the node paths are resolved, the console is bound and
//!    logging is configured. Failures here are printed in full on the
//!    diagnostic stream and exit with code 1.
//! 2. **After logging**: the security policy is enforced, the pid file is
//!    written and the [`NodeStarter`] is invoked. Recognised failures are
//!    reported with the user-error marker and a classified exit code;
//!    anything else is logged and exits with code 1.
//!
//! Once the node is serving the [`ShutdownMonitor`] owns the exit decision
//! unless the node detached. Every exit path drains the [`ExitHooks`]
//! registry, so the pid file is removed however the process ends.

pub mod bootstrap;
mod channel;
mod console;
mod environment;
mod markers;
mod node;
mod outcome;
mod process;
mod security;
mod telemetry;

pub use bootstrap::{Boot, BootReport, BootstrapPhase, ControllerIo, PhaseTracker, Supervisor};
pub use channel::{ArgumentMode, ControllerChannel, ControllerSignal, SignalMode};
pub use console::{Console, ConsoleLoader, SystemConsoleLoader, ansi_enabled};
pub use environment::ResolvedEnvironment;
pub use markers::{DiagnosticStream, MarkerError, render_chain};
pub use node::{
    BootstrapCheck, CheckedNodeStarter, ClusterNameCheck, DataPathCheck, IdleNode, KeystoreCheck,
    NodeStarter, StartRequest, StarterPanic, StartupError,
};
pub use outcome::{ConnectionLostReason, ExitOutcome};
pub use process::{
    ControllerStream, ExitHooks, HookId, MONITOR_THREAD_NAME, PidFileError, PidFileHandle,
    ProcessTerminator, SIGNAL_THREAD_NAME, ShutdownError, ShutdownMonitor, ShutdownSignal,
    StdStream, SystemShutdownSignal, TERMINATION_SIGNALS, Terminator, register_pid_file,
    spawn_signal_watcher,
};
pub use security::{
    EnvPropertySource, Permission, Policy, PolicyError, PolicyGate, PolicyState, PropertySource,
    SecurityError, SecurityProperties, apply_overrides,
};
pub use telemetry::{
    ErrorListener, LogLocation, LoggingConfigurator, TelemetryConfigurator, TelemetryError,
    validated_filter,
};

#[cfg(test)]
mod tests;
