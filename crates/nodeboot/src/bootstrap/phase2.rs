//! Second bootstrap phase: policy, pid file and node startup.

use std::error::Error;
use std::io::Write;
use std::mem;
use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;
use tracing::{error, info};

use nodeboot_types::exit_codes;

use super::BOOTSTRAP_TARGET;
use super::phase::{BootstrapPhase, PhaseError, PhaseTracker};
use super::phase1::Phase1Output;
use crate::environment::ResolvedEnvironment;
use crate::markers::{DiagnosticStream, render_chain};
use crate::node::{NodeStarter, StartRequest, StarterPanic, StartupError};
use crate::outcome::ExitOutcome;
use crate::process::{ExitHooks, PidFileError, PidFileHandle, register_pid_file};
use crate::security::{Policy, PolicyError};
use crate::telemetry::LogLocation;

/// Collaborators consulted by the second phase.
#[derive(Clone, Copy)]
pub struct Phase2Deps<'a> {
    /// Starts the node.
    pub starter: &'a dyn NodeStarter,
    /// Registry receiving the pid file cleanup.
    pub hooks: &'a ExitHooks,
}

/// Failures of the second phase.
#[derive(Debug, Error)]
pub enum Phase2Error {
    /// The security policy could not be enforced.
    #[error("failed to enforce the security policy")]
    Policy {
        /// Underlying gate error.
        #[source]
        source: PolicyError,
    },
    /// The pid file could not be written.
    #[error("failed to write the pid file")]
    PidFile {
        /// Underlying pid file error.
        #[source]
        source: PidFileError,
    },
    /// The node failed to start.
    #[error("node failed to start")]
    Startup {
        /// Classified failure.
        #[source]
        source: StartupError,
    },
    /// A step ran out of order.
    #[error(transparent)]
    Phase(#[from] PhaseError),
}

impl Phase2Error {
    /// Maps the failure onto the outcome the process exits with.
    ///
    /// Validation failures exit with the configuration code, user failures
    /// with their own code; everything else is an unknown error.
    #[must_use]
    pub fn outcome(&self) -> ExitOutcome {
        match self {
            Self::Startup {
                source: StartupError::Validation { message },
            } => ExitOutcome::UserError {
                exit_code: exit_codes::CONFIG,
                message: message.clone(),
            },
            Self::Startup {
                source: StartupError::User { exit_code, message },
            } => ExitOutcome::UserError {
                exit_code: *exit_code,
                message: message.clone(),
            },
            other => ExitOutcome::UnknownError {
                cause: render_chain(other),
            },
        }
    }
}

/// Enforces the policy, writes the pid file and starts the node.
///
/// The keystore password moves out of the startup record into the resolved
/// environment and is zeroed once the starter returns. On failure the tracker
/// is moved to [`BootstrapPhase::Failed`]; side effects of a failed start are
/// not rolled back.
///
/// # Errors
///
/// Returns the [`Phase2Error`] of the first step that failed.
pub fn run<R>(
    deps: Phase2Deps<'_>,
    tracker: &mut PhaseTracker,
    booted: &mut Phase1Output<R>,
) -> Result<Option<PidFileHandle>, Phase2Error> {
    let result = run_steps(deps, tracker, booted);
    if result.is_err() {
        tracker.fail();
    }
    result
}

fn run_steps<R>(
    deps: Phase2Deps<'_>,
    tracker: &mut PhaseTracker,
    booted: &mut Phase1Output<R>,
) -> Result<Option<PidFileHandle>, Phase2Error> {
    let pid_path = booted.args.pid_file.as_deref();
    booted
        .gate
        .enforce(Policy::for_node(&booted.paths, pid_path))
        .map_err(|source| Phase2Error::Policy { source })?;
    info!(target: BOOTSTRAP_TARGET, "security policy enforced");

    let pid_file = pid_path
        .map(|path| register_pid_file(path, deps.hooks, &booted.gate))
        .transpose()
        .map_err(|source| Phase2Error::PidFile { source })?;
    tracker.advance(BootstrapPhase::Phase2PidFile)?;

    let environment = ResolvedEnvironment::new(
        booted.paths.clone(),
        booted.args.node_settings.clone(),
        mem::take(&mut booted.args.keystore_password),
    );
    let request = StartRequest {
        attached: !booted.args.daemonize,
        environment: &environment,
        pid_file: pid_file.as_ref().map(PidFileHandle::path),
        security: &booted.security,
        policy: &booted.gate,
    };
    start_node(deps.starter, &request).map_err(|source| Phase2Error::Startup { source })?;
    tracker.advance(BootstrapPhase::Phase2ServerInit)?;
    Ok(pid_file)
}

/// Invokes the starter, turning a panic into an unknown startup failure.
fn start_node(starter: &dyn NodeStarter, request: &StartRequest<'_>) -> Result<(), StartupError> {
    panic::catch_unwind(AssertUnwindSafe(|| starter.start(request))).unwrap_or_else(|payload| {
        Err(StartupError::Unknown(Box::new(StarterPanic::from_payload(
            &*payload,
        ))))
    })
}

/// Reports a second-phase failure to the controller and returns the outcome.
///
/// Recognised failures are sent as a user-error line; anything else is
/// logged in full. Either way the user is pointed at the log file.
pub fn report_failure<E: Write>(
    error: &Phase2Error,
    diagnostics: &mut DiagnosticStream<E>,
    log_location: &LogLocation,
) -> ExitOutcome {
    let outcome = error.outcome();
    match &outcome {
        ExitOutcome::UserError { exit_code, message } => {
            error!(
                target: BOOTSTRAP_TARGET,
                exit_code,
                "{message}"
            );
            diagnostics.emit_user_error(message);
        }
        _ => log_unexpected(error),
    }
    diagnostics.print_logs_hint(log_location.path());
    outcome
}

fn log_unexpected(error: &dyn Error) {
    error!(
        target: BOOTSTRAP_TARGET,
        error = %render_chain(error),
        "unexpected failure while starting the node"
    );
}
