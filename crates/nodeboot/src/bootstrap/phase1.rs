//! First bootstrap phase: everything that must happen before logging exists.
//!
//! Nothing in this module logs. Failures are returned to the supervisor,
//! which prints them verbatim on the diagnostic stream.

use std::io::Read;

use thiserror::Error;

use nodeboot_config::{NodePaths, SettingsError};
use nodeboot_types::{FrameError, StartupArgs};

use super::phase::{BootstrapPhase, PhaseError, PhaseTracker};
use crate::channel::{ArgumentMode, ControllerChannel, SignalMode};
use crate::console::{Console, ConsoleLoader};
use crate::security::{
    PolicyGate, PropertySource, SecurityError, SecurityProperties, apply_overrides,
};
use crate::telemetry::{LogLocation, LoggingConfigurator, TelemetryError};

/// Collaborators consulted by the first phase.
#[derive(Clone, Copy)]
pub struct Phase1Deps<'a> {
    /// Source of the security overrides.
    pub properties: &'a dyn PropertySource,
    /// Decides the console binding.
    pub console: &'a dyn ConsoleLoader,
    /// Configures logging.
    pub logging: &'a dyn LoggingConfigurator,
}

/// State handed from the first phase to the second.
#[derive(Debug)]
pub struct Phase1Output<R> {
    /// Decoded startup record.
    pub args: StartupArgs,
    /// Controller input stream, now waiting for the shutdown signal.
    pub channel: ControllerChannel<R, SignalMode>,
    /// Minimal environment.
    pub paths: NodePaths,
    /// Console binding, if any.
    pub console: Option<Console>,
    /// Where the node logs.
    pub log_location: LogLocation,
    /// Security properties in effect.
    pub security: SecurityProperties,
    /// Policy gate, still permissive.
    pub gate: PolicyGate,
}

/// Failures of the first phase. All of them exit with the unknown-error code.
#[derive(Debug, Error)]
pub enum Phase1Error {
    /// A security override was malformed.
    #[error("failed to apply security overrides")]
    Security {
        /// Underlying error.
        #[source]
        source: SecurityError,
    },
    /// The startup record could not be decoded.
    #[error("failed to read startup arguments from the controller")]
    Arguments {
        /// Underlying decode error.
        #[source]
        source: FrameError,
    },
    /// The minimal environment could not be resolved.
    #[error("failed to resolve the node environment")]
    Environment {
        /// Underlying settings error.
        #[source]
        source: SettingsError,
    },
    /// Logging could not be configured.
    #[error("failed to configure logging")]
    Logging {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// A step ran out of order.
    #[error(transparent)]
    Phase(#[from] PhaseError),
}

/// Runs the first phase against the controller's input stream.
///
/// On failure the tracker is moved to [`BootstrapPhase::Failed`].
///
/// # Errors
///
/// Returns the [`Phase1Error`] of the first step that failed.
pub fn run<R: Read>(
    deps: Phase1Deps<'_>,
    tracker: &mut PhaseTracker,
    channel: ControllerChannel<R, ArgumentMode>,
) -> Result<Phase1Output<R>, Phase1Error> {
    let result = run_steps(deps, tracker, channel);
    if result.is_err() {
        tracker.fail();
    }
    result
}

fn run_steps<R: Read>(
    deps: Phase1Deps<'_>,
    tracker: &mut PhaseTracker,
    channel: ControllerChannel<R, ArgumentMode>,
) -> Result<Phase1Output<R>, Phase1Error> {
    let security =
        apply_overrides(deps.properties).map_err(|source| Phase1Error::Security { source })?;
    tracker.advance(BootstrapPhase::Phase1Security)?;

    let gate = PolicyGate::permissive();
    deps.logging.register_error_listener();

    let (args, channel) = channel
        .read_args()
        .map_err(|source| Phase1Error::Arguments { source })?;
    tracker.advance(BootstrapPhase::Phase1ArgsRead)?;

    let paths = NodePaths::resolve(&args.node_settings, &args.config_dir)
        .map_err(|source| Phase1Error::Environment { source })?;
    tracker.advance(BootstrapPhase::Phase1EnvResolved)?;

    let console = deps.console.load(&paths);
    tracker.advance(BootstrapPhase::Phase1ConsoleBound)?;

    let log_location = deps
        .logging
        .configure(&paths, console.as_ref(), !args.quiet)
        .map_err(|source| Phase1Error::Logging { source })?;
    tracker.advance(BootstrapPhase::Phase1LoggingConfigured)?;

    Ok(Phase1Output {
        args,
        channel,
        paths,
        console,
        log_location,
        security,
        gate,
    })
}
