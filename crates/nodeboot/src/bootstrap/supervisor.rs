//! Drives both phases and completes the controller handshake.

use std::io::{self, Read, Stdin};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{info, warn};

use super::BOOTSTRAP_TARGET;
use super::phase::{BootstrapPhase, PhaseTracker};
use super::phase1::{self, Phase1Deps, Phase1Output};
use super::phase2::{self, Phase2Deps};
use crate::channel::ControllerChannel;
use crate::console::{ConsoleLoader, SystemConsoleLoader};
use crate::markers::{DiagnosticStream, render_chain};
use crate::node::NodeStarter;
use crate::outcome::ExitOutcome;
use crate::process::{ControllerStream, ExitHooks, ShutdownMonitor, StdStream, Terminator};
use crate::security::{EnvPropertySource, PropertySource};
use crate::telemetry::{LoggingConfigurator, TelemetryConfigurator};

/// The three streams shared with the controller.
#[derive(Debug)]
pub struct ControllerIo<R, O, E> {
    /// Argument and shutdown channel.
    pub input: R,
    /// Output stream, closed when the node detaches.
    pub output: O,
    /// Diagnostic stream carrying the marker protocol.
    pub diagnostics: E,
}

impl ControllerIo<Stdin, StdStream, StdStream> {
    /// The process's standard streams.
    #[must_use]
    pub fn stdio() -> Self {
        Self {
            input: io::stdin(),
            output: StdStream::Stdout,
            diagnostics: StdStream::Stderr,
        }
    }
}

/// How bootstrap ended.
#[derive(Debug)]
pub enum Boot {
    /// Bootstrap failed; the process must exit with this outcome.
    Failed(ExitOutcome),
    /// The node is serving and has detached from the controller.
    Detached,
    /// The node is serving and the shutdown monitor is running.
    Attached(JoinHandle<()>),
}

/// Result of [`Supervisor::boot`] with the phases it went through.
#[derive(Debug)]
pub struct BootReport {
    /// How bootstrap ended.
    pub boot: Boot,
    /// Every phase entered, oldest first.
    pub history: Vec<BootstrapPhase>,
}

impl BootReport {
    /// Final phase.
    #[must_use]
    pub fn phase(&self) -> BootstrapPhase {
        self.history
            .last()
            .copied()
            .unwrap_or(BootstrapPhase::NotStarted)
    }

    fn new(boot: Boot, tracker: PhaseTracker) -> Self {
        Self {
            boot,
            history: tracker.history().to_vec(),
        }
    }
}

/// Runs the startup sequence on behalf of a [`NodeStarter`].
pub struct Supervisor<N> {
    starter: N,
    hooks: Arc<ExitHooks>,
    terminator: Arc<dyn Terminator>,
    properties: Box<dyn PropertySource>,
    console: Box<dyn ConsoleLoader>,
    logging: Box<dyn LoggingConfigurator>,
}

impl<N: NodeStarter> Supervisor<N> {
    /// Builds a supervisor with the production collaborators.
    ///
    /// `hooks` receives the pid file cleanup; `terminator` is handed to the
    /// shutdown monitor and should drain the same registry.
    #[must_use]
    pub fn new(starter: N, hooks: Arc<ExitHooks>, terminator: Arc<dyn Terminator>) -> Self {
        Self {
            starter,
            hooks,
            terminator,
            properties: Box::new(EnvPropertySource),
            console: Box::new(SystemConsoleLoader),
            logging: Box::new(TelemetryConfigurator),
        }
    }

    /// Replaces the source of security overrides.
    #[must_use]
    pub fn with_properties(mut self, properties: impl PropertySource + 'static) -> Self {
        self.properties = Box::new(properties);
        self
    }

    /// Replaces the console loader.
    #[must_use]
    pub fn with_console_loader(mut self, console: impl ConsoleLoader + 'static) -> Self {
        self.console = Box::new(console);
        self
    }

    /// Replaces the logging configurator.
    #[must_use]
    pub fn with_logging(mut self, logging: impl LoggingConfigurator + 'static) -> Self {
        self.logging = Box::new(logging);
        self
    }

    /// Runs both phases against the controller's streams.
    ///
    /// On success the ready marker has been written and the node is either
    /// detached, with both output streams closed, or attached with the
    /// shutdown monitor owning the exit decision. On failure the diagnostic
    /// stream has received the report and the returned outcome must be used
    /// to exit.
    pub fn boot<R, O, E>(&self, io: ControllerIo<R, O, E>) -> BootReport
    where
        R: Read + Send + 'static,
        O: ControllerStream,
        E: ControllerStream,
    {
        let ControllerIo {
            input,
            output,
            diagnostics,
        } = io;
        let mut diagnostics = DiagnosticStream::new(diagnostics);
        let mut tracker = PhaseTracker::new();

        let deps = Phase1Deps {
            properties: &*self.properties,
            console: &*self.console,
            logging: &*self.logging,
        };
        let mut booted = match phase1::run(deps, &mut tracker, ControllerChannel::new(input)) {
            Ok(booted) => booted,
            Err(error) => {
                diagnostics.print_failure(&error);
                let outcome = ExitOutcome::UnknownError {
                    cause: render_chain(&error),
                };
                return BootReport::new(Boot::Failed(outcome), tracker);
            }
        };
        info!(
            target: BOOTSTRAP_TARGET,
            node = booted.paths.node_name(),
            cluster = booted.paths.cluster_name(),
            daemonize = booted.args.daemonize,
            "logging configured; starting second bootstrap phase"
        );

        let deps = Phase2Deps {
            starter: &self.starter,
            hooks: &self.hooks,
        };
        if let Err(error) = phase2::run(deps, &mut tracker, &mut booted) {
            let outcome = phase2::report_failure(&error, &mut diagnostics, &booted.log_location);
            return BootReport::new(Boot::Failed(outcome), tracker);
        }

        let boot = self.complete(booted, &mut tracker, diagnostics, output);
        BootReport::new(boot, tracker)
    }

    fn complete<R, O, E>(
        &self,
        booted: Phase1Output<R>,
        tracker: &mut PhaseTracker,
        mut diagnostics: DiagnosticStream<E>,
        mut output: O,
    ) -> Boot
    where
        R: Read + Send + 'static,
        O: ControllerStream,
        E: ControllerStream,
    {
        if let Err(error) = diagnostics.emit_ready() {
            tracker.fail();
            return Boot::Failed(ExitOutcome::UnknownError {
                cause: render_chain(&error),
            });
        }
        if let Err(error) = tracker.advance(BootstrapPhase::Ready) {
            tracker.fail();
            return Boot::Failed(ExitOutcome::UnknownError {
                cause: error.to_string(),
            });
        }
        info!(target: BOOTSTRAP_TARGET, "node ready");

        if booted.args.daemonize {
            if let Err(error) = diagnostics.close() {
                warn!(target: BOOTSTRAP_TARGET, %error, "failed to close the diagnostic stream");
            }
            if let Err(error) = output.close() {
                warn!(target: BOOTSTRAP_TARGET, %error, "failed to close the output stream");
            }
            info!(target: BOOTSTRAP_TARGET, "detached from the controller");
            return Boot::Detached;
        }

        match ShutdownMonitor::spawn(booted.channel, Arc::clone(&self.terminator)) {
            Ok(handle) => Boot::Attached(handle),
            Err(error) => Boot::Failed(ExitOutcome::UnknownError {
                cause: format!("failed to start the shutdown monitor: {error}"),
            }),
        }
    }
}
