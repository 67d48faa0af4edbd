//! Recording collaborators for the supervisor.

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use nodeboot_config::NodePaths;

use crate::console::{Console, ConsoleLoader};
use crate::node::{NodeStarter, StartRequest, StartupError};
use crate::outcome::ExitOutcome;
use crate::process::{ExitHooks, Terminator};
use crate::security::{PolicyState, PropertySource};
use crate::telemetry::{LogLocation, LoggingConfigurator, TelemetryError};

/// Property source backed by a fixed map.
#[derive(Debug, Clone, Default)]
pub struct FixedProperties(BTreeMap<String, String>);

impl FixedProperties {
    /// Adds a raw property.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }
}

impl PropertySource for FixedProperties {
    fn property(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

/// Console loader returning a fixed binding.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedConsole(pub Option<Console>);

impl ConsoleLoader for FixedConsole {
    fn load(&self, _paths: &NodePaths) -> Option<Console> {
        self.0
    }
}

/// Calls observed by [`RecordingLogging`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingEvent {
    /// The error listener was registered.
    ListenerRegistered,
    /// Logging was configured.
    Configured {
        /// Console binding passed in.
        console: Option<Console>,
        /// Whether console output was requested.
        console_output: bool,
    },
}

/// Logging configurator that records its calls instead of installing a
/// subscriber.
#[derive(Debug, Clone, Default)]
pub struct RecordingLogging {
    events: Arc<Mutex<Vec<LoggingEvent>>>,
    failure: Option<String>,
}

impl RecordingLogging {
    /// Makes [`LoggingConfigurator::configure`] fail with a listener error.
    pub fn fail_with(&mut self, message: impl Into<String>) {
        self.failure = Some(message.into());
    }

    /// Calls observed so far.
    pub fn events(&self) -> Vec<LoggingEvent> {
        self.events.lock().expect("logging mutex poisoned").clone()
    }

    fn record(&self, event: LoggingEvent) {
        self.events
            .lock()
            .expect("logging mutex poisoned")
            .push(event);
    }
}

impl LoggingConfigurator for RecordingLogging {
    fn register_error_listener(&self) {
        self.record(LoggingEvent::ListenerRegistered);
    }

    fn configure(
        &self,
        paths: &NodePaths,
        console: Option<&Console>,
        console_output: bool,
    ) -> Result<LogLocation, TelemetryError> {
        self.record(LoggingEvent::Configured {
            console: console.copied(),
            console_output,
        });
        match &self.failure {
            Some(message) => Err(TelemetryError::ListenerErrors(vec![message.clone()])),
            None => Ok(LogLocation::new(paths.log_file())),
        }
    }
}

/// What the node starter does when invoked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StarterBehaviour {
    /// Start successfully.
    #[default]
    Succeed,
    /// Reject the configuration.
    Validation(String),
    /// Fail with a user-facing code.
    User(i32, String),
    /// Fail unexpectedly.
    Unknown(String),
    /// Panic instead of returning.
    Panic(String),
}

/// Snapshot of a [`StartRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRecord {
    /// Attached flag.
    pub attached: bool,
    /// Exposed keystore password.
    pub keystore_password: String,
    /// Pid file passed along.
    pub pid_file: Option<PathBuf>,
    /// Whether the policy was enforced when the node started.
    pub policy_enforced: bool,
    /// Value of the property expansion switch.
    pub expand_properties: Option<String>,
}

/// Node starter that records every request.
#[derive(Debug, Default)]
pub struct RecordingStarter {
    behaviour: Mutex<StarterBehaviour>,
    starts: Mutex<Vec<StartRecord>>,
}

impl RecordingStarter {
    /// Changes the behaviour for later starts.
    pub fn behave(&self, behaviour: StarterBehaviour) {
        *self.behaviour.lock().expect("starter mutex poisoned") = behaviour;
    }

    /// Requests received so far.
    pub fn starts(&self) -> Vec<StartRecord> {
        self.starts.lock().expect("starter mutex poisoned").clone()
    }
}

impl NodeStarter for RecordingStarter {
    fn start(&self, request: &StartRequest<'_>) -> Result<(), StartupError> {
        self.starts
            .lock()
            .expect("starter mutex poisoned")
            .push(StartRecord {
                attached: request.attached,
                keystore_password: request
                    .environment
                    .keystore_password()
                    .expose()
                    .to_owned(),
                pid_file: request.pid_file.map(PathBuf::from),
                policy_enforced: matches!(request.policy.state(), PolicyState::Enforced(_)),
                expand_properties: request
                    .security
                    .get("policy.expandProperties")
                    .map(str::to_owned),
            });
        let behaviour = self.behaviour.lock().expect("starter mutex poisoned").clone();
        match behaviour {
            StarterBehaviour::Succeed => Ok(()),
            StarterBehaviour::Validation(message) => Err(StartupError::Validation { message }),
            StarterBehaviour::User(exit_code, message) => {
                Err(StartupError::User { exit_code, message })
            }
            StarterBehaviour::Unknown(message) => {
                Err(StartupError::Unknown(Box::new(io::Error::other(message))))
            }
            StarterBehaviour::Panic(message) => panic!("{message}"),
        }
    }
}

/// Terminator that runs the exit hooks and records the outcome instead of
/// exiting.
pub struct RecordingTerminator {
    hooks: Arc<ExitHooks>,
    outcomes: Mutex<Vec<ExitOutcome>>,
    recorded: Condvar,
}

impl RecordingTerminator {
    /// Builds a terminator draining `hooks`.
    pub fn new(hooks: Arc<ExitHooks>) -> Self {
        Self {
            hooks,
            outcomes: Mutex::new(Vec::new()),
            recorded: Condvar::new(),
        }
    }

    /// Outcomes recorded so far.
    pub fn outcomes(&self) -> Vec<ExitOutcome> {
        self.outcomes
            .lock()
            .expect("terminator mutex poisoned")
            .clone()
    }

    /// Blocks until an outcome is recorded or `timeout` elapses.
    pub fn wait_for_outcome(&self, timeout: Duration) -> Option<ExitOutcome> {
        let guard = self.outcomes.lock().expect("terminator mutex poisoned");
        let (guard, _) = self
            .recorded
            .wait_timeout_while(guard, timeout, |outcomes| outcomes.is_empty())
            .expect("terminator mutex poisoned during wait");
        guard.first().cloned()
    }
}

impl Terminator for RecordingTerminator {
    fn terminate(&self, outcome: ExitOutcome) {
        self.hooks.run_all();
        self.outcomes
            .lock()
            .expect("terminator mutex poisoned")
            .push(outcome);
        self.recorded.notify_all();
    }
}
