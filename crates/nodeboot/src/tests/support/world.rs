//! Scenario world: a node home, a controller pipe and recording collaborators.

use std::cell::RefCell;
use std::io::{self, PipeWriter, Write};
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use nodeboot_config::keys;
use nodeboot_types::{KeystorePassword, Settings, StartupArgs, encode_frame};

use super::doubles::{
    FixedConsole, FixedProperties, RecordingLogging, RecordingStarter, RecordingTerminator,
};
use super::streams::SharedBuffer;
use crate::bootstrap::{Boot, BootReport, ControllerIo, Supervisor};
use crate::node::{CheckedNodeStarter, NodeStarter};
use crate::outcome::ExitOutcome;
use crate::process::{ExitHooks, Terminator};

/// Upper bound for waiting on the monitor thread.
const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Fixture constructor for the scenario world.
pub fn world() -> RefCell<BootWorld> {
    RefCell::new(BootWorld::new())
}

/// Everything a supervisor scenario sets up and observes.
pub struct BootWorld {
    home: TempDir,
    settings: Settings,
    pid_file: Option<PathBuf>,
    keystore_password: KeystorePassword,
    daemonize: bool,
    quiet: bool,
    raw_record: Option<Vec<u8>>,
    checked: bool,
    properties: FixedProperties,
    console: FixedConsole,
    pub logging: RecordingLogging,
    pub starter: Arc<RecordingStarter>,
    pub hooks: Arc<ExitHooks>,
    pub terminator: Arc<RecordingTerminator>,
    pub diagnostics: SharedBuffer,
    pub output: SharedBuffer,
    controller: Option<PipeWriter>,
    report: Option<BootReport>,
}

impl BootWorld {
    /// Builds a world with a temporary node home and cluster `alpha`.
    pub fn new() -> Self {
        let home = TempDir::new().expect("create node home");
        let settings = Settings::new()
            .with(keys::PATH_HOME, home.path().to_string_lossy())
            .with(keys::CLUSTER_NAME, "alpha");
        let hooks = Arc::new(ExitHooks::new());
        let terminator = Arc::new(RecordingTerminator::new(Arc::clone(&hooks)));
        Self {
            home,
            settings,
            pid_file: None,
            keystore_password: KeystorePassword::default(),
            daemonize: false,
            quiet: false,
            raw_record: None,
            checked: false,
            properties: FixedProperties::default(),
            console: FixedConsole::default(),
            logging: RecordingLogging::default(),
            starter: Arc::new(RecordingStarter::default()),
            hooks,
            terminator,
            diagnostics: SharedBuffer::default(),
            output: SharedBuffer::default(),
            controller: None,
            report: None,
        }
    }

    /// Node home directory.
    pub fn home(&self) -> &Path {
        self.home.path()
    }

    /// Sets a node setting.
    pub fn set(&mut self, key: &str, value: &str) {
        self.settings.insert(key, value);
    }

    /// Asks the supervisor to maintain a pid file below the node home.
    pub fn use_pid_file(&mut self) -> PathBuf {
        let path = self.home().join("run").join("node.pid");
        self.pid_file = Some(path.clone());
        path
    }

    /// Asks for a pid file at an arbitrary path.
    pub fn use_pid_file_at(&mut self, path: impl Into<PathBuf>) {
        self.pid_file = Some(path.into());
    }

    /// Configured pid file path.
    pub fn pid_path(&self) -> Option<&Path> {
        self.pid_file.as_deref()
    }

    /// Sets the keystore password sent by the controller.
    pub fn set_keystore_password(&mut self, password: &str) {
        self.keystore_password = KeystorePassword::new(password);
    }

    /// Requests detached mode.
    pub fn set_daemonize(&mut self, daemonize: bool) {
        self.daemonize = daemonize;
    }

    /// Requests quiet mode.
    pub fn set_quiet(&mut self, quiet: bool) {
        self.quiet = quiet;
    }

    /// Sends these bytes instead of a well-formed record, then closes the
    /// controller's end of the pipe.
    pub fn send_raw_record(&mut self, bytes: Vec<u8>) {
        self.raw_record = Some(bytes);
    }

    /// Supplies a raw security override.
    pub fn override_property(&mut self, name: &str, value: &str) {
        self.properties.insert(name, value);
    }

    /// Wraps the recording starter with the built-in bootstrap checks.
    pub fn use_bootstrap_checks(&mut self) {
        self.checked = true;
    }

    /// Startup record the controller sends.
    pub fn args(&self) -> StartupArgs {
        let mut args = StartupArgs::new(self.settings.clone(), "config");
        args.keystore_password = self.keystore_password.clone();
        args.pid_file = self.pid_file.clone();
        args.daemonize = self.daemonize;
        args.quiet = self.quiet;
        args
    }

    /// Expected log file location.
    pub fn log_file(&self) -> PathBuf {
        let cluster = self.settings.get(keys::CLUSTER_NAME).unwrap_or("nodeboot");
        self.home().join("logs").join(format!("{cluster}.log"))
    }

    /// Writes the record into the controller pipe and boots the supervisor.
    pub fn boot(&mut self) {
        assert!(self.report.is_none(), "supervisor already booted");
        let (reader, mut writer) = io::pipe().expect("create controller pipe");
        let record = match &self.raw_record {
            Some(bytes) => bytes.clone(),
            None => encode_frame(&self.args()).expect("encode startup record"),
        };
        writer.write_all(&record).expect("send startup record");
        if self.raw_record.is_none() {
            self.controller = Some(writer);
        } else {
            drop(writer);
        }

        let starter: Arc<dyn NodeStarter> = if self.checked {
            Arc::new(CheckedNodeStarter::with_default_checks(Arc::clone(
                &self.starter,
            )))
        } else {
            Arc::clone(&self.starter) as Arc<dyn NodeStarter>
        };
        let terminator = Arc::clone(&self.terminator) as Arc<dyn Terminator>;
        let supervisor = Supervisor::new(starter, Arc::clone(&self.hooks), terminator)
            .with_properties(self.properties.clone())
            .with_console_loader(self.console)
            .with_logging(self.logging.clone());
        self.report = Some(supervisor.boot(ControllerIo {
            input: reader,
            output: self.output.clone(),
            diagnostics: self.diagnostics.clone(),
        }));
    }

    /// Report of the completed boot.
    pub fn report(&self) -> &BootReport {
        self.report.as_ref().expect("supervisor has not booted")
    }

    /// Outcome of a failed boot.
    pub fn failure(&self) -> Option<&ExitOutcome> {
        match &self.report().boot {
            Boot::Failed(outcome) => Some(outcome),
            Boot::Attached(_) | Boot::Detached => None,
        }
    }

    /// Writes a byte on the controller's input stream.
    ///
    /// A detached node has already released its end of the pipe, so a broken
    /// pipe is not an error here.
    pub fn send_byte(&mut self, byte: u8) {
        let writer = self.controller.as_mut().expect("controller pipe open");
        match writer.write_all(&[byte]) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::BrokenPipe => {}
            Err(error) => panic!("failed to send byte to node: {error}"),
        }
    }

    /// Closes the controller's end of the input stream.
    pub fn close_controller(&mut self) {
        self.controller = None;
    }

    /// Waits for the shutdown monitor to end the process.
    pub fn wait_for_exit(&mut self) -> Option<ExitOutcome> {
        let outcome = self.terminator.wait_for_outcome(WAIT_TIMEOUT);
        if let Some(report) = self.report.as_mut() {
            if let Boot::Attached(handle) = mem::replace(&mut report.boot, Boot::Detached) {
                handle.join().expect("monitor thread panicked");
            }
        }
        outcome
    }
}
