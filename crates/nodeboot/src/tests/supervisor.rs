//! Unit tests for the phase functions and the supervisor.

use std::io::{self, Cursor};
use std::path::Path;

use rstest::rstest;

use nodeboot_config::keys;
use nodeboot_types::{KeystorePassword, Settings, StartupArgs, encode_frame, exit_codes};

use super::support::{
    FixedConsole, FixedProperties, LoggingEvent, RecordingLogging, RecordingStarter,
    SharedBuffer, StarterBehaviour, world,
};
use crate::bootstrap::phase1::{self, Phase1Deps, Phase1Output};
use crate::bootstrap::phase2::{self, Phase2Deps, Phase2Error};
use crate::bootstrap::{Boot, BootstrapPhase, PhaseTracker};
use crate::channel::{ControllerChannel, ControllerSignal};
use crate::console::Console;
use crate::markers::DiagnosticStream;
use crate::node::StartupError;
use crate::outcome::ExitOutcome;
use crate::process::{ExitHooks, MONITOR_THREAD_NAME};
use crate::security::{Policy, PolicyError};
use crate::telemetry::LogLocation;

fn record(home: &Path, password: &str) -> Vec<u8> {
    let settings = Settings::new().with(keys::PATH_HOME, home.to_string_lossy());
    let mut args = StartupArgs::new(settings, "config");
    args.keystore_password = KeystorePassword::new(password);
    encode_frame(&args).expect("encode startup record")
}

fn run_phase1(
    input: Vec<u8>,
    logging: &RecordingLogging,
    tracker: &mut PhaseTracker,
) -> Phase1Output<Cursor<Vec<u8>>> {
    let properties = FixedProperties::default();
    let console = FixedConsole(Some(Console::new(true)));
    let deps = Phase1Deps {
        properties: &properties,
        console: &console,
        logging,
    };
    phase1::run(deps, tracker, ControllerChannel::new(Cursor::new(input)))
        .expect("first phase succeeds")
}

#[rstest]
fn first_phase_leaves_the_shutdown_byte_unread() {
    let home = tempfile::tempdir().expect("node home");
    let mut input = record(home.path(), "");
    input.push(0x1B);
    let logging = RecordingLogging::default();
    let mut tracker = PhaseTracker::new();

    let booted = run_phase1(input, &logging, &mut tracker);

    assert_eq!(tracker.current(), BootstrapPhase::Phase1LoggingConfigured);
    assert_eq!(booted.channel.read_signal(), ControllerSignal::Shutdown);
}

#[rstest]
fn listener_is_registered_before_logging_is_configured() {
    let home = tempfile::tempdir().expect("node home");
    let logging = RecordingLogging::default();
    let mut tracker = PhaseTracker::new();

    let booted = run_phase1(record(home.path(), ""), &logging, &mut tracker);

    assert_eq!(
        logging.events(),
        vec![
            LoggingEvent::ListenerRegistered,
            LoggingEvent::Configured {
                console: Some(Console::new(true)),
                console_output: true,
            },
        ]
    );
    assert_eq!(booted.log_location.path(), home.path().join("logs/nodeboot.log"));
}

#[rstest]
fn second_phase_hands_the_password_over_once() {
    let home = tempfile::tempdir().expect("node home");
    let logging = RecordingLogging::default();
    let mut tracker = PhaseTracker::new();
    let mut booted = run_phase1(record(home.path(), "hunter2"), &logging, &mut tracker);
    let starter = RecordingStarter::default();
    let hooks = ExitHooks::new();

    let pid_file = phase2::run(
        Phase2Deps {
            starter: &starter,
            hooks: &hooks,
        },
        &mut tracker,
        &mut booted,
    )
    .expect("second phase succeeds");

    assert!(pid_file.is_none());
    assert_eq!(hooks.pending(), 0);
    assert_eq!(tracker.current(), BootstrapPhase::Phase2ServerInit);
    assert!(booted.args.keystore_password.is_empty());
    let starts = starter.starts();
    assert_eq!(
        starts.iter().map(|start| start.keystore_password.as_str()).collect::<Vec<_>>(),
        vec!["hunter2"]
    );
}

#[rstest]
fn second_enforcement_is_an_unexpected_failure() {
    let home = tempfile::tempdir().expect("node home");
    let logging = RecordingLogging::default();
    let mut tracker = PhaseTracker::new();
    let mut booted = run_phase1(record(home.path(), ""), &logging, &mut tracker);
    booted
        .gate
        .enforce(Policy::new(Vec::new()))
        .expect("first enforcement");
    let starter = RecordingStarter::default();
    let hooks = ExitHooks::new();

    let error = phase2::run(
        Phase2Deps {
            starter: &starter,
            hooks: &hooks,
        },
        &mut tracker,
        &mut booted,
    )
    .expect_err("second enforcement fails");

    assert!(matches!(
        error,
        Phase2Error::Policy {
            source: PolicyError::AlreadyEnforced
        }
    ));
    assert_eq!(error.outcome().exit_code(), exit_codes::UNKNOWN);
    assert_eq!(tracker.current(), BootstrapPhase::Failed);
    assert!(starter.starts().is_empty());
}

#[rstest]
fn panicking_starter_is_an_unknown_failure() {
    let home = tempfile::tempdir().expect("node home");
    let logging = RecordingLogging::default();
    let mut tracker = PhaseTracker::new();
    let mut booted = run_phase1(record(home.path(), ""), &logging, &mut tracker);
    let pid_file = home.path().join("run").join("node.pid");
    booted.args.pid_file = Some(pid_file.clone());
    let starter = RecordingStarter::default();
    starter.behave(StarterBehaviour::Panic("listener thread died".to_owned()));
    let hooks = ExitHooks::new();

    let error = phase2::run(
        Phase2Deps {
            starter: &starter,
            hooks: &hooks,
        },
        &mut tracker,
        &mut booted,
    )
    .expect_err("panic becomes a startup failure");

    let outcome = error.outcome();
    assert_eq!(outcome.kind(), "unknown_error");
    assert!(
        matches!(outcome, ExitOutcome::UnknownError { ref cause } if cause.contains("node starter panicked: listener thread died")),
        "{outcome:?}"
    );
    assert_eq!(tracker.current(), BootstrapPhase::Failed);
    assert!(pid_file.exists());
    assert_eq!(hooks.run_all(), 1);
    assert!(!pid_file.exists());
}

#[rstest]
#[case::validation(
    StartupError::Validation { message: "bad settings".to_owned() },
    exit_codes::CONFIG,
    "user_error"
)]
#[case::user(
    StartupError::User { exit_code: 3, message: "port in use".to_owned() },
    3,
    "user_error"
)]
#[case::unknown(
    StartupError::Unknown(Box::new(io::Error::other("disk on fire"))),
    exit_codes::UNKNOWN,
    "unknown_error"
)]
fn startup_failures_are_classified(
    #[case] source: StartupError,
    #[case] code: i32,
    #[case] kind: &str,
) {
    let outcome = Phase2Error::Startup { source }.outcome();

    assert_eq!(outcome.exit_code(), code);
    assert_eq!(outcome.kind(), kind);
}

#[rstest]
fn unexpected_failures_are_not_marked() {
    let buffer = SharedBuffer::default();
    let mut diagnostics = DiagnosticStream::new(buffer.clone());
    let error = Phase2Error::Startup {
        source: StartupError::Unknown(Box::new(io::Error::other("disk on fire"))),
    };

    let outcome = phase2::report_failure(
        &error,
        &mut diagnostics,
        &LogLocation::new("/srv/node/logs/alpha.log"),
    );

    assert!(matches!(outcome, ExitOutcome::UnknownError { ref cause } if cause.contains("disk on fire")));
    let text = buffer.text();
    assert!(!text.contains('\u{15}'), "{text:?}");
    assert!(text.contains("check the logs at /srv/node/logs/alpha.log"), "{text:?}");
}

#[rstest]
fn attached_boot_starts_the_named_monitor() {
    let world = world();
    let mut world = world.borrow_mut();

    world.boot();

    match &world.report().boot {
        Boot::Attached(handle) => {
            assert_eq!(handle.thread().name(), Some(MONITOR_THREAD_NAME));
        }
        other => panic!("expected an attached boot, got {other:?}"),
    }
    world.close_controller();
    assert!(world.wait_for_exit().is_some());
}

#[rstest]
fn monitor_exit_drains_the_pid_file_hook() {
    let world = world();
    let mut world = world.borrow_mut();
    let pid_file = world.use_pid_file();
    world.boot();
    assert!(pid_file.exists());
    assert_eq!(world.hooks.pending(), 1);

    world.send_byte(0x1B);
    let outcome = world.wait_for_exit();

    assert_eq!(outcome, Some(ExitOutcome::ShutdownRequested));
    assert!(!pid_file.exists());
    assert_eq!(world.hooks.pending(), 0);
}
