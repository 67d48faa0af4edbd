//! Two-phase startup sequence driven by the controller.
//!
//! The first phase runs without logging and ends once logging is configured;
//! the second enforces the security policy, writes the pid file, starts the
//! node and completes the handshake.

mod phase;
pub mod phase1;
pub mod phase2;
mod supervisor;

pub use phase::{BootstrapPhase, PhaseError, PhaseTracker};
pub use phase1::{Phase1Deps, Phase1Error, Phase1Output};
pub use phase2::{Phase2Deps, Phase2Error};
pub use supervisor::{Boot, BootReport, ControllerIo, Supervisor};

const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");
