//! The bootstrap state machine.

use std::fmt;

use thiserror::Error;

/// Steps of the bootstrap sequence, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BootstrapPhase {
    /// Nothing has happened yet.
    NotStarted,
    /// Security overrides applied.
    Phase1Security,
    /// Startup record decoded.
    Phase1ArgsRead,
    /// Minimal environment resolved.
    Phase1EnvResolved,
    /// Console binding decided.
    Phase1ConsoleBound,
    /// Logging configured; the first phase is complete.
    Phase1LoggingConfigured,
    /// Pid file handled.
    Phase2PidFile,
    /// Node started.
    Phase2ServerInit,
    /// The server is serving.
    Ready,
    /// Bootstrap failed.
    Failed,
}

impl BootstrapPhase {
    /// Phase that must follow this one on success.
    #[must_use]
    pub const fn successor(self) -> Option<Self> {
        match self {
            Self::NotStarted => Some(Self::Phase1Security),
            Self::Phase1Security => Some(Self::Phase1ArgsRead),
            Self::Phase1ArgsRead => Some(Self::Phase1EnvResolved),
            Self::Phase1EnvResolved => Some(Self::Phase1ConsoleBound),
            Self::Phase1ConsoleBound => Some(Self::Phase1LoggingConfigured),
            Self::Phase1LoggingConfigured => Some(Self::Phase2PidFile),
            Self::Phase2PidFile => Some(Self::Phase2ServerInit),
            Self::Phase2ServerInit => Some(Self::Ready),
            Self::Ready | Self::Failed => None,
        }
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }

    /// Whether logging is available in this phase.
    #[must_use]
    pub fn logging_available(self) -> bool {
        self >= Self::Phase1LoggingConfigured && self != Self::Failed
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Phase1Security => "phase1_security",
            Self::Phase1ArgsRead => "phase1_args_read",
            Self::Phase1EnvResolved => "phase1_env_resolved",
            Self::Phase1ConsoleBound => "phase1_console_bound",
            Self::Phase1LoggingConfigured => "phase1_logging_configured",
            Self::Phase2PidFile => "phase2_pid_file",
            Self::Phase2ServerInit => "phase2_server_init",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for BootstrapPhase {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Rejected phase transition.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("bootstrap cannot move from {from} to {to}")]
pub struct PhaseError {
    /// Phase at the time of the request.
    pub from: BootstrapPhase,
    /// Requested phase.
    pub to: BootstrapPhase,
}

/// Enforces strictly sequential, monotonic phase transitions.
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    history: Vec<BootstrapPhase>,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self {
            history: vec![BootstrapPhase::NotStarted],
        }
    }
}

impl PhaseTracker {
    /// Builds a tracker in [`BootstrapPhase::NotStarted`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    #[must_use]
    pub fn current(&self) -> BootstrapPhase {
        self.history
            .last()
            .copied()
            .unwrap_or(BootstrapPhase::NotStarted)
    }

    /// Every phase entered so far, oldest first.
    #[must_use]
    pub fn history(&self) -> &[BootstrapPhase] {
        &self.history
    }

    /// Moves to `to`, which must be the immediate successor of the current
    /// phase.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError`] for any other transition.
    pub fn advance(&mut self, to: BootstrapPhase) -> Result<(), PhaseError> {
        let from = self.current();
        if from.successor() != Some(to) {
            return Err(PhaseError { from, to });
        }
        self.history.push(to);
        Ok(())
    }

    /// Moves to [`BootstrapPhase::Failed`] unless already terminal.
    pub fn fail(&mut self) {
        if !self.current().is_terminal() {
            self.history.push(BootstrapPhase::Failed);
        }
    }
}
