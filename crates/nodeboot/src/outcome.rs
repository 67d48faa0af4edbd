//! Terminal outcomes of a supervised process and their exit codes.

use std::fmt;
use std::io;

use nodeboot_types::exit_codes;

/// Why the controller connection is considered gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionLostReason {
    /// The input stream reached end of file.
    EndOfStream,
    /// The controller sent a byte other than the shutdown marker.
    UnexpectedByte(u8),
    /// Reading the input stream failed.
    Io(io::ErrorKind),
}

impl fmt::Display for ConnectionLostReason {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndOfStream => formatter.write_str("controller closed the input stream"),
            Self::UnexpectedByte(byte) => {
                write!(formatter, "controller sent unexpected byte {byte:#04x}")
            }
            Self::Io(kind) => write!(formatter, "reading from the controller failed: {kind}"),
        }
    }
}

/// How the process ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Normal completion.
    Success,
    /// A recognised failure to surface to the end user.
    UserError {
        /// Classified exit code.
        exit_code: i32,
        /// Message shown to the user.
        message: String,
    },
    /// An unrecognised failure.
    UnknownError {
        /// Rendered cause.
        cause: String,
    },
    /// The controller requested a graceful shutdown.
    ShutdownRequested,
    /// The controller connection became unusable.
    ConnectionLost {
        /// What happened to the connection.
        reason: ConnectionLostReason,
    },
    /// A termination signal was delivered to the process.
    Terminated {
        /// Signal number.
        signal: i32,
    },
}

impl ExitOutcome {
    /// Process exit code for this outcome.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Success | Self::ShutdownRequested => exit_codes::OK,
            Self::UserError { exit_code, .. } => *exit_code,
            Self::UnknownError { .. } | Self::ConnectionLost { .. } => exit_codes::UNKNOWN,
            Self::Terminated { signal } => exit_codes::SIGNAL_BASE + signal,
        }
    }

    /// Stable label for telemetry. Outcomes sharing an exit code keep
    /// distinct labels.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::UserError { .. } => "user_error",
            Self::UnknownError { .. } => "unknown_error",
            Self::ShutdownRequested => "shutdown_requested",
            Self::ConnectionLost { .. } => "connection_lost",
            Self::Terminated { .. } => "terminated",
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => formatter.write_str("completed"),
            Self::UserError { message, .. } => formatter.write_str(message),
            Self::UnknownError { cause } => write!(formatter, "fatal error: {cause}"),
            Self::ShutdownRequested => formatter.write_str("shutdown requested by controller"),
            Self::ConnectionLost { reason } => write!(formatter, "connection lost: {reason}"),
            Self::Terminated { signal } => write!(formatter, "terminated by signal {signal}"),
        }
    }
}
