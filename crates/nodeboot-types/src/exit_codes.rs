//! Process exit codes understood by the controller.
//!
//! The values follow the BSD `sysexits` convention so the controller can map
//! them onto its own reporting without a lookup table.

/// Clean termination.
pub const OK: i32 = 0;
/// Unexpected failure, or the controller connection was lost.
pub const UNKNOWN: i32 = 1;
/// The command was used incorrectly.
pub const USAGE: i32 = 64;
/// The input data was incorrect in some way.
pub const DATA_ERROR: i32 = 65;
/// An error occurred while doing I/O on some file.
pub const IO_ERROR: i32 = 74;
/// Something was found in an unconfigured or misconfigured state.
pub const CONFIG: i32 = 78;

/// Base added to a signal number when the process terminates on a signal.
pub const SIGNAL_BASE: i32 = 128;
