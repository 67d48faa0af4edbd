//! Wire types shared by the controller and the supervised server process.
//!
//! The controller launches the server with its standard streams piped. It
//! writes a single framed [`StartupArgs`] record to the server's standard
//! input, then watches standard error for the reserved markers defined in
//! [`markers`]. The same input stream later carries the one-byte shutdown
//! request. Both sides link this crate so the framing, the marker values and
//! the exit codes cannot drift apart.

mod args;
pub mod exit_codes;
mod frame;
pub mod markers;
mod password;
mod settings;

pub use args::StartupArgs;
pub use frame::{FrameError, MAX_FRAME_LEN, decode_frame, encode_frame, write_frame};
pub use password::KeystorePassword;
pub use settings::Settings;
