//! Interpretation of the node settings handed over by the controller.
//!
//! The supervisor core treats [`nodeboot_types::Settings`] as opaque. This
//! crate owns the well-known keys, their defaults, and the derivation of the
//! filesystem layout the bootstrap sequence needs before secrets or logging
//! are available.

pub mod defaults;
pub mod keys;
mod logging;
mod paths;
mod values;

pub use logging::{ConsoleMode, LogFormat, LogFormatParseError, LogSettings};
pub use paths::NodePaths;
pub use values::{SettingsError, node_identity};
