//! The startup record sent by the controller.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{KeystorePassword, Settings};

/// Startup record sent once by the controller before anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupArgs {
    /// Node settings resolved by the controller.
    pub node_settings: Settings,
    /// Directory holding the node's configuration files.
    pub config_dir: PathBuf,
    /// Password for the secure settings store; empty when none is set.
    #[serde(default)]
    pub keystore_password: KeystorePassword,
    /// Absolute path of the pid file to maintain, if any.
    #[serde(default)]
    pub pid_file: Option<PathBuf>,
    /// Whether the server detaches from the controller once ready.
    #[serde(default)]
    pub daemonize: bool,
    /// Whether console logging is suppressed.
    #[serde(default)]
    pub quiet: bool,
}

impl StartupArgs {
    /// Builds an attached, non-quiet record without a pid file or password.
    #[must_use]
    pub fn new(node_settings: Settings, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            node_settings,
            config_dir: config_dir.into(),
            keystore_password: KeystorePassword::default(),
            pid_file: None,
            daemonize: false,
            quiet: false,
        }
    }
}
