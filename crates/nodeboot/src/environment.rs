//! Environment handed to the node once bootstrap has resolved it.

use std::path::Path;

use nodeboot_config::NodePaths;
use nodeboot_types::{KeystorePassword, Settings};

/// Environment handed to the node once secrets are available.
///
/// The keystore password is zeroed when the environment is dropped.
#[derive(Debug)]
pub struct ResolvedEnvironment {
    paths: NodePaths,
    settings: Settings,
    keystore_password: KeystorePassword,
}

impl ResolvedEnvironment {
    /// Completes the minimal environment with the settings and secrets.
    #[must_use]
    pub fn new(paths: NodePaths, settings: Settings, keystore_password: KeystorePassword) -> Self {
        Self {
            paths,
            settings,
            keystore_password,
        }
    }

    /// Filesystem layout and identity.
    #[must_use]
    pub fn paths(&self) -> &NodePaths {
        &self.paths
    }

    /// Node settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Keystore password.
    #[must_use]
    pub fn keystore_password(&self) -> &KeystorePassword {
        &self.keystore_password
    }

    /// Configuration directory.
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        self.paths.config()
    }
}
