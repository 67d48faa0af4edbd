//! Filesystem layout derived from the node settings.
//!
//! Resolution only needs plain settings and the configuration directory, so
//! it can run during the first bootstrap phase before secrets are decoded or
//! logging exists.

use std::path::{Path, PathBuf};

use nodeboot_types::Settings;

use crate::defaults::{DEFAULT_DATA_DIR, DEFAULT_LOGS_DIR};
use crate::keys;
use crate::logging::LogSettings;
use crate::values::{SettingsError, file_name_component, node_identity};

/// Canonical node paths and identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePaths {
    home: PathBuf,
    config: PathBuf,
    logs: PathBuf,
    data: Vec<PathBuf>,
    node_name: String,
    cluster_name: String,
    log: LogSettings,
}

impl NodePaths {
    /// Resolves the layout from the settings and configuration directory.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when the home is missing or relative, the
    /// cluster name cannot be used as a log file name, or a logging option is
    /// invalid.
    pub fn resolve(settings: &Settings, config_dir: &Path) -> Result<Self, SettingsError> {
        let home = settings
            .get(keys::PATH_HOME)
            .map(PathBuf::from)
            .ok_or(SettingsError::Missing {
                key: keys::PATH_HOME,
            })?;
        if !home.is_absolute() {
            return Err(SettingsError::RelativePath {
                key: keys::PATH_HOME,
                path: home,
            });
        }

        let config = home.join(config_dir);
        let logs = settings
            .get(keys::PATH_LOGS)
            .map_or_else(|| home.join(DEFAULT_LOGS_DIR), |raw| home.join(raw.trim()));
        let data = match settings.get(keys::PATH_DATA) {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(|entry| home.join(entry))
                .collect(),
            None => vec![home.join(DEFAULT_DATA_DIR)],
        };
        let (node_name, cluster_name) = node_identity(settings);
        file_name_component(keys::CLUSTER_NAME, cluster_name)?;
        let log = LogSettings::from_settings(settings)?;

        Ok(Self {
            node_name: node_name.to_owned(),
            cluster_name: cluster_name.to_owned(),
            home,
            config,
            logs,
            data,
            log,
        })
    }

    /// Node home directory.
    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Configuration directory.
    #[must_use]
    pub fn config(&self) -> &Path {
        &self.config
    }

    /// Log directory.
    #[must_use]
    pub fn logs(&self) -> &Path {
        &self.logs
    }

    /// Data directories.
    #[must_use]
    pub fn data(&self) -> &[PathBuf] {
        &self.data
    }

    /// Node name.
    #[must_use]
    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// Cluster name.
    #[must_use]
    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    /// Logging options.
    #[must_use]
    pub fn log(&self) -> &LogSettings {
        &self.log
    }

    /// Log file written by the node: `<logs>/<cluster name>.log`.
    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.logs.join(format!("{}.log", self.cluster_name))
    }
}
