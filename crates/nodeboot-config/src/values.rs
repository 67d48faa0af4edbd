//! Typed access to individual node settings.

use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use nodeboot_types::Settings;

use crate::defaults::{DEFAULT_CLUSTER_NAME, DEFAULT_NODE_NAME};
use crate::keys;

/// Errors raised while interpreting node settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A required setting was absent.
    #[error("missing required setting [{key}]")]
    Missing {
        /// Setting key.
        key: &'static str,
    },
    /// A setting value could not be parsed.
    #[error("failed to parse [{key}] with value [{value}]: {reason}")]
    Invalid {
        /// Setting key.
        key: &'static str,
        /// Offending value.
        value: String,
        /// Parser message.
        reason: String,
    },
    /// A path setting that must be absolute was relative.
    #[error("setting [{key}] must be an absolute path, got '{}'", path.display())]
    RelativePath {
        /// Setting key.
        key: &'static str,
        /// Offending path.
        path: PathBuf,
    },
    /// A name used as a file name component was not a plain name.
    #[error("setting [{key}] must be a plain file name, got '{value}'")]
    UnsafeName {
        /// Setting key.
        key: &'static str,
        /// Offending value.
        value: String,
    },
}

pub(crate) fn parse_setting<T>(
    settings: &Settings,
    key: &'static str,
) -> Result<Option<T>, SettingsError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    settings
        .get(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|error| SettingsError::Invalid {
                key,
                value: raw.to_owned(),
                reason: error.to_string(),
            })
        })
        .transpose()
}

/// Returns the `(node name, cluster name)` pair with defaults applied.
#[must_use]
pub fn node_identity(settings: &Settings) -> (&str, &str) {
    (
        settings.get(keys::NODE_NAME).unwrap_or(DEFAULT_NODE_NAME),
        settings
            .get(keys::CLUSTER_NAME)
            .unwrap_or(DEFAULT_CLUSTER_NAME),
    )
}

/// Rejects names that would escape the directory they are joined onto.
pub(crate) fn file_name_component(key: &'static str, value: &str) -> Result<(), SettingsError> {
    let unsafe_name = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0']);
    if unsafe_name {
        return Err(SettingsError::UnsafeName {
            key,
            value: value.to_owned(),
        });
    }
    Ok(())
}
