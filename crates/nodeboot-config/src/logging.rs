use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use nodeboot_types::Settings;

use crate::defaults::{default_log_filter, default_log_format};
use crate::keys;
use crate::values::{SettingsError, parse_setting};

/// Supported logging output formats.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Structured JSON suitable for ingestion by logging stacks.
    #[default]
    Json,
    /// Human-readable single line output.
    Compact,
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;

/// Colour handling for console log output.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ConsoleMode {
    /// Colour only when the console is interactive.
    #[default]
    Auto,
    /// Always emit ANSI colour codes.
    Always,
    /// Never emit ANSI colour codes.
    Never,
}

/// Logging options extracted from the node settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Tracing filter expression.
    pub filter: String,
    /// File log format.
    pub format: LogFormat,
    /// Console colour mode.
    pub console: ConsoleMode,
}

impl LogSettings {
    /// Reads the logging options, applying defaults for absent keys.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] when the format or console mode is
    /// not recognised.
    pub fn from_settings(settings: &Settings) -> Result<Self, SettingsError> {
        let filter = settings
            .get(keys::LOG_FILTER)
            .map_or_else(|| default_log_filter().to_owned(), str::to_owned);
        let format = parse_setting(settings, keys::LOG_FORMAT)?.unwrap_or_else(default_log_format);
        let console = parse_setting(settings, keys::LOG_CONSOLE)?.unwrap_or_default();
        Ok(Self {
            filter,
            format,
            console,
        })
    }
}
