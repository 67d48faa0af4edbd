/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Cluster name used when none is configured; also the log file stem.
pub const DEFAULT_CLUSTER_NAME: &str = "nodeboot";

/// Node name used when none is configured.
pub const DEFAULT_NODE_NAME: &str = "node-0";

/// Log directory name beneath the node home.
pub const DEFAULT_LOGS_DIR: &str = "logs";

/// Data directory name beneath the node home.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default log filter expression.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format.
#[must_use]
pub fn default_log_format() -> crate::LogFormat {
    crate::LogFormat::Json
}
