//! Well-known setting keys.

/// Node home directory. Required and absolute.
pub const PATH_HOME: &str = "path.home";
/// Log directory; relative values resolve against the home.
pub const PATH_LOGS: &str = "path.logs";
/// Comma-separated data directories; relative values resolve against the home.
pub const PATH_DATA: &str = "path.data";
/// Node name.
pub const NODE_NAME: &str = "node.name";
/// Cluster name; also names the log file.
pub const CLUSTER_NAME: &str = "cluster.name";
/// Tracing filter expression.
pub const LOG_FILTER: &str = "log.filter";
/// Log format, `json` or `compact`.
pub const LOG_FORMAT: &str = "log.format";
/// Console colour mode, `auto`, `always` or `never`.
pub const LOG_CONSOLE: &str = "log.console";
/// Whether a non-empty keystore password is mandatory.
pub const KEYSTORE_REQUIRED: &str = "keystore.required";
