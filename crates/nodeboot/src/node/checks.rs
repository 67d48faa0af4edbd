//! Checks run against the resolved environment before the node starts.

use std::fs;

use tracing::warn;

use nodeboot_config::keys;

use super::{NODE_TARGET, NodeStarter, StartRequest, StartupError};
use crate::environment::ResolvedEnvironment;

/// A single startup validation.
pub trait BootstrapCheck: Send + Sync {
    /// Short identifier used in reports.
    fn name(&self) -> &'static str;

    /// Runs the check, returning a user-facing message on failure.
    ///
    /// # Errors
    ///
    /// Returns the failure message.
    fn check(&self, environment: &ResolvedEnvironment) -> Result<(), String>;
}

/// Rejects empty cluster names and names containing `:`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClusterNameCheck;

impl BootstrapCheck for ClusterNameCheck {
    fn name(&self) -> &'static str {
        "cluster-name"
    }

    fn check(&self, environment: &ResolvedEnvironment) -> Result<(), String> {
        let name = environment.paths().cluster_name();
        if name.is_empty() {
            return Err(format!("[{}] must not be empty", keys::CLUSTER_NAME));
        }
        if name.contains(':') {
            return Err(format!(
                "[{}] must not contain ':', got [{name}]",
                keys::CLUSTER_NAME
            ));
        }
        Ok(())
    }
}

/// Ensures every data path exists as a directory, creating missing ones.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataPathCheck;

impl BootstrapCheck for DataPathCheck {
    fn name(&self) -> &'static str {
        "data-paths"
    }

    fn check(&self, environment: &ResolvedEnvironment) -> Result<(), String> {
        for path in environment.paths().data() {
            fs::create_dir_all(path).map_err(|error| {
                format!("data path '{}' is not usable: {error}", path.display())
            })?;
        }
        Ok(())
    }
}

/// Requires a keystore password when `keystore.required` is `true`.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeystoreCheck;

impl BootstrapCheck for KeystoreCheck {
    fn name(&self) -> &'static str {
        "keystore"
    }

    fn check(&self, environment: &ResolvedEnvironment) -> Result<(), String> {
        let required = environment
            .settings()
            .get(keys::KEYSTORE_REQUIRED)
            .is_some_and(|value| value.eq_ignore_ascii_case("true"));
        if required && environment.keystore_password().is_empty() {
            return Err(format!(
                "[{}] is set but no keystore password was provided",
                keys::KEYSTORE_REQUIRED
            ));
        }
        Ok(())
    }
}

/// Runs bootstrap checks and starts the inner node when all of them pass.
pub struct CheckedNodeStarter<S> {
    checks: Vec<Box<dyn BootstrapCheck>>,
    inner: S,
}

impl<S> CheckedNodeStarter<S> {
    /// Wraps the node with an explicit list of checks.
    #[must_use]
    pub fn new(inner: S, checks: Vec<Box<dyn BootstrapCheck>>) -> Self {
        Self { checks, inner }
    }

    /// Wraps the node with the built-in checks.
    #[must_use]
    pub fn with_default_checks(inner: S) -> Self {
        Self::new(
            inner,
            vec![
                Box::new(ClusterNameCheck),
                Box::new(KeystoreCheck),
                Box::new(DataPathCheck),
            ],
        )
    }
}

impl<S: NodeStarter> NodeStarter for CheckedNodeStarter<S> {
    fn start(&self, request: &StartRequest<'_>) -> Result<(), StartupError> {
        let failures: Vec<String> = self
            .checks
            .iter()
            .filter_map(|check| match check.check(request.environment) {
                Ok(()) => None,
                Err(message) => {
                    warn!(
                        target: NODE_TARGET,
                        check = check.name(),
                        %message,
                        "bootstrap check failed"
                    );
                    Some(message)
                }
            })
            .collect();

        if failures.is_empty() {
            return self.inner.start(request);
        }
        Err(StartupError::Validation {
            message: render_failures(&failures),
        })
    }
}

fn render_failures(failures: &[String]) -> String {
    let total = failures.len();
    let mut message = format!(
        "bootstrap checks failed: {total} check{} did not pass",
        if total == 1 { "" } else { "s" }
    );
    for (index, failure) in failures.iter().enumerate() {
        message.push_str(&format!(" [{}/{total}] {failure};", index + 1));
    }
    message.pop();
    message
}
