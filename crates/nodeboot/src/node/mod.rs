//! The server-startup collaborator invoked by the second bootstrap phase.

mod checks;

use std::any::Any;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::environment::ResolvedEnvironment;
use crate::security::{PolicyGate, SecurityProperties};

pub use checks::{
    BootstrapCheck, CheckedNodeStarter, ClusterNameCheck, DataPathCheck, KeystoreCheck,
};

const NODE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::node");

/// Everything the node receives when it is started.
#[derive(Debug, Clone, Copy)]
pub struct StartRequest<'a> {
    /// Whether the process stays attached to the controller.
    pub attached: bool,
    /// Fully resolved environment, including secrets.
    pub environment: &'a ResolvedEnvironment,
    /// Pid file maintained by the supervisor, if any.
    pub pid_file: Option<&'a Path>,
    /// Security properties in effect.
    pub security: &'a SecurityProperties,
    /// Enforced policy gate.
    pub policy: &'a PolicyGate,
}

/// Failures reported by a [`NodeStarter`].
#[derive(Debug, Error)]
pub enum StartupError {
    /// The node configuration failed validation.
    #[error("{message}")]
    Validation {
        /// Message shown to the user.
        message: String,
    },
    /// A user-facing failure with its own exit code.
    #[error("{message}")]
    User {
        /// Exit code to use.
        exit_code: i32,
        /// Message shown to the user.
        message: String,
    },
    /// Any other failure.
    #[error(transparent)]
    Unknown(#[from] Box<dyn Error + Send + Sync>),
}

/// A [`NodeStarter`] panicked instead of returning.
#[derive(Debug, Error)]
#[error("node starter panicked: {message}")]
pub struct StarterPanic {
    message: String,
}

impl StarterPanic {
    /// Captures the message carried by a panic payload.
    #[must_use]
    pub fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|message| (*message).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic payload was not a string".to_owned());
        Self { message }
    }
}

/// Starts the server once the supervisor has finished bootstrapping.
pub trait NodeStarter: Send + Sync {
    /// Starts the node. Returning `Ok` means the node is serving.
    ///
    /// # Errors
    ///
    /// Returns a classified [`StartupError`]; the supervisor exits the
    /// process accordingly.
    fn start(&self, request: &StartRequest<'_>) -> Result<(), StartupError>;
}

impl<T> NodeStarter for Arc<T>
where
    T: NodeStarter + ?Sized,
{
    fn start(&self, request: &StartRequest<'_>) -> Result<(), StartupError> {
        (**self).start(request)
    }
}

/// Node that hosts no services.
///
/// Used by the standalone binary; embedding applications supply their own
/// [`NodeStarter`].
#[derive(Debug, Default, Clone, Copy)]
pub struct IdleNode;

impl NodeStarter for IdleNode {
    fn start(&self, request: &StartRequest<'_>) -> Result<(), StartupError> {
        let paths = request.environment.paths();
        info!(
            target: NODE_TARGET,
            node = paths.node_name(),
            cluster = paths.cluster_name(),
            attached = request.attached,
            "node started"
        );
        Ok(())
    }
}
