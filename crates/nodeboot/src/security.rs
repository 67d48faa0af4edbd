//! Security property overrides and the process policy gate.
//!
//! Overrides are applied first thing in the bootstrap sequence. The policy
//! gate starts permissive so library code asking whether a policy is active
//! sees a consistent answer from the start; it is swapped to an enforced
//! policy exactly once, before the second phase performs any sensitive
//! operation.

use std::collections::BTreeMap;
use std::env;
use std::path::{Component, Path, PathBuf};

use once_cell::sync::OnceCell;
use thiserror::Error;

use nodeboot_config::NodePaths;

/// Properties that accept a validated integer override.
pub const CACHE_PROPERTIES: [&str; 2] = [
    "networkaddress.cache.ttl",
    "networkaddress.cache.negative.ttl",
];

/// Prefix naming the override for a property.
pub const OVERRIDE_PREFIX: &str = "nodeboot.";

/// Property enabling expansion inside policy files.
pub const EXPAND_PROPERTIES: &str = "policy.expandProperties";

/// Source of raw override values.
#[cfg_attr(test, mockall::automock)]
pub trait PropertySource: Send + Sync {
    /// Returns the raw value for the named override, if set.
    fn property(&self, name: &str) -> Option<String>;
}

/// Reads overrides from environment variables.
///
/// `nodeboot.networkaddress.cache.ttl` maps to
/// `NODEBOOT_NETWORKADDRESS_CACHE_TTL`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvPropertySource;

impl EnvPropertySource {
    /// Environment variable consulted for the named override.
    #[must_use]
    pub fn variable_name(name: &str) -> String {
        name.chars()
            .map(|character| match character {
                '.' | '-' => '_',
                other => other.to_ascii_uppercase(),
            })
            .collect()
    }
}

impl PropertySource for EnvPropertySource {
    fn property(&self, name: &str) -> Option<String> {
        env::var(Self::variable_name(name)).ok()
    }
}

/// Errors raised while applying security overrides.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// An override did not parse as an integer.
    #[error("failed to parse [{name}] with value [{value}]")]
    InvalidOverride {
        /// Override name.
        name: String,
        /// Offending value.
        value: String,
        /// Parser error.
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Security properties in effect for the process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityProperties(BTreeMap<String, String>);

impl SecurityProperties {
    /// Looks up a property.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Iterates over the properties in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

/// Applies the overrides exposed by `source`.
///
/// Each value is round-tripped through integer parsing so only canonical
/// integers reach the property table.
///
/// # Errors
///
/// Returns [`SecurityError::InvalidOverride`] for the first malformed value.
pub fn apply_overrides(source: &dyn PropertySource) -> Result<SecurityProperties, SecurityError> {
    let mut properties = BTreeMap::new();
    for property in CACHE_PROPERTIES {
        let name = format!("{OVERRIDE_PREFIX}{property}");
        if let Some(value) = source.property(&name) {
            let parsed = value
                .parse::<i32>()
                .map_err(|source| SecurityError::InvalidOverride {
                    name: name.clone(),
                    value: value.clone(),
                    source,
                })?;
            properties.insert(property.to_owned(), parsed.to_string());
        }
    }
    properties.insert(EXPAND_PROPERTIES.to_owned(), "true".to_owned());
    Ok(SecurityProperties(properties))
}

/// A sensitive operation subject to the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission<'a> {
    /// Creating or replacing a file.
    WriteFile(&'a Path),
}

/// Enforced security policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    writable: Vec<PathBuf>,
}

impl Policy {
    /// Builds a policy granting writes beneath the supplied roots.
    #[must_use]
    pub fn new(writable: Vec<PathBuf>) -> Self {
        Self { writable }
    }

    /// Policy for a node: home, config, logs and data paths, plus the pid
    /// file's directory.
    #[must_use]
    pub fn for_node(paths: &NodePaths, pid_file: Option<&Path>) -> Self {
        let mut writable = vec![
            paths.home().to_path_buf(),
            paths.config().to_path_buf(),
            paths.logs().to_path_buf(),
        ];
        writable.extend(paths.data().iter().cloned());
        writable.extend(pid_file.and_then(Path::parent).map(Path::to_path_buf));
        Self::new(writable)
    }

    /// Returns `true` when the permission is granted.
    ///
    /// Paths containing `..` are refused outright: prefix matching works on
    /// components and would otherwise let them climb out of a root.
    #[must_use]
    pub fn permits(&self, permission: Permission<'_>) -> bool {
        match permission {
            Permission::WriteFile(path) => {
                !path
                    .components()
                    .any(|component| component == Component::ParentDir)
                    && self.writable.iter().any(|root| path.starts_with(root))
            }
        }
    }
}

/// Current decision mode of a [`PolicyGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyState<'a> {
    /// Every check passes.
    Permissive,
    /// Checks are decided by the policy.
    Enforced(&'a Policy),
}

/// Errors raised by the policy gate.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The gate was already enforced.
    #[error("security policy has already been enforced")]
    AlreadyEnforced,
    /// The policy refused the operation.
    #[error("security policy denies {permission}")]
    Denied {
        /// Rendered permission.
        permission: String,
    },
}

/// Process policy decision point.
#[derive(Debug, Default)]
pub struct PolicyGate {
    enforced: OnceCell<Policy>,
}

impl PolicyGate {
    /// Builds a gate in the permissive placeholder state.
    #[must_use]
    pub fn permissive() -> Self {
        Self::default()
    }

    /// A gate always reports an active policy, including while permissive.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        true
    }

    /// Current decision mode.
    #[must_use]
    pub fn state(&self) -> PolicyState<'_> {
        self.enforced
            .get()
            .map_or(PolicyState::Permissive, PolicyState::Enforced)
    }

    /// Replaces the placeholder with the supplied policy.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::AlreadyEnforced`] on a second call.
    pub fn enforce(&self, policy: Policy) -> Result<(), PolicyError> {
        self.enforced
            .set(policy)
            .map_err(|_| PolicyError::AlreadyEnforced)
    }

    /// Checks whether the operation is allowed.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Denied`] when an enforced policy refuses it.
    pub fn check(&self, permission: Permission<'_>) -> Result<(), PolicyError> {
        match self.state() {
            PolicyState::Permissive => Ok(()),
            PolicyState::Enforced(policy) if policy.permits(permission) => Ok(()),
            PolicyState::Enforced(_) => Err(PolicyError::Denied {
                permission: describe(permission),
            }),
        }
    }
}

fn describe(permission: Permission<'_>) -> String {
    match permission {
        Permission::WriteFile(path) => format!("writing '{}'", path.display()),
    }
}
