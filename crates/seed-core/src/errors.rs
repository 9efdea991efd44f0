//! Structured error types shared across the seeding crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error code raised when two definitions share a name.
pub const DUPLICATE_NAME: &str = "duplicate-name";
/// Error code raised when a dependency names an unregistered seeder.
pub const UNKNOWN_DEPENDENCY: &str = "unknown-dependency";
/// Error code raised when the dependency graph has no total order.
pub const CYCLIC_DEPENDENCY: &str = "cyclic-dependency";
/// Error code raised when a seeder name is not registered.
pub const UNKNOWN_SEEDER: &str = "unknown-seeder";
/// Error code raised when a seeder body fails.
pub const SEEDER_FAILED: &str = "seeder-failed";
/// Error code raised when a validation hook rejects a seeder.
pub const VALIDATION_FAILED: &str = "validation-failed";
/// Error code raised when a lifecycle hook fails.
pub const HOOK_FAILED: &str = "hook-failed";
/// Error code raised when rollback is requested for a seeder without the capability.
pub const ROLLBACK_NOT_SUPPORTED: &str = "rollback-not-supported";
/// Error code raised when a rollback body fails.
pub const ROLLBACK_FAILED: &str = "rollback-failed";

/// Structured payload attached to every [`SeedError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (seeder names, batch numbers, paths).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Looks up a context value by key.
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context.get(key).map(String::as_str)
    }
}

/// Canonical error type for the seeding engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum SeedError {
    /// Registration and lookup errors.
    #[error("registry error: {0}")]
    Registry(ErrorInfo),
    /// Dependency resolution errors (unknown references, cycles).
    #[error("resolution error: {0}")]
    Resolution(ErrorInfo),
    /// Seeder body, validation and hook failures.
    #[error("execution error: {0}")]
    Execution(ErrorInfo),
    /// Rollback capability and rollback body failures.
    #[error("rollback error: {0}")]
    Rollback(ErrorInfo),
    /// Failures of the persisted tracking store.
    #[error("tracking store error: {0}")]
    Tracking(ErrorInfo),
    /// Configuration loading and validation errors.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl SeedError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            SeedError::Registry(info)
            | SeedError::Resolution(info)
            | SeedError::Execution(info)
            | SeedError::Rollback(info)
            | SeedError::Tracking(info)
            | SeedError::Config(info)
            | SeedError::Serde(info) => info,
        }
    }

    /// Returns the stable error code.
    pub fn code(&self) -> &str {
        &self.info().code
    }

    /// Two definitions were registered under the same name.
    pub fn duplicate_name(name: &str) -> Self {
        SeedError::Registry(
            ErrorInfo::new(DUPLICATE_NAME, format!("seeder {name} is already registered"))
                .with_context("seeder", name),
        )
    }

    /// A seeder name was not found in the registry.
    pub fn unknown_seeder(name: &str) -> Self {
        SeedError::Registry(
            ErrorInfo::new(UNKNOWN_SEEDER, format!("seeder {name} is not registered"))
                .with_context("seeder", name),
        )
    }

    /// `seeder` declares a dependency on `missing`, which is not registered.
    pub fn unknown_dependency(seeder: &str, missing: &str) -> Self {
        SeedError::Resolution(
            ErrorInfo::new(
                UNKNOWN_DEPENDENCY,
                format!("seeder {seeder} depends on unregistered seeder {missing}"),
            )
            .with_context("seeder", seeder)
            .with_context("missing", missing),
        )
    }

    /// The listed seeders could not be ordered because they form or feed a cycle.
    pub fn cyclic_dependency(remaining: &[String], edges: &[(String, String)]) -> Self {
        let edges = edges
            .iter()
            .map(|(from, to)| format!("{from}->{to}"))
            .collect::<Vec<_>>()
            .join(",");
        SeedError::Resolution(
            ErrorInfo::new(CYCLIC_DEPENDENCY, "dependency graph contains a cycle")
                .with_context("remaining", remaining.join(","))
                .with_context("edges", edges),
        )
    }

    /// A seeder body failed with the provided message.
    pub fn execution(seeder: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        SeedError::Execution(
            ErrorInfo::new(SEEDER_FAILED, format!("seeder {seeder} failed: {message}"))
                .with_context("seeder", seeder)
                .with_context("cause", message),
        )
    }

    /// A validation hook rejected the seeder before anything was recorded.
    pub fn validation_failed(seeder: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        SeedError::Execution(
            ErrorInfo::new(
                VALIDATION_FAILED,
                format!("seeder {seeder} failed validation: {message}"),
            )
            .with_context("seeder", seeder)
            .with_context("cause", message),
        )
    }

    /// The lifecycle hook `hook` of `seeder` failed.
    pub fn hook_failed(seeder: &str, hook: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        SeedError::Execution(
            ErrorInfo::new(HOOK_FAILED, format!("hook {hook} of seeder {seeder} failed: {message}"))
                .with_context("seeder", seeder)
                .with_context("hook", hook)
                .with_context("cause", message),
        )
    }

    /// The rollback body of `seeder` failed; its writes were discarded.
    pub fn rollback_failed(seeder: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        SeedError::Rollback(
            ErrorInfo::new(
                ROLLBACK_FAILED,
                format!("rollback of seeder {seeder} failed: {message}"),
            )
            .with_context("seeder", seeder)
            .with_context("cause", message),
        )
    }

    /// Rollback was requested for a seeder that cannot be rolled back.
    pub fn rollback_not_supported(seeder: &str) -> Self {
        SeedError::Rollback(
            ErrorInfo::new(
                ROLLBACK_NOT_SUPPORTED,
                format!("seeder {seeder} does not support rollback"),
            )
            .with_context("seeder", seeder)
            .with_hint("set can_rollback and implement the rollback body"),
        )
    }

    /// The tracking store reported a failure.
    pub fn tracking(code: impl Into<String>, message: impl Into<String>) -> Self {
        SeedError::Tracking(ErrorInfo::new(code, message))
    }

    /// Names the seeder the error originated from, when known.
    pub fn seeder(&self) -> Option<&str> {
        self.info().context_value("seeder")
    }
}
