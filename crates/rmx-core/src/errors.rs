//! Structured error types shared across RMX crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`RmError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Offending parameters and their values.
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
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
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

/// Canonical error type for the RMX engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum RmError {
    /// Partition or measure range could not be resolved.
    #[error("partition error: {0}")]
    Partition(ErrorInfo),
    /// Slice bounds or stride rejected by the cyclic extractor.
    #[error("slice error: {0}")]
    Slice(ErrorInfo),
    /// Shot totals disagree with the declared shot count or with each other.
    #[error("shots error: {0}")]
    Shots(ErrorInfo),
    /// Malformed outcome counts.
    #[error("counts error: {0}")]
    Counts(ErrorInfo),
    /// Backend selection or backend self-test failures.
    #[error("backend error: {0}")]
    Backend(ErrorInfo),
    /// Numeric failures such as an unsolvable mitigation equation.
    #[error("numeric error: {0}")]
    Numeric(ErrorInfo),
    /// Invalid options or worker configuration.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl RmError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            RmError::Partition(info)
            | RmError::Slice(info)
            | RmError::Shots(info)
            | RmError::Counts(info)
            | RmError::Backend(info)
            | RmError::Numeric(info)
            | RmError::Config(info)
            | RmError::Serde(info) => info,
        }
    }

    fn info_mut(&mut self) -> &mut ErrorInfo {
        match self {
            RmError::Partition(info)
            | RmError::Slice(info)
            | RmError::Shots(info)
            | RmError::Counts(info)
            | RmError::Backend(info)
            | RmError::Numeric(info)
            | RmError::Config(info)
            | RmError::Serde(info) => info,
        }
    }

    /// Attaches an additional context entry, keeping the error family.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.info_mut()
            .context
            .insert(key.into(), value.to_string());
        self
    }

    /// Returns the stable error code.
    pub fn code(&self) -> &str {
        &self.info().code
    }
}

impl From<serde_json::Error> for RmError {
    fn from(err: serde_json::Error) -> Self {
        RmError::Serde(ErrorInfo::new("json", err.to_string()))
    }
}
