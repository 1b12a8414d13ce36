//! Structured error types shared across disent crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`DisentError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (offending values, shapes, etc.).
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

    /// Records a `[rows, cols]` shape under `key`.
    pub fn with_shape(self, key: impl Into<String>, shape: (usize, usize)) -> Self {
        self.with_context(key, format!("[{}, {}]", shape.0, shape.1))
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the disent workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum DisentError {
    /// Invalid configuration detected at construction time (unknown modes, bad settings).
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Caller contract violations such as mismatched tensor shapes or wrong arity.
    #[error("contract violation: {0}")]
    Contract(ErrorInfo),
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

impl DisentError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            DisentError::Config(info)
            | DisentError::Contract(info)
            | DisentError::Serde(info) => info,
        }
    }

    /// Builds the configuration error raised when `value` is not one of the
    /// registered `valid` keys for `option`.
    pub fn unknown_key(option: &str, value: &str, valid: &[&str]) -> Self {
        DisentError::Config(
            ErrorInfo::new(
                format!("unknown-{}", option.replace('_', "-")),
                format!("unsupported {option}={value:?}"),
            )
            .with_context(option, value)
            .with_context("valid", format!("{{{}}}", valid.join(", "))),
        )
    }
}
