//! Caller-facing diagnostics.

use std::fmt;

use serde::Serialize;

use crate::change::Change;
use crate::dispatch::ApplyFailure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One line of the report handed back after a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Component, or `component/key` for keyed list members.
    pub subject: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            subject: subject.into(),
            message: message.into(),
        }
    }

    pub fn applied(change: &Change) -> Self {
        Self::new(Severity::Info, change.subject(), format!("{change}: applied"))
    }

    pub fn failed(failure: &ApplyFailure) -> Self {
        Self::new(
            Severity::Error,
            failure.change.subject(),
            format!(
                "{} failed ({}): {}",
                failure.kind(),
                failure.error.class(),
                failure.error
            ),
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.subject, self.message)
    }
}
