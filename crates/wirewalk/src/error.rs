// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error taxonomy shared by the walker, the visitor policies and the codec.

use std::fmt;
use thiserror::Error;

/// Failure kind returned by visitor hooks.
///
/// A hook that succeeds returns `Ok(())`; see [`Status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Violation {
    /// Well-formed data that breaks a semantic rule. Recoverable.
    Constraint,
    /// Arithmetic overflow or access outside the buffer. Always fatal.
    Memory,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Constraint => write!(f, "constraint violation"),
            Violation::Memory => write!(f, "memory error"),
        }
    }
}

/// Outcome of a visitor hook.
pub type Status = std::result::Result<(), Violation>;

/// One problem reported through a visitor's error hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub violation: Violation,
    pub message: String,
}

impl Diagnostic {
    pub fn new(violation: Violation, message: impl Into<String>) -> Self {
        Self {
            violation,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.violation == Violation::Memory
    }

    /// Diagnostic for a failure detected before any walk started.
    pub fn from_error(err: &Error) -> Self {
        let violation = if err.is_fatal() {
            Violation::Memory
        } else {
            Violation::Constraint
        };
        Self::new(violation, err.to_string())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.violation, self.message)
    }
}

/// Codec errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("memory error: {0}")]
    Memory(String),

    #[error("invalid message header: {0}")]
    Header(String),

    #[error("message exceeds limits: {0}")]
    Limit(String),

    #[error("unsupported primary object: {0}")]
    PrimaryObject(String),
}

impl Error {
    /// Whether the buffer must be treated as untrustworthy.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Memory(_))
    }
}

impl From<Diagnostic> for Error {
    fn from(diagnostic: Diagnostic) -> Self {
        match diagnostic.violation {
            Violation::Constraint => Error::ConstraintViolation(diagnostic.message),
            Violation::Memory => Error::Memory(diagnostic.message),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Ordered record of everything a visitor reported.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, violation: Violation, message: impl Into<String>) {
        let diagnostic = Diagnostic::new(violation, message);
        log::trace!("[walk] {}", diagnostic);
        self.entries.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn first(&self) -> Option<&Diagnostic> {
        self.entries.first()
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }

    /// First reported problem as an error, if any.
    pub fn into_result(self) -> Result<()> {
        match self.entries.into_iter().next() {
            Some(diagnostic) => Err(diagnostic.into()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_variants() {
        let err = Error::ConstraintViolation("strict union has unknown ordinal".into());
        assert_eq!(
            err.to_string(),
            "constraint violation: strict union has unknown ordinal"
        );
        let err = Error::Memory("integer overflow calculating vector size".into());
        assert_eq!(
            err.to_string(),
            "memory error: integer overflow calculating vector size"
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_diagnostic_conversion_keeps_kind() {
        let diagnostic = Diagnostic::new(Violation::Memory, "read outside message bounds");
        assert!(diagnostic.is_fatal());
        assert_eq!(
            Error::from(diagnostic),
            Error::Memory("read outside message bounds".into())
        );
    }

    #[test]
    fn test_diagnostics_first_wins() {
        let mut diagnostics = Diagnostics::new();
        assert!(diagnostics.clone().into_result().is_ok());
        diagnostics.report(Violation::Constraint, "first");
        diagnostics.report(Violation::Memory, "second");
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(
            diagnostics.into_result(),
            Err(Error::ConstraintViolation("first".into()))
        );
    }
}
