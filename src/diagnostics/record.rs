//! Diagnostic records
//!
//! What the editing client sees: a message, a 1-based line, a best-effort
//! column, a kind and, when the index is available, the unit the problem
//! belongs to so the client can jump to an editable unit instead of a raw
//! offset.

use std::fmt;

use serde::Serialize;

use crate::index::UnitId;

/// Category of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Mismatched, unclosed or unexpected closing unit.
    Structure,
    /// Malformed tag or bracket.
    Syntax,
    /// Stream could not be read.
    Io,
    /// Error reported by a schema validator.
    ValidationError,
    /// Warning reported by a schema validator.
    ValidationWarning,
    /// Fatal error reported by a schema validator.
    ValidationFatal,
    /// Non-fatal observation (e.g. unsupported declared encoding).
    Warning,
    /// The collector cap was hit; later records were dropped.
    LimitReached,
    /// Stream-level failure that aborted the pass.
    FatalParse,
}

impl ErrorKind {
    /// Stable upper-case code, as used on the wire.
    pub const fn code(self) -> &'static str {
        match self {
            ErrorKind::Structure => "STRUCTURE",
            ErrorKind::Syntax => "SYNTAX",
            ErrorKind::Io => "IO",
            ErrorKind::ValidationError => "VALIDATION_ERROR",
            ErrorKind::ValidationWarning => "VALIDATION_WARNING",
            ErrorKind::ValidationFatal => "VALIDATION_FATAL",
            ErrorKind::Warning => "WARNING",
            ErrorKind::LimitReached => "LIMIT_REACHED",
            ErrorKind::FatalParse => "FATAL_PARSE",
        }
    }

    /// Severity derived from the kind.
    pub const fn severity(self) -> Severity {
        match self {
            ErrorKind::ValidationWarning | ErrorKind::Warning => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// How bad a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Link from a diagnostic to the unit that contains it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnitLink {
    /// Unit identifier (valid for the index build it came from).
    pub unit: UnitId,
    /// First line of the unit.
    pub start_line: u32,
    /// Last line of the unit.
    pub end_line: u32,
}

/// One diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    /// 1-based line (0 when unknown).
    pub line: u32,
    /// 1-based column, best effort (1 when unknown).
    pub column: u32,
    pub kind: ErrorKind,
    pub severity: Severity,
    /// Owning unit, filled in by [`link_errors`](crate::session::link_errors).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<UnitLink>,
}

impl ErrorRecord {
    /// Create a record at column 1.
    pub fn new(message: impl Into<String>, line: u32, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            line,
            column: 1,
            kind,
            severity: kind.severity(),
            unit: None,
        }
    }

    /// Set the column.
    #[must_use]
    pub fn at_column(mut self, column: u32) -> Self {
        self.column = column.max(1);
        self
    }

    #[inline]
    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] line {}:{}: {}", self.kind, self.line, self.column, self.message)?;
        if let Some(link) = self.unit {
            write!(f, " (in {}, lines {}-{})", link.unit, link.start_line, link.end_line)?;
        }
        Ok(())
    }
}
