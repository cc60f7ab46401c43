//! Per-parse diagnostics: an ordered collection owned by each parse call.
//!
//! Every recoverable problem the engine hits lands here instead of aborting
//! the document. The collection is never shared between parses, so batch
//! runs over many statements cannot interleave state.

use serde::{Deserialize, Serialize};

/// What went wrong (or what is merely worth flagging) on a line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticKind {
    /// Section anchors never reached the transaction block, or the
    /// statement period could not be established. Fatal for the document.
    HeaderError,
    /// A line inside the transaction block matched no category rule.
    InvalidLine,
    /// Day/month out of range, or impossible for the resolved year.
    InvalidDate,
    /// Amount token violated the comma-decimal / period-thousands locale.
    InvalidAmount,
    /// Installment suffix outside 1 <= current <= total <= 99, or the
    /// softer "total above 12" convention flag.
    InvalidInstallment,
    /// Line bytes were not valid UTF-8.
    EncodingError,
    /// Resolved date falls after the statement's closing date.
    FutureDate,
    /// Same date, amount and merchant as an earlier record.
    DuplicateTransaction,
    /// FX cross-check or currency-code oddity on an international line.
    InternationalFx,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostics entry tied to a 1-based source line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub line_number: usize,
    pub message: String,
    pub raw_text: String,
}

/// Ordered diagnostics for one parse invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(
        &mut self,
        kind: DiagnosticKind,
        line_number: usize,
        message: impl Into<String>,
        raw_text: impl Into<String>,
    ) {
        self.entries.push(Diagnostic {
            kind,
            severity: Severity::Error,
            line_number,
            message: message.into(),
            raw_text: raw_text.into(),
        });
    }

    pub fn warning(
        &mut self,
        kind: DiagnosticKind,
        line_number: usize,
        message: impl Into<String>,
        raw_text: impl Into<String>,
    ) {
        self.entries.push(Diagnostic {
            kind,
            severity: Severity::Warning,
            line_number,
            message: message.into(),
            raw_text: raw_text.into(),
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    /// True when a document-level failure was recorded.
    pub fn has_fatal(&self) -> bool {
        self.entries
            .iter()
            .any(|d| d.kind == DiagnosticKind::HeaderError && d.severity == Severity::Error)
    }

    pub fn count_of(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }
}
