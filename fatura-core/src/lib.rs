//! fatura-core: parsing engine for Itaú credit-card statement text.
//!
//! Input is the normalized UTF-8 rendition an external extractor produces
//! from the PDF. Output is a [`ParseResult`]: transactions, per-parse
//! diagnostics and a reconciliation summary against the statement's
//! declared total. Serialization and batch orchestration live in
//! `fatura-cli`.

pub mod amount;
pub mod classify;
pub mod dates;
pub mod dedup;
pub mod diagnostics;
pub mod fx;
pub mod installment;
pub mod model;
pub mod parser;
pub mod reconcile;
pub mod sections;

pub use amount::{AmountError, format_brl, normalize_amount};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use model::{Category, Origin, ParseResult, StatementHeader, Transaction};
pub use parser::{CONTINUATION_MARKER, parse_statement, parse_statement_bytes};
pub use reconcile::{ACCURACY_FLOOR, ReconciliationSummary, reconcile};
pub use sections::{Section, Segmenter};
