//! The parse pipeline: section segmentation, header extraction,
//! continuation merging, per-line classification and record assembly.
//!
//! One call, one document, one [`ParseResult`]. Nothing here touches
//! shared mutable state, so documents parse concurrently without locks.

use std::borrow::Cow;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::amount::normalize_amount;
use crate::classify::{
    RE_DOMESTIC_TAIL, RE_TXN_LINE, extract_card, keyword_category, primary_category, strip_origin,
};
use crate::dates::resolve_date;
use crate::dedup::flag_duplicates;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::fx::match_fx;
use crate::installment::{Installment, InstallmentScan, scan_installment};
use crate::model::{Category, ParseResult, StatementHeader, Transaction};
use crate::reconcile::reconcile;
use crate::sections::{Section, Segmenter, is_anchor};

/// Trailing marker the text extractor leaves on rows it had to wrap.
pub const CONTINUATION_MARKER: char = '\\';

static RE_PERIOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bFATURA\s+(\d{1,2})/(\d{4})\b").expect("period regex"));
static RE_DUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bVENCIMENTO:?\s+(\d{1,2}/\d{1,2}/\d{4})\b").expect("due regex")
});
static RE_DECLARED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bTOTAL\s+A\s+PAGAR\b:?\s*(?:R\$\s*)?(?P<amt>\(?-?[\d.,]+\)?-?)")
        .expect("declared regex")
});
static RE_END_TOTAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bTOTAL\s+DESTA\s+FATURA\b:?\s*(?:R\$\s*)?(?P<amt>\(?-?[\d.,]+\)?-?)")
        .expect("end total regex")
});
static RE_HEADER_CARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bfinal\s+(\d{4})\b").expect("card regex"));

/// Parse one statement already known to be valid UTF-8.
pub fn parse_statement(text: &str) -> ParseResult {
    let lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, Some(Cow::Borrowed(line))))
        .collect();
    parse_lines(lines)
}

/// Parse raw extractor output. Lines that fail UTF-8 decoding are dropped
/// with an `ENCODING_ERROR`; the rest of the document still parses.
pub fn parse_statement_bytes(bytes: &[u8]) -> ParseResult {
    let lines = bytes
        .split(|b| *b == b'\n')
        .enumerate()
        .map(|(i, raw)| {
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            (i + 1, std::str::from_utf8(raw).ok().map(Cow::Borrowed))
        })
        .collect();
    parse_lines(lines)
}

fn parse_lines(lines: Vec<(usize, Option<Cow<'_, str>>)>) -> ParseResult {
    let mut diagnostics = Diagnostics::new();
    let mut segmenter = Segmenter::new();
    let mut tagged: Vec<(usize, Section, String)> = Vec::new();

    for (number, text) in lines {
        match text {
            Some(text) => {
                let section = segmenter.observe(&text);
                tagged.push((number, section, text.into_owned()));
            }
            None => {
                diagnostics.error(
                    DiagnosticKind::EncodingError,
                    number,
                    "line is not valid UTF-8",
                    "",
                );
            }
        }
    }

    if !segmenter.reached_transactions() {
        diagnostics.error(
            DiagnosticKind::HeaderError,
            0,
            "no transaction section anchor found",
            "",
        );
        return ParseResult {
            header: None,
            transactions: Vec::new(),
            diagnostics,
            reconciliation: None,
        };
    }

    let Some(header) = extract_header(&tagged, &mut diagnostics) else {
        diagnostics.error(
            DiagnosticKind::HeaderError,
            0,
            "statement period not found (no FATURA MM/YYYY and no due date)",
            "",
        );
        return ParseResult {
            header: None,
            transactions: Vec::new(),
            diagnostics,
            reconciliation: None,
        };
    };

    let txn_lines: Vec<(usize, String)> = tagged
        .iter()
        .filter(|(_, section, text)| {
            *section == Section::Transactions && !text.trim().is_empty() && !is_anchor(text)
        })
        .map(|(number, _, text)| (*number, text.clone()))
        .collect();

    let mut transactions = Vec::new();
    for (number, line) in merge_continuations(txn_lines) {
        if let Some(txn) = parse_transaction_line(number, &line, &header, &mut diagnostics) {
            transactions.push(txn);
        }
    }

    flag_duplicates(&mut transactions, &mut diagnostics);

    let reconciliation = header
        .declared_total
        .map(|declared| reconcile(declared, &transactions));

    ParseResult {
        header: Some(header),
        transactions,
        diagnostics,
        reconciliation,
    }
}

/// Pull period, due date, declared total and card id out of everything
/// before the transaction block. Returns None when no period can be
/// established at all.
fn extract_header(
    tagged: &[(usize, Section, String)],
    diagnostics: &mut Diagnostics,
) -> Option<StatementHeader> {
    let mut period: Option<(u32, i32)> = None;
    let mut due_date: Option<NaiveDate> = None;
    let mut declared_total = None;
    let mut card_last4 = None;

    for (number, section, text) in tagged {
        match section {
            Section::Header | Section::Summary | Section::PaymentInfo => {
                if period.is_none()
                    && let Some(caps) = RE_PERIOD.captures(text)
                {
                    let month: u32 = caps[1].parse().unwrap_or(0);
                    let year: i32 = caps[2].parse().unwrap_or(0);
                    if (1..=12).contains(&month) {
                        period = Some((month, year));
                    }
                }
                if due_date.is_none()
                    && let Some(caps) = RE_DUE.captures(text)
                {
                    match NaiveDate::parse_from_str(&caps[1], "%d/%m/%Y") {
                        Ok(date) => due_date = Some(date),
                        Err(_) => diagnostics.warning(
                            DiagnosticKind::InvalidDate,
                            *number,
                            format!("unparseable due date {:?}", &caps[1]),
                            text.clone(),
                        ),
                    }
                }
                if declared_total.is_none()
                    && let Some(caps) = RE_DECLARED.captures(text)
                {
                    declared_total =
                        parse_declared(&caps["amt"], *number, text, diagnostics);
                }
                if card_last4.is_none()
                    && let Some(caps) = RE_HEADER_CARD.captures(text)
                {
                    card_last4 = Some(caps[1].to_string());
                }
            }
            Section::End => {
                // the closing line repeats the total; use it when the
                // summary never declared one
                if declared_total.is_none()
                    && let Some(caps) = RE_END_TOTAL.captures(text)
                {
                    declared_total =
                        parse_declared(&caps["amt"], *number, text, diagnostics);
                }
            }
            Section::Transactions => {}
        }
    }

    // a statement closes in the month before it falls due
    let (period_month, period_year) = period.or_else(|| {
        due_date.map(|due| {
            use chrono::Datelike;
            if due.month() == 1 {
                (12, due.year() - 1)
            } else {
                (due.month() - 1, due.year())
            }
        })
    })?;

    if declared_total.is_none() {
        diagnostics.warning(
            DiagnosticKind::HeaderError,
            0,
            "declared total not found; reconciliation skipped",
            "",
        );
    }

    Some(StatementHeader {
        period_month,
        period_year,
        due_date,
        declared_total,
        card_last4,
    })
}

fn parse_declared(
    token: &str,
    number: usize,
    text: &str,
    diagnostics: &mut Diagnostics,
) -> Option<rust_decimal::Decimal> {
    match normalize_amount(token) {
        Ok(value) => Some(value),
        Err(e) => {
            diagnostics.error(
                DiagnosticKind::InvalidAmount,
                number,
                format!("declared total: {e}"),
                text,
            );
            None
        }
    }
}

/// Join physically wrapped rows. A line ending in the continuation marker
/// buffers until the next line arrives, then the joined text re-enters
/// classification as one logical line numbered at its first physical row.
fn merge_continuations(lines: Vec<(usize, String)>) -> Vec<(usize, String)> {
    let mut out = Vec::with_capacity(lines.len());
    let mut pending: Option<(usize, String)> = None;

    for (number, text) in lines {
        let (start, mut buf) = pending.take().unwrap_or((number, String::new()));
        if !buf.is_empty() {
            buf.push(' ');
        }
        buf.push_str(text.trim());

        if let Some(stripped) = buf.strip_suffix(CONTINUATION_MARKER) {
            pending = Some((start, stripped.trim_end().to_string()));
        } else {
            out.push((start, buf));
        }
    }
    // dangling marker at end of input: parse what accumulated
    if let Some(p) = pending {
        out.push(p);
    }
    out
}

fn parse_transaction_line(
    number: usize,
    line: &str,
    header: &StatementHeader,
    diagnostics: &mut Diagnostics,
) -> Option<Transaction> {
    let Some(caps) = RE_TXN_LINE.captures(line) else {
        diagnostics.error(
            DiagnosticKind::InvalidLine,
            number,
            "matches no transaction rule",
            line,
        );
        return None;
    };
    let date_token = caps["date"].to_string();
    let rest = caps["rest"].to_string();

    let resolved = match resolve_date(&date_token, header) {
        Ok(resolved) => resolved,
        Err(e) => {
            diagnostics.error(DiagnosticKind::InvalidDate, number, e.to_string(), line);
            return None;
        }
    };

    let (rest, card_last4) = extract_card(&rest);

    // FX composite first: its shape is a superset of the domestic one
    let txn = if let Some(fx_result) = match_fx(&rest) {
        let fx = match fx_result {
            Ok(fx) => fx,
            Err(e) => {
                diagnostics.error(DiagnosticKind::InvalidAmount, number, e.to_string(), line);
                return None;
            }
        };
        for issue in &fx.issues {
            let message = match issue {
                crate::fx::FxIssue::RateMismatch { expected } => format!(
                    "BRL amount {} disagrees with original x rate ({})",
                    fx.amount_brl, expected
                ),
                crate::fx::FxIssue::OddCurrencyCode(code) => {
                    format!("unusual currency code {code:?}")
                }
            };
            diagnostics.warning(DiagnosticKind::InternationalFx, number, message, line);
        }

        let (description, origin) = strip_origin(&fx.description);
        let (description, installment) =
            apply_installment(description, number, line, diagnostics);

        Transaction {
            date: resolved.date,
            group_key: installment.map(|i| i.group_key(&description)),
            description,
            category: Category::International,
            amount: fx.amount_brl,
            currency: "BRL".to_string(),
            is_international: true,
            is_installment: installment.is_some(),
            is_virtual: origin == Some(crate::model::Origin::Virtual),
            installment_current: installment.map(|i| i.current),
            installment_total: installment.map(|i| i.total),
            original_amount: Some(fx.original_amount),
            original_currency: Some(fx.currency),
            exchange_rate: Some(fx.exchange_rate),
            location: fx.location,
            origin,
            card_last4,
            source_line: number,
            duplicate_of: None,
        }
    } else {
        let Some(caps) = RE_DOMESTIC_TAIL.captures(&rest) else {
            diagnostics.error(
                DiagnosticKind::InvalidLine,
                number,
                "no amount token found",
                line,
            );
            return None;
        };
        let amount = match normalize_amount(&caps["amt"]) {
            Ok(amount) => amount,
            Err(e) => {
                diagnostics.error(DiagnosticKind::InvalidAmount, number, e.to_string(), line);
                return None;
            }
        };

        let (description, origin) = strip_origin(&caps["desc"]);
        let (description, installment) =
            apply_installment(description, number, line, diagnostics);
        let category = primary_category(
            keyword_category(&description),
            amount,
            installment.is_some(),
            origin,
        );

        Transaction {
            date: resolved.date,
            group_key: installment.map(|i| i.group_key(&description)),
            description,
            category,
            amount,
            currency: "BRL".to_string(),
            is_international: false,
            is_installment: installment.is_some(),
            is_virtual: origin == Some(crate::model::Origin::Virtual),
            installment_current: installment.map(|i| i.current),
            installment_total: installment.map(|i| i.total),
            original_amount: None,
            original_currency: None,
            exchange_rate: None,
            location: None,
            origin,
            card_last4,
            source_line: number,
            duplicate_of: None,
        }
    };

    if resolved.future {
        diagnostics.warning(
            DiagnosticKind::FutureDate,
            number,
            format!(
                "resolved date {} falls after the statement close {}",
                resolved.date,
                header.closing_date()
            ),
            line,
        );
    }

    Some(txn)
}

fn apply_installment(
    description: String,
    number: usize,
    raw: &str,
    diagnostics: &mut Diagnostics,
) -> (String, Option<Installment>) {
    match scan_installment(&description) {
        InstallmentScan::None => (description, None),
        InstallmentScan::Valid {
            installment,
            description,
        } => {
            if installment.over_convention() {
                diagnostics.warning(
                    DiagnosticKind::InvalidInstallment,
                    number,
                    format!(
                        "installment total {} exceeds the 12-month convention",
                        installment.total
                    ),
                    raw,
                );
            }
            (description, Some(installment))
        }
        InstallmentScan::Invalid { error, description } => {
            diagnostics.error(
                DiagnosticKind::InvalidInstallment,
                number,
                error.to_string(),
                raw,
            );
            (description, None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_continuations() {
        let lines = vec![
            (4, r"15/08 SUPERMERCADO \".to_string()),
            (5, "REAL LTDA 120,00".to_string()),
            (6, "16/08 PADARIA 10,00".to_string()),
        ];
        let merged = merge_continuations(lines);
        assert_eq!(
            merged,
            vec![
                (4, "15/08 SUPERMERCADO REAL LTDA 120,00".to_string()),
                (6, "16/08 PADARIA 10,00".to_string()),
            ]
        );
    }

    #[test]
    fn test_dangling_marker_still_parses() {
        let merged = merge_continuations(vec![(9, r"15/08 LOJA 10,00 \".to_string())]);
        assert_eq!(merged, vec![(9, "15/08 LOJA 10,00".to_string())]);
    }

    #[test]
    fn test_chained_continuations() {
        let lines = vec![
            (1, r"15/08 A \".to_string()),
            (2, r"B \".to_string()),
            (3, "C 10,00".to_string()),
        ];
        assert_eq!(
            merge_continuations(lines),
            vec![(1, "15/08 A B C 10,00".to_string())]
        );
    }
}
