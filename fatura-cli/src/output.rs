//! Rendering of parse results: flat CSV for spreadsheets, JSON for
//! everything else. The core never serializes; that boundary lives here.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use fatura_core::{Category, Origin, ParseResult, Transaction};
use rust_decimal::Decimal;
use serde::Serialize;

/// One CSV row per transaction, columns fixed by the output contract.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    date: NaiveDate,
    description: &'a str,
    category: Category,
    amount: Decimal,
    currency: &'a str,
    installment_current: Option<u32>,
    installment_total: Option<u32>,
    original_amount: Option<Decimal>,
    original_currency: Option<&'a str>,
    exchange_rate: Option<Decimal>,
    origin: Option<Origin>,
    card_last4: Option<&'a str>,
    location: Option<&'a str>,
    source_line: usize,
    duplicate_of: Option<usize>,
}

impl<'a> From<&'a Transaction> for CsvRow<'a> {
    fn from(txn: &'a Transaction) -> Self {
        Self {
            date: txn.date,
            description: &txn.description,
            category: txn.category,
            amount: txn.amount,
            currency: &txn.currency,
            installment_current: txn.installment_current,
            installment_total: txn.installment_total,
            original_amount: txn.original_amount,
            original_currency: txn.original_currency.as_deref(),
            exchange_rate: txn.exchange_rate,
            origin: txn.origin,
            card_last4: txn.card_last4.as_deref(),
            location: txn.location.as_deref(),
            source_line: txn.source_line,
            duplicate_of: txn.duplicate_of,
        }
    }
}

pub fn write_csv(result: &ParseResult, writer: impl Write) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for txn in &result.transactions {
        csv_writer
            .serialize(CsvRow::from(txn))
            .context("serializing transaction row")?;
    }
    csv_writer.flush().context("flushing csv")?;
    Ok(())
}

pub fn write_json(result: &ParseResult, writer: impl Write) -> Result<()> {
    serde_json::to_writer_pretty(writer, result).context("serializing parse result")?;
    Ok(())
}
