//! Statement domain types: header, transactions, and the parse outcome.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::reconcile::ReconciliationSummary;

/// Primary transaction category. Secondary traits (international,
/// installment, virtual-card) live as flags on [`Transaction`] because the
/// statement taxonomy is not mutually exclusive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    #[serde(rename = "domestic")]
    Domestic,
    #[serde(rename = "international")]
    International,
    #[serde(rename = "installment")]
    Installment,
    #[serde(rename = "payment")]
    Payment,
    #[serde(rename = "refund")]
    Refund,
    #[serde(rename = "fee")]
    Fee,
    #[serde(rename = "adjustment")]
    Adjustment,
    #[serde(rename = "digital")]
    Digital,
}

/// Marker prefix found on the merchant text, recorded instead of discarded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Origin {
    /// `@` virtual-card purchases
    #[serde(rename = "virtual")]
    Virtual,
    /// `~g` wallet purchases
    #[serde(rename = "wallet-g")]
    WalletG,
    /// `~h` wallet purchases
    #[serde(rename = "wallet-h")]
    WalletH,
    /// `PAG*` payment-aggregator purchases
    #[serde(rename = "aggregator")]
    Aggregator,
    /// `MP*` marketplace purchases
    #[serde(rename = "marketplace")]
    Marketplace,
}

/// Statement-level facts parsed once per document, read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatementHeader {
    /// Statement period as (month, year), e.g. (8, 2026) for `FATURA 08/2026`.
    pub period_month: u32,
    pub period_year: i32,
    pub due_date: Option<NaiveDate>,
    /// `TOTAL A PAGAR` as printed; None when the statement never declares one.
    pub declared_total: Option<Decimal>,
    /// Card identified by `final NNNN`.
    pub card_last4: Option<String>,
}

impl StatementHeader {
    /// The date transactions must not land after. The due date doubles as
    /// the closing boundary when printed; otherwise the period month's last
    /// day is used.
    pub fn closing_date(&self) -> NaiveDate {
        if let Some(due) = self.due_date {
            return due;
        }
        last_day_of_month(self.period_year, self.period_month)
    }
}

pub(crate) fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_y, next_m) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_y, next_m, 1)
        .unwrap_or(NaiveDate::MAX)
        .pred_opt()
        .unwrap_or(NaiveDate::MAX)
}

/// One extracted statement line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub date: NaiveDate,
    /// Merchant text with marker prefixes and card tokens stripped.
    pub description: String,
    pub category: Category,
    /// Signed BRL amount, canonical two fractional digits.
    pub amount: Decimal,
    pub currency: String,

    pub is_international: bool,
    pub is_installment: bool,
    pub is_virtual: bool,

    pub installment_current: Option<u32>,
    pub installment_total: Option<u32>,
    /// Normalized merchant + installment total; links related records
    /// across statements without owning them.
    pub group_key: Option<String>,

    pub original_amount: Option<Decimal>,
    pub original_currency: Option<String>,
    pub exchange_rate: Option<Decimal>,
    pub location: Option<String>,

    pub origin: Option<Origin>,
    pub card_last4: Option<String>,

    /// 1-based line number in the input text.
    pub source_line: usize,
    /// Source line of the earlier record this one likely repeats.
    pub duplicate_of: Option<usize>,
}

impl Transaction {
    pub fn is_expense(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    pub fn is_credit(&self) -> bool {
        self.amount < Decimal::ZERO
    }
}

/// Everything one parse invocation produces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParseResult {
    pub header: Option<StatementHeader>,
    pub transactions: Vec<Transaction>,
    pub diagnostics: Diagnostics,
    pub reconciliation: Option<ReconciliationSummary>,
}

impl ParseResult {
    /// True when the document failed before any transaction could be read.
    pub fn is_fatal(&self) -> bool {
        self.diagnostics.has_fatal()
    }

    /// Count of records per primary category, for batch summaries.
    pub fn category_counts(&self) -> HashMap<Category, usize> {
        let mut counts = HashMap::new();
        for txn in &self.transactions {
            *counts.entry(txn.category).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(
            last_day_of_month(2026, 8),
            NaiveDate::from_ymd_opt(2026, 8, 31).unwrap()
        );
        assert_eq!(
            last_day_of_month(2024, 2),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            last_day_of_month(2026, 12),
            NaiveDate::from_ymd_opt(2026, 12, 31).unwrap()
        );
    }

    #[test]
    fn test_closing_date_prefers_due_date() {
        let header = StatementHeader {
            period_month: 8,
            period_year: 2026,
            due_date: NaiveDate::from_ymd_opt(2026, 8, 28),
            declared_total: None,
            card_last4: None,
        };
        assert_eq!(
            header.closing_date(),
            NaiveDate::from_ymd_opt(2026, 8, 28).unwrap()
        );
    }

    #[test]
    fn test_category_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Category::International).unwrap(),
            "\"international\""
        );
        assert_eq!(
            serde_json::to_string(&Origin::Aggregator).unwrap(),
            "\"aggregator\""
        );
    }
}
