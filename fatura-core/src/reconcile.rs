//! Reconciliation of the extracted sum against the statement's declared
//! total. The accuracy score is the pipeline's authoritative correctness
//! signal.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::model::Transaction;

/// Scores below this report as the floor itself. The floor is negative on
/// purpose: a wildly wrong extraction must read as systemic failure, not
/// as a zero that rounding noise could also produce.
pub const ACCURACY_FLOOR: f64 = -100.0;

/// Derived whenever the transaction set changes; never mutated directly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconciliationSummary {
    pub declared_total: Decimal,
    pub extracted_total: Decimal,
    pub absolute_difference: Decimal,
    pub relative_difference: f64,
    /// `100 x (1 - |declared - extracted| / |declared|)`, floored at
    /// [`ACCURACY_FLOOR`].
    pub accuracy_score: f64,
}

pub fn reconcile(declared_total: Decimal, transactions: &[Transaction]) -> ReconciliationSummary {
    let extracted_total: Decimal = transactions.iter().map(|t| t.amount).sum();
    let absolute_difference = (declared_total - extracted_total).abs();

    let relative_difference = if declared_total == Decimal::ZERO {
        if absolute_difference == Decimal::ZERO {
            0.0
        } else {
            f64::INFINITY
        }
    } else {
        (absolute_difference / declared_total.abs())
            .to_f64()
            .unwrap_or(f64::INFINITY)
    };

    let accuracy_score = (100.0 * (1.0 - relative_difference)).max(ACCURACY_FLOOR);

    ReconciliationSummary {
        declared_total,
        extracted_total,
        absolute_difference,
        relative_difference,
        accuracy_score,
    }
}
