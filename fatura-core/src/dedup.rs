//! Same-day repeat detection. Detection only: legitimate repeat purchases
//! exist, so both records always stay in the output.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::installment::normalize_merchant;
use crate::model::Transaction;

/// Flag later records that repeat an earlier record's date, amount and
/// normalized merchant, pointing `duplicate_of` at the first sighting.
pub fn flag_duplicates(transactions: &mut [Transaction], diagnostics: &mut Diagnostics) {
    let mut seen: HashMap<(NaiveDate, Decimal, String), usize> = HashMap::new();

    for txn in transactions.iter_mut() {
        let key = (txn.date, txn.amount, normalize_merchant(&txn.description));
        match seen.get(&key) {
            Some(&first_line) => {
                txn.duplicate_of = Some(first_line);
                diagnostics.warning(
                    DiagnosticKind::DuplicateTransaction,
                    txn.source_line,
                    format!(
                        "repeats the transaction on line {first_line} (same date, amount, merchant)"
                    ),
                    txn.description.clone(),
                );
            }
            None => {
                seen.insert(key, txn.source_line);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use rust_decimal_macros::dec;

    fn txn(line: usize, desc: &str, amount: Decimal) -> Transaction {
        Transaction {
            date: NaiveDate::from_ymd_opt(2026, 8, 15).unwrap(),
            description: desc.to_string(),
            category: Category::Domestic,
            amount,
            currency: "BRL".to_string(),
            is_international: false,
            is_installment: false,
            is_virtual: false,
            installment_current: None,
            installment_total: None,
            group_key: None,
            original_amount: None,
            original_currency: None,
            exchange_rate: None,
            location: None,
            origin: None,
            card_last4: None,
            source_line: line,
            duplicate_of: None,
        }
    }

    #[test]
    fn test_second_record_flagged_both_kept() {
        let mut txns = vec![
            txn(10, "CAFE DA PRACA", dec!(8.50)),
            txn(14, "cafe  da praca", dec!(8.50)),
        ];
        let mut diags = Diagnostics::new();
        flag_duplicates(&mut txns, &mut diags);

        assert_eq!(txns.len(), 2);
        assert_eq!(txns[0].duplicate_of, None);
        assert_eq!(txns[1].duplicate_of, Some(10));
        assert_eq!(diags.count_of(DiagnosticKind::DuplicateTransaction), 1);
    }

    #[test]
    fn test_different_amount_is_not_duplicate() {
        let mut txns = vec![
            txn(10, "CAFE DA PRACA", dec!(8.50)),
            txn(14, "CAFE DA PRACA", dec!(9.50)),
        ];
        let mut diags = Diagnostics::new();
        flag_duplicates(&mut txns, &mut diags);
        assert!(txns.iter().all(|t| t.duplicate_of.is_none()));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_third_repeat_points_at_first() {
        let mut txns = vec![
            txn(10, "CAFE", dec!(8.50)),
            txn(14, "CAFE", dec!(8.50)),
            txn(19, "CAFE", dec!(8.50)),
        ];
        let mut diags = Diagnostics::new();
        flag_duplicates(&mut txns, &mut diags);
        assert_eq!(txns[1].duplicate_of, Some(10));
        assert_eq!(txns[2].duplicate_of, Some(10));
    }
}
