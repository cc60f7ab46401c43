//! `XX/YY` installment suffix parsing and cross-statement group keys.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static RE_INSTALLMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})/(\d{1,2})\s*$").expect("installment regex"));

/// The documented installment convention; totals above this are flagged
/// but kept, since 24/36-month plans exist in the wild.
pub const CONVENTIONAL_MAX_TOTAL: u32 = 12;

/// Hard validation bound on either installment component.
pub const MAX_TOTAL: u32 = 99;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InstallmentError {
    #[error("installment {current}/{total} violates 1 <= current <= total <= {MAX_TOTAL}")]
    OutOfRange { current: u32, total: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Installment {
    pub current: u32,
    pub total: u32,
}

impl Installment {
    /// True when the total exceeds the 12-month convention but is still
    /// within the hard bound.
    pub fn over_convention(&self) -> bool {
        self.total > CONVENTIONAL_MAX_TOTAL
    }

    /// Key linking all records of one purchase across statements:
    /// normalized merchant text plus the total installment count.
    pub fn group_key(&self, merchant: &str) -> String {
        format!("{}|{:02}", normalize_merchant(merchant), self.total)
    }
}

/// Outcome of scanning a description for a trailing installment marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallmentScan {
    /// No suffix present; description untouched.
    None,
    /// Suffix parsed and in range; description has the suffix removed.
    Valid {
        installment: Installment,
        description: String,
    },
    /// Suffix present but out of range; it is discarded and the record
    /// continues as a plain transaction.
    Invalid {
        error: InstallmentError,
        description: String,
    },
}

pub fn scan_installment(description: &str) -> InstallmentScan {
    let Some(caps) = RE_INSTALLMENT.captures(description) else {
        return InstallmentScan::None;
    };
    let whole = caps.get(0).expect("match exists");
    let current: u32 = caps[1].parse().expect("digits");
    let total: u32 = caps[2].parse().expect("digits");
    let stripped = description[..whole.start()].trim_end().to_string();

    if current >= 1 && current <= total && total <= MAX_TOTAL {
        InstallmentScan::Valid {
            installment: Installment { current, total },
            description: stripped,
        }
    } else {
        InstallmentScan::Invalid {
            error: InstallmentError::OutOfRange { current, total },
            description: stripped,
        }
    }
}

/// Case-folded, whitespace-collapsed merchant text. Shared with the
/// deduplicator so both sides agree on what "same merchant" means.
pub fn normalize_merchant(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_suffix() {
        let scan = scan_installment("LIVRARIA CULTURA 04/12");
        match scan {
            InstallmentScan::Valid {
                installment,
                description,
            } => {
                assert_eq!(installment.current, 4);
                assert_eq!(installment.total, 12);
                assert!(!installment.over_convention());
                assert_eq!(description, "LIVRARIA CULTURA");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_current_above_total_rejected() {
        let scan = scan_installment("MAGAZINE NORTE 13/12");
        match scan {
            InstallmentScan::Invalid { error, description } => {
                assert_eq!(
                    error,
                    InstallmentError::OutOfRange {
                        current: 13,
                        total: 12
                    }
                );
                assert_eq!(description, "MAGAZINE NORTE");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_long_plan_kept_but_over_convention() {
        match scan_installment("MOVEIS PLANALTO 02/36") {
            InstallmentScan::Valid { installment, .. } => {
                assert!(installment.over_convention());
                assert_eq!(installment.total, 36);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_zero_current_rejected() {
        assert!(matches!(
            scan_installment("LOJA SUL 00/10"),
            InstallmentScan::Invalid { .. }
        ));
    }

    #[test]
    fn test_no_suffix() {
        assert_eq!(scan_installment("PADARIA DO BAIRRO"), InstallmentScan::None);
    }

    #[test]
    fn test_group_key_links_across_statements() {
        let a = Installment {
            current: 3,
            total: 12,
        };
        let b = Installment {
            current: 4,
            total: 12,
        };
        assert_eq!(
            a.group_key("Livraria   Cultura"),
            b.group_key("LIVRARIA CULTURA")
        );
        assert_eq!(a.group_key("LIVRARIA CULTURA"), "livraria cultura|12");
    }
}
