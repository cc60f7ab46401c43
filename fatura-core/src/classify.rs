//! Transaction-line classification: marker-prefix stripping and the
//! ordered category rule table.
//!
//! Rules are tried most-specific-first; the tables are built once and
//! shared read-only across parses.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

use crate::model::{Category, Origin};

/// `DD/MM` followed by anything; the gate into per-category matching.
pub static RE_TXN_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<date>\d{1,2}/\d{1,2})\s+(?P<rest>.+)$").expect("txn regex"));

/// Generic domestic tail: description then one amount token.
pub static RE_DOMESTIC_TAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<desc>.+?)\s+(?P<amt>\(?-?[\d.,]+\)?-?)$").expect("domestic regex")
});

/// `final NNNN` card marker, printed inside some transaction lines.
pub static RE_CARD_FINAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*\bfinal\s+(\d{4})\b").expect("card regex"));

/// Remove a `final NNNN` marker anywhere in the line, returning the last
/// four digits separately.
pub fn extract_card(line: &str) -> (String, Option<String>) {
    match RE_CARD_FINAL.captures(line) {
        Some(caps) => {
            let last4 = caps[1].to_string();
            let whole = caps.get(0).expect("match exists");
            let mut cleaned = String::with_capacity(line.len());
            cleaned.push_str(&line[..whole.start()]);
            cleaned.push_str(&line[whole.end()..]);
            (cleaned.trim().to_string(), Some(last4))
        }
        None => (line.trim().to_string(), None),
    }
}

/// Marker prefixes, ordered; applied before categorization. The stripped
/// marker survives as [`Origin`] rather than being discarded.
const PREFIX_RULES: &[(&str, Origin)] = &[
    ("@", Origin::Virtual),
    ("~g", Origin::WalletG),
    ("~h", Origin::WalletH),
    ("PAG*", Origin::Aggregator),
    ("MP*", Origin::Marketplace),
];

pub fn strip_origin(description: &str) -> (String, Option<Origin>) {
    let trimmed = description.trim();
    for &(prefix, origin) in PREFIX_RULES {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            return (rest.trim_start().to_string(), Some(origin));
        }
    }
    (trimmed.to_string(), None)
}

struct CategoryRule {
    pattern: Regex,
    category: Category,
}

/// Keyword rules from the issuer's own vocabulary, first match wins.
static CATEGORY_RULES: LazyLock<Vec<CategoryRule>> = LazyLock::new(|| {
    [
        (r"^PAGAMENTO\b", Category::Payment),
        (r"\b(ESTORNO|CANCELAMENTO)\b", Category::Refund),
        (r"\bAJUSTE\b", Category::Adjustment),
        (
            r"\b(IOF|JUROS|MULTA|ENCARGOS|ANUIDADE|TARIFA)\b",
            Category::Fee,
        ),
    ]
    .into_iter()
    .map(|(pattern, category)| CategoryRule {
        pattern: Regex::new(pattern).expect("category regex"),
        category,
    })
    .collect()
});

pub fn keyword_category(description: &str) -> Option<Category> {
    let upper = description.to_uppercase();
    CATEGORY_RULES
        .iter()
        .find(|rule| rule.pattern.is_match(&upper))
        .map(|rule| rule.category)
}

/// Tiny balancing entries the issuer books against rounding; anything at
/// or under 0.30 that no keyword claimed is an adjustment.
pub fn is_micro_adjustment(amount: Decimal) -> bool {
    let abs = amount.abs();
    abs > Decimal::ZERO && abs <= Decimal::new(30, 2)
}

/// Resolve the primary category for a non-FX record after keyword rules,
/// the micro-adjustment rule, the installment marker and the origin prefix
/// have all been observed.
pub fn primary_category(
    keyword: Option<Category>,
    amount: Decimal,
    has_installment: bool,
    origin: Option<Origin>,
) -> Category {
    if is_micro_adjustment(amount) {
        return Category::Adjustment;
    }
    if let Some(category) = keyword {
        return category;
    }
    if has_installment {
        return Category::Installment;
    }
    match origin {
        Some(Origin::Virtual | Origin::WalletG | Origin::WalletH) => Category::Digital,
        _ => Category::Domestic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_prefix_stripping() {
        assert_eq!(
            strip_origin("@NETFLIX.COM"),
            ("NETFLIX.COM".to_string(), Some(Origin::Virtual))
        );
        assert_eq!(
            strip_origin("~g SUPERMERCADO REAL"),
            ("SUPERMERCADO REAL".to_string(), Some(Origin::WalletG))
        );
        assert_eq!(
            strip_origin("~h FARMACIA CENTRAL"),
            ("FARMACIA CENTRAL".to_string(), Some(Origin::WalletH))
        );
        assert_eq!(
            strip_origin("PAG*JOSE DA SILVA"),
            ("JOSE DA SILVA".to_string(), Some(Origin::Aggregator))
        );
        assert_eq!(
            strip_origin("MP*LOJADOPEDRO"),
            ("LOJADOPEDRO".to_string(), Some(Origin::Marketplace))
        );
        assert_eq!(strip_origin("PADARIA"), ("PADARIA".to_string(), None));
    }

    #[test]
    fn test_keyword_rules_ordered() {
        assert_eq!(
            keyword_category("PAGAMENTO EFETUADO"),
            Some(Category::Payment)
        );
        assert_eq!(
            keyword_category("ESTORNO COMPRA LOJA X"),
            Some(Category::Refund)
        );
        assert_eq!(
            keyword_category("AJUSTE DE COBRANCA"),
            Some(Category::Adjustment)
        );
        assert_eq!(
            keyword_category("IOF TRANSACAO EXTERIOR"),
            Some(Category::Fee)
        );
        assert_eq!(keyword_category("anuidade diferenciada"), Some(Category::Fee));
        assert_eq!(keyword_category("PADARIA DO BAIRRO"), None);
        // PAGAMENTO must start the description, per the issuer's layout
        assert_eq!(keyword_category("LOJA PAGAMENTO FACIL"), None);
    }

    #[test]
    fn test_micro_adjustment_bounds() {
        assert!(is_micro_adjustment(dec!(0.30)));
        assert!(is_micro_adjustment(dec!(-0.01)));
        assert!(!is_micro_adjustment(dec!(0.31)));
        assert!(!is_micro_adjustment(dec!(0.00)));
    }

    #[test]
    fn test_primary_category_precedence() {
        assert_eq!(
            primary_category(None, dec!(0.12), false, None),
            Category::Adjustment
        );
        assert_eq!(
            primary_category(Some(Category::Payment), dec!(-500.00), true, None),
            Category::Payment
        );
        assert_eq!(
            primary_category(None, dec!(120.00), true, Some(Origin::Virtual)),
            Category::Installment
        );
        assert_eq!(
            primary_category(None, dec!(39.90), false, Some(Origin::Virtual)),
            Category::Digital
        );
        assert_eq!(
            primary_category(None, dec!(39.90), false, Some(Origin::Aggregator)),
            Category::Domestic
        );
    }

    #[test]
    fn test_card_extraction() {
        let (line, card) = extract_card("15/08 PADARIA final 4321 32,90");
        assert_eq!(card.as_deref(), Some("4321"));
        assert_eq!(line, "15/08 PADARIA 32,90");
        let (line, card) = extract_card("15/08 PADARIA 32,90");
        assert_eq!(card, None);
        assert_eq!(line, "15/08 PADARIA 32,90");
    }
}
