//! International-line decomposition.
//!
//! Composite shape after the date token:
//! `DESC AMOUNT_BRL CCY AMOUNT_ORIG = FX_RATE BRL [LOCATION]`
//! e.g. `APPLE.COM/BILL 57,54 USD 9,99 = 5,76 BRL ROMA`.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;

use crate::amount::{AmountError, normalize_amount};

static RE_FX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:(?P<desc>.*?)\s+)?",
        r"(?P<brl>\(?-?[\d.,]+\)?-?)\s+",
        r"(?P<ccy>[A-Za-z]{2,4})\s+",
        r"(?P<orig>\(?-?[\d.,]+\)?-?)\s*",
        r"=\s*(?P<rate>[\d.,]+)\s*BRL",
        r"(?:\s+(?P<loc>\S.*))?$",
    ))
    .expect("fx regex")
});

/// Issuer rounding makes small BRL/rate mismatches normal; anything past
/// this relative bound is flagged.
const RATE_TOLERANCE: f64 = 0.01;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FxError {
    #[error(transparent)]
    Amount(#[from] AmountError),
    #[error("unparseable exchange rate {0:?}")]
    Rate(String),
}

/// Soft findings on an otherwise-valid FX line. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FxIssue {
    /// `AMOUNT_BRL` strays from `AMOUNT_ORIG x FX_RATE` beyond tolerance.
    RateMismatch { expected: Decimal },
    /// Currency token is not a plain 3-letter code.
    OddCurrencyCode(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FxParse {
    pub description: String,
    pub amount_brl: Decimal,
    pub original_amount: Decimal,
    pub currency: String,
    pub exchange_rate: Decimal,
    pub location: Option<String>,
    pub issues: Vec<FxIssue>,
}

/// Try the FX composite shape on the post-date remainder of a line.
///
/// `None` means the line is not FX-shaped and should fall through to the
/// next category rule. `Some(Err(_))` means it is FX-shaped but carries an
/// unusable amount or rate.
pub fn match_fx(rest: &str) -> Option<Result<FxParse, FxError>> {
    let caps = RE_FX.captures(rest.trim())?;
    Some(build(&caps))
}

fn build(caps: &regex::Captures<'_>) -> Result<FxParse, FxError> {
    let amount_brl = normalize_amount(&caps["brl"])?;
    let original_amount = normalize_amount(&caps["orig"])?;
    let exchange_rate = parse_rate(&caps["rate"])?;

    let raw_ccy = &caps["ccy"];
    let mut issues = Vec::new();
    if raw_ccy.len() != 3 || !raw_ccy.chars().all(|c| c.is_ascii_uppercase()) {
        issues.push(FxIssue::OddCurrencyCode(raw_ccy.to_string()));
    }

    let expected = (original_amount * exchange_rate).round_dp(2);
    if out_of_tolerance(amount_brl, original_amount * exchange_rate) {
        issues.push(FxIssue::RateMismatch { expected });
    }

    Ok(FxParse {
        description: caps
            .name("desc")
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default(),
        amount_brl,
        original_amount,
        currency: raw_ccy.to_ascii_uppercase(),
        exchange_rate,
        location: caps.name("loc").map(|m| m.as_str().trim().to_string()),
        issues,
    })
}

fn out_of_tolerance(amount_brl: Decimal, product: Decimal) -> bool {
    if amount_brl == Decimal::ZERO {
        return product != Decimal::ZERO;
    }
    let relative = ((amount_brl - product).abs() / amount_brl.abs())
        .to_f64()
        .unwrap_or(f64::INFINITY);
    relative > RATE_TOLERANCE
}

/// Exchange rates use the comma decimal too, with up to four fractional
/// digits, and must be positive.
fn parse_rate(raw: &str) -> Result<Decimal, FxError> {
    let err = || FxError::Rate(raw.to_string());
    if raw.matches(',').count() > 1 || raw.contains('.') {
        return Err(err());
    }
    let value = Decimal::from_str(&raw.replace(',', ".")).map_err(|_| err())?;
    if value <= Decimal::ZERO || value.scale() > 4 {
        return Err(err());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_bare_composite_line() {
        let fx = match_fx("57,54 USD 9,99 = 5,76 BRL ROMA").unwrap().unwrap();
        assert_eq!(fx.amount_brl, dec!(57.54));
        assert_eq!(fx.original_amount, dec!(9.99));
        assert_eq!(fx.currency, "USD");
        assert_eq!(fx.exchange_rate, dec!(5.76));
        assert_eq!(fx.location.as_deref(), Some("ROMA"));
        // 9.99 x 5.76 = 57.5424, within tolerance
        assert!(fx.issues.is_empty());
    }

    #[test]
    fn test_description_and_no_location() {
        let fx = match_fx("APPLE.COM/BILL 57,54 USD 9,99 = 5,76 BRL")
            .unwrap()
            .unwrap();
        assert_eq!(fx.description, "APPLE.COM/BILL");
        assert_eq!(fx.location, None);
    }

    #[test]
    fn test_rate_mismatch_flagged_not_rejected() {
        let fx = match_fx("100,00 USD 9,99 = 5,76 BRL LISBOA")
            .unwrap()
            .unwrap();
        assert_eq!(
            fx.issues,
            vec![FxIssue::RateMismatch {
                expected: dec!(57.54)
            }]
        );
    }

    #[test]
    fn test_odd_currency_code_flagged() {
        let fx = match_fx("57,54 usd 9,99 = 5,76 BRL").unwrap().unwrap();
        assert_eq!(fx.currency, "USD");
        assert_eq!(fx.issues, vec![FxIssue::OddCurrencyCode("usd".into())]);

        let fx = match_fx("57,54 EURO 9,99 = 5,76 BRL").unwrap().unwrap();
        assert_eq!(fx.issues, vec![FxIssue::OddCurrencyCode("EURO".into())]);
    }

    #[test]
    fn test_non_fx_lines_fall_through() {
        assert!(match_fx("PADARIA DO BAIRRO 32,90").is_none());
        assert!(match_fx("57,54 USD 9,99").is_none());
    }

    #[test]
    fn test_bad_rate_is_an_error() {
        assert!(matches!(
            match_fx("57,54 USD 9,99 = 0,00 BRL"),
            Some(Err(FxError::Rate(_)))
        ));
        assert!(matches!(
            match_fx("57,54 USD 9,99 = 5.76 BRL"),
            Some(Err(FxError::Rate(_)))
        ));
    }

    #[test]
    fn test_negative_refund_abroad() {
        let fx = match_fx("57,54- USD 9,99- = 5,76 BRL").unwrap().unwrap();
        assert_eq!(fx.amount_brl, dec!(-57.54));
        assert_eq!(fx.original_amount, dec!(-9.99));
        assert!(fx.issues.is_empty());
    }
}
