//! Amount normalization for the statement's locale: `.` groups thousands,
//! `,` marks decimals, negativity arrives as a leading minus, a trailing
//! minus, or parenthesis wrapping.
//!
//! Tokens using the reverse convention are rejected, never reinterpreted.

use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("empty amount token")]
    Empty,
    #[error("'.' used as decimal separator in {0:?}")]
    ReversedSeparators(String),
    #[error("more than one decimal separator in {0:?}")]
    MultipleDecimalSeparators(String),
    #[error("malformed amount token {0:?}")]
    Malformed(String),
}

/// Convert a raw amount token into a signed decimal with exactly two
/// fractional digits.
///
/// Accepted shapes: `1.234,56`, `1234,56`, `,50` (integer part elided),
/// `1234` (cents elided), each optionally negated by `-1,00`, `1,00-` or
/// `(1,00)`, with an optional `R$` prefix.
pub fn normalize_amount(raw: &str) -> Result<Decimal, AmountError> {
    let original = raw.trim().to_string();
    let mut s = original.replace("R$", "");
    s.retain(|c| !c.is_whitespace());
    if s.is_empty() {
        return Err(AmountError::Empty);
    }

    let mut negative = false;
    if s.len() >= 2 && s.starts_with('(') && s.ends_with(')') {
        negative = true;
        s = s[1..s.len() - 1].to_string();
    }
    if let Some(rest) = s.strip_prefix('-') {
        negative = true;
        s = rest.to_string();
    }
    if let Some(rest) = s.strip_suffix('-') {
        negative = true;
        s = rest.to_string();
    }
    if s.is_empty() {
        return Err(AmountError::Empty);
    }
    if !s.chars().all(|c| c.is_ascii_digit() || c == ',' || c == '.') {
        return Err(AmountError::Malformed(original));
    }

    let comma_count = s.matches(',').count();
    if comma_count > 1 {
        return Err(AmountError::MultipleDecimalSeparators(original));
    }

    let (int_part, frac_part) = match s.split_once(',') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (s.clone(), None),
    };

    let frac = match &frac_part {
        Some(f) => {
            if f.contains('.') {
                // "1,234.56" style
                return Err(AmountError::ReversedSeparators(original));
            }
            if f.is_empty() || f.len() > 2 {
                return Err(AmountError::Malformed(original));
            }
            format!("{f:0<2}")
        }
        None => "00".to_string(),
    };

    let digits = if int_part.is_empty() {
        // partial token like ",50"
        "0".to_string()
    } else if int_part.contains('.') {
        strip_thousands(&int_part).ok_or_else(|| {
            if frac_part.is_none() {
                // "1.23" reads as a period-decimal token
                AmountError::ReversedSeparators(original.clone())
            } else {
                AmountError::Malformed(original.clone())
            }
        })?
    } else {
        int_part
    };

    let mut value = Decimal::from_str(&format!("{digits}.{frac}"))
        .map_err(|_| AmountError::Malformed(original))?;
    if negative && value != Decimal::ZERO {
        value.set_sign_negative(true);
    }
    Ok(value)
}

/// Validate `1.234.567` style grouping and return the bare digits.
fn strip_thousands(int_part: &str) -> Option<String> {
    let mut groups = int_part.split('.');
    let first = groups.next()?;
    if first.is_empty() || first.len() > 3 {
        return None;
    }
    let mut digits = first.to_string();
    for group in groups {
        if group.len() != 3 {
            return None;
        }
        digits.push_str(group);
    }
    Some(digits)
}

/// Render a canonical decimal back in the statement's locale, e.g.
/// `-1234.56` → `"-1.234,56"`.
pub fn format_brl(amount: Decimal) -> String {
    let mut value = amount;
    value.rescale(2);
    let text = value.abs().to_string();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::new();
    let bytes = int_part.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 && (bytes.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*b as char);
    }

    let sign = if value.is_sign_negative() { "-" } else { "" };
    format!("{sign}{grouped},{frac_part}")
}
