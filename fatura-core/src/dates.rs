//! `DD/MM` validation and year inference against the statement period.
//!
//! The year never appears on transaction lines. It is inferred from the
//! header period with one rollover rule: a month after the statement's
//! closing month belongs to the prior year (a December purchase on a
//! January statement).

use chrono::NaiveDate;
use thiserror::Error;

use crate::model::StatementHeader;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DateError {
    #[error("date token {0:?} is not DD/MM")]
    Shape(String),
    #[error("day {0} out of range 1-31")]
    DayRange(u32),
    #[error("month {0} out of range 1-12")]
    MonthRange(u32),
    #[error("no such calendar date: {day:02}/{month:02}/{year}")]
    Impossible { day: u32, month: u32, year: i32 },
}

/// A resolved calendar date, with a flag when it lands after the closing
/// date. Future dates are surfaced, never silently corrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDate {
    pub date: NaiveDate,
    pub future: bool,
}

pub fn resolve_date(token: &str, header: &StatementHeader) -> Result<ResolvedDate, DateError> {
    let token = token.trim();
    let (day_str, month_str) = token
        .split_once('/')
        .ok_or_else(|| DateError::Shape(token.to_string()))?;
    let day: u32 = parse_component(day_str).ok_or_else(|| DateError::Shape(token.to_string()))?;
    let month: u32 =
        parse_component(month_str).ok_or_else(|| DateError::Shape(token.to_string()))?;

    if !(1..=31).contains(&day) {
        return Err(DateError::DayRange(day));
    }
    if !(1..=12).contains(&month) {
        return Err(DateError::MonthRange(month));
    }

    let year = if month > header.period_month {
        header.period_year - 1
    } else {
        header.period_year
    };

    // from_ymd_opt rejects day-in-month overflow, leap years included
    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or(DateError::Impossible { day, month, year })?;

    Ok(ResolvedDate {
        date,
        future: date > header.closing_date(),
    })
}

fn parse_component(s: &str) -> Option<u32> {
    if s.is_empty() || s.len() > 2 || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(month: u32, year: i32, due: Option<(u32, u32, i32)>) -> StatementHeader {
        StatementHeader {
            period_month: month,
            period_year: year,
            due_date: due.and_then(|(d, m, y)| NaiveDate::from_ymd_opt(y, m, d)),
            declared_total: None,
            card_last4: None,
        }
    }

    #[test]
    fn test_same_year_resolution() {
        let resolved = resolve_date("15/08", &header(8, 2026, None)).unwrap();
        assert_eq!(resolved.date, NaiveDate::from_ymd_opt(2026, 8, 15).unwrap());
        assert!(!resolved.future);
    }

    #[test]
    fn test_rollover_to_prior_year() {
        // December purchase on a January statement
        let resolved = resolve_date("20/12", &header(1, 2026, None)).unwrap();
        assert_eq!(resolved.date, NaiveDate::from_ymd_opt(2025, 12, 20).unwrap());
        assert!(!resolved.future);
    }

    #[test]
    fn test_out_of_range_components() {
        assert_eq!(
            resolve_date("32/12", &header(12, 2026, None)),
            Err(DateError::DayRange(32))
        );
        assert_eq!(
            resolve_date("10/13", &header(12, 2026, None)),
            Err(DateError::MonthRange(13))
        );
        assert!(matches!(
            resolve_date("1508", &header(8, 2026, None)),
            Err(DateError::Shape(_))
        ));
        assert!(matches!(
            resolve_date("15/8a", &header(8, 2026, None)),
            Err(DateError::Shape(_))
        ));
    }

    #[test]
    fn test_leap_february() {
        // 2024 is a leap year, 2026 is not
        assert!(resolve_date("29/02", &header(3, 2024, None)).is_ok());
        assert_eq!(
            resolve_date("29/02", &header(3, 2026, None)),
            Err(DateError::Impossible {
                day: 29,
                month: 2,
                year: 2026
            })
        );
    }

    #[test]
    fn test_future_date_flagged_not_rejected() {
        // statement closes on the due date, 28/08; a 30/08 purchase is ahead
        let resolved = resolve_date("30/08", &header(8, 2026, Some((28, 8, 2026)))).unwrap();
        assert!(resolved.future);
        assert_eq!(resolved.date, NaiveDate::from_ymd_opt(2026, 8, 30).unwrap());
    }

    #[test]
    fn test_single_digit_tokens() {
        let resolved = resolve_date("1/2", &header(8, 2026, None)).unwrap();
        assert_eq!(resolved.date, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
    }
}
