// src/common/spending_date.rs

use chrono::{DateTime, FixedOffset, Local, LocalResult, NaiveDate, NaiveDateTime, TimeZone};
use thiserror::Error;

pub const SPENDING_DATE_MESSAGE: &str =
    "The request body value expenseSpendingDate is invalid. Expected format: YYYY-MM (example: 2024-12)";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpendingDateError {
    #[error("expected YYYY-MM, got {0:?}")]
    Format(String),

    #[error("{0:?} is not a valid month")]
    OutOfRange(String),
}

/// Converte `YYYY-MM` no dia 1 do mês, à meia-noite no fuso local.
pub fn parse_spending_date(input: &str) -> Result<DateTime<FixedOffset>, SpendingDateError> {
    let date = parse_year_month(input)?;
    Ok(local_midnight(date))
}

fn parse_year_month(input: &str) -> Result<NaiveDate, SpendingDateError> {
    let bytes = input.as_bytes();
    let well_formed = bytes.len() == 7
        && bytes[4] == b'-'
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[5..].iter().all(u8::is_ascii_digit);

    if !well_formed {
        return Err(SpendingDateError::Format(input.to_string()));
    }

    let year: i32 = input[..4]
        .parse()
        .map_err(|_| SpendingDateError::Format(input.to_string()))?;
    let month: u32 = input[5..]
        .parse()
        .map_err(|_| SpendingDateError::Format(input.to_string()))?;

    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| SpendingDateError::OutOfRange(input.to_string()))
}

fn local_midnight(date: NaiveDate) -> DateTime<FixedOffset> {
    let midnight = date.and_time(chrono::NaiveTime::MIN);

    match Local.from_local_datetime(&midnight) {
        LocalResult::Single(dt) => dt.fixed_offset(),
        LocalResult::Ambiguous(earliest, _) => earliest.fixed_offset(),
        // Meia-noite caiu num salto de horário de verão: usa o primeiro instante válido
        LocalResult::None => first_valid_after(midnight),
    }
}

fn first_valid_after(naive: NaiveDateTime) -> DateTime<FixedOffset> {
    let mut candidate = naive;
    for _ in 0..(4 * 60) {
        candidate += chrono::TimeDelta::minutes(1);
        if let Some(dt) = Local.from_local_datetime(&candidate).earliest() {
            return dt.fixed_offset();
        }
    }
    // Nenhum fuso real tem um salto tão grande
    naive.and_utc().fixed_offset()
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn december_is_first_day_at_local_midnight() {
        let parsed = parse_spending_date("2024-12").unwrap();
        let expected = Local.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap();

        assert_eq!(parsed, expected);
        assert_eq!((parsed.year(), parsed.month(), parsed.day()), (2024, 12, 1));
        assert_eq!((parsed.hour(), parsed.minute(), parsed.second()), (0, 0, 0));
    }

    #[test]
    fn january_is_accepted() {
        let parsed = parse_spending_date("1999-01").unwrap();
        assert_eq!((parsed.year(), parsed.month(), parsed.day()), (1999, 1, 1));
    }

    #[test]
    fn rejects_anything_that_is_not_year_dash_month() {
        for input in ["", "2024", "2024-1", "24-12", "2024/12", "2024-12-01", " 2024-12", "2024-1a", "+024-12"] {
            assert_eq!(
                parse_spending_date(input),
                Err(SpendingDateError::Format(input.to_string())),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_months_out_of_range() {
        for input in ["2024-00", "2024-13"] {
            assert_eq!(
                parse_spending_date(input),
                Err(SpendingDateError::OutOfRange(input.to_string()))
            );
        }
    }
}
