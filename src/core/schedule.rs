//! Date cursor - computes the due date of the next occurrence in a series.
//!
//! The cursor advances whole months and then clamps the requested day-of-month to
//! the length of the resulting month, so a series scheduled on the 31st lands on
//! the last day of shorter months instead of spilling into the following one.
//! Everything here is pure and deterministic.

use crate::errors::{Error, Result};
use chrono::{Datelike, NaiveDate};

/// Returns the number of days in the given month.
#[must_use]
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if NaiveDate::from_ymd_opt(year, 2, 29).is_some() => 29,
        2 => 28,
        _ => 31,
    }
}

/// Checks the schedule parameters shared by the cursor and the materializer.
pub fn validate_schedule(day_of_month: u32, months_to_advance: u32) -> Result<()> {
    if !(1..=31).contains(&day_of_month) {
        return Err(Error::InvalidScheduleParameter {
            message: format!("day of month must be between 1 and 31, got {day_of_month}"),
        });
    }
    if months_to_advance < 1 {
        return Err(Error::InvalidScheduleParameter {
            message: "frequency must be at least one month".to_string(),
        });
    }
    Ok(())
}

/// Computes the next due date after `anchor_date`.
///
/// Advances the anchor's month by `months_to_advance` and sets the day to
/// `min(day_of_month, days_in_resulting_month)`. The anchor's own day is
/// ignored, which keeps a series scheduled on the 31st from drifting to the
/// 28th after passing through February.
///
/// # Arguments
/// * `anchor_date` - Due date of the previous occurrence
/// * `day_of_month` - Day the series was scheduled on (1-31)
/// * `months_to_advance` - Months to move forward, at least one
///
/// # Errors
/// `InvalidScheduleParameter` when `day_of_month` is outside `1..=31`, when
/// `months_to_advance` is zero, or when the result is outside the supported
/// calendar range.
pub fn next_due_date(
    anchor_date: NaiveDate,
    day_of_month: u32,
    months_to_advance: u32,
) -> Result<NaiveDate> {
    validate_schedule(day_of_month, months_to_advance)?;

    let month_index = i64::from(anchor_date.year()) * 12
        + i64::from(anchor_date.month0())
        + i64::from(months_to_advance);
    let year = i32::try_from(month_index.div_euclid(12)).map_err(|_| out_of_range(anchor_date))?;
    // rem_euclid(12) is always in 0..12
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let month = month_index.rem_euclid(12) as u32 + 1;

    let day = day_of_month.min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| out_of_range(anchor_date))
}

fn out_of_range(anchor_date: NaiveDate) -> Error {
    Error::InvalidScheduleParameter {
        message: format!("next due date after {anchor_date} is out of range"),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 1), 31);
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(days_in_month(2024, 12), 31);
    }

    #[test]
    fn test_day_31_clamps_to_leap_february() -> Result<()> {
        assert_eq!(next_due_date(date(2024, 1, 31), 31, 1)?, date(2024, 2, 29));
        Ok(())
    }

    #[test]
    fn test_day_31_clamps_to_common_february() -> Result<()> {
        assert_eq!(next_due_date(date(2023, 1, 31), 31, 1)?, date(2023, 2, 28));
        Ok(())
    }

    #[test]
    fn test_day_31_into_thirty_day_month() -> Result<()> {
        assert_eq!(next_due_date(date(2024, 3, 31), 31, 1)?, date(2024, 4, 30));
        Ok(())
    }

    #[test]
    fn test_day_of_month_restored_after_short_month() -> Result<()> {
        // Anchor already clamped to Feb 29, the requested day still wins
        assert_eq!(next_due_date(date(2024, 2, 29), 31, 1)?, date(2024, 3, 31));
        assert_eq!(next_due_date(date(2024, 2, 29), 30, 1)?, date(2024, 3, 30));
        Ok(())
    }

    #[test]
    fn test_advance_wraps_year() -> Result<()> {
        assert_eq!(next_due_date(date(2024, 11, 15), 15, 3)?, date(2025, 2, 15));
        assert_eq!(next_due_date(date(2024, 12, 1), 1, 12)?, date(2025, 12, 1));
        assert_eq!(next_due_date(date(2024, 1, 10), 10, 25)?, date(2026, 2, 10));
        Ok(())
    }

    #[test]
    fn test_result_day_is_min_of_requested_and_month_length() -> Result<()> {
        let anchor = date(2023, 1, 1);
        for months in 1..=24 {
            for day in 1..=31 {
                let next = next_due_date(anchor, day, months)?;
                assert_eq!(next.day(), day.min(days_in_month(next.year(), next.month())));
                assert!(next > anchor);
            }
        }
        Ok(())
    }

    #[test]
    fn test_invalid_day_of_month() {
        for day in [0, 32, 99] {
            let result = next_due_date(date(2024, 1, 1), day, 1);
            assert!(matches!(
                result,
                Err(Error::InvalidScheduleParameter { .. })
            ));
        }
    }

    #[test]
    fn test_zero_months_rejected() {
        let result = next_due_date(date(2024, 1, 1), 1, 0);
        assert!(matches!(
            result,
            Err(Error::InvalidScheduleParameter { .. })
        ));
    }
}
