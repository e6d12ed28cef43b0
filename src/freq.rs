//! The recurrence-rule collaborator (§6 `FreqSpec`): `next_instance(from)
//! -> date`. spec §1 keeps the commodity catalogue and account tree out
//! of scope the same way; here the *specific* calendar algebra (monthly,
//! weekly, etc.) is likewise an external concern the SX engine only
//! consumes through this one method, but a concrete enum is supplied so
//! the engine is exercisable without a caller-supplied implementation.

use chrono::{Datelike, Months, NaiveDate, Weekday};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreqSpec {
    Daily,
    Weekly { weekday: Weekday },
    Monthly { day: u32 },
    Yearly { month: u32, day: u32 },
}

impl FreqSpec {
    /// First occurrence strictly after `from`.
    pub fn next_instance(&self, from: NaiveDate) -> NaiveDate {
        match *self {
            FreqSpec::Daily => from.succ_opt().unwrap_or(from),
            FreqSpec::Weekly { weekday } => {
                let mut candidate = from.succ_opt().unwrap_or(from);
                while candidate.weekday() != weekday {
                    candidate = candidate.succ_opt().unwrap_or(candidate);
                }
                candidate
            }
            FreqSpec::Monthly { day } => {
                let mut candidate = next_month_on_day(from, day);
                while candidate <= from {
                    candidate = next_month_on_day(candidate, day);
                }
                candidate
            }
            FreqSpec::Yearly { month, day } => {
                let mut year = from.year();
                let mut candidate = clamp_date(year, month, day);
                while candidate <= from {
                    year += 1;
                    candidate = clamp_date(year, month, day);
                }
                candidate
            }
        }
    }
}

fn clamp_date(year: i32, month: u32, day: u32) -> NaiveDate {
    let last_of_month = days_in_month(year, month);
    NaiveDate::from_ymd_opt(year, month, day.min(last_of_month))
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, month, 1).expect("valid first-of-month"))
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let next_month_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("valid month boundary");
    next_month_first.pred_opt().expect("non-empty month").day()
}

fn next_month_on_day(from: NaiveDate, day: u32) -> NaiveDate {
    let candidate_this_month = clamp_date(from.year(), from.month(), day);
    if candidate_this_month > from {
        return candidate_this_month;
    }
    let next = from
        .checked_add_months(Months::new(1))
        .unwrap_or(from);
    clamp_date(next.year(), next.month(), day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monthly_on_day() {
        let freq = FreqSpec::Monthly { day: 15 };
        let start = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(
            freq.next_instance(start),
            NaiveDate::from_ymd_opt(2024, 2, 15).unwrap()
        );
    }

    #[test]
    fn test_monthly_clamps_short_months() {
        let freq = FreqSpec::Monthly { day: 31 };
        let start = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(
            freq.next_instance(start),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
    }

    #[test]
    fn test_daily() {
        let freq = FreqSpec::Daily;
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            freq.next_instance(start),
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
        );
    }
}
