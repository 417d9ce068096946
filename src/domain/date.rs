//! Date helpers for todo.txt fields
//!
//! Dates in todo.txt are always `YYYY-MM-DD`. User input (for `due:`/`t:`
//! values and ordinal filters) may also use relative expressions:
//!
//! | Expression | Meaning |
//! |------------|---------|
//! | `today`, `tod` | the current day |
//! | `tomorrow`, `tom` | the next day |
//! | `yesterday` | the previous day |
//! | `mon` … `sun`, `monday` … | the next occurrence of that weekday (today counts) |
//! | `3d`, `2w`, `1m`, `1y`, `5b` | an offset in days, weeks, months, years or business days |
//! | `-2d` | negative offsets are allowed |

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Local, Months, NaiveDate, Weekday};

/// The current local day
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Returns true if the token has the `NNNN-NN-NN` shape, whether or not it is a valid date
pub fn is_date_shaped(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && b[4] == b'-'
        && b[7] == b'-'
        && b.iter()
            .enumerate()
            .all(|(i, c)| i == 4 || i == 7 || c.is_ascii_digit())
}

/// Parses a strict `YYYY-MM-DD` date; anything else yields `None`
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    if !is_date_shaped(s) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Unit of an [`Interval`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalUnit {
    Days,
    Weeks,
    Months,
    Years,
    BusinessDays,
}

impl IntervalUnit {
    fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'd' => Some(Self::Days),
            'w' => Some(Self::Weeks),
            'm' => Some(Self::Months),
            'y' => Some(Self::Years),
            'b' => Some(Self::BusinessDays),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Self::Days => 'd',
            Self::Weeks => 'w',
            Self::Months => 'm',
            Self::Years => 'y',
            Self::BusinessDays => 'b',
        }
    }
}

/// A signed calendar offset such as `3d` or `-1m`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub amount: i64,
    pub unit: IntervalUnit,
}

impl Interval {
    pub fn new(amount: i64, unit: IntervalUnit) -> Self {
        Self { amount, unit }
    }

    /// Applies this interval to `date`; `None` when the result leaves chrono's range
    pub fn apply(&self, date: NaiveDate) -> Option<NaiveDate> {
        let magnitude = self.amount.unsigned_abs();
        let forward = self.amount >= 0;
        match self.unit {
            IntervalUnit::Days => shift_days(date, magnitude, forward),
            IntervalUnit::Weeks => shift_days(date, magnitude.checked_mul(7)?, forward),
            IntervalUnit::Months => shift_months(date, magnitude, forward),
            IntervalUnit::Years => shift_months(date, magnitude.checked_mul(12)?, forward),
            IntervalUnit::BusinessDays => shift_business_days(date, magnitude, forward),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.as_char())
    }
}

impl FromStr for Interval {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let unit_char = s.chars().last().ok_or(())?;
        let unit = IntervalUnit::from_char(unit_char).ok_or(())?;
        let number = &s[..s.len() - unit_char.len_utf8()];
        let digits = number.strip_prefix(['+', '-']).unwrap_or(number);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(());
        }
        let amount: i64 = number.parse().map_err(|_| ())?;
        Ok(Self { amount, unit })
    }
}

fn shift_days(date: NaiveDate, n: u64, forward: bool) -> Option<NaiveDate> {
    if forward {
        date.checked_add_days(Days::new(n))
    } else {
        date.checked_sub_days(Days::new(n))
    }
}

fn shift_months(date: NaiveDate, n: u64, forward: bool) -> Option<NaiveDate> {
    let n = u32::try_from(n).ok()?;
    if forward {
        date.checked_add_months(Months::new(n))
    } else {
        date.checked_sub_months(Months::new(n))
    }
}

fn shift_business_days(date: NaiveDate, n: u64, forward: bool) -> Option<NaiveDate> {
    let mut current = date;
    let mut left = n;
    while left > 0 {
        current = shift_days(current, 1, forward)?;
        if !is_weekend(current.weekday()) {
            left -= 1;
        }
    }
    Some(current)
}

/// Saturday or Sunday
pub fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

fn parse_weekday(s: &str) -> Option<Weekday> {
    let day = match s {
        "mo" | "mon" | "monday" => Weekday::Mon,
        "tu" | "tue" | "tuesday" => Weekday::Tue,
        "we" | "wed" | "wednesday" => Weekday::Wed,
        "th" | "thu" | "thursday" => Weekday::Thu,
        "fr" | "fri" | "friday" => Weekday::Fri,
        "sa" | "sat" | "saturday" => Weekday::Sat,
        "su" | "sun" | "sunday" => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

/// Resolves an absolute or relative date expression against `today`
pub fn relative_date(expr: &str, today: NaiveDate) -> Option<NaiveDate> {
    let lowered = expr.trim().to_lowercase();
    if let Some(date) = parse_date(&lowered) {
        return Some(date);
    }

    match lowered.as_str() {
        "today" | "tod" => return Some(today),
        "tomorrow" | "tom" => return today.succ_opt(),
        "yesterday" => return today.pred_opt(),
        _ => {}
    }

    if let Some(day) = parse_weekday(&lowered) {
        let ahead = (7 + day.num_days_from_monday() - today.weekday().num_days_from_monday()) % 7;
        return today.checked_add_days(Days::new(u64::from(ahead)));
    }

    lowered.parse::<Interval>().ok()?.apply(today)
}

/// Whole days from `from` until `to` (negative when `to` is earlier)
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn strict_iso_dates() {
        assert_eq!(parse_date("2020-01-05"), Some(d(2020, 1, 5)));
        assert_eq!(parse_date("2020-1-5"), None);
        assert_eq!(parse_date("2020-13-45"), None);
        assert!(is_date_shaped("2020-13-45"));
        assert!(!is_date_shaped("20201345"));
    }

    #[test]
    fn interval_parsing() {
        assert_eq!("3d".parse(), Ok(Interval::new(3, IntervalUnit::Days)));
        assert_eq!("-2w".parse(), Ok(Interval::new(-2, IntervalUnit::Weeks)));
        assert_eq!("+1M".parse(), Ok(Interval::new(1, IntervalUnit::Months)));
        assert!("d".parse::<Interval>().is_err());
        assert!("3x".parse::<Interval>().is_err());
        assert!("".parse::<Interval>().is_err());
    }

    #[test]
    fn month_shift_clamps_to_month_end() {
        let jan31 = d(2021, 1, 31);
        assert_eq!(Interval::new(1, IntervalUnit::Months).apply(jan31), Some(d(2021, 2, 28)));
        assert_eq!(Interval::new(1, IntervalUnit::Years).apply(d(2020, 2, 29)), Some(d(2021, 2, 28)));
    }

    #[test]
    fn business_days_skip_weekends() {
        // 2021-01-08 is a Friday
        let friday = d(2021, 1, 8);
        assert_eq!(Interval::new(1, IntervalUnit::BusinessDays).apply(friday), Some(d(2021, 1, 11)));
        assert_eq!(Interval::new(-1, IntervalUnit::BusinessDays).apply(d(2021, 1, 11)), Some(friday));
    }

    #[test]
    fn relative_expressions() {
        // 2021-01-06 is a Wednesday
        let today = d(2021, 1, 6);
        assert_eq!(relative_date("today", today), Some(today));
        assert_eq!(relative_date("tom", today), Some(d(2021, 1, 7)));
        assert_eq!(relative_date("yesterday", today), Some(d(2021, 1, 5)));
        assert_eq!(relative_date("wed", today), Some(today));
        assert_eq!(relative_date("Monday", today), Some(d(2021, 1, 11)));
        assert_eq!(relative_date("2w", today), Some(d(2021, 1, 20)));
        assert_eq!(relative_date("2021-03-01", today), Some(d(2021, 3, 1)));
        assert_eq!(relative_date("someday", today), None);
    }

    #[test]
    fn day_difference() {
        assert_eq!(days_between(d(2021, 1, 1), d(2021, 1, 11)), 10);
        assert_eq!(days_between(d(2021, 1, 11), d(2021, 1, 1)), -10);
    }
}
