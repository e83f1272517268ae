use chrono::{Datelike, NaiveDateTime};
use std::fmt;

pub const MONTH_FORMAT_HINT: &str =
    "月份格式不正确，请使用 YYYYMM 或 YYYY-MM，例如：202509 或 2025-09";

// A calendar month; displays as the upstream `YYYYMM` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthCode {
    year: u16,
    month: u8,
}

impl MonthCode {
    pub fn new(year: u16, month: u8) -> Option<Self> {
        if year > 9999 || !(1..=12).contains(&month) {
            return None;
        }
        Some(Self { year, month })
    }

    pub fn of(moment: NaiveDateTime) -> Self {
        Self {
            year: moment.year().clamp(0, 9999) as u16,
            month: moment.month() as u8,
        }
    }

    pub fn current() -> Self {
        Self::of(chrono::Local::now().naive_local())
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn code(&self) -> String {
        self.to_string()
    }

    // "YYYY-MM"
    pub fn display(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    // "本月" for the current month, "{code}月" otherwise.
    pub fn label(&self, current: MonthCode) -> String {
        if *self == current {
            "本月".to_string()
        } else {
            format!("{self}月")
        }
    }
}

impl fmt::Display for MonthCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

fn all_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

// Accepts "YYYYMM" or "YYYY-MM" with month 01-12.
pub fn normalize_month(raw: &str) -> Option<MonthCode> {
    let text = raw.trim();
    let (year, month) = match text.len() {
        6 if all_digits(text) => (&text[..4], &text[4..]),
        7 if text.as_bytes()[4] == b'-' => {
            let (y, m) = (&text[..4], &text[5..]);
            if !all_digits(y) || !all_digits(m) {
                return None;
            }
            (y, m)
        }
        _ => return None,
    };
    MonthCode::new(year.parse().ok()?, month.parse().ok()?)
}

/// Splits `"主播名 [YYYYMM|YYYY-MM]"` into keyword and month.
///
/// Only a trailing token that normalizes as a month is taken as the month;
/// otherwise the whole input is the keyword and `current` is used.
pub fn parse_anchor_and_month(args: &str, current: MonthCode) -> (String, MonthCode) {
    let raw = args.trim();
    if raw.is_empty() {
        return (String::new(), current);
    }
    let parts: Vec<&str> = raw.split_whitespace().collect();
    if let Some(month) = parts.last().and_then(|last| normalize_month(last)) {
        let keyword = parts[..parts.len() - 1].join(" ");
        return (keyword, month);
    }
    (raw.to_string(), current)
}

// Month argument of the ranking commands: empty means the current month.
pub fn month_or_current(args: &str, current: MonthCode) -> Option<MonthCode> {
    let raw = args.trim();
    if raw.is_empty() {
        return Some(current);
    }
    normalize_month(raw)
}
