//! Fiscal-quarter arithmetic.
//!
//! All period filtering and sorting goes through [`FiscalQuarter`] tuple
//! comparison. Raw string comparison of `"YYYY-Qn"` labels only happens as a
//! fallback for labels that cannot be parsed at all.

use std::cmp::Ordering;
use std::fmt;

use chrono::{Datelike, NaiveDate, Utc};

use crate::error::PeersError;

/// A fiscal quarter, ordered by `(year, quarter)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FiscalQuarter {
    pub year: i32,
    pub quarter: u32,
}

impl FiscalQuarter {
    pub fn new(year: i32, quarter: u32) -> Self {
        Self { year, quarter }
    }

    /// Calendar quarter containing `date` (months 1-3 -> Q1, ... 10-12 -> Q4).
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            quarter: (date.month() - 1) / 3 + 1,
        }
    }

    /// Strict parse of a `"YYYY-Qn"` label. Fails if the `-Q` separator is
    /// absent or either component is non-numeric.
    pub fn parse(label: &str) -> Result<Self, PeersError> {
        let (year, quarter) = label
            .split_once("-Q")
            .ok_or_else(|| PeersError::InvalidPeriod(label.to_string()))?;
        let year = year
            .parse::<i32>()
            .map_err(|_| PeersError::InvalidPeriod(label.to_string()))?;
        let quarter = quarter
            .parse::<u32>()
            .map_err(|_| PeersError::InvalidPeriod(label.to_string()))?;
        Ok(Self { year, quarter })
    }

    /// Lenient parse used for filtering and sorting: accepts `"YYYY-Qn"`,
    /// plus a bare `"YYYY"` annual label which is treated as Q4 of that year
    /// (annual reports close the fiscal year).
    pub fn parse_label(label: &str) -> Option<Self> {
        if let Ok(q) = Self::parse(label) {
            return Some(q);
        }
        if label.len() == 4 && label.bytes().all(|b| b.is_ascii_digit()) {
            return label.parse::<i32>().ok().map(|year| Self { year, quarter: 4 });
        }
        None
    }
}

impl fmt::Display for FiscalQuarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-Q{}", self.year, self.quarter)
    }
}

/// Oldest quarter included by a lookback range token, relative to `today`.
///
/// Tokens are case-insensitive; `1Y`/`3Y`/`5Y` map to 1/3/5 years and any
/// other token silently falls back to one year. The quarter is the quarter
/// of `today`, not of the cutoff year.
pub fn min_period(range: &str, today: NaiveDate) -> FiscalQuarter {
    let years = match range.to_uppercase().as_str() {
        "1Y" => 1,
        "3Y" => 3,
        "5Y" => 5,
        _ => 1,
    };
    let current = FiscalQuarter::from_date(today);
    FiscalQuarter::new(current.year - years, current.quarter)
}

/// Current quarter relative to `today`.
pub fn max_period(today: NaiveDate) -> FiscalQuarter {
    FiscalQuarter::from_date(today)
}

/// Inclusive `[min, max]` quarter window for a lookback range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodWindow {
    pub min: FiscalQuarter,
    pub max: FiscalQuarter,
}

impl PeriodWindow {
    pub fn for_range(range: &str, today: NaiveDate) -> Self {
        Self {
            min: min_period(range, today),
            max: max_period(today),
        }
    }

    /// Window relative to the current wall-clock date.
    pub fn current(range: &str) -> Self {
        Self::for_range(range, Utc::now().date_naive())
    }

    pub fn contains(&self, quarter: FiscalQuarter) -> bool {
        quarter >= self.min && quarter <= self.max
    }
}

/// Chronological ordering of period labels: tuple comparison when both
/// labels parse, raw string comparison otherwise.
pub fn cmp_period_labels(a: &str, b: &str) -> Ordering {
    match (FiscalQuarter::parse_label(a), FiscalQuarter::parse_label(b)) {
        (Some(qa), Some(qb)) => qa.cmp(&qb).then_with(|| a.cmp(b)),
        _ => a.cmp(b),
    }
}
