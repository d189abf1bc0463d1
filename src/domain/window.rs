//! Requested date ranges and named look-back periods.

use crate::domain::error::AnalyticsError;
use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AnalyticsError> {
        if start > end {
            return Err(AnalyticsError::invalid_parameter(
                "window",
                format!("start {start} is after end {end}"),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnalysisPeriod {
    Months(u32),
    YearToDate,
}

impl AnalysisPeriod {
    pub fn window_ending(&self, end: NaiveDate) -> Result<DateWindow, AnalyticsError> {
        let start = match self {
            AnalysisPeriod::Months(n) => end.checked_sub_months(Months::new(*n)),
            AnalysisPeriod::YearToDate => NaiveDate::from_ymd_opt(end.year(), 1, 1),
        }
        .ok_or_else(|| {
            AnalyticsError::invalid_parameter("period", format!("{self} before {end} is out of range"))
        })?;
        DateWindow::new(start, end)
    }
}

impl FromStr for AnalysisPeriod {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "3m" => Ok(AnalysisPeriod::Months(3)),
            "6m" => Ok(AnalysisPeriod::Months(6)),
            "1y" => Ok(AnalysisPeriod::Months(12)),
            "2y" => Ok(AnalysisPeriod::Months(24)),
            "3y" => Ok(AnalysisPeriod::Months(36)),
            "5y" => Ok(AnalysisPeriod::Months(60)),
            "ytd" => Ok(AnalysisPeriod::YearToDate),
            other => Err(AnalyticsError::invalid_parameter(
                "period",
                format!("unknown period '{other}' (expected 3m, 6m, 1y, 2y, 3y, 5y or ytd)"),
            )),
        }
    }
}

impl fmt::Display for AnalysisPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisPeriod::Months(n) if n % 12 == 0 => write!(f, "{}y", n / 12),
            AnalysisPeriod::Months(n) => write!(f, "{n}m"),
            AnalysisPeriod::YearToDate => write!(f, "ytd"),
        }
    }
}
