//! Period returns and headline performance figures.

use crate::domain::error::AnalyticsError;
use crate::domain::series::TimeSeries;
use crate::domain::stats::TRADING_DAYS_PER_YEAR;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodReturn {
    pub date: NaiveDate,
    pub value: f64,
}

pub fn period_returns(series: &TimeSeries) -> ReturnSeries {
    ReturnSeries::from_series(series)
}

/// Simple returns between consecutive points. A period whose prior value is
/// zero has no defined return and is left out.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    returns: Vec<PeriodReturn>,
}

impl ReturnSeries {
    pub fn from_series(series: &TimeSeries) -> Self {
        let returns = series
            .points()
            .windows(2)
            .filter(|w| w[0].value != 0.0)
            .map(|w| PeriodReturn {
                date: w[1].date,
                value: (w[1].value - w[0].value) / w[0].value,
            })
            .collect();
        Self { returns }
    }

    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeriodReturn> {
        self.returns.iter()
    }

    pub fn values(&self) -> Vec<f64> {
        self.returns.iter().map(|r| r.value).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    pub total_return_pct: f64,
    pub annualized_return_pct: f64,
}

impl PerformanceMetrics {
    /// Total and annualized return of `series`.
    ///
    /// Annualization treats the number of points as elapsed trading days
    /// (252 per year), not the calendar span between first and last date.
    pub fn compute(series: &TimeSeries) -> Result<Self, AnalyticsError> {
        series.require_points(2)?;

        let first = series.first().value;
        let last = series.last().value;
        if first == 0.0 {
            return Err(AnalyticsError::DivisionByZero {
                context: format!("total return of {} (first value is 0)", series.instrument_id()),
            });
        }

        let growth = last / first;
        let n = series.len() as f64;

        Ok(Self {
            total_return_pct: (growth - 1.0) * 100.0,
            annualized_return_pct: (growth.powf(TRADING_DAYS_PER_YEAR / n) - 1.0) * 100.0,
        })
    }
}
