//! Investment backtest: one amount invested either up front or spread over
//! periodic contributions, valued at every point of the series.

use crate::domain::dca::{contribution_schedule, Frequency};
use crate::domain::error::AnalyticsError;
use crate::domain::risk::{RiskMetrics, RiskSettings};
use crate::domain::series::{PricePoint, TimeSeries};
use crate::domain::stats::TRADING_DAYS_PER_YEAR;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum InvestmentStrategy {
    LumpSum,
    Dca { frequency: Frequency },
}

impl fmt::Display for InvestmentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvestmentStrategy::LumpSum => write!(f, "lump_sum"),
            InvestmentStrategy::Dca { frequency } => write!(f, "dca ({frequency})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValuationPoint {
    pub date: NaiveDate,
    pub invested: f64,
    pub units: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub instrument_id: String,
    pub strategy: InvestmentStrategy,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_investment: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub total_return_pct: f64,
    pub annualized_return_pct: f64,
    pub volatility_pct: f64,
    pub max_drawdown_pct: f64,
    pub sharpe_ratio: f64,
    /// Annualized return over max drawdown; 0 when there was no drawdown.
    pub calmar_ratio: f64,
    pub valuation: Vec<ValuationPoint>,
}

pub fn run(
    series: &TimeSeries,
    amount: f64,
    strategy: InvestmentStrategy,
    settings: &RiskSettings,
) -> Result<BacktestResult, AnalyticsError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(AnalyticsError::invalid_parameter(
            "amount",
            format!("must be positive, got {amount}"),
        ));
    }
    // instrument risk over the same window; also enforces the minimum length
    let risk = RiskMetrics::compute(series, settings)?;

    let purchases = match strategy {
        InvestmentStrategy::LumpSum => vec![(*series.first(), amount)],
        InvestmentStrategy::Dca { frequency } => dca_purchases(series, amount, frequency)?,
    };

    let valuation = value_over_time(series, &purchases)?;
    let Some(last) = valuation.last() else {
        return Err(AnalyticsError::InsufficientData {
            instrument: series.instrument_id().to_string(),
            available: 0,
            required: 2,
        });
    };

    let final_value = last.value;
    let growth = final_value / amount;
    let annualized_return_pct =
        (growth.powf(TRADING_DAYS_PER_YEAR / series.len() as f64) - 1.0) * 100.0;
    let calmar_ratio = if risk.max_drawdown_pct > 0.0 {
        annualized_return_pct / risk.max_drawdown_pct
    } else {
        0.0
    };

    tracing::debug!(
        instrument = series.instrument_id(),
        %strategy,
        purchases = purchases.len(),
        final_value,
        "backtest complete"
    );

    Ok(BacktestResult {
        instrument_id: series.instrument_id().to_string(),
        strategy,
        start_date: series.first().date,
        end_date: series.last().date,
        initial_investment: amount,
        final_value,
        total_return: final_value - amount,
        total_return_pct: (growth - 1.0) * 100.0,
        annualized_return_pct,
        volatility_pct: risk.volatility_pct,
        max_drawdown_pct: risk.max_drawdown_pct,
        sharpe_ratio: risk.sharpe_ratio,
        calmar_ratio,
        valuation,
    })
}

/// Split `amount` evenly over every contribution date that falls inside the series.
fn dca_purchases(
    series: &TimeSeries,
    amount: f64,
    frequency: Frequency,
) -> Result<Vec<(PricePoint, f64)>, AnalyticsError> {
    let start = series.first().date;
    let end = series.last().date;
    let periods = (0..)
        .take_while(|&k| frequency.nth_date(start, k).is_some_and(|d| d <= end))
        .count();

    let schedule = contribution_schedule(series, start, periods, frequency)?;
    let per_period = amount / periods as f64;
    Ok(schedule.into_iter().map(|p| (p, per_period)).collect())
}

fn value_over_time(
    series: &TimeSeries,
    purchases: &[(PricePoint, f64)],
) -> Result<Vec<ValuationPoint>, AnalyticsError> {
    let mut pending = purchases.iter().peekable();
    let mut invested = 0.0_f64;
    let mut units = 0.0_f64;
    let mut valuation = Vec::with_capacity(series.len());

    for point in series.points() {
        while let Some((bought_at, cash)) = pending.next_if(|(p, _)| p.date == point.date) {
            if bought_at.value <= 0.0 {
                return Err(AnalyticsError::DivisionByZero {
                    context: format!(
                        "units bought on {} at price {}",
                        bought_at.date, bought_at.value
                    ),
                });
            }
            invested += cash;
            units += cash / bought_at.value;
        }
        valuation.push(ValuationPoint {
            date: point.date,
            invested,
            units,
            value: units * point.value,
        });
    }

    Ok(valuation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Duration;

    fn daily(values: &[f64]) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let points = values
            .iter()
            .enumerate()
            .map(|(i, &v)| PricePoint::new(start + Duration::days(i as i64), v))
            .collect();
        TimeSeries::new("FUND", "Fund", points).unwrap()
    }

    #[test]
    fn lump_sum_tracks_price() {
        let series = daily(&[100.0, 90.0, 120.0]);
        let result = run(&series, 1000.0, InvestmentStrategy::LumpSum, &RiskSettings::default())
            .unwrap();
        assert_relative_eq!(result.final_value, 1200.0, epsilon = 1e-9);
        assert_relative_eq!(result.total_return, 200.0, epsilon = 1e-9);
        assert_relative_eq!(result.total_return_pct, 20.0, epsilon = 1e-9);
        assert_relative_eq!(result.max_drawdown_pct, 10.0, epsilon = 1e-9);
        assert_relative_eq!(
            result.calmar_ratio,
            result.annualized_return_pct / 10.0,
            epsilon = 1e-9
        );
        assert_eq!(result.valuation.len(), 3);
        assert_relative_eq!(result.valuation[1].value, 900.0, epsilon = 1e-9);
    }

    #[test]
    fn calmar_is_zero_without_drawdown() {
        let series = daily(&[100.0, 101.0, 102.0]);
        let result = run(&series, 500.0, InvestmentStrategy::LumpSum, &RiskSettings::default())
            .unwrap();
        assert_eq!(result.calmar_ratio, 0.0);
    }

    #[test]
    fn dca_spreads_amount_over_months() {
        // 2024-01-01 .. 2024-03-31: contributions on Jan 1, Feb 1, Mar 1
        let values: Vec<f64> = (0..91).map(|i| if i < 31 { 10.0 } else { 20.0 }).collect();
        let series = daily(&values);
        let strategy = InvestmentStrategy::Dca {
            frequency: Frequency::Monthly,
        };
        let result = run(&series, 300.0, strategy, &RiskSettings::default()).unwrap();

        // 10 units at 10, then 5 + 5 units at 20 -> 20 units * 20
        let last = result.valuation.last().unwrap();
        assert_relative_eq!(last.invested, 300.0, epsilon = 1e-9);
        assert_relative_eq!(last.units, 20.0, epsilon = 1e-9);
        assert_relative_eq!(result.final_value, 400.0, epsilon = 1e-9);

        let jan = &result.valuation[30];
        assert_relative_eq!(jan.invested, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn rejects_non_positive_amount() {
        let series = daily(&[100.0, 101.0, 102.0]);
        let err = run(&series, 0.0, InvestmentStrategy::LumpSum, &RiskSettings::default())
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidParameter { .. }));
    }

    #[test]
    fn short_series_is_insufficient() {
        let series = daily(&[100.0, 101.0]);
        let err = run(&series, 100.0, InvestmentStrategy::LumpSum, &RiskSettings::default())
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::InsufficientData { .. }));
    }

    #[test]
    fn zero_first_price_is_division_by_zero() {
        let series = daily(&[0.0, 1.0, 2.0, 3.0]);
        let err = run(&series, 100.0, InvestmentStrategy::LumpSum, &RiskSettings::default())
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::DivisionByZero { .. }));
    }
}
