//! Risk statistics derived from a price series.
//!
//! Every dispersion figure uses the sample standard deviation of simple
//! period returns and is annualized with the 252 trading-day convention.
//! VaR and CVaR use historical simulation and keep their sign, so a loss
//! threshold is reported as a negative percentage.

use crate::domain::error::AnalyticsError;
use crate::domain::returns::period_returns;
use crate::domain::series::TimeSeries;
use crate::domain::stats::{
    annualize_stddev, mean, percentile, sample_stddev, MIN_SAMPLES, TRADING_DAYS_PER_YEAR,
};
use chrono::NaiveDate;
use serde::Serialize;

pub const DEFAULT_RISK_FREE_RATE: f64 = 0.03;
pub const DEFAULT_MIN_CONFIDENT_SAMPLES: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskSettings {
    /// Annualized, as a fraction (0.03 = 3%).
    pub risk_free_rate: f64,
    /// Below this many returns the metrics are flagged `low_confidence`.
    pub min_confident_samples: usize,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            min_confident_samples: DEFAULT_MIN_CONFIDENT_SAMPLES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskMetrics {
    pub volatility_pct: f64,
    pub max_drawdown_pct: f64,
    pub sharpe_ratio: f64,
    pub var_95_pct: f64,
    pub var_99_pct: f64,
    pub cvar_95_pct: f64,
    pub downside_deviation_pct: f64,
    pub sample_size: usize,
    pub low_confidence: bool,
}

impl RiskMetrics {
    pub fn compute(series: &TimeSeries, settings: &RiskSettings) -> Result<Self, AnalyticsError> {
        let returns = period_returns(series);
        if returns.len() < MIN_SAMPLES {
            return Err(AnalyticsError::InsufficientData {
                instrument: series.instrument_id().to_string(),
                available: returns.len(),
                required: MIN_SAMPLES,
            });
        }

        let values = returns.values();
        let stddev = sample_stddev(&values);
        let annual_stddev = annualize_stddev(stddev);

        let sharpe_ratio = if annual_stddev > 0.0 {
            (mean(&values) * TRADING_DAYS_PER_YEAR - settings.risk_free_rate) / annual_stddev
        } else {
            0.0
        };

        let var_95 = percentile(&values, 0.05);
        let var_99 = percentile(&values, 0.01);
        let cvar_95 = var_95.map(|threshold| {
            let tail: Vec<f64> = values.iter().copied().filter(|r| *r <= threshold).collect();
            mean(&tail)
        });

        let negatives: Vec<f64> = values.iter().copied().filter(|r| *r < 0.0).collect();

        Ok(Self {
            volatility_pct: annual_stddev * 100.0,
            max_drawdown_pct: max_drawdown_pct(series),
            sharpe_ratio,
            var_95_pct: var_95.unwrap_or(0.0) * 100.0,
            var_99_pct: var_99.unwrap_or(0.0) * 100.0,
            cvar_95_pct: cvar_95.unwrap_or(0.0) * 100.0,
            downside_deviation_pct: annualize_stddev(sample_stddev(&negatives)) * 100.0,
            sample_size: values.len(),
            // statistics zeroed for lack of samples count too
            low_confidence: values.len() < settings.min_confident_samples
                || negatives.len() < MIN_SAMPLES
                || var_95.is_none(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DrawdownPoint {
    pub date: NaiveDate,
    /// Decline from the running peak, as a non-positive percentage.
    pub drawdown_pct: f64,
}

/// Drawdown of every point relative to the highest value seen so far.
/// A zero peak yields a drawdown of 0 for that point.
pub fn drawdown_curve(series: &TimeSeries) -> Vec<DrawdownPoint> {
    let mut peak = series.first().value;
    series
        .points()
        .iter()
        .map(|point| {
            if point.value > peak {
                peak = point.value;
            }
            let drawdown_pct = if peak > 0.0 {
                (point.value - peak) / peak * 100.0
            } else {
                0.0
            };
            DrawdownPoint {
                date: point.date,
                drawdown_pct,
            }
        })
        .collect()
}

pub fn max_drawdown_pct(series: &TimeSeries) -> f64 {
    drawdown_curve(series)
        .iter()
        .map(|p| p.drawdown_pct)
        .fold(0.0_f64, f64::min)
        .abs()
}
