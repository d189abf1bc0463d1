//! Single-instrument analysis bundle.

use crate::domain::config::EngineConfig;
use crate::domain::error::AnalyticsError;
use crate::domain::returns::PerformanceMetrics;
use crate::domain::risk::RiskMetrics;
use crate::domain::risk_score::RiskClassification;
use crate::domain::series::{SeriesOrigin, SeriesSummary, TimeSeries};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentAnalysis {
    pub instrument_id: String,
    pub display_name: String,
    pub origin: SeriesOrigin,
    pub performance: PerformanceMetrics,
    pub risk: RiskMetrics,
    pub classification: RiskClassification,
    pub summary: SeriesSummary,
}

/// Performance, risk and classification of one series. Any failure is
/// returned as-is so the caller sees the precise cause.
pub fn analyze(
    series: &TimeSeries,
    config: &EngineConfig,
) -> Result<InstrumentAnalysis, AnalyticsError> {
    let performance = PerformanceMetrics::compute(series)?;
    let risk = RiskMetrics::compute(series, &config.risk)?;
    let classification = config.scorer.classify_metrics(&risk);

    tracing::debug!(
        instrument = series.instrument_id(),
        total_return_pct = performance.total_return_pct,
        volatility_pct = risk.volatility_pct,
        risk_level = %classification.risk_level,
        "instrument analyzed"
    );

    Ok(InstrumentAnalysis {
        instrument_id: series.instrument_id().to_string(),
        display_name: series.display_name().to_string(),
        origin: series.origin(),
        performance,
        risk,
        classification,
        summary: series.summary(),
    })
}
