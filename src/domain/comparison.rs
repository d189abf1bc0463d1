//! Multi-instrument comparison.
//!
//! Each instrument is fetched and measured independently; one failing
//! instrument is recorded in `skipped` and never aborts the batch.

use crate::domain::error::{AnalyticsError, ErrorKind};
use crate::domain::returns::PerformanceMetrics;
use crate::domain::risk::{RiskMetrics, RiskSettings};
use crate::domain::series::SeriesOrigin;
use crate::domain::window::DateWindow;
use crate::ports::data_port::DataPort;
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;

/// Parse a comma-separated instrument list. Ids are trimmed and uppercased;
/// empty tokens and duplicates are rejected.
pub fn parse_instrument_ids(input: &str) -> Result<Vec<String>, AnalyticsError> {
    let mut ids = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(AnalyticsError::invalid_parameter(
                "instruments",
                "empty token in instrument list",
            ));
        }
        let id = trimmed.to_uppercase();
        if !seen.insert(id.clone()) {
            return Err(AnalyticsError::invalid_parameter(
                "instruments",
                format!("duplicate instrument: {id}"),
            ));
        }
        ids.push(id);
    }

    Ok(ids)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentComparison {
    pub instrument_id: String,
    pub display_name: String,
    pub origin: SeriesOrigin,
    pub performance: PerformanceMetrics,
    pub risk: RiskMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedInstrument {
    pub instrument_id: String,
    pub kind: ErrorKind,
    pub reason: String,
}

/// Cross-instrument correlation is not part of the result yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Correlation {
    NotComputed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub window: DateWindow,
    /// Successful instruments, in request order.
    pub per_instrument: Vec<InstrumentComparison>,
    pub best_performer_id: String,
    pub worst_performer_id: String,
    pub skipped: Vec<SkippedInstrument>,
    pub correlation: Correlation,
}

impl ComparisonResult {
    pub fn get(&self, instrument_id: &str) -> Option<&InstrumentComparison> {
        self.per_instrument
            .iter()
            .find(|c| c.instrument_id == instrument_id)
    }
}

pub struct ComparisonAggregator<'a, P: DataPort> {
    data_port: &'a P,
    settings: RiskSettings,
}

impl<'a, P: DataPort> ComparisonAggregator<'a, P> {
    pub fn new(data_port: &'a P, settings: RiskSettings) -> Self {
        Self {
            data_port,
            settings,
        }
    }

    pub async fn compare(
        &self,
        instrument_ids: &[String],
        window: &DateWindow,
    ) -> Result<ComparisonResult, AnalyticsError> {
        if instrument_ids.is_empty() {
            return Err(AnalyticsError::invalid_parameter(
                "instruments",
                "at least one instrument is required",
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = instrument_ids.iter().find(|id| !seen.insert(id.as_str())) {
            return Err(AnalyticsError::invalid_parameter(
                "instruments",
                format!("duplicate instrument: {dup}"),
            ));
        }

        let outcomes = join_all(
            instrument_ids
                .iter()
                .map(|id| self.measure(id, window)),
        )
        .await;

        let mut per_instrument = Vec::new();
        let mut skipped = Vec::new();
        for (id, outcome) in instrument_ids.iter().zip(outcomes) {
            match outcome {
                Ok(entry) => per_instrument.push(entry),
                Err(e) => {
                    tracing::warn!(instrument = %id, kind = ?e.kind(), "skipping instrument: {e}");
                    skipped.push(SkippedInstrument {
                        instrument_id: id.clone(),
                        kind: e.kind(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let (Some(best), Some(worst)) = (best_of(&per_instrument), worst_of(&per_instrument))
        else {
            return Err(AnalyticsError::NoDataAvailable {
                requested: instrument_ids.len(),
            });
        };
        let best_performer_id = best.instrument_id.clone();
        let worst_performer_id = worst.instrument_id.clone();

        tracing::debug!(
            compared = per_instrument.len(),
            skipped = skipped.len(),
            best = %best_performer_id,
            worst = %worst_performer_id,
            "comparison complete"
        );

        Ok(ComparisonResult {
            window: *window,
            per_instrument,
            best_performer_id,
            worst_performer_id,
            skipped,
            correlation: Correlation::NotComputed,
        })
    }

    async fn measure(
        &self,
        instrument_id: &str,
        window: &DateWindow,
    ) -> Result<InstrumentComparison, AnalyticsError> {
        let series = self.data_port.fetch_series(instrument_id, window).await?;
        let performance = PerformanceMetrics::compute(&series)?;
        let risk = RiskMetrics::compute(&series, &self.settings)?;
        Ok(InstrumentComparison {
            instrument_id: series.instrument_id().to_string(),
            display_name: series.display_name().to_string(),
            origin: series.origin(),
            performance,
            risk,
        })
    }
}

// Strict comparisons keep the earliest entry on ties.
fn best_of(entries: &[InstrumentComparison]) -> Option<&InstrumentComparison> {
    entries.iter().fold(None, |best, c| match best {
        Some(b) if c.performance.total_return_pct <= b.performance.total_return_pct => Some(b),
        _ => Some(c),
    })
}

fn worst_of(entries: &[InstrumentComparison]) -> Option<&InstrumentComparison> {
    entries.iter().fold(None, |worst, c| match worst {
        Some(w) if c.performance.total_return_pct >= w.performance.total_return_pct => Some(w),
        _ => Some(c),
    })
}
