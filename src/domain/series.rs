//! Dated price series for a single instrument.

use crate::domain::error::AnalyticsError;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Where a series came from. Synthetic series are produced only by the
/// simulation-mode source and must never be mistaken for market data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesOrigin {
    #[default]
    Live,
    Synthetic,
}

/// An immutable, validated price series: at least one point, strictly
/// ascending dates, finite non-negative values.
#[derive(Debug, Clone, Serialize)]
pub struct TimeSeries {
    instrument_id: String,
    display_name: String,
    points: Vec<PricePoint>,
    origin: SeriesOrigin,
}

impl TimeSeries {
    pub fn new(
        instrument_id: impl Into<String>,
        display_name: impl Into<String>,
        points: Vec<PricePoint>,
    ) -> Result<Self, AnalyticsError> {
        let instrument_id = instrument_id.into();
        validate_points(&instrument_id, &points)?;
        Ok(Self {
            instrument_id,
            display_name: display_name.into(),
            points,
            origin: SeriesOrigin::Live,
        })
    }

    pub fn with_origin(mut self, origin: SeriesOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn instrument_id(&self) -> &str {
        &self.instrument_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn origin(&self) -> SeriesOrigin {
        self.origin
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> &PricePoint {
        &self.points[0]
    }

    pub fn last(&self) -> &PricePoint {
        &self.points[self.points.len() - 1]
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }

    /// Fails with `InsufficientData` unless the series has at least `required` points.
    pub fn require_points(&self, required: usize) -> Result<(), AnalyticsError> {
        if self.points.len() < required {
            return Err(AnalyticsError::InsufficientData {
                instrument: self.instrument_id.clone(),
                available: self.points.len(),
                required,
            });
        }
        Ok(())
    }

    /// Day-over-day change of every point; the first point has no change.
    pub fn daily_changes(&self) -> Vec<DailyChange> {
        let mut changes = Vec::with_capacity(self.points.len());
        let mut prev: Option<f64> = None;
        for point in &self.points {
            let (change_value, change_pct) = match prev {
                Some(p) => {
                    let change = point.value - p;
                    let pct = if p > 0.0 { change / p * 100.0 } else { 0.0 };
                    (change, pct)
                }
                None => (0.0, 0.0),
            };
            changes.push(DailyChange {
                date: point.date,
                value: point.value,
                change_value,
                change_pct,
            });
            prev = Some(point.value);
        }
        changes
    }

    pub fn summary(&self) -> SeriesSummary {
        let max_value = self.values().fold(f64::MIN, f64::max);
        let min_value = self.values().fold(f64::MAX, f64::min);
        SeriesSummary {
            start_date: self.first().date,
            end_date: self.last().date,
            start_value: self.first().value,
            end_value: self.last().value,
            max_value,
            min_value,
            total_points: self.points.len(),
        }
    }
}

fn validate_points(instrument: &str, points: &[PricePoint]) -> Result<(), AnalyticsError> {
    let invalid = |reason: String| AnalyticsError::InvalidSeries {
        instrument: instrument.to_string(),
        reason,
    };

    if points.is_empty() {
        return Err(invalid("series has no points".into()));
    }

    for point in points {
        if !point.value.is_finite() || point.value < 0.0 {
            return Err(invalid(format!(
                "value {} on {} is not a finite non-negative number",
                point.value, point.date
            )));
        }
    }

    for w in points.windows(2) {
        if w[1].date == w[0].date {
            return Err(invalid(format!("duplicate date {}", w[1].date)));
        }
        if w[1].date < w[0].date {
            return Err(invalid(format!(
                "dates out of order: {} after {}",
                w[1].date, w[0].date
            )));
        }
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyChange {
    pub date: NaiveDate,
    pub value: f64,
    pub change_value: f64,
    pub change_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_value: f64,
    pub end_value: f64,
    pub max_value: f64,
    pub min_value: f64,
    pub total_points: usize,
}
