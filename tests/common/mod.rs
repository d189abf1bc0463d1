#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use fundscope::domain::error::AnalyticsError;
use fundscope::domain::series::{PricePoint, TimeSeries};
use fundscope::domain::window::DateWindow;
use fundscope::ports::data_port::{DataPort, InstrumentInfo};
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PricePoint>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_points(mut self, id: &str, points: Vec<PricePoint>) -> Self {
        self.data.insert(id.to_string(), points);
        self
    }

    pub fn with_error(mut self, id: &str, reason: &str) -> Self {
        self.errors.insert(id.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    async fn fetch_series(
        &self,
        instrument_id: &str,
        window: &DateWindow,
    ) -> Result<TimeSeries, AnalyticsError> {
        if let Some(reason) = self.errors.get(instrument_id) {
            return Err(AnalyticsError::DataSource {
                instrument: instrument_id.to_string(),
                reason: reason.clone(),
            });
        }
        let points: Vec<PricePoint> = self
            .data
            .get(instrument_id)
            .map(|pts| pts.iter().copied().filter(|p| window.contains(p.date)).collect())
            .unwrap_or_default();
        if points.is_empty() {
            return Err(AnalyticsError::DataSource {
                instrument: instrument_id.to_string(),
                reason: "no data".into(),
            });
        }
        TimeSeries::new(instrument_id, format!("{instrument_id} Fund"), points)
    }

    async fn list_instruments(&self) -> Result<Vec<InstrumentInfo>, AnalyticsError> {
        let mut ids: Vec<InstrumentInfo> = self
            .data
            .keys()
            .map(|id| InstrumentInfo {
                instrument_id: id.clone(),
                display_name: format!("{id} Fund"),
            })
            .collect();
        ids.sort_by(|a, b| a.instrument_id.cmp(&b.instrument_id));
        Ok(ids)
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// One point per calendar day starting at `start`.
pub fn daily_points(start: &str, values: &[f64]) -> Vec<PricePoint> {
    let start = date(start);
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| PricePoint::new(start + Duration::days(i as i64), v))
        .collect()
}

pub fn make_series(id: &str, values: &[f64]) -> TimeSeries {
    TimeSeries::new(id, id, daily_points("2024-01-01", values)).unwrap()
}

pub fn window(start: &str, end: &str) -> DateWindow {
    DateWindow::new(date(start), date(end)).unwrap()
}
