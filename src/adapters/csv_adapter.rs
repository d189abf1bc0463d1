//! CSV file data adapter.
//!
//! One file per instrument, `<base_path>/<instrument_id>.csv`, with a
//! `date,value` header.

use crate::domain::error::AnalyticsError;
use crate::domain::series::{PricePoint, TimeSeries};
use crate::domain::window::DateWindow;
use crate::ports::data_port::{DataPort, InstrumentInfo};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: NaiveDate,
    value: f64,
}

pub struct CsvAdapter {
    base_path: PathBuf,
    names: HashMap<String, String>,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            names: HashMap::new(),
        }
    }

    /// Display names keyed by instrument id; ids without an entry are shown as-is.
    pub fn with_names(mut self, names: HashMap<String, String>) -> Self {
        self.names = names;
        self
    }

    /// File backing `instrument_id`. The stem is matched case-insensitively,
    /// since ids are uppercased before they reach the adapter.
    async fn csv_path(&self, instrument_id: &str) -> PathBuf {
        let exact = self.base_path.join(format!("{instrument_id}.csv"));
        if tokio::fs::try_exists(&exact).await.unwrap_or(false) {
            return exact;
        }
        let Ok(mut entries) = tokio::fs::read_dir(&self.base_path).await else {
            return exact;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if csv_stem(&path).is_some_and(|stem| stem.eq_ignore_ascii_case(instrument_id)) {
                return path;
            }
        }
        exact
    }

    fn display_name(&self, instrument_id: &str) -> String {
        self.names
            .get(&instrument_id.to_uppercase())
            .cloned()
            .unwrap_or_else(|| instrument_id.to_string())
    }
}

fn csv_stem(path: &Path) -> Option<&str> {
    if path.extension().is_none_or(|ext| ext != "csv") {
        return None;
    }
    path.file_stem().and_then(|s| s.to_str())
}

fn source_error(instrument_id: &str, reason: String) -> AnalyticsError {
    AnalyticsError::DataSource {
        instrument: instrument_id.to_string(),
        reason,
    }
}

impl DataPort for CsvAdapter {
    async fn fetch_series(
        &self,
        instrument_id: &str,
        window: &DateWindow,
    ) -> Result<TimeSeries, AnalyticsError> {
        let path = self.csv_path(instrument_id).await;
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            source_error(instrument_id, format!("failed to read {}: {e}", path.display()))
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut points = Vec::new();
        for (line, row) in rdr.deserialize::<CsvRow>().enumerate() {
            // header is line 1
            let row = row.map_err(|e| {
                source_error(
                    instrument_id,
                    format!("{} line {}: {e}", path.display(), line + 2),
                )
            })?;
            if window.contains(row.date) {
                points.push(PricePoint::new(row.date, row.value));
            }
        }

        if points.is_empty() {
            return Err(source_error(
                instrument_id,
                format!("no rows between {window} in {}", path.display()),
            ));
        }
        points.sort_by_key(|p| p.date);

        tracing::debug!(
            instrument = instrument_id,
            path = %path.display(),
            points = points.len(),
            "loaded csv series"
        );
        TimeSeries::new(instrument_id, self.display_name(instrument_id), points)
    }

    async fn list_instruments(&self) -> Result<Vec<InstrumentInfo>, AnalyticsError> {
        let mut entries = tokio::fs::read_dir(&self.base_path).await?;
        let mut instruments = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if let Some(stem) = csv_stem(&path) {
                let instrument_id = stem.to_uppercase();
                instruments.push(InstrumentInfo {
                    display_name: self.display_name(&instrument_id),
                    instrument_id,
                });
            }
        }

        instruments.sort_by(|a, b| a.instrument_id.cmp(&b.instrument_id));
        Ok(instruments)
    }
}
