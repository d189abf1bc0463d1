//! Seeded synthetic price source for simulation mode.
//!
//! Series follow a geometric Brownian motion over business days. Every
//! series is tagged [`SeriesOrigin::Synthetic`] and its display name carries
//! a `[synthetic]` suffix.

use crate::domain::config::read_parsed;
use crate::domain::error::AnalyticsError;
use crate::domain::series::{PricePoint, SeriesOrigin, TimeSeries};
use crate::domain::stats::TRADING_DAYS_PER_YEAR;
use crate::domain::window::DateWindow;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{DataPort, InstrumentInfo};
use chrono::{Datelike, Weekday};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    pub seed: u64,
    pub start_value: f64,
    pub annual_drift: f64,
    pub annual_volatility: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            seed: 42,
            start_value: 1.0,
            annual_drift: 0.06,
            annual_volatility: 0.15,
        }
    }
}

impl SimulationSettings {
    /// Reads the `[simulation]` section.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, AnalyticsError> {
        let d = Self::default();
        let settings = Self {
            seed: read_parsed(config, "simulation", "seed", d.seed)?,
            start_value: read_parsed(config, "simulation", "start_value", d.start_value)?,
            annual_drift: read_parsed(config, "simulation", "annual_drift", d.annual_drift)?,
            annual_volatility: read_parsed(
                config,
                "simulation",
                "annual_volatility",
                d.annual_volatility,
            )?,
        };

        if !(settings.start_value > 0.0 && settings.start_value.is_finite()) {
            return Err(AnalyticsError::ConfigInvalid {
                section: "simulation".into(),
                key: "start_value".into(),
                reason: "start_value must be positive".into(),
            });
        }
        if !(settings.annual_volatility >= 0.0 && settings.annual_volatility.is_finite()) {
            return Err(AnalyticsError::ConfigInvalid {
                section: "simulation".into(),
                key: "annual_volatility".into(),
                reason: "annual_volatility must be non-negative".into(),
            });
        }
        Ok(settings)
    }
}

pub struct SyntheticSource {
    settings: SimulationSettings,
    names: HashMap<String, String>,
}

impl SyntheticSource {
    pub fn new(settings: SimulationSettings) -> Self {
        Self {
            settings,
            names: HashMap::new(),
        }
    }

    pub fn with_names(mut self, names: HashMap<String, String>) -> Self {
        self.names = names;
        self
    }

    fn display_name(&self, instrument_id: &str) -> String {
        let base = self
            .names
            .get(instrument_id)
            .map(String::as_str)
            .unwrap_or(instrument_id);
        format!("{base} [synthetic]")
    }

    /// Same seed and id always give the same path; different ids diverge.
    fn rng_for(&self, instrument_id: &str) -> StdRng {
        // FNV-1a, stable across platforms and releases
        let id_hash = instrument_id
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
                (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
            });
        StdRng::seed_from_u64(self.settings.seed ^ id_hash)
    }

    fn generate(&self, instrument_id: &str, window: &DateWindow) -> Vec<PricePoint> {
        let dt = 1.0 / TRADING_DAYS_PER_YEAR;
        let sigma = self.settings.annual_volatility;
        let step_drift = (self.settings.annual_drift - 0.5 * sigma * sigma) * dt;
        let step_vol = sigma * dt.sqrt();

        let mut rng = self.rng_for(instrument_id);
        let mut value = self.settings.start_value;
        let mut points = Vec::new();

        for date in window.start.iter_days().take_while(|d| *d <= window.end) {
            if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                continue;
            }
            if !points.is_empty() {
                let z: f64 = StandardNormal.sample(&mut rng);
                value *= (step_drift + step_vol * z).exp();
            }
            points.push(PricePoint::new(date, value));
        }
        points
    }
}

impl DataPort for SyntheticSource {
    async fn fetch_series(
        &self,
        instrument_id: &str,
        window: &DateWindow,
    ) -> Result<TimeSeries, AnalyticsError> {
        let points = self.generate(instrument_id, window);
        if points.is_empty() {
            return Err(AnalyticsError::DataSource {
                instrument: instrument_id.to_string(),
                reason: format!("no business days between {window}"),
            });
        }
        tracing::debug!(
            instrument = instrument_id,
            points = points.len(),
            seed = self.settings.seed,
            "generated synthetic series"
        );
        Ok(TimeSeries::new(instrument_id, self.display_name(instrument_id), points)?
            .with_origin(SeriesOrigin::Synthetic))
    }

    async fn list_instruments(&self) -> Result<Vec<InstrumentInfo>, AnalyticsError> {
        let mut instruments: Vec<InstrumentInfo> = self
            .names
            .keys()
            .map(|id| InstrumentInfo {
                instrument_id: id.clone(),
                display_name: self.display_name(id),
            })
            .collect();
        instruments.sort_by(|a, b| a.instrument_id.cmp(&b.instrument_id));
        Ok(instruments)
    }
}
