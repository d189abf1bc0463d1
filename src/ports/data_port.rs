//! Data source port trait.
//!
//! Providers translate whatever they read into validated [`TimeSeries`]
//! values at this boundary. Fetching, caching, retries and timeouts are the
//! provider's concern, not the engine's.

use crate::domain::error::AnalyticsError;
use crate::domain::series::TimeSeries;
use crate::domain::window::DateWindow;
use serde::Serialize;
use std::future::Future;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstrumentInfo {
    pub instrument_id: String,
    pub display_name: String,
}

impl InstrumentInfo {
    /// Case-insensitive substring match on the id or the display name.
    pub fn matches(&self, keyword: &str) -> bool {
        let keyword = keyword.trim().to_lowercase();
        self.instrument_id.to_lowercase().contains(&keyword)
            || self.display_name.to_lowercase().contains(&keyword)
    }
}

/// The first `limit` instruments matching `keyword`, in listing order.
pub fn search_instruments(
    instruments: Vec<InstrumentInfo>,
    keyword: &str,
    limit: usize,
) -> Vec<InstrumentInfo> {
    instruments
        .into_iter()
        .filter(|i| i.matches(keyword))
        .take(limit)
        .collect()
}

pub trait DataPort {
    /// Price series of `instrument_id` restricted to `window`.
    fn fetch_series(
        &self,
        instrument_id: &str,
        window: &DateWindow,
    ) -> impl Future<Output = Result<TimeSeries, AnalyticsError>> + Send;

    fn list_instruments(
        &self,
    ) -> impl Future<Output = Result<Vec<InstrumentInfo>, AnalyticsError>> + Send;
}
