//! Core analytics: series, return and risk metrics, scoring, DCA and comparison.

pub mod analysis;
pub mod backtest;
pub mod comparison;
pub mod config;
pub mod dca;
pub mod error;
pub mod returns;
pub mod risk;
pub mod risk_score;
pub mod series;
pub mod stats;
pub mod window;
