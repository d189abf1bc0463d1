//! Engine configuration loaded and validated through [`ConfigPort`].
//!
//! Every key is optional; a missing key takes the built-in default, a
//! present but malformed or out-of-range key is an error.

use crate::domain::dca::DcaPlan;
use crate::domain::error::AnalyticsError;
use crate::domain::risk::RiskSettings;
use crate::domain::risk_score::RiskScorer;
use crate::ports::config_port::ConfigPort;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub risk: RiskSettings,
    pub scorer: RiskScorer,
    pub dca: DcaPlan,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk: RiskSettings::default(),
            scorer: RiskScorer::default(),
            dca: DcaPlan::monthly(1000.0, 12),
        }
    }
}

impl EngineConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, AnalyticsError> {
        let defaults = EngineConfig::default();

        let risk_free_rate =
            read_parsed(config, "engine", "risk_free_rate", defaults.risk.risk_free_rate)?;
        if !(0.0..1.0).contains(&risk_free_rate) {
            return Err(invalid(
                "engine",
                "risk_free_rate",
                "risk_free_rate must be between 0 and 1",
            ));
        }
        let min_confident_samples = read_parsed(
            config,
            "engine",
            "min_confident_samples",
            defaults.risk.min_confident_samples,
        )?;

        let d = defaults.scorer;
        let scorer = RiskScorer {
            volatility_weight: read_parsed(config, "risk", "volatility_weight", d.volatility_weight)?,
            drawdown_weight: read_parsed(config, "risk", "drawdown_weight", d.drawdown_weight)?,
            low_max: read_parsed(config, "risk", "low_max", d.low_max)?,
            low_medium_max: read_parsed(config, "risk", "low_medium_max", d.low_medium_max)?,
            medium_max: read_parsed(config, "risk", "medium_max", d.medium_max)?,
        };
        scorer
            .validate()
            .map_err(|e| {
                let key = match &e {
                    AnalyticsError::InvalidParameter { name, .. } if name == "risk weights" => {
                        "weights"
                    }
                    _ => "bands",
                };
                invalid("risk", key, &e.to_string())
            })?;

        let d = defaults.dca;
        let dca = DcaPlan {
            contribution_amount: read_parsed(config, "dca", "contribution", d.contribution_amount)?,
            periods: read_parsed(config, "dca", "periods", d.periods)?,
            frequency: read_parsed(config, "dca", "frequency", d.frequency)?,
        };
        dca.validate().map_err(|e| {
            let key = match &e {
                AnalyticsError::InvalidParameter { name, .. } if name == "periods" => "periods",
                _ => "contribution",
            };
            invalid("dca", key, &e.to_string())
        })?;

        Ok(Self {
            risk: RiskSettings {
                risk_free_rate,
                min_confident_samples,
            },
            scorer,
            dca,
        })
    }
}

/// Read `[section] key` and parse it, falling back to `default` when absent.
pub fn read_parsed<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, AnalyticsError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| invalid(section, key, &format!("cannot parse '{}'", raw.trim()))),
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> AnalyticsError {
    AnalyticsError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
