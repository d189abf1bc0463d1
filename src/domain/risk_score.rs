//! Discrete risk classification from volatility and drawdown.

use crate::domain::error::AnalyticsError;
use crate::domain::risk::RiskMetrics;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    LowMedium,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::LowMedium => "LOW_MEDIUM",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskClassification {
    pub risk_score: f64,
    pub risk_level: RiskLevel,
}

/// Weighted score plus the exclusive upper bound of each band. The defaults
/// are empirical calibration values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskScorer {
    pub volatility_weight: f64,
    pub drawdown_weight: f64,
    pub low_max: f64,
    pub low_medium_max: f64,
    pub medium_max: f64,
}

impl Default for RiskScorer {
    fn default() -> Self {
        Self {
            volatility_weight: 0.6,
            drawdown_weight: 0.4,
            low_max: 10.0,
            low_medium_max: 20.0,
            medium_max: 30.0,
        }
    }
}

impl RiskScorer {
    /// Bands must be strictly increasing and weights finite and non-negative.
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        let weight_ok = |w: f64| w.is_finite() && w >= 0.0;
        if !weight_ok(self.volatility_weight) || !weight_ok(self.drawdown_weight) {
            return Err(AnalyticsError::invalid_parameter(
                "risk weights",
                format!(
                    "weights must be finite and non-negative, got {} and {}",
                    self.volatility_weight, self.drawdown_weight
                ),
            ));
        }
        if !(self.low_max < self.low_medium_max && self.low_medium_max < self.medium_max) {
            return Err(AnalyticsError::invalid_parameter(
                "risk bands",
                format!(
                    "bands must increase: {} < {} < {}",
                    self.low_max, self.low_medium_max, self.medium_max
                ),
            ));
        }
        Ok(())
    }

    pub fn classify(&self, volatility_pct: f64, max_drawdown_pct: f64) -> RiskClassification {
        let risk_score =
            volatility_pct * self.volatility_weight + max_drawdown_pct * self.drawdown_weight;

        let risk_level = if risk_score < self.low_max {
            RiskLevel::Low
        } else if risk_score < self.low_medium_max {
            RiskLevel::LowMedium
        } else if risk_score < self.medium_max {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        };

        RiskClassification {
            risk_score,
            risk_level,
        }
    }

    pub fn classify_metrics(&self, metrics: &RiskMetrics) -> RiskClassification {
        self.classify(metrics.volatility_pct, metrics.max_drawdown_pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_risk() {
        let c = RiskScorer::default().classify(5.0, 5.0);
        assert_eq!(c.risk_level, RiskLevel::Low);
        assert!((c.risk_score - 5.0).abs() < 1e-12);
    }

    #[test]
    fn high_risk() {
        let c = RiskScorer::default().classify(35.0, 35.0);
        assert_eq!(c.risk_level, RiskLevel::High);
    }

    #[test]
    fn band_edges_belong_to_upper_band() {
        let scorer = RiskScorer {
            volatility_weight: 1.0,
            drawdown_weight: 0.0,
            ..RiskScorer::default()
        };
        assert_eq!(scorer.classify(9.999, 0.0).risk_level, RiskLevel::Low);
        assert_eq!(scorer.classify(10.0, 0.0).risk_level, RiskLevel::LowMedium);
        assert_eq!(scorer.classify(20.0, 0.0).risk_level, RiskLevel::Medium);
        assert_eq!(scorer.classify(30.0, 0.0).risk_level, RiskLevel::High);
    }

    #[test]
    fn weights_combine() {
        // 20 * 0.6 + 10 * 0.4 = 16
        let c = RiskScorer::default().classify(20.0, 10.0);
        assert!((c.risk_score - 16.0).abs() < 1e-12);
        assert_eq!(c.risk_level, RiskLevel::LowMedium);
    }

    #[test]
    fn custom_bands_override_defaults() {
        let scorer = RiskScorer {
            low_max: 2.0,
            low_medium_max: 4.0,
            medium_max: 6.0,
            ..RiskScorer::default()
        };
        assert_eq!(scorer.classify(5.0, 5.0).risk_level, RiskLevel::Medium);
    }

    #[test]
    fn validate_rejects_unordered_bands() {
        let scorer = RiskScorer {
            low_max: 30.0,
            ..RiskScorer::default()
        };
        assert!(scorer.validate().is_err());
        assert!(RiskScorer::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_non_finite_weights() {
        for weight in [f64::NAN, f64::INFINITY, -0.1] {
            let scorer = RiskScorer {
                volatility_weight: weight,
                ..RiskScorer::default()
            };
            assert!(scorer.validate().is_err(), "{weight}");
        }
    }

    #[test]
    fn level_display_and_order() {
        assert_eq!(RiskLevel::LowMedium.to_string(), "LOW_MEDIUM");
        assert!(RiskLevel::Low < RiskLevel::High);
        let json = serde_json::to_string(&RiskLevel::LowMedium).unwrap();
        assert_eq!(json, "\"LOW_MEDIUM\"");
    }
}
