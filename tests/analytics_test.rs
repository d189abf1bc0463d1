//! End-to-end checks of the single-instrument analytics pipeline.

mod common;

use approx::assert_relative_eq;
use common::*;
use fundscope::domain::analysis::analyze;
use fundscope::domain::backtest::{self, InvestmentStrategy};
use fundscope::domain::config::EngineConfig;
use fundscope::domain::dca::{contribution_schedule, simulate, DcaPlan, Frequency};
use fundscope::domain::error::AnalyticsError;
use fundscope::domain::returns::PerformanceMetrics;
use fundscope::domain::risk::{drawdown_curve, RiskMetrics, RiskSettings};
use fundscope::domain::risk_score::{RiskLevel, RiskScorer};
use fundscope::domain::series::{PricePoint, TimeSeries};
use proptest::prelude::*;

fn series_from(values: &[f64]) -> TimeSeries {
    make_series("PROP", values)
}

mod scenarios {
    use super::*;

    #[test]
    fn two_point_total_return() {
        let series = TimeSeries::new(
            "F",
            "F",
            vec![
                PricePoint::new(date("2024-01-01"), 100.0),
                PricePoint::new(date("2024-01-02"), 110.0),
            ],
        )
        .unwrap();
        let perf = PerformanceMetrics::compute(&series).unwrap();
        assert_relative_eq!(perf.total_return_pct, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn drawdown_from_peak() {
        let series = series_from(&[100.0, 90.0, 120.0]);
        let risk = RiskMetrics::compute(&series, &RiskSettings::default()).unwrap();
        assert_relative_eq!(risk.max_drawdown_pct, 10.0, epsilon = 1e-9);
        assert!(risk.low_confidence);
        assert_eq!(risk.sample_size, 2);
    }

    #[test]
    fn dca_three_months() {
        let prices = vec![
            PricePoint::new(date("2024-01-01"), 1.0),
            PricePoint::new(date("2024-02-01"), 0.9),
            PricePoint::new(date("2024-03-01"), 1.1),
        ];
        let sim = simulate(&prices, &DcaPlan::monthly(1000.0, 3)).unwrap();
        assert_relative_eq!(sim.summary.total_contribution, 3000.0);
        let last = sim.points.last().unwrap();
        assert!((last.cumulative_units - 3020.2).abs() < 0.05);
        assert!((sim.summary.final_market_value - 3322.2).abs() < 0.05);
    }

    #[test]
    fn dca_from_daily_series() {
        // Jan 1 .. Apr 30, one point per day
        let values: Vec<f64> = (0..121).map(|i| 1.0 + i as f64 * 0.01).collect();
        let series = series_from(&values);
        let prices =
            contribution_schedule(&series, date("2024-01-15"), 3, Frequency::Monthly).unwrap();
        let dates: Vec<_> = prices.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![date("2024-01-15"), date("2024-02-15"), date("2024-03-15")]);

        let sim = simulate(&prices, &DcaPlan::monthly(100.0, 3)).unwrap();
        assert!(sim.summary.total_return > 0.0);
    }

    #[test]
    fn dca_past_end_of_data_is_missing_price() {
        let series = series_from(&[1.0; 40]);
        let err = contribution_schedule(&series, date("2024-01-01"), 3, Frequency::Monthly)
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::MissingPricePoint { period_index: 2, .. }));
    }

    #[test]
    fn classification_bands() {
        let scorer = RiskScorer::default();
        assert_eq!(scorer.classify(5.0, 5.0).risk_level, RiskLevel::Low);
        assert_eq!(scorer.classify(35.0, 35.0).risk_level, RiskLevel::High);
    }

    #[test]
    fn lump_sum_beats_dca_in_rising_market() {
        let values: Vec<f64> = (0..120).map(|i| 10.0 + i as f64 * 0.1).collect();
        let series = series_from(&values);
        let settings = RiskSettings::default();
        let lump = backtest::run(&series, 1200.0, InvestmentStrategy::LumpSum, &settings).unwrap();
        let dca = backtest::run(
            &series,
            1200.0,
            InvestmentStrategy::Dca {
                frequency: Frequency::Monthly,
            },
            &settings,
        )
        .unwrap();
        assert!(lump.final_value > dca.final_value);
        assert_relative_eq!(dca.valuation.last().unwrap().invested, 1200.0, epsilon = 1e-9);
    }
}

proptest! {
    #[test]
    fn constant_series_has_no_risk(value in 0.01f64..10_000.0, len in 3usize..80) {
        let series = series_from(&vec![value; len]);
        let analysis = analyze(&series, &EngineConfig::default()).unwrap();
        prop_assert_eq!(analysis.risk.volatility_pct, 0.0);
        prop_assert_eq!(analysis.risk.max_drawdown_pct, 0.0);
        prop_assert_eq!(analysis.risk.sharpe_ratio, 0.0);
        prop_assert_eq!(analysis.classification.risk_level, RiskLevel::Low);
    }

    #[test]
    fn rising_series_never_draws_down(
        start in 0.5f64..100.0,
        steps in prop::collection::vec(0.001f64..5.0, 3..60),
    ) {
        let values: Vec<f64> = steps
            .iter()
            .scan(start, |v, step| {
                *v += step;
                Some(*v)
            })
            .collect();
        let series = series_from(&values);
        prop_assert!(drawdown_curve(&series).iter().all(|p| p.drawdown_pct == 0.0));
        let risk = RiskMetrics::compute(&series, &RiskSettings::default()).unwrap();
        prop_assert_eq!(risk.max_drawdown_pct, 0.0);
    }

    #[test]
    fn total_return_round_trips(first in 0.01f64..10_000.0, last in 0.0f64..10_000.0) {
        let series = series_from(&[first, last]);
        let perf = PerformanceMetrics::compute(&series).unwrap();
        let rebuilt = first * (1.0 + perf.total_return_pct / 100.0);
        prop_assert!((rebuilt - last).abs() <= 1e-9 * last.max(1.0));
    }

    #[test]
    fn drawdown_is_a_percentage(values in prop::collection::vec(0.01f64..1_000.0, 3..80)) {
        let series = series_from(&values);
        let risk = RiskMetrics::compute(&series, &RiskSettings::default()).unwrap();
        prop_assert!(risk.max_drawdown_pct >= 0.0 && risk.max_drawdown_pct < 100.0);
        prop_assert!(risk.volatility_pct >= 0.0);
        prop_assert!(risk.var_99_pct <= risk.var_95_pct);
    }

    #[test]
    fn dca_contributions_add_up(
        amount in 1.0f64..10_000.0,
        prices in prop::collection::vec(0.01f64..500.0, 1..48),
    ) {
        let points: Vec<PricePoint> = daily_points("2020-01-01", &prices);
        let plan = DcaPlan::monthly(amount, points.len());
        let sim = simulate(&points, &plan).unwrap();

        let last = sim.points.last().unwrap();
        let expected = amount * points.len() as f64;
        prop_assert!((last.cumulative_contribution - expected).abs() <= 1e-9 * expected);
        let units: f64 = sim.points.iter().map(|p| p.units_purchased).sum();
        prop_assert!((units - last.cumulative_units).abs() <= 1e-9 * units);
    }
}
