//! Dollar-cost averaging simulation.
//!
//! A plan buys a fixed amount at every contribution date. Prices come from
//! the caller; a period without a price is an error, never a made-up value.

use crate::domain::error::AnalyticsError;
use crate::domain::series::{PricePoint, TimeSeries};
use chrono::{Duration, Months, NaiveDate};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Weekly,
    #[default]
    Monthly,
    Quarterly,
}

impl Frequency {
    pub fn periods_per_year(&self) -> f64 {
        match self {
            Frequency::Weekly => 52.0,
            Frequency::Monthly => 12.0,
            Frequency::Quarterly => 4.0,
        }
    }

    /// The `k`-th contribution date counted from `start`.
    pub fn nth_date(&self, start: NaiveDate, k: usize) -> Option<NaiveDate> {
        match self {
            Frequency::Weekly => start.checked_add_signed(Duration::weeks(k as i64)),
            Frequency::Monthly => start.checked_add_months(Months::new(u32::try_from(k).ok()?)),
            Frequency::Quarterly => {
                start.checked_add_months(Months::new(u32::try_from(k).ok()?.checked_mul(3)?))
            }
        }
    }
}

impl FromStr for Frequency {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "quarterly" => Ok(Frequency::Quarterly),
            other => Err(AnalyticsError::invalid_parameter(
                "frequency",
                format!("unknown frequency '{other}'"),
            )),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DcaPlan {
    pub contribution_amount: f64,
    pub periods: usize,
    pub frequency: Frequency,
}

impl DcaPlan {
    pub fn monthly(contribution_amount: f64, periods: usize) -> Self {
        Self {
            contribution_amount,
            periods,
            frequency: Frequency::Monthly,
        }
    }

    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if !self.contribution_amount.is_finite() || self.contribution_amount <= 0.0 {
            return Err(AnalyticsError::invalid_parameter(
                "contribution_amount",
                format!("must be positive, got {}", self.contribution_amount),
            ));
        }
        if self.periods == 0 {
            return Err(AnalyticsError::invalid_parameter(
                "periods",
                "at least one contribution period is required",
            ));
        }
        Ok(())
    }
}

impl FromStr for DcaPlan {
    type Err = AnalyticsError;

    /// `<amount>x<periods>[@frequency]`, e.g. `500x24@monthly`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (body, frequency) = match s.split_once('@') {
            Some((body, freq)) => (body, freq.parse::<Frequency>()?),
            None => (s, Frequency::Monthly),
        };
        let (amount, periods) = body.split_once('x').ok_or_else(|| {
            AnalyticsError::invalid_parameter(
                "plan",
                format!("expected <amount>x<periods>, got '{s}'"),
            )
        })?;
        let plan = DcaPlan {
            contribution_amount: amount.trim().parse().map_err(|_| {
                AnalyticsError::invalid_parameter("plan", format!("bad amount '{amount}'"))
            })?,
            periods: periods.trim().parse().map_err(|_| {
                AnalyticsError::invalid_parameter("plan", format!("bad period count '{periods}'"))
            })?,
            frequency,
        };
        plan.validate()?;
        Ok(plan)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DcaPoint {
    pub period_index: usize,
    pub date: NaiveDate,
    pub contribution_amount: f64,
    pub unit_price: f64,
    pub units_purchased: f64,
    pub cumulative_contribution: f64,
    pub cumulative_units: f64,
    pub market_value: f64,
    pub unrealized_return: f64,
    pub return_rate_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DcaSummary {
    pub total_contribution: f64,
    pub final_market_value: f64,
    pub total_return: f64,
    pub total_return_pct: f64,
    pub annualized_return_pct: f64,
    /// Price change of the instrument from the first to the last contribution.
    pub benchmark_return_pct: f64,
    pub lump_sum_final_value: f64,
    pub dca_advantage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DcaSimulation {
    pub plan: DcaPlan,
    pub points: Vec<DcaPoint>,
    pub summary: DcaSummary,
}

/// Run `plan` against `price_path`, one price per contribution period in
/// order. Extra prices past `plan.periods` are ignored.
pub fn simulate(
    price_path: &[PricePoint],
    plan: &DcaPlan,
) -> Result<DcaSimulation, AnalyticsError> {
    plan.validate()?;

    let Some(last_known) = price_path.last() else {
        return Err(AnalyticsError::invalid_parameter("price_path", "no prices supplied"));
    };
    if price_path.len() < plan.periods {
        let missing = price_path.len();
        let target = plan
            .frequency
            .nth_date(last_known.date, 1)
            .unwrap_or(last_known.date);
        return Err(AnalyticsError::MissingPricePoint {
            period_index: missing,
            target,
        });
    }

    let amount = plan.contribution_amount;
    let mut cumulative_units = 0.0_f64;
    let mut points = Vec::with_capacity(plan.periods);

    for (period_index, price) in price_path.iter().take(plan.periods).enumerate() {
        if !price.value.is_finite() || price.value <= 0.0 {
            return Err(AnalyticsError::DivisionByZero {
                context: format!(
                    "units purchased in period {period_index} (unit price {} on {})",
                    price.value, price.date
                ),
            });
        }

        let units_purchased = amount / price.value;
        cumulative_units += units_purchased;
        let cumulative_contribution = amount * (period_index + 1) as f64;
        let market_value = cumulative_units * price.value;
        let unrealized_return = market_value - cumulative_contribution;

        points.push(DcaPoint {
            period_index,
            date: price.date,
            contribution_amount: amount,
            unit_price: price.value,
            units_purchased,
            cumulative_contribution,
            cumulative_units,
            market_value,
            unrealized_return,
            return_rate_pct: unrealized_return / cumulative_contribution * 100.0,
        });
    }

    let first_price = price_path[0].value;
    let final_point = &points[points.len() - 1];
    let total_contribution = final_point.cumulative_contribution;
    let final_market_value = final_point.market_value;

    let benchmark_return = final_point.unit_price / first_price - 1.0;
    let lump_sum_final_value = total_contribution * (1.0 + benchmark_return);

    let years = plan.periods as f64 / plan.frequency.periods_per_year();
    let growth = final_market_value / total_contribution;
    let annualized_return_pct = (growth.powf(1.0 / years) - 1.0) * 100.0;

    let summary = DcaSummary {
        total_contribution,
        final_market_value,
        total_return: final_market_value - total_contribution,
        total_return_pct: (growth - 1.0) * 100.0,
        annualized_return_pct,
        benchmark_return_pct: benchmark_return * 100.0,
        lump_sum_final_value,
        dca_advantage: final_market_value - lump_sum_final_value,
    };

    Ok(DcaSimulation {
        plan: *plan,
        points,
        summary,
    })
}

/// Pick one price per contribution period from a (typically daily) series.
///
/// Period `k` targets `frequency.nth_date(start, k)` and takes the first
/// point on or after that date and before the next target. A period with no
/// such point is `MissingPricePoint`.
pub fn contribution_schedule(
    series: &TimeSeries,
    start: NaiveDate,
    periods: usize,
    frequency: Frequency,
) -> Result<Vec<PricePoint>, AnalyticsError> {
    let points = series.points();
    let mut schedule = Vec::with_capacity(periods);

    for k in 0..periods {
        let target = frequency.nth_date(start, k).ok_or_else(|| {
            AnalyticsError::invalid_parameter("start", format!("period {k} overflows the calendar"))
        })?;
        let next_target = frequency.nth_date(start, k + 1);

        let idx = points.partition_point(|p| p.date < target);
        match points.get(idx) {
            Some(p) if next_target.is_none_or(|next| p.date < next) => {
                tracing::debug!(period = k, %target, priced_on = %p.date, "contribution priced");
                schedule.push(*p);
            }
            _ => {
                return Err(AnalyticsError::MissingPricePoint {
                    period_index: k,
                    target,
                });
            }
        }
    }

    Ok(schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn path(prices: &[f64]) -> Vec<PricePoint> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| PricePoint::new(date(2024, i as u32 + 1, 1), p))
            .collect()
    }

    #[test]
    fn three_period_scenario() {
        let sim = simulate(&path(&[1.0, 0.9, 1.1]), &DcaPlan::monthly(1000.0, 3)).unwrap();
        let last = sim.points.last().unwrap();

        let units = 1000.0 / 1.0 + 1000.0 / 0.9 + 1000.0 / 1.1;
        assert_relative_eq!(last.cumulative_contribution, 3000.0);
        assert_relative_eq!(last.cumulative_units, units, epsilon = 1e-9);
        assert_relative_eq!(last.market_value, units * 1.1, epsilon = 1e-9);
        assert!((last.cumulative_units - 3020.2).abs() < 0.05);
        assert!((last.market_value - 3322.2).abs() < 0.05);
    }

    #[test]
    fn cumulative_values_increase_each_period() {
        let sim = simulate(&path(&[10.0, 12.0, 8.0, 11.0]), &DcaPlan::monthly(250.0, 4)).unwrap();
        for w in sim.points.windows(2) {
            assert_relative_eq!(
                w[1].cumulative_contribution - w[0].cumulative_contribution,
                250.0
            );
            assert_relative_eq!(
                w[1].cumulative_units - w[0].cumulative_units,
                w[1].units_purchased,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn return_rate_per_point() {
        let sim = simulate(&path(&[1.0, 2.0]), &DcaPlan::monthly(100.0, 2)).unwrap();
        let p = &sim.points[1];
        // 150 units * 2.0 = 300 on 200 invested
        assert_relative_eq!(p.market_value, 300.0);
        assert_relative_eq!(p.unrealized_return, 100.0);
        assert_relative_eq!(p.return_rate_pct, 50.0);
    }

    #[test]
    fn lump_sum_comparison() {
        let sim = simulate(&path(&[1.0, 0.5, 1.0]), &DcaPlan::monthly(100.0, 3)).unwrap();
        let s = &sim.summary;
        // units 100 + 200 + 100 = 400 -> 400 at the end vs 300 lump sum flat
        assert_relative_eq!(s.final_market_value, 400.0);
        assert_relative_eq!(s.benchmark_return_pct, 0.0);
        assert_relative_eq!(s.lump_sum_final_value, 300.0);
        assert_relative_eq!(s.dca_advantage, 100.0);
        assert_relative_eq!(s.total_return, 100.0);
    }

    #[test]
    fn annualized_over_twelve_monthly_periods_equals_total() {
        let prices: Vec<f64> = (0..12).map(|i| 1.0 + i as f64 * 0.01).collect();
        let sim = simulate(&path_long(&prices), &DcaPlan::monthly(100.0, 12)).unwrap();
        assert_relative_eq!(
            sim.summary.annualized_return_pct,
            sim.summary.total_return_pct,
            epsilon = 1e-9
        );
    }

    fn path_long(prices: &[f64]) -> Vec<PricePoint> {
        let start = date(2023, 1, 1);
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| PricePoint::new(Frequency::Monthly.nth_date(start, i).unwrap(), p))
            .collect()
    }

    #[test]
    fn short_path_is_missing_price() {
        let err = simulate(&path(&[1.0, 1.1]), &DcaPlan::monthly(100.0, 3)).unwrap_err();
        match err {
            AnalyticsError::MissingPricePoint {
                period_index,
                target,
            } => {
                assert_eq!(period_index, 2);
                assert_eq!(target, date(2024, 3, 1));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn zero_price_is_division_by_zero() {
        let err = simulate(&path(&[1.0, 0.0]), &DcaPlan::monthly(100.0, 2)).unwrap_err();
        assert!(matches!(err, AnalyticsError::DivisionByZero { .. }));
    }

    #[test]
    fn invalid_plans_are_rejected() {
        let prices = path(&[1.0]);
        assert!(matches!(
            simulate(&prices, &DcaPlan::monthly(0.0, 1)),
            Err(AnalyticsError::InvalidParameter { .. })
        ));
        assert!(matches!(
            simulate(&prices, &DcaPlan::monthly(100.0, 0)),
            Err(AnalyticsError::InvalidParameter { .. })
        ));
        assert!(matches!(
            simulate(&[], &DcaPlan::monthly(100.0, 1)),
            Err(AnalyticsError::InvalidParameter { .. })
        ));
    }

    fn daily_series(start: NaiveDate, days: i64, skip: &[NaiveDate]) -> TimeSeries {
        let points = (0..days)
            .map(|i| start + Duration::days(i))
            .filter(|d| !skip.contains(d))
            .enumerate()
            .map(|(i, d)| PricePoint::new(d, 100.0 + i as f64))
            .collect();
        TimeSeries::new("FUND", "Fund", points).unwrap()
    }

    #[test]
    fn schedule_takes_first_point_on_or_after_target() {
        let series = daily_series(date(2024, 1, 1), 120, &[date(2024, 2, 1), date(2024, 2, 2)]);
        let schedule =
            contribution_schedule(&series, date(2024, 1, 1), 3, Frequency::Monthly).unwrap();
        let dates: Vec<NaiveDate> = schedule.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![date(2024, 1, 1), date(2024, 2, 3), date(2024, 3, 1)]);
    }

    #[test]
    fn schedule_fails_past_end_of_series() {
        let series = daily_series(date(2024, 1, 1), 40, &[]);
        let err =
            contribution_schedule(&series, date(2024, 1, 1), 3, Frequency::Monthly).unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::MissingPricePoint {
                period_index: 2,
                ..
            }
        ));
    }

    #[test]
    fn frequency_dates() {
        let start = date(2024, 1, 31);
        assert_eq!(Frequency::Monthly.nth_date(start, 1), Some(date(2024, 2, 29)));
        assert_eq!(Frequency::Quarterly.nth_date(start, 1), Some(date(2024, 4, 30)));
        assert_eq!(Frequency::Weekly.nth_date(start, 2), Some(date(2024, 2, 14)));
        assert_eq!("Quarterly".parse::<Frequency>().unwrap(), Frequency::Quarterly);
        assert!("daily".parse::<Frequency>().is_err());
    }

    #[test]
    fn plan_from_str() {
        let plan: DcaPlan = "500x24@weekly".parse().unwrap();
        assert_eq!(plan.contribution_amount, 500.0);
        assert_eq!(plan.periods, 24);
        assert_eq!(plan.frequency, Frequency::Weekly);

        let plan: DcaPlan = "1000x3".parse().unwrap();
        assert_eq!(plan.frequency, Frequency::Monthly);

        assert!("1000".parse::<DcaPlan>().is_err());
        assert!("-5x3".parse::<DcaPlan>().is_err());
    }
}
