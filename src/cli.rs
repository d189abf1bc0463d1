//! CLI definition and dispatch.

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::synthetic_adapter::{SimulationSettings, SyntheticSource};
use crate::domain::analysis::{analyze, InstrumentAnalysis};
use crate::domain::backtest::{self, BacktestResult, InvestmentStrategy};
use crate::domain::comparison::{parse_instrument_ids, ComparisonAggregator, ComparisonResult};
use crate::domain::config::EngineConfig;
use crate::domain::dca::{contribution_schedule, simulate, DcaPlan, DcaSimulation, Frequency};
use crate::domain::error::AnalyticsError;
use crate::domain::risk::{drawdown_curve, DrawdownPoint};
use crate::domain::series::{DailyChange, SeriesOrigin, TimeSeries};
use crate::domain::window::{AnalysisPeriod, DateWindow};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{search_instruments, DataPort, InstrumentInfo};

pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Parser, Debug)]
#[command(name = "fundscope", about = "Fund and index performance and risk analytics")]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Directory of <instrument>.csv price files (overrides [data] dir)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
    /// Use seeded synthetic prices instead of the data directory
    #[arg(long, global = true)]
    pub simulate: bool,
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,
    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct WindowArgs {
    /// First date of the window (YYYY-MM-DD)
    #[arg(long, conflicts_with = "period")]
    pub start: Option<NaiveDate>,
    /// Last date of the window (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub end: Option<NaiveDate>,
    /// Look-back ending at --end: 3m, 6m, 1y, 2y, 3y, 5y or ytd [default: 1y]
    #[arg(long)]
    pub period: Option<AnalysisPeriod>,
}

impl WindowArgs {
    pub fn resolve(&self, today: NaiveDate) -> Result<DateWindow, AnalyticsError> {
        let end = self.end.unwrap_or(today);
        match self.start {
            Some(start) => DateWindow::new(start, end),
            None => self
                .period
                .unwrap_or(AnalysisPeriod::Months(12))
                .window_ending(end),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyArg {
    LumpSum,
    Dca,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Performance, risk and classification of one instrument
    Analyze {
        #[arg(short, long)]
        instrument: String,
        #[command(flatten)]
        window: WindowArgs,
        /// Include the drawdown curve and daily changes
        #[arg(long)]
        detail: bool,
    },
    /// Simulate a dollar-cost averaging plan
    Dca {
        #[arg(short, long)]
        instrument: String,
        /// Date of the first contribution (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Whole plan as <amount>x<periods>[@frequency], e.g. 500x24@monthly
        #[arg(long, conflicts_with_all = ["amount", "periods", "frequency"])]
        plan: Option<DcaPlan>,
        /// Contribution per period (overrides [dca] contribution)
        #[arg(long)]
        amount: Option<f64>,
        /// Number of contributions (overrides [dca] periods)
        #[arg(long)]
        periods: Option<usize>,
        /// weekly, monthly or quarterly (overrides [dca] frequency)
        #[arg(long)]
        frequency: Option<Frequency>,
    },
    /// Backtest a lump-sum or DCA investment over a window
    Backtest {
        #[arg(short, long)]
        instrument: String,
        #[command(flatten)]
        window: WindowArgs,
        /// Total amount invested
        #[arg(long, default_value_t = 10_000.0)]
        amount: f64,
        #[arg(long, value_enum, default_value_t = StrategyArg::LumpSum)]
        strategy: StrategyArg,
        /// Contribution frequency for --strategy dca
        #[arg(long, default_value_t = Frequency::Monthly)]
        frequency: Frequency,
    },
    /// Compare several instruments over the same window
    Compare {
        /// Comma-separated instrument ids
        #[arg(short, long)]
        instruments: String,
        #[command(flatten)]
        window: WindowArgs,
    },
    /// List instruments available from the data source
    List {
        /// Only show instruments whose id or name contains this keyword
        #[arg(short, long)]
        search: Option<String>,
        /// Maximum number of search results
        #[arg(long, default_value_t = 10, requires = "search")]
        limit: usize,
    },
    /// Validate the configuration and print the resolved settings
    CheckConfig,
}

/// Everything read from the configuration file, validated.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub engine: EngineConfig,
    pub simulation: SimulationSettings,
    pub data_dir: PathBuf,
    /// `[instruments]` display names keyed by uppercased id.
    pub names: HashMap<String, String>,
}

pub fn load_settings(
    config_path: Option<&Path>,
    data_dir_override: Option<&Path>,
) -> Result<Settings, AnalyticsError> {
    let config = match config_path {
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            FileConfigAdapter::from_file(path)?
        }
        None => FileConfigAdapter::from_string("")?,
    };
    settings_from_config(&config, data_dir_override)
}

pub fn settings_from_config(
    config: &dyn ConfigPort,
    data_dir_override: Option<&Path>,
) -> Result<Settings, AnalyticsError> {
    let engine = EngineConfig::from_config(config)?;
    let simulation = SimulationSettings::from_config(config)?;

    let data_dir = match data_dir_override {
        Some(dir) => dir.to_path_buf(),
        None => config
            .get_string("data", "dir")
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
    };

    let mut names = HashMap::new();
    for (id, name) in config.get_section("instruments") {
        if name.trim().is_empty() {
            return Err(AnalyticsError::ConfigMissing {
                section: "instruments".into(),
                key: id,
            });
        }
        // ini keys come back lowercased
        names.insert(id.to_uppercase(), name.trim().to_string());
    }

    Ok(Settings {
        engine,
        simulation,
        data_dir,
        names,
    })
}

/// The data source selected on the command line.
pub enum Source {
    Csv(CsvAdapter),
    Synthetic(SyntheticSource),
}

impl Source {
    pub fn from_settings(settings: &Settings, simulate: bool) -> Self {
        if simulate {
            Source::Synthetic(
                SyntheticSource::new(settings.simulation.clone())
                    .with_names(settings.names.clone()),
            )
        } else {
            Source::Csv(
                CsvAdapter::new(settings.data_dir.clone()).with_names(settings.names.clone()),
            )
        }
    }
}

impl DataPort for Source {
    async fn fetch_series(
        &self,
        instrument_id: &str,
        window: &DateWindow,
    ) -> Result<TimeSeries, AnalyticsError> {
        match self {
            Source::Csv(csv) => csv.fetch_series(instrument_id, window).await,
            Source::Synthetic(synthetic) => synthetic.fetch_series(instrument_id, window).await,
        }
    }

    async fn list_instruments(&self) -> Result<Vec<InstrumentInfo>, AnalyticsError> {
        match self {
            Source::Csv(csv) => csv.list_instruments().await,
            Source::Synthetic(synthetic) => synthetic.list_instruments().await,
        }
    }
}

pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    // a subscriber may already be installed when embedded
    let _ = tracing::subscriber::set_global_default(subscriber);
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.verbose);
    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn execute(cli: Cli) -> Result<(), AnalyticsError> {
    let settings = load_settings(cli.config.as_deref(), cli.data_dir.as_deref())?;
    let json = cli.json;

    if let Command::CheckConfig = cli.command {
        return run_check_config(&settings, json);
    }

    let source = Source::from_settings(&settings, cli.simulate);
    if cli.simulate {
        eprintln!(
            "Simulation mode: synthetic prices (seed {})",
            settings.simulation.seed
        );
    } else {
        tracing::debug!(data_dir = %settings.data_dir.display(), "using csv data source");
    }

    let runtime = Runtime::new()?;
    let today = Local::now().date_naive();

    match cli.command {
        Command::Analyze {
            instrument,
            window,
            detail,
        } => {
            let id = single_id(&instrument)?;
            let window = window.resolve(today)?;
            eprintln!("Analyzing {id} over {window}");
            let series = runtime.block_on(source.fetch_series(&id, &window))?;
            run_analyze(&series, &settings.engine, detail, json)
        }
        Command::Dca {
            instrument,
            start,
            plan,
            amount,
            periods,
            frequency,
        } => {
            let id = single_id(&instrument)?;
            let plan = resolve_plan(settings.engine.dca, plan, amount, periods, frequency)?;
            let window = dca_window(start, &plan, today)?;
            eprintln!(
                "Simulating {} x {} ({}) on {id} from {start}",
                plan.contribution_amount, plan.periods, plan.frequency
            );
            let series = runtime.block_on(source.fetch_series(&id, &window))?;
            run_dca(&series, start, &plan, json)
        }
        Command::Backtest {
            instrument,
            window,
            amount,
            strategy,
            frequency,
        } => {
            let id = single_id(&instrument)?;
            let window = window.resolve(today)?;
            let strategy = match strategy {
                StrategyArg::LumpSum => InvestmentStrategy::LumpSum,
                StrategyArg::Dca => InvestmentStrategy::Dca { frequency },
            };
            eprintln!("Backtesting {strategy} on {id} over {window}");
            let series = runtime.block_on(source.fetch_series(&id, &window))?;
            let result = backtest::run(&series, amount, strategy, &settings.engine.risk)?;
            print_backtest(&result, series.origin(), json)
        }
        Command::Compare {
            instruments,
            window,
        } => {
            let ids = parse_instrument_ids(&instruments)?;
            let window = window.resolve(today)?;
            eprintln!("Comparing {} instruments over {window}", ids.len());
            let aggregator = ComparisonAggregator::new(&source, settings.engine.risk);
            let result = runtime.block_on(aggregator.compare(&ids, &window))?;
            print_comparison(&result, &settings.engine, json)
        }
        Command::List { search, limit } => {
            let mut instruments = runtime.block_on(source.list_instruments())?;
            if let Some(keyword) = search {
                instruments = search_instruments(instruments, &keyword, limit);
                tracing::debug!(keyword = %keyword, matches = instruments.len(), "filtered instruments");
            }
            print_instruments(&instruments, json)
        }
        Command::CheckConfig => run_check_config(&settings, json),
    }
}

fn single_id(raw: &str) -> Result<String, AnalyticsError> {
    let mut ids = parse_instrument_ids(raw)?;
    match ids.len() {
        1 => Ok(ids.remove(0)),
        n => Err(AnalyticsError::invalid_parameter(
            "instrument",
            format!("expected one instrument, got {n} (use compare for several)"),
        )),
    }
}

/// Start from the configured plan and apply command-line overrides.
pub fn resolve_plan(
    configured: DcaPlan,
    plan: Option<DcaPlan>,
    amount: Option<f64>,
    periods: Option<usize>,
    frequency: Option<Frequency>,
) -> Result<DcaPlan, AnalyticsError> {
    let plan = plan.unwrap_or(DcaPlan {
        contribution_amount: amount.unwrap_or(configured.contribution_amount),
        periods: periods.unwrap_or(configured.periods),
        frequency: frequency.unwrap_or(configured.frequency),
    });
    plan.validate()?;
    Ok(plan)
}

/// From the first contribution to the day before the period after the last
/// one, capped at `today`.
pub fn dca_window(
    start: NaiveDate,
    plan: &DcaPlan,
    today: NaiveDate,
) -> Result<DateWindow, AnalyticsError> {
    let end = plan
        .frequency
        .nth_date(start, plan.periods)
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| {
            AnalyticsError::invalid_parameter("periods", "plan runs past the calendar")
        })?;
    DateWindow::new(start, end.min(today))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AnalyticsError> {
    let out = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    println!("{out}");
    Ok(())
}

fn origin_note(origin: SeriesOrigin) {
    if origin == SeriesOrigin::Synthetic {
        eprintln!("note: results are computed on synthetic prices, not market data");
    }
}

#[derive(Serialize)]
struct AnalyzeReport<'a> {
    #[serde(flatten)]
    analysis: &'a InstrumentAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    drawdown_curve: Option<Vec<DrawdownPoint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    daily_changes: Option<Vec<DailyChange>>,
}

fn run_analyze(
    series: &TimeSeries,
    config: &EngineConfig,
    detail: bool,
    json: bool,
) -> Result<(), AnalyticsError> {
    let analysis = analyze(series, config)?;
    let report = AnalyzeReport {
        analysis: &analysis,
        drawdown_curve: detail.then(|| drawdown_curve(series)),
        daily_changes: detail.then(|| series.daily_changes()),
    };
    if json {
        return print_json(&report);
    }

    let perf = &analysis.performance;
    let risk = &analysis.risk;
    let summary = &analysis.summary;
    println!("=== {} ({}) ===", analysis.display_name, analysis.instrument_id);
    println!(
        "Period:           {} to {} ({} points)",
        summary.start_date, summary.end_date, summary.total_points
    );
    println!(
        "Value:            {:.4} -> {:.4} (high {:.4}, low {:.4})",
        summary.start_value, summary.end_value, summary.max_value, summary.min_value
    );
    println!("Total Return:     {:.2}%", perf.total_return_pct);
    println!("Annualized:       {:.2}%", perf.annualized_return_pct);
    println!("Volatility:       {:.2}%", risk.volatility_pct);
    println!("Max Drawdown:     -{:.2}%", risk.max_drawdown_pct);
    println!("Sharpe Ratio:     {:.2}", risk.sharpe_ratio);
    println!("VaR 95% / 99%:    {:.2}% / {:.2}%", risk.var_95_pct, risk.var_99_pct);
    println!("CVaR 95%:         {:.2}%", risk.cvar_95_pct);
    println!("Downside Dev:     {:.2}%", risk.downside_deviation_pct);
    println!(
        "Risk Level:       {} (score {:.1})",
        analysis.classification.risk_level, analysis.classification.risk_score
    );

    if let (Some(drawdowns), Some(changes)) = (&report.drawdown_curve, &report.daily_changes) {
        println!("\n{:<12} {:>12} {:>10} {:>10}", "date", "value", "change%", "drawdown%");
        for (change, dd) in changes.iter().zip(drawdowns) {
            println!(
                "{:<12} {:>12.4} {:>10.2} {:>10.2}",
                change.date, change.value, change.change_pct, dd.drawdown_pct
            );
        }
    }

    if risk.low_confidence {
        eprintln!(
            "warning: risk figures are low confidence ({} returns, or too few losses for downside figures)",
            risk.sample_size
        );
    }
    origin_note(analysis.origin);
    Ok(())
}

#[derive(Serialize)]
struct DcaReport<'a> {
    instrument_id: &'a str,
    display_name: &'a str,
    origin: SeriesOrigin,
    #[serde(flatten)]
    simulation: &'a DcaSimulation,
}

fn run_dca(
    series: &TimeSeries,
    start: NaiveDate,
    plan: &DcaPlan,
    json: bool,
) -> Result<(), AnalyticsError> {
    let prices = contribution_schedule(series, start, plan.periods, plan.frequency)?;
    let simulation = simulate(&prices, plan)?;
    if json {
        return print_json(&DcaReport {
            instrument_id: series.instrument_id(),
            display_name: series.display_name(),
            origin: series.origin(),
            simulation: &simulation,
        });
    }

    println!("=== DCA: {} ({}) ===", series.display_name(), series.instrument_id());
    println!(
        "{:>4} {:<12} {:>10} {:>12} {:>14} {:>14} {:>9}",
        "#", "date", "price", "units", "invested", "value", "return%"
    );
    for p in &simulation.points {
        println!(
            "{:>4} {:<12} {:>10.4} {:>12.4} {:>14.2} {:>14.2} {:>9.2}",
            p.period_index + 1,
            p.date,
            p.unit_price,
            p.units_purchased,
            p.cumulative_contribution,
            p.market_value,
            p.return_rate_pct
        );
    }

    let s = &simulation.summary;
    println!();
    println!("Total Invested:   {:.2}", s.total_contribution);
    println!("Final Value:      {:.2}", s.final_market_value);
    println!("Total Return:     {:.2} ({:.2}%)", s.total_return, s.total_return_pct);
    println!("Annualized:       {:.2}%", s.annualized_return_pct);
    println!("Price Change:     {:.2}%", s.benchmark_return_pct);
    println!("Lump Sum Value:   {:.2}", s.lump_sum_final_value);
    println!("DCA Advantage:    {:+.2}", s.dca_advantage);
    origin_note(series.origin());
    Ok(())
}

fn print_backtest(
    result: &BacktestResult,
    origin: SeriesOrigin,
    json: bool,
) -> Result<(), AnalyticsError> {
    if json {
        return print_json(result);
    }
    println!("=== Backtest: {} ({}) ===", result.instrument_id, result.strategy);
    println!("Period:           {} to {}", result.start_date, result.end_date);
    println!("Invested:         {:.2}", result.initial_investment);
    println!("Final Value:      {:.2}", result.final_value);
    println!(
        "Total Return:     {:.2} ({:.2}%)",
        result.total_return, result.total_return_pct
    );
    println!("Annualized:       {:.2}%", result.annualized_return_pct);
    println!("Volatility:       {:.2}%", result.volatility_pct);
    println!("Max Drawdown:     -{:.2}%", result.max_drawdown_pct);
    println!("Sharpe Ratio:     {:.2}", result.sharpe_ratio);
    println!("Calmar Ratio:     {:.2}", result.calmar_ratio);
    origin_note(origin);
    Ok(())
}

fn print_comparison(
    result: &ComparisonResult,
    config: &EngineConfig,
    json: bool,
) -> Result<(), AnalyticsError> {
    if json {
        return print_json(result);
    }
    println!("=== Comparison: {} ===", result.window);
    println!(
        "{:<10} {:<28} {:>9} {:>9} {:>9} {:>8} {:<10}",
        "id", "name", "return%", "annual%", "vol%", "maxdd%", "risk"
    );
    for c in &result.per_instrument {
        let level = config.scorer.classify_metrics(&c.risk).risk_level;
        println!(
            "{:<10} {:<28} {:>9.2} {:>9.2} {:>9.2} {:>8.2} {:<10}",
            c.instrument_id,
            c.display_name,
            c.performance.total_return_pct,
            c.performance.annualized_return_pct,
            c.risk.volatility_pct,
            c.risk.max_drawdown_pct,
            level
        );
    }
    println!("\nBest:  {}", result.best_performer_id);
    println!("Worst: {}", result.worst_performer_id);

    for s in &result.skipped {
        eprintln!("warning: skipped {} ({})", s.instrument_id, s.reason);
    }
    if result
        .per_instrument
        .iter()
        .any(|c| c.origin == SeriesOrigin::Synthetic)
    {
        origin_note(SeriesOrigin::Synthetic);
    }
    Ok(())
}

fn print_instruments(instruments: &[InstrumentInfo], json: bool) -> Result<(), AnalyticsError> {
    if json {
        return print_json(&instruments);
    }
    if instruments.is_empty() {
        eprintln!("No instruments found");
        return Ok(());
    }
    for i in instruments {
        println!("{}\t{}", i.instrument_id, i.display_name);
    }
    eprintln!("{} instruments found", instruments.len());
    Ok(())
}

fn run_check_config(settings: &Settings, json: bool) -> Result<(), AnalyticsError> {
    let e = &settings.engine;
    let sim = &settings.simulation;
    if json {
        return print_json(&serde_json::json!({
            "engine": {
                "risk_free_rate": e.risk.risk_free_rate,
                "min_confident_samples": e.risk.min_confident_samples,
            },
            "risk": {
                "volatility_weight": e.scorer.volatility_weight,
                "drawdown_weight": e.scorer.drawdown_weight,
                "low_max": e.scorer.low_max,
                "low_medium_max": e.scorer.low_medium_max,
                "medium_max": e.scorer.medium_max,
            },
            "dca": e.dca,
            "data_dir": settings.data_dir,
            "instruments": settings.names,
            "simulation": {
                "seed": sim.seed,
                "start_value": sim.start_value,
                "annual_drift": sim.annual_drift,
                "annual_volatility": sim.annual_volatility,
            },
        }));
    }

    println!("[engine]     risk_free_rate = {}", e.risk.risk_free_rate);
    println!("             min_confident_samples = {}", e.risk.min_confident_samples);
    println!(
        "[risk]       score = {} x volatility + {} x drawdown",
        e.scorer.volatility_weight, e.scorer.drawdown_weight
    );
    println!(
        "             bands: LOW < {} <= LOW_MEDIUM < {} <= MEDIUM < {} <= HIGH",
        e.scorer.low_max, e.scorer.low_medium_max, e.scorer.medium_max
    );
    println!(
        "[dca]        {} x {} ({})",
        e.dca.contribution_amount, e.dca.periods, e.dca.frequency
    );
    println!("[data]       dir = {}", settings.data_dir.display());
    println!("[instruments] {} configured", settings.names.len());
    println!(
        "[simulation] seed = {}, start = {}, drift = {}, volatility = {}",
        sim.seed, sim.start_value, sim.annual_drift, sim.annual_volatility
    );
    eprintln!("\nConfiguration is valid.");
    Ok(())
}
