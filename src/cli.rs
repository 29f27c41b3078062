//! CLI definition and dispatch.

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::{JsonReportAdapter, STDOUT_PATH};
use crate::domain::allocation::{
    Allocation, AllocationConfig, AllocationTable, AssetCategory, SignalThresholds,
};
use crate::domain::asset_history::AssetHistory;
use crate::domain::backtest::{
    self as backtest_engine, prepare_scenarios, run_scenarios, BacktestConfig, BacktestResult, Scenario,
};
use crate::domain::config_validation::{
    atr_multiplier, momentum_lookback, parse_date, validate_backtest_config, validate_data_config,
    validate_strategy_config, warmup_policy, weighting_scheme, DEFAULT_INITIAL_CAPITAL,
};
use crate::domain::error::QuadtraderError;
use crate::domain::events::{build_event_feed, EventFeedConfig};
use crate::domain::macro_series::MacroInputs;
use crate::domain::metrics::{Metrics, TradeStats};
use crate::domain::momentum::MomentumConfig;
use crate::domain::quadrant::Quadrant;
use crate::domain::regime::RegimeConfig;
use crate::domain::report::{BacktestReport, HistoryReport, SignalsReport};
use crate::domain::signals::generate_signals;
use crate::domain::stop_loss::StopLossConfig;
use crate::domain::strategy::QuadStrategy;
use crate::domain::universe::{load_macro_inputs, parse_symbols, validate_universe};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "quadtrader", about = "Macro quadrant regime signals and backtester")]
pub struct Cli {
    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify the current regime and emit target allocations
    Signals {
        #[arg(short, long)]
        config: PathBuf,
        /// Signal date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Output file, `-` for stdout
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Replay the strategy over the configured date range
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<String>,
        /// Extra config files to run side by side as what-if scenarios
        #[arg(long)]
        scenario: Vec<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Backtest and emit the event feed with month-end performance
    History {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for the universe and macro series
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Signals {
            config,
            as_of,
            output,
        } => run_signals(&config, as_of, output.as_deref()),
        Command::Backtest {
            config,
            output,
            scenario,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_backtest(&config, output.as_deref(), &scenario)
            }
        }
        Command::History { config, output } => run_history(&config, output.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, symbol } => run_info(&config, symbol.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, QuadtraderError> {
    FileConfigAdapter::from_file(path).map_err(|e| QuadtraderError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn get_usize(adapter: &dyn ConfigPort, section: &str, key: &str, default: usize) -> usize {
    usize::try_from(adapter.get_int(section, key, default as i64)).unwrap_or(default)
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, QuadtraderError> {
    Ok(BacktestConfig {
        start_date: parse_date(adapter, "backtest", "start_date")?,
        end_date: parse_date(adapter, "backtest", "end_date")?,
        initial_capital: adapter.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL),
        warmup: warmup_policy(adapter)?,
    })
}

pub fn build_regime_config(adapter: &dyn ConfigPort) -> RegimeConfig {
    let d = RegimeConfig::default();
    RegimeConfig {
        trend_window: get_usize(adapter, "regime", "trend_window", d.trend_window),
        smoothing_window: get_usize(adapter, "regime", "smoothing_window", d.smoothing_window),
        confidence_base: adapter.get_double("regime", "confidence_base", d.confidence_base),
        confidence_scale: adapter.get_double("regime", "confidence_scale", d.confidence_scale),
    }
}

pub fn build_momentum_config(adapter: &dyn ConfigPort) -> MomentumConfig {
    let d = MomentumConfig::default();
    MomentumConfig {
        lookback: usize::try_from(momentum_lookback(adapter)).unwrap_or(d.lookback),
        ema_period: get_usize(adapter, "allocation", "ema_period", d.ema_period),
        vol_lookback: get_usize(adapter, "allocation", "vol_lookback", d.vol_lookback),
    }
}

pub fn build_allocation_config(adapter: &dyn ConfigPort) -> Result<AllocationConfig, QuadtraderError> {
    let d = AllocationConfig::default();
    let t = SignalThresholds::default();
    Ok(AllocationConfig {
        max_positions: get_usize(adapter, "allocation", "max_positions", d.max_positions),
        leverage: adapter.get_double("allocation", "leverage", d.leverage),
        primary_ratio: adapter.get_double("allocation", "primary_ratio", d.primary_ratio),
        weighting: weighting_scheme(adapter)?,
        thresholds: SignalThresholds {
            bullish: adapter.get_double("signals", "bullish_threshold", t.bullish),
            conviction_high: adapter.get_double("signals", "conviction_high", t.conviction_high),
            conviction_medium: adapter.get_double("signals", "conviction_medium", t.conviction_medium),
        },
    })
}

pub fn build_stop_loss_config(adapter: &dyn ConfigPort) -> StopLossConfig {
    let d = StopLossConfig::default();
    StopLossConfig {
        atr_period: get_usize(adapter, "risk", "atr_period", d.atr_period),
        multiplier: atr_multiplier(adapter),
    }
}

/// The standard table with any `[allocation_table]` quadrants and `[categories]` overridden.
pub fn build_allocation_table(adapter: &dyn ConfigPort) -> Result<AllocationTable, QuadtraderError> {
    let mut table = AllocationTable::standard();

    for key in adapter.section_keys("allocation_table") {
        let quadrant: Quadrant = key
            .parse()
            .map_err(|e| QuadtraderError::invalid("allocation_table", &key, e))?;
        let symbols = adapter
            .get_list("allocation_table", &key)
            .into_iter()
            .map(|s| s.to_uppercase())
            .collect();
        table = table.with_quadrant(quadrant, symbols);
    }

    for key in adapter.section_keys("categories") {
        if let Some(raw) = adapter.get_string("categories", &key) {
            let category: AssetCategory = raw
                .parse()
                .map_err(|e| QuadtraderError::invalid("categories", &key, e))?;
            table = table.with_category(&key.to_uppercase(), category);
        }
    }

    Ok(table)
}

pub fn build_strategy(adapter: &dyn ConfigPort) -> Result<QuadStrategy, QuadtraderError> {
    Ok(QuadStrategy::new(
        build_regime_config(adapter),
        build_momentum_config(adapter),
        build_allocation_table(adapter)?,
        build_allocation_config(adapter)?,
        build_stop_loss_config(adapter),
    ))
}

pub fn build_event_feed_config(adapter: &dyn ConfigPort) -> EventFeedConfig {
    let d = EventFeedConfig::default();
    EventFeedConfig {
        entry_threshold: adapter.get_double("history", "entry_threshold", d.entry_threshold),
        exit_threshold: adapter.get_double("history", "exit_threshold", d.exit_threshold),
        reweight_threshold: adapter.get_double("history", "reweight_threshold", d.reweight_threshold),
        sample_every: get_usize(adapter, "history", "sample_every", d.sample_every),
        max_events: get_usize(adapter, "history", "max_events", d.max_events),
    }
}

/// `[universe] symbols` when set, otherwise every symbol the allocation table names.
pub fn resolve_symbols(
    symbol_override: Option<&str>,
    adapter: &dyn ConfigPort,
    table: &AllocationTable,
) -> Result<Vec<String>, QuadtraderError> {
    if let Some(s) = symbol_override {
        return Ok(parse_symbols(s)?);
    }
    match adapter.get_string("universe", "symbols") {
        Some(list) => Ok(parse_symbols(&list)?),
        None => Ok(table.symbols().into_iter().collect()),
    }
}

fn data_port(adapter: &dyn ConfigPort) -> Result<CsvAdapter, QuadtraderError> {
    let path = adapter
        .get_string("data", "path")
        .ok_or_else(|| QuadtraderError::missing("data", "path"))?;
    Ok(CsvAdapter::new(PathBuf::from(path.trim())))
}

/// Prices and macro series through `end_date`, with the strategy's indicators not yet attached.
pub fn load_market_data(
    data_port: &dyn DataPort,
    adapter: &dyn ConfigPort,
    table: &AllocationTable,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<(Vec<AssetHistory>, MacroInputs), QuadtraderError> {
    let symbols = resolve_symbols(None, adapter, table)?;
    eprintln!("Loading {} symbols through {}...", symbols.len(), end_date);

    let validation = validate_universe(data_port, symbols, start_date, end_date)?;
    for skipped in &validation.skipped {
        eprintln!("  {}: no data, skipped", skipped.symbol);
    }
    eprintln!(
        "Loaded {} of {} symbols",
        validation.universe.count(),
        validation.universe.count() + validation.skipped.len()
    );

    let inputs = load_macro_inputs(
        data_port,
        &adapter.get_list("regime", "growth_indicators"),
        &adapter.get_list("regime", "inflation_indicators"),
        end_date,
    )?;

    Ok((validation.assets, inputs))
}

fn output_or_stdout(output: Option<&str>) -> &str {
    output.unwrap_or(STDOUT_PATH)
}

fn report_written(output: &str) {
    if output != STDOUT_PATH {
        eprintln!("\nReport written to: {}", output);
    }
}

fn run_signals(config_path: &Path, as_of: Option<NaiveDate>, output: Option<&str>) -> Result<(), QuadtraderError> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    validate_data_config(&adapter)?;
    validate_strategy_config(&adapter)?;

    let strategy = build_strategy(&adapter)?;
    let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
    let port = data_port(&adapter)?;

    let (assets, inputs) = load_market_data(&port, &adapter, strategy.table(), as_of, as_of)?;
    let assets = strategy.prepare(assets);

    let allocation = generate_signals(&assets, &inputs, &strategy, as_of)?;
    print_signals_summary(&allocation);

    let output = output_or_stdout(output);
    JsonReportAdapter::new().write_signals(&SignalsReport::new(&allocation, Utc::now()), output)?;
    report_written(output);
    Ok(())
}

fn print_signals_summary(allocation: &Allocation) {
    let r = &allocation.regime;
    eprintln!("\n=== Regime as of {} ===", allocation.date);
    eprintln!("Primary:          {} ({} days)", r.primary, r.days_in_regime);
    eprintln!("Secondary:        {}", r.secondary);
    eprintln!("Growth:           {}", r.growth_direction);
    eprintln!("Inflation:        {}", r.inflation_direction);
    eprintln!("Confidence:       {:.2}", r.confidence);
    eprintln!("Total Leverage:   {:.2}", allocation.total_leverage);

    eprintln!("\n=== Targets ===");
    for s in allocation.signals.iter().filter(|s| s.target_allocation > 0.0) {
        eprintln!(
            "  {:<6} {:>6.2}%  {:?} ({:?}, {})",
            s.asset,
            s.target_allocation * 100.0,
            s.signal,
            s.conviction,
            s.quadrant
        );
    }
}

fn print_backtest_summary(result: &BacktestResult, metrics: &Metrics) {
    let trades = TradeStats::compute(&result.trade_log);

    eprintln!("\n=== Backtest Results ===");
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!("Annualized:       {:.2}%", metrics.annual_return * 100.0);
    eprintln!("Sharpe Ratio:     {:.2}", metrics.sharpe);
    eprintln!("Volatility:       {:.2}%", metrics.volatility * 100.0);
    eprintln!(
        "Max Drawdown:     {:.1}% ({} days)",
        metrics.max_drawdown * 100.0,
        metrics.max_drawdown_duration
    );
    eprintln!("Final Value:      {:.2}", metrics.final_value);
    eprintln!("Trading Days:     {}", metrics.trading_days);
    eprintln!(
        "Trades:           {} ({} entries, {} exits, {} stop-outs, {} reweights)",
        trades.total(),
        trades.entries,
        trades.exits,
        trades.stop_outs,
        trades.reweights
    );
    eprintln!("Rebalances:       {}", result.rebalances.len());
}

fn run_backtest(config_path: &Path, output: Option<&str>, scenario_paths: &[PathBuf]) -> Result<(), QuadtraderError> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    validate_data_config(&adapter)?;
    validate_backtest_config(&adapter)?;
    validate_strategy_config(&adapter)?;

    let strategy = build_strategy(&adapter)?;
    let bt_config = build_backtest_config(&adapter)?;

    let mut scenarios = vec![Scenario {
        name: "base".to_string(),
        strategy,
        config: bt_config,
    }];
    for path in scenario_paths {
        eprintln!("Loading scenario from {}", path.display());
        let scenario_adapter = load_config(path)?;
        validate_backtest_config(&scenario_adapter)?;
        validate_strategy_config(&scenario_adapter)?;
        scenarios.push(Scenario {
            name: path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            strategy: build_strategy(&scenario_adapter)?,
            config: build_backtest_config(&scenario_adapter)?,
        });
    }

    let port = data_port(&adapter)?;
    let start = scenarios.iter().map(|s| s.config.start_date).min().unwrap_or(NaiveDate::MIN);
    let end = scenarios.iter().map(|s| s.config.end_date).max().unwrap_or(NaiveDate::MAX);

    // scenarios may name symbols the base table does not
    let mut table = scenarios[0].strategy.table().clone();
    for s in &scenarios[1..] {
        for (q, symbols) in &s.strategy.table().quadrants {
            for symbol in symbols {
                let entry = table.quadrants.entry(*q).or_default();
                if !entry.contains(symbol) {
                    entry.push(symbol.clone());
                }
            }
        }
    }

    let (assets, inputs) = load_market_data(&port, &adapter, &table, start, end)?;
    let assets = prepare_scenarios(assets, &scenarios);

    eprintln!(
        "Running backtest: {} symbols, {} to {}",
        assets.len(),
        scenarios[0].config.start_date,
        scenarios[0].config.end_date
    );

    let mut results = if scenarios.len() == 1 {
        let s = &scenarios[0];
        vec![(s.name.clone(), backtest_engine::run_backtest(&assets, &inputs, &s.strategy, &s.config))]
    } else {
        run_scenarios(&assets, &inputs, &scenarios)
    };

    let (_, base) = results.remove(0);
    let result = base?;
    let metrics = result.metrics();
    print_backtest_summary(&result, &metrics);

    if !results.is_empty() {
        eprintln!("\n=== Scenarios ===");
        eprintln!("  {:<16} {:>9} {:>7} {:>9}", "name", "return", "sharpe", "max dd");
        print_scenario_row("base", &metrics);
        for (name, r) in &results {
            match r {
                Ok(r) => print_scenario_row(name, &r.metrics()),
                Err(e) => eprintln!("  {:<16} error: {}", name, e),
            }
        }
    }

    let output = output_or_stdout(output);
    JsonReportAdapter::new().write_backtest(&BacktestReport::new(&result, Utc::now()), output)?;
    report_written(output);
    Ok(())
}

fn print_scenario_row(name: &str, m: &Metrics) {
    eprintln!(
        "  {:<16} {:>8.2}% {:>7.2} {:>8.2}%",
        name,
        m.total_return * 100.0,
        m.sharpe,
        m.max_drawdown * 100.0
    );
}

fn run_history(config_path: &Path, output: Option<&str>) -> Result<(), QuadtraderError> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    validate_data_config(&adapter)?;
    validate_backtest_config(&adapter)?;
    validate_strategy_config(&adapter)?;

    let strategy = build_strategy(&adapter)?;
    let bt_config = build_backtest_config(&adapter)?;
    let feed_config = build_event_feed_config(&adapter);
    let port = data_port(&adapter)?;

    let (assets, inputs) = load_market_data(
        &port,
        &adapter,
        strategy.table(),
        bt_config.start_date,
        bt_config.end_date,
    )?;
    let assets = strategy.prepare(assets);

    let result = backtest_engine::run_backtest(&assets, &inputs, &strategy, &bt_config)?;
    let metrics = result.metrics();
    print_backtest_summary(&result, &metrics);

    let events = build_event_feed(&result.quadrant_history, &result.weight_history, &feed_config);
    eprintln!("Events:           {}", events.len());

    let output = output_or_stdout(output);
    JsonReportAdapter::new().write_history(&HistoryReport::new(&result, events, Utc::now()), output)?;
    report_written(output);
    Ok(())
}

pub fn run_dry_run(config_path: &Path) -> Result<(), QuadtraderError> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    validate_data_config(&adapter)?;
    validate_backtest_config(&adapter)?;
    validate_strategy_config(&adapter)?;
    eprintln!("Config validated successfully");

    let strategy = build_strategy(&adapter)?;
    let bt_config = build_backtest_config(&adapter)?;

    eprintln!("\nWindow:");
    eprintln!("  {} to {}", bt_config.start_date, bt_config.end_date);
    eprintln!("  initial capital: {:.2}", bt_config.initial_capital);
    eprintln!("  warmup: {:?}", bt_config.warmup);

    eprintln!("\nRegime:");
    eprintln!("  growth: {}", adapter.get_list("regime", "growth_indicators").join(", "));
    eprintln!("  inflation: {}", adapter.get_list("regime", "inflation_indicators").join(", "));
    eprintln!(
        "  trend window: {}, smoothing: {}",
        strategy.regime.config.trend_window, strategy.regime.config.smoothing_window
    );

    let mut indicator_list: Vec<String> = strategy
        .momentum
        .indicator_types()
        .iter()
        .map(|i| i.to_string())
        .collect();
    indicator_list.sort();
    eprintln!("\nIndicators to compute:");
    for ind in &indicator_list {
        eprintln!("  {}", ind);
    }

    eprintln!("\nAllocation table:");
    for q in Quadrant::ALL {
        eprintln!("  {}: {}", q, strategy.table().assets(q).join(", "));
    }

    let symbols = resolve_symbols(None, &adapter, strategy.table())?;
    eprintln!("\nUniverse:");
    eprintln!("  symbols: {}", symbols.join(", "));

    eprintln!("\nDry run complete: configuration is valid");
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), QuadtraderError> {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = load_config(config_path)?;

    validate_data_config(&adapter)?;
    validate_strategy_config(&adapter)?;
    if !adapter.section_keys("backtest").is_empty() {
        validate_backtest_config(&adapter)?;
    }
    // surfaces bad symbol lists
    let table = build_allocation_table(&adapter)?;
    let symbols = resolve_symbols(None, &adapter, &table)?;

    eprintln!(
        "  {} symbols, {} growth / {} inflation indicators",
        symbols.len(),
        adapter.get_list("regime", "growth_indicators").len(),
        adapter.get_list("regime", "inflation_indicators").len()
    );
    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_info(config_path: &Path, symbol: Option<&str>) -> Result<(), QuadtraderError> {
    let adapter = load_config(config_path)?;
    let port = data_port(&adapter)?;
    let table = build_allocation_table(&adapter)?;

    for s in resolve_symbols(symbol, &adapter, &table)? {
        match port.get_data_range(&s) {
            Ok(Some((min_date, max_date, count))) => {
                println!("{}: {} bars, {} to {}", s, count, min_date, max_date);
            }
            Ok(None) => eprintln!("{}: no data found", s),
            Err(e) => eprintln!("error querying {}: {}", s, e),
        }
    }

    if symbol.is_none() {
        let names = adapter
            .get_list("regime", "growth_indicators")
            .into_iter()
            .chain(adapter.get_list("regime", "inflation_indicators"));
        for name in names {
            match port.fetch_macro(&name, NaiveDate::MIN, NaiveDate::MAX) {
                Ok(series) => match (series.readings().first(), series.readings().last()) {
                    (Some(first), Some(last)) => println!(
                        "{}: {} readings, {} to {}",
                        name,
                        series.len(),
                        first.date,
                        last.date
                    ),
                    _ => eprintln!("{}: no readings", name),
                },
                Err(e) => eprintln!("error querying {}: {}", name, e),
            }
        }
    }
    Ok(())
}
