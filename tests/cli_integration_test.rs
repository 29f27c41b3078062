//! CLI integration tests against real files on disk.
//!
//! Tests cover:
//! - Dry-run validation of an INI config
//! - Backtest, signals and history commands writing JSON reports
//! - What-if scenarios passed alongside the base config
//! - Exit codes for config, data and warmup failures

mod common;

use clap::Parser;
use common::*;
use quadtrader::cli::{self, Cli, Command};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// QQQ rises 100..110 over 2024-01-01..11 and drops to 108.5 on the 12th;
    /// GDP rises and CPI falls, so the regime stays in Q1.
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        fs::create_dir_all(data.join("macro")).unwrap();

        let mut closes = linear_closes(100.0, 1.0, 11);
        closes.push(108.5);
        let mut prices = String::from("date,open,high,low,close,volume\n");
        for bar in bars_from_closes("QQQ", &closes) {
            prices.push_str(&format!(
                "{},{},{},{},{},{}\n",
                bar.date, bar.open, bar.high, bar.low, bar.close, bar.volume
            ));
        }
        fs::write(data.join("QQQ.csv"), prices).unwrap();

        for (name, step) in [("GDP", 1.0), ("CPI", -1.0)] {
            let mut csv = String::from("date,value\n");
            for r in trending_readings(100.0, step, 12) {
                csv.push_str(&format!("{},{}\n", r.date, r.value));
            }
            fs::write(data.join("macro").join(format!("{}.csv", name)), csv).unwrap();
        }

        Workspace { dir }
    }

    fn data_path(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    fn config(&self, name: &str, backtest: &str, stop_multiplier: f64) -> PathBuf {
        let content = format!(
            r#"
[data]
path = {data}

[universe]
symbols = QQQ

[backtest]
{backtest}

[regime]
growth_indicators = GDP
inflation_indicators = CPI
trend_window = 3
smoothing_window = 1

[allocation]
momentum_lookback = 3
ema_period = 0
vol_lookback = 0
leverage = 1.0
primary_ratio = 1.0

[allocation_table]
q1 = QQQ

[risk]
atr_period = 3
stop_loss_atr_multiplier = {stop_multiplier}

[history]
sample_every = 1
"#,
            data = self.data_path().display(),
        );
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn default_config(&self) -> PathBuf {
        self.config(
            "quad.ini",
            "start_date = 2024-01-01\nend_date = 2024-01-12\ninitial_capital = 50000",
            1.0,
        )
    }

    fn output(&self, name: &str) -> PathBuf {
        self.dir.path().join("out").join(name)
    }
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn run(command: Command) -> ExitCode {
    cli::run(Cli {
        verbose: false,
        command,
    })
}

mod dry_run {
    use super::*;

    #[test]
    fn valid_config_passes() {
        let ws = Workspace::new();
        assert!(cli::run_dry_run(&ws.default_config()).is_ok());
    }

    #[test]
    fn reversed_dates_fail() {
        let ws = Workspace::new();
        let path = ws.config("bad.ini", "start_date = 2024-02-01\nend_date = 2024-01-01", 1.0);
        assert!(cli::run_dry_run(&path).is_err());
    }

    #[test]
    fn parsed_from_args() {
        let ws = Workspace::new();
        let config = ws.default_config();
        let parsed = Cli::try_parse_from([
            "quadtrader",
            "backtest",
            "--config",
            config.to_str().unwrap(),
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli::run(parsed), ExitCode::SUCCESS);
    }
}

mod backtest_command {
    use super::*;

    #[test]
    fn writes_backtest_report() {
        let ws = Workspace::new();
        let output = ws.output("backtest.json");

        let code = run(Command::Backtest {
            config: ws.default_config(),
            output: Some(output.display().to_string()),
            scenario: Vec::new(),
            dry_run: false,
        });
        assert_eq!(code, ExitCode::SUCCESS);

        let json = read_json(&output);
        let summary = &json["summary"];
        for key in ["totalReturn", "annualReturn", "sharpe", "maxDrawdown", "finalValue"] {
            assert!(summary.get(key).is_some(), "missing {}", key);
        }
        let perf = json["performance"].as_array().unwrap();
        // classification starts on the third day
        assert_eq!(perf.len(), 10);
        assert_eq!(perf[0]["date"], "2024-01-03");
        assert_eq!(perf[0]["value"], 50000.0);
        assert!(json["generatedAt"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn scenarios_run_alongside_base() {
        let ws = Workspace::new();
        let output = ws.output("backtest.json");
        let no_stops = ws.config(
            "no_stops.ini",
            "start_date = 2024-01-01\nend_date = 2024-01-12\ninitial_capital = 50000",
            0.0,
        );

        let code = run(Command::Backtest {
            config: ws.default_config(),
            output: Some(output.display().to_string()),
            scenario: vec![no_stops],
            dry_run: false,
        });
        assert_eq!(code, ExitCode::SUCCESS);
        assert!(output.exists());
    }

    #[test]
    fn window_before_warmup_exits_5() {
        let ws = Workspace::new();
        let path = ws.config(
            "early.ini",
            "start_date = 2024-01-01\nend_date = 2024-01-02",
            1.0,
        );
        let code = run(Command::Backtest {
            config: path,
            output: Some(ws.output("x.json").display().to_string()),
            scenario: Vec::new(),
            dry_run: false,
        });
        assert_eq!(code, ExitCode::from(5));
    }
}

mod signals_command {
    use super::*;

    #[test]
    fn writes_signals_report() {
        let ws = Workspace::new();
        let output = ws.output("signals.json");

        let code = run(Command::Signals {
            config: ws.default_config(),
            as_of: Some(day(9)),
            output: Some(output.display().to_string()),
        });
        assert_eq!(code, ExitCode::SUCCESS);

        let json = read_json(&output);
        let qqq = &json["signals"][0];
        assert_eq!(qqq["asset"], "QQQ");
        assert_eq!(qqq["signal"], "BULLISH");
        assert_eq!(qqq["conviction"], "high");
        assert_eq!(qqq["targetAllocation"], 1.0);
        assert_eq!(qqq["quadrant"], "Q1");
        assert_eq!(json["regime"]["primaryQuadrant"], "Q1");
        assert_eq!(json["regime"]["daysInRegime"], 8);
        assert_eq!(json["regime"]["lastChange"], "2024-01-03T00:00:00Z");
    }
}

mod history_command {
    use super::*;

    #[test]
    fn writes_event_feed() {
        let ws = Workspace::new();
        let output = ws.output("history.json");

        let code = run(Command::History {
            config: ws.default_config(),
            output: Some(output.display().to_string()),
        });
        assert_eq!(code, ExitCode::SUCCESS);

        let json = read_json(&output);
        let events = json["events"].as_array().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["title"], "Position exited: QQQ");
        assert_eq!(events[0]["date"], "2024-01-12");
        assert_eq!(events[1]["title"], "New position: QQQ added");
        assert_eq!(json["performance"].as_array().unwrap().len(), 1);
    }
}

mod exit_codes {
    use super::*;

    #[test]
    fn missing_config_file_exits_2() {
        let ws = Workspace::new();
        let code = run(Command::Validate {
            config: ws.dir.path().join("nope.ini"),
        });
        assert_eq!(code, ExitCode::from(2));
    }

    #[test]
    fn missing_data_path_exits_2() {
        let ws = Workspace::new();
        let path = ws.dir.path().join("nodata.ini");
        fs::write(&path, "[regime]\ngrowth_indicators = GDP\ninflation_indicators = CPI\n").unwrap();
        let code = run(Command::Validate { config: path });
        assert_eq!(code, ExitCode::from(2));
    }

    #[test]
    fn valid_config_validates() {
        let ws = Workspace::new();
        let code = run(Command::Validate {
            config: ws.default_config(),
        });
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn universe_without_data_exits_3() {
        let ws = Workspace::new();
        fs::remove_file(ws.data_path().join("QQQ.csv")).unwrap();
        let code = run(Command::Backtest {
            config: ws.default_config(),
            output: Some(ws.output("x.json").display().to_string()),
            scenario: Vec::new(),
            dry_run: false,
        });
        assert_eq!(code, ExitCode::from(3));
    }

    #[test]
    fn malformed_prices_exit_3() {
        let ws = Workspace::new();
        fs::write(
            ws.data_path().join("QQQ.csv"),
            "date,open,high,low,close,volume\n2024-01-01,abc,1,1,1,10\n",
        )
        .unwrap();
        let code = run(Command::Backtest {
            config: ws.default_config(),
            output: Some(ws.output("x.json").display().to_string()),
            scenario: Vec::new(),
            dry_run: false,
        });
        assert_eq!(code, ExitCode::from(3));
    }
}
