use std::path::PathBuf;
use std::sync::Once;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use serde::Serialize;
use stackbind_core::{State, StateConfig, StatsSnapshot};

mod scenarios;

use scenarios::{SCENARIOS, Scenario};

static TRACE_INIT: Once = Once::new();
const DEFAULT_TRACE_FILTER: &str = "stackbind=debug,stackbind::vm=info";

#[derive(Debug, Parser)]
#[command(name = "stackbind", author, version, about = "Runs stackbind composition scenarios", long_about = None)]
struct CliArgs {
    #[command(subcommand)]
    command: Commands,

    /// State configuration (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print primitive counters after each scenario
    #[arg(long, global = true)]
    stats: bool,

    /// Print each scenario as one JSON object
    #[arg(long, global = true)]
    json: bool,

    /// Log to stderr; STACKBIND_TRACE may hold a filter
    #[arg(long, global = true)]
    trace: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run scenarios in the given order
    Run {
        #[arg(value_name = "SCENARIO", required = true, value_parser = parse_scenario)]
        scenarios: Vec<&'static Scenario>,
    },
    /// List the available scenarios
    List,
}

fn parse_scenario(raw: &str) -> Result<&'static Scenario, String> {
    scenarios::find(raw).ok_or_else(|| {
        let names: Vec<_> = SCENARIOS.iter().map(|s| s.name).collect();
        format!("unknown scenario '{raw}' (expected one of: {})", names.join(", "))
    })
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    scenario: &'a str,
    output: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<StatsSnapshot>,
}

/// `--trace` or a non-empty `STACKBIND_TRACE` turns logging on. A value
/// other than `1` is used as the filter, then `RUST_LOG`, then the default.
fn filter_expr_from(raw: Option<&str>) -> Option<String> {
    match raw.map(str::trim) {
        None | Some("") | Some("1") => None,
        Some(expr) => Some(expr.to_owned()),
    }
}

fn maybe_init_tracing(flag: bool) {
    let raw = std::env::var("STACKBIND_TRACE").ok();
    if !flag && raw.as_deref().is_none_or(|v| v.trim().is_empty()) {
        return;
    }
    TRACE_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        use tracing_subscriber::fmt;

        let filter_expr = filter_expr_from(raw.as_deref()).or_else(|| std::env::var("RUST_LOG").ok());
        let builder = fmt().with_writer(std::io::stderr);
        let builder = match filter_expr.and_then(|expr| EnvFilter::try_new(expr).ok()) {
            Some(filter) => builder.with_env_filter(filter),
            None => builder.with_env_filter(DEFAULT_TRACE_FILTER),
        };
        let _ = builder.try_init();
    });
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<StateConfig> {
    match path {
        Some(path) => {
            StateConfig::load(path).with_context(|| format!("failed to load config '{}'", path.display()))
        }
        None => Ok(StateConfig::default()),
    }
}

fn run_scenario(scenario: &Scenario, config: &StateConfig, with_stats: bool) -> anyhow::Result<Report<'static>> {
    let state = State::with_config(config.clone());
    let output = state
        .run(|ctx| {
            stackbind_stdlib::open_all(ctx)?;
            state.reset_stats();
            (scenario.run)(ctx)
        })
        .with_context(|| format!("scenario '{}' failed", scenario.name))?;
    Ok(Report {
        scenario: scenario.name,
        output,
        stats: with_stats.then(|| state.stats()),
    })
}

/// Non-zero counters, one `name: count` per line.
fn format_stats(stats: &StatsSnapshot) -> anyhow::Result<Vec<String>> {
    let value = serde_json::to_value(stats)?;
    let lines = value
        .as_object()
        .into_iter()
        .flatten()
        .filter(|(_, count)| count.as_u64().is_some_and(|n| n > 0))
        .map(|(name, count)| format!("  {name}: {count}"))
        .collect();
    Ok(lines)
}

fn main() -> anyhow::Result<()> {
    let CliArgs {
        command,
        config,
        stats,
        json,
        trace,
    } = CliArgs::parse();
    maybe_init_tracing(trace);

    match command {
        Commands::List => {
            for s in &SCENARIOS {
                println!("{:<8} {}", s.name, s.about);
            }
        }
        Commands::Run { scenarios } => {
            let config = load_config(config.as_ref())?;
            for scenario in scenarios {
                let report = run_scenario(scenario, &config, stats)?;
                if json {
                    println!("{}", serde_json::to_string(&report)?);
                    continue;
                }
                println!("== {} ==", report.scenario);
                for line in &report.output {
                    println!("{line}");
                }
                if let Some(snapshot) = &report.stats {
                    println!("stats:");
                    for line in format_stats(snapshot)? {
                        println!("{line}");
                    }
                }
            }
        }
    }
    Ok(())
}
