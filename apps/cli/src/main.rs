#![deny(warnings)]

//! Headless CLI for running backtests, animating playback and managing presets.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use persistence::{is_memory_url, SqlitePresetStore};
use sim_core::{
    builtin_scenarios, validate_parameters, AnnualPoint, Granularity, KpiSummary, ParameterSet,
    PresetId, ProjectionPoint,
};
use sim_runtime::{BacktestConfig, BacktestSession, Notice};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "backtest",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_SHA"), ")"),
    about = "Economic backtest for the land-lease marketplace"
)]
struct Cli {
    /// YAML file with runtime settings (seed, speed, database).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Seed for the growth jitter stream.
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// Preset database URL.
    #[arg(long, global = true)]
    db: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the 60-month projection and print KPIs.
    Run {
        #[command(flatten)]
        source: ParamSource,
        #[arg(long, value_enum, default_value_t = View::Monthly)]
        granularity: View,
        /// Write the monthly history as JSON to this file or directory.
        #[arg(long)]
        export: Option<PathBuf>,
        /// Write the annual roll-up as JSON to this file.
        #[arg(long)]
        export_annual: Option<PathBuf>,
    },
    /// Reveal the monthly projection one tick at a time.
    Play {
        #[command(flatten)]
        source: ParamSource,
        /// Tick interval in milliseconds.
        #[arg(long)]
        speed_ms: Option<u64>,
        /// Pause once the cursor reaches this month (1-based).
        #[arg(long)]
        until: Option<usize>,
    },
    /// List the built-in scenarios.
    Scenarios,
    /// Manage stored presets.
    Presets {
        #[command(subcommand)]
        action: PresetAction,
    },
}

#[derive(Subcommand, Debug)]
enum PresetAction {
    List,
    Save {
        #[arg(long)]
        name: String,
        #[command(flatten)]
        source: ParamSource,
    },
    Delete {
        #[arg(long)]
        id: i64,
    },
}

#[derive(Args, Debug, Default)]
struct ParamSource {
    /// Built-in scenario name.
    #[arg(long, conflicts_with_all = ["params", "preset"])]
    scenario: Option<String>,
    /// YAML or JSON parameter file.
    #[arg(long, conflicts_with = "preset")]
    params: Option<PathBuf>,
    /// Stored preset id.
    #[arg(long)]
    preset: Option<i64>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum View {
    Monthly,
    Annual,
}

impl From<View> for Granularity {
    fn from(value: View) -> Self {
        match value {
            View::Monthly => Granularity::Monthly,
            View::Annual => Granularity::Annual,
        }
    }
}

fn load_config(cli: &Cli) -> Result<BacktestConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_yaml::from_str(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => BacktestConfig::default(),
    };
    if cli.seed.is_some() {
        config.rng_seed = cli.seed;
    }
    if let Some(db) = &cli.db {
        config.database_url = db.clone();
    }
    Ok(config)
}

fn load_params_file(path: &Path) -> Result<ParameterSet> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let params: ParameterSet = if is_json {
        serde_json::from_str(&text).with_context(|| format!("invalid parameters {}", path.display()))?
    } else {
        serde_yaml::from_str(&text).with_context(|| format!("invalid parameters {}", path.display()))?
    };
    Ok(params)
}

async fn open_store(config: &BacktestConfig) -> Result<SqlitePresetStore> {
    let url = config.database_url.as_str();
    if !is_memory_url(url) {
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"));
        if let Some(parent) = path.and_then(|p| Path::new(p).parent()) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    SqlitePresetStore::connect(url).await
}

fn check(notice: Notice) -> Result<()> {
    match notice {
        Notice::Success(msg) => {
            info!("{msg}");
            Ok(())
        }
        Notice::Error(msg) => bail!(msg),
    }
}

/// Build a session whose parameters come from `source`.
async fn session_for(config: &BacktestConfig, source: &ParamSource) -> Result<BacktestSession> {
    let mut session = BacktestSession::new(config.clone(), ParameterSet::default());
    if let Some(name) = &source.scenario {
        check(session.load_scenario(name))?;
    } else if let Some(path) = &source.params {
        session.set_parameters(load_params_file(path)?);
    } else if let Some(id) = source.preset {
        let store = open_store(config).await?;
        check(session.refresh_presets(&store).await)?;
        check(session.load_preset(PresetId(id)))?;
    }
    for problem in validate_parameters(session.parameters()) {
        warn!(%problem, "questionable parameter");
    }
    Ok(session)
}

fn money(v: f64) -> String {
    if v.is_nan() {
        return "n/a".into();
    }
    if v.is_infinite() {
        return if v > 0.0 { "∞".into() } else { "-∞".into() };
    }
    let cents = (v.abs() * 100.0).round() as u128;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if v < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}${grouped}.{:02}", cents % 100)
}

fn ratio(v: f64) -> String {
    if v.is_nan() {
        "n/a".into()
    } else if v.is_infinite() {
        "∞".into()
    } else {
        format!("{v:.2}x")
    }
}

fn print_kpis(name: &str, k: &KpiSummary) {
    println!(
        "KPI | {} | CAC: {} | LTV: {} | LTV:CAC: {} | ARPU: {} | margin: {:.1}% | break-even: {}",
        name,
        money(k.cac),
        money(k.ltv),
        ratio(k.ratio),
        money(k.arpu),
        k.gross_margin * 100.0,
        k.break_even_label()
    );
}

fn month_row(p: &ProjectionPoint) -> String {
    format!(
        "{:>5} | {:>9} | {:>14} | {:>14} | {:>14} | {:>14} | {:>14}",
        p.month,
        p.users,
        money(p.revenue),
        money(p.subscription_revenue),
        money(p.service_fee_revenue),
        money(p.costs),
        money(p.profit)
    )
}

fn year_row(p: &AnnualPoint) -> String {
    format!(
        "{:>5} | {:>9} | {:>14} | {:>14} | {:>14} | {:>14} | {:>14}",
        p.year,
        p.users,
        money(p.revenue),
        money(p.subscription_revenue),
        money(p.service_fee_revenue),
        money(p.costs),
        money(p.profit)
    )
}

fn print_header(first: &str) {
    println!(
        "{:>5} | {:>9} | {:>14} | {:>14} | {:>14} | {:>14} | {:>14}",
        first, "users", "revenue", "subscriptions", "service fees", "costs", "profit"
    );
}

async fn run(config: &BacktestConfig, command: Command) -> Result<()> {
    match command {
        Command::Run {
            source,
            granularity,
            export,
            export_annual,
        } => {
            let mut session = session_for(config, &source).await?;
            session.set_granularity(granularity.into());
            print_kpis(&session.parameters().name, session.kpis());
            match granularity {
                View::Monthly => {
                    print_header("month");
                    session.history().iter().for_each(|p| println!("{}", month_row(p)));
                }
                View::Annual => {
                    print_header("year");
                    session.annual().iter().for_each(|p| println!("{}", year_row(p)));
                }
            }
            if let Some(path) = export {
                let path = if path.is_dir() {
                    path.join(data_pipeline::export_file_name(&session.parameters().name))
                } else {
                    path
                };
                data_pipeline::write_history_json(&path, session.history())?;
                println!("Exported {} months to {}", session.history().len(), path.display());
            }
            if let Some(path) = export_annual {
                let json = data_pipeline::export_annual_json(session.annual())?;
                std::fs::write(&path, json)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                println!("Exported {} years to {}", session.annual().len(), path.display());
            }
        }
        Command::Play {
            source,
            speed_ms,
            until,
        } => {
            let mut session = session_for(config, &source).await?;
            if let Some(speed) = speed_ms {
                session.playback_mut().set_speed(speed);
            }
            print_kpis(&session.parameters().name, session.kpis());
            print_header("month");
            if let Some(p) = session.current_point() {
                println!("{}", month_row(p));
            }
            let stop_at = until.map(|m| m.saturating_sub(1));
            if stop_at.map_or(true, |m| session.playback().current_month() < m) {
                session.playback_mut().start();
            }
            while let Some(cursor) = session.playback_mut().next_tick().await {
                if let Some(p) = session.history().get(cursor) {
                    println!("{}", month_row(p));
                }
                if stop_at.is_some_and(|m| cursor >= m) {
                    session.playback_mut().pause();
                }
            }
            println!(
                "Cumulative profit through month {}: {}",
                session.playback().current_month() + 1,
                money(session.cumulative_profit_at_cursor())
            );
        }
        Command::Scenarios => {
            for s in builtin_scenarios() {
                println!(
                    "{:<22} users {:>6} | growth {:>5.1}% | churn {:>4.1}% | volatility {:>4.1}%",
                    s.name, s.initial_users, s.user_growth_rate, s.churn_rate, s.market_volatility
                );
            }
        }
        Command::Presets { action } => {
            let store = open_store(config).await?;
            let mut session = BacktestSession::new(config.clone(), ParameterSet::default());
            match action {
                PresetAction::List => {
                    check(session.refresh_presets(&store).await)?;
                    for p in session.presets() {
                        println!("{:>4} | {:<24} | {}", p.id, p.name, p.created_at.to_rfc3339());
                    }
                }
                PresetAction::Save { name, source } => {
                    let mut loaded = session_for(config, &source).await?;
                    check(loaded.save_preset(&store, &name).await)?;
                    println!("Saved preset {name:?}");
                }
                PresetAction::Delete { id } => {
                    check(session.delete_preset(&store, PresetId(id)).await)?;
                    println!("Deleted preset {id}");
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    info!(seed = ?config.rng_seed, db = %config.database_url, "starting backtest CLI");
    run(&config, cli.command).await
}
