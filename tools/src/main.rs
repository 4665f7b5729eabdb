//! pipeline-runner: headless batch runner for the sales pipeline.
//!
//! Usage:
//!   pipeline-runner --input data/transactions.csv --db data/pipeline.db
//!   pipeline-runner run --config pipeline.json --mode checkpointed
//!   pipeline-runner report --db data/pipeline.db

use anyhow::{bail, Result};
use salespipe_core::{
    aggregation::{CommissionRecord, MonthlyTotal, RetailerSales},
    config::PipelineConfig,
    pipeline::{Pipeline, RunSummary},
    store::{PipelineStore, RunRecord, SaveMode},
};
use std::env;
use std::path::Path;
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run,
    Report,
}

#[derive(serde::Serialize)]
struct Report {
    agents: Vec<CommissionRecord>,
    retailers: Vec<RetailerSales>,
    monthly_sales: Vec<MonthlyTotal>,
    runs: Vec<RunRecord>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let result = parse_command(&args).and_then(|command| {
        let config = load_config(&args)?;
        match command {
            Command::Run => run_pipeline(config),
            Command::Report => run_report(&config),
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// The first argument picks the subcommand; a bare flag list means `run`.
fn parse_command(args: &[String]) -> Result<Command> {
    match args.get(1).map(String::as_str) {
        None | Some("run") => Ok(Command::Run),
        Some("report") => Ok(Command::Report),
        Some(flag) if flag.starts_with("--") => Ok(Command::Run),
        Some(other) => bail!("unknown command '{other}' (expected 'run' or 'report')"),
    }
}

fn load_config(args: &[String]) -> Result<PipelineConfig> {
    let mut config = match flag_value(args, "--config") {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(input) = flag_value(args, "--input") {
        config = config.with_input(input);
    }
    if let Some(db) = flag_value(args, "--db") {
        config.db_path = db.to_string();
    }
    if let Some(mode) = flag_value(args, "--mode") {
        config = config.with_save_mode(mode.parse::<SaveMode>()?);
    }
    Ok(config)
}

fn open_store(db: &str) -> Result<PipelineStore> {
    if let Some(parent) = Path::new(db).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let store = PipelineStore::open(db)?;
    store.migrate()?;
    Ok(store)
}

fn run_pipeline(config: PipelineConfig) -> Result<()> {
    println!("Sales pipeline runner");
    println!("  input: {}", config.input_path.display());
    println!("  db:    {}", config.db_path);
    println!("  mode:  {:?}", config.save_mode);
    println!();

    let store = open_store(&config.db_path)?;
    let mut pipeline = Pipeline::with_generated_id(config, store);
    let summary = pipeline.run()?;
    print_summary(&summary);
    Ok(())
}

fn run_report(config: &PipelineConfig) -> Result<()> {
    if !Path::new(&config.db_path).is_file() {
        bail!("no pipeline database at {}", config.db_path);
    }
    let store = PipelineStore::open_read_only(&config.db_path)?;
    let report = Report {
        agents: store.all_commissions()?,
        retailers: store.all_retailer_sales()?,
        monthly_sales: store.monthly_report()?,
        runs: store.runs().all()?,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let agg = &summary.aggregation;

    println!("--- Sales by Agent ---");
    for s in &agg.sales_by_agent {
        println!("  {:<12} {}", s.agent_id, s.total_sales);
    }
    println!();
    println!("--- Sales by Retailer ---");
    for s in &agg.sales_by_retailer {
        println!("  {:<12} {}", s.retailer_id, s.total_sales);
    }
    println!();
    println!("--- Monthly Totals ---");
    for m in &agg.monthly_totals {
        println!("  {:<12} {}", m.month.to_string(), m.total_sales);
    }
    println!();
    println!("--- Commissions ---");
    for c in &agg.commissions {
        println!(
            "  {:<12} sales {} | rate {} | commission {}",
            c.agent_id, c.total_sales, c.commission_rate, c.commission_amount
        );
    }
    println!();
    println!("=== RUN SUMMARY ===");
    println!("  run_id:            {}", summary.run_id);
    println!("  source:            {}", summary.source);
    println!("  accepted rows:     {}", summary.accepted_rows);
    println!("  rejected rows:     {}", summary.rejected.len());
    println!("  agents created:    {}", summary.saved.agents_created);
    println!("  retailers created: {}", summary.saved.retailers_created);
    println!("  transactions:      {}", summary.saved.transactions_inserted);
    println!("  commissions:       {}", summary.saved.commissions_written);
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("pipeline-runner")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn bare_flags_and_run_select_the_pipeline() {
        assert_eq!(parse_command(&args(&[])).unwrap(), Command::Run);
        assert_eq!(parse_command(&args(&["run", "--mode", "atomic"])).unwrap(), Command::Run);
        assert_eq!(parse_command(&args(&["--input", "feed.csv"])).unwrap(), Command::Run);
        assert_eq!(parse_command(&args(&["report", "--db", "x.db"])).unwrap(), Command::Report);
    }

    #[test]
    fn mistyped_command_is_refused() {
        assert!(parse_command(&args(&["reprot"])).is_err());
        assert!(parse_command(&args(&["feed.csv"])).is_err());
    }

    #[test]
    fn report_never_creates_a_database() {
        let dir = std::env::temp_dir().join(format!("pipeline-runner-report-{}", std::process::id()));
        let db = dir.join("absent.db");
        let config = PipelineConfig {
            db_path: db.display().to_string(),
            ..PipelineConfig::default()
        };
        assert!(run_report(&config).is_err());
        assert!(!db.exists(), "report must not create the database file");
        assert!(!dir.exists(), "report must not create the parent directory");
    }
}
