pub mod analysis;
pub mod catalog;
pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod query;
pub mod storage;

use analysis::{EnergyModel, ProcProbe};
use catalog::Catalog;
use clap::Parser;
use config::SimConfig;
use driver::{BatchReport, Simulator};
use error::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const BENCHMARK_QUERIES: [&str; 4] = [
    "SELECT C_NAME, C_ADDRESS, C_PHONE, C_CUSTKEY FROM customer WHERE C_CUSTKEY=525",
    "SELECT L_ORDERKEY, L_QUANITITY FROM lineitem WHERE L_ORDERKEY=3",
    "SELECT PS_PARTKEY, PS_SUPPKEY FROM partsupp",
    "SELECT O_ORDERKEY, O_CUSTKEY FROM orders WHERE O_ORDERSTATUS=O",
];

/// Computational storage query simulator
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding <table>.csv files
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Query to run; may be given more than once
    #[arg(long = "query", value_name = "SQL")]
    queries: Vec<String>,

    /// File with one query per line
    #[arg(long, value_name = "FILE")]
    queries_file: Option<PathBuf>,

    /// Sampling window length in milliseconds
    #[arg(long, value_name = "MS")]
    interval_ms: Option<u64>,

    /// CSV of `power,cpu,memory` samples to fit the energy model from
    #[arg(long, value_name = "CSV")]
    calibration: Option<PathBuf>,

    /// Print the batch report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimConfig::load_from_file(path)?,
        None => SimConfig::default(),
    };
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(ms) = args.interval_ms {
        config.sample_interval_ms = ms;
    }
    if let Some(path) = &args.calibration {
        config.energy = EnergyModel::fit_file(path)?;
    }
    config.validate()?;

    let catalog = match &config.schema_file {
        Some(path) => Catalog::load_from_file(path)?,
        None => Catalog::builtin(),
    };

    let queries = collect_queries(&args)?;
    tracing::info!(
        "Running {} queries against {}",
        queries.len(),
        config.data_dir.display()
    );

    let probe = Arc::new(ProcProbe::new(&config.stat_path, &config.meminfo_path));
    let simulator = Simulator::new(&config, Arc::new(catalog), probe)?;
    let report = simulator.run_batch(&queries).await;

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!("Failed to encode report: {}", e),
        }
    } else {
        print_report(&report);
    }
    Ok(())
}

fn collect_queries(args: &Args) -> Result<Vec<String>> {
    let mut queries = args.queries.clone();
    if let Some(path) = &args.queries_file {
        queries.extend(read_queries_file(path)?);
    }
    if queries.is_empty() {
        queries = BENCHMARK_QUERIES.iter().map(|q| q.to_string()).collect();
    }
    Ok(queries)
}

/// Blank lines and lines starting with `#` are skipped.
fn read_queries_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect())
}

fn print_report(report: &BatchReport) {
    for c in &report.comparisons {
        println!("{}", c.query);
        println!(
            "  rows: {}  elapsed: {:.3}s  cpu: {:.2}%  memory: {:.2}%  energy: {:.2}",
            c.result.data.values.len(),
            c.record.elapsed_seconds,
            c.record.cpu_avg,
            c.record.memory_avg,
            c.record.energy_estimate
        );
        if let Some(watts) = c.record.measured_watts {
            println!("  measured power: {:.2} W", watts);
        }
        println!(
            "  Query Performance: {:.2}%  CPU resource savings: {:.2}%  Energy resource savings: {:.2}%",
            c.savings.latency, c.savings.cpu, c.savings.energy
        );
    }
    for f in &report.failures {
        println!("{}", f.query);
        println!("  failed: {}", f.error);
    }
    let s = &report.summary;
    println!(
        "{} queries, {} succeeded, {} failed",
        s.query_count, s.succeeded, s.failed
    );
    println!(
        "mean Query Performance: {:.2}%  CPU resource savings: {:.2}%  Energy resource savings: {:.2}%",
        s.mean_savings.latency, s.mean_savings.cpu, s.mean_savings.energy
    );
}
