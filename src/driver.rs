//! Batch runner pairing each measured (CSD) query cost with a synthesized
//! host-side (SSD) cost.
//!
//! Queries run one at a time. For each one a sampler is spawned, the pipeline
//! runs on a blocking thread, and the sampler is stopped and drained before the
//! next query starts, so sampling windows never span two queries.

use crate::analysis::{EnergyModel, PowerMeter, ResourceProbe, Sampler};
use crate::catalog::Catalog;
use crate::config::{SimConfig, SsdOffsets};
use crate::error::Result;
use crate::executor::{Executor, Response};
use crate::storage::Scanner;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Measured cost of one query on the simulated device path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryCostRecord {
    pub query: String,
    pub cpu_avg: f64,
    pub memory_avg: f64,
    pub energy_estimate: f64,
    pub elapsed_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measured_watts: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathCost {
    pub cpu: f64,
    pub energy: f64,
    pub elapsed_seconds: f64,
}

impl PathCost {
    pub fn measured(record: &QueryCostRecord) -> Self {
        Self {
            cpu: record.cpu_avg,
            energy: record.energy_estimate,
            elapsed_seconds: record.elapsed_seconds,
        }
    }

    pub fn with_overhead(&self, offsets: &SsdOffsets) -> Self {
        Self {
            cpu: self.cpu + offsets.cpu,
            energy: self.energy + offsets.energy,
            elapsed_seconds: self.elapsed_seconds + offsets.latency_secs,
        }
    }
}

/// Percentages comparing the two paths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Savings {
    /// ssd latency / csd latency
    pub latency: f64,
    /// csd cpu / ssd cpu
    pub cpu: f64,
    /// csd energy / ssd energy
    pub energy: f64,
}

impl Savings {
    pub fn between(csd: &PathCost, ssd: &PathCost) -> Self {
        Self {
            latency: percent(ssd.elapsed_seconds, csd.elapsed_seconds),
            cpu: percent(csd.cpu, ssd.cpu),
            energy: percent(csd.energy, ssd.energy),
        }
    }
}

fn percent(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        tracing::warn!("Ratio {} / 0 reported as 0%", numerator);
        return 0.0;
    }
    numerator / denominator * 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryComparison {
    pub query: String,
    pub record: QueryCostRecord,
    pub csd: PathCost,
    pub ssd: PathCost,
    pub savings: Savings,
    pub result: Response,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryFailure {
    pub query: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub query_count: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub mean_savings: Savings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub comparisons: Vec<QueryComparison>,
    pub failures: Vec<QueryFailure>,
    pub summary: BatchSummary,
}

impl BatchReport {
    pub fn new(comparisons: Vec<QueryComparison>, failures: Vec<QueryFailure>) -> Self {
        let n = comparisons.len();
        let mean = |f: fn(&Savings) -> f64| {
            if n == 0 {
                0.0
            } else {
                comparisons.iter().map(|c| f(&c.savings)).sum::<f64>() / n as f64
            }
        };
        let mean_savings = Savings {
            latency: mean(|s| s.latency),
            cpu: mean(|s| s.cpu),
            energy: mean(|s| s.energy),
        };
        let summary = BatchSummary {
            query_count: n + failures.len(),
            succeeded: n,
            failed: failures.len(),
            mean_savings,
        };
        Self {
            comparisons,
            failures,
            summary,
        }
    }
}

pub struct Simulator {
    executor: Executor,
    sampler: Sampler,
    energy: EnergyModel,
    offsets: SsdOffsets,
    power: Option<PowerMeter>,
}

impl Simulator {
    pub fn new(config: &SimConfig, catalog: Arc<Catalog>, probe: Arc<dyn ResourceProbe>) -> Result<Self> {
        config.validate()?;
        let power = config
            .power_command
            .clone()
            .map(PowerMeter::new)
            .transpose()?;
        Ok(Self {
            executor: Executor::new(catalog, Scanner::new(&config.data_dir)),
            sampler: Sampler::new(probe, config.sample_interval()),
            energy: config.energy,
            offsets: config.offsets,
            power,
        })
    }

    /// Runs one query under measurement. Grammar errors fail before sampling
    /// starts; an empty sample series fails after it stops.
    pub async fn run_query(&self, query: &str) -> Result<QueryComparison> {
        let parsed = self.executor.prepare(query)?;

        let running = self.sampler.clone().spawn();
        let start = Instant::now();
        let executor = self.executor.clone();
        let pipeline = tokio::task::spawn_blocking(move || {
            let response = executor.execute(&parsed);
            (response, start.elapsed().as_secs_f64())
        });
        let power = async {
            match &self.power {
                Some(meter) => match meter.read_watts().await {
                    Ok(watts) => Some(watts),
                    Err(e) => {
                        tracing::warn!("Power reading failed: {}", e);
                        None
                    }
                },
                None => None,
            }
        };
        let (outcome, measured_watts) = tokio::join!(pipeline, power);
        // stop sampling before reporting any pipeline failure
        let series = running.stop().await;
        let (result, elapsed_seconds) = outcome?;
        let averages = series?.averages()?;

        let record = QueryCostRecord {
            query: query.to_string(),
            cpu_avg: averages.cpu_percent,
            memory_avg: averages.memory_percent,
            energy_estimate: self
                .energy
                .estimate(averages.cpu_percent, averages.memory_percent),
            elapsed_seconds,
            measured_watts,
        };
        Ok(self.compare(record, result))
    }

    pub fn compare(&self, record: QueryCostRecord, result: Response) -> QueryComparison {
        let csd = PathCost::measured(&record);
        let ssd = csd.with_overhead(&self.offsets);
        let savings = Savings::between(&csd, &ssd);
        tracing::info!(
            "Query: {} | Query Performance: {:.2}% | CPU resource savings: {:.2}% | Energy resource savings: {:.2}%",
            record.query,
            savings.latency,
            savings.cpu,
            savings.energy
        );
        QueryComparison {
            query: record.query.clone(),
            record,
            csd,
            ssd,
            savings,
            result,
        }
    }

    /// Failed queries are recorded and the batch moves on.
    pub async fn run_batch(&self, queries: &[String]) -> BatchReport {
        let mut comparisons = Vec::with_capacity(queries.len());
        let mut failures = Vec::new();
        for query in queries {
            match self.run_query(query).await {
                Ok(comparison) => comparisons.push(comparison),
                Err(e) => {
                    tracing::warn!("Query failed: {} ({})", query, e);
                    failures.push(QueryFailure {
                        query: query.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        tracing::info!("Simulation Query Count {}", queries.len());
        BatchReport::new(comparisons, failures)
    }
}
