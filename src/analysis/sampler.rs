//! Periodic CPU/memory sampling while a query runs.
//!
//! A [`Sampler`] is started with [`Sampler::spawn`], which hands back a
//! [`RunningSampler`]. The sampling task checks its [`StopToken`] at the top
//! of every window, so the window in flight when [`RunningSampler::stop`] is
//! called always completes. At least one window is taken per run.

use super::probe::ResourceProbe;
use crate::error::{Result, SimError};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceSample {
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

/// Checked by the sampling loop.
#[derive(Debug, Clone)]
pub struct StopToken {
    flag: Arc<AtomicBool>,
}

/// Held by the driver to end sampling.
#[derive(Debug, Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

pub fn stop_pair() -> (StopToken, StopHandle) {
    let flag = Arc::new(AtomicBool::new(false));
    (
        StopToken {
            flag: Arc::clone(&flag),
        },
        StopHandle { flag },
    )
}

impl StopToken {
    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl StopHandle {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Release);
    }
}

/// Per-window readings collected by one sampling run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSeries {
    pub cpu: Vec<f64>,
    pub memory: Vec<f64>,
}

impl SampleSeries {
    pub fn push(&mut self, sample: ResourceSample) {
        self.cpu.push(sample.cpu_percent);
        self.memory.push(sample.memory_percent);
    }

    pub fn len(&self) -> usize {
        self.cpu.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cpu.is_empty()
    }

    /// Mean CPU and memory percentages.
    pub fn averages(&self) -> Result<ResourceSample> {
        Ok(ResourceSample {
            cpu_percent: mean(&self.cpu)?,
            memory_percent: mean(&self.memory)?,
        })
    }
}

fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(SimError::Computation(
            "no completed sampling window to average".to_string(),
        ));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

#[derive(Clone)]
pub struct Sampler {
    probe: Arc<dyn ResourceProbe>,
    interval: Duration,
}

impl Sampler {
    pub fn new(probe: Arc<dyn ResourceProbe>, interval: Duration) -> Self {
        Self { probe, interval }
    }

    /// One window: CPU ticks are diffed across `interval` while memory is read
    /// alongside.
    pub async fn sample(&self) -> Result<ResourceSample> {
        let (cpu, memory) = tokio::join!(self.cpu_window(), self.memory_now());
        Ok(ResourceSample {
            cpu_percent: cpu?,
            memory_percent: memory?,
        })
    }

    /// Probe reads touch the filesystem, so they run on the blocking pool.
    async fn read<T, F>(&self, read: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ResourceProbe) -> io::Result<T> + Send + 'static,
    {
        let probe = Arc::clone(&self.probe);
        let value = tokio::task::spawn_blocking(move || read(probe.as_ref())).await??;
        Ok(value)
    }

    async fn cpu_window(&self) -> Result<f64> {
        let t0 = self.read(|probe| probe.cpu_ticks()).await?;
        tokio::time::sleep(self.interval).await;
        let t1 = self.read(|probe| probe.cpu_ticks()).await?;
        let usage = t1.usage_since(&t0).ok_or_else(|| {
            SimError::Computation("no CPU ticks elapsed during sampling window".to_string())
        })?;
        tracing::debug!(
            "CPU usage is {:.2}% [busy: {}, total: {}]",
            usage,
            (t1.total - t0.total).saturating_sub(t1.idle.saturating_sub(t0.idle)),
            t1.total - t0.total
        );
        Ok(usage)
    }

    async fn memory_now(&self) -> Result<f64> {
        let mem = self.read(|probe| probe.memory()).await?;
        tracing::debug!(
            "Memory total {} used {} cached {} free {}",
            mem.total,
            mem.used,
            mem.cached,
            mem.free
        );
        mem.used_percent()
            .ok_or_else(|| SimError::Computation("memory total is zero".to_string()))
    }

    /// Samples until `token` is stopped. A failed window is logged and dropped.
    pub async fn run(self, token: StopToken) -> SampleSeries {
        tracing::info!("Measure Start");
        let mut series = SampleSeries::default();
        loop {
            match self.sample().await {
                Ok(sample) => series.push(sample),
                Err(e) => tracing::warn!("Sampling window failed: {}", e),
            }
            if token.is_stopped() {
                break;
            }
        }
        tracing::info!("Measure End, {} windows", series.len());
        series
    }

    pub fn spawn(self) -> RunningSampler {
        let (token, handle) = stop_pair();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let series = self.run(token).await;
            // receiver gone means the driver stopped waiting
            let _ = tx.send(series);
        });
        RunningSampler { handle, done: rx }
    }
}

/// A sampling task in flight.
pub struct RunningSampler {
    handle: StopHandle,
    done: oneshot::Receiver<SampleSeries>,
}

impl RunningSampler {
    /// Signals the task and waits for it to report, so no window of this run
    /// can overlap whatever is sampled next.
    pub async fn stop(self) -> Result<SampleSeries> {
        self.handle.stop();
        self.done
            .await
            .map_err(|_| SimError::Computation("sampler ended without reporting".to_string()))
    }
}
