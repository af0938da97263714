//! OS data sources for the sampler.
//!
//! The kernel exposes aggregate CPU tick counters on the `cpu` line of
//! `/proc/stat` and memory counters in `/proc/meminfo`. Both are read through
//! the [`ResourceProbe`] trait so the sampler can run against fixed readings.

use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuTicks {
    pub idle: u64,
    pub total: u64,
}

impl CpuTicks {
    /// Busy share of the ticks elapsed since `earlier`, in percent.
    /// `None` when no ticks elapsed.
    pub fn usage_since(&self, earlier: &CpuTicks) -> Option<f64> {
        let total = self.total.checked_sub(earlier.total)? as f64;
        let idle = self.idle.checked_sub(earlier.idle)? as f64;
        if total <= 0.0 {
            return None;
        }
        Some(100.0 * (total - idle) / total)
    }
}

/// Memory counters in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryReading {
    pub total: u64,
    pub used: u64,
    pub cached: u64,
    pub free: u64,
}

impl MemoryReading {
    pub fn used_percent(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(100.0 * self.used as f64 / self.total as f64)
    }
}

pub trait ResourceProbe: Send + Sync {
    fn cpu_ticks(&self) -> io::Result<CpuTicks>;
    fn memory(&self) -> io::Result<MemoryReading>;
}

/// Reads `/proc/stat` and `/proc/meminfo` (or the configured replacements).
#[derive(Debug, Clone)]
pub struct ProcProbe {
    stat_path: PathBuf,
    meminfo_path: PathBuf,
}

impl ProcProbe {
    pub fn new(stat_path: impl Into<PathBuf>, meminfo_path: impl Into<PathBuf>) -> Self {
        Self {
            stat_path: stat_path.into(),
            meminfo_path: meminfo_path.into(),
        }
    }
}

impl Default for ProcProbe {
    fn default() -> Self {
        Self::new("/proc/stat", "/proc/meminfo")
    }
}

impl ResourceProbe for ProcProbe {
    fn cpu_ticks(&self) -> io::Result<CpuTicks> {
        let contents = std::fs::read_to_string(&self.stat_path)?;
        parse_cpu_ticks(&contents).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("no cpu line in {}", self.stat_path.display()),
            )
        })
    }

    fn memory(&self) -> io::Result<MemoryReading> {
        let contents = std::fs::read_to_string(&self.meminfo_path)?;
        parse_meminfo(&contents).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("no MemTotal in {}", self.meminfo_path.display()),
            )
        })
    }
}

/// Sums every counter on the aggregate `cpu` line; the fourth counter is idle.
pub fn parse_cpu_ticks(contents: &str) -> Option<CpuTicks> {
    let line = contents
        .lines()
        .find(|line| line.split_whitespace().next() == Some("cpu"))?;
    let mut ticks = CpuTicks::default();
    for (i, field) in line.split_whitespace().enumerate().skip(1) {
        let Ok(value) = field.parse::<u64>() else {
            tracing::warn!("Bad tick counter {} at field {}", field, i);
            continue;
        };
        ticks.total += value;
        if i == 4 {
            ticks.idle = value;
        }
    }
    Some(ticks)
}

/// `used = total - free - buffers - cached`, with reclaimable slab counted as cache.
pub fn parse_meminfo(contents: &str) -> Option<MemoryReading> {
    let mut total = None;
    let (mut free, mut buffers, mut cached, mut reclaimable) = (0u64, 0u64, 0u64, 0u64);
    for line in contents.lines() {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(value) = value.parse::<u64>() else {
            continue;
        };
        let bytes = match parts.next() {
            Some("kB") => value * 1024,
            _ => value,
        };
        match key {
            "MemTotal:" => total = Some(bytes),
            "MemFree:" => free = bytes,
            "Buffers:" => buffers = bytes,
            "Cached:" => cached = bytes,
            "SReclaimable:" => reclaimable = bytes,
            _ => {}
        }
    }
    let total = total?;
    let cached = cached + reclaimable;
    let used = total.saturating_sub(free + buffers + cached);
    Some(MemoryReading {
        total,
        used,
        cached,
        free,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_usage_window() {
        let t0 = CpuTicks {
            idle: 100,
            total: 1000,
        };
        let t1 = CpuTicks {
            idle: 150,
            total: 1300,
        };
        let usage = t1.usage_since(&t0).unwrap();
        assert!((usage - 250.0 / 3.0).abs() < 1e-9);
        assert!((usage - 83.333_333).abs() < 1e-5);
    }

    #[test]
    fn test_usage_without_elapsed_ticks() {
        let t = CpuTicks {
            idle: 1,
            total: 10,
        };
        assert_eq!(t.usage_since(&t), None);
    }

    #[test]
    fn test_parse_cpu_line() {
        let stat = "cpu  10 20 30 400 5 0 0 0 0 0\ncpu0 1 2 3 4 0 0 0 0 0 0\nintr 1 2\n";
        let ticks = parse_cpu_ticks(stat).unwrap();
        assert_eq!(ticks.idle, 400);
        assert_eq!(ticks.total, 465);
        assert_eq!(parse_cpu_ticks("intr 1 2\n"), None);
    }

    #[test]
    fn test_parse_meminfo() {
        let meminfo = "\
MemTotal:       1000 kB
MemFree:         200 kB
MemAvailable:    600 kB
Buffers:          50 kB
Cached:          100 kB
SReclaimable:     50 kB
";
        let mem = parse_meminfo(meminfo).unwrap();
        assert_eq!(mem.total, 1000 * 1024);
        assert_eq!(mem.used, 600 * 1024);
        assert_eq!(mem.cached, 150 * 1024);
        assert!((mem.used_percent().unwrap() - 60.0).abs() < 1e-9);
        assert_eq!(parse_meminfo("MemFree: 1 kB\n"), None);
    }

    #[test]
    fn test_proc_probe_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let stat = dir.path().join("stat");
        let meminfo = dir.path().join("meminfo");
        std::fs::write(&stat, "cpu 1 1 1 7\n").unwrap();
        std::fs::write(&meminfo, "MemTotal: 4 kB\nMemFree: 1 kB\n").unwrap();
        let probe = ProcProbe::new(&stat, &meminfo);
        assert_eq!(
            probe.cpu_ticks().unwrap(),
            CpuTicks {
                idle: 7,
                total: 10
            }
        );
        assert_eq!(probe.memory().unwrap().used, 3 * 1024);
    }
}
