use crate::error::{Result, SimError};
use tokio::process::Command;

/// Runs an external power tool (e.g. `turbostat --Summary -i 1 -n 1 -s PkgWatt`)
/// and reads the average package power it prints.
#[derive(Debug, Clone)]
pub struct PowerMeter {
    argv: Vec<String>,
}

impl PowerMeter {
    pub fn new(argv: Vec<String>) -> Result<Self> {
        if argv.is_empty() {
            return Err(SimError::Config("power command is empty".to_string()));
        }
        Ok(Self { argv })
    }

    pub async fn read_watts(&self) -> Result<f64> {
        let output = Command::new(&self.argv[0])
            .args(&self.argv[1..])
            .output()
            .await?;
        if !output.status.success() {
            return Err(SimError::Power(format!(
                "'{}' exited with {}",
                self.argv[0], output.status
            )));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let watts = parse_watts(&stdout)
            .ok_or_else(|| SimError::Power(format!("no watt value in output: {stdout:?}")))?;
        tracing::debug!("Package power {} W", watts);
        Ok(watts)
    }
}

/// The value is the first number on the last non-empty line; header lines such
/// as `PkgWatt` come before it.
pub fn parse_watts(output: &str) -> Option<f64> {
    output
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())?
        .split_whitespace()
        .next()?
        .parse()
        .ok()
}
