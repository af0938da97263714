use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// `energy = intercept + cpu * cpu_avg + memory * memory_avg`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyModel {
    pub intercept: f64,
    pub cpu: f64,
    pub memory: f64,
}

impl Default for EnergyModel {
    fn default() -> Self {
        Self {
            intercept: 96.2107,
            cpu: -0.4059,
            memory: -17.2624,
        }
    }
}

impl EnergyModel {
    pub fn estimate(&self, cpu_avg: f64, memory_avg: f64) -> f64 {
        self.intercept + cpu_avg * self.cpu + memory_avg * self.memory
    }

    /// Least-squares fit over `[power, cpu, memory]` triples.
    pub fn fit(samples: &[[f64; 3]]) -> Result<Self> {
        if samples.len() < 3 {
            return Err(SimError::Computation(format!(
                "need at least 3 calibration samples, got {}",
                samples.len()
            )));
        }
        // normal equations (XᵀX)β = Xᵀy with rows x = [1, cpu, memory]
        let mut xtx = [[0.0f64; 3]; 3];
        let mut xty = [0.0f64; 3];
        for [power, cpu, memory] in samples {
            let x = [1.0, *cpu, *memory];
            for i in 0..3 {
                for j in 0..3 {
                    xtx[i][j] += x[i] * x[j];
                }
                xty[i] += x[i] * power;
            }
        }
        let [intercept, cpu, memory] = solve3(xtx, xty).ok_or_else(|| {
            SimError::Computation("calibration samples do not determine a model".to_string())
        })?;
        Ok(Self {
            intercept,
            cpu,
            memory,
        })
    }

    /// Fits a model from a headerless CSV of `power,cpu,memory` lines.
    pub fn fit_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_path(path)?;
        let mut samples = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.len() < 3 {
                return Err(SimError::Computation(format!(
                    "calibration line has {} values, expected 3",
                    record.len()
                )));
            }
            let mut triple = [0.0f64; 3];
            for (slot, field) in triple.iter_mut().zip(record.iter()) {
                *slot = field.parse().map_err(|_| {
                    SimError::Computation(format!("bad calibration value '{field}'"))
                })?;
            }
            samples.push(triple);
        }
        let model = Self::fit(&samples)?;
        tracing::info!(
            "Calibrated energy model from {} samples: {:?}",
            samples.len(),
            model
        );
        Ok(model)
    }
}

/// Gaussian elimination with partial pivoting.
fn solve3(mut a: [[f64; 3]; 3], mut b: [f64; 3]) -> Option<[f64; 3]> {
    for col in 0..3 {
        let pivot = (col..3).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..3 {
            let factor = a[row][col] / a[col][col];
            for k in col..3 {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = [0.0f64; 3];
    for row in (0..3).rev() {
        let tail: f64 = (row + 1..3).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_formula() {
        let model = EnergyModel::default();
        let energy = model.estimate(50.0, 50.0);
        assert!((energy - (96.2107 - 20.295 - 863.12)).abs() < 1e-9);
        assert!((energy - (-787.2043)).abs() < 1e-9);
    }

    #[test]
    fn test_fit_recovers_coefficients() {
        let truth = EnergyModel {
            intercept: 10.0,
            cpu: 2.0,
            memory: -3.0,
        };
        let points = [(0.0, 0.0), (10.0, 5.0), (20.0, 1.0), (5.0, 30.0), (50.0, 50.0)];
        let samples: Vec<[f64; 3]> = points
            .iter()
            .map(|&(cpu, mem)| [truth.estimate(cpu, mem), cpu, mem])
            .collect();
        let fitted = EnergyModel::fit(&samples).unwrap();
        assert!((fitted.intercept - 10.0).abs() < 1e-6);
        assert!((fitted.cpu - 2.0).abs() < 1e-6);
        assert!((fitted.memory + 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_fit_rejects_degenerate_input() {
        assert!(EnergyModel::fit(&[[1.0, 1.0, 1.0]]).is_err());
        // memory always equals cpu: the system is singular
        let samples = [[1.0, 1.0, 1.0], [2.0, 2.0, 2.0], [3.0, 3.0, 3.0]];
        assert!(matches!(
            EnergyModel::fit(&samples),
            Err(SimError::Computation(_))
        ));
    }

    #[test]
    fn test_fit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.csv");
        std::fs::write(&path, "10,0,0\n28,1,4\n14, 2, 0\n18,0,2\n").unwrap();
        let model = EnergyModel::fit_file(&path).unwrap();
        assert!((model.intercept - 10.0).abs() < 1e-6);
        assert!((model.cpu - 2.0).abs() < 1e-6);
        assert!((model.memory - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_fit_file_short_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.csv");
        std::fs::write(&path, "10,0\n").unwrap();
        assert!(EnergyModel::fit_file(&path).is_err());
    }
}
