//! Feature standardization and L1-regularized linear regression.

use kt_types::{engine_error, TuneResult};

/// Per-column standardization to zero mean and unit (population) variance.
/// Constant columns are centred but not scaled.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>]) -> TuneResult<Self> {
        let width = check_rectangular(rows)?;
        let n = rows.len().max(1) as f64;
        let mut means = vec![0.0; width];
        for row in rows {
            for (m, x) in means.iter_mut().zip(row) {
                *m += x / n;
            }
        }
        let mut scales = vec![0.0; width];
        for row in rows {
            for ((s, x), m) in scales.iter_mut().zip(row).zip(&means) {
                *s += (x - m).powi(2) / n;
            }
        }
        for s in scales.iter_mut() {
            *s = if *s > 0.0 { s.sqrt() } else { 1.0 };
        }
        Ok(Self { means, scales })
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|row| {
                row.iter()
                    .zip(self.means.iter().zip(&self.scales))
                    .map(|(x, (m, s))| (x - m) / s)
                    .collect()
            })
            .collect()
    }

    pub fn fit_transform(rows: &[Vec<f64>]) -> TuneResult<Vec<Vec<f64>>> {
        Ok(Self::fit(rows)?.transform(rows))
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }
}

/// Lasso regression fitted by cyclic coordinate descent.
///
/// Minimizes `(1 / 2n) ‖y − Xw − b‖² + α‖w‖₁` with an unpenalized intercept.
#[derive(Debug, Clone, PartialEq)]
pub struct Lasso {
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
    coef: Vec<f64>,
    intercept: f64,
}

impl Default for Lasso {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Lasso {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            max_iter: 1000,
            tol: 1e-4,
            coef: Vec::new(),
            intercept: 0.0,
        }
    }

    pub fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> TuneResult<&Self> {
        let width = check_rectangular(x)?;
        if x.len() != y.len() {
            return Err(engine_error!(
                "regression got {} samples but {} targets",
                x.len(),
                y.len()
            ));
        }
        self.coef = vec![0.0; width];
        self.intercept = 0.0;
        if x.is_empty() {
            return Ok(self);
        }

        let n = x.len() as f64;
        let x_mean: Vec<f64> = (0..width)
            .map(|j| x.iter().map(|row| row[j]).sum::<f64>() / n)
            .collect();
        let y_mean = y.iter().sum::<f64>() / n;
        let xc: Vec<Vec<f64>> = x
            .iter()
            .map(|row| row.iter().zip(&x_mean).map(|(v, m)| v - m).collect())
            .collect();
        let col_sq: Vec<f64> = (0..width)
            .map(|j| xc.iter().map(|row| row[j] * row[j]).sum::<f64>() / n)
            .collect();
        // Residual r = y_c − Xc·w, starting from w = 0.
        let mut residual: Vec<f64> = y.iter().map(|v| v - y_mean).collect();

        for _ in 0..self.max_iter {
            let mut max_delta: f64 = 0.0;
            let mut max_coef: f64 = 0.0;
            for j in 0..width {
                if col_sq[j] == 0.0 {
                    continue;
                }
                let old = self.coef[j];
                let rho: f64 = xc
                    .iter()
                    .zip(&residual)
                    .map(|(row, r)| row[j] * (r + row[j] * old))
                    .sum::<f64>()
                    / n;
                let new = soft_threshold(rho, self.alpha) / col_sq[j];
                if new != old {
                    for (row, r) in xc.iter().zip(residual.iter_mut()) {
                        *r -= row[j] * (new - old);
                    }
                    self.coef[j] = new;
                }
                max_delta = max_delta.max((new - old).abs());
                max_coef = max_coef.max(new.abs());
            }
            if max_delta <= self.tol * max_coef.max(1.0) {
                break;
            }
        }

        self.intercept = y_mean
            - self
                .coef
                .iter()
                .zip(&x_mean)
                .map(|(w, m)| w * m)
                .sum::<f64>();
        Ok(self)
    }

    pub fn coef(&self) -> &[f64] {
        &self.coef
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        self.intercept + row.iter().zip(&self.coef).map(|(x, w)| x * w).sum::<f64>()
    }
}

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

fn check_rectangular(rows: &[Vec<f64>]) -> TuneResult<usize> {
    let width = rows.first().map_or(0, Vec::len);
    if let Some(bad) = rows.iter().position(|row| row.len() != width) {
        return Err(engine_error!(
            "sample {bad} has {} features, expected {width}",
            rows[bad].len()
        ));
    }
    Ok(width)
}
