//! Least-squares polynomial trend of the national electricity emission factor.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{InventoryError, Result};
use crate::reference::ReferenceData;

/// Polynomial fitted to `(year, t CO2/MWh)` pairs.
///
/// Years are mapped onto [-1, 1] before fitting so that the normal equations
/// stay well conditioned for cubic terms of four-digit years.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElectricityTrend {
    /// Coefficients in the scaled abscissa, lowest order first.
    coefficients: Vec<f64>,
    first_year: i32,
    last_year: i32,
}

impl ElectricityTrend {
    /// Fits a polynomial of `degree` through `history`.
    ///
    /// At least `min_points` distinct years are required, and never fewer
    /// than `degree + 1` or two, since the years must span an interval.
    ///
    /// # Errors
    ///
    /// `InsufficientTrendData` with too few years, `DivisionBasis` if the
    /// normal equations are singular.
    pub fn fit(history: &[(i32, f64)], degree: usize, min_points: usize) -> Result<Self> {
        let years: BTreeSet<i32> = history.iter().map(|(y, _)| *y).collect();
        let required = min_points.max(degree + 1).max(2);
        if years.len() < required {
            return Err(InventoryError::InsufficientTrendData {
                points: years.len(),
                required,
            });
        }
        let (Some(&first_year), Some(&last_year)) = (years.first(), years.last()) else {
            return Err(InventoryError::InsufficientTrendData {
                points: 0,
                required,
            });
        };

        let n = degree + 1;
        let mut matrix = vec![vec![0.0; n + 1]; n];
        for &(year, factor) in history {
            let t = scale(year, first_year, last_year);
            let powers: Vec<f64> = (0..2 * n).map(|k| t.powi(k as i32)).collect();
            for (j, row) in matrix.iter_mut().enumerate() {
                for (k, cell) in row.iter_mut().take(n).enumerate() {
                    *cell += powers[j + k];
                }
                row[n] += factor * powers[j];
            }
        }
        let coefficients = solve(matrix)?;
        debug!(?coefficients, first_year, last_year, "fitted electricity factor trend");
        Ok(Self {
            coefficients,
            first_year,
            last_year,
        })
    }

    /// Fits the reference table's electricity history.
    pub fn from_reference(reference: &ReferenceData, degree: usize, min_points: usize) -> Result<Self> {
        Self::fit(&reference.electricity_history(), degree, min_points)
    }

    /// Raw polynomial value at `year`.
    pub fn evaluate(&self, year: i32) -> f64 {
        let t = scale(year, self.first_year, self.last_year);
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, c| acc * t + c)
    }

    /// Emission factor at `year`, clamped at zero.
    pub fn factor_at(&self, year: i32) -> f64 {
        let value = self.evaluate(year);
        if value < 0.0 {
            warn!(year, value, "electricity factor trend is negative, clamping to 0");
            return 0.0;
        }
        value
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }
}

fn scale(year: i32, first: i32, last: i32) -> f64 {
    let mid = f64::from(first + last) / 2.0;
    let half = f64::from(last - first) / 2.0;
    (f64::from(year) - mid) / half
}

/// Gaussian elimination with partial pivoting on an augmented matrix.
fn solve(mut m: Vec<Vec<f64>>) -> Result<Vec<f64>> {
    let n = m.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))
            .unwrap_or(col);
        if m[pivot][col].abs() < 1e-12 {
            return Err(InventoryError::DivisionBasis(
                "trend normal equations".to_string(),
            ));
        }
        m.swap(col, pivot);
        for row in col + 1..n {
            let f = m[row][col] / m[col][col];
            for k in col..=n {
                m[row][k] -= f * m[col][k];
            }
        }
    }
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| m[row][k] * x[k]).sum();
        x[row] = (m[row][n] - tail) / m[row][row];
    }
    Ok(x)
}
