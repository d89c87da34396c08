//! Ordinary least squares via the normal equations.
//!
//! Used for autoregressive fits, Fourier seasonal regressions and the
//! orthogonal-polynomial trend features.

use crate::error::{ForecastError, Result};

/// Fit `y ≈ X β` where `rows` holds one design row per observation.
///
/// A tiny ridge term keeps nearly collinear designs solvable.
///
/// # Example
/// ```
/// use anofox_meta::utils::ols::least_squares;
///
/// // y = 1 + 2x
/// let rows: Vec<Vec<f64>> = (0..5).map(|x| vec![1.0, x as f64]).collect();
/// let y: Vec<f64> = (0..5).map(|x| 1.0 + 2.0 * x as f64).collect();
/// let beta = least_squares(&rows, &y).unwrap();
/// assert!((beta[0] - 1.0).abs() < 1e-6);
/// assert!((beta[1] - 2.0).abs() < 1e-6);
/// ```
pub fn least_squares(rows: &[Vec<f64>], y: &[f64]) -> Result<Vec<f64>> {
    if rows.is_empty() {
        return Err(ForecastError::EmptyData);
    }
    if rows.len() != y.len() {
        return Err(ForecastError::DimensionMismatch {
            expected: rows.len(),
            got: y.len(),
        });
    }
    let k = rows[0].len();
    if k == 0 {
        return Ok(vec![]);
    }
    if rows.iter().any(|r| r.len() != k) {
        return Err(ForecastError::InvalidParameter(
            "design rows have inconsistent lengths".to_string(),
        ));
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, &target) in rows.iter().zip(y) {
        for i in 0..k {
            xty[i] += row[i] * target;
            for j in 0..=i {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            xtx[j][i] = xtx[i][j];
        }
        xtx[i][i] += 1e-10 * (1.0 + xtx[i][i]);
    }

    solve_symmetric(&xtx, &xty).ok_or_else(|| {
        ForecastError::ComputationError(
            "least squares failed: design matrix is not positive definite".to_string(),
        )
    })
}

/// Residuals `y - X β`.
pub fn residuals(rows: &[Vec<f64>], y: &[f64], beta: &[f64]) -> Vec<f64> {
    rows.iter()
        .zip(y)
        .map(|(row, &target)| target - dot(row, beta))
        .collect()
}

/// Plain dot product of two equally long slices.
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Solve `A x = b` for symmetric positive definite `A` (Cholesky).
fn solve_symmetric(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    let mut y = vec![0.0; n];
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[i][j] * y[j]).sum();
        y[i] = (b[i] - sum) / l[i][i];
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| l[j][i] * x[j]).sum();
        x[i] = (y[i] - sum) / l[i][i];
    }

    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn recovers_exact_coefficients() {
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|i| {
                let x = i as f64;
                vec![1.0, x, (x * 0.3).sin()]
            })
            .collect();
        let y: Vec<f64> = rows
            .iter()
            .map(|r| 2.0 - 0.5 * r[1] + 3.0 * r[2])
            .collect();

        let beta = least_squares(&rows, &y).unwrap();
        assert_relative_eq!(beta[0], 2.0, epsilon = 1e-6);
        assert_relative_eq!(beta[1], -0.5, epsilon = 1e-6);
        assert_relative_eq!(beta[2], 3.0, epsilon = 1e-6);

        let res = residuals(&rows, &y, &beta);
        assert!(res.iter().all(|r| r.abs() < 1e-6));
    }

    #[test]
    fn mismatched_lengths() {
        let rows = vec![vec![1.0], vec![1.0]];
        assert_eq!(
            least_squares(&rows, &[1.0]),
            Err(ForecastError::DimensionMismatch {
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn empty_design() {
        assert_eq!(least_squares(&[], &[]), Err(ForecastError::EmptyData));
    }

    #[test]
    fn collinear_design_still_solves() {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, 2.0 * i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| 3.0 * i as f64).collect();
        let beta = least_squares(&rows, &y).unwrap();
        let fitted: Vec<f64> = rows.iter().map(|r| dot(r, &beta)).collect();
        for (f, t) in fitted.iter().zip(&y) {
            assert_relative_eq!(f, t, epsilon = 1e-3);
        }
    }
}
