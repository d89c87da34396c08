//! Derivative-free optimization used for smoothing-parameter estimation.

/// Result of Nelder-Mead optimization.
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    /// The optimal point found.
    pub optimal_point: Vec<f64>,
    /// The objective function value at the optimal point.
    pub optimal_value: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Whether the simplex collapsed below the tolerance.
    pub converged: bool,
}

/// Configuration for Nelder-Mead optimization.
#[derive(Debug, Clone)]
pub struct NelderMeadConfig {
    /// Maximum number of iterations.
    pub max_iter: usize,
    /// Convergence tolerance on the spread of objective values.
    pub tolerance: f64,
    /// Initial simplex step, relative to the magnitude of each coordinate.
    pub initial_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tolerance: 1e-8,
            initial_step: 0.05,
        }
    }
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Minimize `objective` with the Nelder-Mead simplex method.
///
/// Points are clamped to `bounds` (one `(min, max)` pair per coordinate)
/// before every evaluation. Non-finite objective values are treated as
/// `f64::MAX` so infeasible regions are simply avoided.
///
/// # Example
/// ```
/// use anofox_meta::utils::optimization::{nelder_mead, NelderMeadConfig};
///
/// let result = nelder_mead(
///     |x| (x[0] - 2.0).powi(2) + (x[1] - 3.0).powi(2),
///     &[0.0, 0.0],
///     None,
///     &NelderMeadConfig::default(),
/// );
///
/// assert!((result.optimal_point[0] - 2.0).abs() < 0.01);
/// assert!((result.optimal_point[1] - 3.0).abs() < 0.01);
/// ```
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: &NelderMeadConfig,
) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    let n = initial.len();
    let eval = |x: &[f64]| {
        let v = objective(x);
        if v.is_finite() {
            v
        } else {
            f64::MAX
        }
    };

    if n == 0 {
        return NelderMeadResult {
            optimal_point: vec![],
            optimal_value: eval(&[]),
            iterations: 0,
            converged: true,
        };
    }

    let start = clamp(initial, bounds);
    let mut simplex = vec![start.clone()];
    for i in 0..n {
        let mut vertex = start.clone();
        let step = if vertex[i].abs() > 1e-10 {
            config.initial_step * vertex[i].abs()
        } else {
            config.initial_step
        };
        vertex[i] += step;
        let mut vertex = clamp(&vertex, bounds);
        // A vertex clamped back onto the start point degenerates the simplex.
        if (vertex[i] - start[i]).abs() < 1e-12 {
            vertex[i] = start[i] - step;
            vertex = clamp(&vertex, bounds);
        }
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();

    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        iterations += 1;

        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        let (best, second_worst, worst) = (order[0], order[n - 1], order[n]);

        if (values[worst] - values[best]).abs() < config.tolerance {
            converged = true;
            break;
        }

        let centroid: Vec<f64> = (0..n)
            .map(|j| {
                simplex
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != worst)
                    .map(|(_, v)| v[j])
                    .sum::<f64>()
                    / n as f64
            })
            .collect();

        let reflected = clamp(&towards(&centroid, &simplex[worst], -REFLECT), bounds);
        let reflected_value = eval(&reflected);

        if reflected_value < values[best] {
            let expanded = clamp(&towards(&centroid, &reflected, EXPAND), bounds);
            let expanded_value = eval(&expanded);
            if expanded_value < reflected_value {
                simplex[worst] = expanded;
                values[worst] = expanded_value;
            } else {
                simplex[worst] = reflected;
                values[worst] = reflected_value;
            }
            continue;
        }

        if reflected_value < values[second_worst] {
            simplex[worst] = reflected;
            values[worst] = reflected_value;
            continue;
        }

        let (target, target_value) = if reflected_value < values[worst] {
            (reflected.clone(), reflected_value)
        } else {
            (simplex[worst].clone(), values[worst])
        };
        let contracted = clamp(&towards(&centroid, &target, CONTRACT), bounds);
        let contracted_value = eval(&contracted);
        if contracted_value < target_value {
            simplex[worst] = contracted;
            values[worst] = contracted_value;
            continue;
        }

        let anchor = simplex[best].clone();
        for i in 0..=n {
            if i != best {
                let shrunk = clamp(&towards(&anchor, &simplex[i], SHRINK), bounds);
                values[i] = eval(&shrunk);
                simplex[i] = shrunk;
            }
        }
    }

    let best = (0..=n)
        .min_by(|&a, &b| values[a].total_cmp(&values[b]))
        .unwrap_or(0);

    NelderMeadResult {
        optimal_point: simplex[best].clone(),
        optimal_value: values[best],
        iterations,
        converged,
    }
}

/// Point `origin + t * (point - origin)`.
fn towards(origin: &[f64], point: &[f64], t: f64) -> Vec<f64> {
    origin
        .iter()
        .zip(point)
        .map(|(o, p)| o + t * (p - o))
        .collect()
}

fn clamp(point: &[f64], bounds: Option<&[(f64, f64)]>) -> Vec<f64> {
    match bounds {
        None => point.to_vec(),
        Some(b) => point
            .iter()
            .enumerate()
            .map(|(i, &x)| match b.get(i) {
                Some(&(lo, hi)) => x.clamp(lo, hi),
                None => x,
            })
            .collect(),
    }
}
