//! Active-set non-negative least squares (Lawson-Hanson): minimize
//! `||v - A x||^2` over `x >= 0`.
//!
//! Chosen over a quasi-Newton (L-BFGS-B) approach because it terminates in
//! finitely many steps for a fixed-size problem, which makes it easier to
//! pin down with exact tests. The iteration cap and tolerances are exposed
//! through [`NnlsConfig`] so callers and tests can tighten them.
use ndarray::{Array1, Array2};

/// Construction-time tunables for [`solve_nnls`].
#[derive(Debug, Clone, Copy)]
pub struct NnlsConfig {
    pub max_iterations: usize,
    pub gradient_tolerance: f64,
    pub relative_objective_tolerance: f64,
}

impl Default for NnlsConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            gradient_tolerance: 1e-10,
            relative_objective_tolerance: 1e-12,
        }
    }
}

/// Outcome of a solve: the best-effort `x`, whether it actually converged,
/// and how many outer iterations it took.
#[derive(Debug, Clone)]
pub struct NnlsSolution {
    pub x: Array1<f64>,
    pub converged: bool,
    pub iterations: usize,
    pub cancelled: bool,
}

/// Solve `min ||v - A x||^2` s.t. `x >= 0` with the Lawson-Hanson active-set
/// method, checking `is_cancelled` once per outer iteration so long-running
/// batch fits can be aborted cooperatively.
///
/// `A` is `M x k`, `v` is length `M`; the returned `x` has length `k`.
pub fn solve_nnls(
    a: &Array2<f64>,
    v: &Array1<f64>,
    config: NnlsConfig,
    mut is_cancelled: impl FnMut() -> bool,
) -> NnlsSolution {
    let k = a.ncols();
    let mut x = Array1::<f64>::zeros(k);

    // Active set bookkeeping: `passive` holds the indices currently allowed
    // to be nonzero (the "P" set in Lawson-Hanson terminology).
    let mut passive: Vec<usize> = Vec::new();
    let mut bound: Vec<bool> = vec![true; k]; // true = forced to zero ("R" / bound set)

    let at = a.t().to_owned();
    let at_a = at.dot(a);
    let at_v = at.dot(v);

    let mut gradient = compute_negative_gradient(&at_a, &at_v, &x); // this is A^T(v - Ax)
    let mut iterations = 0usize;
    let mut prev_objective = objective(a, v, &x);

    loop {
        if is_cancelled() {
            return NnlsSolution {
                x,
                converged: false,
                iterations,
                cancelled: true,
            };
        }
        if iterations >= config.max_iterations {
            return NnlsSolution {
                x,
                converged: false,
                iterations,
                cancelled: false,
            };
        }

        // Find the bound index with the most positive gradient (steepest
        // ascent direction for bringing a variable into the passive set).
        let candidate = bound
            .iter()
            .enumerate()
            .filter(|(_, &is_bound)| is_bound)
            .map(|(i, _)| (i, gradient[i]))
            .filter(|&(_, g)| g > config.gradient_tolerance)
            .max_by(|a, b| a.1.total_cmp(&b.1));

        let Some((enter, _)) = candidate else {
            // All bound variables have non-positive gradient: KKT satisfied.
            return NnlsSolution {
                x,
                converged: true,
                iterations,
                cancelled: false,
            };
        };

        bound[enter] = false;
        passive.push(enter);

        // Inner loop: solve the unconstrained least squares problem over the
        // passive set, backing off any variable that goes negative, until
        // the passive solution is itself non-negative.
        loop {
            let z = solve_passive_least_squares(&at_a, &at_v, &passive);

            if passive.iter().zip(z.iter()).all(|(_, &zi)| zi >= 0.0) {
                for (&idx, &zi) in passive.iter().zip(z.iter()) {
                    x[idx] = zi;
                }
                break;
            }

            // Find the step length that keeps every passive variable >= 0.
            let mut alpha = f64::INFINITY;
            for (&idx, &zi) in passive.iter().zip(z.iter()) {
                if zi < 0.0 {
                    let xi = x[idx];
                    let step = xi / (xi - zi);
                    if step < alpha {
                        alpha = step;
                    }
                }
            }
            if !alpha.is_finite() {
                alpha = 0.0;
            }

            for (&idx, &zi) in passive.iter().zip(z.iter()) {
                x[idx] += alpha * (zi - x[idx]);
            }

            // Move every passive variable that's now ~0 back to the bound set.
            passive.retain(|&idx| {
                let keep = x[idx] > 1e-12;
                if !keep {
                    x[idx] = 0.0;
                    bound[idx] = true;
                }
                keep
            });

            if passive.is_empty() {
                break;
            }
        }

        gradient = compute_negative_gradient(&at_a, &at_v, &x);
        let objective_now = objective(a, v, &x);
        iterations += 1;

        let relative_change = if prev_objective.abs() > 0.0 {
            (prev_objective - objective_now).abs() / prev_objective.abs()
        } else {
            0.0
        };
        prev_objective = objective_now;

        let grad_norm = bound
            .iter()
            .enumerate()
            .filter(|(_, &is_bound)| is_bound)
            .map(|(i, _)| gradient[i].max(0.0))
            .fold(0.0_f64, f64::max);

        if grad_norm <= config.gradient_tolerance
            || relative_change <= config.relative_objective_tolerance
        {
            return NnlsSolution {
                x,
                converged: true,
                iterations,
                cancelled: false,
            };
        }
    }
}

/// `A^T (v - A x)`: the ascent direction used by the active-set selection
/// rule, i.e. `-1/2` of the minimization gradient `-2 A^T(v - Ax)`.
fn compute_negative_gradient(at_a: &Array2<f64>, at_v: &Array1<f64>, x: &Array1<f64>) -> Array1<f64> {
    at_v - &at_a.dot(x)
}

fn objective(a: &Array2<f64>, v: &Array1<f64>, x: &Array1<f64>) -> f64 {
    let residual = v - &a.dot(x);
    residual.dot(&residual)
}

/// Solve the unconstrained least squares problem restricted to `passive`
/// columns via the normal equations on the precomputed `A^T A` / `A^T v`.
/// Problem sizes here are tiny (at most `n+1` tracer isotopologues), so a
/// direct Gauss-Jordan solve on the passive submatrix is simpler and just as
/// fast as anything more sophisticated.
fn solve_passive_least_squares(at_a: &Array2<f64>, at_v: &Array1<f64>, passive: &[usize]) -> Vec<f64> {
    let k = passive.len();
    let mut m = vec![vec![0.0; k + 1]; k];
    for (row, &i) in passive.iter().enumerate() {
        for (col, &j) in passive.iter().enumerate() {
            m[row][col] = at_a[[i, j]];
        }
        m[row][k] = at_v[i];
    }

    gauss_jordan_solve(&mut m)
}

fn gauss_jordan_solve(m: &mut [Vec<f64>]) -> Vec<f64> {
    let k = m.len();
    for col in 0..k {
        // Partial pivot.
        let mut pivot_row = col;
        let mut pivot_val = m[col][col].abs();
        for row in (col + 1)..k {
            if m[row][col].abs() > pivot_val {
                pivot_row = row;
                pivot_val = m[row][col].abs();
            }
        }
        if pivot_val < 1e-14 {
            continue; // singular in this column; leave the variable at 0.
        }
        m.swap(col, pivot_row);

        let pivot = m[col][col];
        for value in m[col].iter_mut() {
            *value /= pivot;
        }
        for row in 0..k {
            if row == col {
                continue;
            }
            let factor = m[row][col];
            if factor == 0.0 {
                continue;
            }
            for c in 0..=k {
                m[row][c] -= factor * m[col][c];
            }
        }
    }
    m.iter().map(|row| row[k]).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::array;

    #[test]
    fn solves_simple_identity_system() {
        let a = Array2::eye(3);
        let v = array![1.0, 0.0, 0.0];
        let result = solve_nnls(&a, &v, NnlsConfig::default(), || false);
        assert!(result.converged);
        for (i, &xi) in result.x.iter().enumerate() {
            let expected = if i == 0 { 1.0 } else { 0.0 };
            assert!((xi - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn enforces_non_negativity_against_negative_target() {
        // The unconstrained LS solution for this system has a negative
        // component; NNLS must clamp it to zero.
        let a = array![[1.0, 1.0], [0.0, 1.0]];
        let v = array![1.0, -1.0];
        let result = solve_nnls(&a, &v, NnlsConfig::default(), || false);
        assert!(result.converged);
        for &xi in result.x.iter() {
            assert!(xi >= -1e-9);
        }
    }

    #[test]
    fn stationarity_holds_at_solution() {
        let a = array![[1.0, 0.2, 0.0], [0.1, 1.0, 0.2], [0.0, 0.1, 1.0]];
        let v = array![1.0, 0.2, 0.0];
        let result = solve_nnls(&a, &v, NnlsConfig::default(), || false);
        assert!(result.converged);

        let at = a.t().to_owned();
        let residual = &v - &a.dot(&result.x);
        let gradient = at.dot(&residual) * -2.0; // minimization gradient: -2 A^T(v - Ax)

        for (i, &xi) in result.x.iter().enumerate() {
            if xi > 1e-8 {
                assert!(gradient[i].abs() < 1e-6, "stationarity violated at {i}");
            } else {
                assert!(gradient[i] >= -1e-6, "dual feasibility violated at {i}");
            }
        }
    }

    #[test]
    fn cancellation_returns_best_effort() {
        let a = array![[1.0, 0.2, 0.0], [0.1, 1.0, 0.2], [0.0, 0.1, 1.0]];
        let v = array![1.0, 0.2, 0.0];
        let mut calls = 0;
        let result = solve_nnls(&a, &v, NnlsConfig::default(), || {
            calls += 1;
            calls > 1
        });
        assert!(result.cancelled);
        assert!(!result.converged);
    }

    #[test]
    fn iteration_cap_is_honored() {
        let a = array![[1.0, 0.9, 0.8], [0.9, 1.0, 0.9], [0.8, 0.9, 1.0]];
        let v = array![1.0, 1.0, 1.0];
        let config = NnlsConfig {
            max_iterations: 0,
            ..NnlsConfig::default()
        };
        let result = solve_nnls(&a, &v, config, || false);
        assert_eq!(result.iterations, 0);
        assert!(!result.converged);
    }
}
