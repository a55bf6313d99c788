//! Bound-constrained Levenberg–Marquardt for two parameters and three residuals
//!
//! Minimizes ½‖r(p)‖² over p ∈ [lower, upper] where r: ℝ² → ℝ³. Each
//! iteration builds a finite-difference Jacobian, rescales its columns to unit
//! norm (Marquardt scaling) and solves the damped normal equations
//!
//! ```text
//! (J̃ᵀJ̃ + λI) δ̃ = −J̃ᵀr,    δ = D⁻¹δ̃,    D = diag(‖J_i‖)
//! ```
//!
//! The trial point is projected onto the box. Improving steps are accepted and
//! relax λ; others are rejected and tighten it.
//!
//! The solver only reports success when a tolerance test passes. Running out
//! of iterations, hitting a non-finite cost, or damping overflow are errors.

use nalgebra::{Matrix2, Matrix3x2, Vector2, Vector3};
use thiserror::Error;

/// Box constraints for the two parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds2 {
    pub lower: Vector2<f64>,
    pub upper: Vector2<f64>,
}

impl Bounds2 {
    /// # Panics
    /// If any lower bound exceeds its upper bound or is NaN.
    pub fn new(lower: Vector2<f64>, upper: Vector2<f64>) -> Self {
        for i in 0..2 {
            assert!(
                lower[i] <= upper[i],
                "Lower bound must not exceed upper bound, got {}..{}",
                lower[i],
                upper[i]
            );
        }
        Self { lower, upper }
    }

    pub fn unbounded() -> Self {
        Self {
            lower: Vector2::repeat(f64::NEG_INFINITY),
            upper: Vector2::repeat(f64::INFINITY),
        }
    }

    /// Clamp a point into the box
    pub fn project(&self, p: &Vector2<f64>) -> Vector2<f64> {
        Vector2::new(
            p[0].clamp(self.lower[0], self.upper[0]),
            p[1].clamp(self.lower[1], self.upper[1]),
        )
    }
}

/// Stopping criteria and damping schedule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmConfig {
    /// Jacobian evaluations before giving up
    pub max_iterations: usize,

    /// Stop when an accepted step reduces the cost by less than `ftol · cost`
    pub ftol: f64,

    /// Stop when every step component is below `xtol · (|p_i| + xtol)`
    pub xtol: f64,

    /// Stop when the largest cosine between the residual and a Jacobian
    /// column (on free parameters) is below `gtol`
    pub gtol: f64,

    /// Starting damping in the column-scaled problem
    pub initial_lambda: f64,

    /// Factor applied to lambda after a rejected step
    pub lambda_up: f64,

    /// Factor applied to lambda after an accepted step
    pub lambda_down: f64,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1e-12,
            xtol: 1e-10,
            gtol: 1e-12,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
        }
    }
}

/// Which tolerance ended a successful run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    ZeroResidual,
    CostTolerance,
    StepTolerance,
    GradientTolerance,
}

/// Converged solution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmResult {
    pub parameters: Vector2<f64>,
    pub residuals: Vector3<f64>,
    /// ½‖r‖² at `parameters`
    pub cost: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub termination: Termination,
}

/// Solver failures; each carries the state reached when it gave up
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LmError {
    #[error("no tolerance met within {iterations} iterations (cost {cost:.3e})")]
    MaxIterations {
        iterations: usize,
        cost: f64,
        parameters: Vector2<f64>,
    },

    #[error("cost became non-finite at iteration {iterations}")]
    NonFiniteCost { iterations: usize, cost: f64 },

    #[error("damping overflow at iteration {iterations} (cost {cost:.3e})")]
    DampingOverflow {
        iterations: usize,
        cost: f64,
        parameters: Vector2<f64>,
    },
}

impl LmError {
    pub fn iterations(&self) -> usize {
        match self {
            LmError::MaxIterations { iterations, .. }
            | LmError::NonFiniteCost { iterations, .. }
            | LmError::DampingOverflow { iterations, .. } => *iterations,
        }
    }

    pub fn cost(&self) -> f64 {
        match self {
            LmError::MaxIterations { cost, .. }
            | LmError::NonFiniteCost { cost, .. }
            | LmError::DampingOverflow { cost, .. } => *cost,
        }
    }
}

const MAX_LAMBDA: f64 = 1e16;
const MIN_LAMBDA: f64 = 1e-15;

/// Relative finite-difference step (≈ cbrt of machine epsilon)
const FD_RELATIVE_STEP: f64 = 6e-6;

fn half_norm_squared(r: &Vector3<f64>) -> f64 {
    0.5 * r.norm_squared()
}

/// Finite-difference Jacobian, central where the box allows it
fn jacobian<F>(
    residuals: &F,
    p: &Vector2<f64>,
    r: &Vector3<f64>,
    bounds: &Bounds2,
    evaluations: &mut usize,
) -> Matrix3x2<f64>
where
    F: Fn(&Vector2<f64>) -> Vector3<f64>,
{
    let mut jac = Matrix3x2::zeros();
    for i in 0..2 {
        let h = FD_RELATIVE_STEP * p[i].abs().max(1.0);
        let room_below = p[i] - h >= bounds.lower[i];
        let room_above = p[i] + h <= bounds.upper[i];

        let column = if room_below && room_above {
            let mut plus = *p;
            let mut minus = *p;
            plus[i] += h;
            minus[i] -= h;
            *evaluations += 2;
            (residuals(&plus) - residuals(&minus)) / (2.0 * h)
        } else if room_above {
            let mut plus = *p;
            plus[i] += h;
            *evaluations += 1;
            (residuals(&plus) - r) / h
        } else {
            let mut minus = *p;
            minus[i] -= h;
            *evaluations += 1;
            (r - residuals(&minus)) / h
        };
        jac.set_column(i, &column);
    }
    jac
}

/// Gradient with components zeroed where descent would leave the box
fn projected_gradient(g: &Vector2<f64>, p: &Vector2<f64>, bounds: &Bounds2) -> Vector2<f64> {
    let mut pg = *g;
    for i in 0..2 {
        let at_lower = p[i] <= bounds.lower[i] && g[i] > 0.0;
        let at_upper = p[i] >= bounds.upper[i] && g[i] < 0.0;
        if at_lower || at_upper {
            pg[i] = 0.0;
        }
    }
    pg
}

fn finish(
    parameters: Vector2<f64>,
    residuals: Vector3<f64>,
    cost: f64,
    iterations: usize,
    evaluations: usize,
    termination: Termination,
) -> Result<LmResult, LmError> {
    log::debug!(
        "LM finished after {iterations} iterations ({evaluations} evaluations): {termination:?}, cost {cost:.3e}"
    );
    Ok(LmResult {
        parameters,
        residuals,
        cost,
        iterations,
        evaluations,
        termination,
    })
}

fn step_is_small(step: &Vector2<f64>, p: &Vector2<f64>, xtol: f64) -> bool {
    (0..2).all(|i| step[i].abs() <= xtol * (p[i].abs() + xtol))
}

/// Minimize ½‖r(p)‖² inside `bounds`, starting from `initial`
///
/// The initial point is projected into the box first.
///
/// # Errors
/// See [`LmError`]. A non-finite cost at the start is reported with
/// `iterations = 0`.
pub fn minimize_bounded<F>(
    residuals: F,
    initial: Vector2<f64>,
    bounds: &Bounds2,
    config: &LmConfig,
) -> Result<LmResult, LmError>
where
    F: Fn(&Vector2<f64>) -> Vector3<f64>,
{
    let mut p = bounds.project(&initial);
    let mut r = residuals(&p);
    let mut cost = half_norm_squared(&r);
    let mut evaluations = 1;

    if !cost.is_finite() {
        return Err(LmError::NonFiniteCost {
            iterations: 0,
            cost,
        });
    }

    if cost == 0.0 {
        return finish(p, r, cost, 0, evaluations, Termination::ZeroResidual);
    }

    let mut lambda = config.initial_lambda;

    for iteration in 1..=config.max_iterations {
        let jac = jacobian(&residuals, &p, &r, bounds, &mut evaluations);
        if jac.iter().any(|v| !v.is_finite()) {
            return Err(LmError::NonFiniteCost {
                iterations: iteration,
                cost,
            });
        }

        // Column norms for Marquardt scaling, floored so dead columns stay solvable
        let norms = Vector2::new(jac.column(0).norm(), jac.column(1).norm());
        let floor = 1e-12 * norms.max().max(f64::MIN_POSITIVE);
        let scale = norms.map(|n| n.max(floor));

        let gradient = jac.transpose() * r;
        let free_gradient = projected_gradient(&gradient, &p, bounds);

        let residual_norm = r.norm();
        let cosine = (0..2)
            .map(|i| free_gradient[i].abs() / (scale[i] * residual_norm))
            .fold(0.0, f64::max);
        if cosine <= config.gtol {
            return finish(
                p,
                r,
                cost,
                iteration,
                evaluations,
                Termination::GradientTolerance,
            );
        }

        let scaled_jac = Matrix3x2::from_columns(&[
            jac.column(0) / scale[0],
            jac.column(1) / scale[1],
        ]);
        let normal = scaled_jac.transpose() * scaled_jac;
        let scaled_gradient = scaled_jac.transpose() * r;

        loop {
            let damped = normal + Matrix2::identity() * lambda;
            let step = match damped.cholesky() {
                Some(chol) => {
                    let scaled_step = chol.solve(&(-scaled_gradient));
                    scaled_step.component_div(&scale)
                }
                None => {
                    lambda *= config.lambda_up;
                    if lambda > MAX_LAMBDA {
                        return Err(LmError::DampingOverflow {
                            iterations: iteration,
                            cost,
                            parameters: p,
                        });
                    }
                    continue;
                }
            };

            let trial = bounds.project(&(p + step));
            let actual_step = trial - p;
            let trial_r = residuals(&trial);
            let trial_cost = half_norm_squared(&trial_r);
            evaluations += 1;

            log::debug!(
                "LM iter {iteration}: p = [{:.6e}, {:.6e}], trial cost {trial_cost:.6e} (current {cost:.6e}), lambda {lambda:.1e}",
                trial[0],
                trial[1]
            );

            if trial_cost.is_finite() && trial_cost < cost {
                let reduction = cost - trial_cost;
                let small_step = step_is_small(&actual_step, &p, config.xtol);

                p = trial;
                r = trial_r;
                cost = trial_cost;
                lambda = (lambda * config.lambda_down).max(MIN_LAMBDA);

                if cost == 0.0 {
                    return finish(p, r, cost, iteration, evaluations, Termination::ZeroResidual);
                }
                if reduction <= config.ftol * (cost + reduction) {
                    return finish(p, r, cost, iteration, evaluations, Termination::CostTolerance);
                }
                if small_step {
                    return finish(p, r, cost, iteration, evaluations, Termination::StepTolerance);
                }
                break;
            }

            // Rejected: a vanishing step means no further progress is possible
            if step_is_small(&actual_step, &p, config.xtol) {
                return finish(p, r, cost, iteration, evaluations, Termination::StepTolerance);
            }

            lambda *= config.lambda_up;
            if lambda > MAX_LAMBDA {
                return Err(LmError::DampingOverflow {
                    iterations: iteration,
                    cost,
                    parameters: p,
                });
            }
        }
    }

    Err(LmError::MaxIterations {
        iterations: config.max_iterations,
        cost,
        parameters: p,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Three-point exponential decay y = a·exp(−b·x)
    fn decay_residuals(observed: Vector3<f64>) -> impl Fn(&Vector2<f64>) -> Vector3<f64> {
        move |p: &Vector2<f64>| {
            let xs = Vector3::new(0.0, 1.0, 2.0);
            xs.map(|x| p[0] * (-p[1] * x).exp()) - observed
        }
    }

    fn decay_observation(a: f64, b: f64) -> Vector3<f64> {
        Vector3::new(a, a * (-b).exp(), a * (-2.0 * b).exp())
    }

    #[test]
    fn test_recovers_exact_parameters() {
        let observed = decay_observation(3.0, 0.7);
        let result = minimize_bounded(
            decay_residuals(observed),
            Vector2::new(1.0, 0.1),
            &Bounds2::unbounded(),
            &LmConfig::default(),
        )
        .unwrap();

        assert_relative_eq!(result.parameters[0], 3.0, max_relative = 1e-6);
        assert_relative_eq!(result.parameters[1], 0.7, max_relative = 1e-6);
        assert!(result.cost < 1e-12);
        assert!(result.iterations > 0);
    }

    #[test]
    fn test_linear_problem_converges_fast() {
        // r = A p − b with a consistent right-hand side
        let residuals = |p: &Vector2<f64>| {
            Vector3::new(p[0] + p[1] - 3.0, p[0] - p[1] - 1.0, 2.0 * p[0] - 4.0)
        };
        let result = minimize_bounded(
            residuals,
            Vector2::new(0.0, 0.0),
            &Bounds2::unbounded(),
            &LmConfig::default(),
        )
        .unwrap();

        assert_relative_eq!(result.parameters[0], 2.0, epsilon = 1e-8);
        assert_relative_eq!(result.parameters[1], 1.0, epsilon = 1e-8);
        assert!(result.iterations < 20);
    }

    #[test]
    fn test_active_lower_bound() {
        // Unconstrained minimum at p1 = -2; the box holds it at 0
        let residuals =
            |p: &Vector2<f64>| Vector3::new(p[0] - 1.0, p[1] + 2.0, 0.5 * (p[0] - 1.0));
        let bounds = Bounds2::new(Vector2::new(0.0, 0.0), Vector2::repeat(f64::INFINITY));
        let result =
            minimize_bounded(residuals, Vector2::new(5.0, 5.0), &bounds, &LmConfig::default())
                .unwrap();

        assert_relative_eq!(result.parameters[0], 1.0, epsilon = 1e-8);
        assert_eq!(result.parameters[1], 0.0);
        assert_relative_eq!(result.cost, 2.0, epsilon = 1e-8);
    }

    #[test]
    fn test_initial_point_is_projected() {
        let residuals = |p: &Vector2<f64>| Vector3::new(p[0] - 1.0, p[1] - 1.0, 0.0);
        let bounds = Bounds2::new(Vector2::new(0.0, 0.0), Vector2::new(10.0, 10.0));
        let result = minimize_bounded(
            residuals,
            Vector2::new(-50.0, 50.0),
            &bounds,
            &LmConfig::default(),
        )
        .unwrap();
        assert_relative_eq!(result.parameters[0], 1.0, epsilon = 1e-8);
        assert_relative_eq!(result.parameters[1], 1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_iteration_cap_is_an_error() {
        let observed = decay_observation(3.0, 0.7);
        let config = LmConfig {
            max_iterations: 1,
            ..LmConfig::default()
        };
        let err = minimize_bounded(
            decay_residuals(observed),
            Vector2::new(1.0, 0.1),
            &Bounds2::unbounded(),
            &config,
        )
        .unwrap_err();

        assert!(matches!(err, LmError::MaxIterations { iterations: 1, .. }));
        assert!(err.cost() > 0.0);
    }

    #[test]
    fn test_non_finite_start() {
        let residuals = |_: &Vector2<f64>| Vector3::new(f64::NAN, 0.0, 0.0);
        let err = minimize_bounded(
            residuals,
            Vector2::zeros(),
            &Bounds2::unbounded(),
            &LmConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LmError::NonFiniteCost { iterations: 0, .. }));
    }

    #[test]
    fn test_zero_residual_at_start() {
        let residuals = |p: &Vector2<f64>| Vector3::new(p[0], p[1], 0.0);
        let result = minimize_bounded(
            residuals,
            Vector2::zeros(),
            &Bounds2::unbounded(),
            &LmConfig::default(),
        )
        .unwrap();
        assert_eq!(result.termination, Termination::ZeroResidual);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    #[should_panic(expected = "Lower bound must not exceed upper bound")]
    fn test_inverted_bounds() {
        Bounds2::new(Vector2::new(1.0, 0.0), Vector2::new(0.0, 1.0));
    }
}
