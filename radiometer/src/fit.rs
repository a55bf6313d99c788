//! Inverse fit: recover emitter temperature and distance ratio from channel flux.
//!
//! The forward model Φ(T, ρ) = ρ² · Φ(T, 1) is linear in s = ρ², so the solver
//! works in (T, s). That keeps the Jacobian column for the size parameter
//! non-zero even when ρ → 0, and makes the grid seeding below exact in s.
//!
//! Residuals are formed in erg s⁻¹ cm⁻² (observed flux divided by that unit):
//!
//! ```text
//! r(T, s) = s · Φ(T, 1) − Φ_obs
//! ```
//!
//! with T ≥ T_min (default 1 K) and s ≥ 0 held by projection.

use nalgebra::{Vector2, Vector3};
use rayon::prelude::*;

use crate::algo::levenberg_marquardt::{minimize_bounded, Bounds2, LmConfig, Termination};
use crate::error::{require_positive, RadiometryError, Result};
use crate::photometry::channels::ChannelFlux;
use crate::photometry::integrator::ChannelFluxIntegrator;
use crate::photometry::planck::EmitterParameters;
use crate::units::{Ratio, RatioExt, Temperature, TemperatureExt};

/// How the solver picks its starting point
#[derive(Debug, Clone, PartialEq)]
pub enum Initialization {
    /// Start from the given parameters
    Fixed(EmitterParameters),

    /// Try each temperature with its best-fitting distance ratio and start
    /// from the one with the lowest residual
    TemperatureGrid { temperatures: Vec<Temperature> },
}

impl Initialization {
    /// Logarithmically spaced temperature grid, both ends included
    ///
    /// # Errors
    /// `InvalidParameter` if the bounds are not positive and increasing or
    /// fewer than two points are requested.
    pub fn log_spaced_grid(min: Temperature, max: Temperature, points: usize) -> Result<Self> {
        let (lo, hi) = (min.as_kelvin(), max.as_kelvin());
        require_positive("grid minimum temperature", lo)?;
        require_positive("grid maximum temperature", hi)?;
        if hi <= lo || points < 2 {
            return Err(RadiometryError::InvalidParameter(format!(
                "temperature grid needs min < max and at least 2 points, got {lo}..{hi} K with {points}"
            )));
        }

        let ratio = (hi / lo).ln() / (points - 1) as f64;
        let temperatures = (0..points)
            .map(|i| Temperature::from_kelvin(lo * (ratio * i as f64).exp()))
            .collect();
        Ok(Initialization::TemperatureGrid { temperatures })
    }
}

impl Default for Initialization {
    fn default() -> Self {
        Initialization::Fixed(EmitterParameters::reference_guess())
    }
}

/// Stopping criteria, bounds and initialization for the fit
#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    pub max_iterations: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    /// Lowest temperature the solver may visit; must be positive
    pub min_temperature: Temperature,
    pub max_temperature: Option<Temperature>,
    pub max_distance_ratio: Option<Ratio>,
    pub initialization: Initialization,
}

impl Default for FitOptions {
    fn default() -> Self {
        let lm = LmConfig::default();
        Self {
            max_iterations: lm.max_iterations,
            ftol: lm.ftol,
            xtol: lm.xtol,
            gtol: lm.gtol,
            min_temperature: Temperature::from_kelvin(1.0),
            max_temperature: None,
            max_distance_ratio: None,
            initialization: Initialization::default(),
        }
    }
}

impl FitOptions {
    /// Default options seeded from a 1000–20000 K log grid of 40 points
    pub fn with_temperature_grid() -> Self {
        let initialization = Initialization::log_spaced_grid(
            Temperature::from_kelvin(1000.0),
            Temperature::from_kelvin(20000.0),
            40,
        )
        .unwrap_or_default();
        Self {
            initialization,
            ..Self::default()
        }
    }

    fn lm_config(&self) -> LmConfig {
        LmConfig {
            max_iterations: self.max_iterations,
            ftol: self.ftol,
            xtol: self.xtol,
            gtol: self.gtol,
            ..LmConfig::default()
        }
    }

    fn bounds(&self) -> Result<Bounds2> {
        let t_min = self.min_temperature.as_kelvin();
        require_positive("minimum temperature", t_min)?;

        let t_max = self.max_temperature.map_or(f64::INFINITY, |t| t.as_kelvin());
        let s_max = self
            .max_distance_ratio
            .map_or(f64::INFINITY, |r| r.as_ratio().powi(2));
        if t_max.is_nan() || t_max < t_min || s_max.is_nan() {
            return Err(RadiometryError::InvalidParameter(format!(
                "inconsistent fit bounds: T in {t_min}..{t_max} K, ratio² up to {s_max}"
            )));
        }

        Ok(Bounds2::new(
            Vector2::new(t_min, 0.0),
            Vector2::new(t_max, s_max),
        ))
    }
}

/// Fitted parameters with solver diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    pub parameters: EmitterParameters,
    /// Starting point actually used (after grid seeding)
    pub initial: EmitterParameters,
    pub iterations: usize,
    pub evaluations: usize,
    /// ½‖r‖² in (erg s⁻¹ cm⁻²)²
    pub cost: f64,
    pub termination: Termination,
}

/// Bounded least-squares estimator for emitter parameters
///
/// Borrows the integrator, so a single integrator can back many estimators
/// and batch fits without copying the sampled sensitivity table.
#[derive(Debug, Clone)]
pub struct ParameterEstimator<'a> {
    integrator: &'a ChannelFluxIntegrator,
    options: FitOptions,
}

impl<'a> ParameterEstimator<'a> {
    pub fn new(integrator: &'a ChannelFluxIntegrator) -> Self {
        Self::with_options(integrator, FitOptions::default())
    }

    pub fn with_options(integrator: &'a ChannelFluxIntegrator, options: FitOptions) -> Self {
        Self {
            integrator,
            options,
        }
    }

    pub fn options(&self) -> &FitOptions {
        &self.options
    }

    /// Best-fitting parameters for an observed channel flux
    pub fn fit(&self, observed: &ChannelFlux) -> Result<EmitterParameters> {
        self.fit_report(observed).map(|report| report.parameters)
    }

    /// Fit with diagnostics
    ///
    /// # Errors
    /// - `InvalidParameter` for a non-finite or negative observation,
    ///   inconsistent bounds or an empty temperature grid
    /// - `FitDidNotConverge` if no stopping criterion is met, or the solver
    ///   stops at a temperature where the model predicts no flux
    pub fn fit_report(&self, observed: &ChannelFlux) -> Result<FitReport> {
        let target = Vector3::from(observed.as_erg_per_s_cm2());
        if target.iter().any(|v| !(v.is_finite() && *v >= 0.0)) {
            return Err(RadiometryError::InvalidParameter(format!(
                "observed flux must be finite and non-negative, got {:?}",
                target.as_slice()
            )));
        }

        let bounds = self.options.bounds()?;
        let seed = bounds.project(&self.seed(&target)?);
        log::debug!(
            "Fitting flux {:?} erg/s/cm² from T = {:.1} K, ratio² = {:.3e}",
            target.as_slice(),
            seed[0],
            seed[1]
        );

        let residuals =
            |p: &Vector2<f64>| self.unit_ratio_flux(p[0]) * p[1] - target;

        match minimize_bounded(residuals, seed, &bounds, &self.options.lm_config()) {
            // A bright observation cannot be explained by a temperature whose
            // model flux is zero; the ratio is unconstrained there
            Ok(result)
                if target.iter().any(|v| *v > 0.0)
                    && self.unit_ratio_flux(result.parameters[0]).iter().all(|v| *v == 0.0) =>
            {
                log::warn!(
                    "Blackbody fit stalled at T = {:.3e} K where the model flux vanishes",
                    result.parameters[0]
                );
                Err(RadiometryError::FitDidNotConverge {
                    iterations: result.iterations,
                    cost: result.cost,
                })
            }
            Ok(result) => Ok(FitReport {
                parameters: to_parameters(&result.parameters),
                initial: to_parameters(&seed),
                iterations: result.iterations,
                evaluations: result.evaluations,
                cost: result.cost,
                termination: result.termination,
            }),
            Err(err) => {
                log::warn!("Blackbody fit failed: {err}");
                Err(RadiometryError::FitDidNotConverge {
                    iterations: err.iterations(),
                    cost: err.cost(),
                })
            }
        }
    }

    /// Fit many observations in parallel; results keep input order
    pub fn fit_batch(&self, observations: &[ChannelFlux]) -> Vec<Result<FitReport>> {
        observations
            .par_iter()
            .map(|observed| self.fit_report(observed))
            .collect()
    }

    fn unit_ratio_flux(&self, temperature_k: f64) -> Vector3<f64> {
        Vector3::from(self.integrator.unit_ratio_flux(temperature_k))
    }

    /// Starting (T, ρ²) for the solver
    fn seed(&self, target: &Vector3<f64>) -> Result<Vector2<f64>> {
        match &self.options.initialization {
            Initialization::Fixed(start) => {
                let ratio = start.distance_ratio.as_ratio();
                Ok(Vector2::new(start.temperature.as_kelvin(), ratio * ratio))
            }
            Initialization::TemperatureGrid { temperatures } => {
                let mut best: Option<(f64, Vector2<f64>)> = None;
                for temperature in temperatures {
                    let t = temperature.as_kelvin();
                    if !(t.is_finite() && t > 0.0) {
                        continue;
                    }
                    let shape = self.unit_ratio_flux(t);
                    let s = best_scale(&shape, target);
                    let cost = (shape * s - target).norm_squared();
                    if best.map_or(true, |(c, _)| cost < c) {
                        best = Some((cost, Vector2::new(t, s)));
                    }
                }
                best.map(|(_, seed)| seed).ok_or_else(|| {
                    RadiometryError::InvalidParameter(
                        "temperature grid has no positive temperatures".to_string(),
                    )
                })
            }
        }
    }
}

/// Least-squares scale s ≥ 0 minimizing ‖s·shape − target‖
fn best_scale(shape: &Vector3<f64>, target: &Vector3<f64>) -> f64 {
    let denom = shape.dot(shape);
    if denom > 0.0 {
        (shape.dot(target) / denom).max(0.0)
    } else {
        0.0
    }
}

fn to_parameters(p: &Vector2<f64>) -> EmitterParameters {
    EmitterParameters {
        temperature: Temperature::from_kelvin(p[0]),
        distance_ratio: Ratio::from_ratio(p[1].max(0.0).sqrt()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photometry::sensitivity::SensitivityCurve;
    use approx::assert_relative_eq;

    fn integrator() -> ChannelFluxIntegrator {
        ChannelFluxIntegrator::new(&SensitivityCurve::bundled().unwrap())
    }

    fn flux(integrator: &ChannelFluxIntegrator, t: f64, ratio: f64) -> ChannelFlux {
        integrator
            .channel_flux(Temperature::from_kelvin(t), Ratio::from_ratio(ratio))
            .unwrap()
    }

    #[test]
    fn test_best_scale() {
        let shape = Vector3::new(1.0, 2.0, 3.0);
        assert_relative_eq!(best_scale(&shape, &(shape * 0.25)), 0.25, epsilon = 1e-15);
        assert_eq!(best_scale(&shape, &(shape * -1.0)), 0.0);
        assert_eq!(best_scale(&Vector3::zeros(), &shape), 0.0);
    }

    #[test]
    fn test_log_spaced_grid() {
        let init = Initialization::log_spaced_grid(
            Temperature::from_kelvin(1000.0),
            Temperature::from_kelvin(10000.0),
            3,
        )
        .unwrap();
        match init {
            Initialization::TemperatureGrid { temperatures } => {
                assert_eq!(temperatures.len(), 3);
                assert_relative_eq!(temperatures[1].as_kelvin(), 3162.2776, epsilon = 1e-3);
                assert_relative_eq!(temperatures[2].as_kelvin(), 10000.0, epsilon = 1e-6);
            }
            other => panic!("unexpected initialization {other:?}"),
        }

        assert!(Initialization::log_spaced_grid(
            Temperature::from_kelvin(5000.0),
            Temperature::from_kelvin(1000.0),
            10
        )
        .is_err());
    }

    #[test]
    fn test_default_start_recovers_parameters() {
        let _ = env_logger::builder().is_test(true).try_init();
        let integrator = integrator();
        let estimator = ParameterEstimator::new(&integrator);

        let report = estimator.fit_report(&flux(&integrator, 2700.0, 0.5)).unwrap();
        assert_relative_eq!(
            report.parameters.temperature.as_kelvin(),
            2700.0,
            max_relative = 1e-3
        );
        assert_relative_eq!(
            report.parameters.distance_ratio.as_ratio(),
            0.5,
            max_relative = 1e-3
        );
        assert_eq!(report.initial, EmitterParameters::reference_guess());
    }

    #[test]
    fn test_grid_seed_is_close() {
        let integrator = integrator();
        let estimator =
            ParameterEstimator::with_options(&integrator, FitOptions::with_temperature_grid());
        let target = Vector3::from(flux(&integrator, 4500.0, 2e-3).as_erg_per_s_cm2());

        let seed = estimator.seed(&target).unwrap();
        // Adjacent nodes of a 40-point grid over 1000-20000 K are 8% apart
        assert_relative_eq!(seed[0], 4500.0, max_relative = 0.09);
        assert!(seed[1] > 0.0);
    }

    #[test]
    fn test_non_finite_observation_rejected() {
        let integrator = integrator();
        let estimator = ParameterEstimator::new(&integrator);
        let observed = ChannelFlux::from_erg_per_s_cm2([1.0, f64::NAN, 1.0]);
        assert!(matches!(
            estimator.fit(&observed),
            Err(RadiometryError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_iteration_cap_reports_non_convergence() {
        let integrator = integrator();
        let options = FitOptions {
            max_iterations: 1,
            ..FitOptions::default()
        };
        let estimator = ParameterEstimator::with_options(&integrator, options);

        let err = estimator.fit(&flux(&integrator, 4000.0, 0.3)).unwrap_err();
        assert!(matches!(
            err,
            RadiometryError::FitDidNotConverge { iterations: 1, .. }
        ));
    }

    #[test]
    fn test_inconsistent_bounds_rejected() {
        let integrator = integrator();
        let options = FitOptions {
            min_temperature: Temperature::from_kelvin(0.0),
            ..FitOptions::default()
        };
        let estimator = ParameterEstimator::with_options(&integrator, options);
        assert!(matches!(
            estimator.fit(&flux(&integrator, 3000.0, 1.0)),
            Err(RadiometryError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_empty_grid_rejected() {
        let integrator = integrator();
        let options = FitOptions {
            initialization: Initialization::TemperatureGrid {
                temperatures: vec![],
            },
            ..FitOptions::default()
        };
        let estimator = ParameterEstimator::with_options(&integrator, options);
        assert!(estimator.fit(&flux(&integrator, 3000.0, 1.0)).is_err());
    }

    #[test]
    fn test_negative_observation_rejected() {
        let integrator = integrator();
        let estimator = ParameterEstimator::new(&integrator);
        for values in [[-1.0, -2.0, -3.0], [1e3, -5.0, 1e3]] {
            assert!(matches!(
                estimator.fit(&ChannelFlux::from_erg_per_s_cm2(values)),
                Err(RadiometryError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_vanishing_model_flux_is_not_a_fit() {
        // Below ~20 K the visible-band flux underflows to zero everywhere in the box
        let integrator = integrator();
        let options = FitOptions {
            max_temperature: Some(Temperature::from_kelvin(20.0)),
            ..FitOptions::default()
        };
        let estimator = ParameterEstimator::with_options(&integrator, options);

        let err = estimator.fit(&flux(&integrator, 3000.0, 0.5)).unwrap_err();
        assert!(matches!(err, RadiometryError::FitDidNotConverge { .. }));
    }

    #[test]
    fn test_dark_observation_fits_zero_ratio() {
        let integrator = integrator();
        let estimator = ParameterEstimator::new(&integrator);
        let report = estimator
            .fit_report(&ChannelFlux::from_erg_per_s_cm2([0.0; 3]))
            .unwrap();
        assert!(report.parameters.distance_ratio.as_ratio() < 1e-6);
    }
}
