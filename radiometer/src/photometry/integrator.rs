//! Band-integrated channel flux for a blackbody emitter.
//!
//! The detected flux in channel c is
//!
//! ```text
//! Φ_c(T, ρ) = ∫ F_λ(T, ρ) · S_c(λ) dλ    over 400..700 nm
//! ```
//!
//! evaluated with the trapezoidal rule on a fixed grid. Since F_λ is linear in
//! ρ², the integrator computes the ρ = 1 flux once and scales it.

use ndarray::{Array1, Array2};

use super::channels::ChannelFlux;
use super::planck::{unit_ratio_flux_cgs_nm, EmitterParameters};
use super::sensitivity::SensitivityCurve;
use super::spectrum::Band;
use super::trapezoid::trap_integrate_uniform;
use crate::error::{require_non_negative, require_positive, RadiometryError, Result};
use crate::units::{Length, LengthExt, Ratio, RatioExt, Temperature, TemperatureExt};

/// Evenly spaced wavelength samples, both ends included
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavelengthGrid {
    start_nm: f64,
    stop_nm: f64,
    points: usize,
}

impl WavelengthGrid {
    /// Grid from `start` to `stop` with (approximately) the given step
    ///
    /// The point count is rounded so that both ends land exactly on the grid.
    pub fn new(start: Length, stop: Length, step: Length) -> Result<Self> {
        let (start_nm, stop_nm, step_nm) =
            (start.as_nanometers(), stop.as_nanometers(), step.as_nanometers());
        require_positive("grid start", start_nm)?;
        require_positive("grid step", step_nm)?;
        if !(stop_nm.is_finite() && stop_nm > start_nm) {
            return Err(RadiometryError::InvalidParameter(format!(
                "grid stop {stop_nm} nm must exceed start {start_nm} nm"
            )));
        }

        let intervals = ((stop_nm - start_nm) / step_nm).round().max(1.0) as usize;
        Ok(Self {
            start_nm,
            stop_nm,
            points: intervals + 1,
        })
    }

    /// 400 nm to 700 nm at 0.1 nm (3001 points)
    pub fn reference() -> Self {
        Self {
            start_nm: 400.0,
            stop_nm: 700.0,
            points: 3001,
        }
    }

    pub fn len(&self) -> usize {
        self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points == 0
    }

    /// Spacing between adjacent samples in nanometers
    pub fn step_nm(&self) -> f64 {
        (self.stop_nm - self.start_nm) / (self.points - 1) as f64
    }

    pub fn band(&self) -> Band {
        Band::from_nm_bounds(self.start_nm, self.stop_nm)
    }

    /// Sample wavelengths, linearly spaced like `numpy.linspace`
    pub fn wavelengths(&self) -> Vec<Length> {
        self.wavelengths_nm()
            .into_iter()
            .map(Length::from_nanometers)
            .collect()
    }

    fn wavelengths_nm(&self) -> Vec<f64> {
        let step = self.step_nm();
        (0..self.points)
            .map(|i| {
                if i + 1 == self.points {
                    self.stop_nm
                } else {
                    self.start_nm + step * i as f64
                }
            })
            .collect()
    }
}

impl Default for WavelengthGrid {
    fn default() -> Self {
        Self::reference()
    }
}

/// Integrates blackbody flux against a sensitivity curve
///
/// Sensitivities are sampled once at construction, so each evaluation only
/// costs one Planck evaluation per grid point. Immutable and `Send + Sync`.
#[derive(Debug, Clone)]
pub struct ChannelFluxIntegrator {
    grid: WavelengthGrid,
    wavelengths_nm: Array1<f64>,
    /// One row per grid point, one column per channel
    sensitivity: Array2<f64>,
}

impl ChannelFluxIntegrator {
    /// Integrator on the reference grid
    pub fn new(curve: &SensitivityCurve) -> Self {
        Self::with_grid(curve, WavelengthGrid::reference())
    }

    /// Integrator on a custom grid
    pub fn with_grid(curve: &SensitivityCurve, grid: WavelengthGrid) -> Self {
        let wavelengths = grid.wavelengths();
        let sensitivity = curve.sensitivities_at(&wavelengths);
        let band = curve.band();
        if !band.contains(grid.start_nm) || !band.contains(grid.stop_nm) {
            log::warn!(
                "Integration grid {:.1}-{:.1} nm extends past calibrated range {:.1}-{:.1} nm",
                grid.start_nm,
                grid.stop_nm,
                band.lower_nm,
                band.upper_nm
            );
        }

        Self {
            grid,
            wavelengths_nm: Array1::from(grid.wavelengths_nm()),
            sensitivity,
        }
    }

    pub fn grid(&self) -> &WavelengthGrid {
        &self.grid
    }

    /// Per-channel detected flux for an emitter
    ///
    /// # Errors
    /// `InvalidParameter` for a non-positive temperature or negative ratio.
    pub fn channel_flux(
        &self,
        temperature: Temperature,
        distance_ratio: Ratio,
    ) -> Result<ChannelFlux> {
        let temperature_k = temperature.as_kelvin();
        let ratio = distance_ratio.as_ratio();
        require_positive("temperature", temperature_k)?;
        require_non_negative("distance ratio", ratio)?;

        let unit = self.unit_ratio_flux(temperature_k);
        let scale = ratio * ratio;
        Ok(ChannelFlux::from_erg_per_s_cm2(unit.map(|v| v * scale)))
    }

    /// Same as [`Self::channel_flux`] for a parameter pair
    pub fn channel_flux_for(&self, parameters: &EmitterParameters) -> Result<ChannelFlux> {
        self.channel_flux(parameters.temperature, parameters.distance_ratio)
    }

    /// Channel flux in erg s⁻¹ cm⁻² at distance ratio 1
    ///
    /// Temperature must already be validated.
    pub(crate) fn unit_ratio_flux(&self, temperature_k: f64) -> [f64; 3] {
        let spectrum: Array1<f64> = self
            .wavelengths_nm
            .mapv(|nm| unit_ratio_flux_cgs_nm(nm, temperature_k));
        let dx = self.grid.step_nm();

        [0, 1, 2].map(|c| {
            let column = self.sensitivity.column(c);
            trap_integrate_uniform(spectrum.iter().zip(column.iter()).map(|(f, s)| f * s), dx)
        })
    }
}
