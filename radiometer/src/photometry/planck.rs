//! Blackbody specific flux seen by a distant observer.
//!
//! The emitter is modeled as a Lambertian sphere of radius R at distance D.
//! Integrating the Planck specific intensity B_λ over the emitting hemisphere
//! gives π·B_λ at the surface, and inverse-square attenuation scales that by
//! (R/D)², the *distance ratio* squared:
//!
//! ```text
//! F_λ = π · B_λ(T) · (R/D)²
//! B_λ(T) = 2hc² / (λ⁵ · (exp(hc/λkT) − 1))
//! ```
//!
//! The kernel runs in CGS scalars and hands back a typed [`SpectralFlux`].

use std::f64::consts::PI;

use super::spectrum::CGS;
use crate::error::{require_non_negative, require_positive, Result};
use crate::units::{
    Length, LengthExt, Ratio, RatioExt, SpectralFlux, Temperature, TemperatureExt,
};

/// Temperature and apparent size of a thermal emitter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmitterParameters {
    /// Effective blackbody temperature, strictly positive
    pub temperature: Temperature,

    /// Emitter radius over observer distance, non-negative
    pub distance_ratio: Ratio,
}

impl EmitterParameters {
    /// Validated constructor
    pub fn new(temperature: Temperature, distance_ratio: Ratio) -> Result<Self> {
        require_positive("temperature", temperature.as_kelvin())?;
        require_non_negative("distance ratio", distance_ratio.as_ratio())?;
        Ok(Self {
            temperature,
            distance_ratio,
        })
    }

    /// Default starting point for the inverse fit: 2700 K, ratio 1
    pub fn reference_guess() -> Self {
        Self {
            temperature: Temperature::from_kelvin(2700.0),
            distance_ratio: Ratio::from_ratio(1.0),
        }
    }
}

/// Planck specific intensity in erg s⁻¹ cm⁻² sr⁻¹ cm⁻¹
///
/// Inputs are assumed valid. Very cold emitters underflow to exactly zero.
pub(crate) fn planck_specific_intensity_cgs(wavelength_cm: f64, temperature_k: f64) -> f64 {
    let numerator = 2.0 * CGS::PLANCK_CONSTANT * CGS::SPEED_OF_LIGHT * CGS::SPEED_OF_LIGHT;
    let exponent = (CGS::PLANCK_CONSTANT * CGS::SPEED_OF_LIGHT)
        / (wavelength_cm * CGS::BOLTZMANN_CONSTANT * temperature_k);

    // exp_m1 overflows to +inf for cold emitters, leaving 0 rather than NaN
    numerator / (wavelength_cm.powi(5) * exponent.exp_m1())
}

/// Observed specific flux in erg s⁻¹ cm⁻² nm⁻¹ for a unit distance ratio
pub(crate) fn unit_ratio_flux_cgs_nm(wavelength_nm: f64, temperature_k: f64) -> f64 {
    let wavelength_cm = wavelength_nm * CGS::CM_PER_NM;
    // Per-cm intensity to per-nm flux
    PI * planck_specific_intensity_cgs(wavelength_cm, temperature_k) * CGS::CM_PER_NM
}

/// Specific flux (energy flux per unit wavelength) of a blackbody at the observer
///
/// # Errors
/// `InvalidParameter` if the wavelength or temperature is not strictly
/// positive and finite, or the distance ratio is negative or non-finite.
pub fn specific_flux(
    wavelength: Length,
    temperature: Temperature,
    distance_ratio: Ratio,
) -> Result<SpectralFlux> {
    let wavelength_nm = wavelength.as_nanometers();
    let temperature_k = temperature.as_kelvin();
    let ratio = distance_ratio.as_ratio();

    require_positive("wavelength", wavelength_nm)?;
    require_positive("temperature", temperature_k)?;
    require_non_negative("distance ratio", ratio)?;

    Ok(SpectralFlux::from_erg_per_s_cm2_nm(
        unit_ratio_flux_cgs_nm(wavelength_nm, temperature_k) * ratio * ratio,
    ))
}
