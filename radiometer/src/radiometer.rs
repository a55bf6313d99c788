//! Facade tying the forward model, calibration and inverse fit together.

use std::path::Path;

use crate::calibration::CalibrationConstants;
use crate::error::Result;
use crate::fit::{FitOptions, FitReport, ParameterEstimator};
use crate::photometry::channels::{ChannelCounts, ChannelFlux};
use crate::photometry::energy::{
    blackbody_channel_energy, counts_from_energy, flux_from_counts, laser_channel_energy,
};
use crate::photometry::integrator::ChannelFluxIntegrator;
use crate::photometry::planck::EmitterParameters;
use crate::photometry::sensitivity::SensitivityCurve;
use crate::units::{Length, Power, Ratio, Temperature, Time};

/// Sensor model with its calibration
///
/// Owns the sensitivity curve, a precomputed integrator and the calibration
/// constants. Immutable; share it across threads by reference.
///
/// ```rust
/// use radiometer::Radiometer;
/// use radiometer::units::*;
///
/// let radiometer = Radiometer::reference().unwrap();
/// let counts = radiometer
///     .laser_expected_counts(
///         Time::from_seconds(1.0 / 1017.0),
///         Power::from_microwatts(4.5e-3),
///         Length::from_nanometers(632.8),
///     )
///     .unwrap();
/// assert_eq!(counts.dominant_channel(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct Radiometer {
    curve: SensitivityCurve,
    integrator: ChannelFluxIntegrator,
    constants: CalibrationConstants,
    fit_options: FitOptions,
}

impl Radiometer {
    pub fn new(curve: SensitivityCurve, constants: CalibrationConstants) -> Self {
        let integrator = ChannelFluxIntegrator::new(&curve);
        Self {
            curve,
            integrator,
            constants,
            fit_options: FitOptions::default(),
        }
    }

    /// Bundled sensitivity table with reference calibration
    pub fn reference() -> Result<Self> {
        Ok(Self::new(
            SensitivityCurve::bundled()?,
            CalibrationConstants::reference(),
        ))
    }

    /// Build from optional files, falling back to the bundled data
    pub fn from_files(sensitivity: Option<&Path>, calibration: Option<&Path>) -> Result<Self> {
        let curve = match sensitivity {
            Some(path) => SensitivityCurve::from_csv_path(path)?,
            None => SensitivityCurve::bundled()?,
        };
        let constants = match calibration {
            Some(path) => CalibrationConstants::load_from_file(path)?,
            None => CalibrationConstants::reference(),
        };
        Ok(Self::new(curve, constants))
    }

    pub fn with_fit_options(mut self, options: FitOptions) -> Self {
        self.fit_options = options;
        self
    }

    pub fn curve(&self) -> &SensitivityCurve {
        &self.curve
    }

    pub fn integrator(&self) -> &ChannelFluxIntegrator {
        &self.integrator
    }

    pub fn constants(&self) -> &CalibrationConstants {
        &self.constants
    }

    /// Estimator borrowing this radiometer's integrator and fit options
    pub fn estimator(&self) -> ParameterEstimator<'_> {
        ParameterEstimator::with_options(&self.integrator, self.fit_options.clone())
    }

    /// Counts a blackbody emitter produces over an exposure
    pub fn blackbody_expected_counts(
        &self,
        exposure_time: Time,
        temperature: Temperature,
        distance_ratio: Ratio,
    ) -> Result<ChannelCounts> {
        let parameters = EmitterParameters::new(temperature, distance_ratio)?;
        let energy =
            blackbody_channel_energy(&self.integrator, &self.constants, exposure_time, &parameters)?;
        Ok(counts_from_energy(&energy, self.constants.counts_per_energy))
    }

    /// Counts a laser produces over an exposure
    pub fn laser_expected_counts(
        &self,
        exposure_time: Time,
        laser_power: Power,
        wavelength: Length,
    ) -> Result<ChannelCounts> {
        let energy = laser_channel_energy(&self.curve, exposure_time, laser_power, wavelength)?;
        Ok(counts_from_energy(&energy, self.constants.counts_per_energy))
    }

    /// Channel flux implied by measured counts
    pub fn flux_from_counts(&self, counts: &ChannelCounts, exposure_time: Time) -> Result<ChannelFlux> {
        flux_from_counts(counts, &self.constants, exposure_time)
    }

    /// Emitter parameters best matching an observed flux
    pub fn fit_blackbody_parameters(&self, observed_flux: &ChannelFlux) -> Result<EmitterParameters> {
        self.estimator().fit(observed_flux)
    }

    /// Same as [`Self::fit_blackbody_parameters`] with solver diagnostics
    pub fn fit_blackbody_report(&self, observed_flux: &ChannelFlux) -> Result<FitReport> {
        self.estimator().fit_report(observed_flux)
    }
}
