//! Conversions between channel flux, absorbed energy and detector counts.
//!
//! ```text
//! energy = flux × sensor_area × exposure_time
//! counts = counts_per_energy × energy
//! ```
//!
//! The laser path skips the flux stage: a collimated beam lands entirely on
//! the sensor, so absorbed energy is `sensitivity(λ) × power × time`.

use super::channels::{ChannelCounts, ChannelEnergy, ChannelFlux};
use super::integrator::ChannelFluxIntegrator;
use super::planck::EmitterParameters;
use super::sensitivity::SensitivityCurve;
use crate::calibration::CalibrationConstants;
use crate::error::{require_positive, RadiometryError, Result};
use crate::units::{
    Area, AreaExt, CountsPerEnergy, Energy, EnergyFlux, Length, LengthExt, Power, PowerExt, Time,
    TimeExt,
};

/// Energy absorbed per channel over an exposure
///
/// # Errors
/// `InvalidParameter` if the area or exposure time is not strictly positive.
pub fn energy_from_flux(
    channel_flux: &ChannelFlux,
    sensor_area: Area,
    exposure_time: Time,
) -> Result<ChannelEnergy> {
    require_positive("exposure time", exposure_time.as_seconds())?;
    require_positive("sensor area", sensor_area.as_square_centimeters())?;

    Ok(ChannelEnergy(
        channel_flux.0.map(|flux| -> Energy { flux * sensor_area * exposure_time }),
    ))
}

/// Detector counts produced by the absorbed energy
pub fn counts_from_energy(
    channel_energy: &ChannelEnergy,
    counts_per_energy: CountsPerEnergy,
) -> ChannelCounts {
    ChannelCounts(channel_energy.0.map(|energy| counts_per_energy * energy))
}

/// Flux that would produce the given counts; inverse of the two steps above
///
/// # Errors
/// `InvalidParameter` if the exposure time is not strictly positive or a
/// count is not finite.
pub fn flux_from_counts(
    counts: &ChannelCounts,
    constants: &CalibrationConstants,
    exposure_time: Time,
) -> Result<ChannelFlux> {
    require_positive("exposure time", exposure_time.as_seconds())?;
    if counts.0.iter().any(|c| !c.is_finite()) {
        return Err(RadiometryError::InvalidParameter(format!(
            "counts must be finite, got {:?}",
            counts.0
        )));
    }

    let area = constants.sensor_area;
    Ok(ChannelFlux(counts.0.map(|c| -> EnergyFlux {
        constants.counts_per_energy.energy_for_counts(c) / (area * exposure_time)
    })))
}

/// Energy absorbed per channel from a monochromatic source
///
/// # Errors
/// `InvalidParameter` if power, exposure time or wavelength is not strictly
/// positive, or the wavelength lies outside the calibrated band.
pub fn laser_channel_energy(
    curve: &SensitivityCurve,
    exposure_time: Time,
    laser_power: Power,
    wavelength: Length,
) -> Result<ChannelEnergy> {
    require_positive("laser power", laser_power.as_watts())?;
    require_positive("exposure time", exposure_time.as_seconds())?;
    require_positive("laser wavelength", wavelength.as_nanometers())?;

    let band = curve.band();
    if !band.contains(wavelength.as_nanometers()) {
        return Err(RadiometryError::InvalidParameter(format!(
            "laser wavelength {:.1} nm is outside the calibrated {:.0}-{:.0} nm band",
            wavelength.as_nanometers(),
            band.lower_nm,
            band.upper_nm
        )));
    }

    let emitted: Energy = laser_power * exposure_time;
    let sensitivity = curve.sensitivity_at(wavelength);
    Ok(ChannelEnergy(sensitivity.map(|s| emitted * s)))
}

/// Energy absorbed per channel from a blackbody emitter
pub fn blackbody_channel_energy(
    integrator: &ChannelFluxIntegrator,
    constants: &CalibrationConstants,
    exposure_time: Time,
    parameters: &EmitterParameters,
) -> Result<ChannelEnergy> {
    let flux = integrator.channel_flux_for(parameters)?;
    energy_from_flux(&flux, constants.sensor_area, exposure_time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{EnergyExt, EnergyFluxExt};
    use approx::assert_relative_eq;

    #[test]
    fn test_energy_from_flux() {
        let flux = ChannelFlux::from_erg_per_s_cm2([10.0, 20.0, 40.0]);
        let energy = energy_from_flux(
            &flux,
            Area::from_square_centimeters(0.5),
            Time::from_seconds(2.0),
        )
        .unwrap();
        let ergs = energy.as_ergs();
        assert_relative_eq!(ergs[0], 10.0, max_relative = 1e-12);
        assert_relative_eq!(ergs[1], 20.0, max_relative = 1e-12);
        assert_relative_eq!(ergs[2], 40.0, max_relative = 1e-12);
    }

    #[test]
    fn test_zero_exposure_rejected() {
        let flux = ChannelFlux::from_erg_per_s_cm2([1.0; 3]);
        let err = energy_from_flux(&flux, Area::from_square_millimeters(1.0), Time::from_seconds(0.0))
            .unwrap_err();
        assert!(matches!(err, RadiometryError::InvalidParameter(_)));

        let err = energy_from_flux(&flux, Area::from_square_millimeters(0.0), Time::from_seconds(1.0))
            .unwrap_err();
        assert!(matches!(err, RadiometryError::InvalidParameter(_)));
    }

    #[test]
    fn test_counts_from_energy() {
        let energy = ChannelEnergy::from_ergs([1e-10, 2e-10, 0.0]);
        let counts = counts_from_energy(&energy, CountsPerEnergy::from_per_erg(5e10));
        assert_relative_eq!(counts.0[0], 5.0, max_relative = 1e-12);
        assert_relative_eq!(counts.0[1], 10.0, max_relative = 1e-12);
        assert_eq!(counts.0[2], 0.0);
    }

    #[test]
    fn test_counts_flux_round_trip() {
        let constants = CalibrationConstants::reference();
        let exposure = Time::from_seconds(1.0 / 1017.0);
        let counts = ChannelCounts([1.2e6, 3.4e5, 9.9e4]);

        let flux = flux_from_counts(&counts, &constants, exposure).unwrap();
        let energy = energy_from_flux(&flux, constants.sensor_area, exposure).unwrap();
        let back = counts_from_energy(&energy, constants.counts_per_energy);

        for (a, b) in counts.0.iter().zip(back.0) {
            assert_relative_eq!(*a, b, max_relative = 1e-10);
        }
    }

    #[test]
    fn test_flux_from_counts_value() {
        // 5e10 counts = 1 erg; over 1 cm² and 1 s that is 1 erg/s/cm²
        let constants = CalibrationConstants::new(
            CountsPerEnergy::from_per_erg(5e10),
            Area::from_square_centimeters(1.0),
        )
        .unwrap();
        let flux = flux_from_counts(&ChannelCounts([5e10; 3]), &constants, Time::from_seconds(1.0))
            .unwrap();
        assert_relative_eq!(flux.0[0].as_erg_per_s_cm2(), 1.0, max_relative = 1e-12);
    }

    #[test]
    fn test_laser_energy_uses_point_sensitivity() {
        let curve = SensitivityCurve::bundled().unwrap();
        let wavelength = Length::from_nanometers(632.8);
        let energy = laser_channel_energy(
            &curve,
            Time::from_seconds(2.0),
            Power::from_microwatts(1.0),
            wavelength,
        )
        .unwrap();

        let s = curve.sensitivity_at(wavelength);
        // 1 µW × 2 s = 2e-6 J = 20 erg
        for (c, e) in energy.as_ergs().iter().enumerate() {
            assert_relative_eq!(*e, 20.0 * s[c], max_relative = 1e-12);
        }
        assert!(energy.0[0].as_ergs() > energy.0[1].as_ergs());
    }

    #[test]
    fn test_laser_rejects_non_positive_inputs() {
        let curve = SensitivityCurve::bundled().unwrap();
        let wl = Length::from_nanometers(632.8);
        assert!(laser_channel_energy(&curve, Time::from_seconds(1.0), Power::from_watts(0.0), wl)
            .is_err());
        assert!(laser_channel_energy(&curve, Time::from_seconds(-1.0), Power::from_watts(1.0), wl)
            .is_err());
    }

    #[test]
    fn test_laser_outside_band_rejected() {
        let curve = SensitivityCurve::bundled().unwrap();
        let t = Time::from_seconds(1.0);
        let p = Power::from_microwatts(1.0);

        for nm in [380.0, 700.5, 780.0] {
            let err = laser_channel_energy(&curve, t, p, Length::from_nanometers(nm)).unwrap_err();
            assert!(matches!(err, RadiometryError::InvalidParameter(_)), "{nm} nm");
        }

        // Band edges are calibrated samples
        assert!(laser_channel_energy(&curve, t, p, Length::from_nanometers(400.0)).is_ok());
        assert!(laser_channel_energy(&curve, t, p, Length::from_nanometers(700.0)).is_ok());
    }
}
