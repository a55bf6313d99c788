//! Type-safe physical units for radiometric modeling
//!
//! This module provides strongly-typed units using the `uom` crate to prevent
//! unit confusion errors at compile time. Two quantities have no `uom` alias
//! (spectral flux per unit wavelength and counts per unit energy), so they get
//! small newtypes here that only allow dimensionally-correct arithmetic.
//!
//! Unit strings read from configuration files are checked at runtime through
//! [`parse_unit`], which reports the physical [`Dimension`] of a symbol.

use std::fmt;
use std::ops::{Add, Mul};
use std::time::Duration;

use uom::si::area::{square_centimeter, square_meter, square_millimeter};
use uom::si::energy::{erg, joule};
use uom::si::heat_flux_density::watt_per_square_meter;
use uom::si::length::{centimeter, meter, micrometer, millimeter, nanometer};
use uom::si::power::{microwatt, milliwatt, watt};
use uom::si::ratio::ratio;
use uom::si::thermodynamic_temperature::kelvin;
use uom::si::time::second;

/// Type alias for temperature with convenient methods
pub type Temperature = uom::si::f64::ThermodynamicTemperature;

/// Type alias for length measurements with convenient methods
pub type Length = uom::si::f64::Length;

/// Light-collecting area
pub type Area = uom::si::f64::Area;

/// Exposure and integration times
pub type Time = uom::si::f64::Time;

/// Radiant power (laser output)
pub type Power = uom::si::f64::Power;

/// Absorbed energy
pub type Energy = uom::si::f64::Energy;

/// Energy flux: energy per unit time per unit area
pub type EnergyFlux = uom::si::f64::HeatFluxDensity;

/// Dimensionless ratio (distance ratio, relative sensitivity)
pub type Ratio = uom::si::f64::Ratio;

/// Number of ergs in one joule
pub const ERGS_PER_JOULE: f64 = 1e7;

/// 1 erg s⁻¹ cm⁻² expressed in W m⁻²
const ERG_PER_S_CM2_IN_W_PER_M2: f64 = 1e-3;

/// 1 erg s⁻¹ cm⁻² nm⁻¹ expressed in W m⁻² m⁻¹
const ERG_PER_S_CM2_NM_IN_W_PER_M3: f64 = 1e6;

/// Extension trait for temperature conversions
pub trait TemperatureExt {
    /// Create temperature from Kelvin
    fn from_kelvin(kelvin: f64) -> Self;

    /// Get temperature in Kelvin
    fn as_kelvin(&self) -> f64;
}

/// Extension trait for length conversions commonly used in optics and sensors
pub trait LengthExt {
    /// Create length from nanometers (wavelengths)
    fn from_nanometers(nm: f64) -> Self;

    /// Get length in nanometers
    fn as_nanometers(&self) -> f64;

    /// Create length from micrometers
    fn from_micrometers(um: f64) -> Self;

    /// Get length in micrometers
    fn as_micrometers(&self) -> f64;

    /// Create length from millimeters
    fn from_millimeters(mm: f64) -> Self;

    /// Get length in millimeters
    fn as_millimeters(&self) -> f64;

    /// Create length from centimeters
    fn from_centimeters(cm: f64) -> Self;

    /// Get length in centimeters
    fn as_centimeters(&self) -> f64;

    /// Create length from meters
    fn from_meters(m: f64) -> Self;

    /// Get length in meters
    fn as_meters(&self) -> f64;
}

/// Extension trait for sensor areas
pub trait AreaExt {
    /// Create area from square millimeters
    fn from_square_millimeters(mm2: f64) -> Self;

    /// Get area in square millimeters
    fn as_square_millimeters(&self) -> f64;

    /// Create area from square centimeters
    fn from_square_centimeters(cm2: f64) -> Self;

    /// Get area in square centimeters
    fn as_square_centimeters(&self) -> f64;
}

/// Extension trait for exposure times
pub trait TimeExt {
    /// Create time from seconds
    fn from_seconds(s: f64) -> Self;

    /// Get time in seconds
    fn as_seconds(&self) -> f64;

    /// Convert a `std::time::Duration` into a typed time
    fn from_duration(duration: Duration) -> Self;
}

/// Extension trait for radiant power
pub trait PowerExt {
    /// Create power from watts
    fn from_watts(w: f64) -> Self;

    /// Get power in watts
    fn as_watts(&self) -> f64;

    /// Create power from milliwatts
    fn from_milliwatts(mw: f64) -> Self;

    /// Create power from microwatts
    fn from_microwatts(uw: f64) -> Self;

    /// Get power in microwatts
    fn as_microwatts(&self) -> f64;
}

/// Extension trait for energy in CGS and SI units
pub trait EnergyExt {
    /// Create energy from ergs
    fn from_ergs(ergs: f64) -> Self;

    /// Get energy in ergs
    fn as_ergs(&self) -> f64;

    /// Create energy from joules
    fn from_joules(j: f64) -> Self;

    /// Get energy in joules
    fn as_joules(&self) -> f64;
}

/// Extension trait for energy flux in CGS and SI units
pub trait EnergyFluxExt {
    /// Create energy flux from erg s⁻¹ cm⁻²
    fn from_erg_per_s_cm2(value: f64) -> Self;

    /// Get energy flux in erg s⁻¹ cm⁻²
    fn as_erg_per_s_cm2(&self) -> f64;

    /// Create energy flux from W m⁻²
    fn from_watts_per_square_meter(value: f64) -> Self;

    /// Get energy flux in W m⁻²
    fn as_watts_per_square_meter(&self) -> f64;
}

/// Extension trait for dimensionless ratios
pub trait RatioExt {
    /// Create a ratio from a plain fraction
    fn from_ratio(value: f64) -> Self;

    /// Get the ratio as a plain fraction
    fn as_ratio(&self) -> f64;
}

impl TemperatureExt for Temperature {
    fn from_kelvin(kelvin_value: f64) -> Self {
        Temperature::new::<kelvin>(kelvin_value)
    }

    fn as_kelvin(&self) -> f64 {
        self.get::<kelvin>()
    }
}

impl LengthExt for Length {
    fn from_nanometers(nm: f64) -> Self {
        Length::new::<nanometer>(nm)
    }

    fn as_nanometers(&self) -> f64 {
        self.get::<nanometer>()
    }

    fn from_micrometers(um: f64) -> Self {
        Length::new::<micrometer>(um)
    }

    fn as_micrometers(&self) -> f64 {
        self.get::<micrometer>()
    }

    fn from_millimeters(mm: f64) -> Self {
        Length::new::<millimeter>(mm)
    }

    fn as_millimeters(&self) -> f64 {
        self.get::<millimeter>()
    }

    fn from_centimeters(cm: f64) -> Self {
        Length::new::<centimeter>(cm)
    }

    fn as_centimeters(&self) -> f64 {
        self.get::<centimeter>()
    }

    fn from_meters(m: f64) -> Self {
        Length::new::<meter>(m)
    }

    fn as_meters(&self) -> f64 {
        self.get::<meter>()
    }
}

impl AreaExt for Area {
    fn from_square_millimeters(mm2: f64) -> Self {
        Area::new::<square_millimeter>(mm2)
    }

    fn as_square_millimeters(&self) -> f64 {
        self.get::<square_millimeter>()
    }

    fn from_square_centimeters(cm2: f64) -> Self {
        Area::new::<square_centimeter>(cm2)
    }

    fn as_square_centimeters(&self) -> f64 {
        self.get::<square_centimeter>()
    }
}

impl TimeExt for Time {
    fn from_seconds(s: f64) -> Self {
        Time::new::<second>(s)
    }

    fn as_seconds(&self) -> f64 {
        self.get::<second>()
    }

    fn from_duration(duration: Duration) -> Self {
        Time::new::<second>(duration.as_secs_f64())
    }
}

impl PowerExt for Power {
    fn from_watts(w: f64) -> Self {
        Power::new::<watt>(w)
    }

    fn as_watts(&self) -> f64 {
        self.get::<watt>()
    }

    fn from_milliwatts(mw: f64) -> Self {
        Power::new::<milliwatt>(mw)
    }

    fn from_microwatts(uw: f64) -> Self {
        Power::new::<microwatt>(uw)
    }

    fn as_microwatts(&self) -> f64 {
        self.get::<microwatt>()
    }
}

impl EnergyExt for Energy {
    fn from_ergs(ergs: f64) -> Self {
        Energy::new::<erg>(ergs)
    }

    fn as_ergs(&self) -> f64 {
        self.get::<erg>()
    }

    fn from_joules(j: f64) -> Self {
        Energy::new::<joule>(j)
    }

    fn as_joules(&self) -> f64 {
        self.get::<joule>()
    }
}

impl EnergyFluxExt for EnergyFlux {
    fn from_erg_per_s_cm2(value: f64) -> Self {
        EnergyFlux::new::<watt_per_square_meter>(value * ERG_PER_S_CM2_IN_W_PER_M2)
    }

    fn as_erg_per_s_cm2(&self) -> f64 {
        self.get::<watt_per_square_meter>() / ERG_PER_S_CM2_IN_W_PER_M2
    }

    fn from_watts_per_square_meter(value: f64) -> Self {
        EnergyFlux::new::<watt_per_square_meter>(value)
    }

    fn as_watts_per_square_meter(&self) -> f64 {
        self.get::<watt_per_square_meter>()
    }
}

impl RatioExt for Ratio {
    fn from_ratio(value: f64) -> Self {
        Ratio::new::<ratio>(value)
    }

    fn as_ratio(&self) -> f64 {
        self.get::<ratio>()
    }
}

/// Energy flux per unit wavelength (specific flux, F_λ).
///
/// Stored in SI (W m⁻² m⁻¹). Multiplying by a wavelength interval yields an
/// [`EnergyFlux`], which is the only way to leave this type besides the
/// explicit unit getters.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct SpectralFlux {
    watts_per_cubic_meter: f64,
}

impl SpectralFlux {
    pub fn zero() -> Self {
        Self::default()
    }

    /// Create specific flux from erg s⁻¹ cm⁻² nm⁻¹
    pub fn from_erg_per_s_cm2_nm(value: f64) -> Self {
        Self {
            watts_per_cubic_meter: value * ERG_PER_S_CM2_NM_IN_W_PER_M3,
        }
    }

    /// Get specific flux in erg s⁻¹ cm⁻² nm⁻¹
    pub fn as_erg_per_s_cm2_nm(&self) -> f64 {
        self.watts_per_cubic_meter / ERG_PER_S_CM2_NM_IN_W_PER_M3
    }

    /// Create specific flux from W m⁻² m⁻¹
    pub fn from_watts_per_square_meter_per_meter(value: f64) -> Self {
        Self {
            watts_per_cubic_meter: value,
        }
    }

    /// Get specific flux in W m⁻² m⁻¹
    pub fn as_watts_per_square_meter_per_meter(&self) -> f64 {
        self.watts_per_cubic_meter
    }
}

impl Add for SpectralFlux {
    type Output = SpectralFlux;

    fn add(self, rhs: SpectralFlux) -> SpectralFlux {
        SpectralFlux {
            watts_per_cubic_meter: self.watts_per_cubic_meter + rhs.watts_per_cubic_meter,
        }
    }
}

/// Scaling by a dimensionless weight (e.g. relative channel sensitivity)
impl Mul<f64> for SpectralFlux {
    type Output = SpectralFlux;

    fn mul(self, rhs: f64) -> SpectralFlux {
        SpectralFlux {
            watts_per_cubic_meter: self.watts_per_cubic_meter * rhs,
        }
    }
}

impl Mul<Length> for SpectralFlux {
    type Output = EnergyFlux;

    fn mul(self, rhs: Length) -> EnergyFlux {
        EnergyFlux::from_watts_per_square_meter(self.watts_per_cubic_meter * rhs.as_meters())
    }
}

/// Detector counts produced per unit of absorbed energy.
///
/// The product with an [`Energy`] is a plain dimensionless count, so a
/// constant of this type cannot be applied to anything but energy.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct CountsPerEnergy {
    per_joule: f64,
}

impl CountsPerEnergy {
    pub fn from_per_erg(value: f64) -> Self {
        Self {
            per_joule: value * ERGS_PER_JOULE,
        }
    }

    pub fn as_per_erg(&self) -> f64 {
        self.per_joule / ERGS_PER_JOULE
    }

    pub fn from_per_joule(value: f64) -> Self {
        Self { per_joule: value }
    }

    pub fn as_per_joule(&self) -> f64 {
        self.per_joule
    }

    /// Energy that produces the given number of counts
    pub fn energy_for_counts(&self, counts: f64) -> Energy {
        Energy::from_joules(counts / self.per_joule)
    }
}

impl Mul<Energy> for CountsPerEnergy {
    type Output = f64;

    fn mul(self, rhs: Energy) -> f64 {
        self.per_joule * rhs.as_joules()
    }
}

/// Physical dimension of a unit symbol accepted in configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Length,
    Area,
    Time,
    Temperature,
    Power,
    Energy,
    InverseEnergy,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::Length => "length",
            Dimension::Area => "area",
            Dimension::Time => "time",
            Dimension::Temperature => "temperature",
            Dimension::Power => "power",
            Dimension::Energy => "energy",
            Dimension::InverseEnergy => "inverse energy",
        };
        f.write_str(name)
    }
}

/// Look up a unit symbol, returning its dimension and the factor that
/// converts a value in that unit to SI base units.
///
/// Returns `None` for symbols this crate does not know about.
pub fn parse_unit(symbol: &str) -> Option<(Dimension, f64)> {
    let compact: String = symbol.chars().filter(|c| !c.is_whitespace()).collect();
    let unit = match compact.as_str() {
        "nm" => (Dimension::Length, 1e-9),
        "um" | "µm" => (Dimension::Length, 1e-6),
        "mm" => (Dimension::Length, 1e-3),
        "cm" => (Dimension::Length, 1e-2),
        "m" => (Dimension::Length, 1.0),
        "um^2" | "µm^2" => (Dimension::Area, 1e-12),
        "mm^2" => (Dimension::Area, 1e-6),
        "cm^2" => (Dimension::Area, 1e-4),
        "m^2" => (Dimension::Area, 1.0),
        "us" | "µs" => (Dimension::Time, 1e-6),
        "ms" => (Dimension::Time, 1e-3),
        "s" => (Dimension::Time, 1.0),
        "K" => (Dimension::Temperature, 1.0),
        "uW" | "µW" => (Dimension::Power, 1e-6),
        "mW" => (Dimension::Power, 1e-3),
        "W" => (Dimension::Power, 1.0),
        "erg/s" => (Dimension::Power, 1.0 / ERGS_PER_JOULE),
        "erg" => (Dimension::Energy, 1.0 / ERGS_PER_JOULE),
        "J" => (Dimension::Energy, 1.0),
        "1/erg" | "erg^-1" => (Dimension::InverseEnergy, ERGS_PER_JOULE),
        "1/J" | "J^-1" => (Dimension::InverseEnergy, 1.0),
        _ => return None,
    };
    Some(unit)
}

/// Build an area from a value already converted to square meters
pub(crate) fn area_from_square_meters(square_meters: f64) -> Area {
    Area::new::<square_meter>(square_meters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_temperature_conversions() {
        let temp = Temperature::from_kelvin(2700.0);
        assert_relative_eq!(temp.as_kelvin(), 2700.0, epsilon = 1e-9);
    }

    #[test]
    fn test_length_conversions() {
        // Test nanometer conversions (wavelengths)
        let wavelength = Length::from_nanometers(632.8);
        assert_relative_eq!(wavelength.as_nanometers(), 632.8, epsilon = 1e-9);
        assert_relative_eq!(wavelength.as_micrometers(), 0.6328, epsilon = 1e-12);
        assert_relative_eq!(wavelength.as_centimeters(), 6.328e-5, epsilon = 1e-15);
        assert_relative_eq!(wavelength.as_meters(), 6.328e-7, epsilon = 1e-18);

        let sensor_width = Length::from_millimeters(5.64);
        assert_relative_eq!(sensor_width.as_centimeters(), 0.564, epsilon = 1e-12);
    }

    #[test]
    fn test_sensor_area() {
        let width = Length::from_millimeters(5.64);
        let height = Length::from_millimeters(4.23);
        let area: Area = width * height;

        assert_relative_eq!(area.as_square_millimeters(), 23.8572, epsilon = 1e-9);
        assert_relative_eq!(area.as_square_centimeters(), 0.238572, epsilon = 1e-12);
    }

    #[test]
    fn test_energy_and_power() {
        let energy = Energy::from_joules(1.0);
        assert_relative_eq!(energy.as_ergs(), 1e7, epsilon = 1e-3);

        let power = Power::from_microwatts(4.5e-3);
        assert_relative_eq!(power.as_watts(), 4.5e-9, epsilon = 1e-20);

        // P * t gives energy
        let t = Time::from_seconds(2.0);
        let e: Energy = power * t;
        assert_relative_eq!(e.as_joules(), 9e-9, epsilon = 1e-20);
    }

    #[test]
    fn test_energy_flux_cgs() {
        let flux = EnergyFlux::from_erg_per_s_cm2(1000.0);
        assert_relative_eq!(flux.as_watts_per_square_meter(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(flux.as_erg_per_s_cm2(), 1000.0, epsilon = 1e-9);

        // flux * area * time is energy
        let area = Area::from_square_centimeters(2.0);
        let time = Time::from_seconds(3.0);
        let energy: Energy = flux * area * time;
        assert_relative_eq!(energy.as_ergs(), 6000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_spectral_flux_times_interval() {
        let specific = SpectralFlux::from_erg_per_s_cm2_nm(2.5);
        let flux = specific * Length::from_nanometers(4.0);
        assert_relative_eq!(flux.as_erg_per_s_cm2(), 10.0, epsilon = 1e-9);

        let scaled = specific * 0.5;
        assert_relative_eq!(scaled.as_erg_per_s_cm2_nm(), 1.25, epsilon = 1e-12);
    }

    #[test]
    fn test_counts_per_energy() {
        let cpe = CountsPerEnergy::from_per_erg(5e10);
        assert_relative_eq!(cpe.as_per_joule(), 5e17, epsilon = 1.0);

        let counts = cpe * Energy::from_ergs(2e-10);
        assert_relative_eq!(counts, 10.0, epsilon = 1e-9);

        let back = cpe.energy_for_counts(10.0);
        assert_relative_eq!(back.as_ergs(), 2e-10, epsilon = 1e-22);
    }

    #[test]
    fn test_parse_unit() {
        assert_eq!(parse_unit("mm^2").map(|u| u.0), Some(Dimension::Area));
        assert_eq!(parse_unit("mm").map(|u| u.0), Some(Dimension::Length));
        assert_eq!(
            parse_unit("1 / erg").map(|u| u.0),
            Some(Dimension::InverseEnergy)
        );
        assert_eq!(parse_unit("furlong"), None);

        let (_, factor) = parse_unit("cm^2").unwrap();
        assert_relative_eq!(factor, 1e-4);
    }
}
