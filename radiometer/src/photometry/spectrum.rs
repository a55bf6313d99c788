//! Physical constants and wavelength bands shared by the photometry modules.

/// Physical constants in the CGS system
///
/// The Planck kernel works in CGS scalars because the reference flux unit
/// (erg s⁻¹ cm⁻²) is CGS.
pub struct CGS {}

impl CGS {
    /// Planck's constant
    /// Units: 6.62607015e-27 erg⋅s (erg-seconds in CGS)
    pub const PLANCK_CONSTANT: f64 = 6.62607015e-27;

    /// Speed of light in vacuum
    /// Units: 2.99792458e10 cm/s (centimeters per second in CGS)
    pub const SPEED_OF_LIGHT: f64 = 2.99792458e10;

    /// Boltzmann constant
    /// Units: 1.380649e-16 erg/K
    pub const BOLTZMANN_CONSTANT: f64 = 1.380649e-16;

    /// Centimeters per nanometer
    pub const CM_PER_NM: f64 = 1e-7;
}

/// Contiguous wavelength interval in nanometers.
///
/// Used for the calibrated range of a sensitivity table and the
/// integration limits of the channel flux integrator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    /// Lower wavelength bound in nanometers
    pub lower_nm: f64,

    /// Upper wavelength bound in nanometers
    pub upper_nm: f64,
}

impl Band {
    /// Create a new Band directly from lower and upper bounds
    ///
    /// # Panics
    /// If either bound is non-finite or negative, or if `lower_nm > upper_nm`.
    pub fn from_nm_bounds(lower_nm: f64, upper_nm: f64) -> Self {
        // These are programming errors, so we don't return Result
        if !lower_nm.is_finite() || !upper_nm.is_finite() {
            panic!("Wavelength range cannot contain non-finite values");
        }

        if lower_nm > upper_nm {
            panic!(
                "Invalid wavelength range: start must be less than end, got {}..{}",
                lower_nm, upper_nm,
            );
        }
        if lower_nm < 0.0 {
            panic!("Wavelengths must be non-negative");
        }

        Self { lower_nm, upper_nm }
    }

    /// Width of the band in nanometers
    pub fn width(&self) -> f64 {
        self.upper_nm - self.lower_nm
    }

    /// Center of the band in nanometers
    pub fn center(&self) -> f64 {
        (self.lower_nm + self.upper_nm) / 2.0
    }

    /// True if the wavelength lies inside the band, bounds included
    pub fn contains(&self, wavelength_nm: f64) -> bool {
        wavelength_nm >= self.lower_nm && wavelength_nm <= self.upper_nm
    }
}
