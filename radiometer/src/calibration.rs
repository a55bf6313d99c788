//! Sensor calibration constants and their JSON configuration format.
//!
//! Two numbers tie predicted energy to recorded counts: the detector gain in
//! counts per unit energy, and the light-collecting area of the sensor. Both
//! ship with reference values and can be overridden from a JSON file whose
//! quantities carry explicit unit strings:
//!
//! ```json
//! {
//!   "counts_per_energy": { "value": 5e10, "unit": "1/erg" },
//!   "sensor_area": { "value": 23.8572, "unit": "mm^2" }
//! }
//! ```
//!
//! Unit strings are checked against the dimension each field requires, so a
//! file that gives the area in `mm` is rejected instead of silently misread.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{require_positive, RadiometryError, Result};
use crate::photometry::channels::{ChannelCounts, ChannelEnergy};
use crate::units::{
    area_from_square_meters, parse_unit, Area, AreaExt, CountsPerEnergy, Dimension, EnergyExt,
    Length, LengthExt,
};

/// Reference detector gain in counts per erg
pub const REFERENCE_COUNTS_PER_ERG: f64 = 5e10;

/// Reference sensor width in millimeters
pub const REFERENCE_SENSOR_WIDTH_MM: f64 = 5.64;

/// Reference sensor height in millimeters
pub const REFERENCE_SENSOR_HEIGHT_MM: f64 = 4.23;

/// A numeric value with a unit symbol, as stored in configuration files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantitySpec {
    pub value: f64,
    pub unit: String,
}

impl QuantitySpec {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }

    /// Value in SI base units, after checking the unit's dimension
    ///
    /// # Errors
    /// - `InvalidParameter` for an unknown unit or a non-positive value
    /// - `DimensionMismatch` if the unit measures something else
    pub fn to_si(&self, expected: Dimension) -> Result<f64> {
        let (found, factor) = parse_unit(&self.unit).ok_or_else(|| {
            RadiometryError::InvalidParameter(format!("unknown unit '{}'", self.unit))
        })?;
        if found != expected {
            return Err(RadiometryError::DimensionMismatch { expected, found });
        }
        require_positive(&format!("{expected} value"), self.value)?;
        Ok(self.value * factor)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CalibrationFile {
    counts_per_energy: QuantitySpec,
    sensor_area: QuantitySpec,
}

/// Detector gain and sensor area
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationConstants {
    pub counts_per_energy: CountsPerEnergy,
    pub sensor_area: Area,
}

impl CalibrationConstants {
    /// Validated constructor
    pub fn new(counts_per_energy: CountsPerEnergy, sensor_area: Area) -> Result<Self> {
        require_positive("counts per energy", counts_per_energy.as_per_joule())?;
        require_positive("sensor area", sensor_area.as_square_millimeters())?;
        Ok(Self {
            counts_per_energy,
            sensor_area,
        })
    }

    /// 5e10 counts/erg on a 5.64 mm × 4.23 mm sensor
    pub fn reference() -> Self {
        let width = Length::from_millimeters(REFERENCE_SENSOR_WIDTH_MM);
        let height = Length::from_millimeters(REFERENCE_SENSOR_HEIGHT_MM);
        Self {
            counts_per_energy: CountsPerEnergy::from_per_erg(REFERENCE_COUNTS_PER_ERG),
            sensor_area: width * height,
        }
    }

    /// Parse the JSON configuration format
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: CalibrationFile = serde_json::from_str(json)
            .map_err(|e| RadiometryError::Config(format!("invalid calibration JSON: {e}")))?;

        let per_joule = file.counts_per_energy.to_si(Dimension::InverseEnergy)?;
        let square_meters = file.sensor_area.to_si(Dimension::Area)?;

        Self::new(
            CountsPerEnergy::from_per_joule(per_joule),
            area_from_square_meters(square_meters),
        )
    }

    /// Serialize to the JSON configuration format (1/erg and mm²)
    pub fn to_json_string(&self) -> Result<String> {
        let file = CalibrationFile {
            counts_per_energy: QuantitySpec::new(self.counts_per_energy.as_per_erg(), "1/erg"),
            sensor_area: QuantitySpec::new(self.sensor_area.as_square_millimeters(), "mm^2"),
        };
        serde_json::to_string_pretty(&file)
            .map_err(|e| RadiometryError::Config(format!("cannot serialize calibration: {e}")))
    }

    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = self.to_json_string()?;
        std::fs::write(path, json)
            .map_err(|e| RadiometryError::Config(format!("cannot write {}: {e}", path.display())))
    }

    /// Load from JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| RadiometryError::Config(format!("cannot read {}: {e}", path.display())))?;
        let constants = Self::from_json_str(&json)?;
        log::info!(
            "Loaded calibration from {}: {:.3e} counts/erg, {:.4} mm²",
            path.display(),
            constants.counts_per_energy.as_per_erg(),
            constants.sensor_area.as_square_millimeters()
        );
        Ok(constants)
    }
}

impl Default for CalibrationConstants {
    fn default() -> Self {
        Self::reference()
    }
}

/// Detector gain from a measurement of a known source
///
/// Averages `counts / energy` over the channels that received energy.
///
/// # Errors
/// `InvalidParameter` if no channel has positive expected energy and finite
/// counts.
pub fn derive_counts_per_energy(
    measured_counts: &ChannelCounts,
    expected_energy: &ChannelEnergy,
) -> Result<CountsPerEnergy> {
    let ratios: Vec<f64> = measured_counts
        .0
        .iter()
        .zip(expected_energy.0.iter())
        .filter(|(counts, energy)| counts.is_finite() && energy.as_ergs() > 0.0)
        .map(|(counts, energy)| counts / energy.as_ergs())
        .collect();

    if ratios.is_empty() {
        return Err(RadiometryError::InvalidParameter(
            "no channel with positive expected energy to calibrate against".to_string(),
        ));
    }

    let mean = ratios.iter().sum::<f64>() / ratios.len() as f64;
    log::debug!("Per-channel counts/erg {ratios:?}, mean {mean:.4e}");
    Ok(CountsPerEnergy::from_per_erg(mean))
}
