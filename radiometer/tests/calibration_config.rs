//! Calibration constants from JSON files and the counts/flux round trip.

mod common;

use approx::assert_relative_eq;
use radiometer::calibration::CalibrationConstants;
use radiometer::photometry::{counts_from_energy, energy_from_flux, flux_from_counts};
use radiometer::units::*;
use radiometer::{
    background_subtracted_sum, derive_counts_per_energy, ChannelCounts, CropRegion,
    RadiometryError, Radiometer,
};
use std::path::Path;

fn write_config(dir: &Path, json: &str) -> std::path::PathBuf {
    let path = dir.join("calibration.json");
    std::fs::write(&path, json).unwrap();
    path
}

#[test]
fn test_config_file_overrides_reference() {
    common::init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"{"counts_per_energy":{"value":2.5e10,"unit":"1/erg"},
            "sensor_area":{"value":23.8572,"unit":"mm^2"}}"#,
    );

    let radiometer = Radiometer::from_files(None, Some(&path)).unwrap();
    let reference = Radiometer::reference().unwrap();

    let args = (
        Time::from_seconds(1e-3),
        Power::from_microwatts(1.0),
        Length::from_nanometers(550.0),
    );
    let halved = radiometer.laser_expected_counts(args.0, args.1, args.2).unwrap();
    let full = reference.laser_expected_counts(args.0, args.1, args.2).unwrap();
    for c in 0..3 {
        assert_relative_eq!(halved.0[c], full.0[c] / 2.0, max_relative = 1e-12);
    }
}

#[test]
fn test_wrong_dimension_in_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"{"counts_per_energy":{"value":5e10,"unit":"1/erg"},
            "sensor_area":{"value":5.64,"unit":"mm"}}"#,
    );

    let err = CalibrationConstants::load_from_file(&path).unwrap_err();
    assert!(matches!(err, RadiometryError::DimensionMismatch { .. }));
    assert_eq!(err.to_string(), "dimension mismatch: expected area, found length");
}

#[test]
fn test_missing_sensitivity_file_is_load_error() {
    let err = Radiometer::from_files(Some(Path::new("/nonexistent/table.csv")), None).unwrap_err();
    assert!(matches!(err, RadiometryError::CalibrationLoad(_)));
}

#[test]
fn test_counts_flux_counts_round_trip() {
    let constants = CalibrationConstants::reference();
    let exposure = Time::from_seconds(1.0 / 73470.0);
    let counts = ChannelCounts([8.1e5, 2.2e5, 4.0e4]);

    let flux = flux_from_counts(&counts, &constants, exposure).unwrap();
    let energy = energy_from_flux(&flux, constants.sensor_area, exposure).unwrap();
    let back = counts_from_energy(&energy, constants.counts_per_energy);

    for c in 0..3 {
        assert_relative_eq!(back.0[c], counts.0[c], max_relative = 1e-10);
    }
}

#[test]
fn test_laser_calibration_recovers_gain() {
    // Synthetic measurement produced with a known gain is calibrated back to it
    let radiometer = Radiometer::reference().unwrap();
    let exposure = Time::from_seconds(1.0 / 1017.0);
    let power = Power::from_microwatts(450e-5);
    let wavelength = Length::from_nanometers(632.8);

    let measured = radiometer
        .laser_expected_counts(exposure, power, wavelength)
        .unwrap();
    let energy = radiometer::photometry::laser_channel_energy(
        radiometer.curve(),
        exposure,
        power,
        wavelength,
    )
    .unwrap();

    let gain = derive_counts_per_energy(&measured, &energy).unwrap();
    assert_relative_eq!(gain.as_per_erg(), 5e10, max_relative = 1e-10);
}

#[test]
fn test_region_sum_feeds_calibration() {
    // 6 × 5 image, background 2 counts/pixel/channel, 2 × 2 spot adding 50 red
    let mut image = ndarray::Array3::from_elem((5, 6, 3), 2.0);
    for y in 1..3 {
        for x in 3..5 {
            image[[y, x, 0]] += 50.0;
        }
    }

    let noise: CropRegion = "2 x 5 @ (0, 0)".parse().unwrap();
    let source: CropRegion = "2 x 2 @ (3, 1)".parse().unwrap();
    let sum = background_subtracted_sum(&image.view(), Some(&noise), &source).unwrap();

    assert_relative_eq!(sum.0[0], 200.0, epsilon = 1e-12);
    assert_relative_eq!(sum.0[1], 0.0, epsilon = 1e-12);
    assert_eq!(sum.dominant_channel(), 0);
}
