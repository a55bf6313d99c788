//! Command-line front end for the radiometric model
//!
//! Usage:
//! ```
//! radiometer laser --exposure 1/1017 --power-uw 4.5e-3 --wavelength-nm 632.8
//! radiometer fit --counts 1200000,340000,99000 --exposure 1/73470
//! radiometer sweep --temperatures 1000:10000:500
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use radiometer::calibration::{derive_counts_per_energy, CalibrationConstants};
use radiometer::fit::FitOptions;
use radiometer::photometry::{laser_channel_energy, ChannelCounts, CHANNEL_NAMES};
use radiometer::range_arg::RangeArg;
use radiometer::units::{
    Length, LengthExt, Power, PowerExt, Ratio, RatioExt, Temperature, TemperatureExt, Time,
    TimeExt,
};
use radiometer::Radiometer;

/// Parse an exposure time in seconds, accepting fractions like `1/1017`
fn parse_exposure(s: &str) -> Result<f64, String> {
    let value = match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().map_err(|_| format!("bad numerator '{num}'"))?;
            let den: f64 = den.trim().parse().map_err(|_| format!("bad denominator '{den}'"))?;
            num / den
        }
        None => s.trim().parse().map_err(|_| format!("bad exposure '{s}'"))?,
    };
    if !(value.is_finite() && value > 0.0) {
        return Err(format!("exposure must be positive, got {s}"));
    }
    Ok(value)
}

/// Parse `R,G,B` channel counts
fn parse_counts(s: &str) -> Result<[f64; 3], String> {
    let values: Vec<f64> = s
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|_| format!("bad count '{}'", part.trim()))
        })
        .collect::<Result<_, _>>()?;
    <[f64; 3]>::try_from(values.as_slice())
        .map_err(|_| format!("expected 3 comma-separated counts, got {}", values.len()))
}

/// Blackbody and laser radiometry for color-filter-array sensors
#[derive(Parser, Debug)]
#[command(name = "radiometer", version)]
#[command(about = "Predict sensor counts from emitters and fit blackbody parameters")]
struct Args {
    /// Sensitivity CSV (3 columns, rows from 400 nm in 10 nm steps)
    #[arg(long, global = true)]
    sensitivity: Option<PathBuf>,

    /// Calibration constants JSON file
    #[arg(long, global = true)]
    calibration: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Expected counts from a laser
    Laser {
        /// Exposure time in seconds (fractions like 1/1017 allowed)
        #[arg(long, value_parser = parse_exposure, default_value = "1/1017")]
        exposure: f64,

        /// Laser output power in microwatts
        #[arg(long, default_value_t = 4.5e-3)]
        power_uw: f64,

        /// Laser wavelength in nanometers
        #[arg(long, default_value_t = 632.8)]
        wavelength_nm: f64,
    },

    /// Expected counts from a blackbody emitter
    Blackbody {
        /// Exposure time in seconds
        #[arg(long, value_parser = parse_exposure)]
        exposure: f64,

        /// Emitter temperature in kelvin
        #[arg(long)]
        temperature_k: f64,

        /// Emitter radius over distance
        #[arg(long)]
        distance_ratio: f64,
    },

    /// Fit blackbody parameters to measured channel counts
    Fit {
        /// Background-subtracted R,G,B counts
        #[arg(long, value_parser = parse_counts)]
        counts: [f64; 3],

        /// Exposure time in seconds
        #[arg(long, value_parser = parse_exposure)]
        exposure: f64,

        /// Seed the solver from a temperature grid instead of 2700 K
        #[arg(long, default_value_t = false)]
        grid: bool,

        /// Solver iteration cap
        #[arg(long, default_value_t = 200)]
        max_iterations: usize,
    },

    /// Normalized channel colors over a temperature range
    Sweep {
        /// Temperature range in kelvin (start:stop:step)
        #[arg(long, default_value = "1000:10000:500")]
        temperatures: RangeArg,
    },

    /// Derive counts per energy from a laser exposure
    Calibrate {
        /// Measured, background-subtracted R,G,B counts
        #[arg(long, value_parser = parse_counts)]
        counts: [f64; 3],

        /// Exposure time in seconds
        #[arg(long, value_parser = parse_exposure)]
        exposure: f64,

        /// Laser output power in microwatts
        #[arg(long)]
        power_uw: f64,

        /// Laser wavelength in nanometers
        #[arg(long)]
        wavelength_nm: f64,

        /// Write updated calibration constants to this JSON file
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn print_counts(label: &str, counts: &ChannelCounts) {
    println!("{label}:");
    let rgb = counts.normalized(255.0);
    for (c, name) in CHANNEL_NAMES.iter().enumerate() {
        println!("  {name}: {:>14.4e} counts  ({:>6.1} / 255)", counts.0[c], rgb[c]);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();

    let radiometer = Radiometer::from_files(args.sensitivity.as_deref(), args.calibration.as_deref())
        .context("failed to set up sensor model")?;

    match args.command {
        Command::Laser {
            exposure,
            power_uw,
            wavelength_nm,
        } => {
            let counts = radiometer.laser_expected_counts(
                Time::from_seconds(exposure),
                Power::from_microwatts(power_uw),
                Length::from_nanometers(wavelength_nm),
            )?;
            print_counts(
                &format!("Laser {power_uw} µW at {wavelength_nm} nm, {exposure:.3e} s"),
                &counts,
            );
        }

        Command::Blackbody {
            exposure,
            temperature_k,
            distance_ratio,
        } => {
            let counts = radiometer.blackbody_expected_counts(
                Time::from_seconds(exposure),
                Temperature::from_kelvin(temperature_k),
                Ratio::from_ratio(distance_ratio),
            )?;
            print_counts(
                &format!("Blackbody {temperature_k} K, ratio {distance_ratio:.3e}, {exposure:.3e} s"),
                &counts,
            );
        }

        Command::Fit {
            counts,
            exposure,
            grid,
            max_iterations,
        } => {
            let base = if grid {
                FitOptions::with_temperature_grid()
            } else {
                FitOptions::default()
            };
            let radiometer = radiometer.with_fit_options(FitOptions {
                max_iterations,
                ..base
            });

            let flux = radiometer.flux_from_counts(&ChannelCounts(counts), Time::from_seconds(exposure))?;
            println!("Observed flux (erg/s/cm²): {:?}", flux.as_erg_per_s_cm2());

            let report = radiometer.fit_blackbody_report(&flux)?;
            println!(
                "Temperature:    {:.1} K",
                report.parameters.temperature.as_kelvin()
            );
            println!(
                "Distance ratio: {:.6e}",
                report.parameters.distance_ratio.as_ratio()
            );
            println!(
                "Solver: {:?} after {} iterations, cost {:.3e}",
                report.termination, report.iterations, report.cost
            );

            let model = radiometer
                .integrator()
                .channel_flux_for(&report.parameters)?
                .as_erg_per_s_cm2();
            let rgb = ChannelCounts(model).normalized(255.0);
            println!("Fitted color:   {:.1} {:.1} {:.1}", rgb[0], rgb[1], rgb[2]);
        }

        Command::Sweep { temperatures } => {
            println!("{:>10}  {:>6}  {:>6}  {:>6}", "T (K)", "R", "G", "B");
            for t in temperatures.values() {
                let flux = radiometer
                    .integrator()
                    .channel_flux(Temperature::from_kelvin(t), Ratio::from_ratio(1.0))
                    .with_context(|| format!("sweep failed at {t} K"))?;
                let rgb = ChannelCounts(flux.as_erg_per_s_cm2()).normalized(255.0);
                println!("{t:>10.1}  {:>6.1}  {:>6.1}  {:>6.1}", rgb[0], rgb[1], rgb[2]);
            }
        }

        Command::Calibrate {
            counts,
            exposure,
            power_uw,
            wavelength_nm,
            output,
        } => {
            let energy = laser_channel_energy(
                radiometer.curve(),
                Time::from_seconds(exposure),
                Power::from_microwatts(power_uw),
                Length::from_nanometers(wavelength_nm),
            )?;
            let counts_per_energy = derive_counts_per_energy(&ChannelCounts(counts), &energy)?;
            println!("Counts per erg: {:.4e}", counts_per_energy.as_per_erg());

            if let Some(path) = output {
                let constants =
                    CalibrationConstants::new(counts_per_energy, radiometer.constants().sensor_area)?;
                constants.save_to_file(&path)?;
                log::info!("Wrote calibration to {}", path.display());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_exposure() {
        assert_relative_eq!(parse_exposure("1/1017").unwrap(), 1.0 / 1017.0);
        assert_relative_eq!(parse_exposure("0.25").unwrap(), 0.25);
        assert!(parse_exposure("0").is_err());
        assert!(parse_exposure("1/0").is_err());
        assert!(parse_exposure("fast").is_err());
    }

    #[test]
    fn test_parse_counts() {
        assert_eq!(parse_counts("1, 2.5,3").unwrap(), [1.0, 2.5, 3.0]);
        assert!(parse_counts("1,2").is_err());
        assert!(parse_counts("1,2,x").is_err());
    }

    #[test]
    fn test_parse_fit_command() {
        let args = Args::try_parse_from([
            "radiometer",
            "fit",
            "--counts",
            "10,20,30",
            "--exposure",
            "1/73470",
            "--grid",
            "-v",
        ])
        .unwrap();
        assert_eq!(args.verbose, 1);
        match args.command {
            Command::Fit { counts, grid, .. } => {
                assert_eq!(counts, [10.0, 20.0, 30.0]);
                assert!(grid);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
