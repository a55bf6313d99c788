//! Common setup for radiometer integration tests
#![allow(dead_code)]

use radiometer::units::{Ratio, RatioExt, Temperature, TemperatureExt};
use radiometer::{ChannelFlux, ChannelFluxIntegrator, SensitivityCurve};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Integrator over the bundled table on the reference grid
pub fn reference_integrator() -> ChannelFluxIntegrator {
    let curve = SensitivityCurve::bundled().expect("bundled table loads");
    ChannelFluxIntegrator::new(&curve)
}

/// Noise-free synthetic observation
pub fn synthetic_flux(integrator: &ChannelFluxIntegrator, kelvin: f64, ratio: f64) -> ChannelFlux {
    integrator
        .channel_flux(Temperature::from_kelvin(kelvin), Ratio::from_ratio(ratio))
        .expect("valid emitter parameters")
}
