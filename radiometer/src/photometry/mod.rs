//! Radiometric forward model: sensitivity, blackbody flux, band integration
//! and energy/count conversion.

pub mod channels;
pub mod energy;
pub mod integrator;
pub mod planck;
pub mod sensitivity;
pub mod spectrum;
pub mod trapezoid;

pub use channels::{
    ChannelCounts, ChannelEnergy, ChannelFlux, CHANNEL_BLUE, CHANNEL_GREEN, CHANNEL_NAMES,
    CHANNEL_RED,
};
pub use energy::{
    blackbody_channel_energy, counts_from_energy, energy_from_flux, flux_from_counts,
    laser_channel_energy,
};
pub use integrator::{ChannelFluxIntegrator, WavelengthGrid};
pub use planck::{specific_flux, EmitterParameters};
pub use sensitivity::{SensitivityCurve, SensitivityError};
pub use spectrum::{Band, CGS};
pub use trapezoid::trap_integrate;
