//! Three-channel (R, G, B) containers for flux, energy and counts.
//!
//! Channel order is positional: index 0 is red, 1 green, 2 blue.

use crate::units::{Energy, EnergyExt, EnergyFlux, EnergyFluxExt};

pub const CHANNEL_RED: usize = 0;
pub const CHANNEL_GREEN: usize = 1;
pub const CHANNEL_BLUE: usize = 2;

/// Channel names in index order, for reports
pub const CHANNEL_NAMES: [&str; 3] = ["R", "G", "B"];

/// Detected energy flux per channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelFlux(pub [EnergyFlux; 3]);

impl ChannelFlux {
    pub fn from_erg_per_s_cm2(values: [f64; 3]) -> Self {
        Self(values.map(EnergyFlux::from_erg_per_s_cm2))
    }

    pub fn as_erg_per_s_cm2(&self) -> [f64; 3] {
        self.0.map(|f| f.as_erg_per_s_cm2())
    }

    /// Sum over all channels
    pub fn total(&self) -> EnergyFlux {
        self.0[0] + self.0[1] + self.0[2]
    }
}

/// Absorbed energy per channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelEnergy(pub [Energy; 3]);

impl ChannelEnergy {
    pub fn from_ergs(values: [f64; 3]) -> Self {
        Self(values.map(Energy::from_ergs))
    }

    pub fn as_ergs(&self) -> [f64; 3] {
        self.0.map(|e| e.as_ergs())
    }
}

/// Dimensionless detector counts per channel
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelCounts(pub [f64; 3]);

impl ChannelCounts {
    /// Largest channel value
    pub fn max(&self) -> f64 {
        self.0.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Rescale so the brightest channel equals `scale`
    ///
    /// All-zero counts stay zero.
    pub fn normalized(&self, scale: f64) -> [f64; 3] {
        let max = self.max();
        if max > 0.0 {
            self.0.map(|c| c / max * scale)
        } else {
            [0.0; 3]
        }
    }

    /// Index of the brightest channel
    pub fn dominant_channel(&self) -> usize {
        let mut best = 0;
        for c in 1..3 {
            if self.0[c] > self.0[best] {
                best = c;
            }
        }
        best
    }
}

impl From<[f64; 3]> for ChannelCounts {
    fn from(values: [f64; 3]) -> Self {
        Self(values)
    }
}
