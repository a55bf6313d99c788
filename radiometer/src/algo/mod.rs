//! Numerical building blocks for the radiometric model
//!
//! Shape-preserving interpolation for sparse calibration tables and a bounded
//! Levenberg–Marquardt solver for the two-parameter emitter fit.

pub mod levenberg_marquardt;
pub mod spline;

pub use levenberg_marquardt::{minimize_bounded, Bounds2, LmError, LmConfig, LmResult, Termination};
pub use spline::PchipSpline;
