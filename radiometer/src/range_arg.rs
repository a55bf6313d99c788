//! `start:stop:step` range arguments for command-line sweeps.

use std::fmt;
use std::str::FromStr;

/// Inclusive arithmetic range parsed from `"start:stop:step"`
///
/// The step sign must agree with the direction from start to stop; a range
/// with `start == stop` yields the single value.
///
/// ```rust
/// use radiometer::range_arg::RangeArg;
///
/// let temps: RangeArg = "2000:3000:500".parse().unwrap();
/// assert_eq!(temps.values(), vec![2000.0, 2500.0, 3000.0]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeArg {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl RangeArg {
    /// Validated constructor
    pub fn new(start: f64, stop: f64, step: f64) -> Result<Self, String> {
        if !(start.is_finite() && stop.is_finite() && step.is_finite()) {
            return Err("Range values must be finite".to_string());
        }
        if step == 0.0 {
            return Err("Step cannot be zero".to_string());
        }
        if (stop - start) * step < 0.0 {
            return Err(format!(
                "Step {step} moves away from stop: {start} -> {stop}"
            ));
        }
        Ok(Self { start, stop, step })
    }

    /// Number of values in the range
    pub fn len(&self) -> usize {
        // Tolerance keeps 0.1-style steps from dropping the final value
        ((self.stop - self.start) / self.step + 1e-9).floor() as usize + 1
    }

    /// Never empty; the start value is always included
    pub fn is_empty(&self) -> bool {
        false
    }

    /// All values from start toward stop, computed as `start + i·step`
    pub fn values(&self) -> Vec<f64> {
        (0..self.len())
            .map(|i| self.start + self.step * i as f64)
            .collect()
    }
}

impl FromStr for RangeArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 {
            return Err("Range must be in format 'start:stop:step'".to_string());
        }

        let parse = |name: &str, text: &str| {
            text.trim()
                .parse::<f64>()
                .map_err(|_| format!("Invalid {name} value '{}'", text.trim()))
        };
        let start = parse("start", parts[0])?;
        let stop = parse("stop", parts[1])?;
        let step = parse("step", parts[2])?;

        Self::new(start, stop, step)
    }
}

impl fmt::Display for RangeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.start, self.stop, self.step)
    }
}
