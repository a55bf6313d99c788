//! Per-channel spectral sensitivity of a color-filter-array sensor.
//!
//! A sensitivity table gives the relative response of the red, green and blue
//! channels at a set of calibrated wavelengths. Between samples the response is
//! interpolated with a shape-preserving cubic ([`PchipSpline`]) per channel, so
//! the curve never dips below a local minimum of the data or rises above a
//! local maximum.
//!
//! # Table Format
//!
//! The on-disk format is an unlabeled CSV with three numeric columns (R, G, B).
//! Row *i* is the response at `400 + 10·i` nm:
//!
//! ```text
//! 0.020,0.030,0.180
//! 0.025,0.045,0.330
//! ...
//! ```
//!
//! The file holds exactly 31 rows covering 400-700 nm. Blank lines and lines
//! starting with `#` are ignored.
//!
//! # Example
//!
//! ```rust
//! use radiometer::photometry::SensitivityCurve;
//! use radiometer::units::{Length, LengthExt};
//!
//! let curve = SensitivityCurve::bundled().unwrap();
//! let [r, g, b] = curve.sensitivity_at(Length::from_nanometers(632.8));
//! assert!(r > g && r > b);
//! ```

use std::path::{Path, PathBuf};

use ndarray::Array2;
use thiserror::Error;

use super::spectrum::Band;
use crate::algo::spline::PchipSpline;
use crate::units::{Length, LengthExt};

/// Wavelength of the first row of a sensitivity CSV
pub const TABLE_START_NM: f64 = 400.0;

/// Wavelength spacing between CSV rows
pub const TABLE_STEP_NM: f64 = 10.0;

/// Rows in a sensitivity CSV, 400 to 700 nm inclusive
pub const TABLE_ROWS: usize = 31;

/// Number of color channels (R, G, B)
pub const CHANNEL_COUNT: usize = 3;

const BUNDLED_TABLE: &str = include_str!("../../data/pixel4_sensitivity.csv");

/// Errors that can occur while loading a sensitivity table
#[derive(Debug, Error)]
pub enum SensitivityError {
    #[error("failed to read sensitivity table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: expected 3 columns, found {found}")]
    ColumnCount { line: usize, found: usize },

    #[error("line {line}: {source}")]
    Csv {
        line: usize,
        #[source]
        source: csv::Error,
    },

    #[error("sensitivity table must have {expected} rows (400-700 nm), found {found}")]
    RowCount { expected: usize, found: usize },

    #[error("line {line}: sensitivity values must be finite")]
    NonFinite { line: usize },

    #[error("Wavelength and response vectors must have the same length")]
    LengthMismatch,

    #[error("need at least 2 rows for interpolation, found {0}")]
    TooFewRows(usize),

    #[error("Wavelengths must be in strictly ascending order")]
    NotAscending,
}

fn error_line(err: &csv::Error) -> usize {
    err.position().map_or(0, |pos| pos.line() as usize)
}

/// Relative spectral response of the three sensor channels.
///
/// Immutable after construction and cheap to share by reference between
/// threads. There is no global instance; every consumer is handed one.
#[derive(Debug, Clone)]
pub struct SensitivityCurve {
    /// Calibrated wavelengths in nanometers
    wavelengths_nm: Vec<f64>,

    /// One interpolant per channel, in R, G, B order
    channels: [PchipSpline; CHANNEL_COUNT],
}

impl SensitivityCurve {
    /// Build a curve from explicit samples
    ///
    /// # Arguments
    /// * `wavelengths` - Sample wavelengths, strictly ascending
    /// * `responses` - `[R, G, B]` response at each wavelength
    pub fn from_table(
        wavelengths: &[Length],
        responses: &[[f64; CHANNEL_COUNT]],
    ) -> Result<Self, SensitivityError> {
        if wavelengths.len() != responses.len() {
            return Err(SensitivityError::LengthMismatch);
        }
        if wavelengths.len() < 2 {
            return Err(SensitivityError::TooFewRows(wavelengths.len()));
        }

        let wavelengths_nm: Vec<f64> = wavelengths.iter().map(|w| w.as_nanometers()).collect();

        for (i, pair) in wavelengths_nm.windows(2).enumerate() {
            if !pair[0].is_finite() || !pair[1].is_finite() || pair[1] <= pair[0] {
                log::debug!("wavelength {} not above {} at row {}", pair[1], pair[0], i + 1);
                return Err(SensitivityError::NotAscending);
            }
        }

        for (i, row) in responses.iter().enumerate() {
            if row.iter().any(|v| !v.is_finite()) {
                return Err(SensitivityError::NonFinite { line: i + 1 });
            }
        }

        let channels = [0, 1, 2].map(|c| {
            let column: Vec<f64> = responses.iter().map(|row| row[c]).collect();
            PchipSpline::new(wavelengths_nm.clone(), column)
        });

        Ok(Self {
            wavelengths_nm,
            channels,
        })
    }

    /// Parse the unlabeled three-column CSV format
    ///
    /// Cells may be quoted and padded with whitespace. A leading byte-order
    /// mark is skipped. The table must have exactly [`TABLE_ROWS`] rows.
    pub fn from_csv_str(contents: &str) -> Result<Self, SensitivityError> {
        let contents = contents.strip_prefix('\u{feff}').unwrap_or(contents);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(contents.as_bytes());

        let mut responses: Vec<[f64; CHANNEL_COUNT]> = Vec::with_capacity(TABLE_ROWS);
        for record in reader.records() {
            let record = record.map_err(|source| SensitivityError::Csv {
                line: error_line(&source),
                source,
            })?;
            let line = record.position().map_or(0, |pos| pos.line() as usize);

            if record.len() != CHANNEL_COUNT {
                return Err(SensitivityError::ColumnCount {
                    line,
                    found: record.len(),
                });
            }

            let row: [f64; CHANNEL_COUNT] = record
                .deserialize(None)
                .map_err(|source| SensitivityError::Csv { line, source })?;
            if row.iter().any(|v| !v.is_finite()) {
                return Err(SensitivityError::NonFinite { line });
            }
            responses.push(row);
        }

        if responses.len() != TABLE_ROWS {
            return Err(SensitivityError::RowCount {
                expected: TABLE_ROWS,
                found: responses.len(),
            });
        }

        let wavelengths: Vec<Length> = (0..responses.len())
            .map(|i| Length::from_nanometers(TABLE_START_NM + TABLE_STEP_NM * i as f64))
            .collect();

        Self::from_table(&wavelengths, &responses)
    }

    /// Read and parse a sensitivity CSV from disk
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, SensitivityError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| SensitivityError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let curve = Self::from_csv_str(&contents)?;
        log::info!(
            "Loaded sensitivity table {} ({} rows, {:.0}-{:.0} nm)",
            path.display(),
            curve.len(),
            curve.band().lower_nm,
            curve.band().upper_nm
        );
        Ok(curve)
    }

    /// Reference table compiled into the crate
    pub fn bundled() -> Result<Self, SensitivityError> {
        Self::from_csv_str(BUNDLED_TABLE)
    }

    /// Calibrated wavelength range
    pub fn band(&self) -> Band {
        Band::from_nm_bounds(
            self.wavelengths_nm[0],
            self.wavelengths_nm[self.wavelengths_nm.len() - 1],
        )
    }

    /// Number of calibrated samples
    pub fn len(&self) -> usize {
        self.wavelengths_nm.len()
    }

    /// Always false; construction requires at least two samples
    pub fn is_empty(&self) -> bool {
        self.wavelengths_nm.is_empty()
    }

    /// Interpolated `[R, G, B]` response at one wavelength
    ///
    /// Wavelengths outside [`Self::band`] use the boundary segment's cubic and
    /// may come back negative or above the table maximum.
    pub fn sensitivity_at(&self, wavelength: Length) -> [f64; CHANNEL_COUNT] {
        let nm = wavelength.as_nanometers();
        [
            self.channels[0].evaluate(nm),
            self.channels[1].evaluate(nm),
            self.channels[2].evaluate(nm),
        ]
    }

    /// Interpolated responses for many wavelengths, one row per wavelength
    pub fn sensitivities_at(&self, wavelengths: &[Length]) -> Array2<f64> {
        let mut out = Array2::zeros((wavelengths.len(), CHANNEL_COUNT));
        for (mut row, wavelength) in out.rows_mut().into_iter().zip(wavelengths) {
            let values = self.sensitivity_at(*wavelength);
            for (cell, value) in row.iter_mut().zip(values) {
                *cell = value;
            }
        }
        out
    }
}
