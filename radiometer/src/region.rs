//! Background-subtracted channel sums over rectangular image regions.
//!
//! Works on an already-demosaiced `H × W × 3` array of pixel values. A noise
//! region gives the mean per-pixel background, which is removed from the sum
//! over the source region.

use std::fmt;
use std::str::FromStr;

use ndarray::{s, ArrayView3, Axis};

use crate::error::{RadiometryError, Result};
use crate::photometry::channels::ChannelCounts;

/// Axis-aligned pixel rectangle, written `"W x H @ (X, Y)"`
///
/// `(X, Y)` is the top-left corner; X is the column and Y the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub width: usize,
    pub height: usize,
    pub x: usize,
    pub y: usize,
}

impl CropRegion {
    pub fn new(width: usize, height: usize, x: usize, y: usize) -> Self {
        Self {
            width,
            height,
            x,
            y,
        }
    }

    /// Region covering a whole image of the given size
    pub fn full(height: usize, width: usize) -> Self {
        Self::new(width, height, 0, 0)
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Check the region is non-empty and inside a `height × width` image
    fn check_within(&self, height: usize, width: usize) -> Result<()> {
        if self.pixel_count() == 0 {
            return Err(RadiometryError::InvalidParameter(format!(
                "crop region {self} is empty"
            )));
        }
        let fits_x = self.x.checked_add(self.width).is_some_and(|end| end <= width);
        let fits_y = self.y.checked_add(self.height).is_some_and(|end| end <= height);
        if !(fits_x && fits_y) {
            return Err(RadiometryError::InvalidParameter(format!(
                "crop region {self} exceeds {width} x {height} image"
            )));
        }
        Ok(())
    }
}

impl FromStr for CropRegion {
    type Err = RadiometryError;

    /// Reads the first four unsigned integers in order W, H, X, Y
    fn from_str(s: &str) -> Result<Self> {
        let numbers: Vec<&str> = s
            .split(|c: char| !c.is_ascii_digit())
            .filter(|part| !part.is_empty())
            .collect();

        if numbers.len() != 4 {
            return Err(RadiometryError::InvalidParameter(format!(
                "crop string must look like 'W x H @ (X, Y)', got '{s}'"
            )));
        }

        let mut values = [0usize; 4];
        for (slot, text) in values.iter_mut().zip(numbers) {
            *slot = text.parse().map_err(|_| {
                RadiometryError::InvalidParameter(format!("crop value '{text}' is out of range"))
            })?;
        }

        let [width, height, x, y] = values;
        Ok(Self::new(width, height, x, y))
    }
}

impl fmt::Display for CropRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x {} @ ({}, {})", self.width, self.height, self.x, self.y)
    }
}

fn region_sum(image: &ArrayView3<f64>, region: &CropRegion) -> [f64; 3] {
    let crop = image.slice(s![
        region.y..region.y + region.height,
        region.x..region.x + region.width,
        ..
    ]);
    let sums = crop.sum_axis(Axis(0)).sum_axis(Axis(0));
    [sums[0], sums[1], sums[2]]
}

/// Source-region channel sums with the mean noise level removed
///
/// # Arguments
/// * `image` - Demosaiced pixels, shape `(height, width, 3)`
/// * `noise` - Background region; `None` uses the whole image
/// * `source` - Region containing the source
///
/// # Errors
/// `InvalidParameter` if the image does not have 3 channels or a region is
/// empty or extends past the image.
pub fn background_subtracted_sum(
    image: &ArrayView3<f64>,
    noise: Option<&CropRegion>,
    source: &CropRegion,
) -> Result<ChannelCounts> {
    let (height, width, channels) = image.dim();
    if channels != 3 {
        return Err(RadiometryError::InvalidParameter(format!(
            "expected 3 color channels, found {channels}"
        )));
    }

    let noise = noise.copied().unwrap_or(CropRegion::full(height, width));
    noise.check_within(height, width)?;
    source.check_within(height, width)?;

    let noise_sum = region_sum(image, &noise);
    let source_sum = region_sum(image, source);
    let noise_pixels = noise.pixel_count() as f64;
    let source_pixels = source.pixel_count() as f64;

    let corrected: [f64; 3] =
        std::array::from_fn(|c| source_sum[c] - noise_sum[c] / noise_pixels * source_pixels);
    log::debug!(
        "Source {source} sum {source_sum:?}, noise {noise} mean/pixel {:?}, corrected {corrected:?}",
        noise_sum.map(|v| v / noise_pixels)
    );
    Ok(ChannelCounts(corrected))
}
