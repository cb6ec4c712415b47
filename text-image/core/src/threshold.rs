//! Alpha cutoff: every sampled pixel becomes either transparent or an opaque
//! `#rrggbb` color, and the preview buffer is normalized to match.

use std::fmt;
use std::str::FromStr;

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::geometry::parse_leading_int;
use crate::TextImageError;

/// Opaque RGB color, written as lowercase `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(pub [u8; 3]);

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

impl FromStr for HexColor {
    type Err = TextImageError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || TextImageError::InvalidColor(value.to_string());
        let digits = value.strip_prefix('#').ok_or_else(invalid)?;
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl TryFrom<String> for HexColor {
    type Error = TextImageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.to_string()
    }
}

/// Row-major grid of thresholded cells; `None` is transparent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorGrid {
    width: u32,
    height: u32,
    cells: Vec<Option<HexColor>>,
}

impl ColorGrid {
    /// Builds a grid from row-major cells. Returns `None` if the cell count
    /// does not match `width * height`.
    pub fn new(width: u32, height: u32, cells: Vec<Option<HexColor>>) -> Option<Self> {
        (cells.len() as u64 == u64::from(width) * u64::from(height)).then_some(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Option<HexColor>]> {
        // chunks(0) panics; an empty grid simply has no rows.
        self.cells.chunks(self.width.max(1) as usize)
    }
}

/// Both products of thresholding a sampled buffer.
#[derive(Debug, Clone)]
pub struct Thresholded {
    pub colors: ColorGrid,
    /// Copy of the input with every alpha snapped to 0 or 255.
    pub preview: RgbaImage,
}

/// Decides one cell and snaps its alpha in place.
///
/// Fully transparent pixels never survive, so a cutoff of 0 drops exactly
/// the alpha-0 pixels.
pub fn threshold_pixel(pixel: &mut Rgba<u8>, cutoff: u8) -> Option<HexColor> {
    let [r, g, b, a] = pixel.0;
    if a == 0 || a < cutoff {
        pixel.0[3] = 0;
        None
    } else {
        pixel.0[3] = 255;
        Some(HexColor([r, g, b]))
    }
}

pub fn threshold(buffer: &RgbaImage, cutoff: u8) -> Thresholded {
    let mut preview = buffer.clone();
    let cells = preview
        .pixels_mut()
        .map(|pixel| threshold_pixel(pixel, cutoff))
        .collect();
    let (width, height) = preview.dimensions();

    Thresholded {
        colors: ColorGrid {
            width,
            height,
            cells,
        },
        preview,
    }
}

/// Lenient cutoff parse; anything unusable is 0.
pub fn parse_cutoff(text: &str) -> u8 {
    parse_leading_int(text).map_or(0, |value| value.clamp(0, 255) as u8)
}
