use std::str::FromStr;

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};

/// Grids above this many cells need an explicit go-ahead before rendering.
pub const LARGE_OUTPUT_CELLS: u64 = 100_000;

/// Requested width/height restored when a fresh image is declined as too large.
pub const SAFE_DEFAULT_SIZE: (u32, u32) = (60, 100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Smoothing {
    Off,
    Low,
    Medium,
    High,
}

impl Smoothing {
    fn filter(self) -> FilterType {
        match self {
            Self::Off => FilterType::Nearest,
            Self::Low => FilterType::Triangle,
            Self::Medium => FilterType::CatmullRom,
            Self::High => FilterType::Lanczos3,
        }
    }
}

impl Default for Smoothing {
    fn default() -> Self {
        Self::Off
    }
}

impl FromStr for Smoothing {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "" | "off" | "none" => Ok(Self::Off),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err("smoothing must be one of: off, low, medium, high".into()),
        }
    }
}

/// Resamples `image` to exactly `width` x `height` RGBA pixels.
pub fn sample(image: &DynamicImage, width: u32, height: u32, smoothing: Smoothing) -> RgbaImage {
    let rgba = image.to_rgba8();
    if rgba.dimensions() == (width, height) {
        return rgba;
    }
    imageops::resize(&rgba, width, height, smoothing.filter())
}
