//! Converts raster images into run-length encoded, colored block text for
//! in-game text components and `text_display` entities.

pub mod encode;
pub mod format;
pub mod geometry;
pub mod sample;
pub mod session;
pub mod threshold;
pub mod wasm;

use image::{DynamicImage, GenericImageView, RgbaImage};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub use encode::{encode, Document, Segment, BLANK_GLYPH, BLOCK_GLYPH};
pub use format::{format, FormatOptions, OutputMode};
pub use geometry::{resolve, Geometry, PixelShape};
pub use sample::{sample, Smoothing};
pub use session::{Confirm, LoadOutcome, Session};
pub use threshold::{threshold, ColorGrid, HexColor, Thresholded};

#[derive(Debug, Error)]
pub enum TextImageError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("no image is loaded")]
    NoImage,
    #[error("failed to serialize text components: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid color {0:?}, expected #rrggbb")]
    InvalidColor(String),
}

/// Every user-facing setting of a conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Requested grid width; `None` derives it from the image.
    #[serde(deserialize_with = "lenient_size")]
    pub width: Option<u32>,
    #[serde(deserialize_with = "lenient_size")]
    pub height: Option<u32>,
    pub lock_aspect: bool,
    pub shape: PixelShape,
    pub smoothing: Smoothing,
    /// Alpha below this becomes a blank cell.
    #[serde(deserialize_with = "lenient_cutoff")]
    pub cutoff: u8,
    pub strip_trailing_blank: bool,
    pub mode: OutputMode,
    #[serde(deserialize_with = "lenient_scale")]
    pub scale: f64,
    pub fill_gaps: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            lock_aspect: true,
            shape: PixelShape::Font,
            smoothing: Smoothing::Off,
            cutoff: 0,
            strip_trailing_blank: false,
            mode: OutputMode::Json,
            scale: 1.0,
            fill_gaps: false,
        }
    }
}

/// A numeric setting as it may arrive from a form or a hand-written file.
#[derive(Deserialize)]
#[serde(untagged)]
enum LooseNumber {
    Int(i64),
    Float(f64),
    Text(String),
    Other(IgnoredAny),
}

impl LooseNumber {
    fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Float(value) if value.is_finite() => Some(value.trunc() as i64),
            Self::Text(text) => geometry::parse_leading_int(text),
            _ => None,
        }
    }
}

fn lenient_size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let loose = Option::<LooseNumber>::deserialize(deserializer)?;
    Ok(loose
        .and_then(|value| value.as_int())
        .filter(|value| *value > 0)
        .map(|value| value.min(i64::from(u32::MAX)) as u32))
}

fn lenient_cutoff<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let loose = Option::<LooseNumber>::deserialize(deserializer)?;
    Ok(loose
        .and_then(|value| value.as_int())
        .map_or(0, |value| value.clamp(0, 255) as u8))
}

fn lenient_scale<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let loose = Option::<LooseNumber>::deserialize(deserializer)?;
    Ok(match loose {
        Some(LooseNumber::Int(value)) => format::sanitize_scale(value as f64),
        Some(LooseNumber::Float(value)) => format::sanitize_scale(value),
        Some(LooseNumber::Text(text)) => format::parse_scale(&text),
        _ => 1.0,
    })
}

impl Config {
    pub fn geometry_for(&self, image: &DynamicImage) -> Geometry {
        let (source_width, source_height) = image.dimensions();
        resolve(
            self.width,
            self.height,
            source_width,
            source_height,
            self.lock_aspect,
            self.shape,
        )
    }

    pub fn format_options(&self) -> FormatOptions {
        FormatOptions {
            mode: self.mode,
            strip_trailing_blank: self.strip_trailing_blank,
            shape: self.shape,
            scale: self.scale,
            fill_gaps: self.fill_gaps,
        }
    }
}

/// Result of one full regeneration.
#[derive(Debug, Clone)]
pub struct Rendering {
    pub geometry: Geometry,
    pub document: Document,
    /// Sampled pixels with alpha snapped, matching what was encoded.
    pub preview: RgbaImage,
    pub text: String,
}

/// Runs resolve, sample, threshold, encode and format for one image.
pub fn render(image: &DynamicImage, config: &Config) -> Result<Rendering, TextImageError> {
    let geometry = config.geometry_for(image);
    render_at(image, config, geometry)
}

pub(crate) fn render_at(
    image: &DynamicImage,
    config: &Config,
    geometry: Geometry,
) -> Result<Rendering, TextImageError> {
    log::debug!("rendering {} with {:?}", geometry, config);

    let sampled = sample(image, geometry.width, geometry.height, config.smoothing);
    let Thresholded { colors, preview } = threshold(&sampled, config.cutoff);
    let document = encode(&colors, config.strip_trailing_blank);
    let text = format(&document, &config.format_options())?;

    Ok(Rendering {
        geometry,
        document,
        preview,
        text,
    })
}

/// Decodes `bytes` and renders them in one step.
pub fn image_to_text(bytes: &[u8], config: &Config) -> Result<String, TextImageError> {
    let image = image::load_from_memory(bytes)?;
    Ok(render(&image, config)?.text)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::png_bytes;
    use image::Rgba;

    fn two_tone() -> RgbaImage {
        RgbaImage::from_fn(4, 2, |x, _| match x {
            0 | 1 => Rgba([255, 0, 0, 255]),
            2 => Rgba([0, 0, 0, 0]),
            _ => Rgba([0, 128, 255, 255]),
        })
    }

    fn square_config() -> Config {
        Config {
            shape: PixelShape::Square,
            ..Config::default()
        }
    }

    #[test]
    fn renders_png_to_json_components() {
        let json = image_to_text(&png_bytes(&two_tone()), &square_config())
            .expect("conversion should succeed");

        let parsed: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 4);
        assert_eq!(parsed[0]["color"], "#ff0000");
        assert_eq!(parsed[1]["color"], "#0080ff");
        assert_eq!(parsed[2]["color"], "#ff0000");
        assert_eq!(parsed[3]["color"], "#0080ff");

        let row = format!("{BLOCK_GLYPH}{BLOCK_GLYPH}{BLANK_GLYPH}");
        assert_eq!(parsed[0]["text"], row.as_str());
        assert_eq!(parsed[1]["text"], format!("{BLOCK_GLYPH}\n").as_str());
    }

    #[test]
    fn render_reports_geometry_and_preview() {
        let image = DynamicImage::ImageRgba8(two_tone());
        let rendering = render(
            &image,
            &Config {
                cutoff: 128,
                ..square_config()
            },
        )
        .unwrap();

        assert_eq!((rendering.geometry.width, rendering.geometry.height), (4, 2));
        assert!(!rendering.geometry.is_overridden());
        assert_eq!(rendering.preview.dimensions(), (4, 2));
        assert!(rendering.preview.pixels().all(|p| p.0[3] == 0 || p.0[3] == 255));
        assert_eq!(rendering.document.len(), 4);
    }

    #[test]
    fn render_is_repeatable() {
        let image = DynamicImage::ImageRgba8(two_tone());
        let config = Config {
            mode: OutputMode::Command,
            fill_gaps: true,
            ..Config::default()
        };
        let first = render(&image, &config).unwrap();
        let second = render(&image, &config).unwrap();
        assert_eq!(first.text, second.text);
        assert_eq!(first.text.lines().count(), 4);
    }

    #[test]
    fn rejects_non_images() {
        let err = image_to_text(b"definitely not a png", &Config::default()).unwrap_err();
        assert!(matches!(err, TextImageError::Decode(_)));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"width": 40, "mode": "command", "shape": "square"}"#).unwrap();
        assert_eq!(config.width, Some(40));
        assert_eq!(config.mode, OutputMode::Command);
        assert_eq!(config.shape, PixelShape::Square);
        assert!(config.lock_aspect);
        assert_eq!(config.scale, 1.0);
    }

    #[test]
    fn config_numbers_fall_back_like_form_input() {
        let config: Config = serde_json::from_str(
            r#"{"width": 0, "height": "abc", "cutoff": 300, "scale": 1e40, "shape": "square"}"#,
        )
        .unwrap();
        assert_eq!(config.width, None);
        assert_eq!(config.height, None);
        assert_eq!(config.cutoff, 255);
        assert_eq!(config.scale, 1.0);

        let config: Config =
            serde_json::from_str(r#"{"width": "48px", "cutoff": -7, "scale": "0.5"}"#).unwrap();
        assert_eq!(config.width, Some(48));
        assert_eq!(config.cutoff, 0);
        assert_eq!(config.scale, 0.5);

        let config: Config = serde_json::from_str(r#"{"width": null, "cutoff": null}"#).unwrap();
        assert_eq!(config.width, None);
        assert_eq!(config.cutoff, 0);
    }

    #[test]
    fn zero_width_derives_from_source() {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(120, 80, Rgba([9, 9, 9, 255])));
        let config: Config = serde_json::from_str(r#"{"width": 0, "shape": "square"}"#).unwrap();
        let geometry = config.geometry_for(&image);
        assert_eq!((geometry.width, geometry.height), (120, 80));

        let direct = Config {
            width: Some(0),
            ..config
        };
        let geometry = direct.geometry_for(&image);
        assert_eq!((geometry.width, geometry.height), (120, 80));
    }
}
