//! Grid size resolution from requested and natural image dimensions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Height-to-width ratio of one block glyph in the game font.
pub const FONT_RATIO: f64 = 1.8;

/// Rendering shape of a single output cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelShape {
    Square,
    Font,
}

impl PixelShape {
    pub fn ratio(self) -> f64 {
        match self {
            Self::Square => 1.0,
            Self::Font => FONT_RATIO,
        }
    }
}

impl Default for PixelShape {
    fn default() -> Self {
        Self::Font
    }
}

impl FromStr for PixelShape {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "square" | "pixel" => Ok(Self::Square),
            "font" | "glyph" => Ok(Self::Font),
            _ => Err("pixel shape must be one of: square, font".into()),
        }
    }
}

/// Resolved output size plus the values the UI needs around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    /// Height before division by the cell ratio.
    pub unscaled_height: u32,
    pub source_width: u32,
    pub source_height: u32,
    /// Size of the on-screen outline, in preview pixels.
    pub control_width: u32,
    pub control_height: u32,
}

impl Geometry {
    pub fn cells(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn is_overridden(&self) -> bool {
        self.width != self.source_width || self.height != self.source_height
    }

    pub fn size_label(&self) -> String {
        if self.is_overridden() {
            format!(
                "{}×{} (original {}×{})",
                self.width, self.height, self.source_width, self.source_height
            )
        } else {
            format!("{}×{}", self.width, self.height)
        }
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.size_label())
    }
}

/// Computes the character grid for a source image.
///
/// With `lock_aspect` a single requested side drives the other one. When
/// both or neither are requested, the ratio comparison decides: a result
/// that is too wide gets its width recomputed from height, anything else
/// gets its height recomputed from width.
///
/// A single requested side larger than the source is kept as asked; it is
/// not snapped back to the source size by the ratio comparison.
///
/// The caller must pass a loaded image (non-zero source size).
pub fn resolve(
    requested_width: Option<u32>,
    requested_height: Option<u32>,
    source_width: u32,
    source_height: u32,
    lock_aspect: bool,
    shape: PixelShape,
) -> Geometry {
    // Zero means "derive from the image".
    let requested_width = requested_width.filter(|width| *width > 0);
    let requested_height = requested_height.filter(|height| *height > 0);
    let src_w = f64::from(source_width);
    let src_h = f64::from(source_height);
    let mut w = requested_width.map_or(src_w, f64::from);
    let mut h = requested_height.map_or(src_h, f64::from);

    if lock_aspect {
        let source_ratio = src_w / src_h;
        let current_ratio = w / h;
        let only_width = requested_width.is_some() && requested_height.is_none();
        let only_height = requested_width.is_none() && requested_height.is_some();

        if only_height || (current_ratio > source_ratio && !only_width) {
            w = h * src_w / src_h;
        } else {
            h = w * src_h / src_w;
        }
    }

    let ratio = shape.ratio();
    let control_width = requested_width.map_or(w, f64::from);
    let control_height = requested_height.map_or(h, f64::from) / ratio;

    Geometry {
        width: round_dimension(w),
        height: round_dimension(h / ratio),
        unscaled_height: round_dimension(h),
        source_width,
        source_height,
        control_width: round_dimension(control_width),
        control_height: round_dimension(control_height),
    }
}

fn round_dimension(value: f64) -> u32 {
    if value.is_finite() {
        value.round().clamp(1.0, f64::from(u32::MAX)) as u32
    } else {
        1
    }
}

/// Lenient size parse: leading integer, anything non-positive means unset.
pub fn parse_size(text: &str) -> Option<u32> {
    parse_leading_int(text)
        .filter(|value| *value > 0)
        .map(|value| value.min(i64::from(u32::MAX)) as u32)
}

/// Reads an optional sign followed by decimal digits, ignoring any tail.
pub(crate) fn parse_leading_int(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let magnitude = rest[..digits]
        .bytes()
        .fold(0i64, |acc, b| acc.saturating_mul(10).saturating_add(i64::from(b - b'0')));
    Some(if negative { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_source_size() {
        let geometry = resolve(None, None, 120, 80, true, PixelShape::Square);
        assert_eq!((geometry.width, geometry.height), (120, 80));
        assert!(!geometry.is_overridden());
        assert_eq!(geometry.size_label(), "120×80");
    }

    #[test]
    fn unlocked_sizes_are_independent() {
        let geometry = resolve(Some(30), None, 120, 80, false, PixelShape::Square);
        assert_eq!((geometry.width, geometry.height), (30, 80));

        let geometry = resolve(None, Some(10), 120, 80, false, PixelShape::Square);
        assert_eq!((geometry.width, geometry.height), (120, 10));
    }

    #[test]
    fn locked_width_derives_height() {
        let geometry = resolve(Some(60), None, 120, 80, true, PixelShape::Square);
        assert_eq!((geometry.width, geometry.height), (60, 40));
        assert_eq!(geometry.size_label(), "60×40 (original 120×80)");
    }

    #[test]
    fn locked_height_only_derives_width() {
        let geometry = resolve(None, Some(40), 120, 80, true, PixelShape::Square);
        assert_eq!((geometry.width, geometry.height), (60, 40));

        let geometry = resolve(None, Some(160), 120, 80, true, PixelShape::Square);
        assert_eq!((geometry.width, geometry.height), (240, 160));
    }

    #[test]
    fn locked_width_only_may_exceed_source() {
        let geometry = resolve(Some(240), None, 120, 80, true, PixelShape::Square);
        assert_eq!((geometry.width, geometry.height), (240, 160));
    }

    #[test]
    fn conflicting_request_follows_ratio_comparison() {
        // Too wide: width is recomputed from the requested height.
        let geometry = resolve(Some(100), Some(10), 100, 100, true, PixelShape::Square);
        assert_eq!((geometry.width, geometry.height), (10, 10));

        // Too tall: height is recomputed from the requested width.
        let geometry = resolve(Some(10), Some(100), 100, 100, true, PixelShape::Square);
        assert_eq!((geometry.width, geometry.height), (10, 10));
    }

    #[test]
    fn font_shape_divides_height() {
        let geometry = resolve(Some(90), None, 90, 90, true, PixelShape::Font);
        assert_eq!(geometry.width, 90);
        assert_eq!(geometry.height, 50);
        assert_eq!(geometry.unscaled_height, 90);
        assert_eq!(geometry.control_height, 50);
    }

    #[test]
    fn locked_ratio_holds_within_rounding() {
        for &(sw, sh) in &[(640u32, 480u32), (17, 301), (1000, 3), (333, 333)] {
            for req in [5u32, 37, 128] {
                for shape in [PixelShape::Square, PixelShape::Font] {
                    let g = resolve(Some(req), None, sw, sh, true, shape);
                    assert_eq!(g.width, req);
                    let expected = f64::from(g.width) * f64::from(sh) / f64::from(sw) / shape.ratio();
                    assert!(
                        (f64::from(g.height) - expected.max(1.0)).abs() <= 1.0,
                        "{sw}x{sh} req {req} {shape:?}: {g:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn never_resolves_to_zero() {
        let geometry = resolve(Some(1), None, 1000, 1, true, PixelShape::Font);
        assert_eq!(geometry.width, 1);
        assert_eq!(geometry.height, 1);
    }

    #[test]
    fn zero_request_counts_as_unset() {
        let geometry = resolve(Some(0), Some(0), 120, 80, true, PixelShape::Square);
        assert_eq!((geometry.width, geometry.height), (120, 80));
        assert!(!geometry.is_overridden());

        let geometry = resolve(Some(0), Some(40), 120, 80, true, PixelShape::Square);
        assert_eq!((geometry.width, geometry.height), (60, 40));
    }

    #[test]
    fn parses_sizes_leniently() {
        assert_eq!(parse_size("42"), Some(42));
        assert_eq!(parse_size("  17px"), Some(17));
        assert_eq!(parse_size("0"), None);
        assert_eq!(parse_size("-3"), None);
        assert_eq!(parse_size("abc"), None);
        assert_eq!(parse_size(""), None);
    }

    #[test]
    fn parses_pixel_shape() {
        assert_eq!("font".parse::<PixelShape>(), Ok(PixelShape::Font));
        assert_eq!("Square".parse::<PixelShape>(), Ok(PixelShape::Square));
        assert!("hex".parse::<PixelShape>().is_err());
    }
}
