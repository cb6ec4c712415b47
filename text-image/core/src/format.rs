//! Output grammars: JSON text components, quoted SNBT, and a full
//! `summon text_display` command.

use std::fmt::Write as FmtWrite;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::encode::Document;
use crate::geometry::PixelShape;
use crate::TextImageError;

/// Largest NBT int; the game has no practical cap on `line_width`.
pub const UNBOUNDED_LINE_WIDTH: i32 = i32::MAX;

/// Gap-fill offsets in blocks, before scaling.
pub const GAP_OFFSET_X: f64 = 0.025;
pub const GAP_OFFSET_Y: f64 = 0.0756;

const IDENTITY_ROTATION: &str = "[0f,0f,0f,1f]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Json,
    Quoted,
    Command,
}

impl Default for OutputMode {
    fn default() -> Self {
        Self::Json
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "quoted" | "snbt" => Ok(Self::Quoted),
            "command" | "summon" => Ok(Self::Command),
            _ => Err("mode must be one of: json, quoted, command".into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormatOptions {
    pub mode: OutputMode,
    /// Also selects left alignment in command mode.
    pub strip_trailing_blank: bool,
    pub shape: PixelShape,
    pub scale: f64,
    pub fill_gaps: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            mode: OutputMode::Json,
            strip_trailing_blank: false,
            shape: PixelShape::default(),
            scale: 1.0,
            fill_gaps: false,
        }
    }
}

pub fn format(document: &Document, options: &FormatOptions) -> Result<String, TextImageError> {
    let json = serde_json::to_string(document)?;
    let output = match options.mode {
        OutputMode::Json => json,
        OutputMode::Quoted => quote(&json),
        OutputMode::Command => summon_commands(&quote(&json), options),
    };
    Ok(output)
}

/// Wraps JSON in a single-quoted SNBT string.
fn quote(json: &str) -> String {
    let mut quoted = String::with_capacity(json.len() + 2);
    quoted.push('\'');
    quoted.push_str(&json.replace('\\', "\\\\"));
    quoted.push('\'');
    quoted
}

fn summon_commands(text: &str, options: &FormatOptions) -> String {
    let scale_x = sanitize_scale(options.scale);
    let scale_y = scale_x / options.shape.ratio();

    if !options.fill_gaps {
        return summon_command(text, options, [scale_x, scale_y], [0.0, 0.0]);
    }

    let dx = GAP_OFFSET_X * scale_x;
    let dy = GAP_OFFSET_Y * scale_y;
    [[0.0, 0.0], [0.0, dy], [dx, 0.0], [dx, dy]]
        .iter()
        .map(|&offset| summon_command(text, options, [scale_x, scale_y], offset))
        .collect::<Vec<_>>()
        .join("\n")
}

fn summon_command(text: &str, options: &FormatOptions, scale: [f64; 2], offset: [f64; 2]) -> String {
    let alignment = if options.strip_trailing_blank {
        "left"
    } else {
        "center"
    };

    let mut command = String::with_capacity(text.len() + 256);
    write!(
        command,
        "summon text_display ~ ~ ~ {{alignment:\"{alignment}\",background:0,line_width:{width},\
         transformation:{{scale:[{sx},{sy},1f],left_rotation:{rot},right_rotation:{rot},\
         translation:[{tx},{ty},0f]}},text:{text}}}",
        width = UNBOUNDED_LINE_WIDTH,
        sx = snbt_float(scale[0]),
        sy = snbt_float(scale[1]),
        rot = IDENTITY_ROTATION,
        tx = snbt_float(offset[0]),
        ty = snbt_float(offset[1]),
    )
    .ok();
    command
}

fn snbt_float(value: f64) -> String {
    format!("{}f", value as f32)
}

/// Any scale that does not survive the `f32` conversion of the output is 1.0.
pub(crate) fn sanitize_scale(scale: f64) -> f64 {
    if (scale as f32).is_finite() {
        scale
    } else {
        1.0
    }
}

/// Lenient scale parse; unusable input is 1.0.
pub fn parse_scale(text: &str) -> f64 {
    text.trim()
        .parse::<f64>()
        .ok()
        .map_or(1.0, sanitize_scale)
}
