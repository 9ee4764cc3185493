//! Background colour parameters.
//!
//! Accepted forms: a few CSS names, `#rgb` / `#rrggbb` / `#rrggbbaa`, the same
//! hex digits behind an `rgb:` prefix, or bare hex digits. Anything else,
//! including numeric values, falls back to the operation's default.

use image::Rgba;
use tracing::debug;

use mf_core::ParamValue;

pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Resolve an optional colour parameter, using `default` when it is absent or
/// not understood.
pub fn parse_color(value: Option<&ParamValue>, default: Rgba<u8>) -> Rgba<u8> {
    match value {
        Some(ParamValue::Text(text)) => parse_color_text(text).unwrap_or_else(|| {
            debug!("Unrecognised colour '{text}'; using default");
            default
        }),
        _ => default,
    }
}

fn parse_color_text(text: &str) -> Option<Rgba<u8>> {
    let lower = text.trim().to_ascii_lowercase();
    let named = match lower.as_str() {
        "black" => Some(BLACK),
        "white" => Some(WHITE),
        "red" => Some(Rgba([255, 0, 0, 255])),
        "green" => Some(Rgba([0, 128, 0, 255])),
        "blue" => Some(Rgba([0, 0, 255, 255])),
        "yellow" => Some(Rgba([255, 255, 0, 255])),
        "gray" | "grey" => Some(Rgba([128, 128, 128, 255])),
        "transparent" => Some(Rgba([0, 0, 0, 0])),
        _ => None,
    };
    if named.is_some() {
        return named;
    }

    let hex = lower
        .strip_prefix('#')
        .or_else(|| lower.strip_prefix("rgb:"))
        .unwrap_or(&lower);
    parse_hex(hex)
}

fn parse_hex(hex: &str) -> Option<Rgba<u8>> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|n| n * 17);

    match hex.len() {
        3 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, 255])),
        6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
        8 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        _ => None,
    }
}

/// Format a colour for ffmpeg filter arguments (`0xRRGGBBAA`).
pub fn to_ffmpeg(color: Rgba<u8>) -> String {
    let [r, g, b, a] = color.0;
    format!("0x{r:02x}{g:02x}{b:02x}{a:02x}")
}
