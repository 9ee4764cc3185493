//! Built-in image operations.
//!
//! Each operation decodes its input buffer, transforms it, and re-encodes it
//! in the input's format (quality always emits JPEG). Work runs on the
//! blocking pool.

use async_trait::async_trait;
use bytes::Bytes;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use tracing::debug;

use mf_core::{Error, Params, Result};

use super::codec::{self, blocking, Decoded};
use super::ImageOperation;
use crate::color::{parse_color, BLACK, WHITE};

const FILTER: FilterType = FilterType::Lanczos3;

/// Fail `op` when a `w`x`h` output would exceed `max_pixels`.
///
/// Runs before the output buffer is allocated.
fn check_output_size(op: &str, w: u32, h: u32, max_pixels: u64) -> Result<()> {
    let pixels = u64::from(w) * u64::from(h);
    if pixels > max_pixels {
        return Err(Error::operation(
            op,
            format!("output {w}x{h} ({pixels} pixels) exceeds the limit of {max_pixels} pixels"),
        ));
    }
    Ok(())
}

/// Size of a `width`x`height` image resized to fit inside `w`x`h` with its
/// aspect ratio kept.
pub fn fit_dimensions(width: u32, height: u32, w: u32, h: u32) -> (u32, u32) {
    let ratio = (f64::from(w) / f64::from(width)).min(f64::from(h) / f64::from(height));
    let scaled = |side: u32| ((f64::from(side) * ratio).round() as u32).max(1);
    (scaled(width), scaled(height))
}

/// Decode, transform with `f`, and re-encode in the source format.
async fn transform<F>(op: &'static str, input: Bytes, f: F) -> Result<Bytes>
where
    F: FnOnce(DynamicImage) -> Result<DynamicImage> + Send + 'static,
{
    blocking(op, move || {
        let Decoded { image, format } = codec::decode(op, &input)?;
        let output = f(image)?;
        codec::encode(op, &output, format)
    })
    .await
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Cover-fit resize to exactly `w`x`h`, cropping the overflow.
///
/// Serves `c_fill`, `c_thumb` and `g_auto`; the latter has no subject
/// detection and crops around the centre.
pub struct Fill {
    pub tag: &'static str,
    pub max_pixels: u64,
}

#[async_trait]
impl ImageOperation for Fill {
    async fn apply(&self, input: Bytes, params: &Params) -> Result<Bytes> {
        let op = self.tag;
        let w = params.require_dimension(op, "w")?;
        let h = params.require_dimension(op, "h")?;
        check_output_size(op, w, h, self.max_pixels)?;
        transform(op, input, move |img| Ok(img.resize_to_fill(w, h, FILTER))).await
    }
}

/// `c_crop`: extract a `w`x`h` window at (`x`, `y`).
pub struct Crop;

#[async_trait]
impl ImageOperation for Crop {
    async fn apply(&self, input: Bytes, params: &Params) -> Result<Bytes> {
        const OP: &str = "c_crop";
        let w = params.require_dimension(OP, "w")?;
        let h = params.require_dimension(OP, "h")?;
        let x = params.require_offset(OP, "x")?;
        let y = params.require_offset(OP, "y")?;

        transform(OP, input, move |img| {
            let (width, height) = (img.width(), img.height());
            let fits = u64::from(x) + u64::from(w) <= u64::from(width)
                && u64::from(y) + u64::from(h) <= u64::from(height);
            if !fits {
                return Err(Error::operation(
                    OP,
                    format!("crop window {w}x{h}+{x}+{y} exceeds image bounds {width}x{height}"),
                ));
            }
            Ok(img.crop_imm(x, y, w, h))
        })
        .await
    }
}

/// `c_pad`: fit inside `w`x`h` and centre on a canvas of colour `b`
/// (default black).
pub struct Pad {
    pub max_pixels: u64,
}

#[async_trait]
impl ImageOperation for Pad {
    async fn apply(&self, input: Bytes, params: &Params) -> Result<Bytes> {
        const OP: &str = "c_pad";
        let w = params.require_dimension(OP, "w")?;
        let h = params.require_dimension(OP, "h")?;
        let background = parse_color(params.get("b"), BLACK);
        check_output_size(OP, w, h, self.max_pixels)?;

        transform(OP, input, move |img| {
            let fitted = img.resize(w, h, FILTER).to_rgba8();
            let mut canvas = RgbaImage::from_pixel(w, h, background);
            let left = (w - fitted.width()) / 2;
            let top = (h - fitted.height()) / 2;
            imageops::overlay(&mut canvas, &fitted, i64::from(left), i64::from(top));
            Ok(DynamicImage::ImageRgba8(canvas))
        })
        .await
    }
}

/// `c_scale`: aspect-preserving resize to the given width and/or height.
pub struct Scale {
    pub max_pixels: u64,
}

#[async_trait]
impl ImageOperation for Scale {
    async fn apply(&self, input: Bytes, params: &Params) -> Result<Bytes> {
        const OP: &str = "c_scale";
        let w = params.dimension(OP, "w")?;
        let h = params.dimension(OP, "h")?;
        if w.is_none() && h.is_none() {
            return Err(Error::operation(OP, "requires 'w' or 'h'"));
        }

        let max_pixels = self.max_pixels;
        transform(OP, input, move |img| {
            let (w, h) = (w.unwrap_or(u32::MAX), h.unwrap_or(u32::MAX));
            let (tw, th) = fit_dimensions(img.width(), img.height(), w, h);
            check_output_size(OP, tw, th, max_pixels)?;
            Ok(img.resize(w, h, FILTER))
        })
        .await
    }
}

/// `c_fit`: aspect-preserving resize bounded by `w`x`h`.
pub struct Fit {
    pub max_pixels: u64,
}

#[async_trait]
impl ImageOperation for Fit {
    async fn apply(&self, input: Bytes, params: &Params) -> Result<Bytes> {
        const OP: &str = "c_fit";
        let w = params.require_dimension(OP, "w")?;
        let h = params.require_dimension(OP, "h")?;
        let max_pixels = self.max_pixels;
        transform(OP, input, move |img| {
            let (tw, th) = fit_dimensions(img.width(), img.height(), w, h);
            check_output_size(OP, tw, th, max_pixels)?;
            Ok(img.resize(w, h, FILTER))
        })
        .await
    }
}

/// `ar`: cover-resize to the given side and the side derived from the
/// aspect ratio. With neither side given the image passes through.
pub struct AspectRatio {
    pub max_pixels: u64,
}

/// Target size for an aspect ratio and one known side.
pub fn aspect_dimensions(w: Option<u32>, h: Option<u32>, ar: f64) -> Option<(u32, u32)> {
    match (w, h) {
        (Some(w), _) => Some((w, ((f64::from(w) / ar).round() as u32).max(1))),
        (None, Some(h)) => Some((((f64::from(h) * ar).round() as u32).max(1), h)),
        (None, None) => None,
    }
}

#[async_trait]
impl ImageOperation for AspectRatio {
    async fn apply(&self, input: Bytes, params: &Params) -> Result<Bytes> {
        const OP: &str = "ar";
        let ar = params.require_number(OP, "ar")?;
        if ar <= 0.0 {
            return Err(Error::operation(OP, format!("aspect ratio must be positive, got {ar}")));
        }

        let w = params.dimension(OP, "w")?;
        let h = params.dimension(OP, "h")?;
        let Some((w, h)) = aspect_dimensions(w, h, ar) else {
            debug!("ar without 'w' or 'h'; leaving image unchanged");
            return Ok(input);
        };
        check_output_size(OP, w, h, self.max_pixels)?;

        transform(OP, input, move |img| Ok(img.resize_to_fill(w, h, FILTER))).await
    }
}

// ---------------------------------------------------------------------------
// Background and quality
// ---------------------------------------------------------------------------

/// `b_auto`: composite over a solid background `b` (default white),
/// removing transparency.
pub struct Flatten;

#[async_trait]
impl ImageOperation for Flatten {
    async fn apply(&self, input: Bytes, params: &Params) -> Result<Bytes> {
        const OP: &str = "b_auto";
        let background = parse_color(params.get("b"), WHITE);
        transform(OP, input, move |img| Ok(flatten(&img.to_rgba8(), background))).await
    }
}

fn flatten(src: &RgbaImage, background: Rgba<u8>) -> DynamicImage {
    let [br, bg, bb, _] = background.0;
    let out = RgbImage::from_fn(src.width(), src.height(), |x, y| {
        let [r, g, b, a] = src.get_pixel(x, y).0;
        let alpha = u32::from(a);
        let blend = |fg: u8, bg: u8| {
            ((u32::from(fg) * alpha + u32::from(bg) * (255 - alpha) + 127) / 255) as u8
        };
        Rgb([blend(r, br), blend(g, bg), blend(b, bb)])
    });
    DynamicImage::ImageRgb8(out)
}

/// `q_auto` / `q`: re-encode as JPEG at `quality` (or `q`), clamped to
/// 1..=100.
pub struct Quality {
    pub default_quality: u8,
}

impl Quality {
    fn quality(&self, params: &Params) -> u8 {
        params
            .number("quality")
            .or_else(|| params.number("q"))
            .map(|q| q.round().clamp(1.0, 100.0) as u8)
            .unwrap_or(self.default_quality)
            .clamp(1, 100)
    }
}

#[async_trait]
impl ImageOperation for Quality {
    async fn apply(&self, input: Bytes, params: &Params) -> Result<Bytes> {
        const OP: &str = "q_auto";
        let quality = self.quality(params);
        blocking(OP, move || {
            let decoded = codec::decode(OP, &input)?;
            codec::encode_jpeg(OP, &decoded.image, quality)
        })
        .await
    }
}
