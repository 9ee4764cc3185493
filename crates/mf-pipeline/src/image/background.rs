//! Edge-based background removal.
//!
//! The foreground is whatever lies inside the outermost contours of a Canny
//! edge map. Everything outside becomes fully transparent and the result is
//! always PNG.

use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::drawing::draw_polygon_mut;
use imageproc::edges::canny;
use imageproc::point::Point;
use tracing::debug;

use mf_core::{Error, Params, Result};

use super::codec::{self, blocking};
use super::ImageOperation;

const OP: &str = "e_background_removal";

const FOREGROUND: Luma<u8> = Luma([255]);

/// Background removal by edge segmentation.
///
/// Parameters: `lowerThreshold` and `upperThreshold` for the Canny
/// hysteresis.
#[derive(Debug, Clone, Copy)]
pub struct EdgeBackgroundRemover {
    pub lower_threshold: f32,
    pub upper_threshold: f32,
}

impl Default for EdgeBackgroundRemover {
    fn default() -> Self {
        Self {
            lower_threshold: 50.0,
            upper_threshold: 150.0,
        }
    }
}

#[async_trait]
impl ImageOperation for EdgeBackgroundRemover {
    async fn apply(&self, input: Bytes, params: &Params) -> Result<Bytes> {
        let low = params
            .number("lowerThreshold")
            .map_or(self.lower_threshold, |v| v as f32);
        let high = params
            .number("upperThreshold")
            .map_or(self.upper_threshold, |v| v as f32);
        if low < 0.0 || high < low {
            return Err(Error::operation(
                OP,
                format!("thresholds must satisfy 0 <= lowerThreshold <= upperThreshold, got {low}/{high}"),
            ));
        }

        blocking(OP, move || {
            let decoded = codec::decode(OP, &input)?;
            let rgba = decoded.image.to_rgba8();
            let mask = foreground_mask(&decoded.image.to_luma8(), low, high);
            codec::encode_png(OP, &DynamicImage::ImageRgba8(apply_mask(rgba, &mask)))
        })
        .await
    }
}

/// Fill the outermost contours of the edge map into a binary mask.
pub fn foreground_mask(gray: &GrayImage, low: f32, high: f32) -> GrayImage {
    let edges = canny(gray, low, high);
    let contours: Vec<Contour<i32>> = find_contours(&edges);

    let mut mask = GrayImage::new(gray.width(), gray.height());
    let mut filled = 0usize;
    for contour in contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
    {
        fill_contour(&mut mask, &contour.points);
        filled += 1;
    }

    debug!("Background removal kept {filled} outer contours");
    mask
}

fn fill_contour(mask: &mut GrayImage, points: &[Point<i32>]) {
    let mut polygon: Vec<Point<i32>> = Vec::with_capacity(points.len());
    for &p in points {
        if polygon.last() != Some(&p) {
            polygon.push(p);
        }
    }
    while polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }

    if polygon.len() >= 3 {
        draw_polygon_mut(mask, &polygon, FOREGROUND);
    }

    // The polygon fill may leave boundary pixels out; the contour itself is
    // foreground.
    for p in points {
        if p.x >= 0 && p.y >= 0 && (p.x as u32) < mask.width() && (p.y as u32) < mask.height() {
            mask.put_pixel(p.x as u32, p.y as u32, FOREGROUND);
        }
    }
}

/// Make every pixel outside `mask` transparent black.
fn apply_mask(mut image: RgbaImage, mask: &GrayImage) -> RgbaImage {
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        if mask.get_pixel(x, y)[0] == 0 {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }
    image
}
