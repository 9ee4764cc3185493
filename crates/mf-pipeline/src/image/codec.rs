//! Decode/encode helpers shared by the built-in image operations.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};

use mf_core::{Error, Result};

/// JPEG quality used when an operation re-encodes a JPEG without an explicit
/// quality request.
const REENCODE_JPEG_QUALITY: u8 = 90;

/// A decoded buffer and the format it was stored in.
#[derive(Debug)]
pub(crate) struct Decoded {
    pub image: DynamicImage,
    pub format: ImageFormat,
}

pub(crate) fn decode(op: &str, data: &[u8]) -> Result<Decoded> {
    let format = image::guess_format(data)
        .map_err(|e| Error::operation(op, format!("unrecognised image data: {e}")))?;
    let image = image::load_from_memory_with_format(data, format)
        .map_err(|e| Error::operation(op, format!("failed to decode image: {e}")))?;
    Ok(Decoded { image, format })
}

/// Encode `image` as `format`, falling back to PNG for formats that have no
/// encoder.
pub(crate) fn encode(op: &str, image: &DynamicImage, format: ImageFormat) -> Result<Bytes> {
    match format {
        ImageFormat::Jpeg => encode_jpeg(op, image, REENCODE_JPEG_QUALITY),
        ImageFormat::Png | ImageFormat::Gif | ImageFormat::Bmp | ImageFormat::Tiff
        | ImageFormat::WebP | ImageFormat::Ico => write(op, image, format)
            .or_else(|_| write(op, image, ImageFormat::Png)),
        _ => write(op, image, ImageFormat::Png),
    }
}

pub(crate) fn encode_jpeg(op: &str, image: &DynamicImage, quality: u8) -> Result<Bytes> {
    let rgb = image.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
        .encode_image(&rgb)
        .map_err(|e| Error::operation(op, format!("failed to encode JPEG: {e}")))?;
    Ok(Bytes::from(buf))
}

pub(crate) fn encode_png(op: &str, image: &DynamicImage) -> Result<Bytes> {
    write(op, image, ImageFormat::Png)
}

fn write(op: &str, image: &DynamicImage, format: ImageFormat) -> Result<Bytes> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, format)
        .map_err(|e| Error::operation(op, format!("failed to encode {format:?}: {e}")))?;
    Ok(Bytes::from(buf.into_inner()))
}

/// Run a CPU-bound image step off the async runtime.
pub(crate) async fn blocking<F>(op: &'static str, f: F) -> Result<Bytes>
where
    F: FnOnce() -> Result<Bytes> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::operation(op, format!("image worker failed: {e}")))?
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    /// A `width`x`height` JPEG filled with a horizontal gradient.
    pub fn jpeg(width: u32, height: u32) -> Bytes {
        let img = RgbImage::from_fn(width, height, |x, _| Rgb([(x % 256) as u8, 64, 128]));
        encode_jpeg("fixture", &DynamicImage::ImageRgb8(img), 95).unwrap()
    }

    /// A `width`x`height` PNG filled with `color`.
    pub fn png(width: u32, height: u32, color: Rgba<u8>) -> Bytes {
        let img = RgbaImage::from_pixel(width, height, color);
        encode_png("fixture", &DynamicImage::ImageRgba8(img)).unwrap()
    }

    pub fn dimensions(data: &[u8]) -> (u32, u32) {
        let img = image::load_from_memory(data).unwrap();
        (img.width(), img.height())
    }

    pub fn format(data: &[u8]) -> ImageFormat {
        image::guess_format(data).unwrap()
    }
}
