//! Built-in video operations.
//!
//! Each operation appends to an [`FfmpegCommand`]; none of them touch the
//! filesystem or spawn processes.

use mf_av::FfmpegCommand;
use mf_core::{Error, Params, Result};
use tracing::warn;

use super::VideoOperation;
use crate::color::{parse_color, to_ffmpeg, BLACK};
use crate::image::ops::aspect_dimensions;

// ---------------------------------------------------------------------------
// Geometry filters
// ---------------------------------------------------------------------------

fn cover(op: &str, cmd: FfmpegCommand, params: &Params) -> Result<FfmpegCommand> {
    let w = params.require_dimension(op, "w")?;
    let h = params.require_dimension(op, "h")?;
    Ok(cmd.with_filter(format!(
        "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h}"
    )))
}

/// `c_fill`: scale to cover `w`x`h`, then crop the overflow.
pub fn fill(cmd: FfmpegCommand, params: &Params) -> Result<FfmpegCommand> {
    cover("c_fill", cmd, params)
}

/// `c_thumb`: same geometry as `c_fill`.
pub fn thumb(cmd: FfmpegCommand, params: &Params) -> Result<FfmpegCommand> {
    cover("c_thumb", cmd, params)
}

/// `c_crop`: `w`x`h` window at (`x`, `y`).
pub fn crop(cmd: FfmpegCommand, params: &Params) -> Result<FfmpegCommand> {
    const OP: &str = "c_crop";
    let w = params.require_dimension(OP, "w")?;
    let h = params.require_dimension(OP, "h")?;
    let x = params.require_offset(OP, "x")?;
    let y = params.require_offset(OP, "y")?;
    Ok(cmd.with_filter(format!("crop={w}:{h}:{x}:{y}")))
}

/// `c_pad`: fit inside `w`x`h` and pad with colour `b` (default black).
pub fn pad(cmd: FfmpegCommand, params: &Params) -> Result<FfmpegCommand> {
    const OP: &str = "c_pad";
    let w = params.require_dimension(OP, "w")?;
    let h = params.require_dimension(OP, "h")?;
    let color = to_ffmpeg(parse_color(params.get("b"), BLACK));
    Ok(cmd.with_filter(format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color={color}"
    )))
}

/// `c_scale`: aspect-preserving scale by width and/or height.
pub fn scale(cmd: FfmpegCommand, params: &Params) -> Result<FfmpegCommand> {
    const OP: &str = "c_scale";
    let filter = match (params.dimension(OP, "w")?, params.dimension(OP, "h")?) {
        (Some(w), Some(h)) => format!("scale={w}:{h}:force_original_aspect_ratio=decrease"),
        (Some(w), None) => format!("scale={w}:-2"),
        (None, Some(h)) => format!("scale=-2:{h}"),
        (None, None) => return Err(Error::operation(OP, "requires 'w' or 'h'")),
    };
    Ok(cmd.with_filter(filter))
}

/// `c_fit`: aspect-preserving scale bounded by `w`x`h`.
pub fn fit(cmd: FfmpegCommand, params: &Params) -> Result<FfmpegCommand> {
    const OP: &str = "c_fit";
    let w = params.require_dimension(OP, "w")?;
    let h = params.require_dimension(OP, "h")?;
    Ok(cmd.with_filter(format!("scale={w}:{h}:force_original_aspect_ratio=decrease")))
}

/// `ar`: explicit size when a side is given, otherwise reshape the width
/// from the input height.
pub fn aspect_ratio(cmd: FfmpegCommand, params: &Params) -> Result<FfmpegCommand> {
    const OP: &str = "ar";
    let ar = params.require_number(OP, "ar")?;
    if ar <= 0.0 {
        return Err(Error::operation(OP, format!("aspect ratio must be positive, got {ar}")));
    }

    let filter = match aspect_dimensions(params.dimension(OP, "w")?, params.dimension(OP, "h")?, ar) {
        Some((w, h)) => format!("scale={w}:{h},setsar=1"),
        None => format!("scale=trunc(ih*{ar}/2)*2:ih,setsar=1"),
    };
    Ok(cmd.with_filter(filter))
}

/// `g_auto`: needs subject detection, which video does not have.
pub fn gravity(cmd: FfmpegCommand, _params: &Params) -> Result<FfmpegCommand> {
    warn!("g_auto is not supported for video; ignoring");
    Ok(cmd)
}

// ---------------------------------------------------------------------------
// Configured operations
// ---------------------------------------------------------------------------

/// `b_blurred`: box blur with `radius` (or the configured default).
pub struct Blur {
    pub default_radius: u32,
}

impl VideoOperation for Blur {
    fn apply(&self, cmd: FfmpegCommand, params: &Params) -> Result<FfmpegCommand> {
        const OP: &str = "b_blurred";
        let radius = match params.get("radius") {
            Some(_) => params.require_offset(OP, "radius")?,
            None => self.default_radius,
        };
        Ok(cmd.with_filter(format!(
            "boxblur=luma_radius={radius}:chroma_radius={radius}"
        )))
    }
}

/// `q_auto` / `q`: encoder quality scale, clamped to ffmpeg's 1..=31.
pub struct Quality {
    pub default_qscale: u32,
}

impl VideoOperation for Quality {
    fn apply(&self, cmd: FfmpegCommand, params: &Params) -> Result<FfmpegCommand> {
        let qscale = params
            .number("quality")
            .or_else(|| params.number("q"))
            .map(|q| q.round().clamp(1.0, 31.0) as u32)
            .unwrap_or(self.default_qscale)
            .clamp(1, 31);
        Ok(cmd.with_output_option("-qscale:v", qscale.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// `so`, `eo` and `du`.
///
/// A spec can carry several of these (`so_5,du_10`); they apply in the order
/// seek, end offset, duration. The end offset is measured from the seek
/// already in the command, or from zero.
pub struct Timing {
    pub key: &'static str,
}

impl VideoOperation for Timing {
    fn apply(&self, cmd: FfmpegCommand, params: &Params) -> Result<FfmpegCommand> {
        let mut cmd = cmd;

        if self.key == "so" || params.contains("so") {
            let so = if params.contains("so") {
                params.require_number("so", "so")?
            } else {
                0.0
            };
            if so < 0.0 {
                return Err(Error::operation("so", format!("start offset must be >= 0, got {so}")));
            }
            cmd = cmd.with_seek(so);
        }

        if self.key == "eo" || params.contains("eo") {
            let eo = params.require_number("eo", "eo")?;
            let start = cmd.seek().unwrap_or(0.0);
            if eo <= start {
                return Err(Error::operation(
                    "eo",
                    format!("end offset {eo} must be after start offset {start}"),
                ));
            }
            cmd = cmd.with_duration(eo - start);
        }

        if self.key == "du" || params.contains("du") {
            let du = params.require_number("du", "du")?;
            if du <= 0.0 {
                return Err(Error::operation("du", format!("duration must be > 0, got {du}")));
            }
            cmd = cmd.with_duration(du);
        }

        Ok(cmd)
    }
}

// ---------------------------------------------------------------------------
// Splice
// ---------------------------------------------------------------------------

/// `fl_splice`: append the asset named by `l` (`video:` prefix optional).
pub fn splice(cmd: FfmpegCommand, params: &Params) -> Result<FfmpegCommand> {
    const OP: &str = "fl_splice";
    let name = match params.get("l") {
        Some(value) => value.to_string(),
        None => return Err(Error::operation(OP, "missing required parameter 'l'")),
    };
    let name = name.strip_prefix("video:").unwrap_or(&name);
    if name.is_empty() {
        return Err(Error::operation(OP, "parameter 'l' must name a video asset"));
    }
    Ok(cmd.with_splice(name))
}
