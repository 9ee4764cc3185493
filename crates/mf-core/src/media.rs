//! Media domains and MIME type resolution.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The media category that selects an operation registry and executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaDomain {
    Image,
    Video,
}

impl MediaDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaDomain::Image => "image",
            MediaDomain::Video => "video",
        }
    }
}

impl fmt::Display for MediaDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaDomain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(MediaDomain::Image),
            "video" => Ok(MediaDomain::Video),
            other => Err(Error::UnsupportedType(other.to_string())),
        }
    }
}

/// Resolves the MIME type of a stored asset from its identifier.
pub trait MimeResolver: Send + Sync {
    /// Return the MIME type for `public_id`, or `None` if it cannot be determined.
    fn resolve_mime(&self, public_id: &str) -> Option<&'static str>;
}

/// Resolves MIME types from the file extension of the public id.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionMimeResolver;

impl MimeResolver for ExtensionMimeResolver {
    fn resolve_mime(&self, public_id: &str) -> Option<&'static str> {
        let (_, ext) = public_id.rsplit_once('.')?;
        mime_for_extension(ext)
    }
}

/// Determine the MIME type for a file extension.
fn mime_for_extension(ext: &str) -> Option<&'static str> {
    let mime = match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" | "jpe" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "ico" => "image/x-icon",
        "avif" => "image/avif",
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "ts" | "m2ts" => "video/mp2t",
        "mpeg" | "mpg" => "video/mpeg",
        "ogv" => "video/ogg",
        "flv" => "video/x-flv",
        "m4a" => "audio/mp4",
        "mp3" => "audio/mpeg",
        "flac" => "audio/flac",
        "wav" => "audio/wav",
        _ => return None,
    };
    Some(mime)
}
