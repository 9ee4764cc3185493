//! Unified error type for mediaforge.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for the HTTP layer to derive a status code via [`Error::http_status`].

use std::fmt;

/// Unified error type covering all failure modes of a transformation request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request path does not contain a transformation chain in the expected shape.
    #[error("Malformed transformation URL: {0}")]
    MalformedUrl(String),

    /// The declared media domain is neither `image` nor `video`.
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// The MIME type of the asset could not be determined.
    #[error("Unsupported file type: {0}")]
    UnsupportedMedia(String),

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "asset").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// A single transformation operation failed and aborted the chain.
    #[error("Operation {op} failed: {message}")]
    Operation {
        /// Tag of the failing operation (e.g. "c_crop").
        op: String,
        /// Human-readable error description.
        message: String,
    },

    /// Configuration or request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An external tool (ffmpeg) is missing or returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::MalformedUrl(_) => 400,
            Error::UnsupportedType(_) => 400,
            Error::UnsupportedMedia(_) => 400,
            Error::NotFound { .. } => 404,
            Error::Operation { .. } => 400,
            Error::Validation(_) => 400,
            Error::Tool { .. } => 502,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Short machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Error::MalformedUrl(_) => "malformed_url",
            Error::UnsupportedType(_) => "unsupported_type",
            Error::UnsupportedMedia(_) => "unsupported_media",
            Error::NotFound { .. } => "not_found",
            Error::Operation { .. } => "operation_error",
            Error::Validation(_) => "validation_error",
            Error::Tool { .. } => "tool_error",
            Error::Io { .. } => "io_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Operation`].
    pub fn operation(op: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Operation {
            op: op.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
