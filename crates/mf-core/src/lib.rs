//! mf-core: shared types, errors, configuration, and media-domain helpers.
//!
//! This crate is the foundational dependency for all other mf-* crates,
//! providing the transformation data model produced by the URL parser, the
//! unified error type, media domains with MIME resolution, and application
//! configuration.

pub mod config;
pub mod error;
pub mod media;
pub mod transform;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use media::{ExtensionMimeResolver, MediaDomain, MimeResolver};
pub use transform::{AssetReference, ParamValue, Params, TransformationChain, TransformationSpec};
