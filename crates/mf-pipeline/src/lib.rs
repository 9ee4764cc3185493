//! # mf-pipeline
//!
//! Transformation execution for images and videos.
//!
//! This crate provides:
//!
//! - **[`OperationRegistry`]** -- per-domain tag to handler lookup, including
//!   directive tags such as `so_5` that carry their own value.
//! - **[`ImageExecutor`]** -- eager, sequential buffer pipeline with the
//!   built-in geometry, quality and background-removal operations.
//! - **[`VideoExecutor`]** -- folds a chain into one ffmpeg command and
//!   streams the transcoded output.
//! - **[`Dispatcher`]** -- validates the media domain and MIME type, then
//!   selects the executor.
//! - **[`AssetSource`]** -- the seam through which stored assets are read.

pub mod color;
pub mod dispatch;
pub mod image;
pub mod registry;
pub mod source;
pub mod video;

// Re-export key types at the crate root.
pub use crate::image::{ImageExecutor, ImageOperation, ImageRegistry};
pub use dispatch::{Dispatcher, Rendered, Route};
pub use registry::{OperationRegistry, Resolved};
pub use source::AssetSource;
pub use video::{VideoExecutor, VideoJob, VideoOperation, VideoRegistry};
