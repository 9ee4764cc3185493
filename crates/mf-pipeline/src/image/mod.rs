//! Image pipeline: eager, buffer-chained execution.
//!
//! Every operation receives the previous operation's complete output buffer.
//! Operations run strictly in chain order and the first failure discards
//! everything produced so far.

pub mod background;
pub(crate) mod codec;
pub mod ops;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info};

use mf_core::config::PipelineConfig;
use mf_core::{Error, MediaDomain, Params, Result, TransformationChain};

use crate::registry::OperationRegistry;

pub use background::EdgeBackgroundRemover;

/// A transformation applied to an encoded image buffer.
///
/// Built-in geometry and plugin operations such as background removal both
/// implement this trait and are registered the same way, so adding a
/// provider never touches the executor.
#[async_trait]
pub trait ImageOperation: Send + Sync {
    async fn apply(&self, input: Bytes, params: &Params) -> Result<Bytes>;
}

pub type ImageRegistry = OperationRegistry<dyn ImageOperation>;

/// Registry holding every built-in image operation.
pub fn builtin_registry(config: &PipelineConfig) -> ImageRegistry {
    let mut registry: ImageRegistry = OperationRegistry::new(MediaDomain::Image);

    let max_pixels = config.max_output_pixels;
    for tag in ["c_fill", "c_thumb", "g_auto"] {
        registry.register(tag, Arc::new(ops::Fill { tag, max_pixels }));
    }
    registry.register("c_crop", Arc::new(ops::Crop));
    registry.register("c_pad", Arc::new(ops::Pad { max_pixels }));
    registry.register("c_scale", Arc::new(ops::Scale { max_pixels }));
    registry.register("c_fit", Arc::new(ops::Fit { max_pixels }));
    registry.register("b_auto", Arc::new(ops::Flatten));
    registry.register("ar", Arc::new(ops::AspectRatio { max_pixels }));

    let quality: Arc<dyn ImageOperation> = Arc::new(ops::Quality {
        default_quality: config.default_image_quality.clamp(1, 100),
    });
    registry.register("q_auto", Arc::clone(&quality));
    registry.register("q", quality);

    registry.register(
        "e_background_removal",
        Arc::new(EdgeBackgroundRemover::default()),
    );

    registry
}

/// Runs a transformation chain against one image buffer.
#[derive(Clone)]
pub struct ImageExecutor {
    registry: Arc<ImageRegistry>,
    timeout: Duration,
}

impl ImageExecutor {
    pub fn new(registry: Arc<ImageRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &ImageRegistry {
        &self.registry
    }

    /// Apply `chain` to `source` in order and return the final buffer.
    ///
    /// An empty chain returns `source` untouched. Unknown tags are skipped.
    ///
    /// On timeout no further operations start, but an operation already on
    /// the blocking pool runs to completion and its result is dropped. The
    /// output size limit bounds how long that can take.
    pub async fn run(&self, source: Bytes, chain: &TransformationChain) -> Result<Bytes> {
        match tokio::time::timeout(self.timeout, self.run_chain(source, chain)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(Error::operation(
                "image",
                format!("transformation chain timed out after {:?}", self.timeout),
            )),
        }
    }

    async fn run_chain(&self, source: Bytes, chain: &TransformationChain) -> Result<Bytes> {
        let mut buffer = source;
        let mut applied = 0usize;

        for (step, spec) in chain.iter().enumerate() {
            let Some(resolved) = self.registry.resolve(spec) else {
                continue;
            };

            debug!(step, op = resolved.tag, input_bytes = buffer.len(), "Applying image operation");
            buffer = resolved
                .handler
                .apply(buffer, &resolved.params)
                .await
                .map_err(|e| attribute(resolved.tag, e))?;
            applied += 1;
        }

        info!(
            "Image chain complete: {applied}/{} operations applied, {} bytes",
            chain.len(),
            buffer.len()
        );
        Ok(buffer)
    }
}

/// Attach the failing tag to errors that do not already name an operation.
fn attribute(tag: &str, err: Error) -> Error {
    match err {
        Error::Operation { .. } => err,
        other => Error::operation(tag, other.to_string()),
    }
}
