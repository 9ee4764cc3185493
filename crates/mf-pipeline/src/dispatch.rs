//! Media-type dispatch.
//!
//! A request names a domain (`image` or `video`) and an asset. The
//! [`Dispatcher`] validates both before any bytes are read, then hands the
//! source to the executor for that domain.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info};

use mf_av::ToolRegistry;
use mf_core::config::PipelineConfig;
use mf_core::{
    AssetReference, Error, ExtensionMimeResolver, MediaDomain, MimeResolver, Result,
    TransformationChain,
};

use crate::image::{self, ImageExecutor};
use crate::source::AssetSource;
use crate::video::{self, VideoExecutor, VideoJob};

/// Where a request goes and what its source asset is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub domain: MediaDomain,
    pub mime: &'static str,
}

/// The result of dispatching one request.
pub enum Rendered {
    /// A fully materialized image buffer.
    Image { mime: &'static str, bytes: Bytes },
    /// A planned transcode; output bytes arrive once the job runs.
    Video { mime: &'static str, job: VideoJob },
}

impl Rendered {
    pub fn mime(&self) -> &'static str {
        match self {
            Rendered::Image { mime, .. } | Rendered::Video { mime, .. } => mime,
        }
    }
}

/// Routes requests to the image or video executor.
#[derive(Clone)]
pub struct Dispatcher {
    mime: Arc<dyn MimeResolver>,
    image: ImageExecutor,
    video: VideoExecutor,
}

impl Dispatcher {
    pub fn new(mime: Arc<dyn MimeResolver>, image: ImageExecutor, video: VideoExecutor) -> Self {
        Self { mime, image, video }
    }

    /// Built-in registries with extension-based MIME resolution.
    pub fn from_config(config: &PipelineConfig, tools: ToolRegistry) -> Self {
        let image = ImageExecutor::new(
            Arc::new(image::builtin_registry(config)),
            config.image_timeout(),
        );
        let video = VideoExecutor::new(Arc::new(video::builtin_registry(config)), tools, config);
        Self::new(Arc::new(ExtensionMimeResolver), image, video)
    }

    pub fn image(&self) -> &ImageExecutor {
        &self.image
    }

    pub fn video(&self) -> &VideoExecutor {
        &self.video
    }

    /// Validate the domain and resolve the asset's MIME type.
    ///
    /// Both checks happen before any executor or asset read runs.
    pub fn route(&self, domain: Option<&str>, asset: &AssetReference) -> Result<Route> {
        let domain: MediaDomain = domain
            .ok_or_else(|| Error::UnsupportedType(String::new()))?
            .parse()?;
        let mime = self
            .mime
            .resolve_mime(asset.public_id())
            .ok_or_else(|| Error::UnsupportedMedia(asset.public_id().to_string()))?;

        debug!(%domain, mime, asset = %asset, "Routed transformation request");
        Ok(Route { domain, mime })
    }

    /// Run `chain` against `source` using the executor `route` selects.
    ///
    /// Image chains run to completion here. Video chains are planned and
    /// their splice inputs loaded; the returned [`VideoJob`] does the work.
    pub async fn execute(
        &self,
        route: Route,
        source: Bytes,
        chain: &TransformationChain,
        assets: &dyn AssetSource,
    ) -> Result<Rendered> {
        match route.domain {
            MediaDomain::Image => {
                let bytes = self.image.run(source, chain).await?;
                info!(mime = route.mime, bytes = bytes.len(), "Rendered image");
                Ok(Rendered::Image {
                    mime: route.mime,
                    bytes,
                })
            }
            MediaDomain::Video => {
                let job = self.video.prepare(source, chain, route.mime, assets).await?;
                Ok(Rendered::Video {
                    mime: route.mime,
                    job,
                })
            }
        }
    }
}
