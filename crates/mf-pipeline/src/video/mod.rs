//! Video pipeline: fold the chain into one command, then transcode once.
//!
//! Planning is synchronous and fails fast. Execution happens in a single
//! ffmpeg pass whose output is streamed into a [`StreamSink`]; failures at
//! that stage arrive through the sink.

pub mod ops;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info};

use mf_av::{
    FfmpegCommand, OutputContainer, SinkStream, StreamSink, ToolRegistry, TranscodeOutcome,
    Transcoder,
};
use mf_core::config::PipelineConfig;
use mf_core::{Error, MediaDomain, Params, Result, TransformationChain};

use crate::registry::OperationRegistry;
use crate::source::AssetSource;

/// A step that extends a command description.
pub trait VideoOperation: Send + Sync {
    fn apply(&self, cmd: FfmpegCommand, params: &Params) -> Result<FfmpegCommand>;
}

impl<F> VideoOperation for F
where
    F: Fn(FfmpegCommand, &Params) -> Result<FfmpegCommand> + Send + Sync,
{
    fn apply(&self, cmd: FfmpegCommand, params: &Params) -> Result<FfmpegCommand> {
        self(cmd, params)
    }
}

pub type VideoRegistry = OperationRegistry<dyn VideoOperation>;

/// Registry holding every built-in video operation.
pub fn builtin_registry(config: &PipelineConfig) -> VideoRegistry {
    let mut registry: VideoRegistry = OperationRegistry::new(MediaDomain::Video);

    registry.register("c_fill", Arc::new(ops::fill));
    registry.register("c_thumb", Arc::new(ops::thumb));
    registry.register("c_crop", Arc::new(ops::crop));
    registry.register("c_pad", Arc::new(ops::pad));
    registry.register("c_scale", Arc::new(ops::scale));
    registry.register("c_fit", Arc::new(ops::fit));
    registry.register("ar", Arc::new(ops::aspect_ratio));
    registry.register("g_auto", Arc::new(ops::gravity));
    registry.register("fl_splice", Arc::new(ops::splice));
    registry.register(
        "b_blurred",
        Arc::new(ops::Blur {
            default_radius: config.default_blur_radius,
        }),
    );

    let quality: Arc<dyn VideoOperation> = Arc::new(ops::Quality {
        default_qscale: config.default_video_qscale,
    });
    registry.register("q_auto", Arc::clone(&quality));
    registry.register("q", quality);

    for key in ["so", "eo", "du"] {
        registry.register(key, Arc::new(ops::Timing { key }));
    }

    registry
}

/// A planned transcode with all inputs loaded, ready to stream.
pub struct VideoJob {
    transcoder: Transcoder,
    command: FfmpegCommand,
    primary: Bytes,
    splices: Vec<Bytes>,
    container: OutputContainer,
}

impl VideoJob {
    pub fn command(&self) -> &FfmpegCommand {
        &self.command
    }

    pub fn container(&self) -> OutputContainer {
        self.container
    }

    /// Run the transcode, streaming into `sink` until done, failed, or the
    /// reader disconnects.
    pub async fn run(self, sink: StreamSink) -> TranscodeOutcome {
        self.transcoder
            .run(&self.command, self.primary, self.splices, self.container, sink)
            .await
    }
}

/// Plans and executes video transformation chains.
#[derive(Clone)]
pub struct VideoExecutor {
    registry: Arc<VideoRegistry>,
    tools: ToolRegistry,
    timeout: Duration,
    buffer_chunks: usize,
    chunk_bytes: usize,
}

impl VideoExecutor {
    pub fn new(registry: Arc<VideoRegistry>, tools: ToolRegistry, config: &PipelineConfig) -> Self {
        Self {
            registry,
            tools,
            timeout: config.video_timeout(),
            buffer_chunks: config.stream_buffer_chunks,
            chunk_bytes: config.stream_chunk_bytes,
        }
    }

    pub fn registry(&self) -> &VideoRegistry {
        &self.registry
    }

    /// A bounded sink sized from the pipeline configuration.
    pub fn sink(&self) -> (StreamSink, SinkStream) {
        mf_av::channel(self.buffer_chunks)
    }

    /// Fold `chain` into a command description, in chain order.
    pub fn plan(&self, chain: &TransformationChain) -> Result<FfmpegCommand> {
        let mut command = FfmpegCommand::new();
        for (step, spec) in chain.iter().enumerate() {
            let Some(resolved) = self.registry.resolve(spec) else {
                continue;
            };
            debug!(step, op = resolved.tag, "Folding video operation");
            command = resolved
                .handler
                .apply(command, &resolved.params)
                .map_err(|e| match e {
                    Error::Operation { .. } => e,
                    other => Error::operation(resolved.tag, other.to_string()),
                })?;
        }
        Ok(command)
    }

    /// Plan the chain, check for ffmpeg and load spliced assets.
    ///
    /// Everything that can fail before the first output byte fails here.
    pub async fn prepare(
        &self,
        source: Bytes,
        chain: &TransformationChain,
        mime: &str,
        assets: &dyn AssetSource,
    ) -> Result<VideoJob> {
        let command = self.plan(chain)?;
        let transcoder = Transcoder::new(&self.tools, self.timeout, self.chunk_bytes)?;

        let mut splices = Vec::with_capacity(command.splices().len());
        for public_id in command.splices() {
            splices.push(assets.read_asset(public_id).await?);
        }

        let container = OutputContainer::from_mime(mime);
        info!("Planned video transcode: {command} ({})", container.muxer());

        Ok(VideoJob {
            transcoder,
            command,
            primary: source,
            splices,
            container,
        })
    }

    /// Plan and execute in one call.
    ///
    /// Planning errors are returned directly; transcode errors are delivered
    /// through `sink`.
    pub async fn run(
        &self,
        source: Bytes,
        chain: &TransformationChain,
        mime: &str,
        assets: &dyn AssetSource,
        sink: StreamSink,
    ) -> Result<TranscodeOutcome> {
        let job = self.prepare(source, chain, mime, assets).await?;
        Ok(job.run(sink).await)
    }
}
