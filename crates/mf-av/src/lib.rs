//! # mf-av
//!
//! Video transcoding plumbing for the mediaforge pipeline.
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache the ffmpeg path.
//! - **Command description** ([`FfmpegCommand`]) -- immutable-append
//!   description of seek, duration, filters, splices and output options.
//! - **Output sink** ([`StreamSink`]) -- bounded channel with backpressure and
//!   an error path.
//! - **Execution** ([`Transcoder`]) -- runs a description once and streams
//!   stdout into a sink.

pub mod command;
pub mod sink;
pub mod tools;
pub mod transcode;

// ---- Re-exports for convenience ----

pub use command::{FfmpegCommand, OutputContainer};
pub use sink::{channel, SinkClosed, SinkItem, SinkStream, StreamSink};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
pub use transcode::{TranscodeOutcome, Transcoder};
