//! Streamed execution of an [`FfmpegCommand`].
//!
//! Source assets are written into a private temp directory, ffmpeg is spawned
//! once with its output on stdout, and stdout is pumped chunk by chunk into a
//! [`StreamSink`]. The child is killed when the reader goes away or the time
//! limit is hit, and is killed on drop if the task itself is aborted.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio_stream::StreamExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info};

use mf_core::{Error, Result};

use crate::command::{FfmpegCommand, OutputContainer};
use crate::sink::StreamSink;
use crate::tools::ToolRegistry;

/// Bytes of stderr kept for error messages.
const STDERR_TAIL: usize = 2048;

/// How a transcode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeOutcome {
    /// ffmpeg exited cleanly and all output reached the sink.
    Completed { bytes: u64 },
    /// The reader dropped the stream; ffmpeg was killed.
    Cancelled { bytes: u64 },
    /// An error was delivered through the sink.
    Failed,
}

enum Pumped {
    Finished { bytes: u64 },
    ReaderGone { bytes: u64 },
}

/// Runs ffmpeg commands and streams their output.
#[derive(Debug, Clone)]
pub struct Transcoder {
    program: PathBuf,
    timeout: Duration,
    chunk_bytes: usize,
}

impl Transcoder {
    /// Build a transcoder from the discovered ffmpeg, failing with
    /// [`Error::Tool`] when it is not installed.
    pub fn new(tools: &ToolRegistry, timeout: Duration, chunk_bytes: usize) -> Result<Self> {
        let ffmpeg = tools.require("ffmpeg")?;
        Ok(Self::with_program(ffmpeg.path.clone(), timeout, chunk_bytes))
    }

    pub fn with_program(program: PathBuf, timeout: Duration, chunk_bytes: usize) -> Self {
        Self {
            program,
            timeout,
            chunk_bytes: chunk_bytes.max(1),
        }
    }

    /// Execute `command` against `primary` (plus one buffer per splice) and
    /// stream the result into `sink`.
    ///
    /// Errors never escape as a return value: they are sent through the sink
    /// so the reader sees the stream end with a failure instead of a silent
    /// truncation.
    pub async fn run(
        &self,
        command: &FfmpegCommand,
        primary: Bytes,
        splices: Vec<Bytes>,
        container: OutputContainer,
        sink: StreamSink,
    ) -> TranscodeOutcome {
        match self.execute(command, primary, splices, container, &sink).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("Transcode failed: {err}");
                if !sink.fail(err).await {
                    debug!("Transcode error dropped; reader already gone");
                }
                TranscodeOutcome::Failed
            }
        }
    }

    async fn execute(
        &self,
        command: &FfmpegCommand,
        primary: Bytes,
        splices: Vec<Bytes>,
        container: OutputContainer,
        sink: &StreamSink,
    ) -> Result<TranscodeOutcome> {
        let workspace = tempfile::TempDir::new()?;

        let mut inputs = Vec::with_capacity(1 + splices.len());
        for (index, data) in std::iter::once(&primary).chain(splices.iter()).enumerate() {
            let path = workspace.path().join(format!("input{index}"));
            tokio::fs::write(&path, data).await?;
            inputs.push(path);
        }

        let args = command.to_args(&inputs, container)?;
        info!("Transcoding: {command} -> {}", container.muxer());
        debug!("ffmpeg args: {args:?}");

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::tool("ffmpeg", format!("failed to spawn: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Internal("ffmpeg stdout was not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Internal("ffmpeg stderr was not captured".into()))?;
        let stderr_task = tokio::spawn(read_tail(stderr));

        let pumped = tokio::time::timeout(self.timeout, pump(stdout, sink, self.chunk_bytes)).await;
        let bytes = match pumped {
            Ok(Ok(Pumped::Finished { bytes })) => bytes,
            Ok(Ok(Pumped::ReaderGone { bytes })) => {
                kill(&mut child).await;
                info!("Client disconnected after {bytes} bytes; transcode stopped");
                return Ok(TranscodeOutcome::Cancelled { bytes });
            }
            Ok(Err(e)) => {
                kill(&mut child).await;
                return Err(Error::tool("ffmpeg", format!("failed reading output: {e}")));
            }
            Err(_elapsed) => {
                kill(&mut child).await;
                return Err(Error::tool(
                    "ffmpeg",
                    format!("timed out after {:?}", self.timeout),
                ));
            }
        };

        let status = child.wait().await?;
        let stderr = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(Error::tool(
                "ffmpeg",
                format!("exited with status {status}: {}", stderr.trim()),
            ));
        }

        debug!("Transcode finished: {bytes} bytes");
        Ok(TranscodeOutcome::Completed { bytes })
    }
}

/// Copy `reader` into `sink` in chunks of at most `chunk_bytes`.
async fn pump<R>(reader: R, sink: &StreamSink, chunk_bytes: usize) -> std::io::Result<Pumped>
where
    R: AsyncRead + Unpin,
{
    let mut chunks = ReaderStream::with_capacity(reader, chunk_bytes);
    let mut bytes = 0u64;

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        let len = chunk.len() as u64;
        if sink.send(chunk).await.is_err() {
            return Ok(Pumped::ReaderGone { bytes });
        }
        bytes += len;
    }

    Ok(Pumped::Finished { bytes })
}

/// Drain `reader` and keep the last [`STDERR_TAIL`] bytes as text.
async fn read_tail<R>(mut reader: R) -> String
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Err(e) = reader.read_to_end(&mut buf).await {
        debug!("Failed reading ffmpeg stderr: {e}");
    }
    let start = buf.len().saturating_sub(STDERR_TAIL);
    String::from_utf8_lossy(&buf[start..]).into_owned()
}

async fn kill(child: &mut Child) {
    if let Err(e) = child.kill().await {
        debug!("Failed to kill ffmpeg: {e}");
    }
}
