//! Declarative ffmpeg command description.
//!
//! An [`FfmpegCommand`] accumulates seek, duration, filters, spliced inputs
//! and output options without touching the filesystem or spawning anything.
//! Every builder method consumes the value and returns the extended copy, so a
//! chain of operations is a plain fold. The description is only turned into
//! an argument list by [`FfmpegCommand::to_args`] once all inputs are on disk.

use std::fmt;
use std::path::PathBuf;

use mf_core::{Error, Result};

// ---------------------------------------------------------------------------
// Output container
// ---------------------------------------------------------------------------

/// Container written to the output pipe.
///
/// Seekable-only layouts (classic MP4/MOV) cannot be written to a pipe, so
/// those are emitted fragmented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputContainer {
    FragmentedMp4,
    WebM,
    FragmentedMov,
    Matroska,
}

impl OutputContainer {
    /// Pick the container for a source MIME type.
    pub fn from_mime(mime: &str) -> Self {
        match mime {
            "video/mp4" => OutputContainer::FragmentedMp4,
            "video/webm" => OutputContainer::WebM,
            "video/quicktime" => OutputContainer::FragmentedMov,
            _ => OutputContainer::Matroska,
        }
    }

    /// ffmpeg muxer name passed to `-f`.
    pub fn muxer(&self) -> &'static str {
        match self {
            OutputContainer::FragmentedMp4 => "mp4",
            OutputContainer::WebM => "webm",
            OutputContainer::FragmentedMov => "mov",
            OutputContainer::Matroska => "matroska",
        }
    }

    fn muxer_args(&self) -> &'static [&'static str] {
        match self {
            OutputContainer::FragmentedMp4 | OutputContainer::FragmentedMov => {
                &["-movflags", "frag_keyframe+empty_moov+default_base_moof"]
            }
            OutputContainer::WebM | OutputContainer::Matroska => &[],
        }
    }
}

// ---------------------------------------------------------------------------
// FfmpegCommand
// ---------------------------------------------------------------------------

/// Accumulated description of a single transcode pass.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use]
pub struct FfmpegCommand {
    seek: Option<f64>,
    duration: Option<f64>,
    filters: Vec<String>,
    splices: Vec<String>,
    output_options: Vec<(String, String)>,
}

impl FfmpegCommand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seek the primary input to `secs` before decoding.
    pub fn with_seek(mut self, secs: f64) -> Self {
        self.seek = Some(secs);
        self
    }

    /// Limit the output to `secs` seconds.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration = Some(secs);
        self
    }

    /// Append a video filter after all previously added ones.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filters.push(filter.into());
        self
    }

    /// Concatenate the asset `public_id` after the current inputs.
    pub fn with_splice(mut self, public_id: impl Into<String>) -> Self {
        self.splices.push(public_id.into());
        self
    }

    /// Set an output option, replacing an earlier value for the same flag.
    pub fn with_output_option(mut self, flag: impl Into<String>, value: impl Into<String>) -> Self {
        let flag = flag.into();
        let value = value.into();
        match self.output_options.iter_mut().find(|(f, _)| *f == flag) {
            Some(existing) => existing.1 = value,
            None => self.output_options.push((flag, value)),
        }
        self
    }

    pub fn seek(&self) -> Option<f64> {
        self.seek
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    /// Public ids of spliced assets, in concatenation order.
    pub fn splices(&self) -> &[String] {
        &self.splices
    }

    pub fn output_options(&self) -> &[(String, String)] {
        &self.output_options
    }

    /// Number of inputs the command reads: the primary plus one per splice.
    pub fn input_count(&self) -> usize {
        1 + self.splices.len()
    }

    /// Render the argument list for ffmpeg.
    ///
    /// `inputs[0]` is the primary asset, followed by one path per splice.
    /// Output always goes to stdout.
    pub fn to_args(&self, inputs: &[PathBuf], container: OutputContainer) -> Result<Vec<String>> {
        if inputs.len() != self.input_count() {
            return Err(Error::Internal(format!(
                "ffmpeg command expects {} inputs, got {}",
                self.input_count(),
                inputs.len()
            )));
        }

        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-nostdin"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        for (index, input) in inputs.iter().enumerate() {
            if index == 0 {
                if let Some(seek) = self.seek {
                    args.push("-ss".into());
                    args.push(format_secs(seek));
                }
            }
            args.push("-i".into());
            args.push(input.to_string_lossy().into_owned());
        }

        if self.splices.is_empty() {
            if !self.filters.is_empty() {
                args.push("-vf".into());
                args.push(self.filters.join(","));
            }
        } else {
            let (graph, video_label) = self.concat_graph();
            args.push("-filter_complex".into());
            args.push(graph);
            args.push("-map".into());
            args.push(video_label);
            args.push("-map".into());
            args.push("[ca]".into());
        }

        if let Some(duration) = self.duration {
            args.push("-t".into());
            args.push(format_secs(duration));
        }

        for (flag, value) in &self.output_options {
            args.push(flag.clone());
            args.push(value.clone());
        }

        args.push("-f".into());
        args.push(container.muxer().into());
        args.extend(container.muxer_args().iter().map(|s| s.to_string()));
        args.push("pipe:1".into());

        Ok(args)
    }

    /// Build `concat` over every input, then run the accumulated filters on
    /// the joined video stream. Returns the graph and the video output label.
    fn concat_graph(&self) -> (String, String) {
        let mut graph = String::new();
        for index in 0..self.input_count() {
            graph.push_str(&format!("[{index}:v][{index}:a]"));
        }
        graph.push_str(&format!("concat=n={}:v=1:a=1[cv][ca]", self.input_count()));

        if self.filters.is_empty() {
            return (graph, "[cv]".into());
        }

        graph.push_str(&format!(";[cv]{}[outv]", self.filters.join(",")));
        (graph, "[outv]".into())
    }
}

impl fmt::Display for FfmpegCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ffmpeg")?;
        if let Some(seek) = self.seek {
            write!(f, " ss={}", format_secs(seek))?;
        }
        if let Some(duration) = self.duration {
            write!(f, " t={}", format_secs(duration))?;
        }
        if !self.filters.is_empty() {
            write!(f, " vf={}", self.filters.join(","))?;
        }
        for splice in &self.splices {
            write!(f, " +{splice}")?;
        }
        for (flag, value) in &self.output_options {
            write!(f, " {flag}={value}")?;
        }
        Ok(())
    }
}

/// Seconds formatted without a trailing `.0` for whole values.
fn format_secs(secs: f64) -> String {
    format!("{secs}")
}
