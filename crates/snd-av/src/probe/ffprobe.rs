//! FFprobe-based audio prober.
//!
//! Shells out to `ffprobe -v quiet -print_format json -show_format -show_streams`
//! and maps the JSON output into [`AudioInfo`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::types::{AudioInfo, AudioStream, Tags};
use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// A prober backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    /// Path to the ffprobe binary.
    ffprobe_path: PathBuf,
    timeout: Duration,
}

impl FfprobeProber {
    /// Create a new prober using the given ffprobe path.
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self {
            ffprobe_path,
            timeout: Duration::from_secs(60),
        }
    }

    /// Replace the per-file probe timeout (60 s by default).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create a prober from the registry's ffprobe entry, using its
    /// configured timeout.
    pub fn from_registry(tools: &ToolRegistry) -> snd_core::Result<Self> {
        let ffprobe = tools.require("ffprobe")?;
        Ok(Self::new(ffprobe.path.clone()).with_timeout(ffprobe.timeout))
    }

    /// Probe a file and return its audio information.
    ///
    /// # Errors
    ///
    /// [`snd_core::Error::Tool`] when ffprobe fails (unreadable or
    /// non-media file), [`snd_core::Error::Probe`] when the JSON cannot be
    /// parsed or the file has no audio stream.
    pub async fn probe(&self, path: &Path) -> snd_core::Result<AudioInfo> {
        let mut cmd = ToolCommand::new(self.ffprobe_path.clone());
        cmd.timeout(self.timeout);
        cmd.args([
            "-v", "quiet",
            "-print_format", "json",
            "-show_format",
            "-show_streams",
        ]);
        cmd.arg(path.to_string_lossy().as_ref());

        let output = cmd.execute().await?;
        parse_ffprobe_json(path, &output.stdout)
    }
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: Option<u32>,
    codec_type: Option<String>,
    codec_name: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
    bits_per_raw_sample: Option<String>,
    bits_per_sample: Option<u32>,
    bit_rate: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn parse_ffprobe_json(path: &Path, json: &str) -> snd_core::Result<AudioInfo> {
    let ff: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| snd_core::Error::Probe(format!("ffprobe JSON parse error: {e}")))?;
    parse_ffprobe_output(path, ff)
}

fn parse_ffprobe_output(path: &Path, output: FfprobeOutput) -> snd_core::Result<AudioInfo> {
    let duration = output
        .format
        .duration
        .as_deref()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .map(Duration::from_secs_f64);

    let size = output
        .format
        .size
        .as_deref()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    let bit_rate = output.format.bit_rate.as_deref().and_then(|s| s.parse().ok());

    let audio: Vec<FfprobeStream> = output
        .streams
        .into_iter()
        .filter(|s| s.codec_type.as_deref() == Some("audio"))
        .collect();

    if audio.is_empty() {
        return Err(snd_core::Error::Probe(format!(
            "no audio stream in {}",
            path.display()
        )));
    }

    // Format-level tags take priority; Ogg/Opus keep Vorbis comments on the
    // stream, so fall back to the primary stream's tags.
    let mut tags = Tags::default();
    for (k, v) in &output.format.tags {
        tags.insert_if_absent(k, v.as_str());
    }
    for (k, v) in &audio[0].tags {
        tags.insert_if_absent(k, v.as_str());
    }

    let streams = audio
        .into_iter()
        .enumerate()
        .map(|(i, s)| AudioStream {
            index: s.index.unwrap_or(i as u32),
            codec_name: s.codec_name.unwrap_or_default(),
            sample_rate: s.sample_rate.as_deref().and_then(|r| r.parse().ok()),
            channels: s.channels,
            bits_per_sample: s
                .bits_per_raw_sample
                .as_deref()
                .and_then(|b| b.parse().ok())
                .or(s.bits_per_sample)
                .filter(|b| *b > 0),
            bit_rate: s.bit_rate.as_deref().and_then(|b| b.parse().ok()),
        })
        .collect();

    Ok(AudioInfo {
        path: path.to_path_buf(),
        format_name: output.format.format_name.unwrap_or_default(),
        duration,
        size,
        bit_rate,
        streams,
        tags,
    })
}
