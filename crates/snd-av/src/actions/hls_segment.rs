//! HLS fMP4 rendition generation: encode and segment in one ffmpeg pass.

use std::path::{Path, PathBuf};

use snd_core::{Codec, RenditionSpec};

use crate::command::ToolCommand;
use crate::tools::{ToolConfig, ToolRegistry};

/// fMP4 initialization segment filename written next to the playlist.
pub const INIT_SEGMENT: &str = "init.mp4";

/// Media segment filename pattern (ffmpeg printf syntax).
pub const SEGMENT_PATTERN: &str = "seg%04d.m4s";

/// One HLS variant of one source.
#[derive(Debug, Clone)]
pub struct HlsRequest {
    pub input: PathBuf,
    /// Directory receiving the playlist, init segment, and media segments.
    pub output_dir: PathBuf,
    pub rendition: RenditionSpec,
    /// Target segment duration in seconds.
    pub segment_duration: u32,
    pub playlist_name: String,
}

impl HlsRequest {
    pub fn playlist_path(&self) -> PathBuf {
        self.output_dir.join(&self.playlist_name)
    }
}

/// Build the ffmpeg invocation for `req` without running it.
///
/// Produces:
/// - `<output_dir>/<playlist_name>` — VOD media playlist
/// - `<output_dir>/init.mp4` — fMP4 initialization segment
/// - `<output_dir>/seg0000.m4s`, `seg0001.m4s`, … — media segments
pub fn hls_command(ffmpeg: &ToolConfig, req: &HlsRequest) -> ToolCommand {
    let codec = req.rendition.codec;
    let seg_pattern = req.output_dir.join(SEGMENT_PATTERN);

    let mut cmd = ffmpeg.command();
    cmd.args(["-hide_banner", "-nostdin", "-loglevel", "error", "-y", "-i"]);
    cmd.arg(req.input.to_string_lossy().as_ref());
    cmd.args(["-map", "0:a:0", "-vn"]);
    cmd.args(["-c:a", codec.encoder()]);
    if let Some(bitrate) = req.rendition.bitrate {
        cmd.args(["-b:a", &bitrate.to_string()]);
    }
    cmd.args(codec.encoder_args().iter().copied());
    // Older ffmpeg builds gate FLAC and Opus in MP4 behind -strict.
    if matches!(codec, Codec::Flac | Codec::Opus) {
        cmd.args(["-strict", "experimental"]);
    }
    cmd.args(["-f", "hls"]);
    cmd.args(["-hls_time", &req.segment_duration.to_string()]);
    cmd.args(["-hls_segment_type", "fmp4"]);
    cmd.args(["-hls_playlist_type", "vod"]);
    cmd.args(["-hls_flags", "independent_segments"]);
    cmd.args(["-hls_segment_filename", &seg_pattern.to_string_lossy()]);
    cmd.args(["-hls_fmp4_init_filename", INIT_SEGMENT]);
    cmd.arg(req.playlist_path().to_string_lossy().as_ref());
    cmd
}

/// Remove the playlist, init segment, and `.m4s` segments a previous run
/// left in `dir`. Other files are kept. Returns the number removed.
pub fn clear_hls_output(dir: &Path, playlist_name: &str) -> snd_core::Result<usize> {
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let stale = name == playlist_name
            || name == INIT_SEGMENT
            || path.extension().and_then(|e| e.to_str()) == Some("m4s");
        if stale && path.is_file() {
            std::fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Generate one HLS fMP4 variant. The output directory is created first and
/// cleared of earlier output, so only this run's segments remain.
pub async fn generate_hls_rendition(tools: &ToolRegistry, req: &HlsRequest) -> snd_core::Result<()> {
    let ffmpeg = tools.require("ffmpeg")?;

    if !req.rendition.codec.supports_hls_fmp4() {
        return Err(snd_core::Error::Validation(format!(
            "{} cannot be carried in HLS fMP4 segments",
            req.rendition.codec
        )));
    }

    tokio::fs::create_dir_all(&req.output_dir).await.map_err(|e| {
        snd_core::Error::Internal(format!(
            "Failed to create HLS output dir {}: {e}",
            req.output_dir.display()
        ))
    })?;
    let removed = clear_hls_output(&req.output_dir, &req.playlist_name)?;
    if removed > 0 {
        tracing::debug!("removed {removed} stale files from {:?}", req.output_dir);
    }

    tracing::debug!(
        "HLS segment: {:?} -> {:?} ({}, segment_duration={}s)",
        req.input,
        req.output_dir,
        req.rendition,
        req.segment_duration
    );

    hls_command(ffmpeg, req).execute().await?;
    Ok(())
}
