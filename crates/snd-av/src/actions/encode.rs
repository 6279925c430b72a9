//! Encode one rendition of a source file via ffmpeg.

use std::path::PathBuf;

use snd_core::RenditionSpec;

use crate::command::ToolCommand;
use crate::tools::{ToolConfig, ToolRegistry};

/// Everything needed for a single file × codec × bitrate encode.
#[derive(Debug, Clone)]
pub struct EncodeRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub rendition: RenditionSpec,
    /// Replace an existing output (`-y`) instead of refusing (`-n`).
    pub overwrite: bool,
    /// Copy container tags from the source (`-map_metadata 0`).
    pub preserve_metadata: bool,
    pub sample_rate: Option<u32>,
    pub channels: Option<u32>,
}

/// Build the ffmpeg invocation for `req` without running it.
pub fn encode_command(ffmpeg: &ToolConfig, req: &EncodeRequest) -> ToolCommand {
    let codec = req.rendition.codec;

    let mut cmd = ffmpeg.command();
    cmd.args(["-hide_banner", "-nostdin", "-loglevel", "error"]);
    cmd.arg(if req.overwrite { "-y" } else { "-n" });
    cmd.arg("-i");
    cmd.arg(req.input.to_string_lossy().as_ref());
    // First audio stream only; cover art and other streams are dropped.
    cmd.args(["-map", "0:a:0", "-vn"]);
    cmd.args(["-c:a", codec.encoder()]);

    if let Some(bitrate) = req.rendition.bitrate {
        cmd.args(["-b:a", &bitrate.to_string()]);
    }
    cmd.args(codec.encoder_args().iter().copied());

    if let Some(rate) = req.sample_rate {
        cmd.args(["-ar", &rate.to_string()]);
    }
    if let Some(ch) = req.channels {
        cmd.args(["-ac", &ch.to_string()]);
    }

    cmd.args(["-map_metadata", if req.preserve_metadata { "0" } else { "-1" }]);
    cmd.args(codec.container_args().iter().copied());
    cmd.arg(req.output.to_string_lossy().as_ref());
    cmd
}

/// Encode a single rendition. The output's parent directories are created
/// first. Size checking is left to [`super::verify_output`].
pub async fn encode_rendition(tools: &ToolRegistry, req: &EncodeRequest) -> snd_core::Result<()> {
    let ffmpeg = tools.require("ffmpeg")?;

    if let Some(parent) = req.output.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            snd_core::Error::Internal(format!(
                "Failed to create output dir {}: {e}",
                parent.display()
            ))
        })?;
    }

    tracing::debug!(
        "encode {} ({}) -> {}",
        req.input.display(),
        req.rendition,
        req.output.display()
    );

    encode_command(ffmpeg, req).execute().await?;
    Ok(())
}
