//! Rewrite the artist (and optionally title) tag with a stream copy.

use crate::command::ToolCommand;
use crate::tools::{ToolConfig, ToolRegistry};
use crate::workspace::Workspace;

/// Tag values to write. `None` leaves the existing value alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetagRequest {
    pub artist: String,
    pub title: Option<String>,
}

/// Build the ffmpeg invocation that copies `workspace.input()` into
/// `workspace.output()` with the new tags.
pub fn retag_command(ffmpeg: &ToolConfig, workspace: &Workspace, req: &RetagRequest) -> ToolCommand {
    let mut cmd = ffmpeg.command();
    cmd.args(["-hide_banner", "-nostdin", "-loglevel", "error", "-y", "-i"]);
    cmd.arg(workspace.input().to_string_lossy().as_ref());
    // All streams, untouched (cover art included).
    cmd.args(["-map", "0", "-c", "copy", "-map_metadata", "0"]);
    // Ogg keeps Vorbis comments on the stream, and the copied stream tags
    // would otherwise win over the global ones.
    for target in ["-metadata", "-metadata:s:a:0"] {
        cmd.args([target, &format!("artist={}", req.artist)]);
        if let Some(ref title) = req.title {
            cmd.args([target, &format!("title={title}")]);
        }
    }
    cmd.arg(workspace.output().to_string_lossy().as_ref());
    cmd
}

/// Retag `workspace.input()` into the workspace output. The caller
/// finalizes the workspace to replace the original.
pub async fn retag_artist(
    tools: &ToolRegistry,
    workspace: &Workspace,
    req: &RetagRequest,
) -> snd_core::Result<()> {
    let ffmpeg = tools.require("ffmpeg")?;

    tracing::info!(
        "retag {:?}: artist={:?}{}",
        workspace.input(),
        req.artist,
        req.title
            .as_deref()
            .map(|t| format!(" title={t:?}"))
            .unwrap_or_default()
    );

    retag_command(ffmpeg, workspace, req).execute().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn retag_copies_all_streams() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("01 - Artist - Song.flac");
        std::fs::write(&input, b"flac").unwrap();
        let ws = Workspace::new(&input).unwrap();

        let ffmpeg = ToolConfig {
            name: "ffmpeg".into(),
            path: PathBuf::from("ffmpeg"),
            timeout: Duration::from_secs(60),
        };
        let req = RetagRequest {
            artist: "Artist".into(),
            title: Some("Song".into()),
        };

        let args = retag_command(&ffmpeg, &ws, &req).get_args().to_vec();
        let joined = args.join(" ");
        assert!(joined.contains("-map 0 -c copy -map_metadata 0"));
        assert!(joined.contains("-metadata artist=Artist -metadata title=Song"));
        assert!(joined.contains("-metadata:s:a:0 artist=Artist -metadata:s:a:0 title=Song"));
        assert_eq!(args.last().unwrap(), &ws.output().to_string_lossy().to_string());
    }

    #[test]
    fn retag_without_title() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.mp3");
        std::fs::write(&input, b"mp3").unwrap();
        let ws = Workspace::new(&input).unwrap();
        let ffmpeg = ToolConfig {
            name: "ffmpeg".into(),
            path: PathBuf::from("ffmpeg"),
            timeout: Duration::from_secs(60),
        };
        let req = RetagRequest {
            artist: "Someone".into(),
            title: None,
        };
        let args = retag_command(&ffmpeg, &ws, &req).get_args().to_vec();
        assert!(!args.iter().any(|a| a.starts_with("title=")));
        let stream_tags = args.iter().filter(|a| *a == "-metadata:s:a:0").count();
        assert_eq!(stream_tags, 1);
    }
}
