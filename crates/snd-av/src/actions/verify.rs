//! Post-hoc checks on files ffmpeg claims to have written.
//!
//! A zero exit status is not enough: a truncated source or a muxer that
//! gave up early can leave an empty or header-only file behind.

use std::path::{Path, PathBuf};

use super::hls_segment::INIT_SEGMENT;

/// Summary of a verified HLS variant directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HlsOutput {
    pub playlist: PathBuf,
    pub segments: usize,
    /// Bytes of init segment plus media segments.
    pub total_bytes: u64,
}

/// Check that `path` exists and holds at least `min_bytes`. Returns the size.
pub fn verify_output(path: &Path, min_bytes: u64) -> snd_core::Result<u64> {
    let label = path.display().to_string();
    let meta = std::fs::metadata(path)
        .map_err(|e| snd_core::Error::job(&label, format!("output missing: {e}")))?;

    if !meta.is_file() {
        return Err(snd_core::Error::job(label, "output is not a regular file"));
    }
    if meta.len() < min_bytes {
        return Err(snd_core::Error::job(
            label,
            format!("output is {} bytes (minimum {min_bytes})", meta.len()),
        ));
    }
    Ok(meta.len())
}

/// Check an HLS variant directory: playlist, init segment, and at least one
/// `.m4s` media segment must exist and be non-empty.
pub fn verify_hls_output(dir: &Path, playlist_name: &str) -> snd_core::Result<HlsOutput> {
    let playlist = dir.join(playlist_name);
    verify_output(&playlist, 1)?;
    let init_bytes = verify_output(&dir.join(INIT_SEGMENT), 1)?;

    let mut segments = 0;
    let mut total_bytes = init_bytes;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("m4s") {
            total_bytes += verify_output(&path, 1)?;
            segments += 1;
        }
    }

    if segments == 0 {
        return Err(snd_core::Error::job(
            dir.display().to_string(),
            "no media segments were written",
        ));
    }

    Ok(HlsOutput {
        playlist,
        segments,
        total_bytes,
    })
}
