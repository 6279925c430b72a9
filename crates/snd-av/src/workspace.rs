//! Workspace management for in-place rewrites.
//!
//! A [`Workspace`] provides a temporary directory next to the file being
//! rewritten, so that finalization is a same-filesystem rename. Dropping an
//! unfinalized workspace removes the temporary directory and leaves the
//! original file untouched.

use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Workspace for rewriting a single file in place.
///
/// # Example
///
/// ```no_run
/// use snd_av::Workspace;
///
/// let workspace = Workspace::new(std::path::Path::new("/music/track.flac")).unwrap();
/// // ... write the rewritten file to workspace.output() ...
/// workspace.finalize(None).unwrap();
/// ```
pub struct Workspace {
    temp_dir: TempDir,
    input_path: PathBuf,
}

impl Workspace {
    /// Create a new workspace for rewriting `input`.
    ///
    /// The temporary directory is created in the input's parent directory
    /// (hidden, `.soundforged-` prefix). The output path shares the input's
    /// filename so ffmpeg picks the same muxer from the extension.
    pub fn new(input: &Path) -> snd_core::Result<Self> {
        let parent = input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let temp_dir = tempfile::Builder::new()
            .prefix(".soundforged-")
            .tempdir_in(parent)
            .map_err(|e| snd_core::Error::tool("workspace", format!("failed to create temp dir: {e}")))?;

        Ok(Self {
            temp_dir,
            input_path: input.to_path_buf(),
        })
    }

    /// The original input file path.
    pub fn input(&self) -> &Path {
        &self.input_path
    }

    /// The output file path (same filename as input, inside the temp dir).
    pub fn output(&self) -> PathBuf {
        let file_name = self
            .input_path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new("output"));
        self.temp_dir.path().join(file_name)
    }

    /// Path to the temporary directory.
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Finalize the workspace: optionally back up the original, then move the
    /// output file to the input location.
    ///
    /// - If `backup_ext` is `Some("bak")` and the original exists, it is
    ///   copied to `<original>.bak` (extension appended, so `song.flac`
    ///   becomes `song.flac.bak`) before the output replaces it.
    /// - Returns the final path (the original input location).
    ///
    /// # Errors
    ///
    /// Returns an error if the output file does not exist or if any rename
    /// operation fails.
    pub fn finalize(self, backup_ext: Option<&str>) -> snd_core::Result<PathBuf> {
        let output = self.output();
        let dest = &self.input_path;

        if !output.exists() {
            return Err(snd_core::Error::tool(
                "workspace",
                format!("output file does not exist: {}", output.display()),
            ));
        }

        if let Some(ext) = backup_ext {
            if dest.exists() {
                let mut backup = dest.clone().into_os_string();
                backup.push(".");
                backup.push(ext);
                std::fs::copy(dest, &backup).map_err(|e| {
                    snd_core::Error::tool("workspace", format!("failed to create backup: {e}"))
                })?;
            }
        }

        // Rename first (same filesystem), fall back to copy if the temp dir
        // ended up elsewhere.
        if let Err(_rename_err) = std::fs::rename(&output, dest) {
            std::fs::copy(&output, dest).map_err(|e| {
                snd_core::Error::tool(
                    "workspace",
                    format!("failed to copy output to destination: {e}"),
                )
            })?;
        }

        Ok(dest.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn workspace_lives_next_to_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("song.flac");
        fs::write(&input, b"original").unwrap();

        let ws = Workspace::new(&input).unwrap();
        assert_eq!(ws.input(), input);
        assert_eq!(ws.temp_dir().parent().unwrap(), dir.path());
        assert!(ws.output().starts_with(ws.temp_dir()));
        assert_eq!(ws.output().file_name().unwrap(), "song.flac");
    }

    #[test]
    fn finalize_without_backup() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("song.flac");
        fs::write(&input, b"original").unwrap();

        let ws = Workspace::new(&input).unwrap();
        fs::write(ws.output(), b"retagged").unwrap();
        let temp = ws.temp_dir().to_path_buf();

        let final_path = ws.finalize(None).unwrap();
        assert_eq!(final_path, input);
        assert_eq!(fs::read_to_string(&input).unwrap(), "retagged");
        assert!(!temp.exists());
    }

    #[test]
    fn finalize_with_backup() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("song.flac");
        fs::write(&input, b"original").unwrap();

        let ws = Workspace::new(&input).unwrap();
        fs::write(ws.output(), b"retagged").unwrap();
        ws.finalize(Some("bak")).unwrap();

        assert_eq!(fs::read_to_string(&input).unwrap(), "retagged");
        let backup = dir.path().join("song.flac.bak");
        assert_eq!(fs::read_to_string(&backup).unwrap(), "original");
    }

    #[test]
    fn finalize_fails_when_output_missing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("song.flac");
        fs::write(&input, b"original").unwrap();

        let ws = Workspace::new(&input).unwrap();
        assert!(ws.finalize(None).is_err());
        assert_eq!(fs::read_to_string(&input).unwrap(), "original");
    }

    #[test]
    fn dropping_workspace_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("song.flac");
        fs::write(&input, b"original").unwrap();

        let ws = Workspace::new(&input).unwrap();
        fs::write(ws.output(), b"half written").unwrap();
        let temp = ws.temp_dir().to_path_buf();
        drop(ws);

        assert!(!temp.exists());
        assert_eq!(fs::read_to_string(&input).unwrap(), "original");
    }
}
