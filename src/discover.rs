//! Input discovery: expand file and directory arguments into audio files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use snd_av::{AudioInfo, FfprobeProber};
use snd_core::{Error, Result};
use tracing::debug;
use walkdir::WalkDir;

use crate::pool::{PoolJob, WorkerPool};

/// A discovered input file and the root it was found under.
///
/// `root` is the directory argument the file was discovered from (or the
/// file's parent when a file was passed directly), so outputs can mirror
/// the input's relative layout.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceFile {
    pub path: PathBuf,
    pub root: PathBuf,
}

impl SourceFile {
    /// Directory of the file relative to its root (empty for top-level files).
    pub fn relative_dir(&self) -> PathBuf {
        self.path
            .parent()
            .and_then(|p| p.strip_prefix(&self.root).ok())
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// File stem as a string (`01 - Song` for `01 - Song.flac`).
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string())
    }

    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

impl PoolJob for SourceFile {
    fn label(&self) -> String {
        format!("probe {}", self.display_name())
    }
}

/// Sources split by whether ffprobe could read them.
#[derive(Debug, Default)]
pub struct ProbedSources {
    pub ok: Vec<(SourceFile, AudioInfo)>,
    pub failed: Vec<(SourceFile, Error)>,
}

/// Probe every source through `pool`, keeping discovery order.
pub async fn probe_sources(
    pool: &WorkerPool,
    prober: &FfprobeProber,
    sources: Vec<SourceFile>,
) -> ProbedSources {
    let prober = prober.clone();
    let results = pool
        .run(sources.clone(), move |source| {
            let prober = prober.clone();
            async move { prober.probe(&source.path).await }
        })
        .await;

    let mut probed = ProbedSources::default();
    for (source, result) in sources.into_iter().zip(results) {
        match result.outcome {
            Ok(info) => probed.ok.push((source, info)),
            Err(e) => probed.failed.push((source, e)),
        }
    }
    probed
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Expand `inputs` into source files.
///
/// Files are taken as given when their extension matches; directories are
/// walked recursively. Symlinks inside directories are not followed. The
/// result is sorted by path and each path appears once, keeping the first
/// root it was found under.
///
/// # Errors
///
/// [`Error::Validation`] if an input does not exist or a file argument has
/// an unsupported extension.
pub fn discover_sources(inputs: &[PathBuf], extensions: &[&str]) -> Result<Vec<SourceFile>> {
    let mut found: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();

    for input in inputs {
        if !input.exists() {
            return Err(Error::Validation(format!(
                "input does not exist: {}",
                input.display()
            )));
        }

        if input.is_file() {
            if !has_extension(input, extensions) {
                return Err(Error::Validation(format!(
                    "unsupported file type: {} (expected one of: {})",
                    input.display(),
                    extensions.join(", ")
                )));
            }
            let root = input
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            found.entry(input.clone()).or_insert(root);
            continue;
        }

        // Hidden entries (workspace temp dirs, dotfiles) are pruned, but the
        // root itself may be hidden (e.g. a temp dir).
        let walker = WalkDir::new(input)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("skipping unreadable entry under {}: {e}", input.display());
                    continue;
                }
            };
            let path = entry.path();
            if entry.path_is_symlink() {
                debug!("skipping symlink: '{}'", path.display());
                continue;
            }
            if !entry.file_type().is_file() {
                continue;
            }
            if !has_extension(path, extensions) {
                debug!("skipping non-audio file '{}'", path.display());
                continue;
            }
            found
                .entry(path.to_path_buf())
                .or_insert_with(|| input.clone());
        }
    }

    Ok(found
        .into_iter()
        .map(|(path, root)| SourceFile { path, root })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use snd_core::SOURCE_EXTENSIONS;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn walks_directories_and_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.flac"));
        touch(&dir.path().join("album/01.WAV"));
        touch(&dir.path().join("album/cover.jpg"));
        touch(&dir.path().join("album/.hidden.flac"));
        touch(&dir.path().join(".soundforged-abc/b.flac"));
        touch(&dir.path().join("lossy.mp3"));

        let sources = discover_sources(&[dir.path().to_path_buf()], SOURCE_EXTENSIONS).unwrap();
        let names: Vec<String> = sources.iter().map(|s| s.display_name()).collect();
        assert_eq!(names, vec!["01.WAV", "b.flac"]);
        assert!(sources.iter().all(|s| s.root == dir.path()));
        assert_eq!(sources[0].relative_dir(), PathBuf::from("album"));
        assert_eq!(sources[1].relative_dir(), PathBuf::new());
    }

    #[test]
    fn explicit_file_and_dedup() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("song.flac");
        touch(&file);

        let sources =
            discover_sources(&[file.clone(), dir.path().to_path_buf()], SOURCE_EXTENSIONS).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].path, file);
        assert_eq!(sources[0].stem(), "song");
    }

    #[test]
    fn missing_input_is_validation_error() {
        let err = discover_sources(&[PathBuf::from("/no/such/dir")], SOURCE_EXTENSIONS).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn unsupported_file_argument_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        touch(&file);
        let err = discover_sources(&[file], SOURCE_EXTENSIONS).unwrap_err();
        assert!(err.to_string().contains("unsupported file type"));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real.flac");
        touch(&real);
        std::os::unix::fs::symlink(&real, dir.path().join("link.flac")).unwrap();

        let sources = discover_sources(&[dir.path().to_path_buf()], SOURCE_EXTENSIONS).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].display_name(), "real.flac");
    }
}
