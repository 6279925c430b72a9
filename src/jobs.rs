//! Job planning: expand sources × codecs × bitrates into concrete jobs.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use snd_core::{Bitrate, Codec, Error, RenditionSpec, Result};

use crate::discover::SourceFile;
use crate::pool::PoolJob;

/// A (codec, bitrate) combination left out of a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRendition {
    pub codec: Codec,
    pub bitrate: Option<Bitrate>,
    pub reason: String,
}

impl fmt::Display for SkippedRendition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bitrate {
            Some(b) => write!(f, "{} {}: {}", self.codec, b, self.reason),
            None => write!(f, "{}: {}", self.codec, self.reason),
        }
    }
}

/// Planned jobs plus the combinations that were dropped while planning.
#[derive(Debug, Clone)]
pub struct Plan<J> {
    pub jobs: Vec<J>,
    pub skipped: Vec<SkippedRendition>,
}

impl<J: PlannedJob> Plan<J> {
    /// Distinct codecs that made it into the plan.
    pub fn codecs(&self) -> Vec<Codec> {
        let codecs: BTreeSet<Codec> = self.jobs.iter().map(|j| j.rendition().codec).collect();
        codecs.into_iter().collect()
    }
}

/// A planned job producing one rendition.
pub trait PlannedJob {
    fn rendition(&self) -> &RenditionSpec;
}

/// One file × rendition encode.
#[derive(Debug, Clone)]
pub struct EncodeJob {
    /// 1-based position in the plan.
    pub id: usize,
    pub source: SourceFile,
    pub rendition: RenditionSpec,
    pub output: PathBuf,
}

impl PlannedJob for EncodeJob {
    fn rendition(&self) -> &RenditionSpec {
        &self.rendition
    }
}

impl PoolJob for EncodeJob {
    fn label(&self) -> String {
        format!("{} -> {}", self.source.display_name(), self.rendition.label())
    }
}

/// One HLS variant of one source.
#[derive(Debug, Clone)]
pub struct HlsJob {
    pub id: usize,
    pub source: SourceFile,
    pub rendition: RenditionSpec,
    /// Variant directory (playlist, init segment, media segments).
    pub output_dir: PathBuf,
}

impl HlsJob {
    /// Per-source directory holding the variant directories and master playlist.
    pub fn source_dir(&self) -> &Path {
        self.output_dir.parent().unwrap_or(&self.output_dir)
    }
}

impl PlannedJob for HlsJob {
    fn rendition(&self) -> &RenditionSpec {
        &self.rendition
    }
}

impl PoolJob for HlsJob {
    fn label(&self) -> String {
        format!("{} -> hls {}", self.source.display_name(), self.rendition.label())
    }
}

/// Expand codecs × bitrates into renditions.
///
/// Repeated codecs and bitrates are collapsed. Lossless codecs yield a
/// single rendition and ignore `bitrates`. Combinations outside a codec's
/// bitrate range are returned as skipped, once each.
pub fn renditions_for(
    codecs: &[Codec],
    bitrates: &[Bitrate],
) -> (Vec<RenditionSpec>, Vec<SkippedRendition>) {
    let mut renditions = Vec::new();
    let mut skipped = Vec::new();

    for codec in dedup(codecs) {
        if codec.is_lossless() {
            renditions.push(RenditionSpec::lossless(codec));
            continue;
        }
        if bitrates.is_empty() {
            skipped.push(SkippedRendition {
                codec,
                bitrate: None,
                reason: "no bitrates requested".to_string(),
            });
            continue;
        }
        for bitrate in dedup(bitrates) {
            if codec.accepts(bitrate) {
                renditions.push(RenditionSpec::lossy(codec, bitrate));
            } else {
                let reason = match codec.bitrate_range() {
                    Some(r) => format!("outside the encoder range ({}-{} kbps)", r.start(), r.end()),
                    None => "bitrate not supported".to_string(),
                };
                skipped.push(SkippedRendition {
                    codec,
                    bitrate: Some(bitrate),
                    reason,
                });
            }
        }
    }

    (renditions, skipped)
}

/// Plan encode jobs: file × codec × bitrate.
///
/// Outputs land at `<output_dir>/<label>/<relative dir>/<stem>.<ext>`.
///
/// # Errors
///
/// [`Error::Validation`] when two sources map to the same output path
/// (e.g. `a.flac` and `a.wav` in one directory).
pub fn plan_encode_jobs(
    sources: &[SourceFile],
    codecs: &[Codec],
    bitrates: &[Bitrate],
    output_dir: &Path,
) -> Result<Plan<EncodeJob>> {
    let (renditions, skipped) = renditions_for(codecs, bitrates);

    let mut jobs = Vec::with_capacity(sources.len() * renditions.len());
    for source in sources {
        for rendition in &renditions {
            let output = output_dir
                .join(rendition.label())
                .join(source.relative_dir())
                .join(format!("{}.{}", source.stem(), rendition.codec.extension()));
            jobs.push(EncodeJob {
                id: jobs.len() + 1,
                source: source.clone(),
                rendition: *rendition,
                output,
            });
        }
    }

    check_unique(jobs.iter().map(|j| (&j.output, &j.source.path)))?;
    Ok(Plan { jobs, skipped })
}

/// Plan HLS variant jobs: file × HLS-capable rendition.
///
/// Variant directories are `<output_dir>/<relative dir>/<stem>/<label>/`.
/// Codecs that fMP4 segments cannot carry are skipped.
pub fn plan_hls_jobs(
    sources: &[SourceFile],
    codecs: &[Codec],
    bitrates: &[Bitrate],
    output_dir: &Path,
) -> Result<Plan<HlsJob>> {
    let (candidates, mut skipped) = renditions_for(codecs, bitrates);

    let mut renditions = Vec::with_capacity(candidates.len());
    for rendition in candidates {
        if rendition.codec.supports_hls_fmp4() {
            renditions.push(rendition);
        } else if !skipped
            .iter()
            .any(|s| s.codec == rendition.codec && s.bitrate.is_none())
        {
            skipped.push(SkippedRendition {
                codec: rendition.codec,
                bitrate: None,
                reason: "cannot be carried in HLS fMP4 segments".to_string(),
            });
        }
    }

    let mut jobs = Vec::with_capacity(sources.len() * renditions.len());
    for source in sources {
        let source_dir = output_dir.join(source.relative_dir()).join(source.stem());
        for rendition in &renditions {
            jobs.push(HlsJob {
                id: jobs.len() + 1,
                source: source.clone(),
                rendition: *rendition,
                output_dir: source_dir.join(rendition.label()),
            });
        }
    }

    check_unique(jobs.iter().map(|j| (&j.output_dir, &j.source.path)))?;
    Ok(Plan { jobs, skipped })
}

fn check_unique<'a>(pairs: impl Iterator<Item = (&'a PathBuf, &'a PathBuf)>) -> Result<()> {
    let mut seen: HashMap<&PathBuf, &PathBuf> = HashMap::new();
    for (output, source) in pairs {
        if let Some(first) = seen.insert(output, source) {
            if first != source {
                return Err(Error::Validation(format!(
                    "{} and {} would both write {}",
                    first.display(),
                    source.display(),
                    output.display()
                )));
            }
        }
    }
    Ok(())
}

fn dedup<T: Copy + PartialEq>(items: &[T]) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(item) {
            out.push(*item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kbps(n: u32) -> Bitrate {
        Bitrate::from_kbps(n).unwrap()
    }

    fn source(root: &str, path: &str) -> SourceFile {
        SourceFile {
            path: PathBuf::from(root).join(path),
            root: PathBuf::from(root),
        }
    }

    #[test]
    fn lossless_codecs_ignore_bitrates() {
        let (renditions, skipped) =
            renditions_for(&[Codec::Flac, Codec::Aac], &[kbps(128), kbps(256)]);
        let labels: Vec<String> = renditions.iter().map(|r| r.label()).collect();
        assert_eq!(labels, vec!["flac_lossless", "aac_128k", "aac_256k"]);
        assert!(skipped.is_empty());
    }

    #[test]
    fn out_of_range_is_skipped_once() {
        let (renditions, skipped) =
            renditions_for(&[Codec::Mp3, Codec::Mp3], &[kbps(320), kbps(448), kbps(448)]);
        assert_eq!(renditions.len(), 1);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].bitrate, Some(kbps(448)));
        assert!(skipped[0].to_string().starts_with("mp3 448k: outside"));
    }

    #[test]
    fn lossy_codec_without_bitrates_is_skipped() {
        let (renditions, skipped) = renditions_for(&[Codec::Opus], &[]);
        assert!(renditions.is_empty());
        assert_eq!(skipped[0].to_string(), "opus: no bitrates requested");
    }

    #[test]
    fn encode_plan_layout_and_ids() {
        let sources = vec![
            source("/music", "album/01 - Song.flac"),
            source("/music", "single.wav"),
        ];
        let plan = plan_encode_jobs(
            &sources,
            &[Codec::Aac, Codec::Opus],
            &[kbps(96), kbps(128)],
            Path::new("/out"),
        )
        .unwrap();

        assert_eq!(plan.jobs.len(), 8);
        assert_eq!(
            plan.jobs.iter().map(|j| j.id).collect::<Vec<_>>(),
            (1..=8).collect::<Vec<_>>()
        );
        assert_eq!(
            plan.jobs[0].output,
            PathBuf::from("/out/aac_96k/album/01 - Song.m4a")
        );
        assert_eq!(
            plan.jobs[7].output,
            PathBuf::from("/out/opus_128k/single.opus")
        );
        assert_eq!(plan.jobs[0].label(), "01 - Song.flac -> aac_96k");
    }

    #[test]
    fn colliding_outputs_are_rejected() {
        let sources = vec![source("/music", "a.flac"), source("/music", "a.wav")];
        let err = plan_encode_jobs(&sources, &[Codec::Mp3], &[kbps(128)], Path::new("/out"))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("would both write"));
    }

    #[test]
    fn hls_plan_skips_vorbis() {
        let sources = vec![source("/music", "tone.flac")];
        let plan = plan_hls_jobs(
            &sources,
            &[Codec::Aac, Codec::Vorbis],
            &[kbps(64), kbps(128)],
            Path::new("/hls"),
        )
        .unwrap();

        assert_eq!(plan.jobs.len(), 2);
        assert_eq!(plan.jobs[1].output_dir, PathBuf::from("/hls/tone/aac_128k"));
        assert_eq!(plan.jobs[1].source_dir(), Path::new("/hls/tone"));
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.skipped[0].codec, Codec::Vorbis);
        // Only the codecs left after planning need an encoder.
        assert_eq!(plan.codecs(), vec![Codec::Aac]);
    }

    #[test]
    fn plan_codecs_leave_out_fully_skipped_codecs() {
        let sources = vec![source("/music", "a.flac")];
        let plan = plan_encode_jobs(
            &sources,
            &[Codec::Opus, Codec::Mp3, Codec::Flac],
            &[kbps(448)],
            Path::new("/out"),
        )
        .unwrap();
        assert_eq!(plan.codecs(), vec![Codec::Opus, Codec::Flac]);
    }
}
