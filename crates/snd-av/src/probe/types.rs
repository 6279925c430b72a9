//! Core types for audio probe results.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Metadata tags with case-folded keys.
///
/// Containers disagree on tag case (`ARTIST` in FLAC/Vorbis comments,
/// `artist` in MP4), so keys are stored lowercase and looked up the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    /// Insert a tag, lowercasing the key. Existing values win, so callers
    /// insert higher-priority sources first.
    pub fn insert_if_absent(&mut self, key: &str, value: impl Into<String>) {
        self.0
            .entry(key.to_ascii_lowercase())
            .or_insert_with(|| value.into());
    }

    /// Look up a tag by case-insensitive key. Blank values read as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(&key.to_ascii_lowercase())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tags = Tags::default();
        for (k, v) in iter {
            tags.insert_if_absent(k.as_ref(), v);
        }
        tags
    }
}

/// Information about a probed audio file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioInfo {
    /// Path to the probed file.
    pub path: PathBuf,
    /// ffprobe `format_name` (e.g. `flac`, `mov,mp4,m4a,3gp,3g2,mj2`).
    pub format_name: String,
    /// Total duration (if determinable).
    pub duration: Option<Duration>,
    /// File size in bytes.
    pub size: u64,
    /// Overall bit rate in bits per second.
    pub bit_rate: Option<u64>,
    /// Audio streams found in the file.
    pub streams: Vec<AudioStream>,
    /// Container tags merged with the primary stream's tags.
    pub tags: Tags,
}

impl AudioInfo {
    /// The first audio stream; the one every action maps with `0:a:0`.
    pub fn primary_audio(&self) -> Option<&AudioStream> {
        self.streams.first()
    }

    /// Whether the primary audio stream is losslessly coded.
    pub fn is_lossless(&self) -> bool {
        self.primary_audio()
            .map(|s| snd_core::is_lossless_codec_name(&s.codec_name))
            .unwrap_or(false)
    }

    pub fn artist(&self) -> Option<&str> {
        self.tags.get("artist")
    }

    /// `album_artist`, with MP4's `album artist` spelling as a fallback.
    pub fn album_artist(&self) -> Option<&str> {
        self.tags
            .get("album_artist")
            .or_else(|| self.tags.get("album artist"))
    }

    pub fn title(&self) -> Option<&str> {
        self.tags.get("title")
    }
}

/// An audio stream within a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioStream {
    /// Absolute stream index within the file.
    pub index: u32,
    /// ffprobe codec name (e.g. `flac`, `pcm_s24le`).
    pub codec_name: String,
    /// Sample rate in Hz.
    pub sample_rate: Option<u32>,
    /// Number of channels.
    pub channels: Option<u32>,
    /// Bits per sample (from `bits_per_raw_sample` or `bits_per_sample`).
    pub bits_per_sample: Option<u32>,
    /// Stream bit rate in bits per second.
    pub bit_rate: Option<u64>,
}
