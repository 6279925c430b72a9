//! Audio-domain types: output codecs, bitrates, and rendition specs.
//!
//! [`Codec`] serializes in lowercase (via `serde(rename_all = "lowercase")`)
//! and implements `Display` manually for consistent string representation.
//! [`Bitrate`] serializes as the ffmpeg-style string (`"128k"`).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::Error;

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Output codecs a rendition can be encoded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    Aac,
    Mp3,
    Opus,
    Vorbis,
    Ac3,
    Eac3,
    Flac,
    Alac,
}

impl Codec {
    /// Every codec, in display order.
    pub const ALL: [Codec; 8] = [
        Codec::Aac,
        Codec::Mp3,
        Codec::Opus,
        Codec::Vorbis,
        Codec::Ac3,
        Codec::Eac3,
        Codec::Flac,
        Codec::Alac,
    ];

    /// The ffmpeg encoder name passed to `-c:a`.
    pub fn encoder(self) -> &'static str {
        match self {
            Self::Aac => "aac",
            Self::Mp3 => "libmp3lame",
            Self::Opus => "libopus",
            Self::Vorbis => "libvorbis",
            Self::Ac3 => "ac3",
            Self::Eac3 => "eac3",
            Self::Flac => "flac",
            Self::Alac => "alac",
        }
    }

    /// File extension for standalone rendition files.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Aac | Self::Alac => "m4a",
            Self::Mp3 => "mp3",
            Self::Opus => "opus",
            Self::Vorbis => "ogg",
            Self::Ac3 => "ac3",
            Self::Eac3 => "eac3",
            Self::Flac => "flac",
        }
    }

    /// Lossless codecs have no bitrate axis.
    pub fn is_lossless(self) -> bool {
        matches!(self, Self::Flac | Self::Alac)
    }

    /// Inclusive bitrate range (kbps) the encoder accepts, `None` for
    /// lossless codecs.
    pub fn bitrate_range(self) -> Option<RangeInclusive<u32>> {
        match self {
            Self::Aac => Some(16..=512),
            Self::Mp3 => Some(8..=320),
            Self::Opus => Some(6..=510),
            Self::Vorbis => Some(45..=500),
            Self::Ac3 => Some(32..=640),
            Self::Eac3 => Some(32..=6144),
            Self::Flac | Self::Alac => None,
        }
    }

    /// Whether `bitrate` can be used with this codec.
    pub fn accepts(self, bitrate: Bitrate) -> bool {
        self.bitrate_range()
            .map(|r| r.contains(&bitrate.kbps()))
            .unwrap_or(false)
    }

    /// RFC 6381 codec string for `#EXT-X-STREAM-INF:CODECS`.
    pub fn hls_codecs_tag(self) -> Option<&'static str> {
        match self {
            Self::Aac => Some("mp4a.40.2"),
            Self::Mp3 => Some("mp4a.40.34"),
            Self::Opus => Some("Opus"),
            Self::Ac3 => Some("ac-3"),
            Self::Eac3 => Some("ec-3"),
            Self::Flac => Some("fLaC"),
            Self::Alac => Some("alac"),
            Self::Vorbis => None,
        }
    }

    /// Whether ffmpeg's HLS muxer can carry this codec in fMP4 segments.
    pub fn supports_hls_fmp4(self) -> bool {
        self.hls_codecs_tag().is_some()
    }

    /// Encoder options appended after `-c:a`/`-b:a`.
    pub fn encoder_args(self) -> &'static [&'static str] {
        match self {
            Self::Opus => &["-vbr", "on"],
            _ => &[],
        }
    }

    /// Muxer options for standalone rendition files. Not used for HLS,
    /// where the `hls` muxer owns the container.
    pub fn container_args(self) -> &'static [&'static str] {
        match self {
            Self::Mp3 => &["-write_xing", "1"],
            Self::Aac | Self::Alac => &["-movflags", "+faststart"],
            _ => &[],
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aac => write!(f, "aac"),
            Self::Mp3 => write!(f, "mp3"),
            Self::Opus => write!(f, "opus"),
            Self::Vorbis => write!(f, "vorbis"),
            Self::Ac3 => write!(f, "ac3"),
            Self::Eac3 => write!(f, "eac3"),
            Self::Flac => write!(f, "flac"),
            Self::Alac => write!(f, "alac"),
        }
    }
}

impl FromStr for Codec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aac" | "m4a" => Ok(Self::Aac),
            "mp3" | "lame" => Ok(Self::Mp3),
            "opus" => Ok(Self::Opus),
            "vorbis" | "ogg" => Ok(Self::Vorbis),
            "ac3" | "ac-3" => Ok(Self::Ac3),
            "eac3" | "e-ac3" | "ec-3" => Ok(Self::Eac3),
            "flac" => Ok(Self::Flac),
            "alac" => Ok(Self::Alac),
            other => Err(Error::Validation(format!("unknown codec '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Bitrate
// ---------------------------------------------------------------------------

/// A target bitrate in kilobits per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bitrate(u32);

impl Bitrate {
    /// Create a bitrate from a kbps value. Zero is rejected.
    pub fn from_kbps(kbps: u32) -> crate::Result<Self> {
        if kbps == 0 {
            return Err(Error::Validation("bitrate must be greater than 0".into()));
        }
        Ok(Self(kbps))
    }

    pub fn kbps(self) -> u32 {
        self.0
    }

    pub fn bits_per_second(self) -> u64 {
        u64::from(self.0) * 1000
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}k", self.0)
    }
}

impl FromStr for Bitrate {
    type Err = Error;

    /// Accepts `128`, `128k`, `128K`, `128kbps`, and `128kb/s`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let digits = ["kbps", "kb/s", "k"]
            .iter()
            .find_map(|suffix| lower.strip_suffix(suffix))
            .unwrap_or(lower.as_str());

        let kbps: u32 = digits
            .trim()
            .parse()
            .map_err(|_| Error::Validation(format!("invalid bitrate '{s}'")))?;
        Self::from_kbps(kbps)
    }
}

impl Serialize for Bitrate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Bitrate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Bitrate::from_kbps(n),
            Raw::Text(s) => s.parse(),
        }
        .map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// RenditionSpec
// ---------------------------------------------------------------------------

/// One codec+bitrate output shape. Lossless codecs carry no bitrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RenditionSpec {
    pub codec: Codec,
    pub bitrate: Option<Bitrate>,
}

impl RenditionSpec {
    pub fn lossy(codec: Codec, bitrate: Bitrate) -> Self {
        Self {
            codec,
            bitrate: Some(bitrate),
        }
    }

    pub fn lossless(codec: Codec) -> Self {
        Self {
            codec,
            bitrate: None,
        }
    }

    /// Directory-safe label, e.g. `aac_128k` or `flac_lossless`.
    pub fn label(&self) -> String {
        match self.bitrate {
            Some(b) => format!("{}_{}", self.codec, b),
            None => format!("{}_lossless", self.codec),
        }
    }
}

impl fmt::Display for RenditionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

// ---------------------------------------------------------------------------
// Source classification
// ---------------------------------------------------------------------------

/// ffprobe `codec_name` values that are accepted as lossless input.
/// Any `pcm_*` codec is also accepted.
pub const LOSSLESS_SOURCE_CODECS: &[&str] =
    &["flac", "alac", "wavpack", "ape", "tta", "mlp", "truehd"];

/// File extensions considered during source discovery.
pub const SOURCE_EXTENSIONS: &[&str] = &[
    "flac", "wav", "wave", "aif", "aiff", "aifc", "m4a", "wv", "ape", "caf", "w64",
];

/// File extensions considered when fixing artist tags.
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "flac", "wav", "wave", "aif", "aiff", "aifc", "m4a", "wv", "ape", "caf", "w64", "mp3",
    "ogg", "opus", "aac",
];

/// Whether an ffprobe codec name describes a lossless codec.
pub fn is_lossless_codec_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("pcm_") || LOSSLESS_SOURCE_CODECS.contains(&lower.as_str())
}
