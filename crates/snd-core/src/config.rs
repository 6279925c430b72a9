//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from TOML and carries the
//! sub-configs for tools, rendition encoding, HLS asset generation, and
//! artist tag repair. Every section defaults sensibly so an empty file is
//! valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;
use crate::media::{Bitrate, Codec};
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tools: ToolsConfig,
    pub encode: EncodeConfig,
    pub hls: HlsConfig,
    pub artists: ArtistsConfig,
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.tools.timeout_secs == 0 {
            warnings.push("tools.timeout_secs is 0; every command will time out".into());
        }

        if self.encode.codecs.is_empty() {
            warnings.push("encode.codecs is empty; encode will produce nothing".into());
        }
        warnings.extend(range_warnings("encode", &self.encode.codecs, &self.encode.bitrates));

        if self.hls.codecs.is_empty() {
            warnings.push("hls.codecs is empty; hls will produce nothing".into());
        }
        for codec in &self.hls.codecs {
            if !codec.supports_hls_fmp4() {
                warnings.push(format!(
                    "hls.codecs contains '{codec}', which cannot be carried in HLS fMP4 segments"
                ));
            }
        }
        warnings.extend(range_warnings("hls", &self.hls.codecs, &self.hls.bitrates));

        if self.hls.segment_duration == 0 {
            warnings.push(
                "hls.segment_duration is 0; hls runs will be rejected unless --segment-duration is given"
                    .into(),
            );
        }

        if self.artists.separator.trim().is_empty() {
            warnings.push(
                "artists.separator is blank; filenames cannot be split into artist and title".into(),
            );
        }
        if self.artists.various_names.is_empty() {
            warnings.push("artists.various_names is empty; fix-artists will match nothing".into());
        }

        warnings
    }
}

fn range_warnings(section: &str, codecs: &[Codec], bitrates: &[Bitrate]) -> Vec<String> {
    let mut warnings = Vec::new();
    for codec in codecs.iter().filter(|c| !c.is_lossless()) {
        for bitrate in bitrates {
            if !codec.accepts(*bitrate) {
                warnings.push(format!(
                    "{section}: {codec} does not accept {bitrate}; that combination will be skipped"
                ));
            }
        }
    }
    warnings
}

/// Resolve a configured worker count: `0` means one worker per CPU.
pub fn resolve_jobs(jobs: usize) -> usize {
    if jobs == 0 {
        num_cpus::get().max(1)
    } else {
        jobs
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// External tool path overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    /// Per-invocation timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            timeout_secs: 3600,
        }
    }
}

/// Rendition encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    pub output_dir: PathBuf,
    pub codecs: Vec<Codec>,
    pub bitrates: Vec<Bitrate>,
    /// Worker count; 0 means number of CPUs.
    pub jobs: usize,
    pub overwrite: bool,
    /// Outputs smaller than this are treated as failed encodes.
    pub min_output_bytes: u64,
    pub preserve_metadata: bool,
    pub sample_rate: Option<u32>,
    pub channels: Option<u32>,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./renditions"),
            codecs: vec![Codec::Aac, Codec::Mp3, Codec::Opus],
            bitrates: default_bitrates(&[96, 128, 192, 256, 320]),
            jobs: 0,
            overwrite: false,
            min_output_bytes: 1024,
            preserve_metadata: true,
            sample_rate: None,
            channels: None,
        }
    }
}

/// HLS fMP4 asset generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HlsConfig {
    pub output_dir: PathBuf,
    pub codecs: Vec<Codec>,
    pub bitrates: Vec<Bitrate>,
    /// Target segment duration in seconds.
    pub segment_duration: u32,
    pub jobs: usize,
    pub playlist_name: String,
    pub master_name: String,
}

impl Default for HlsConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./hls"),
            codecs: vec![Codec::Aac],
            bitrates: default_bitrates(&[64, 128, 256]),
            segment_duration: 6,
            jobs: 0,
            playlist_name: "index.m3u8".into(),
            master_name: "master.m3u8".into(),
        }
    }
}

/// "Various Artists" repair settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtistsConfig {
    /// Artist values (case-insensitive) that mark a mis-tagged file.
    pub various_names: Vec<String>,
    /// Separator between artist and title in filenames.
    pub separator: String,
    pub jobs: usize,
    /// Strip leading track numbers (`01 - `, `1-03 `) before splitting.
    pub strip_track_numbers: bool,
    /// Also write the title parsed from the filename when the file has none.
    pub fix_title: bool,
}

impl Default for ArtistsConfig {
    fn default() -> Self {
        Self {
            various_names: vec![
                "Various Artists".into(),
                "Various".into(),
                "VA".into(),
                "V.A.".into(),
            ],
            separator: " - ".into(),
            jobs: 0,
            strip_track_numbers: true,
            fix_title: true,
        }
    }
}

fn default_bitrates(kbps: &[u32]) -> Vec<Bitrate> {
    kbps.iter().filter_map(|&k| Bitrate::from_kbps(k).ok()).collect()
}
