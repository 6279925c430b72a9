//! Probing audio files by shelling out to `ffprobe`.
//!
//! [`FfprobeProber`] maps ffprobe's JSON into [`AudioInfo`], the validation
//! input for every orchestration: encode accepts only lossless sources,
//! fix-artists reads tags, HLS uses the duration for bandwidth estimates.

pub mod ffprobe;
pub mod types;

pub use self::ffprobe::FfprobeProber;
pub use self::types::{AudioInfo, AudioStream, Tags};
