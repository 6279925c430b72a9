//! Soundforged - batch audio renditions, "Various Artists" repair, and HLS
//! fMP4 test assets, orchestrated over ffmpeg/ffprobe.
//!
//! This library crate exposes the orchestration for the binary and for
//! integration testing.

pub mod artists;
pub mod config;
pub mod discover;
pub mod encode;
pub mod hls;
pub mod jobs;
pub mod pool;
pub mod report;
