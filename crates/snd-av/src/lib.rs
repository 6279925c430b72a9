//! # snd-av
//!
//! External tool management, probing, and ffmpeg actions for soundforged.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg
//!   and ffprobe, and list the audio encoders an ffmpeg build offers.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   support for running external processes.
//! - **Workspace management** ([`Workspace`]) -- temporary directory
//!   lifecycle for in-place rewrites with safe finalization.
//! - **Probing** ([`probe::FfprobeProber`]) -- ffprobe JSON mapped into
//!   [`probe::AudioInfo`].
//! - **Action functions** ([`actions`]) -- rendition encoding, artist
//!   retagging, HLS fMP4 segmentation, and output verification.

pub mod actions;
pub mod command;
pub mod probe;
pub mod tools;
pub mod workspace;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use probe::{AudioInfo, AudioStream, FfprobeProber, Tags};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
pub use workspace::Workspace;

// Action functions
pub use actions::{
    clear_hls_output, encode_command, encode_rendition, generate_hls_rendition, hls_command, retag_artist,
    retag_command, verify_hls_output, verify_output, EncodeRequest, HlsOutput, HlsRequest,
    RetagRequest,
};
