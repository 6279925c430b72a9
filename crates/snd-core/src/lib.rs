//! snd-core: shared types, errors, and configuration.
//!
//! This crate is the foundational dependency for the other soundforged
//! crates, providing a unified error type, audio-domain types (codecs,
//! bitrates, renditions), and application configuration.

pub mod config;
pub mod error;
pub mod media;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use media::*;
