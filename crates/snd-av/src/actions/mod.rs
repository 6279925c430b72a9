//! ffmpeg actions: rendition encoding, artist retagging, HLS fMP4
//! segmentation, and post-hoc output verification.

mod encode;
mod hls_segment;
mod retag;
mod verify;

pub use encode::{encode_command, encode_rendition, EncodeRequest};
pub use hls_segment::{
    clear_hls_output, generate_hls_rendition, hls_command, HlsRequest, INIT_SEGMENT,
    SEGMENT_PATTERN,
};
pub use retag::{retag_artist, retag_command, RetagRequest};
pub use verify::{verify_hls_output, verify_output, HlsOutput};
