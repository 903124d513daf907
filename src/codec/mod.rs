//! Universal compressed-texture codec (UTXF)
//!
//! The payload stores every 4x4 block as one or two *slices* (colour, and alpha
//! when present). A slice is a pair of indices into two shared codebooks:
//! an endpoint pair (low/high RGB) and a selector pattern (16 two-bit weights
//! between the endpoints). That representation maps directly onto the
//! endpoint + index structure of every GPU block format, so transcoding never
//! goes back to the source pixels.
//!
//! - [`UniversalEncoder`]: RGBA8 levels to payload (build time)
//! - [`UtxTranscoder`]: payload to GPU blocks (runtime), behind the
//!   [`UniversalTranscoder`] seam used by [`crate::transcoder`]

mod bc;
mod block;
mod codebook;
mod encoder;
mod etc;
mod header;
mod raw;
mod transcoder;

pub use codebook::{Endpoints, SelectorCodebook, SelectorPattern};
pub use encoder::{ConfigError, EncodeError, EncoderParams, UniversalEncoder};
pub use header::{LevelRecord, UtxHeader, HEADER_LEN, MAX_DIMENSION};
pub use transcoder::UtxTranscoder;

use crate::format::TranscodeFormat;

/// Whole-image metadata read from a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub level_count: u32,
    /// 4x4 blocks across all levels
    pub total_blocks: u64,
    pub has_alpha: bool,
}

/// Per-level metadata read from a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelInfo {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub blocks_x: u32,
    pub blocks_y: u32,
    pub total_blocks: u32,
}

/// Universal codec errors
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Invalid payload header: {0}")]
    InvalidHeader(&'static str),

    #[error("Failed to parse payload: {0}")]
    Parse(#[from] binrw::Error),

    #[error("Payload checksum mismatch: header says {expected:016x}, data hashes to {actual:016x}")]
    ChecksumMismatch { expected: u64, actual: u64 },

    #[error("Level {level} out of range (payload has {count} levels)")]
    LevelOutOfRange { level: u32, count: u32 },

    #[error("Level {level} table entry is inconsistent: {reason}")]
    BadLevelRecord { level: u32, reason: &'static str },

    #[error("Level {level}, block {block}: codebook index out of range")]
    CorruptBlock { level: u32, block: usize },

    #[error("Output buffer holds {got} bytes, level needs {needed}")]
    OutputTooSmall { needed: usize, got: usize },

    #[error("start_transcoding was not called for this payload")]
    NotStarted,

    #[error("Target format {0} is not supported by this codec")]
    UnsupportedTarget(TranscodeFormat),
}

/// Runtime side of a universal codec.
///
/// Implementations are created per decode; `start_transcoding` may cache
/// decoded codebooks for the subsequent `transcode_level` calls.
pub trait UniversalTranscoder {
    /// Cheap structural check of the payload header
    fn validate_header(&self, payload: &[u8]) -> bool;

    fn image_info(&self, payload: &[u8]) -> Result<ImageInfo, CodecError>;

    fn level_info(&self, payload: &[u8], level: u32) -> Result<LevelInfo, CodecError>;

    /// Full validation and decoding of the shared tables
    fn start_transcoding(&mut self, payload: &[u8]) -> Result<(), CodecError>;

    /// Write `level` as `target` units into `out`.
    ///
    /// `out` must hold at least the level's unit count times the target's
    /// bytes per unit.
    fn transcode_level(
        &self,
        payload: &[u8],
        level: u32,
        target: TranscodeFormat,
        out: &mut [u8],
    ) -> Result<(), CodecError>;
}
