//! texbridge - adaptive GPU texture compression
//!
//! Textures are compressed once, at build time, into a universal payload
//! prefixed with a 4-byte format tag. At load time the payload is transcoded
//! into whichever block format the running GPU supports best.

pub mod caps;
pub mod channels;
pub mod codec;
pub mod compressor;
pub mod container;
pub mod format;
pub mod image;
pub mod negotiate;
pub mod transcoder;

pub use caps::{FeatureSet, HardwareFeatures};
pub use channels::UsedChannels;
pub use codec::SelectorCodebook;
pub use compressor::{CompressError, Compressor};
pub use crate::image::{GpuImage, SourceImage};
pub use format::{FormatTag, PixelFormat, TranscodeFormat};
pub use transcoder::{transcode, transcode_with, DecodeError, Transcoded};
