//! Runtime transcoding of a container into a [`GpuImage`]
//!
//! 1. Split the container and check the payload header
//! 2. Negotiate the target once against the current feature set
//! 3. Decode the codec tables, plan every level and zero the output buffer
//! 4. Transcode levels in ascending order, stopping at the first failure
//! 5. Wrap the buffer, partially filled or not, in a [`GpuImage`]

use tracing::{debug, warn};

use crate::caps::HardwareFeatures;
use crate::codec::{CodecError, UniversalTranscoder, UtxTranscoder};
use crate::container::{Container, ContainerError};
use crate::image::GpuImage;
use crate::negotiate::{negotiate, NegotiateError, TranscodeTarget};

/// Decode errors; none of these produce an image
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Malformed container: {0}")]
    Container(#[from] ContainerError),

    #[error("Payload header failed validation")]
    InvalidHeader,

    #[error("Universal codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("No usable transcode target: {0}")]
    Negotiate(#[from] NegotiateError),
}

/// Where one level lands in the output buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MipLevelDescriptor {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    /// Output units (4x4 blocks or pixels, depending on the target)
    pub units: usize,
    pub offset: usize,
    pub len: usize,
}

/// A level that failed to transcode; it and every later level stay zeroed
#[derive(Debug)]
pub struct LevelFailure {
    pub level: u32,
    pub error: CodecError,
}

/// Outcome of [`transcode_with`]
#[derive(Debug)]
pub struct Transcoded {
    pub image: GpuImage,
    pub target: TranscodeTarget,
    pub levels: Vec<MipLevelDescriptor>,
    pub failed_level: Option<LevelFailure>,
}

impl Transcoded {
    pub fn is_complete(&self) -> bool {
        self.failed_level.is_none()
    }
}

/// Transcode `container` for hardware exposing `features`.
///
/// A level failure is logged and leaves that level and the rest zeroed; the
/// image is still returned.
pub fn transcode<F>(container: &[u8], features: &F) -> Result<GpuImage, DecodeError>
where
    F: HardwareFeatures + ?Sized,
{
    let mut codec = UtxTranscoder::new();
    Ok(transcode_with(container, features, &mut codec)?.image)
}

/// Transcode `container` with an explicit codec, reporting partial failure
pub fn transcode_with<F, C>(
    container: &[u8],
    features: &F,
    codec: &mut C,
) -> Result<Transcoded, DecodeError>
where
    F: HardwareFeatures + ?Sized,
    C: UniversalTranscoder + ?Sized,
{
    let container = Container::parse(container)?;
    let payload = container.payload();
    if !codec.validate_header(payload) {
        return Err(DecodeError::InvalidHeader);
    }

    let target = negotiate(container.tag(), features)?;
    debug!(
        "Transcoding {} container to {} ({})",
        container.tag(),
        target.format,
        target.pixel_format
    );

    let info = codec.image_info(payload)?;
    codec.start_transcoding(payload)?;

    let layout = target.format.layout();
    let mut levels = Vec::with_capacity(info.level_count as usize);
    let mut offset = 0;
    for index in 0..info.level_count {
        let level = codec.level_info(payload, index)?;
        let units = layout.unit_count(level.width, level.height);
        let len = units * layout.bytes_per_unit();
        levels.push(MipLevelDescriptor {
            index,
            width: level.width,
            height: level.height,
            units,
            offset,
            len,
        });
        offset += len;
    }

    let mut buffer = vec![0u8; offset];
    let mut failed_level = None;
    for level in &levels {
        let out = &mut buffer[level.offset..level.offset + level.len];
        if let Err(error) = codec.transcode_level(payload, level.index, target.format, out) {
            warn!(
                "Failed to transcode level {} of {} ({}x{}) to {}: {}",
                level.index, info.level_count, level.width, level.height, target.format, error
            );
            failed_level = Some(LevelFailure {
                level: level.index,
                error,
            });
            break;
        }
    }

    let image = GpuImage::new(
        info.width,
        info.height,
        info.level_count > 1,
        target.pixel_format,
        buffer,
    );

    Ok(Transcoded {
        image,
        target,
        levels,
        failed_level,
    })
}
