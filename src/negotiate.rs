//! Capability negotiation
//!
//! Picks the transcode target for a container from its [`FormatTag`] and the
//! runtime's features. Each tag has its own most-capable-first preference
//! order; the codec target and the result pixel format are always chosen as a
//! pair because the pixel format encodes the block layout the transcoder
//! writes.

use crate::caps::{feature, HardwareFeatures};
use crate::format::{FormatTag, PixelFormat, TranscodeFormat};

/// Codec target paired with the result image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TranscodeTarget {
    pub format: TranscodeFormat,
    pub pixel_format: PixelFormat,
}

impl TranscodeTarget {
    const fn new(format: TranscodeFormat, pixel_format: PixelFormat) -> Self {
        Self {
            format,
            pixel_format,
        }
    }
}

/// Negotiation errors
#[derive(Debug, thiserror::Error)]
pub enum NegotiateError {
    #[error("No {tag} transcode path is implemented for the '{feature}' capability")]
    UnsupportedTarget {
        tag: FormatTag,
        feature: &'static str,
    },

    #[error("{0} containers need a software decode path, which is not available")]
    SoftwareDecodeUnavailable(FormatTag),
}

/// Select the transcode target for `tag` on hardware exposing `features`
pub fn negotiate<F>(tag: FormatTag, features: &F) -> Result<TranscodeTarget, NegotiateError>
where
    F: HardwareFeatures + ?Sized,
{
    use PixelFormat as P;
    use TranscodeFormat as T;

    let has = |name: &str| features.has_feature(name);

    let target = match tag {
        FormatTag::Rgb => {
            if has(feature::BPTC) {
                TranscodeTarget::new(T::Bc7M6OpaqueOnly, P::BptcRgba)
            } else if has(feature::S3TC) {
                TranscodeTarget::new(T::Bc1, P::Dxt1)
            } else if has(feature::ETC) {
                TranscodeTarget::new(T::Etc1, P::Etc)
            } else {
                TranscodeTarget::new(T::Bgr565, P::Rgb565)
            }
        }
        FormatTag::Rgba => {
            if has(feature::BPTC) {
                TranscodeTarget::new(T::Bc7M5, P::BptcRgba)
            } else if has(feature::S3TC) {
                TranscodeTarget::new(T::Bc3, P::Dxt5)
            } else if has(feature::ETC2) {
                TranscodeTarget::new(T::Etc2Rgba, P::Etc2Rgba8)
            } else {
                TranscodeTarget::new(T::Rgba4444, P::Rgba4444)
            }
        }
        FormatTag::RgAsRa => {
            if has(feature::S3TC) {
                TranscodeTarget::new(T::Bc3, P::Dxt5RaAsRg)
            } else if has(feature::ETC2) {
                TranscodeTarget::new(T::Etc2Rgba, P::Etc2Rgba8)
            } else {
                // Poor for normal maps, but nothing better exists without compression
                TranscodeTarget::new(T::Rgba32, P::Rgba8)
            }
        }
        FormatTag::Rg => {
            if has(feature::RGTC) {
                TranscodeTarget::new(T::Bc5, P::RgtcRg)
            } else if has(feature::ETC2) {
                return Err(NegotiateError::UnsupportedTarget {
                    tag,
                    feature: feature::ETC2,
                });
            } else {
                return Err(NegotiateError::SoftwareDecodeUnavailable(tag));
            }
        }
    };

    Ok(target)
}
