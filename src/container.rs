//! Container framing
//!
//! ```text
//! offset 0, length 4: format tag, little-endian u32
//! offset 4, length N: universal payload
//! ```
//!
//! The payload carries its own dimensions and level count, so the prefix is
//! the only metadata the bridge adds.

use crate::format::FormatTag;

/// Container framing errors
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("Container is {0} bytes, shorter than the 4-byte format tag")]
    Truncated(usize),

    #[error("Unrecognized format tag: {0}")]
    UnrecognizedTag(u32),
}

/// A borrowed, parsed container
#[derive(Debug, Clone, Copy)]
pub struct Container<'a> {
    tag: FormatTag,
    payload: &'a [u8],
}

impl<'a> Container<'a> {
    /// Split a container into its checked tag and the payload bytes
    pub fn parse(bytes: &'a [u8]) -> Result<Self, ContainerError> {
        let Some((prefix, payload)) = bytes.split_first_chunk::<{ FormatTag::ENCODED_LEN }>()
        else {
            return Err(ContainerError::Truncated(bytes.len()));
        };

        Ok(Self {
            tag: FormatTag::from_le_bytes(*prefix)?,
            payload,
        })
    }

    pub fn tag(&self) -> FormatTag {
        self.tag
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }
}

/// Prefix `payload` with the encoded `tag`
pub fn pack(tag: FormatTag, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(FormatTag::ENCODED_LEN + payload.len());
    out.extend_from_slice(&tag.to_le_bytes());
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_and_parse() {
        let bytes = pack(FormatTag::RgAsRa, b"payload");
        assert_eq!(&bytes[..4], &[3, 0, 0, 0]);

        let container = Container::parse(&bytes).unwrap();
        assert_eq!(container.tag(), FormatTag::RgAsRa);
        assert_eq!(container.payload(), b"payload");
    }

    #[test]
    fn test_empty_payload_is_allowed_by_framing() {
        let container = Container::parse(&[1, 0, 0, 0]).unwrap();
        assert_eq!(container.tag(), FormatTag::Rgb);
        assert!(container.payload().is_empty());
    }

    #[test]
    fn test_short_buffer() {
        assert!(matches!(
            Container::parse(&[2, 0, 0]),
            Err(ContainerError::Truncated(3))
        ));
        assert!(matches!(
            Container::parse(&[]),
            Err(ContainerError::Truncated(0))
        ));
    }

    #[test]
    fn test_bad_tag() {
        let mut bytes = 99u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0; 16]);
        assert!(matches!(
            Container::parse(&bytes),
            Err(ContainerError::UnrecognizedTag(99))
        ));
    }
}
