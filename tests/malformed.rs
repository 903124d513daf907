// Malformed and hostile containers must fail cleanly, never panic
use proptest::prelude::*;

use image::{Rgba, RgbaImage};
use texbridge::caps::feature;
use texbridge::container::{pack, ContainerError};
use texbridge::{
    transcode, Compressor, DecodeError, FeatureSet, FormatTag, SelectorCodebook, SourceImage,
    UsedChannels,
};

fn all_features() -> FeatureSet {
    FeatureSet::from_names(feature::ALL)
}

fn valid_container() -> Vec<u8> {
    let codebook = SelectorCodebook::new();
    let image = RgbaImage::from_fn(8, 8, |x, y| Rgba([(x * 30) as u8, (y * 30) as u8, 90, 200]));
    Compressor::new(&codebook).compress(&SourceImage::from(image), UsedChannels::Rgba)
}

#[test]
fn test_truncated_container() {
    assert!(matches!(
        transcode(&[1, 0, 0], &all_features()),
        Err(DecodeError::Container(ContainerError::Truncated(3)))
    ));
    assert!(matches!(
        transcode(&[], &all_features()),
        Err(DecodeError::Container(ContainerError::Truncated(0)))
    ));
}

#[test]
fn test_unrecognized_tag() {
    let mut container = valid_container();
    container[..4].copy_from_slice(&99u32.to_le_bytes());
    assert!(matches!(
        transcode(&container, &all_features()),
        Err(DecodeError::Container(ContainerError::UnrecognizedTag(99)))
    ));
}

#[test]
fn test_tag_without_payload() {
    let container = pack(FormatTag::Rgba, &[]);
    assert!(matches!(
        transcode(&container, &all_features()),
        Err(DecodeError::InvalidHeader)
    ));
}

#[test]
fn test_truncated_payload() {
    let container = valid_container();
    let cut = &container[..container.len() - 1];
    assert!(matches!(
        transcode(cut, &all_features()),
        Err(DecodeError::InvalidHeader)
    ));
}

#[test]
fn test_corrupted_block_data_fails_checksum() {
    let mut container = valid_container();
    let last = container.len() - 1;
    container[last] ^= 0x55;
    assert!(matches!(
        transcode(&container, &all_features()),
        Err(DecodeError::Codec(_))
    ));
}

proptest! {
    #[test]
    fn prop_arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = transcode(&bytes, &all_features());
        let _ = transcode(&bytes, &FeatureSet::none());
    }

    #[test]
    fn prop_single_byte_corruption_never_panics(index in 0usize..4096, value in any::<u8>()) {
        let mut container = valid_container();
        let index = index % container.len();
        container[index] = value;

        if let Ok(image) = transcode(&container, &all_features()) {
            prop_assert_eq!(image.width(), 8);
            prop_assert_eq!(image.height(), 8);
        }
    }

    #[test]
    fn prop_any_tag_prefix(tag in any::<u32>()) {
        let mut container = valid_container();
        container[..4].copy_from_slice(&tag.to_le_bytes());

        let result = transcode(&container, &all_features());
        if tag > 3 {
            prop_assert!(
                matches!(
                    result,
                    Err(DecodeError::Container(ContainerError::UnrecognizedTag(t))) if t == tag
                ),
                "tag {} was accepted",
                tag
            );
        }
    }
}
