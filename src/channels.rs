//! Channel-layout classification
//!
//! Maps the set of channels an image actually uses to the [`FormatTag`] stored
//! in the container and to the hints handed to the universal encoder.

use image::RgbaImage;

use crate::format::FormatTag;

/// Channels an image actually uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UsedChannels {
    /// Grayscale
    L,
    /// Grayscale + alpha
    La,
    /// Red only
    R,
    /// Red + green
    Rg,
    Rgb,
    Rgba,
}

impl UsedChannels {
    pub const ALL: [UsedChannels; 6] = [
        UsedChannels::L,
        UsedChannels::La,
        UsedChannels::R,
        UsedChannels::Rg,
        UsedChannels::Rgb,
        UsedChannels::Rgba,
    ];

    /// Inspect every pixel and report which channels carry information
    pub fn detect(image: &RgbaImage) -> Self {
        let mut r = false;
        let mut g = false;
        let mut b = false;
        let mut a = false;
        let mut color = false;

        for pixel in image.pixels() {
            let [pr, pg, pb, pa] = pixel.0;
            r |= pr > 0;
            g |= pg > 0;
            b |= pb > 0;
            a |= pa < 255;
            color |= pr != pg || pr != pb;
        }

        match (color, a) {
            (false, false) => UsedChannels::L,
            (false, true) => UsedChannels::La,
            (true, true) => UsedChannels::Rgba,
            (true, false) if r && !g && !b => UsedChannels::R,
            (true, false) if !b => UsedChannels::Rg,
            (true, false) => UsedChannels::Rgb,
        }
    }
}

/// How two-channel images are handed to the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RgStrategy {
    /// Move green into alpha and replicate red across RGB before encoding
    RepackToRa,
    /// Encode red in the colour slice and green in the alpha slice
    SplitPlanes,
}

impl RgStrategy {
    /// Strategy selected at build time through the `rg-split-planes` feature
    #[cfg(not(feature = "rg-split-planes"))]
    pub const ACTIVE: RgStrategy = RgStrategy::RepackToRa;
    #[cfg(feature = "rg-split-planes")]
    pub const ACTIVE: RgStrategy = RgStrategy::SplitPlanes;
}

/// Encoder hints attached to a classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeHints {
    /// Keep an alpha slice even if every pixel is opaque
    pub force_alpha: bool,
    /// Apply [`repack_rg_to_ra`] to the source before encoding
    pub repack_rg_to_ra: bool,
    /// Encode red and green as separate colour/alpha planes
    pub split_rg_planes: bool,
}

/// Result of [`classify`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub tag: FormatTag,
    pub hints: EncodeHints,
}

/// Classify with the build-time [`RgStrategy::ACTIVE`] strategy
pub fn classify(channels: UsedChannels) -> Classification {
    classify_with(channels, RgStrategy::ACTIVE)
}

/// Classify with an explicit two-channel strategy
pub fn classify_with(channels: UsedChannels, rg: RgStrategy) -> Classification {
    let force_alpha = EncodeHints {
        force_alpha: true,
        ..EncodeHints::default()
    };

    let (tag, hints) = match channels {
        UsedChannels::L | UsedChannels::R | UsedChannels::Rgb => {
            (FormatTag::Rgb, EncodeHints::default())
        }
        UsedChannels::La | UsedChannels::Rgba => (FormatTag::Rgba, force_alpha),
        UsedChannels::Rg => match rg {
            RgStrategy::RepackToRa => (
                FormatTag::RgAsRa,
                EncodeHints {
                    repack_rg_to_ra: true,
                    ..EncodeHints::default()
                },
            ),
            RgStrategy::SplitPlanes => (
                FormatTag::Rg,
                EncodeHints {
                    split_rg_planes: true,
                    ..EncodeHints::default()
                },
            ),
        },
    };

    Classification { tag, hints }
}

/// Rewrite every pixel as (r, r, r, g)
pub fn repack_rg_to_ra(image: &mut RgbaImage) {
    for pixel in image.pixels_mut() {
        let [r, g, _, _] = pixel.0;
        pixel.0 = [r, r, r, g];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_classification_table() {
        let expected = [
            (UsedChannels::L, FormatTag::Rgb, false),
            (UsedChannels::La, FormatTag::Rgba, true),
            (UsedChannels::R, FormatTag::Rgb, false),
            (UsedChannels::Rg, FormatTag::RgAsRa, false),
            (UsedChannels::Rgb, FormatTag::Rgb, false),
            (UsedChannels::Rgba, FormatTag::Rgba, true),
        ];

        for (channels, tag, force_alpha) in expected {
            let class = classify_with(channels, RgStrategy::RepackToRa);
            assert_eq!(class.tag, tag, "{:?}", channels);
            assert_eq!(class.hints.force_alpha, force_alpha, "{:?}", channels);
            assert!(!class.hints.split_rg_planes);
            assert_eq!(class.hints.repack_rg_to_ra, channels == UsedChannels::Rg);
        }
    }

    #[test]
    fn test_split_planes_strategy() {
        let class = classify_with(UsedChannels::Rg, RgStrategy::SplitPlanes);
        assert_eq!(class.tag, FormatTag::Rg);
        assert!(class.hints.split_rg_planes);
        assert!(!class.hints.repack_rg_to_ra);

        // Other rows don't depend on the strategy
        for channels in UsedChannels::ALL {
            if channels != UsedChannels::Rg {
                assert_eq!(
                    classify_with(channels, RgStrategy::SplitPlanes),
                    classify_with(channels, RgStrategy::RepackToRa)
                );
            }
        }
    }

    #[test]
    fn test_repack() {
        let mut image = RgbaImage::from_pixel(2, 2, Rgba([10, 200, 30, 255]));
        repack_rg_to_ra(&mut image);
        assert!(image.pixels().all(|p| p.0 == [10, 10, 10, 200]));
    }

    #[test]
    fn test_detect() {
        let gray = RgbaImage::from_pixel(4, 4, Rgba([90, 90, 90, 255]));
        assert_eq!(UsedChannels::detect(&gray), UsedChannels::L);

        let gray_alpha = RgbaImage::from_pixel(4, 4, Rgba([90, 90, 90, 128]));
        assert_eq!(UsedChannels::detect(&gray_alpha), UsedChannels::La);

        let red = RgbaImage::from_pixel(4, 4, Rgba([200, 0, 0, 255]));
        assert_eq!(UsedChannels::detect(&red), UsedChannels::R);

        let rg = RgbaImage::from_pixel(4, 4, Rgba([200, 40, 0, 255]));
        assert_eq!(UsedChannels::detect(&rg), UsedChannels::Rg);

        let rgb = RgbaImage::from_pixel(4, 4, Rgba([200, 40, 7, 255]));
        assert_eq!(UsedChannels::detect(&rgb), UsedChannels::Rgb);

        let rgba = RgbaImage::from_pixel(4, 4, Rgba([200, 40, 7, 3]));
        assert_eq!(UsedChannels::detect(&rgba), UsedChannels::Rgba);
    }
}
