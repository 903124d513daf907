// Compress-then-transcode round trips through every negotiated target
use std::io::Cursor;

use image::{Rgba, RgbaImage};
use image_dds::ddsfile::Dds;
use texbridge::caps::feature;
use texbridge::codec::{EncoderParams, SelectorCodebook, UniversalEncoder};
use texbridge::container::pack;
use texbridge::{
    transcode, Compressor, FeatureSet, FormatTag, GpuImage, PixelFormat, SourceImage,
    UsedChannels,
};

const TILE_COLORS: [[u8; 4]; 4] = [
    [200, 40, 40, 0],
    [40, 200, 40, 85],
    [40, 40, 200, 170],
    [220, 220, 60, 255],
];

/// 8x8 image whose 4x4 blocks are each a single colour
fn tiles() -> RgbaImage {
    RgbaImage::from_fn(8, 8, |x, y| Rgba(TILE_COLORS[((y / 4) * 2 + x / 4) as usize]))
}

fn opaque(mut image: RgbaImage) -> RgbaImage {
    for p in image.pixels_mut() {
        p.0[3] = 255;
    }
    image
}

/// Horizontal ramp: every block holds four collinear colours
fn ramp() -> RgbaImage {
    RgbaImage::from_fn(8, 8, |x, _| {
        Rgba([(x * 24) as u8, (40 + x * 12) as u8, (220 - x * 20) as u8, 255])
    })
}

fn compress(image: RgbaImage, channels: UsedChannels) -> Vec<u8> {
    let codebook = SelectorCodebook::new();
    let out = Compressor::new(&codebook).compress(&SourceImage::from(image), channels);
    assert!(!out.is_empty());
    out
}

fn decode_dds(image: &GpuImage) -> anyhow::Result<RgbaImage> {
    let dds = Dds::read(Cursor::new(image.to_dds()?))?;
    Ok(image_dds::image_from_dds(&dds, 0)?)
}

fn assert_close(actual: &RgbaImage, expected: &RgbaImage, channels: &[usize], tolerance: i32) {
    assert_eq!(actual.dimensions(), expected.dimensions());
    for (x, y, a) in actual.enumerate_pixels() {
        let e = expected.get_pixel(x, y);
        for &c in channels {
            let diff = (a.0[c] as i32 - e.0[c] as i32).abs();
            assert!(
                diff <= tolerance,
                "pixel ({x}, {y}) channel {c}: got {:?}, expected {:?}",
                a.0,
                e.0
            );
        }
    }
}

#[test]
fn test_rgba_on_etc2_only_hardware() {
    let container = compress(tiles(), UsedChannels::Rgba);
    let image = transcode(&container, &FeatureSet::none().with(feature::ETC2)).unwrap();

    assert_eq!(image.format(), PixelFormat::Etc2Rgba8);
    assert_eq!((image.width(), image.height()), (8, 8));
    assert!(!image.has_mipmaps());
    assert_eq!(image.data().len(), 4 * 16);
}

#[test]
fn test_rgb_without_compressed_formats() {
    let container = compress(opaque(tiles()), UsedChannels::Rgb);
    assert_eq!(&container[..4], &FormatTag::Rgb.to_le_bytes());

    let image = transcode(&container, &FeatureSet::none()).unwrap();
    assert_eq!(image.format(), PixelFormat::Rgb565);
    assert_eq!((image.width(), image.height()), (8, 8));
    assert_eq!(image.data().len(), 8 * 8 * 2);

    // Top-left pixel of the first tile, blue in the high bits
    let [r, g, b, _] = TILE_COLORS[0];
    let expected = ((b as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (r as u16 >> 3);
    assert_eq!(u16::from_le_bytes([image.data()[0], image.data()[1]]), expected);
}

#[test]
fn test_rgb_on_etc1_hardware() {
    let container = compress(opaque(tiles()), UsedChannels::Rgb);
    let image = transcode(&container, &FeatureSet::none().with(feature::ETC)).unwrap();
    assert_eq!(image.format(), PixelFormat::Etc);
    assert_eq!(image.data().len(), 4 * 8);
}

#[test]
fn test_bc1_decodes_close_to_source() -> anyhow::Result<()> {
    let source = opaque(tiles());
    let container = compress(source.clone(), UsedChannels::Rgb);
    let image = transcode(&container, &FeatureSet::none().with(feature::S3TC))?;
    assert_eq!(image.format(), PixelFormat::Dxt1);

    assert_close(&decode_dds(&image)?, &source, &[0, 1, 2], 8);
    Ok(())
}

#[test]
fn test_bc3_keeps_alpha() -> anyhow::Result<()> {
    let source = tiles();
    let container = compress(source.clone(), UsedChannels::Rgba);
    let image = transcode(&container, &FeatureSet::none().with(feature::S3TC))?;
    assert_eq!(image.format(), PixelFormat::Dxt5);

    let decoded = decode_dds(&image)?;
    assert_close(&decoded, &source, &[0, 1, 2], 8);
    assert_close(&decoded, &source, &[3], 0);
    Ok(())
}

#[test]
fn test_bc7_mode6_on_ramp() -> anyhow::Result<()> {
    let source = ramp();
    let container = compress(source.clone(), UsedChannels::Rgb);
    let image = transcode(&container, &FeatureSet::from_names(feature::ALL))?;
    assert_eq!(image.format(), PixelFormat::BptcRgba);

    let decoded = decode_dds(&image)?;
    assert_close(&decoded, &source, &[0, 1, 2], 8);
    assert_close(&decoded, &source, &[3], 0);
    Ok(())
}

#[test]
fn test_bc7_mode5_keeps_alpha() -> anyhow::Result<()> {
    let source = tiles();
    let container = compress(source.clone(), UsedChannels::Rgba);
    let image = transcode(&container, &FeatureSet::none().with(feature::BPTC))?;
    assert_eq!(image.format(), PixelFormat::BptcRgba);

    let decoded = decode_dds(&image)?;
    assert_close(&decoded, &source, &[0, 1, 2], 8);
    assert_close(&decoded, &source, &[3], 2);
    Ok(())
}

#[cfg(not(feature = "rg-split-planes"))]
#[test]
fn test_rg_repacked_to_red_alpha() -> anyhow::Result<()> {
    let source = RgbaImage::from_fn(8, 8, |x, y| {
        let [r, g, _, _] = TILE_COLORS[((y / 4) * 2 + x / 4) as usize];
        Rgba([r, g, 0, 255])
    });
    let container = compress(source.clone(), UsedChannels::Rg);
    assert_eq!(&container[..4], &FormatTag::RgAsRa.to_le_bytes());

    let image = transcode(&container, &FeatureSet::none().with(feature::S3TC))?;
    assert_eq!(image.format(), PixelFormat::Dxt5RaAsRg);

    let decoded = decode_dds(&image)?;
    for (x, y, p) in decoded.enumerate_pixels() {
        let [r, g, _, _] = source.get_pixel(x, y).0;
        assert!((p.0[0] as i32 - r as i32).abs() <= 8);
        assert_eq!(p.0[3], g);
    }

    // Without compressed formats the repacked layout falls back to RGBA8
    let raw = transcode(&container, &FeatureSet::none())?;
    assert_eq!(raw.format(), PixelFormat::Rgba8);
    let first = &raw.data()[..4];
    let [r, g, _, _] = TILE_COLORS[0];
    assert_eq!(first, &[r, r, r, g]);
    Ok(())
}

#[test]
fn test_rg_planes_to_bc5() -> anyhow::Result<()> {
    let source = RgbaImage::from_fn(8, 8, |x, y| {
        let [r, g, _, _] = TILE_COLORS[((y / 4) * 2 + x / 4) as usize];
        Rgba([r, g, 0, 255])
    });

    let codebook = SelectorCodebook::new();
    let params = EncoderParams {
        split_rg_to_color_alpha: true,
        ..Default::default()
    };
    let payload = UniversalEncoder::new(params, &codebook)?.encode(&[source.clone()])?;
    let container = pack(FormatTag::Rg, &payload);

    let image = transcode(&container, &FeatureSet::none().with(feature::RGTC))?;
    assert_eq!(image.format(), PixelFormat::RgtcRg);

    let decoded = decode_dds(&image)?;
    assert_close(&decoded, &source, &[0, 1], 0);
    Ok(())
}
