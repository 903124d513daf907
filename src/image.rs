//! Pixel source and GPU-ready result image
//!
//! - [`SourceImage`]: what the compressor reads (base level plus any supplied mips)
//! - [`GpuImage`]: what the transcoder produces (one contiguous block buffer
//!   holding every level, base first)

use image::{DynamicImage, RgbaImage};
use image_dds::{ImageFormat, Surface};

use crate::format::PixelFormat;

/// Source image handed to the compressor
#[derive(Debug, Clone)]
pub struct SourceImage {
    base: DynamicImage,
    mipmaps: Vec<DynamicImage>,
}

impl SourceImage {
    pub fn new(base: DynamicImage) -> Self {
        Self {
            base,
            mipmaps: Vec::new(),
        }
    }

    /// Base level plus pre-generated mip levels (largest first)
    pub fn with_mipmaps(base: DynamicImage, mipmaps: Vec<DynamicImage>) -> Self {
        Self { base, mipmaps }
    }

    pub fn has_mipmaps(&self) -> bool {
        !self.mipmaps.is_empty()
    }

    pub fn clear_mipmaps(&mut self) {
        self.mipmaps.clear();
    }

    pub fn width(&self) -> u32 {
        self.base.width()
    }

    pub fn height(&self) -> u32 {
        self.base.height()
    }

    pub fn base(&self) -> &DynamicImage {
        &self.base
    }

    pub fn mipmaps(&self) -> &[DynamicImage] {
        &self.mipmaps
    }

    /// Base level converted to RGBA8
    pub fn to_rgba8(&self) -> RgbaImage {
        self.base.to_rgba8()
    }
}

impl From<DynamicImage> for SourceImage {
    fn from(image: DynamicImage) -> Self {
        Self::new(image)
    }
}

impl From<RgbaImage> for SourceImage {
    fn from(image: RgbaImage) -> Self {
        Self::new(DynamicImage::ImageRgba8(image))
    }
}

/// Export errors
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("{0} images cannot be exported as DDS")]
    UnsupportedFormat(PixelFormat),

    #[error("Failed to build DDS: {0}")]
    Dds(String),

    #[error("Failed to write DDS: {0}")]
    Write(String),
}

/// Location of one level inside a [`GpuImage`] buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MipLevel {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub offset: usize,
    pub len: usize,
}

/// Transcoded image ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuImage {
    width: u32,
    height: u32,
    has_mipmaps: bool,
    format: PixelFormat,
    data: Vec<u8>,
}

impl GpuImage {
    pub fn new(
        width: u32,
        height: u32,
        has_mipmaps: bool,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Self {
        Self {
            width,
            height,
            has_mipmaps,
            format,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn has_mipmaps(&self) -> bool {
        self.has_mipmaps
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Levels present in the buffer, walking the mip chain from the base
    /// until the buffer (or the chain) runs out
    pub fn mip_levels(&self) -> Vec<MipLevel> {
        let layout = self.format.layout();
        let mut levels = Vec::new();
        let (mut width, mut height) = (self.width, self.height);
        let mut offset = 0;

        loop {
            let len = layout.surface_size(width, height);
            if len == 0 || offset + len > self.data.len() {
                break;
            }
            levels.push(MipLevel {
                index: levels.len() as u32,
                width,
                height,
                offset,
                len,
            });
            offset += len;

            if !self.has_mipmaps || (width == 1 && height == 1) {
                break;
            }
            width = (width / 2).max(1);
            height = (height / 2).max(1);
        }
        levels
    }

    pub fn mip_count(&self) -> usize {
        self.mip_levels().len()
    }

    /// Bytes of level `index`, if present
    pub fn level_data(&self, index: usize) -> Option<&[u8]> {
        let level = self.mip_levels().into_iter().nth(index)?;
        self.data.get(level.offset..level.offset + level.len)
    }

    /// View as an `image_dds` surface (BC and RGBA8 formats only)
    pub fn to_surface(&self) -> Result<Surface<&[u8]>, ExportError> {
        let image_format = match self.format {
            PixelFormat::Dxt1 => ImageFormat::BC1RgbaUnorm,
            PixelFormat::Dxt5 | PixelFormat::Dxt5RaAsRg => ImageFormat::BC3RgbaUnorm,
            PixelFormat::BptcRgba => ImageFormat::BC7RgbaUnorm,
            PixelFormat::RgtcRg => ImageFormat::BC5RgUnorm,
            PixelFormat::Rgba8 => ImageFormat::Rgba8Unorm,
            other => return Err(ExportError::UnsupportedFormat(other)),
        };

        let levels = self.mip_levels();
        let end = levels.last().map(|l| l.offset + l.len).unwrap_or(0);

        Ok(Surface {
            width: self.width,
            height: self.height,
            depth: 1,
            layers: 1,
            mipmaps: levels.len() as u32,
            image_format,
            data: &self.data[..end],
        })
    }

    /// Serialize as a DDS file
    pub fn to_dds(&self) -> Result<Vec<u8>, ExportError> {
        let dds = self
            .to_surface()?
            .to_dds()
            .map_err(|e| ExportError::Dds(e.to_string()))?;

        let mut output = Vec::new();
        dds.write(&mut output)
            .map_err(|e| ExportError::Write(e.to_string()))?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_source_image_mipmaps() {
        let base = DynamicImage::ImageRgba8(RgbaImage::new(8, 8));
        let mip = DynamicImage::ImageRgba8(RgbaImage::new(4, 4));
        let mut source = SourceImage::with_mipmaps(base, vec![mip]);
        assert!(source.has_mipmaps());
        assert_eq!((source.width(), source.height()), (8, 8));

        source.clear_mipmaps();
        assert!(!source.has_mipmaps());
    }

    #[test]
    fn test_source_to_rgba8_converts() {
        let gray = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(2, 2, image::Luma([77])));
        let source = SourceImage::from(gray);
        assert_eq!(source.to_rgba8().get_pixel(1, 1), &Rgba([77, 77, 77, 255]));
    }

    #[test]
    fn test_mip_levels_block_format() {
        // 8x8 BC1 with two levels: 4 blocks + 1 block
        let image = GpuImage::new(8, 8, true, PixelFormat::Dxt1, vec![0; 40]);
        let levels = image.mip_levels();
        assert_eq!(levels.len(), 2);
        assert_eq!((levels[0].offset, levels[0].len), (0, 32));
        assert_eq!((levels[1].offset, levels[1].len), (32, 8));
        assert_eq!(image.level_data(1).map(|d| d.len()), Some(8));
        assert!(image.level_data(2).is_none());
    }

    #[test]
    fn test_mip_levels_pixel_format() {
        let image = GpuImage::new(4, 2, true, PixelFormat::Rgba8, vec![0; 32 + 8 + 4]);
        let dims: Vec<_> = image
            .mip_levels()
            .iter()
            .map(|l| (l.width, l.height))
            .collect();
        assert_eq!(dims, vec![(4, 2), (2, 1), (1, 1)]);
    }

    #[test]
    fn test_single_level_ignores_trailing_bytes() {
        let image = GpuImage::new(4, 4, false, PixelFormat::Dxt5, vec![0; 32]);
        assert_eq!(image.mip_count(), 1);
    }

    #[test]
    fn test_unsupported_export() {
        let image = GpuImage::new(4, 4, false, PixelFormat::Etc, vec![0; 8]);
        assert!(matches!(
            image.to_surface(),
            Err(ExportError::UnsupportedFormat(PixelFormat::Etc))
        ));
    }

    #[test]
    fn test_dds_export() {
        let image = GpuImage::new(4, 4, false, PixelFormat::Dxt1, vec![0; 8]);
        let dds = image.to_dds().unwrap();
        assert_eq!(&dds[..4], b"DDS ");
    }
}
