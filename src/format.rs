//! Format identifiers shared by the encoder and the runtime transcoder
//!
//! - [`FormatTag`]: the channel-layout family stored in the container prefix
//! - [`TranscodeFormat`]: the GPU format the universal payload is transcoded into
//! - [`PixelFormat`]: the format identifier carried by the resulting [`GpuImage`]
//!
//! [`GpuImage`]: crate::image::GpuImage

use crate::container::ContainerError;

/// Channel-layout family of a container, stored as its first 4 bytes.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatTag {
    /// Two native planes: red in the colour slice, green in the alpha slice
    Rg = 0,
    /// Opaque colour (also used for luminance and red-only images)
    Rgb = 1,
    /// Colour with alpha
    Rgba = 2,
    /// Two channels repacked as RRR + alpha before compression
    RgAsRa = 3,
}

impl FormatTag {
    /// Size of the encoded tag in bytes
    pub const ENCODED_LEN: usize = 4;

    pub const ALL: [FormatTag; 4] = [
        FormatTag::Rg,
        FormatTag::Rgb,
        FormatTag::Rgba,
        FormatTag::RgAsRa,
    ];

    /// Encode as the 4-byte little-endian container prefix
    pub fn to_le_bytes(self) -> [u8; 4] {
        (self as u32).to_le_bytes()
    }

    /// Decode the 4-byte little-endian container prefix
    pub fn from_le_bytes(bytes: [u8; 4]) -> Result<Self, ContainerError> {
        Self::try_from(u32::from_le_bytes(bytes))
    }

    /// Name for logging
    pub fn name(&self) -> &'static str {
        match self {
            FormatTag::Rg => "RG",
            FormatTag::Rgb => "RGB",
            FormatTag::Rgba => "RGBA",
            FormatTag::RgAsRa => "RG_AS_RA",
        }
    }
}

impl TryFrom<u32> for FormatTag {
    type Error = ContainerError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FormatTag::Rg),
            1 => Ok(FormatTag::Rgb),
            2 => Ok(FormatTag::Rgba),
            3 => Ok(FormatTag::RgAsRa),
            other => Err(ContainerError::UnrecognizedTag(other)),
        }
    }
}

impl std::fmt::Display for FormatTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Storage unit of a GPU format: a 4x4 block or a single pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockLayout {
    /// 4x4 compressed block of the given size in bytes
    Block4x4 { bytes: usize },
    /// Uncompressed raster pixel of the given size in bytes
    Pixel { bytes: usize },
}

impl BlockLayout {
    /// Bytes per block (or per pixel for uncompressed layouts)
    pub fn bytes_per_unit(&self) -> usize {
        match *self {
            BlockLayout::Block4x4 { bytes } | BlockLayout::Pixel { bytes } => bytes,
        }
    }

    /// Pixel dimensions covered by one unit
    pub fn unit_dims(&self) -> (u32, u32) {
        match self {
            BlockLayout::Block4x4 { .. } => (4, 4),
            BlockLayout::Pixel { .. } => (1, 1),
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self, BlockLayout::Block4x4 { .. })
    }

    /// Number of units covering a `width` x `height` surface
    pub fn unit_count(&self, width: u32, height: u32) -> usize {
        let (uw, uh) = self.unit_dims();
        width.div_ceil(uw) as usize * height.div_ceil(uh) as usize
    }

    /// Byte size of a `width` x `height` surface
    pub fn surface_size(&self, width: u32, height: u32) -> usize {
        self.unit_count(width, height) * self.bytes_per_unit()
    }
}

/// Target format handed to the universal transcoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranscodeFormat {
    /// BC1 / DXT1, opaque colour
    Bc1,
    /// BC3 / DXT5, colour + interpolated alpha
    Bc3,
    /// BC5 / RGTC2, two independent channels
    Bc5,
    /// BC7 mode 6 with alpha pinned to 255
    Bc7M6OpaqueOnly,
    /// BC7 mode 5, separate colour and alpha indices
    Bc7M5,
    /// ETC1 colour
    Etc1,
    /// ETC2 RGBA8 (EAC alpha + ETC1 colour)
    Etc2Rgba,
    /// 16-bit 5:6:5, blue in the high bits
    Bgr565,
    /// 16-bit 4:4:4:4, red in the high bits
    Rgba4444,
    /// 32-bit RGBA
    Rgba32,
}

impl TranscodeFormat {
    pub fn layout(&self) -> BlockLayout {
        match self {
            TranscodeFormat::Bc1 | TranscodeFormat::Etc1 => BlockLayout::Block4x4 { bytes: 8 },
            TranscodeFormat::Bc3
            | TranscodeFormat::Bc5
            | TranscodeFormat::Bc7M6OpaqueOnly
            | TranscodeFormat::Bc7M5
            | TranscodeFormat::Etc2Rgba => BlockLayout::Block4x4 { bytes: 16 },
            TranscodeFormat::Bgr565 | TranscodeFormat::Rgba4444 => BlockLayout::Pixel { bytes: 2 },
            TranscodeFormat::Rgba32 => BlockLayout::Pixel { bytes: 4 },
        }
    }

    pub fn bytes_per_block(&self) -> usize {
        self.layout().bytes_per_unit()
    }

    pub fn name(&self) -> &'static str {
        match self {
            TranscodeFormat::Bc1 => "BC1",
            TranscodeFormat::Bc3 => "BC3",
            TranscodeFormat::Bc5 => "BC5",
            TranscodeFormat::Bc7M6OpaqueOnly => "BC7_M6_OPAQUE",
            TranscodeFormat::Bc7M5 => "BC7_M5",
            TranscodeFormat::Etc1 => "ETC1",
            TranscodeFormat::Etc2Rgba => "ETC2_RGBA",
            TranscodeFormat::Bgr565 => "BGR565",
            TranscodeFormat::Rgba4444 => "RGBA4444",
            TranscodeFormat::Rgba32 => "RGBA32",
        }
    }
}

impl std::fmt::Display for TranscodeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Pixel format of a transcoded [`GpuImage`](crate::image::GpuImage)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Rgb565,
    Rgba4444,
    Rgba8,
    /// BC1
    Dxt1,
    /// BC3
    Dxt5,
    /// BC3 holding a two-channel image as red in RGB and green in alpha
    Dxt5RaAsRg,
    /// BC7
    BptcRgba,
    /// ETC1
    Etc,
    Etc2Rgba8,
    /// BC5
    RgtcRg,
}

impl PixelFormat {
    /// Storage layout; always identical to the layout of the paired [`TranscodeFormat`]
    pub fn layout(&self) -> BlockLayout {
        match self {
            PixelFormat::Dxt1 | PixelFormat::Etc => BlockLayout::Block4x4 { bytes: 8 },
            PixelFormat::Dxt5
            | PixelFormat::Dxt5RaAsRg
            | PixelFormat::BptcRgba
            | PixelFormat::Etc2Rgba8
            | PixelFormat::RgtcRg => BlockLayout::Block4x4 { bytes: 16 },
            PixelFormat::Rgb565 | PixelFormat::Rgba4444 => BlockLayout::Pixel { bytes: 2 },
            PixelFormat::Rgba8 => BlockLayout::Pixel { bytes: 4 },
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.layout().is_compressed()
    }

    pub fn name(&self) -> &'static str {
        match self {
            PixelFormat::Rgb565 => "RGB565",
            PixelFormat::Rgba4444 => "RGBA4444",
            PixelFormat::Rgba8 => "RGBA8",
            PixelFormat::Dxt1 => "DXT1",
            PixelFormat::Dxt5 => "DXT5",
            PixelFormat::Dxt5RaAsRg => "DXT5_RA_AS_RG",
            PixelFormat::BptcRgba => "BPTC_RGBA",
            PixelFormat::Etc => "ETC",
            PixelFormat::Etc2Rgba8 => "ETC2_RGBA8",
            PixelFormat::RgtcRg => "RGTC_RG",
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
