//! Uncompressed raster output
//!
//! Raw targets are written pixel by pixel in raster order. Pixels of edge
//! blocks that fall outside the level are dropped.

use super::block::UniversalBlock;
use crate::format::TranscodeFormat;

/// Uncompressed transcode targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RawFormat {
    Bgr565,
    Rgba4444,
    Rgba32,
}

impl RawFormat {
    pub fn from_target(target: TranscodeFormat) -> Option<Self> {
        match target {
            TranscodeFormat::Bgr565 => Some(RawFormat::Bgr565),
            TranscodeFormat::Rgba4444 => Some(RawFormat::Rgba4444),
            TranscodeFormat::Rgba32 => Some(RawFormat::Rgba32),
            _ => None,
        }
    }

    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            RawFormat::Bgr565 | RawFormat::Rgba4444 => 2,
            RawFormat::Rgba32 => 4,
        }
    }

    fn write_pixel(&self, [r, g, b, a]: [u8; 4], out: &mut [u8]) {
        match self {
            RawFormat::Bgr565 => {
                let v = ((b as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (r as u16 >> 3);
                out[..2].copy_from_slice(&v.to_le_bytes());
            }
            RawFormat::Rgba4444 => {
                let v = ((r as u16 >> 4) << 12)
                    | ((g as u16 >> 4) << 8)
                    | ((b as u16 >> 4) << 4)
                    | (a as u16 >> 4);
                out[..2].copy_from_slice(&v.to_le_bytes());
            }
            RawFormat::Rgba32 => out[..4].copy_from_slice(&[r, g, b, a]),
        }
    }

    /// Write block (`bx`, `by`) of a `width` x `height` level into `out`
    pub fn write_block(
        &self,
        block: &UniversalBlock,
        bx: u32,
        by: u32,
        width: u32,
        height: u32,
        out: &mut [u8],
    ) {
        let bpp = self.bytes_per_pixel();
        let pixels = block.rgba();
        for py in 0..4 {
            let y = by * 4 + py;
            if y >= height {
                break;
            }
            for px in 0..4 {
                let x = bx * 4 + px;
                if x >= width {
                    break;
                }
                let offset = (y as usize * width as usize + x as usize) * bpp;
                self.write_pixel(pixels[(py * 4 + px) as usize], &mut out[offset..offset + bpp]);
            }
        }
    }
}
