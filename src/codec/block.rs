//! Decoded universal blocks and shared pixel helpers

use super::codebook::{Endpoints, SelectorPattern};

/// One slice of a block: endpoints plus per-pixel selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Slice {
    pub endpoints: Endpoints,
    pub selectors: SelectorPattern,
}

impl Slice {
    /// Reconstructed RGB of each pixel
    pub fn pixels(&self) -> [[u8; 3]; 16] {
        let palette = self.endpoints.palette();
        std::array::from_fn(|i| palette[self.selectors.get(i) as usize])
    }

    /// First channel of each pixel (alpha slices are gray)
    pub fn values(&self) -> [u8; 16] {
        let pixels = self.pixels();
        std::array::from_fn(|i| pixels[i][0])
    }
}

/// A 4x4 block as stored in the universal payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UniversalBlock {
    pub color: Slice,
    pub alpha: Option<Slice>,
}

impl UniversalBlock {
    /// Reconstructed RGBA of each pixel, row-major
    pub fn rgba(&self) -> [[u8; 4]; 16] {
        let color = self.color.pixels();
        let alpha = self.alpha_values();
        std::array::from_fn(|i| {
            let [r, g, b] = color[i];
            [r, g, b, alpha[i]]
        })
    }

    pub fn rgb(&self) -> [[u8; 3]; 16] {
        self.color.pixels()
    }

    /// Alpha of each pixel; opaque when the payload has no alpha slice
    pub fn alpha_values(&self) -> [u8; 16] {
        match &self.alpha {
            Some(alpha) => alpha.values(),
            None => [255; 16],
        }
    }

    /// (low, high) alpha endpoints
    pub fn alpha_endpoints(&self) -> (u8, u8) {
        match &self.alpha {
            Some(alpha) => (alpha.endpoints.lo[0], alpha.endpoints.hi[0]),
            None => (255, 255),
        }
    }
}

/// Squared RGB distance
pub(crate) fn dist3(a: [u8; 3], b: [u8; 3]) -> u32 {
    (0..3)
        .map(|c| {
            let d = a[c] as i32 - b[c] as i32;
            (d * d) as u32
        })
        .sum()
}

/// Squared RGBA distance
pub(crate) fn dist4(a: [u8; 4], b: [u8; 4]) -> u32 {
    (0..4)
        .map(|c| {
            let d = a[c] as i32 - b[c] as i32;
            (d * d) as u32
        })
        .sum()
}

/// Index of the palette entry closest to `value` (first wins on ties)
pub(crate) fn nearest<T: Copy, const N: usize>(
    palette: &[T; N],
    value: T,
    dist: impl Fn(T, T) -> u32,
) -> usize {
    let mut best = 0;
    let mut best_err = u32::MAX;
    for (i, &entry) in palette.iter().enumerate() {
        let err = dist(entry, value);
        if err < best_err {
            best = i;
            best_err = err;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_pixels() {
        let mut selectors = [0u8; 16];
        selectors[1] = 3;
        let block = UniversalBlock {
            color: Slice {
                endpoints: Endpoints::new([0, 0, 0], [90, 120, 150]),
                selectors: SelectorPattern::from_selectors(selectors),
            },
            alpha: None,
        };

        let rgba = block.rgba();
        assert_eq!(rgba[0], [0, 0, 0, 255]);
        assert_eq!(rgba[1], [90, 120, 150, 255]);
        assert_eq!(block.alpha_endpoints(), (255, 255));
    }

    #[test]
    fn test_alpha_slice() {
        let block = UniversalBlock {
            color: Slice {
                endpoints: Endpoints::default(),
                selectors: SelectorPattern::default(),
            },
            alpha: Some(Slice {
                endpoints: Endpoints::gray(30, 60),
                selectors: SelectorPattern::flat(3),
            }),
        };
        assert_eq!(block.alpha_values(), [60; 16]);
        assert_eq!(block.alpha_endpoints(), (30, 60));
    }

    #[test]
    fn test_nearest() {
        let palette = [[0u8, 0, 0], [100, 100, 100], [200, 200, 200]];
        assert_eq!(nearest(&palette, [120, 90, 100], dist3), 1);
        assert_eq!(nearest(&palette, [255, 255, 255], dist3), 2);
    }
}
