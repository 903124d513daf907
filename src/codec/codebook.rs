//! Endpoint pairs, selector patterns and the shared selector palette

use std::collections::HashSet;

/// Low/high RGB endpoints of a slice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Endpoints {
    pub lo: [u8; 3],
    pub hi: [u8; 3],
}

impl Endpoints {
    pub fn new(lo: [u8; 3], hi: [u8; 3]) -> Self {
        Self { lo, hi }
    }

    /// Grayscale endpoints, as used by alpha slices
    pub fn gray(lo: u8, hi: u8) -> Self {
        Self::new([lo; 3], [hi; 3])
    }

    /// The four colours reachable by a two-bit selector
    pub fn palette(&self) -> [[u8; 3]; 4] {
        std::array::from_fn(|s| {
            let s = s as u32;
            std::array::from_fn(|c| {
                let lo = self.lo[c] as u32;
                let hi = self.hi[c] as u32;
                ((lo * (3 - s) + hi * s + 1) / 3) as u8
            })
        })
    }

    pub fn to_bytes(&self) -> [u8; 6] {
        let [r0, g0, b0] = self.lo;
        let [r1, g1, b1] = self.hi;
        [r0, g0, b0, r1, g1, b1]
    }

    pub fn from_bytes(bytes: [u8; 6]) -> Self {
        Self::new([bytes[0], bytes[1], bytes[2]], [bytes[3], bytes[4], bytes[5]])
    }
}

/// Sixteen two-bit selectors; pixel `i` (row-major in the 4x4 block) at bits `2i`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SelectorPattern(pub u32);

impl SelectorPattern {
    pub fn from_selectors(selectors: [u8; 16]) -> Self {
        Self(
            selectors
                .iter()
                .enumerate()
                .fold(0, |bits, (i, &s)| bits | ((s as u32 & 3) << (2 * i))),
        )
    }

    pub fn get(&self, pixel: usize) -> u8 {
        ((self.0 >> (2 * pixel)) & 3) as u8
    }

    pub fn selectors(&self) -> [u8; 16] {
        std::array::from_fn(|i| self.get(i))
    }

    /// Every pixel uses the same selector
    pub fn flat(selector: u8) -> Self {
        Self::from_selectors([selector; 16])
    }
}

/// Shared palette of selector patterns.
///
/// When an image has more distinct selector patterns than the selector
/// cluster cap allows, the encoder offers these patterns as remap candidates
/// alongside the image's own most frequent ones. Construct it once and lend
/// it to every encoder that should share it.
#[derive(Debug, Clone)]
pub struct SelectorCodebook {
    patterns: Vec<SelectorPattern>,
}

const RAMP_DIRECTIONS: u32 = 32;
const RAMP_SLOPES: [f32; 3] = [0.5, 0.85, 1.4];
const RAMP_OFFSETS: [f32; 3] = [-0.75, 0.0, 0.75];

impl SelectorCodebook {
    /// The standard palette: flat patterns plus linear ramps across the block
    /// in 32 directions, 3 slopes and 3 offsets, deduplicated.
    pub fn new() -> Self {
        let mut seen = HashSet::new();
        let mut patterns = Vec::new();
        let mut push = |pattern: SelectorPattern| {
            if seen.insert(pattern) {
                patterns.push(pattern);
            }
        };

        for s in 0..4 {
            push(SelectorPattern::flat(s));
        }

        for direction in 0..RAMP_DIRECTIONS {
            let angle = direction as f32 * std::f32::consts::TAU / RAMP_DIRECTIONS as f32;
            let (sin, cos) = angle.sin_cos();
            for slope in RAMP_SLOPES {
                for offset in RAMP_OFFSETS {
                    let selectors = std::array::from_fn(|i| {
                        let dx = (i % 4) as f32 - 1.5;
                        let dy = (i / 4) as f32 - 1.5;
                        let s = 1.5 + offset + slope * (dx * cos + dy * sin);
                        s.round().clamp(0.0, 3.0) as u8
                    });
                    push(SelectorPattern::from_selectors(selectors));
                }
            }
        }

        Self { patterns }
    }

    pub fn from_patterns(patterns: Vec<SelectorPattern>) -> Self {
        Self { patterns }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &[SelectorPattern] {
        &self.patterns
    }
}

impl Default for SelectorCodebook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_endpoints_exact() {
        let e = Endpoints::new([0, 30, 255], [255, 90, 0]);
        let p = e.palette();
        assert_eq!(p[0], [0, 30, 255]);
        assert_eq!(p[3], [255, 90, 0]);
        assert_eq!(p[1], [85, 50, 170]);
        assert_eq!(p[2], [170, 70, 85]);
    }

    #[test]
    fn test_palette_rounds_to_nearest() {
        let p = Endpoints::new([0, 0, 10], [2, 1, 0]).palette();
        assert_eq!(p[1], [1, 0, 7]);
        assert_eq!(p[2], [1, 1, 3]);
    }

    #[test]
    fn test_endpoint_bytes() {
        let e = Endpoints::new([1, 2, 3], [4, 5, 6]);
        assert_eq!(e.to_bytes(), [1, 2, 3, 4, 5, 6]);
        assert_eq!(Endpoints::from_bytes(e.to_bytes()), e);
    }

    #[test]
    fn test_selector_packing() {
        let mut selectors = [0u8; 16];
        selectors[0] = 3;
        selectors[5] = 1;
        selectors[15] = 2;
        let pattern = SelectorPattern::from_selectors(selectors);
        assert_eq!(pattern.0 & 3, 3);
        assert_eq!((pattern.0 >> 10) & 3, 1);
        assert_eq!(pattern.0 >> 30, 2);
        assert_eq!(pattern.selectors(), selectors);
    }

    #[test]
    fn test_standard_codebook() {
        let a = SelectorCodebook::new();
        let b = SelectorCodebook::new();
        assert_eq!(a.patterns(), b.patterns());
        assert!(a.len() > 64);
        assert_eq!(a.patterns()[0], SelectorPattern::flat(0));

        let unique: HashSet<_> = a.patterns().iter().collect();
        assert_eq!(unique.len(), a.len());
    }
}
