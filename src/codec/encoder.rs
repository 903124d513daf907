//! Build-time encoder: RGBA8 mip chain to UTXF payload
//!
//! Pipeline per image:
//! 1. Split every level into 4x4 blocks (edge pixels replicated), one colour
//!    slice per block plus a gray alpha slice when the payload carries alpha
//! 2. Fit each slice's endpoints along its principal axis
//! 3. Cluster endpoints down to `max_endpoint_clusters`
//! 4. Pick selectors against the clustered endpoints
//! 5. Cluster selectors down to `max_selector_clusters`
//! 6. Write header, tables and block data
//!
//! Slice work runs through rayon parallel iterators on whichever pool is
//! installed by the caller.

use binrw::BinWrite;
use image::RgbaImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Cursor;
use tracing::debug;

use super::block::{dist3, nearest};
use super::codebook::{Endpoints, SelectorCodebook, SelectorPattern};
use super::header::{
    level_dim, max_levels, LevelRecord, UtxHeader, ENDPOINT_LEN, FLAG_HAS_ALPHA, HEADER_LEN,
    LEVEL_RECORD_LEN, MAX_CODEBOOK_LEN, MAX_DIMENSION, SELECTOR_LEN, SLICE_ENTRY_LEN, VERSION,
};
use super::CodecError;

/// Encoder settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderParams {
    /// Upper bound on endpoint codebook entries
    pub max_endpoint_clusters: u32,
    /// Upper bound on selector codebook entries
    pub max_selector_clusters: u32,
    /// Always store an alpha slice
    pub force_alpha: bool,
    /// Store an alpha slice when any source pixel is not fully opaque
    pub check_for_alpha: bool,
    /// Encode red as the colour slice and green as the alpha slice
    pub split_rg_to_color_alpha: bool,
    /// Refinement passes when endpoints need k-means clustering
    pub kmeans_iterations: u32,
}

impl Default for EncoderParams {
    fn default() -> Self {
        Self {
            max_endpoint_clusters: 512,
            max_selector_clusters: 512,
            force_alpha: false,
            check_for_alpha: true,
            split_rg_to_color_alpha: false,
            kmeans_iterations: 8,
        }
    }
}

impl EncoderParams {
    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_CODEBOOK_LEN).contains(&self.max_endpoint_clusters) {
            return Err(ConfigError::EndpointClusters(self.max_endpoint_clusters));
        }
        if !(1..=MAX_CODEBOOK_LEN).contains(&self.max_selector_clusters) {
            return Err(ConfigError::SelectorClusters(self.max_selector_clusters));
        }
        if self.kmeans_iterations == 0 {
            return Err(ConfigError::KmeansIterations);
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Endpoint cluster cap must be between 1 and 65536, got {0}")]
    EndpointClusters(u32),

    #[error("Selector cluster cap must be between 1 and 65536, got {0}")]
    SelectorClusters(u32),

    #[error("At least one k-means iteration is required")]
    KmeansIterations,
}

/// Encoding errors
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("No source levels supplied")]
    NoLevels,

    #[error("Level {level} is {width}x{height}; dimensions must be 1..=16384")]
    InvalidDimensions { level: usize, width: u32, height: u32 },

    #[error("Level {level} is {got:?}, expected {expected:?} for this mip chain")]
    LevelMismatch {
        level: usize,
        expected: (u32, u32),
        got: (u32, u32),
    },

    #[error("{count} levels supplied, a {width}x{height} chain has at most {max}")]
    TooManyLevels {
        count: usize,
        max: u32,
        width: u32,
        height: u32,
    },

    #[error("Encoded data section is too large ({0} bytes)")]
    TooLarge(usize),

    #[error("Failed to write payload: {0}")]
    Write(#[from] CodecError),
}

/// Encoder for the universal payload.
///
/// Borrows the shared [`SelectorCodebook`] for its whole lifetime.
pub struct UniversalEncoder<'cb> {
    params: EncoderParams,
    codebook: &'cb SelectorCodebook,
}

/// Pixels of one slice, row-major
type SlicePixels = [[u8; 3]; 16];

impl<'cb> UniversalEncoder<'cb> {
    pub fn new(
        params: EncoderParams,
        codebook: &'cb SelectorCodebook,
    ) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self { params, codebook })
    }

    pub fn params(&self) -> &EncoderParams {
        &self.params
    }

    /// Encode `levels` (base level first, each half the previous) into a payload
    pub fn encode(&self, levels: &[RgbaImage]) -> Result<Vec<u8>, EncodeError> {
        self.check_levels(levels)?;
        let base = &levels[0];
        let (width, height) = base.dimensions();

        let has_alpha = self.params.force_alpha
            || self.params.split_rg_to_color_alpha
            || (self.params.check_for_alpha && levels.iter().any(has_translucency));
        let slice_count = if has_alpha { 2 } else { 1 };

        // Slices of every level in storage order: level, block, slice
        let mut slices: Vec<SlicePixels> = Vec::new();
        let mut level_blocks = Vec::with_capacity(levels.len());
        for level in levels {
            let blocks = gather_blocks(level);
            level_blocks.push(blocks.len());
            for block in &blocks {
                slices.extend(self.split_block(block, has_alpha));
            }
        }

        let fitted: Vec<Endpoints> = slices.par_iter().map(fit_endpoints).collect();
        let (endpoints, endpoint_idx) = self.cluster_endpoints(&fitted);

        let patterns: Vec<SelectorPattern> = slices
            .par_iter()
            .zip(endpoint_idx.par_iter())
            .map(|(pixels, &e)| best_selectors(&endpoints[e], pixels))
            .collect();
        let (selectors, selector_idx) =
            self.cluster_selectors(&slices, &endpoints, &endpoint_idx, &patterns);

        debug!(
            "Encoded {}x{} with {} levels: {} slices, {} endpoints, {} selectors, alpha={}",
            width,
            height,
            levels.len(),
            slices.len(),
            endpoints.len(),
            selectors.len(),
            has_alpha
        );

        // Data section
        let tables_len = levels.len() * LEVEL_RECORD_LEN
            + endpoints.len() * ENDPOINT_LEN
            + selectors.len() * SELECTOR_LEN;
        let blocks_len = slices.len() * SLICE_ENTRY_LEN;
        let data_len = tables_len + blocks_len;
        let data_size = u32::try_from(data_len).map_err(|_| EncodeError::TooLarge(data_len))?;

        let mut table = Cursor::new(Vec::with_capacity(data_len));
        let mut offset = tables_len;
        for (i, &blocks) in level_blocks.iter().enumerate() {
            let len = blocks * slice_count * SLICE_ENTRY_LEN;
            let record = LevelRecord {
                width: level_dim(width, i as u32),
                height: level_dim(height, i as u32),
                offset: offset as u32,
                len: len as u32,
            };
            record.write(&mut table).map_err(CodecError::from)?;
            offset += len;
        }
        let mut data = table.into_inner();
        for e in &endpoints {
            data.extend_from_slice(&e.to_bytes());
        }
        for s in &selectors {
            data.extend_from_slice(&s.0.to_le_bytes());
        }
        for (&e, &s) in endpoint_idx.iter().zip(&selector_idx) {
            data.extend_from_slice(&(e as u16).to_le_bytes());
            data.extend_from_slice(&(s as u16).to_le_bytes());
        }

        let header = UtxHeader {
            version: VERSION,
            flags: if has_alpha { FLAG_HAS_ALPHA } else { 0 },
            width,
            height,
            level_count: levels.len() as u32,
            endpoint_count: endpoints.len() as u32,
            selector_count: selectors.len() as u32,
            data_size,
            data_checksum: xxhash_rust::xxh64::xxh64(&data, 0),
        };

        let mut payload = header.to_bytes()?;
        payload.reserve(data.len());
        payload.extend_from_slice(&data);
        debug_assert_eq!(payload.len(), HEADER_LEN + data_len);
        Ok(payload)
    }

    fn check_levels(&self, levels: &[RgbaImage]) -> Result<(), EncodeError> {
        let base = levels.first().ok_or(EncodeError::NoLevels)?;
        let (width, height) = base.dimensions();
        let valid = 1..=MAX_DIMENSION;
        if !valid.contains(&width) || !valid.contains(&height) {
            return Err(EncodeError::InvalidDimensions {
                level: 0,
                width,
                height,
            });
        }

        let max = max_levels(width, height);
        if levels.len() > max as usize {
            return Err(EncodeError::TooManyLevels {
                count: levels.len(),
                max,
                width,
                height,
            });
        }

        for (i, level) in levels.iter().enumerate().skip(1) {
            let expected = (level_dim(width, i as u32), level_dim(height, i as u32));
            if level.dimensions() != expected {
                return Err(EncodeError::LevelMismatch {
                    level: i,
                    expected,
                    got: level.dimensions(),
                });
            }
        }
        Ok(())
    }

    /// Colour slice, then the gray alpha slice if present
    fn split_block(&self, block: &[[u8; 4]; 16], has_alpha: bool) -> Vec<SlicePixels> {
        let split = self.params.split_rg_to_color_alpha;
        let color: SlicePixels = std::array::from_fn(|i| {
            let [r, g, b, _] = block[i];
            if split {
                [r; 3]
            } else {
                [r, g, b]
            }
        });

        if !has_alpha {
            return vec![color];
        }

        let alpha: SlicePixels = std::array::from_fn(|i| {
            let [_, g, _, a] = block[i];
            if split {
                [g; 3]
            } else {
                [a; 3]
            }
        });
        vec![color, alpha]
    }

    /// Endpoint codebook and per-slice index into it
    fn cluster_endpoints(&self, fitted: &[Endpoints]) -> (Vec<Endpoints>, Vec<usize>) {
        let cap = self.params.max_endpoint_clusters as usize;

        let mut unique: Vec<Endpoints> = Vec::new();
        let mut counts: Vec<u32> = Vec::new();
        let mut lookup: HashMap<Endpoints, usize> = HashMap::new();
        let unique_idx: Vec<usize> = fitted
            .iter()
            .map(|e| {
                *lookup.entry(*e).or_insert_with(|| {
                    unique.push(*e);
                    counts.push(0);
                    unique.len() - 1
                })
            })
            .collect();
        for &u in &unique_idx {
            counts[u] += 1;
        }

        if unique.len() <= cap {
            return (unique, unique_idx);
        }

        let (centroids, assignment) =
            kmeans_endpoints(&unique, &counts, cap, self.params.kmeans_iterations);

        // Drop clusters nothing maps to
        let mut remap = vec![usize::MAX; centroids.len()];
        let mut codebook = Vec::new();
        for &c in &assignment {
            if remap[c] == usize::MAX {
                remap[c] = codebook.len();
                codebook.push(centroids[c]);
            }
        }

        debug!(
            "Clustered {} unique endpoint pairs into {}",
            unique.len(),
            codebook.len()
        );

        let indices = unique_idx.iter().map(|&u| remap[assignment[u]]).collect();
        (codebook, indices)
    }

    /// Selector codebook and per-slice index into it
    fn cluster_selectors(
        &self,
        slices: &[SlicePixels],
        endpoints: &[Endpoints],
        endpoint_idx: &[usize],
        patterns: &[SelectorPattern],
    ) -> (Vec<SelectorPattern>, Vec<usize>) {
        let cap = self.params.max_selector_clusters as usize;

        let mut frequency: HashMap<SelectorPattern, (u32, usize)> = HashMap::new();
        for (order, &p) in patterns.iter().enumerate() {
            frequency.entry(p).or_insert((0, order)).0 += 1;
        }

        if frequency.len() <= cap {
            let mut unique: Vec<(SelectorPattern, usize)> =
                frequency.iter().map(|(&p, &(_, first))| (p, first)).collect();
            unique.sort_by_key(|&(_, first)| first);
            let codebook: Vec<SelectorPattern> = unique.into_iter().map(|(p, _)| p).collect();
            let lookup: HashMap<SelectorPattern, usize> =
                codebook.iter().enumerate().map(|(i, &p)| (p, i)).collect();
            let indices = patterns.iter().map(|p| lookup[p]).collect();
            return (codebook, indices);
        }

        // Shared patterns first, then the image's most frequent ones
        let mut candidates: Vec<SelectorPattern> =
            self.codebook.patterns().iter().take(cap).copied().collect();
        let mut by_frequency: Vec<(SelectorPattern, u32, usize)> = frequency
            .iter()
            .map(|(&p, &(count, first))| (p, count, first))
            .collect();
        by_frequency.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
        for (p, _, _) in by_frequency {
            if candidates.len() >= cap {
                break;
            }
            if !candidates.contains(&p) {
                candidates.push(p);
            }
        }

        let chosen: Vec<usize> = slices
            .par_iter()
            .zip(endpoint_idx.par_iter())
            .map(|(pixels, &e)| {
                let palette = endpoints[e].palette();
                let mut best = 0;
                let mut best_err = u32::MAX;
                for (i, candidate) in candidates.iter().enumerate() {
                    let err = pattern_error(&palette, *candidate, pixels);
                    if err < best_err {
                        best = i;
                        best_err = err;
                        if err == 0 {
                            break;
                        }
                    }
                }
                best
            })
            .collect();

        let mut remap = vec![usize::MAX; candidates.len()];
        let mut codebook = Vec::new();
        for &c in &chosen {
            if remap[c] == usize::MAX {
                remap[c] = codebook.len();
                codebook.push(candidates[c]);
            }
        }

        debug!(
            "Remapped {} unique selector patterns onto {}",
            frequency.len(),
            codebook.len()
        );

        let indices = chosen.iter().map(|&c| remap[c]).collect();
        (codebook, indices)
    }
}

fn has_translucency(image: &RgbaImage) -> bool {
    image.pixels().any(|p| p.0[3] < 255)
}

/// Split an image into row-major 4x4 blocks, replicating edge pixels
fn gather_blocks(image: &RgbaImage) -> Vec<[[u8; 4]; 16]> {
    let (width, height) = image.dimensions();
    let blocks_x = width.div_ceil(4);
    let blocks_y = height.div_ceil(4);

    let mut blocks = Vec::with_capacity((blocks_x * blocks_y) as usize);
    for by in 0..blocks_y {
        for bx in 0..blocks_x {
            blocks.push(std::array::from_fn(|i| {
                let x = (bx * 4 + (i % 4) as u32).min(width - 1);
                let y = (by * 4 + (i / 4) as u32).min(height - 1);
                image.get_pixel(x, y).0
            }));
        }
    }
    blocks
}

fn round_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Endpoints spanning the slice along its principal axis
fn fit_endpoints(pixels: &SlicePixels) -> Endpoints {
    let mut mean = [0f32; 3];
    for px in pixels {
        for c in 0..3 {
            mean[c] += px[c] as f32 / 16.0;
        }
    }

    let mut cov = [[0f32; 3]; 3];
    for px in pixels {
        let d: [f32; 3] = std::array::from_fn(|c| px[c] as f32 - mean[c]);
        for i in 0..3 {
            for j in 0..3 {
                cov[i][j] += d[i] * d[j];
            }
        }
    }

    // Power iteration from the luma direction
    let mut axis = [1f32, 1.0, 1.0];
    for _ in 0..8 {
        let next: [f32; 3] = std::array::from_fn(|i| (0..3).map(|j| cov[i][j] * axis[j]).sum());
        let len = next.iter().map(|v| v * v).sum::<f32>().sqrt();
        if len < 1e-6 {
            break;
        }
        axis = next.map(|v| v / len);
    }

    let (mut lo_t, mut hi_t) = (f32::MAX, f32::MIN);
    for px in pixels {
        let t: f32 = (0..3).map(|c| (px[c] as f32 - mean[c]) * axis[c]).sum();
        lo_t = lo_t.min(t);
        hi_t = hi_t.max(t);
    }

    let lo = std::array::from_fn(|c| round_u8(mean[c] + axis[c] * lo_t));
    let hi = std::array::from_fn(|c| round_u8(mean[c] + axis[c] * hi_t));
    Endpoints::new(lo, hi)
}

fn best_selectors(endpoints: &Endpoints, pixels: &SlicePixels) -> SelectorPattern {
    let palette = endpoints.palette();
    SelectorPattern::from_selectors(std::array::from_fn(|i| {
        nearest(&palette, pixels[i], dist3) as u8
    }))
}

fn pattern_error(palette: &[[u8; 3]; 4], pattern: SelectorPattern, pixels: &SlicePixels) -> u32 {
    pixels
        .iter()
        .enumerate()
        .map(|(i, &px)| dist3(palette[pattern.get(i) as usize], px))
        .sum()
}

fn endpoint_vector(e: &Endpoints) -> [f32; 6] {
    let b = e.to_bytes();
    b.map(|v| v as f32)
}

fn endpoint_distance(a: &[f32; 6], b: &[f32; 6]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Weighted k-means over unique endpoint pairs.
///
/// Returns the centroids and the cluster of each unique pair.
fn kmeans_endpoints(
    unique: &[Endpoints],
    counts: &[u32],
    k: usize,
    iterations: u32,
) -> (Vec<Endpoints>, Vec<usize>) {
    let points: Vec<[f32; 6]> = unique.iter().map(endpoint_vector).collect();

    // Evenly spaced seeds along the brightness ordering
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by_key(|&i| points[i].iter().map(|&v| v as u32).sum::<u32>());
    let mut centroids: Vec<[f32; 6]> = (0..k)
        .map(|i| points[order[i * order.len() / k]])
        .collect();

    let assign = |centroids: &[[f32; 6]]| -> Vec<usize> {
        points
            .par_iter()
            .map(|p| {
                let mut best = 0;
                let mut best_d = f32::MAX;
                for (i, c) in centroids.iter().enumerate() {
                    let d = endpoint_distance(p, c);
                    if d < best_d {
                        best = i;
                        best_d = d;
                    }
                }
                best
            })
            .collect()
    };

    let mut assignment = assign(centroids.as_slice());
    for _ in 0..iterations {
        let mut sums = vec![[0f64; 6]; k];
        let mut weights = vec![0f64; k];
        for (i, &c) in assignment.iter().enumerate() {
            let w = counts[i] as f64;
            for d in 0..6 {
                sums[c][d] += points[i][d] as f64 * w;
            }
            weights[c] += w;
        }
        for c in 0..k {
            if weights[c] > 0.0 {
                centroids[c] = std::array::from_fn(|d| (sums[c][d] / weights[c]) as f32);
            }
        }
        let next = assign(centroids.as_slice());
        if next == assignment {
            break;
        }
        assignment = next;
    }

    let codebook = centroids
        .iter()
        .map(|c| {
            Endpoints::new(
                [round_u8(c[0]), round_u8(c[1]), round_u8(c[2])],
                [round_u8(c[3]), round_u8(c[4]), round_u8(c[5])],
            )
        })
        .collect();
    (codebook, assignment)
}
