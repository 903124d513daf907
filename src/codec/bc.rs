//! BCn block packing from universal blocks
//!
//! Endpoints come straight from the universal block; only the per-pixel
//! indices are re-picked against each format's own (quantized) palette.

use super::block::{dist3, dist4, nearest, UniversalBlock};

pub(crate) fn rgb_to_565(c: [u8; 3]) -> u16 {
    let r = (c[0] as u32 * 31 + 127) / 255;
    let g = (c[1] as u32 * 63 + 127) / 255;
    let b = (c[2] as u32 * 31 + 127) / 255;
    ((r << 11) | (g << 5) | b) as u16
}

pub(crate) fn rgb_from_565(v: u16) -> [u8; 3] {
    let r = ((v >> 11) & 31) as u8;
    let g = ((v >> 5) & 63) as u8;
    let b = (v & 31) as u8;
    [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2)]
}

fn lerp3(a: [u8; 3], b: [u8; 3], wa: u32, wb: u32) -> [u8; 3] {
    std::array::from_fn(|c| ((a[c] as u32 * wa + b[c] as u32 * wb) / (wa + wb)) as u8)
}

/// Four-colour BC1 block; also the colour half of BC3
fn encode_color_block(lo: [u8; 3], hi: [u8; 3], pixels: &[[u8; 3]; 16]) -> [u8; 8] {
    let mut c0 = rgb_to_565(hi);
    let mut c1 = rgb_to_565(lo);
    if c0 < c1 {
        std::mem::swap(&mut c0, &mut c1);
    }

    let mut out = [0u8; 8];
    out[0..2].copy_from_slice(&c0.to_le_bytes());
    out[2..4].copy_from_slice(&c1.to_le_bytes());

    // Equal endpoints select the three-colour mode in BC1; index 0 is safe in both
    if c0 == c1 {
        return out;
    }

    let p0 = rgb_from_565(c0);
    let p1 = rgb_from_565(c1);
    let palette = [p0, p1, lerp3(p0, p1, 2, 1), lerp3(p0, p1, 1, 2)];

    let indices = pixels
        .iter()
        .enumerate()
        .fold(0u32, |bits, (i, &px)| {
            bits | ((nearest(&palette, px, dist3) as u32) << (2 * i))
        });
    out[4..8].copy_from_slice(&indices.to_le_bytes());
    out
}

/// Single-channel BC4 block in eight-value mode
pub(crate) fn encode_bc4(values: &[u8; 16]) -> [u8; 8] {
    let lo = *values.iter().min().unwrap_or(&0);
    let hi = *values.iter().max().unwrap_or(&0);

    let mut out = [0u8; 8];
    out[0] = hi;
    out[1] = lo;
    if hi == lo {
        return out;
    }

    let (a0, a1) = (hi as u32, lo as u32);
    let palette: [u8; 8] = std::array::from_fn(|k| match k {
        0 => hi,
        1 => lo,
        k => {
            let k = k as u32;
            (((8 - k) * a0 + (k - 1) * a1) / 7) as u8
        }
    });

    let indices = values.iter().enumerate().fold(0u64, |bits, (i, &v)| {
        let idx = nearest(&palette, v, |a, b| (a as i32 - b as i32).unsigned_abs());
        bits | ((idx as u64) << (3 * i))
    });
    out[2..8].copy_from_slice(&indices.to_le_bytes()[..6]);
    out
}

pub(crate) fn bc1(block: &UniversalBlock) -> [u8; 8] {
    encode_color_block(block.color.endpoints.lo, block.color.endpoints.hi, &block.rgb())
}

pub(crate) fn bc3(block: &UniversalBlock) -> [u8; 16] {
    let mut out = [0u8; 16];
    out[..8].copy_from_slice(&encode_bc4(&block.alpha_values()));
    out[8..].copy_from_slice(&bc1(block));
    out
}

/// Red from the colour slice, green from the alpha slice (or the colour
/// slice's green when there is no alpha slice)
pub(crate) fn bc5(block: &UniversalBlock) -> [u8; 16] {
    let rgb = block.rgb();
    let red: [u8; 16] = std::array::from_fn(|i| rgb[i][0]);
    let green: [u8; 16] = match &block.alpha {
        Some(alpha) => alpha.values(),
        None => std::array::from_fn(|i| rgb[i][1]),
    };

    let mut out = [0u8; 16];
    out[..8].copy_from_slice(&encode_bc4(&red));
    out[8..].copy_from_slice(&encode_bc4(&green));
    out
}

/// LSB-first bit packer for 128-bit BC7 blocks
struct BitWriter {
    bits: u128,
    pos: u32,
}

impl BitWriter {
    fn new() -> Self {
        Self { bits: 0, pos: 0 }
    }

    fn put(&mut self, value: u32, count: u32) {
        let mask = (1u128 << count) - 1;
        self.bits |= (value as u128 & mask) << self.pos;
        self.pos += count;
    }

    fn finish(self) -> [u8; 16] {
        debug_assert_eq!(self.pos, 128);
        self.bits.to_le_bytes()
    }
}

const BC7_WEIGHTS2: [u32; 4] = [0, 21, 43, 64];
const BC7_WEIGHTS4: [u32; 16] = [0, 4, 9, 13, 17, 21, 26, 30, 34, 38, 43, 47, 51, 55, 60, 64];

fn bc7_interp(e0: u8, e1: u8, w: u32) -> u8 {
    (((64 - w) * e0 as u32 + w * e1 as u32 + 32) >> 6) as u8
}

/// 7-bit endpoint plus shared p-bit, the p-bit chosen to minimize error
fn quantize_p(v: [u8; 4], force_p: Option<u32>) -> ([u32; 4], u32) {
    let candidates: &[u32] = match &force_p {
        Some(p) => std::slice::from_ref(p),
        None => &[0, 1],
    };

    let mut best = ([0; 4], 0, u32::MAX);
    for &p in candidates {
        let mut q = [0u32; 4];
        let mut err = 0;
        for c in 0..4 {
            let target = v[c] as i32;
            let qc = ((target - p as i32 + 1) / 2).clamp(0, 127);
            let recon = (qc << 1) | p as i32;
            err += (recon - target).unsigned_abs();
            q[c] = qc as u32;
        }
        if err < best.2 {
            best = (q, p, err);
        }
    }
    (best.0, best.1)
}

fn unquantize_p(q: [u32; 4], p: u32) -> [u8; 4] {
    std::array::from_fn(|c| ((q[c] << 1) | p) as u8)
}

/// BC7 mode 6: one subset, RGBA 7.7.7.7 + p-bit endpoints, 4-bit indices.
/// With `opaque` the p-bits are pinned to 1 so alpha decodes to exactly 255.
fn bc7_mode6(lo: [u8; 4], hi: [u8; 4], pixels: &[[u8; 4]; 16], opaque: bool) -> [u8; 16] {
    let force_p = opaque.then_some(1);
    let (mut q0, mut p0) = quantize_p(lo, force_p);
    let (mut q1, mut p1) = quantize_p(hi, force_p);

    let e0 = unquantize_p(q0, p0);
    let e1 = unquantize_p(q1, p1);
    let palette: [[u8; 4]; 16] = std::array::from_fn(|k| {
        std::array::from_fn(|c| bc7_interp(e0[c], e1[c], BC7_WEIGHTS4[k]))
    });

    let mut indices: [u32; 16] =
        std::array::from_fn(|i| nearest(&palette, pixels[i], dist4) as u32);

    // Anchor index (pixel 0) must have its top bit clear
    if indices[0] & 8 != 0 {
        std::mem::swap(&mut q0, &mut q1);
        std::mem::swap(&mut p0, &mut p1);
        for idx in &mut indices {
            *idx = 15 - *idx;
        }
    }

    let mut w = BitWriter::new();
    w.put(1 << 6, 7);
    for c in 0..4 {
        w.put(q0[c], 7);
        w.put(q1[c], 7);
    }
    w.put(p0, 1);
    w.put(p1, 1);
    w.put(indices[0], 3);
    for &idx in &indices[1..] {
        w.put(idx, 4);
    }
    w.finish()
}

fn quantize7(v: u8) -> u32 {
    let expand = |q: u32| ((q << 1) | (q >> 6)) as i32;
    let down = (v >> 1) as u32;
    let up = (down + 1).min(127);
    if (expand(up) - v as i32).abs() < (expand(down) - v as i32).abs() {
        up
    } else {
        down
    }
}

fn expand7(q: u32) -> u8 {
    ((q << 1) | (q >> 6)) as u8
}

/// BC7 mode 5: one subset, RGB 7.7.7 + A8 endpoints, separate 2-bit colour
/// and alpha indices, no rotation.
fn bc7_mode5(
    color_lo: [u8; 3],
    color_hi: [u8; 3],
    alpha_lo: u8,
    alpha_hi: u8,
    pixels: &[[u8; 4]; 16],
) -> [u8; 16] {
    let mut q0: [u32; 3] = std::array::from_fn(|c| quantize7(color_lo[c]));
    let mut q1: [u32; 3] = std::array::from_fn(|c| quantize7(color_hi[c]));
    let (mut a0, mut a1) = (alpha_lo as u32, alpha_hi as u32);

    let e0: [u8; 3] = std::array::from_fn(|c| expand7(q0[c]));
    let e1: [u8; 3] = std::array::from_fn(|c| expand7(q1[c]));
    let color_palette: [[u8; 3]; 4] = std::array::from_fn(|k| {
        std::array::from_fn(|c| bc7_interp(e0[c], e1[c], BC7_WEIGHTS2[k]))
    });
    let alpha_palette: [u8; 4] =
        std::array::from_fn(|k| bc7_interp(a0 as u8, a1 as u8, BC7_WEIGHTS2[k]));

    let mut color_idx: [u32; 16] = std::array::from_fn(|i| {
        let [r, g, b, _] = pixels[i];
        nearest(&color_palette, [r, g, b], dist3) as u32
    });
    let mut alpha_idx: [u32; 16] = std::array::from_fn(|i| {
        nearest(&alpha_palette, pixels[i][3], |x, y| {
            (x as i32 - y as i32).unsigned_abs()
        }) as u32
    });

    if color_idx[0] & 2 != 0 {
        std::mem::swap(&mut q0, &mut q1);
        for idx in &mut color_idx {
            *idx = 3 - *idx;
        }
    }
    if alpha_idx[0] & 2 != 0 {
        std::mem::swap(&mut a0, &mut a1);
        for idx in &mut alpha_idx {
            *idx = 3 - *idx;
        }
    }

    let mut w = BitWriter::new();
    w.put(1 << 5, 6);
    w.put(0, 2);
    for c in 0..3 {
        w.put(q0[c], 7);
        w.put(q1[c], 7);
    }
    w.put(a0, 8);
    w.put(a1, 8);
    w.put(color_idx[0], 1);
    for &idx in &color_idx[1..] {
        w.put(idx, 2);
    }
    w.put(alpha_idx[0], 1);
    for &idx in &alpha_idx[1..] {
        w.put(idx, 2);
    }
    w.finish()
}

pub(crate) fn bc7_m6_opaque(block: &UniversalBlock) -> [u8; 16] {
    let e = block.color.endpoints;
    let pixels = block.rgb().map(|[r, g, b]| [r, g, b, 255]);
    bc7_mode6(
        [e.lo[0], e.lo[1], e.lo[2], 255],
        [e.hi[0], e.hi[1], e.hi[2], 255],
        &pixels,
        true,
    )
}

pub(crate) fn bc7_m5(block: &UniversalBlock) -> [u8; 16] {
    let e = block.color.endpoints;
    let (alpha_lo, alpha_hi) = block.alpha_endpoints();
    bc7_mode5(e.lo, e.hi, alpha_lo, alpha_hi, &block.rgba())
}
