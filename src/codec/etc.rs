//! ETC1 / EAC / ETC2 RGBA8 block packing from universal blocks
//!
//! ETC blocks index pixels column-major (`k = x * 4 + y`) while universal
//! blocks are row-major; every loop here converts between the two.

use super::block::{dist3, UniversalBlock};

/// ETC1 intensity modifier tables (the small and large magnitude of each)
const ETC1_TABLES: [[i32; 2]; 8] = [
    [2, 8],
    [5, 17],
    [9, 29],
    [13, 42],
    [18, 60],
    [24, 80],
    [33, 106],
    [47, 183],
];

/// EAC alpha modifier tables
const EAC_TABLES: [[i32; 8]; 16] = [
    [-3, -6, -9, -15, 2, 5, 8, 14],
    [-3, -7, -10, -13, 2, 6, 9, 12],
    [-2, -5, -8, -13, 1, 4, 7, 12],
    [-2, -4, -6, -13, 1, 3, 5, 12],
    [-3, -6, -8, -12, 2, 5, 7, 11],
    [-3, -7, -9, -11, 2, 6, 8, 10],
    [-4, -7, -8, -11, 3, 6, 7, 10],
    [-3, -5, -8, -11, 2, 4, 7, 10],
    [-2, -6, -8, -10, 1, 5, 7, 9],
    [-2, -5, -8, -10, 1, 4, 7, 9],
    [-2, -4, -8, -10, 1, 3, 7, 9],
    [-2, -5, -7, -10, 1, 4, 6, 9],
    [-3, -4, -7, -10, 2, 3, 6, 9],
    [-1, -2, -3, -10, 0, 1, 2, 9],
    [-4, -6, -8, -9, 3, 5, 7, 8],
    [-3, -5, -7, -9, 2, 4, 6, 8],
];

/// Table whose modifier 4 is zero, used for flat alpha
const EAC_FLAT_TABLE: usize = 13;

fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// Row-major pixel index of ETC pixel `k`
fn raster_index(k: usize) -> usize {
    let (x, y) = (k / 4, k % 4);
    y * 4 + x
}

fn etc1_modifiers(table: usize) -> [i32; 4] {
    let [a, b] = ETC1_TABLES[table];
    [a, b, -a, -b]
}

/// ETC1 block in differential mode with both sub-blocks sharing one base
/// colour and one table
fn encode_etc1(pixels: &[[u8; 3]; 16]) -> [u8; 8] {
    let sum = pixels.iter().fold([0u32; 3], |mut acc, px| {
        for c in 0..3 {
            acc[c] += px[c] as u32;
        }
        acc
    });
    let base5: [u32; 3] = std::array::from_fn(|c| ((sum[c] / 16) * 31 + 127) / 255);
    let base: [i32; 3] = std::array::from_fn(|c| ((base5[c] << 3) | (base5[c] >> 2)) as i32);

    let shade = |modifier: i32| -> [u8; 3] {
        std::array::from_fn(|c| clamp_u8(base[c] + modifier))
    };

    let mut best = (0usize, [0usize; 16], u32::MAX);
    for table in 0..ETC1_TABLES.len() {
        let palette = etc1_modifiers(table).map(shade);
        let mut indices = [0usize; 16];
        let mut err = 0;
        for k in 0..16 {
            let px = pixels[raster_index(k)];
            let (idx, e) = palette
                .iter()
                .enumerate()
                .map(|(i, &p)| (i, dist3(p, px)))
                .min_by_key(|&(_, e)| e)
                .unwrap_or((0, 0));
            indices[k] = idx;
            err += e;
        }
        if err < best.2 {
            best = (table, indices, err);
        }
    }

    let (table, indices, _) = best;
    let t = table as u32;
    let high = (base5[0] << 27)
        | (base5[1] << 19)
        | (base5[2] << 11)
        | (t << 5)
        | (t << 2)
        | (1 << 1);
    let low = indices.iter().enumerate().fold(0u32, |bits, (k, &idx)| {
        let idx = idx as u32;
        bits | ((idx >> 1) << (16 + k)) | ((idx & 1) << k)
    });

    (((high as u64) << 32) | low as u64).to_be_bytes()
}

fn eac_error(values: &[u8; 16], base: i32, mult: i32, table: usize) -> (u32, [usize; 16]) {
    let palette: [u8; 8] = EAC_TABLES[table].map(|m| clamp_u8(base + m * mult));
    let mut indices = [0usize; 16];
    let mut err = 0;
    for k in 0..16 {
        let v = values[raster_index(k)] as i32;
        let (idx, e) = palette
            .iter()
            .enumerate()
            .map(|(i, &p)| (i, (p as i32 - v).unsigned_abs().pow(2)))
            .min_by_key(|&(_, e)| e)
            .unwrap_or((0, 0));
        indices[k] = idx;
        err += e;
    }
    (err, indices)
}

/// EAC block for a single 8-bit channel
pub(crate) fn encode_eac(values: &[u8; 16]) -> [u8; 8] {
    let lo = *values.iter().min().unwrap_or(&0) as i32;
    let hi = *values.iter().max().unwrap_or(&0) as i32;

    let (base, mult, table, indices) = if lo == hi {
        (lo, 1, EAC_FLAT_TABLE, [4usize; 16])
    } else {
        let base = (lo + hi + 1) / 2;
        let range = (hi - lo) as f32;
        let mut best = (u32::MAX, 1, 0, [0usize; 16]);
        for (table, mods) in EAC_TABLES.iter().enumerate() {
            let span = (mods[7] - mods[3]) as f32;
            let ideal = (range / span).round() as i32;
            for mult in (ideal - 1)..=(ideal + 1) {
                let mult = mult.clamp(1, 15);
                let (err, indices) = eac_error(values, base, mult, table);
                if err < best.0 {
                    best = (err, mult, table, indices);
                }
            }
        }
        (base, best.1, best.2, best.3)
    };

    let bits = indices.iter().enumerate().fold(0u64, |bits, (k, &idx)| {
        bits | ((idx as u64) << (45 - 3 * k))
    });

    let mut out = [0u8; 8];
    out[0] = base as u8;
    out[1] = ((mult as u8) << 4) | table as u8;
    out[2..].copy_from_slice(&bits.to_be_bytes()[2..]);
    out
}

pub(crate) fn etc1(block: &UniversalBlock) -> [u8; 8] {
    encode_etc1(&block.rgb())
}

pub(crate) fn etc2_rgba(block: &UniversalBlock) -> [u8; 16] {
    let mut out = [0u8; 16];
    out[..8].copy_from_slice(&encode_eac(&block.alpha_values()));
    out[8..].copy_from_slice(&etc1(block));
    out
}
