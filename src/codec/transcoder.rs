//! Runtime side of the UTXF codec

use tracing::debug;

use super::bc;
use super::block::{Slice, UniversalBlock};
use super::codebook::{Endpoints, SelectorPattern};
use super::etc;
use super::header::{
    LevelRecord, UtxHeader, ENDPOINT_LEN, HEADER_LEN, SELECTOR_LEN, SLICE_ENTRY_LEN,
};
use super::raw::RawFormat;
use super::{CodecError, ImageInfo, LevelInfo, UniversalTranscoder};
use crate::format::TranscodeFormat;

/// Tables decoded by `start_transcoding`
#[derive(Debug)]
struct Prepared {
    checksum: u64,
    endpoints: Vec<Endpoints>,
    selectors: Vec<SelectorPattern>,
    levels: Vec<LevelRecord>,
    has_alpha: bool,
}

/// Transcoder for UTXF payloads
#[derive(Debug, Default)]
pub struct UtxTranscoder {
    prepared: Option<Prepared>,
}

impl UtxTranscoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn checked_header(payload: &[u8]) -> Result<UtxHeader, CodecError> {
        let header = UtxHeader::parse(payload)?;
        header.check(payload.len())?;
        Ok(header)
    }

    /// Read one slice entry from a level's block data
    fn read_slice(
        prepared: &Prepared,
        data: &[u8],
        level: u32,
        block: usize,
    ) -> Result<Slice, CodecError> {
        let e = u16::from_le_bytes([data[0], data[1]]) as usize;
        let s = u16::from_le_bytes([data[2], data[3]]) as usize;
        match (prepared.endpoints.get(e), prepared.selectors.get(s)) {
            (Some(&endpoints), Some(&selectors)) => Ok(Slice {
                endpoints,
                selectors,
            }),
            _ => Err(CodecError::CorruptBlock { level, block }),
        }
    }
}

impl UniversalTranscoder for UtxTranscoder {
    fn validate_header(&self, payload: &[u8]) -> bool {
        Self::checked_header(payload).is_ok()
    }

    fn image_info(&self, payload: &[u8]) -> Result<ImageInfo, CodecError> {
        let header = Self::checked_header(payload)?;
        let data = &payload[HEADER_LEN..];

        let mut total_blocks = 0u64;
        for level in 0..header.level_count {
            total_blocks += header.level_record(data, level)?.total_blocks() as u64;
        }

        Ok(ImageInfo {
            width: header.width,
            height: header.height,
            level_count: header.level_count,
            total_blocks,
            has_alpha: header.has_alpha(),
        })
    }

    fn level_info(&self, payload: &[u8], level: u32) -> Result<LevelInfo, CodecError> {
        let header = Self::checked_header(payload)?;
        let record = header.level_record(&payload[HEADER_LEN..], level)?;
        Ok(LevelInfo {
            index: level,
            width: record.width,
            height: record.height,
            blocks_x: record.blocks_x(),
            blocks_y: record.blocks_y(),
            total_blocks: record.total_blocks(),
        })
    }

    fn start_transcoding(&mut self, payload: &[u8]) -> Result<(), CodecError> {
        self.prepared = None;

        let header = Self::checked_header(payload)?;
        let data = &payload[HEADER_LEN..];

        let actual = xxhash_rust::xxh64::xxh64(data, 0);
        if actual != header.data_checksum {
            return Err(CodecError::ChecksumMismatch {
                expected: header.data_checksum,
                actual,
            });
        }

        let levels = (0..header.level_count)
            .map(|level| header.level_record(data, level))
            .collect::<Result<Vec<_>, _>>()?;

        let endpoints_start = header.endpoints_offset();
        let endpoints = data[endpoints_start..header.selectors_offset()]
            .chunks_exact(ENDPOINT_LEN)
            .map(|c| Endpoints::from_bytes([c[0], c[1], c[2], c[3], c[4], c[5]]))
            .collect::<Vec<_>>();

        let selectors_start = header.selectors_offset();
        let selectors_end = selectors_start + header.selector_count as usize * SELECTOR_LEN;
        let selectors = data[selectors_start..selectors_end]
            .chunks_exact(SELECTOR_LEN)
            .map(|c| SelectorPattern(u32::from_le_bytes([c[0], c[1], c[2], c[3]])))
            .collect::<Vec<_>>();

        debug!(
            "Prepared UTXF payload: {}x{}, {} levels, {} endpoints, {} selectors",
            header.width,
            header.height,
            levels.len(),
            endpoints.len(),
            selectors.len()
        );

        self.prepared = Some(Prepared {
            checksum: header.data_checksum,
            endpoints,
            selectors,
            levels,
            has_alpha: header.has_alpha(),
        });
        Ok(())
    }

    fn transcode_level(
        &self,
        payload: &[u8],
        level: u32,
        target: TranscodeFormat,
        out: &mut [u8],
    ) -> Result<(), CodecError> {
        let prepared = self.prepared.as_ref().ok_or(CodecError::NotStarted)?;

        // Tables belong to the payload they were decoded from
        let header = UtxHeader::parse(payload)?;
        if header.data_checksum != prepared.checksum {
            return Err(CodecError::NotStarted);
        }

        let record = *prepared
            .levels
            .get(level as usize)
            .ok_or(CodecError::LevelOutOfRange {
                level,
                count: prepared.levels.len() as u32,
            })?;

        let layout = target.layout();
        let needed = layout.surface_size(record.width, record.height);
        if out.len() < needed {
            return Err(CodecError::OutputTooSmall {
                needed,
                got: out.len(),
            });
        }

        let slices = if prepared.has_alpha { 2 } else { 1 };
        let entry_len = slices * SLICE_ENTRY_LEN;
        let start = HEADER_LEN + record.offset as usize;
        let blocks = payload
            .get(start..start + record.len as usize)
            .ok_or(CodecError::BadLevelRecord {
                level,
                reason: "block data outside payload",
            })?;

        let raw = RawFormat::from_target(target);
        let bytes = layout.bytes_per_unit();
        let blocks_x = record.blocks_x();

        for (i, entry) in blocks.chunks_exact(entry_len).enumerate() {
            let color = Self::read_slice(prepared, &entry[..SLICE_ENTRY_LEN], level, i)?;
            let alpha = if prepared.has_alpha {
                Some(Self::read_slice(prepared, &entry[SLICE_ENTRY_LEN..], level, i)?)
            } else {
                None
            };
            let block = UniversalBlock { color, alpha };

            if let Some(raw) = raw {
                let (bx, by) = (i as u32 % blocks_x, i as u32 / blocks_x);
                raw.write_block(&block, bx, by, record.width, record.height, out);
                continue;
            }

            let dst = &mut out[i * bytes..(i + 1) * bytes];
            match target {
                TranscodeFormat::Bc1 => dst.copy_from_slice(&bc::bc1(&block)),
                TranscodeFormat::Bc3 => dst.copy_from_slice(&bc::bc3(&block)),
                TranscodeFormat::Bc5 => dst.copy_from_slice(&bc::bc5(&block)),
                TranscodeFormat::Bc7M6OpaqueOnly => dst.copy_from_slice(&bc::bc7_m6_opaque(&block)),
                TranscodeFormat::Bc7M5 => dst.copy_from_slice(&bc::bc7_m5(&block)),
                TranscodeFormat::Etc1 => dst.copy_from_slice(&etc::etc1(&block)),
                TranscodeFormat::Etc2Rgba => dst.copy_from_slice(&etc::etc2_rgba(&block)),
                TranscodeFormat::Bgr565 | TranscodeFormat::Rgba4444 | TranscodeFormat::Rgba32 => {
                    return Err(CodecError::UnsupportedTarget(target));
                }
            }
        }

        Ok(())
    }
}
