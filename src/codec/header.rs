//! UTXF payload header and level table
//!
//! ```text
//! header (40 bytes, little-endian)
//! data section:
//!   level table       level_count x 16 bytes
//!   endpoint codebook endpoint_count x 6 bytes
//!   selector codebook selector_count x 4 bytes
//!   block data        per level, per block, per slice: u16 endpoint, u16 selector
//! ```

use binrw::prelude::*;
use std::io::Cursor;

use super::CodecError;

/// Header size in bytes
pub const HEADER_LEN: usize = 40;

/// Size of one level table entry
pub const LEVEL_RECORD_LEN: usize = 16;

/// Size of one endpoint codebook entry
pub const ENDPOINT_LEN: usize = 6;

/// Size of one selector codebook entry
pub const SELECTOR_LEN: usize = 4;

/// Size of one slice entry in the block data
pub const SLICE_ENTRY_LEN: usize = 4;

/// Largest width or height accepted
pub const MAX_DIMENSION: u32 = 16384;

/// Largest codebook accepted (indices are u16)
pub const MAX_CODEBOOK_LEN: u32 = 1 << 16;

pub const VERSION: u16 = 1;

/// Header flag: every block carries a second (alpha) slice
pub const FLAG_HAS_ALPHA: u16 = 1;

const KNOWN_FLAGS: u16 = FLAG_HAS_ALPHA;

/// UTXF header
#[binrw]
#[brw(little, magic = b"UTXF")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtxHeader {
    pub version: u16,
    pub flags: u16,
    pub width: u32,
    pub height: u32,
    pub level_count: u32,
    pub endpoint_count: u32,
    pub selector_count: u32,
    /// Bytes following the header
    pub data_size: u32,
    /// xxHash64 (seed 0) of the data section
    pub data_checksum: u64,
}

/// One level table entry
#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelRecord {
    pub width: u32,
    pub height: u32,
    /// Offset of the level's block data, relative to the data section
    pub offset: u32,
    pub len: u32,
}

impl LevelRecord {
    pub fn blocks_x(&self) -> u32 {
        self.width.div_ceil(4)
    }

    pub fn blocks_y(&self) -> u32 {
        self.height.div_ceil(4)
    }

    pub fn total_blocks(&self) -> u32 {
        self.blocks_x() * self.blocks_y()
    }
}

/// Number of levels in a full chain down to 1x1
pub fn max_levels(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Dimension of `level` in a chain whose base is `base`
pub fn level_dim(base: u32, level: u32) -> u32 {
    base.checked_shr(level).unwrap_or(0).max(1)
}

impl UtxHeader {
    /// Parse the header at the start of `payload`
    pub fn parse(payload: &[u8]) -> Result<Self, CodecError> {
        if payload.len() < HEADER_LEN {
            return Err(CodecError::InvalidHeader("payload shorter than header"));
        }
        Ok(Self::read(&mut Cursor::new(&payload[..HEADER_LEN]))?)
    }

    /// Serialize into exactly [`HEADER_LEN`] bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut cursor = Cursor::new(Vec::with_capacity(HEADER_LEN));
        self.write(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    pub fn has_alpha(&self) -> bool {
        self.flags & FLAG_HAS_ALPHA != 0
    }

    /// Slices stored per block
    pub fn slice_count(&self) -> usize {
        if self.has_alpha() {
            2
        } else {
            1
        }
    }

    /// Check the header fields against each other and the payload length
    pub fn check(&self, payload_len: usize) -> Result<(), CodecError> {
        if self.version != VERSION {
            return Err(CodecError::InvalidHeader("unsupported version"));
        }
        if self.flags & !KNOWN_FLAGS != 0 {
            return Err(CodecError::InvalidHeader("unknown flags"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(CodecError::InvalidHeader("zero dimension"));
        }
        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(CodecError::InvalidHeader("dimension too large"));
        }
        if self.level_count == 0 || self.level_count > max_levels(self.width, self.height) {
            return Err(CodecError::InvalidHeader("bad level count"));
        }
        if self.endpoint_count == 0 || self.endpoint_count > MAX_CODEBOOK_LEN {
            return Err(CodecError::InvalidHeader("bad endpoint codebook size"));
        }
        if self.selector_count == 0 || self.selector_count > MAX_CODEBOOK_LEN {
            return Err(CodecError::InvalidHeader("bad selector codebook size"));
        }
        if payload_len.checked_sub(HEADER_LEN) != Some(self.data_size as usize) {
            return Err(CodecError::InvalidHeader("data size does not match payload"));
        }
        if self.tables_len() > self.data_size as u64 {
            return Err(CodecError::InvalidHeader("tables exceed data section"));
        }
        Ok(())
    }

    /// Offset of the endpoint codebook in the data section
    pub fn endpoints_offset(&self) -> usize {
        self.level_count as usize * LEVEL_RECORD_LEN
    }

    /// Offset of the selector codebook in the data section
    pub fn selectors_offset(&self) -> usize {
        self.endpoints_offset() + self.endpoint_count as usize * ENDPOINT_LEN
    }

    /// Combined size of level table and codebooks
    pub fn tables_len(&self) -> u64 {
        self.level_count as u64 * LEVEL_RECORD_LEN as u64
            + self.endpoint_count as u64 * ENDPOINT_LEN as u64
            + self.selector_count as u64 * SELECTOR_LEN as u64
    }

    /// Read and check level table entry `level` from the data section
    pub fn level_record(&self, data: &[u8], level: u32) -> Result<LevelRecord, CodecError> {
        if level >= self.level_count {
            return Err(CodecError::LevelOutOfRange {
                level,
                count: self.level_count,
            });
        }

        let start = level as usize * LEVEL_RECORD_LEN;
        let bytes = data
            .get(start..start + LEVEL_RECORD_LEN)
            .ok_or(CodecError::InvalidHeader("level table truncated"))?;
        let record = LevelRecord::read(&mut Cursor::new(bytes))?;

        let bad = |reason| CodecError::BadLevelRecord { level, reason };

        if record.width != level_dim(self.width, level)
            || record.height != level_dim(self.height, level)
        {
            return Err(bad("dimensions do not follow the mip chain"));
        }

        let expected_len =
            record.total_blocks() as u64 * self.slice_count() as u64 * SLICE_ENTRY_LEN as u64;
        if record.len as u64 != expected_len {
            return Err(bad("block data length does not match block count"));
        }
        if (record.offset as u64) < self.tables_len()
            || record.offset as u64 + record.len as u64 > data.len() as u64
        {
            return Err(bad("block data outside data section"));
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> UtxHeader {
        UtxHeader {
            version: VERSION,
            flags: 0,
            width: 8,
            height: 4,
            level_count: 1,
            endpoint_count: 1,
            selector_count: 1,
            data_size: 16 + 6 + 4 + 8,
            data_checksum: 0,
        }
    }

    #[test]
    fn test_header_layout() {
        let bytes = header().to_bytes().unwrap();
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(&bytes[..4], b"UTXF");
        assert_eq!(&bytes[4..6], &VERSION.to_le_bytes());
        assert_eq!(&bytes[8..12], &8u32.to_le_bytes());

        let parsed = UtxHeader::parse(&bytes).unwrap();
        assert_eq!(parsed, header());
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = header().to_bytes().unwrap();
        bytes[0] = b'X';
        assert!(UtxHeader::parse(&bytes).is_err());
        assert!(UtxHeader::parse(&bytes[..10]).is_err());
    }

    #[test]
    fn test_check() {
        let h = header();
        let payload_len = HEADER_LEN + h.data_size as usize;
        assert!(h.check(payload_len).is_ok());
        assert!(h.check(payload_len + 1).is_err());

        let mut too_many_levels = header();
        too_many_levels.level_count = 5;
        assert!(too_many_levels.check(payload_len).is_err());

        let mut huge = header();
        huge.width = MAX_DIMENSION + 1;
        assert!(huge.check(payload_len).is_err());

        let mut flags = header();
        flags.flags = 0x8000;
        assert!(flags.check(payload_len).is_err());
    }

    #[test]
    fn test_chain_helpers() {
        assert_eq!(max_levels(1, 1), 1);
        assert_eq!(max_levels(8, 4), 4);
        assert_eq!(max_levels(256, 256), 9);
        assert_eq!(level_dim(8, 0), 8);
        assert_eq!(level_dim(8, 3), 1);
        assert_eq!(level_dim(8, 40), 1);
        assert_eq!(level_dim(5, 1), 2);
    }
}
