//! Extent records: `(first_block, length, file_offset_blocks)` packed into
//! the 128-bit big-endian on-disk format, and the AG-relative/absolute
//! block-number translators.

use zerocopy::byteorder::big_endian::U64;
use zerocopy::{Immutable, IntoBytes, KnownLayout};

/// An extent in a node's extent list: `length` filesystem blocks of file
/// content starting at `file_offset` blocks into the file, stored on disk
/// starting at absolute filesystem block `start_block`.
#[derive(Debug, Clone, Copy)]
pub struct Extent {
    pub file_offset: u64,
    pub start_block: u64,
    pub length: u64,
}

/// Packed 128-bit big-endian extent record (the on-disk `xfs_bmbt_rec_t`).
///
/// Bit layout:
/// - Bit 127: extent flag (always 0, "written", here — this compiler never
///   produces unwritten extents)
/// - Bits 126..73 (54 bits): logical file offset in blocks
/// - Bits 72..21 (52 bits): absolute filesystem start block
/// - Bits 20..0 (21 bits): block count
#[derive(IntoBytes, Immutable, KnownLayout, Clone, Copy)]
#[repr(C)]
pub struct XfsBmbtRec {
    pub l0: U64,
    pub l1: U64,
}

impl Extent {
    pub fn pack(&self) -> XfsBmbtRec {
        assert!(self.file_offset < (1u64 << 54), "file offset overflows extent record");
        assert!(self.start_block < (1u64 << 52), "start block overflows extent record");
        assert!(self.length > 0 && self.length < (1u64 << 21), "block count overflows extent record");

        let l0 = (self.file_offset << 9) | (self.start_block >> 43);
        let l1 = (self.start_block << 21) | self.length;
        XfsBmbtRec {
            l0: U64::new(l0),
            l1: U64::new(l1),
        }
    }
}

/// Pack a node's extent list into the raw bytes written to its data fork.
pub fn pack_extent_list(extents: &[Extent]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(extents.len() * 16);
    for ext in extents {
        buf.extend_from_slice(ext.pack().as_bytes());
    }
    buf
}

/// Convert an absolute filesystem block number to a byte offset on disk.
/// Since AG length is a uniform power of two, the absolute block number
/// already equals `(agno << ag_blk_log) | agblock` with no AG-count-aware
/// unpacking required (unlike variable-sized-AG XFS filesystems).
pub fn fsblock_to_byte(block_size: u32, fsblock: u64) -> u64 {
    fsblock * block_size as u64
}

/// Pack (agno, agblock) into an absolute filesystem block number.
pub fn ag_to_fsblock(ag_blk_log: u8, agno: u32, agblock: u32) -> u64 {
    ((agno as u64) << ag_blk_log) | (agblock as u64)
}
