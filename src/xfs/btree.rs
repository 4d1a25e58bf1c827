//! Single-level B+tree blocks: the inode btree (`IABT`) and the two
//! free-space btrees (`ABTB` by block number, `ABTC` by block count).
//!
//! This compiler never produces trees deeper than one level (a single leaf
//! block holding all records) — `INodeTreeTooDeep`/`ObjectTooLarge` callers
//! reject geometries that would need more.

use zerocopy::byteorder::big_endian::{U16, U32, U64};
use zerocopy::{Immutable, IntoBytes, KnownLayout};

pub const IABT_MAGIC: u32 = 0x49414254; // "IABT"
pub const ABTB_MAGIC: u32 = 0x41425442; // "ABTB"
pub const ABTC_MAGIC: u32 = 0x41425443; // "ABTC"

/// Common short b+tree block header (non-CRC v4 format): 16 bytes.
#[derive(IntoBytes, Immutable, KnownLayout, Clone, Copy)]
#[repr(C)]
pub struct BtreeBlockHeader {
    pub magic: U32,
    pub level: U16,
    pub numrecs: U16,
    pub leftsib: U32,
    pub rightsib: U32,
}

const _: () = assert!(std::mem::size_of::<BtreeBlockHeader>() == 16);

/// Byte length of [`BtreeBlockHeader`] once emitted; records start here.
pub const HEADER_SIZE: usize = 16;

#[derive(IntoBytes, Immutable, KnownLayout, Clone, Copy)]
#[repr(C)]
pub struct InobtRec {
    pub startino: U32,
    pub freecount: U32,
    pub free: U64,
}

#[derive(IntoBytes, Immutable, KnownLayout, Clone, Copy)]
#[repr(C)]
pub struct AllocRec {
    pub startblock: U32,
    pub blockcount: U32,
}

const NULL_SIB: u32 = 0xFFFFFFFF;

fn header(magic: u32, numrecs: u16) -> BtreeBlockHeader {
    BtreeBlockHeader {
        magic: U32::new(magic),
        level: U16::new(0),
        numrecs: U16::new(numrecs),
        leftsib: U32::new(NULL_SIB),
        rightsib: U32::new(NULL_SIB),
    }
}

/// One inobt record per 64-inode chunk: `free` is a bitmap with 1 bits for
/// free slots (all slots used by a fully-populated chunk leaves it 0; an
/// untouched chunk is all-ones).
pub fn inobt_record(startino: u32, used: u32) -> InobtRec {
    assert!(used <= 64);
    let free_bitmap: u64 = if used >= 64 { 0 } else { u64::MAX << used };
    InobtRec {
        startino: U32::new(startino),
        freecount: U32::new(64 - used),
        free: U64::new(free_bitmap),
    }
}

pub fn emit_iabt(block_size: u32, records: &[InobtRec]) -> Vec<u8> {
    let mut buf = vec![0u8; block_size as usize];
    buf[0..HEADER_SIZE].copy_from_slice(header(IABT_MAGIC, records.len() as u16).as_bytes());
    let mut cursor = HEADER_SIZE;
    for rec in records {
        buf[cursor..cursor + 16].copy_from_slice(rec.as_bytes());
        cursor += 16;
    }
    buf
}

/// Zero or one free-space record, since `Prepare` always leaves at most one
/// contiguous free run per AG (the remainder after metadata/journal/inodes).
pub fn emit_alloc_btree(block_size: u32, magic: u32, record: Option<AllocRec>) -> Vec<u8> {
    let mut buf = vec![0u8; block_size as usize];
    let numrecs: u16 = if record.is_some() { 1 } else { 0 };
    buf[0..HEADER_SIZE].copy_from_slice(header(magic, numrecs).as_bytes());
    if let Some(rec) = record {
        buf[HEADER_SIZE..HEADER_SIZE + 8].copy_from_slice(rec.as_bytes());
    }
    buf
}
