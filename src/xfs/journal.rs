//! The log/journal region (AG 0 only): a single record header plus a single
//! no-op transaction, matching a freshly-formatted, never-replayed journal.

use zerocopy::byteorder::big_endian::{U32, U64};
use zerocopy::{Immutable, IntoBytes, KnownLayout};

const XLOG_HEADER_MAGIC: u32 = 0xFEEDBABE;
const XLOG_VERSION: u32 = 2;
const XLOG_CYCLE: u32 = 1;
const XLOG_LSN: u64 = 0x1_0000_0000;
const XLOG_RECORD_SIZE: u32 = 0x8000;

const XLOG_TX_ID: u32 = 1;
const XLOG_TX_LEN: u32 = 8;
const XLOG_CLIENT: u8 = 0xAA;
const XLOG_FLAGS: u8 = 0x20;

#[derive(IntoBytes, Immutable, KnownLayout, Clone, Copy)]
#[repr(C)]
pub struct XlogRecHeader {
    pub magic: U32,
    pub cycle: U32,
    pub version: U32,
    pub lsn: U64,
    pub len: U32,
}

#[derive(IntoBytes, Immutable, KnownLayout, Clone, Copy)]
#[repr(C)]
pub struct XlogRecord {
    pub tx_id: U32,
    pub len: U32,
    pub client: u8,
    pub flags: u8,
    pub pad: [u8; 2],
}

/// Emit the journal region: `blocks * block_size` bytes, header + record at
/// the front, zero-filled afterward.
pub fn emit(block_size: u32, blocks: u32) -> Vec<u8> {
    let total = block_size as usize * blocks as usize;
    let mut buf = vec![0u8; total];

    let rec_header = XlogRecHeader {
        magic: U32::new(XLOG_HEADER_MAGIC),
        cycle: U32::new(XLOG_CYCLE),
        version: U32::new(XLOG_VERSION),
        lsn: U64::new(XLOG_LSN),
        len: U32::new(XLOG_RECORD_SIZE),
    };
    let record = XlogRecord {
        tx_id: U32::new(XLOG_TX_ID),
        len: U32::new(XLOG_TX_LEN),
        client: XLOG_CLIENT,
        flags: XLOG_FLAGS,
        pad: [0; 2],
    };

    let hdr_bytes = rec_header.as_bytes();
    buf[0..hdr_bytes.len()].copy_from_slice(hdr_bytes);
    let rec_bytes = record.as_bytes();
    buf[hdr_bytes.len()..hdr_bytes.len() + rec_bytes.len()].copy_from_slice(rec_bytes);

    buf
}
