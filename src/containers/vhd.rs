//! VHD fixed (§4.3.2) and dynamic/sparse (§4.3.3) containers.

use std::io::Write;

use uuid::Uuid;
use zerocopy::byteorder::big_endian::{U16, U32, U64};
use zerocopy::{Immutable, IntoBytes, KnownLayout};

use crate::error::BuildError;
use crate::io_support::zero_reader::write_zeros;

const COOKIE: &[u8; 8] = b"conectix";
const CXSPARSE_COOKIE: &[u8; 8] = b"cxsparse";
const FEATURES_RESERVED: u32 = 0x2;
const FILE_FORMAT_VERSION: u32 = 0x0001_0000;
const DYN_HEADER_VERSION: u32 = 0x0001_0000;
const DISK_TYPE_FIXED: u32 = 2;
const DISK_TYPE_DYNAMIC: u32 = 3;
const SECTOR_SIZE: u64 = 512;
const BLOCK_SIZE: u32 = 2 * 1024 * 1024; // 2 MiB default dynamic-disk block

#[derive(IntoBytes, Immutable, KnownLayout, Clone, Copy)]
#[repr(C)]
pub struct VhdFooter {
    pub cookie: [u8; 8],
    pub features: U32,
    pub file_format_version: U32,
    pub data_offset: U64,
    pub timestamp: U32,
    pub creator_application: [u8; 4],
    pub creator_version: U32,
    pub creator_host_os: [u8; 4],
    pub original_size: U64,
    pub current_size: U64,
    pub disk_geometry: U32,
    pub disk_type: U32,
    pub checksum: U32,
    pub unique_id: [u8; 16],
    pub saved_state: u8,
    pub reserved: [u8; 427],
}

const _: () = assert!(std::mem::size_of::<VhdFooter>() == 512);

#[derive(IntoBytes, Immutable, KnownLayout, Clone, Copy)]
#[repr(C)]
pub struct VhdDynamicHeader {
    pub cookie: [u8; 8],
    pub data_offset: U64,
    pub table_offset: U64,
    pub header_version: U32,
    pub max_table_entries: U32,
    pub block_size: U32,
    pub checksum: U32,
    pub parent_unique_id: [u8; 16],
    pub parent_timestamp: U32,
    pub reserved1: U32,
    pub parent_unicode_name: [u8; 512],
    pub parent_locator: [u8; 192],
    pub reserved2: [u8; 256],
}

const _: () = assert!(std::mem::size_of::<VhdDynamicHeader>() == 1024);

/// Microsoft's published CHS heuristic: pick a geometry that, multiplied
/// out, comes as close as possible to `total_sectors` without exceeding it.
fn chs_geometry(total_sectors: u64) -> (u16, u8, u8) {
    let total_sectors = total_sectors.min(65535 * 16 * 255);
    let (cyl_times_heads, heads, spt);

    if total_sectors >= 65535 * 16 * 63 {
        spt = 255u32;
        heads = 16u32;
        cyl_times_heads = total_sectors as u32 / spt;
    } else {
        let mut sectors_per_track = 17u32;
        let mut cth = total_sectors as u32 / sectors_per_track;
        let mut hh = cth.div_ceil(1024).max(4);
        if hh > 16 {
            sectors_per_track = 31;
            hh = 16;
            cth = total_sectors as u32 / sectors_per_track;
        }
        if cth >= hh * 1024 {
            sectors_per_track = 63;
            hh = 16;
            cth = total_sectors as u32 / sectors_per_track;
        }
        spt = sectors_per_track;
        heads = hh;
        cyl_times_heads = cth;
    }
    let cylinders = (cyl_times_heads / heads).min(65535) as u16;
    (cylinders, heads as u8, spt as u8)
}

fn checksum(bytes: &[u8]) -> u32 {
    let mut sum: u32 = 0;
    for &b in bytes {
        sum = sum.wrapping_add(b as u32);
    }
    !sum
}

fn build_footer(disk_size: u64, disk_type: u32, data_offset: u64) -> VhdFooter {
    let total_sectors = disk_size / SECTOR_SIZE;
    let (c, h, s) = chs_geometry(total_sectors);
    let disk_geometry = ((c as u32) << 16) | ((h as u32) << 8) | (s as u32);

    let mut footer = VhdFooter {
        cookie: *COOKIE,
        features: U32::new(FEATURES_RESERVED),
        file_format_version: U32::new(FILE_FORMAT_VERSION),
        data_offset: U64::new(data_offset),
        timestamp: U32::new(0),
        creator_application: *b"veil",
        creator_version: U32::new(0x0001_0000),
        creator_host_os: *b"Wi2k",
        original_size: U64::new(disk_size),
        current_size: U64::new(disk_size),
        disk_geometry: U32::new(disk_geometry),
        disk_type: U32::new(disk_type),
        checksum: U32::new(0),
        unique_id: *Uuid::new_v4().as_bytes(),
        saved_state: 0,
        reserved: [0; 427],
    };
    footer.checksum = U32::new(checksum(footer.as_bytes()));
    footer
}

/// Write a fixed VHD: the raw XFS image content (already written to `sink`
/// by the caller) followed by a single 512-byte footer.
pub fn finish_fixed<W: Write>(sink: &mut W, disk_size: u64) -> Result<(), BuildError> {
    let footer = build_footer(disk_size, DISK_TYPE_FIXED, u64::MAX);
    sink.write_all(footer.as_bytes())?;
    Ok(())
}

/// Write a dynamic VHD's sparse region (BAT + per-block sector bitmap +
/// data), copying only blocks `is_hole` reports as non-empty.
pub fn write_dynamic<W: Write>(
    sink: &mut W,
    mut read_block: impl FnMut(u64, &mut [u8]) -> std::io::Result<usize>,
    disk_size: u64,
    is_hole: impl Fn(u64, u32) -> bool,
) -> Result<(), BuildError> {
    let footer = build_footer(disk_size, DISK_TYPE_DYNAMIC, SECTOR_SIZE);
    let block_count = disk_size.div_ceil(BLOCK_SIZE as u64) as u32;

    let header_offset = SECTOR_SIZE;
    let bat_offset = header_offset + 1024;
    let bat_entries_bytes = (block_count as u64) * 4;
    let bat_padded = bat_entries_bytes.div_ceil(SECTOR_SIZE) * SECTOR_SIZE;
    let data_start_sector = (bat_offset + bat_padded) / SECTOR_SIZE;

    let sector_bitmap_size = (BLOCK_SIZE as u64 / SECTOR_SIZE / 8).div_ceil(SECTOR_SIZE) * SECTOR_SIZE;
    let sectors_per_block = (sector_bitmap_size + BLOCK_SIZE as u64) / SECTOR_SIZE;

    let header = VhdDynamicHeader {
        cookie: *CXSPARSE_COOKIE,
        data_offset: U64::new(u64::MAX),
        table_offset: U64::new(bat_offset),
        header_version: U32::new(DYN_HEADER_VERSION),
        max_table_entries: U32::new(block_count),
        block_size: U32::new(BLOCK_SIZE),
        checksum: U32::new(0),
        parent_unique_id: [0; 16],
        parent_timestamp: U32::new(0),
        reserved1: U32::new(0),
        parent_unicode_name: [0; 512],
        parent_locator: [0; 192],
        reserved2: [0; 256],
    };
    let header = {
        let mut h = header;
        h.checksum = U32::new(checksum(h.as_bytes()));
        h
    };

    sink.write_all(footer.as_bytes())?;
    sink.write_all(header.as_bytes())?;

    let mut bat = vec![0xFFu8; bat_padded as usize];
    let mut next_sector = data_start_sector as u32;
    let mut present = vec![false; block_count as usize];
    for blk in 0..block_count {
        if !is_hole(blk as u64 * BLOCK_SIZE as u64, BLOCK_SIZE) {
            bat[blk as usize * 4..blk as usize * 4 + 4].copy_from_slice(&next_sector.to_be_bytes());
            present[blk as usize] = true;
            next_sector += sectors_per_block as u32;
        }
    }
    sink.write_all(&bat)?;

    let mut block_buf = vec![0u8; BLOCK_SIZE as usize];
    for blk in 0..block_count {
        if !present[blk as usize] {
            continue;
        }
        let bitmap_size = (BLOCK_SIZE as u64 / SECTOR_SIZE / 8) as usize;
        let mut bitmap = vec![0xFFu8; bitmap_size];
        sink.write_all(&bitmap)?;
        write_zeros(sink, sector_bitmap_size - bitmap_size as u64)?;
        bitmap.clear();

        let n = read_block(blk as u64 * BLOCK_SIZE as u64, &mut block_buf).map_err(BuildError::Io)?;
        if n < block_buf.len() {
            block_buf[n..].fill(0);
        }
        sink.write_all(&block_buf)?;
    }

    sink.write_all(footer.as_bytes())?;
    Ok(())
}
