//! Per-AG headers: AGF (free-space accounting), AGI (inode accounting), and
//! the AGFL (free-list block array).

use zerocopy::byteorder::big_endian::U32;
use zerocopy::{Immutable, IntoBytes, KnownLayout};

use crate::error::BuildError;
use crate::xfs::constants::Constants;

pub const AGF_MAGIC: u32 = 0x58414746; // "XAGF"
pub const AGI_MAGIC: u32 = 0x58414749; // "XAGI"

const AGI_UNLINKED_BUCKETS: usize = 64;
const NULL_AGINO: u32 = 0xFFFFFFFF;

#[derive(IntoBytes, Immutable, KnownLayout, Clone, Copy)]
#[repr(C)]
pub struct XfsAgf {
    pub magicnum: U32,
    pub versionnum: U32,
    pub seqno: U32,
    pub length: U32,
    pub bno_root: U32,
    pub cnt_root: U32,
    pub bno_level: U32,
    pub cnt_level: U32,
    pub flfirst: U32,
    pub fllast: U32,
    pub flcount: U32,
    pub freeblks: U32,
    pub longest: U32,
}

#[derive(IntoBytes, Immutable, KnownLayout, Clone, Copy)]
#[repr(C)]
pub struct XfsAgi {
    pub magicnum: U32,
    pub versionnum: U32,
    pub seqno: U32,
    pub length: U32,
    pub count: U32,
    pub root: U32,
    pub level: U32,
    pub freecount: U32,
    pub newino: U32,
    pub dirino: U32,
    pub unlinked: [U32; AGI_UNLINKED_BUCKETS],
}

pub struct AgfInput {
    pub seqno: u32,
    pub length: u32,
    /// Free-by-block and free-by-count btree roots: one record each in this
    /// compiler, so both trees are single-block with the same layout.
    pub bno_root: u32,
    pub cnt_root: u32,
    pub freeblks: u32,
    pub longest: u32,
    /// AGFL entries (fixed-size reserve region, see `Constants::tree_blocks`).
    pub agfl_first: u32,
    pub agfl_last: u32,
    pub agfl_count: u32,
}

pub fn build_agf(input: &AgfInput) -> XfsAgf {
    XfsAgf {
        magicnum: U32::new(AGF_MAGIC),
        versionnum: U32::new(1),
        seqno: U32::new(input.seqno),
        length: U32::new(input.length),
        bno_root: U32::new(input.bno_root),
        cnt_root: U32::new(input.cnt_root),
        bno_level: U32::new(1),
        cnt_level: U32::new(1),
        flfirst: U32::new(input.agfl_first),
        fllast: U32::new(input.agfl_last),
        flcount: U32::new(input.agfl_count),
        freeblks: U32::new(input.freeblks),
        longest: U32::new(input.longest),
    }
}

pub struct AgiInput {
    pub seqno: u32,
    pub length: u32,
    pub count: u32,
    pub root: u32,
    pub level: u32,
    pub freecount: u32,
    pub newino: u32,
}

/// `level` must be 0: this compiler only ever emits single-level (leaf-only)
/// inode b+trees, one record per 64-inode chunk.
pub fn build_agi(input: &AgiInput) -> Result<XfsAgi, BuildError> {
    if input.level != 0 {
        return Err(BuildError::InodeTreeTooDeep { agno: input.seqno });
    }
    Ok(XfsAgi {
        magicnum: U32::new(AGI_MAGIC),
        versionnum: U32::new(1),
        seqno: U32::new(input.seqno),
        length: U32::new(input.length),
        count: U32::new(input.count),
        root: U32::new(input.root),
        level: U32::new(1),
        freecount: U32::new(input.freecount),
        newino: U32::new(input.newino),
        dirino: U32::new(NULL_AGINO),
        unlinked: [U32::new(NULL_AGINO); AGI_UNLINKED_BUCKETS],
    })
}

/// The AGFL block: a flat array of free agblock numbers, padded to the
/// block size with `0xFFFFFFFF` (unused slot marker).
pub fn build_agfl(consts: &Constants, entries: &[u32]) -> Vec<u8> {
    let mut buf = vec![0xFFu8; consts.block_size as usize];
    for (i, &e) in entries.iter().enumerate() {
        let off = i * 4;
        if off + 4 > buf.len() {
            break;
        }
        buf[off..off + 4].copy_from_slice(&e.to_be_bytes());
    }
    buf
}
