//! On-disk v4 dinode core (96 bytes) and data-fork emission.

use zerocopy::byteorder::big_endian::{U16, U32, U64};
use zerocopy::{Immutable, IntoBytes, KnownLayout};

use crate::xfs::constants::DEFAULT_UID_GID;

pub const MAGIC: u16 = 0x494e; // "IN"

/// Value stamped into every inode's `di_next_unlinked` trailer: this
/// compiler never produces an unlinked-inode chain, so every inode is its
/// own list terminator.
pub const NEXT_UNLINKED_NULL: u32 = 0xFFFFFFFF;

pub const DI_FMT_DEV: u8 = 0;
pub const DI_FMT_LOCAL: u8 = 1;
pub const DI_FMT_EXTENTS: u8 = 2;

pub const DI_DIR: u16 = 0o040000;
pub const DI_REG: u16 = 0o100000;
pub const DI_LNK: u16 = 0o120000;

/// The 96-byte v4 dinode core. Matches `struct xfs_dinode_core` up to (but
/// excluding) the v5 CRC/self-describing fields this compiler never emits.
#[derive(IntoBytes, Immutable, KnownLayout, Clone, Copy)]
#[repr(C)]
pub struct XfsDinodeCore {
    pub magic: U16,
    pub mode: U16,
    pub version: u8,
    pub format: u8,
    pub onlink: U16,
    pub uid: U32,
    pub gid: U32,
    pub nlink: U32,
    pub projid: U16,
    pub projid_hi: U16,
    pub pad: [u8; 6],
    pub flushiter: U16,
    pub atime_sec: U32,
    pub atime_nsec: U32,
    pub mtime_sec: U32,
    pub mtime_nsec: U32,
    pub ctime_sec: U32,
    pub ctime_nsec: U32,
    pub size: U64,
    pub nblocks: U64,
    pub extsize: U32,
    pub nextents: U32,
    pub anextents: U16,
    pub forkoff: u8,
    pub aformat: u8,
    pub dmevmask: U32,
    pub dmstate: U16,
    pub flags: U16,
    pub gen: U32,
}

const _: () = assert!(std::mem::size_of::<XfsDinodeCore>() == 96);

pub struct InodeSpec {
    pub mode: u16,
    pub format: u8,
    pub nlink: u32,
    pub size: u64,
    pub nblocks: u64,
    pub nextents: u32,
    /// Data placed right after the core (local-format dirs/symlinks), sized
    /// to fit in `inode_size - 96`.
    pub local_data: Vec<u8>,
}

fn zero_timestamp() -> (u32, u32) {
    (0, 0)
}

pub fn build_core(spec: &InodeSpec, gen: u32) -> XfsDinodeCore {
    let (sec, nsec) = zero_timestamp();
    XfsDinodeCore {
        magic: U16::new(MAGIC),
        mode: U16::new(spec.mode),
        version: 2,
        format: spec.format,
        onlink: U16::new(0),
        uid: U32::new(DEFAULT_UID_GID),
        gid: U32::new(DEFAULT_UID_GID),
        nlink: U32::new(spec.nlink),
        projid: U16::new(0),
        projid_hi: U16::new(0),
        pad: [0; 6],
        flushiter: U16::new(0),
        atime_sec: U32::new(sec),
        atime_nsec: U32::new(nsec),
        mtime_sec: U32::new(sec),
        mtime_nsec: U32::new(nsec),
        ctime_sec: U32::new(sec),
        ctime_nsec: U32::new(nsec),
        size: U64::new(spec.size),
        nblocks: U64::new(spec.nblocks),
        extsize: U32::new(0),
        nextents: U32::new(spec.nextents),
        anextents: U16::new(0),
        forkoff: 0,
        aformat: DI_FMT_EXTENTS,
        dmevmask: U32::new(0),
        dmstate: U16::new(0),
        flags: U16::new(0),
        gen: U32::new(gen),
    }
}

/// Emit a full `inode_size`-byte on-disk inode record: core + data fork,
/// zero-padded to the record size.
pub fn emit(spec: &InodeSpec, gen: u32, inode_size: u32) -> Vec<u8> {
    let core = build_core(spec, gen);
    let mut buf = Vec::with_capacity(inode_size as usize);
    buf.extend_from_slice(core.as_bytes());
    buf.extend_from_slice(&NEXT_UNLINKED_NULL.to_be_bytes());
    buf.extend_from_slice(&spec.local_data);
    assert!(
        buf.len() <= inode_size as usize,
        "inode record overflowed inode_size: core+data {} > {}",
        buf.len(),
        inode_size
    );
    buf.resize(inode_size as usize, 0);
    buf
}

/// A free/skeleton inode slot: just enough of the core to mark it free and
/// unlinked, matching the teacher's `InodeFormatDev`(0) quirk for unused
/// slots rather than leaving them fully zeroed.
pub fn emit_free(inode_size: u32, gen: u32) -> Vec<u8> {
    let spec = InodeSpec {
        mode: 0,
        format: DI_FMT_DEV,
        nlink: 0,
        size: 0,
        nblocks: 0,
        nextents: 0,
        local_data: Vec::new(),
    };
    emit(&spec, gen, inode_size)
}
