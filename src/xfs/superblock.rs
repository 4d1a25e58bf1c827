//! The primary superblock (`xfs_dsb_t`), written at the start of AG 0.

use uuid::Uuid;
use zerocopy::byteorder::big_endian::{U16, U32, U64};
use zerocopy::{Immutable, IntoBytes, KnownLayout};

use crate::xfs::constants::Constants;

pub const MAGIC: u32 = 0x58465342; // "XFSB"

// Feature bits named in the spec: ALIGN | NLINK | LOGV2 | EXTFLG | DIRV2 | MOREBITS
const SB_VERSION_ALIGNBIT: u16 = 0x0100;
const SB_VERSION_NLINKBIT: u16 = 0x0200;
const SB_VERSION_LOGV2BIT: u16 = 0x0008;
const SB_VERSION_EXTFLGBIT: u16 = 0x0010;
const SB_VERSION_DIRV2BIT: u16 = 0x0020;
const SB_VERSION_MOREBITSBIT: u16 = 0x4000;

const SB_VERSION_4: u16 = 4;
const SB_VERSION2_LAZYSBCOUNTBIT: u32 = 0x00000002;

const XFS_INO_ALIGNMENT: u32 = 2;

#[derive(IntoBytes, Immutable, KnownLayout, Clone, Copy)]
#[repr(C)]
pub struct XfsDsb {
    pub magicnum: U32,
    pub blocksize: U32,
    pub dblocks: U64,
    pub rblocks: U64,
    pub rextents: U64,
    pub uuid: [u8; 16],
    pub logstart: U64,
    pub rootino: U64,
    pub rbmino: U64,
    pub rsumino: U64,
    pub rextsize: U32,
    pub agblocks: U32,
    pub agcount: U32,
    pub rbmblocks: U32,
    pub logblocks: U32,
    pub versionnum: U16,
    pub sectsize: U16,
    pub inodesize: U16,
    pub inopblock: U16,
    pub fname: [u8; 12],
    pub blocklog: u8,
    pub sectlog: u8,
    pub inodelog: u8,
    pub inopblog: u8,
    pub agblklog: u8,
    pub rextslog: u8,
    pub inprogress: u8,
    pub imax_pct: u8,
    pub icount: U64,
    pub ifree: U64,
    pub fdblocks: U64,
    pub frextents: U64,
    pub uquotino: U64,
    pub gquotino: U64,
    pub qflags: U16,
    pub flags: u8,
    pub shared_vn: u8,
    pub inoalignmt: U32,
    pub unit: U32,
    pub width: U32,
    pub dirblklog: u8,
    pub logsectlog: u8,
    pub logsectsize: U16,
    pub logsunit: U32,
    pub features2: U32,
    pub bad_features2: U32,
}

const _: () = assert!(std::mem::size_of::<XfsDsb>() == 208);

pub struct SuperblockInput {
    pub dblocks: u64,
    pub rootino: u64,
    pub rbmino: u64,
    pub rsumino: u64,
    pub icount: u64,
    pub ifree: u64,
    pub fdblocks: u64,
}

pub fn build(consts: &Constants, input: &SuperblockInput) -> XfsDsb {
    let uuid = Uuid::new_v4();
    let versionnum = SB_VERSION_4
        | SB_VERSION_ALIGNBIT
        | SB_VERSION_NLINKBIT
        | SB_VERSION_LOGV2BIT
        | SB_VERSION_EXTFLGBIT
        | SB_VERSION_DIRV2BIT
        | SB_VERSION_MOREBITSBIT;

    XfsDsb {
        magicnum: U32::new(MAGIC),
        blocksize: U32::new(consts.block_size),
        dblocks: U64::new(input.dblocks),
        rblocks: U64::new(0),
        rextents: U64::new(0),
        uuid: *uuid.as_bytes(),
        logstart: U64::new(crate::xfs::extent::ag_to_fsblock(consts.ag_blk_log, 0, consts.tree_blocks)),
        rootino: U64::new(input.rootino),
        rbmino: U64::new(input.rbmino),
        rsumino: U64::new(input.rsumino),
        rextsize: U32::new(1),
        agblocks: U32::new(consts.blocks_per_ag),
        agcount: U32::new(consts.ag_count),
        rbmblocks: U32::new(0),
        logblocks: U32::new(consts.journal_blocks),
        versionnum: U16::new(versionnum),
        sectsize: U16::new(consts.sector_size as u16),
        inodesize: U16::new(consts.inode_size as u16),
        inopblock: U16::new(consts.inodes_per_block as u16),
        fname: [0; 12],
        blocklog: consts.block_log,
        sectlog: consts.sector_size.trailing_zeros() as u8,
        inodelog: consts.inode_log,
        inopblog: consts.inodes_per_block.trailing_zeros() as u8,
        agblklog: consts.ag_blk_log,
        rextslog: 0,
        inprogress: 0,
        imax_pct: 25,
        icount: U64::new(input.icount),
        ifree: U64::new(input.ifree),
        fdblocks: U64::new(input.fdblocks),
        frextents: U64::new(0),
        uquotino: U64::new(0),
        gquotino: U64::new(0),
        qflags: U16::new(0),
        flags: 0,
        shared_vn: 0,
        inoalignmt: U32::new(XFS_INO_ALIGNMENT),
        unit: U32::new(0),
        width: U32::new(0),
        dirblklog: 0,
        logsectlog: 0,
        logsectsize: U16::new(0),
        logsunit: U32::new(0),
        features2: U32::new(SB_VERSION2_LAZYSBCOUNTBIT),
        bad_features2: U32::new(SB_VERSION2_LAZYSBCOUNTBIT),
    }
}
