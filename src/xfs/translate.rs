//! §4.2.6 block/inode number translation: AG-relative coordinates to the
//! packed absolute numbers XFS stores on disk.

use crate::xfs::constants::Constants;

/// Pack (agno, relative agblock) into an absolute filesystem block number.
pub fn block_number(consts: &Constants, agno: u32, agblock: u32) -> u64 {
    crate::xfs::extent::ag_to_fsblock(consts.ag_blk_log, agno, agblock)
}

/// Pack (agno, relative agino) into an absolute inode number, per the
/// standard XFS formula: `(agno << (agblklog + inopblog)) | agino`.
pub fn inode_number(consts: &Constants, agno: u32, agino: u32) -> u64 {
    let inopblog = consts.inodes_per_block.trailing_zeros() as u8;
    let shift = consts.ag_blk_log + inopblog;
    ((agno as u64) << shift) | (agino as u64)
}
