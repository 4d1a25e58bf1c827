//! The Constants bundle (§3): fixed and derived geometry for one compiled
//! image. Immutable once precompile has converged.

/// UID/GID stamped into every inode (§9 design note: pinned-user images).
pub const DEFAULT_UID_GID: u32 = 1000;

/// Lower bound on journal size asserted without further citation upstream;
/// preserved as a magic constant.
pub const MIN_JOURNAL_BLOCKS: u32 = 1368;

/// Upper bound the convergence loop will grow the journal to. Not part of
/// the original spec's literal numbers; added so the "grow the journal"
/// step in the convergence loop terminates predictably.
pub const MAX_JOURNAL_BLOCKS: u32 = 8192;

/// Starting AG size exponent: 2^12 blocks, ~16 MiB at 4 KiB blocks.
pub const INITIAL_AG_BLK_LOG: u8 = 12;

/// Ideal number of AGs the convergence loop aims to keep the geometry near.
pub const TARGET_AG_COUNT: u32 = 8;

pub const SECTOR_SIZE: u32 = 512;
pub const DEFAULT_BLOCK_SIZE: u32 = 4096;
pub const DEFAULT_INODE_SIZE: u32 = 512;

/// Size of the on-disk v4 dinode core proper, before the data fork.
pub const DINODE_CORE_SIZE: u32 = 96;

/// Size of the `di_next_unlinked` trailer immediately following the core
/// (96 + 4 = the 100-byte on-disk core region the data fork starts after).
pub const NEXT_UNLINKED_SIZE: u32 = 4;

/// Inode chunk size: XFS always allocates/frees inodes 64 at a time.
pub const INODES_PER_CHUNK: u32 = 64;

/// The constants bundle: fixed and derived geometry, immutable after
/// precompile converges.
#[derive(Debug, Clone)]
pub struct Constants {
    pub sector_size: u32,
    pub block_size: u32,
    pub block_log: u8,
    pub inode_size: u32,
    pub inode_log: u8,
    pub inodes_per_block: u32,
    pub blocks_per_ag: u32,
    pub ag_blk_log: u8,
    pub ag_count: u32,
    pub inodes_per_ag: u64,
    pub journal_blocks: u32,
    /// Blocks occupied by superblock+AGF+AGI+AGFL before the B+tree blocks
    /// begin (`ceil(4 * sector_size / block_size)`, at least 1).
    pub header_blocks: u32,
    /// `header_blocks + 7`: inode btree(1) + free-by-block(1) +
    /// free-by-count(1) + 4 AGFL reserve blocks.
    pub tree_blocks: u32,
}

impl Constants {
    pub fn new(block_size: u32, inode_size: u32, blocks_per_ag: u32, ag_count: u32, inodes_per_ag: u64, journal_blocks: u32) -> Self {
        assert!(block_size.is_power_of_two());
        assert!(inode_size.is_power_of_two());
        assert!(blocks_per_ag.is_power_of_two());
        let header_blocks = div_ceil_u32(4 * SECTOR_SIZE, block_size).max(1);
        Constants {
            sector_size: SECTOR_SIZE,
            block_size,
            block_log: block_size.trailing_zeros() as u8,
            inode_size,
            inode_log: inode_size.trailing_zeros() as u8,
            inodes_per_block: block_size / inode_size,
            blocks_per_ag,
            ag_blk_log: blocks_per_ag.trailing_zeros() as u8,
            ag_count,
            inodes_per_ag,
            journal_blocks,
            header_blocks,
            tree_blocks: header_blocks + 7,
        }
    }

    /// Inode chunk blocks per AG (inode chunks hold `inodes_per_ag` inodes).
    pub fn inode_chunk_blocks(&self) -> u64 {
        div_ceil_u64(self.inodes_per_ag * self.inode_size as u64, self.block_size as u64)
    }

    /// Fixed metadata overhead of one AG, excluding the journal.
    pub fn metadata_blocks_per_ag(&self) -> u64 {
        self.tree_blocks as u64 + self.inode_chunk_blocks()
    }

    /// Space available for inline inode data (local-format fork capacity).
    pub fn inode_local_capacity(&self) -> u32 {
        self.inode_size - DINODE_CORE_SIZE - NEXT_UNLINKED_SIZE
    }

    /// Directory block size; `dir_blk_log` is always 0 in this compiler
    /// (directory blocks are exactly one filesystem block).
    pub fn dir_block_size(&self) -> u32 {
        self.block_size
    }
}

pub fn div_ceil_u32(a: u32, b: u32) -> u32 {
    (a + b - 1) / b
}

pub fn div_ceil_u64(a: u64, b: u64) -> u64 {
    (a + b - 1) / b
}
