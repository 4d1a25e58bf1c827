//! Directory content sizing and emission, shared between precompile (which
//! only needs byte counts) and compile (which emits the same layout).

pub mod block;
pub mod leaf;
pub mod node;
pub mod shortform;

use crate::xfs::constants::Constants;
use crate::xfs::hash::hash_name;

/// One child entry as seen by directory sizing/emission: name and inode.
#[derive(Clone)]
pub struct DirChild {
    pub name: Vec<u8>,
    pub ino: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirForm {
    Short,
    Block,
    Leaf,
    Node,
}

#[derive(Debug, Clone)]
pub struct DirPlan {
    pub form: DirForm,
    /// Blocks the directory's data fork costs (0 for short form).
    pub blocks: u32,
    /// Number of data blocks (leaf/node forms only).
    pub data_blocks: u32,
    /// Number of leaf blocks (node form only; always 1 for leaf form).
    pub leaf_blocks: u32,
    /// Short-form byte length (always computed, used to decide the form).
    pub short_len: usize,
}

/// Short-form entry: namelen(1) + offset(2) + name + ino(4).
pub fn sf_entry_len(namelen: usize) -> usize {
    1 + 2 + namelen + 4
}

pub fn sf_total_len(children: &[DirChild]) -> usize {
    4 + children.iter().map(|c| sf_entry_len(c.name.len())).sum::<usize>()
}

/// Data-block dentry: ino(8) + namelen(1) + name + tag(2), padded to 8 bytes.
pub fn dentry_len(namelen: usize) -> usize {
    let raw = 8 + 1 + namelen + 2;
    (raw + 7) & !7
}

pub(crate) const DATA_HDR_SIZE: usize = 16;
const BLOCK_TAIL_SIZE: usize = 8;
const HASH_ENTRY_SIZE: usize = 8;
const LEAF_HDR_SIZE: usize = 16;
const BEST_ENTRY_SIZE: usize = 2;
const FREE_INDEX_TAIL_SIZE: usize = 4;

/// Compute the full directory plan for a set of children (not including
/// `.`/`..`, which block/leaf/node forms add internally).
pub fn plan_directory(children: &[DirChild], consts: &Constants) -> DirPlan {
    let short_len = sf_total_len(children);
    let capacity = consts.inode_local_capacity() as usize;
    if short_len <= capacity {
        return DirPlan {
            form: DirForm::Short,
            blocks: 0,
            data_blocks: 0,
            leaf_blocks: 0,
            short_len,
        };
    }

    // Block/leaf/node forms store explicit "." and ".." dentries.
    let n_entries = children.len() + 2;
    let entries_bytes: usize = dentry_len(1) + dentry_len(2)
        + children.iter().map(|c| dentry_len(c.name.len())).sum::<usize>();

    let dir_blk = consts.dir_block_size() as usize;
    let block_len = DATA_HDR_SIZE + entries_bytes + n_entries * HASH_ENTRY_SIZE + BLOCK_TAIL_SIZE;
    if block_len < dir_blk {
        return DirPlan {
            form: DirForm::Block,
            blocks: 1,
            data_blocks: 1,
            leaf_blocks: 0,
            short_len,
        };
    }

    let available_per_block = dir_blk - DATA_HDR_SIZE;
    let ddb = entries_bytes.div_ceil(available_per_block).max(1) as u32;

    let leaf_total = LEAF_HDR_SIZE + n_entries * HASH_ENTRY_SIZE + ddb as usize * BEST_ENTRY_SIZE + FREE_INDEX_TAIL_SIZE;
    if leaf_total <= dir_blk {
        return DirPlan {
            form: DirForm::Leaf,
            blocks: 1 + ddb,
            data_blocks: ddb,
            leaf_blocks: 1,
            short_len,
        };
    }

    let leaf_index_bytes = n_entries * HASH_ENTRY_SIZE;
    let leaf_blocks = leaf_index_bytes.div_ceil(dir_blk - 16).max(1) as u32;
    // The free-index block holds one 2-byte best-free entry per data block;
    // at realistic `ddb` this always fits a single block, so this compiler
    // never splits it across more than one (unlike the leaf index, which
    // does grow with entry count).
    debug_assert!(ddb as usize * BEST_ENTRY_SIZE <= dir_blk, "free-index block overflow: {} data blocks", ddb);

    DirPlan {
        form: DirForm::Node,
        blocks: ddb + 1 + leaf_blocks + 1,
        data_blocks: ddb,
        leaf_blocks,
        short_len,
    }
}

/// Sort entries (including synthesized `.`/`..`) by XFS directory hash, for
/// the hash-table regions of block/leaf/node forms.
pub fn hashed_order(entries: &[DirChild]) -> Vec<(u32, usize)> {
    let mut v: Vec<(u32, usize)> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| (hash_name(&e.name), i))
        .collect();
    v.sort_by_key(|&(h, i)| (h, i));
    v
}
