//! The precompile convergence loop (§4.2.1): starting from a seed geometry,
//! repeatedly grow AG size/journal size until every node's content and all
//! metadata fit, or give up after a bounded number of attempts.

use crate::error::BuildError;
use crate::tree::{FileTree, Node, NodeKind};
use crate::xfs::constants::{
    div_ceil_u64, Constants, DEFAULT_BLOCK_SIZE, DEFAULT_INODE_SIZE, INITIAL_AG_BLK_LOG,
    INODES_PER_CHUNK, MAX_JOURNAL_BLOCKS, MIN_JOURNAL_BLOCKS, TARGET_AG_COUNT,
};
use crate::xfs::dir::{plan_directory, DirChild, DirForm};

const MAX_ITERATIONS: u32 = 16;
const MAX_AG_BLK_LOG: u8 = 31; // keeps a single AG's block count inside u32

/// Outcome of precompile: the frozen geometry plus the minimum disk size
/// (bytes) this tree can possibly fit in.
pub struct PrecompileResult {
    pub consts: Constants,
    pub minimum_size: u64,
}

fn children_as_dir_entries(tree: &FileTree, node: &Node) -> Vec<DirChild> {
    node.children
        .iter()
        .map(|&cid| DirChild {
            name: tree.node(cid).name.clone(),
            ino: 0,
        })
        .collect()
}

/// Blocks a node's own content costs: zero for anything stored inline in
/// the inode's local fork.
fn node_block_cost(tree: &FileTree, node: &Node, consts: &Constants) -> Result<u64, BuildError> {
    match &node.kind {
        NodeKind::Regular => {
            let capacity = consts.inode_local_capacity() as u64;
            if node.size <= capacity {
                Ok(0)
            } else {
                Ok(div_ceil_u64(node.size, consts.block_size as u64))
            }
        }
        NodeKind::Symlink { target } => {
            let capacity = consts.inode_local_capacity() as u64;
            if (target.len() as u64) <= capacity {
                Ok(0)
            } else {
                Ok(div_ceil_u64(target.len() as u64, consts.block_size as u64))
            }
        }
        NodeKind::Directory => {
            let entries = children_as_dir_entries(tree, node);
            let plan = plan_directory(&entries, consts);
            Ok(match plan.form {
                DirForm::Short => 0,
                _ => plan.blocks as u64,
            })
        }
    }
}

/// Total data blocks needed for every real node in the tree, plus a check
/// that no single node overflows a 32-bit extent block count.
fn total_data_blocks(tree: &FileTree, consts: &Constants) -> Result<u64, BuildError> {
    let mut total = 0u64;
    for id in 0..tree.len() {
        let node = tree.node(id);
        let cost = node_block_cost(tree, node, consts)?;
        if cost > u32::MAX as u64 {
            let what = if node.is_dir() { "directory" } else { "file" };
            return Err(BuildError::ObjectTooLarge { what, blocks: cost });
        }
        total += cost;
    }
    Ok(total)
}

fn inodes_needed(tree: &FileTree, minimum_free_inodes: u64) -> u64 {
    // Already includes the two synthetic realtime bitmap/summary inodes
    // every XFS filesystem carries (`FileTree::node_count`).
    tree.node_count() + minimum_free_inodes
}

/// Run the convergence loop, reserving at least `minimum_free_inodes` spare
/// inodes and `minimum_free_space` spare bytes beyond what the tree itself
/// needs (the two `BuildConfig` knobs from §4.2.1).
pub fn run(tree: &mut FileTree, minimum_free_inodes: u64, minimum_free_space: u64) -> Result<PrecompileResult, BuildError> {
    tree.assign_sequences();
    let block_size = DEFAULT_BLOCK_SIZE;
    let inode_size = DEFAULT_INODE_SIZE;
    let total_inodes = inodes_needed(tree, minimum_free_inodes);
    let reserved_blocks = div_ceil_u64(minimum_free_space, block_size as u64);

    let mut ag_blk_log = INITIAL_AG_BLK_LOG;
    let mut ag_count = 1u32;
    let mut journal_blocks = MIN_JOURNAL_BLOCKS;

    for _attempt in 0..MAX_ITERATIONS {
        let blocks_per_ag = 1u32 << ag_blk_log;
        let inodes_per_ag = div_ceil_u64(total_inodes, ag_count as u64).max(INODES_PER_CHUNK as u64);
        let inodes_per_ag = div_ceil_u64(inodes_per_ag, INODES_PER_CHUNK as u64) * INODES_PER_CHUNK as u64;

        let consts = Constants::new(block_size, inode_size, blocks_per_ag, ag_count, inodes_per_ag, journal_blocks);

        let data_blocks = total_data_blocks(tree, &consts)?;
        let metadata_per_ag = consts.metadata_blocks_per_ag();
        let total_metadata = metadata_per_ag * ag_count as u64 + journal_blocks as u64;
        let total_blocks = total_metadata + data_blocks + reserved_blocks;
        let capacity = blocks_per_ag as u64 * ag_count as u64;

        // Step 4: if the geometry doesn't fit, grow it — doubling AG size
        // once the shortfall would otherwise need twice the target AG
        // count, incrementing AG count otherwise.
        if total_blocks > capacity {
            if total_blocks / blocks_per_ag as u64 >= 2 * TARGET_AG_COUNT as u64 {
                if ag_blk_log >= MAX_AG_BLK_LOG {
                    return Err(BuildError::ObjectTooLarge {
                        what: "filesystem",
                        blocks: total_blocks,
                    });
                }
                ag_blk_log += 1;
            } else {
                ag_count += 1;
            }
            continue;
        }

        // Step 5: the geometry fits; grow the journal toward its cap while
        // that still fits, restarting so the next iteration re-checks fit.
        if journal_blocks < MAX_JOURNAL_BLOCKS {
            let grown = journal_blocks.saturating_mul(2).min(MAX_JOURNAL_BLOCKS);
            let grown_total = total_metadata - journal_blocks as u64 + grown as u64 + data_blocks + reserved_blocks;
            if grown > journal_blocks && grown_total <= capacity {
                journal_blocks = grown;
                continue;
            }
        }

        // Step 6: converge. `prepare` freezes this geometry's AG count/size
        // as-is and requires the disk to hold the full AG capacity, not
        // just `total_blocks` — so that capacity, not the tighter
        // data-driven figure, is the real floor a caller can build at.
        let minimum_size = capacity * block_size as u64;
        return Ok(PrecompileResult { consts, minimum_size });
    }

    Err(BuildError::PrecompileDiverged { iterations: MAX_ITERATIONS })
}
