//! Prepare (§4.2.2): turn the frozen [`Constants`] geometry and the actual
//! configured disk size into a concrete placement — which AG and inode slot
//! each node's inode lives in, and which AG/blocks its content occupies.
//!
//! AGs are uniform size (`Constants::blocks_per_ag`); any space beyond the
//! precompile-computed minimum is appended to the last AG's free run. Nodes
//! are placed greedily, AG by AG, in node-sequence order; a node's content
//! is never split across two AGs (simpler than upstream XFS, adequate for a
//! single-shot compiler that never needs to grow a file after writing it).

use crate::error::BuildError;
use crate::io_support::sizer::HolePredictor;
use crate::tree::FileTree;
use crate::xfs::constants::Constants;
use crate::xfs::dir::{plan_directory, DirForm};
use crate::xfs::extent::Extent;

pub struct NodePlacement {
    pub ag: u32,
    pub agino: u32,
    /// Data-fork extents, empty if the node's content lives in the inode's
    /// local fork (small files/symlinks, short-form directories).
    pub extents: Vec<Extent>,
    pub dir_form: Option<DirForm>,
    pub dir_data_blocks: u32,
    pub dir_leaf_blocks: u32,
}

pub struct Placement {
    pub consts: Constants,
    pub ag_lengths: Vec<u32>,
    /// Per-AG free-run start/length, after metadata+journal+inodes+data.
    pub ag_free: Vec<(u32, u32)>,
    /// Indexed by arena `NodeId`.
    pub nodes: Vec<NodePlacement>,
    pub rt_bitmap: (u32, u32),
    pub rt_summary: (u32, u32),
}

impl Placement {
    /// Snapshot the pieces a container encoder needs to answer "is this
    /// byte range a hole" (§6's `HolePredictor`), detached from the rest of
    /// the placement so it can outlive the move into `compile::run`.
    pub fn hole_map(&self) -> HoleMap {
        HoleMap {
            block_size: self.consts.block_size as u64,
            ag_lengths: self.ag_lengths.clone(),
            ag_free: self.ag_free.clone(),
        }
    }
}

/// A `HolePredictor` over one compiled image's per-AG trailing free runs.
/// A byte range only counts as a hole when it falls entirely within a
/// single AG's free run; a range straddling two AGs is conservatively
/// reported as not a hole.
#[derive(Clone)]
pub struct HoleMap {
    block_size: u64,
    ag_lengths: Vec<u32>,
    ag_free: Vec<(u32, u32)>,
}

impl HolePredictor for HoleMap {
    fn is_hole(&self, offset: u64, len: u64) -> bool {
        if len == 0 {
            return true;
        }
        let mut ag_start_byte = 0u64;
        for (ag, &ag_len) in self.ag_lengths.iter().enumerate() {
            let ag_end_byte = ag_start_byte + ag_len as u64 * self.block_size;
            if offset >= ag_start_byte && offset + len <= ag_end_byte {
                let (free_start, free_len) = self.ag_free[ag];
                let free_start_byte = ag_start_byte + free_start as u64 * self.block_size;
                let free_end_byte = free_start_byte + free_len as u64 * self.block_size;
                return offset >= free_start_byte && offset + len <= free_end_byte;
            }
            ag_start_byte = ag_end_byte;
        }
        false
    }
}

fn inode_slot(consts: &Constants, seq: u64) -> (u32, u32) {
    let ag = (seq / consts.inodes_per_ag) as u32;
    let agino = (seq % consts.inodes_per_ag) as u32;
    (ag, agino)
}

pub fn run(tree: &FileTree, consts: Constants, actual_size: u64) -> Result<Placement, BuildError> {
    let ag_count = consts.ag_count;
    let blocks_per_ag = consts.blocks_per_ag;

    let total_blocks = actual_size / consts.block_size as u64;
    let declared = blocks_per_ag as u64 * ag_count as u64;
    if total_blocks < declared {
        return Err(BuildError::DiskTooSmall { delta: declared * consts.block_size as u64 - actual_size });
    }
    let extra_blocks = (total_blocks - declared) as u32;

    let mut ag_lengths = vec![blocks_per_ag; ag_count as usize];
    if let Some(last) = ag_lengths.last_mut() {
        *last += extra_blocks;
    }

    // Data-block cursor per AG: starts right after the fixed metadata
    // (header+btrees+journal-if-AG0) and inode chunk.
    let mut cursor: Vec<u32> = (0..ag_count)
        .map(|ag| {
            let mut base = consts.tree_blocks;
            if ag == 0 {
                base += consts.journal_blocks;
            }
            base + consts.inode_chunk_blocks() as u32
        })
        .collect();

    let rt_bitmap = inode_slot(&consts, crate::tree::RT_BITMAP_SEQ);
    let rt_summary = inode_slot(&consts, crate::tree::RT_SUMMARY_SEQ);

    let mut nodes = Vec::with_capacity(tree.len());
    for id in 0..tree.len() {
        let node = tree.node(id);
        let seq = node.seq();
        let (ag, agino) = inode_slot(&consts, seq);

        let (extents, dir_form, dir_data_blocks, dir_leaf_blocks) = if node.is_dir() {
            let entries = node
                .children
                .iter()
                .map(|&cid| crate::xfs::dir::DirChild {
                    name: tree.node(cid).name.clone(),
                    ino: 0,
                })
                .collect::<Vec<_>>();
            let plan = plan_directory(&entries, &consts);
            match plan.form {
                DirForm::Short => (Vec::new(), Some(DirForm::Short), 0, 0),
                _ => {
                    let extents = allocate_blocks(&mut cursor, &ag_lengths, consts.ag_blk_log, ag, plan.blocks);
                    (extents, Some(plan.form), plan.data_blocks, plan.leaf_blocks)
                }
            }
        } else {
            let size = node.size;
            let capacity = consts.inode_local_capacity() as u64;
            if size <= capacity {
                (Vec::new(), None, 0, 0)
            } else {
                let blocks = crate::xfs::constants::div_ceil_u64(size, consts.block_size as u64) as u32;
                let extents = allocate_blocks(&mut cursor, &ag_lengths, consts.ag_blk_log, ag, blocks);
                (extents, None, 0, 0)
            }
        };

        nodes.push(NodePlacement {
            ag,
            agino,
            extents,
            dir_form,
            dir_data_blocks,
            dir_leaf_blocks,
        });
    }

    let ag_free = (0..ag_count)
        .map(|ag| {
            let start = cursor[ag as usize];
            let len = ag_lengths[ag as usize].saturating_sub(start);
            (start, len)
        })
        .collect();

    Ok(Placement {
        consts,
        ag_lengths,
        ag_free,
        nodes,
        rt_bitmap,
        rt_summary,
    })
}

/// Allocate `blocks` contiguous blocks starting in AG `preferred_ag`,
/// spilling forward into later AGs if it doesn't fit (never splitting the
/// run itself across two AGs).
fn allocate_blocks(
    cursor: &mut [u32],
    ag_lengths: &[u32],
    ag_blk_log: u8,
    preferred_ag: u32,
    blocks: u32,
) -> Vec<Extent> {
    if blocks == 0 {
        return Vec::new();
    }
    for ag in preferred_ag..ag_lengths.len() as u32 {
        let start = cursor[ag as usize];
        let end = start.checked_add(blocks).expect("block count overflow during placement");
        if end <= ag_lengths[ag as usize] {
            cursor[ag as usize] = end;
            return vec![Extent {
                file_offset: 0,
                start_block: crate::xfs::extent::ag_to_fsblock(ag_blk_log, ag, start),
                length: blocks as u64,
            }];
        }
    }
    panic!("prepare: no AG had room for {blocks} blocks; precompile under-converged");
}
