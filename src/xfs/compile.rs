//! Compile (§4.2.3): stream the final image for one AG at a time, in the
//! fixed order superblock → AGF → AGI → AGFL → IABT → ABTB → ABTC →
//! journal (AG0 only) → inode chunk → data/directory blocks.

use std::io::Write;

use zerocopy::IntoBytes;

use crate::error::BuildError;
use crate::external::{Logger, Progress};
use crate::tree::{FileTree, NodeKind};
use crate::xfs::ag::{self, AgfInput, AgiInput};
use crate::xfs::btree::{self, AllocRec};
use crate::xfs::dir::{self, DirForm};
use crate::xfs::extent::pack_extent_list;
use crate::xfs::inode::{self, InodeSpec, DI_DIR, DI_FMT_EXTENTS, DI_FMT_LOCAL, DI_LNK, DI_REG};
use crate::xfs::journal;
use crate::xfs::prepare::Placement;
use crate::xfs::superblock::{self, SuperblockInput};
use crate::xfs::translate::inode_number;

const INODE_MODE_PERM: u16 = 0o755;

/// Largest block count a single packed extent record can hold (21 bits).
/// This compiler never splits a node's content into more than one extent
/// (see `prepare::allocate_blocks`), so a node whose content needs more
/// blocks than this can hold is reported rather than silently truncated.
const MAX_EXTENT_BLOCKS: u64 = (1 << 21) - 1;

fn check_extent_limits(extents: &[crate::xfs::extent::Extent], node_seq: u64) -> Result<(), BuildError> {
    for ext in extents {
        if ext.length > MAX_EXTENT_BLOCKS {
            return Err(BuildError::IndirectExtentsUnsupported { node_seq });
        }
    }
    Ok(())
}

fn write_block<W: Write>(w: &mut W, data: &[u8]) -> Result<(), BuildError> {
    w.write_all(data)?;
    Ok(())
}

fn pad_to<W: Write>(w: &mut W, written: &mut u64, target: u64) -> Result<(), BuildError> {
    if *written < target {
        crate::io_support::zero_reader::write_zeros(w, target - *written)?;
        *written = target;
    }
    Ok(())
}

/// Build one inode record for `id`, given its placement and tree data.
fn build_inode(
    tree: &FileTree,
    placement: &Placement,
    id: usize,
    inode_size: u32,
) -> Result<Vec<u8>, BuildError> {
    let node = tree.node(id);
    let np = &placement.nodes[id];
    let gen = node.seq() as u32;

    let spec = match &node.kind {
        NodeKind::Directory => match np.dir_form {
            Some(DirForm::Short) => {
                let entries: Vec<dir::DirChild> = node
                    .children
                    .iter()
                    .map(|&cid| {
                        let child = tree.node(cid);
                        dir::DirChild {
                            name: child.name.clone(),
                            ino: inode_number(&placement.consts, placement.nodes[cid].ag, placement.nodes[cid].agino),
                        }
                    })
                    .collect();
                let parent_ino = inode_number(&placement.consts, placement.nodes[node.parent].ag, placement.nodes[node.parent].agino);
                let local = dir::shortform::emit(&entries, parent_ino);
                InodeSpec {
                    mode: DI_DIR | INODE_MODE_PERM,
                    format: DI_FMT_LOCAL,
                    nlink: node.nlink,
                    size: local.len() as u64,
                    nblocks: 0,
                    nextents: 0,
                    local_data: local,
                }
            }
            _ => {
                check_extent_limits(&np.extents, node.seq())?;
                let extents = pack_extent_list(&np.extents);
                InodeSpec {
                    mode: DI_DIR | INODE_MODE_PERM,
                    format: DI_FMT_EXTENTS,
                    nlink: node.nlink,
                    size: np.dir_data_blocks as u64 * placement.consts.block_size as u64,
                    nblocks: np.extents.iter().map(|e| e.length).sum(),
                    nextents: np.extents.len() as u32,
                    local_data: extents,
                }
            }
        },
        NodeKind::Symlink { target } => {
            let capacity = placement.consts.inode_local_capacity() as u64;
            if (target.len() as u64) <= capacity {
                InodeSpec {
                    mode: DI_LNK | 0o777,
                    format: DI_FMT_LOCAL,
                    nlink: node.nlink,
                    size: target.len() as u64,
                    nblocks: 0,
                    nextents: 0,
                    local_data: target.clone(),
                }
            } else {
                check_extent_limits(&np.extents, node.seq())?;
                let extents = pack_extent_list(&np.extents);
                InodeSpec {
                    mode: DI_LNK | 0o777,
                    format: DI_FMT_EXTENTS,
                    nlink: node.nlink,
                    size: target.len() as u64,
                    nblocks: np.extents.iter().map(|e| e.length).sum(),
                    nextents: np.extents.len() as u32,
                    local_data: extents,
                }
            }
        }
        NodeKind::Regular => {
            let capacity = placement.consts.inode_local_capacity() as u64;
            if node.size <= capacity {
                InodeSpec {
                    mode: DI_REG | INODE_MODE_PERM,
                    format: DI_FMT_LOCAL,
                    nlink: node.nlink,
                    size: node.size,
                    nblocks: 0,
                    nextents: 0,
                    local_data: Vec::new(),
                }
            } else {
                if np.extents.len() > 1 {
                    return Err(BuildError::IndirectExtentsUnsupported { node_seq: node.seq() });
                }
                check_extent_limits(&np.extents, node.seq())?;
                let extents = pack_extent_list(&np.extents);
                InodeSpec {
                    mode: DI_REG | INODE_MODE_PERM,
                    format: DI_FMT_EXTENTS,
                    nlink: node.nlink,
                    size: node.size,
                    nblocks: np.extents.iter().map(|e| e.length).sum(),
                    nextents: np.extents.len() as u32,
                    local_data: extents,
                }
            }
        }
    };

    Ok(inode::emit(&spec, gen, inode_size))
}

/// Emit one AG's inode chunk: every inode slot in sequence order, whether
/// or not a tree node claims it (unused slots get a free/skeleton inode).
fn emit_inode_chunk(
    tree: &FileTree,
    placement: &Placement,
    ag: u32,
) -> Result<Vec<u8>, BuildError> {
    let consts = &placement.consts;
    let total_inodes = consts.inodes_per_ag;
    let mut buf = Vec::with_capacity((total_inodes * consts.inode_size as u64) as usize);

    let mut by_agino = vec![None; total_inodes as usize];
    for id in 0..tree.len() {
        let np = &placement.nodes[id];
        if np.ag == ag {
            by_agino[np.agino as usize] = Some(id);
        }
    }

    for agino in 0..total_inodes as usize {
        match by_agino[agino] {
            Some(id) => buf.extend_from_slice(&build_inode(tree, placement, id, consts.inode_size)?),
            None => buf.extend_from_slice(&inode::emit_free(consts.inode_size, 0)),
        }
    }
    Ok(buf)
}

/// Emit the directory data blocks (block/leaf/node form only) for node
/// `id`, in on-disk order.
fn emit_dir_data_blocks(tree: &FileTree, placement: &Placement, id: usize) -> Vec<u8> {
    let node = tree.node(id);
    let np = &placement.nodes[id];
    let consts = &placement.consts;
    let self_ino = inode_number(consts, np.ag, np.agino);
    let parent_np = &placement.nodes[node.parent];
    let parent_ino = inode_number(consts, parent_np.ag, parent_np.agino);

    let entries: Vec<dir::DirChild> = node
        .children
        .iter()
        .map(|&cid| dir::DirChild {
            name: tree.node(cid).name.clone(),
            ino: inode_number(consts, placement.nodes[cid].ag, placement.nodes[cid].agino),
        })
        .collect();

    match np.dir_form {
        Some(DirForm::Block) => dir::block::emit(&entries, self_ino, parent_ino, consts.block_size),
        Some(DirForm::Leaf) => {
            let blocks = dir::leaf::emit(&entries, self_ino, parent_ino, consts.block_size, np.dir_data_blocks);
            blocks.concat()
        }
        Some(DirForm::Node) => {
            let nb = dir::node::emit(&entries, self_ino, parent_ino, consts.block_size, np.dir_data_blocks, np.dir_leaf_blocks);
            let mut out = Vec::new();
            for b in &nb.data_blocks {
                out.extend_from_slice(b);
            }
            out.extend_from_slice(&nb.node_block);
            for b in &nb.leaf_blocks {
                out.extend_from_slice(b);
            }
            out.extend_from_slice(&nb.free_block);
            out
        }
        _ => Vec::new(),
    }
}

pub struct CompileInputs<'a> {
    pub tree: &'a mut FileTree,
    pub placement: Placement,
}

/// Stream the compiled filesystem to `sink`. `cancelled` is polled at AG
/// boundaries.
pub fn run<W: Write>(
    sink: &mut W,
    inputs: CompileInputs,
    logger: &mut dyn Logger,
    progress: &mut dyn Progress,
    mut cancelled: impl FnMut() -> bool,
) -> Result<(), BuildError> {
    let CompileInputs { tree, placement } = inputs;
    let consts = placement.consts.clone();
    let mut written: u64 = 0;

    for ag in 0..consts.ag_count {
        if cancelled() {
            return Err(BuildError::Cancelled);
        }
        if logger.is_debug_enabled() {
            logger.debugf(&format!("compiling AG {ag}"));
        }

        let ag_start = written;
        let ag_len_bytes = placement.ag_lengths[ag as usize] as u64 * consts.block_size as u64;

        if ag == 0 {
            let root_np = &placement.nodes[tree.root()];
            let sb = superblock::build(
                &consts,
                &SuperblockInput {
                    dblocks: consts.blocks_per_ag as u64 * consts.ag_count as u64,
                    rootino: inode_number(&consts, root_np.ag, root_np.agino),
                    rbmino: inode_number(&consts, placement.rt_bitmap.0, placement.rt_bitmap.1),
                    rsumino: inode_number(&consts, placement.rt_summary.0, placement.rt_summary.1),
                    icount: consts.inodes_per_ag * consts.ag_count as u64,
                    ifree: 0,
                    fdblocks: placement.ag_free.iter().map(|&(_, l)| l as u64).sum(),
                },
            );
            write_block(sink, sb.as_bytes())?;
            written += sb.as_bytes().len() as u64;
        }
        pad_to(sink, &mut written, ag_start + consts.sector_size as u64)?;

        let ag_length = placement.ag_lengths[ag as usize];
        let (free_start, free_len) = placement.ag_free[ag as usize];

        let agf = ag::build_agf(&AgfInput {
            seqno: ag,
            length: ag_length,
            bno_root: consts.header_blocks,
            cnt_root: consts.header_blocks + 1,
            freeblks: free_len,
            longest: free_len,
            agfl_first: 0,
            agfl_last: 3,
            agfl_count: 4,
        });
        write_block(sink, agf.as_bytes())?;
        written += agf.as_bytes().len() as u64;
        pad_to(sink, &mut written, ag_start + 2 * consts.sector_size as u64)?;

        let agi = ag::build_agi(&AgiInput {
            seqno: ag,
            length: ag_length,
            count: consts.inodes_per_ag as u32,
            root: consts.header_blocks + 2,
            level: 0,
            freecount: 0,
            newino: 0,
        })?;
        write_block(sink, agi.as_bytes())?;
        written += agi.as_bytes().len() as u64;
        pad_to(sink, &mut written, ag_start + 3 * consts.sector_size as u64)?;

        let agfl = ag::build_agfl(&consts, &[consts.header_blocks + 3, consts.header_blocks + 4, consts.header_blocks + 5, consts.header_blocks + 6]);
        write_block(sink, &agfl)?;
        written += agfl.len() as u64;
        pad_to(sink, &mut written, ag_start + consts.header_blocks as u64 * consts.block_size as u64)?;

        // IABT: one inobt record per 64-inode chunk, covering the AG's full
        // `inodes_per_ag` span.
        let chunk_size = crate::xfs::constants::INODES_PER_CHUNK as u64;
        let num_chunks = crate::xfs::constants::div_ceil_u64(consts.inodes_per_ag, chunk_size);
        let mut used_per_chunk = vec![0u32; num_chunks as usize];
        for np in placement.nodes.iter().filter(|np| np.ag == ag) {
            let chunk = (np.agino as u64 / chunk_size) as usize;
            used_per_chunk[chunk] += 1;
        }
        let iabt_records: Vec<btree::InobtRec> = used_per_chunk
            .iter()
            .enumerate()
            .map(|(chunk, &used)| btree::inobt_record((chunk as u64 * chunk_size) as u32, used.min(64)))
            .collect();
        let iabt = btree::emit_iabt(consts.block_size, &iabt_records);
        write_block(sink, &iabt)?;
        written += iabt.len() as u64;

        let free_record = if free_len > 0 {
            Some(AllocRec { startblock: zerocopy::byteorder::big_endian::U32::new(free_start), blockcount: zerocopy::byteorder::big_endian::U32::new(free_len) })
        } else {
            None
        };
        let abtb = btree::emit_alloc_btree(consts.block_size, btree::ABTB_MAGIC, free_record);
        write_block(sink, &abtb)?;
        written += abtb.len() as u64;

        let abtc = btree::emit_alloc_btree(consts.block_size, btree::ABTC_MAGIC, free_record);
        write_block(sink, &abtc)?;
        written += abtc.len() as u64;

        pad_to(sink, &mut written, ag_start + consts.tree_blocks as u64 * consts.block_size as u64)?;

        if ag == 0 {
            let j = journal::emit(consts.block_size, consts.journal_blocks);
            write_block(sink, &j)?;
            written += j.len() as u64;
        }

        let inode_chunk_start = ag_start
            + (consts.tree_blocks as u64 + if ag == 0 { consts.journal_blocks as u64 } else { 0 }) * consts.block_size as u64;
        pad_to(sink, &mut written, inode_chunk_start)?;

        let chunk = emit_inode_chunk(tree, &placement, ag)?;
        write_block(sink, &chunk)?;
        written += chunk.len() as u64;

        // Directory data blocks and regular-file content, in node-sequence
        // order, restricted to nodes placed in this AG.
        for id in 0..tree.len() {
            if placement.nodes[id].ag != ag {
                continue;
            }
            let node_is_dir = tree.node(id).is_dir();
            if node_is_dir {
                let np = &placement.nodes[id];
                if matches!(np.dir_form, Some(DirForm::Block) | Some(DirForm::Leaf) | Some(DirForm::Node)) {
                    let start = np.extents.first().map(|e| e.start_block).unwrap_or(0);
                    let byte_off = crate::xfs::extent::fsblock_to_byte(consts.block_size, start);
                    pad_to(sink, &mut written, byte_off)?;
                    let data = emit_dir_data_blocks(tree, &placement, id);
                    write_block(sink, &data)?;
                    written += data.len() as u64;
                }
            } else if matches!(tree.node(id).kind, NodeKind::Regular) {
                let np = &placement.nodes[id];
                if let Some(ext) = np.extents.first() {
                    let byte_off = crate::xfs::extent::fsblock_to_byte(consts.block_size, ext.start_block);
                    pad_to(sink, &mut written, byte_off)?;
                    let mut reader = tree.open_source(id)?;
                    let copied = std::io::copy(&mut reader, sink)?;
                    written += copied;
                    let declared = ext.length * consts.block_size as u64;
                    if copied > declared {
                        return Err(BuildError::WriteOverflow { written: copied, declared });
                    }
                    crate::io_support::zero_reader::write_zeros(sink, declared - copied)?;
                    written += declared - copied;
                }
            } else if let NodeKind::Symlink { target } = &tree.node(id).kind {
                let np = &placement.nodes[id];
                if let Some(ext) = np.extents.first() {
                    let byte_off = crate::xfs::extent::fsblock_to_byte(consts.block_size, ext.start_block);
                    pad_to(sink, &mut written, byte_off)?;
                    write_block(sink, target)?;
                    written += target.len() as u64;
                    let declared = ext.length * consts.block_size as u64;
                    if target.len() as u64 > declared {
                        return Err(BuildError::WriteOverflow { written: target.len() as u64, declared });
                    }
                    crate::io_support::zero_reader::write_zeros(sink, declared - target.len() as u64)?;
                    written += declared - target.len() as u64;
                }
            }
        }

        pad_to(sink, &mut written, ag_start + ag_len_bytes)?;
        progress.increment(1);
    }

    tree.close();
    progress.finish(true);
    Ok(())
}
