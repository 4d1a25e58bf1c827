//! Leaf-form directories: `ddb` data blocks (magic `XD2D`, the block-form
//! data layout minus the trailing hash table and tail) plus one leaf block
//! (magic `0xD2F1`) holding the hash table and per-block best-free array.

use super::{hashed_order, DirChild};

const DATA_MAGIC: u32 = 0x58443244; // "XD2D"
const LEAF_MAGIC: u16 = 0xD2F1;

/// Lay out entries (already including `.`/`..`) across `ddb` data blocks,
/// packing greedily in hash order is not required here: entries are kept in
/// creation order within blocks, matching how `plan_directory` counted them.
pub(crate) fn pack_data_blocks(entries: &[DirChild], block_size: u32, ddb: u32) -> (Vec<Vec<u8>>, Vec<(u32, u16, u32)>) {
    let dir_blk = block_size as usize;
    let mut blocks: Vec<Vec<u8>> = (0..ddb).map(|_| vec![0u8; dir_blk]).collect();
    let mut cursors: Vec<usize> = vec![super::DATA_HDR_SIZE; ddb as usize];
    // (block index, byte offset, entry index) for every entry, in creation order.
    let mut locations = Vec::with_capacity(entries.len());

    let mut blk = 0usize;
    for (idx, e) in entries.iter().enumerate() {
        let len = super::dentry_len(e.name.len());
        while blk < blocks.len() && cursors[blk] + len > dir_blk {
            blk += 1;
        }
        assert!(blk < blocks.len(), "directory plan underestimated data blocks needed");
        let cursor = cursors[blk];
        let buf = &mut blocks[blk];
        buf[cursor..cursor + 8].copy_from_slice(&e.ino.to_be_bytes());
        buf[cursor + 8] = e.name.len() as u8;
        buf[cursor + 9..cursor + 9 + e.name.len()].copy_from_slice(&e.name);
        let tag_pos = cursor + len - 2;
        buf[tag_pos..tag_pos + 2].copy_from_slice(&(cursor as u16).to_be_bytes());
        cursors[blk] = cursor + len;
        locations.push((blk as u32, cursor as u16, idx as u32));
    }

    for b in &mut blocks {
        b[0..4].copy_from_slice(&DATA_MAGIC.to_be_bytes());
    }
    (blocks, locations)
}

/// Returns the `ddb` data blocks followed by the single leaf block.
pub fn emit(children: &[DirChild], self_ino: u64, parent_ino: u64, block_size: u32, ddb: u32) -> Vec<Vec<u8>> {
    let mut entries: Vec<DirChild> = Vec::with_capacity(children.len() + 2);
    entries.push(DirChild { name: b".".to_vec(), ino: self_ino });
    entries.push(DirChild { name: b"..".to_vec(), ino: parent_ino });
    entries.extend_from_slice(children);

    let (mut blocks, locations) = pack_data_blocks(&entries, block_size, ddb);

    let dir_blk = block_size as usize;
    let mut leaf = vec![0u8; dir_blk];
    leaf[0..2].copy_from_slice(&LEAF_MAGIC.to_be_bytes());
    leaf[2..4].copy_from_slice(&(entries.len() as u16).to_be_bytes()); // count
    leaf[4..6].copy_from_slice(&0u16.to_be_bytes()); // stale

    let hash_table_start = 16usize;
    for (slot, &(hash, entry_idx)) in hashed_order(&entries).iter().enumerate() {
        let (blk, off, _) = locations[entry_idx as usize];
        let address = (blk * block_size + off as u32) >> 3; // xfs_dir2_dataptr_t units
        let pos = hash_table_start + slot * 8;
        leaf[pos..pos + 4].copy_from_slice(&hash.to_be_bytes());
        leaf[pos + 4..pos + 8].copy_from_slice(&address.to_be_bytes());
    }

    let best_start = dir_blk - 4 - ddb as usize * 2;
    for b in 0..ddb as usize {
        leaf[best_start + b * 2..best_start + b * 2 + 2].copy_from_slice(&0u16.to_be_bytes());
    }
    leaf[dir_blk - 4..].copy_from_slice(&(ddb).to_be_bytes());

    blocks.push(leaf);
    blocks
}
