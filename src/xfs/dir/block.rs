//! Block-form directories: a single filesystem block holding a `XD2B`
//! header, 8-byte-aligned dentries, a trailing hash table, and a tail.

use super::{hashed_order, DirChild};

const MAGIC: u32 = 0x58443242; // "XD2B"
const BEST_FREE_ENTRIES: usize = 3;

pub fn emit(children: &[DirChild], self_ino: u64, parent_ino: u64, block_size: u32) -> Vec<u8> {
    let mut entries: Vec<DirChild> = Vec::with_capacity(children.len() + 2);
    entries.push(DirChild { name: b".".to_vec(), ino: self_ino });
    entries.push(DirChild { name: b"..".to_vec(), ino: parent_ino });
    entries.extend_from_slice(children);

    let mut buf = vec![0u8; block_size as usize];

    // Dir2DataHdr: magic(4) + 3 best-free entries of {offset(2), length(2)}.
    buf[0..4].copy_from_slice(&MAGIC.to_be_bytes());
    for i in 0..BEST_FREE_ENTRIES {
        let off = 4 + i * 4;
        buf[off..off + 2].copy_from_slice(&0u16.to_be_bytes());
        buf[off + 2..off + 4].copy_from_slice(&0u16.to_be_bytes());
    }

    // Dentries, recording each one's byte offset for the hash table.
    let mut cursor = super::DATA_HDR_SIZE;
    let mut tag_offsets = Vec::with_capacity(entries.len());
    for e in &entries {
        let len = super::dentry_len(e.name.len());
        tag_offsets.push(cursor as u16);
        buf[cursor..cursor + 8].copy_from_slice(&e.ino.to_be_bytes());
        buf[cursor + 8] = e.name.len() as u8;
        buf[cursor + 9..cursor + 9 + e.name.len()].copy_from_slice(&e.name);
        let tag_pos = cursor + len - 2;
        buf[tag_pos..tag_pos + 2].copy_from_slice(&(cursor as u16).to_be_bytes());
        cursor += len;
    }

    let tail_size = 8;
    let hash_table_bytes = entries.len() * 8;
    let tail_start = block_size as usize - tail_size;
    let hash_start = tail_start - hash_table_bytes;

    for (slot, &(hash, entry_idx)) in hashed_order(&entries).iter().enumerate() {
        let off = hash_start + slot * 8;
        buf[off..off + 4].copy_from_slice(&hash.to_be_bytes());
        buf[off + 4..off + 8].copy_from_slice(&(tag_offsets[entry_idx] as u32).to_be_bytes());
    }

    buf[tail_start..tail_start + 4].copy_from_slice(&(entries.len() as u32).to_be_bytes());
    buf[tail_start + 4..tail_start + 8].copy_from_slice(&0u32.to_be_bytes()); // stale count

    buf
}
