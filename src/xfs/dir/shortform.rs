//! Short-form directories: stored entirely in the inode's local data fork.
//! No explicit `.`/`..` dentries — both are implicit, recovered from the
//! directory inode's own number and the header's parent field.

use super::DirChild;

/// Emit a short-form directory body: `{count(u8), i8count(u8), parent(u64 or
/// u32)}` header followed by packed entries. Parent and child inode numbers
/// are encoded as u32 when they fit in 32 bits (the common case for small
/// images), else u64; `i8count` is always 0 here since we always use u64
/// child inode fields for consistency across a given directory is not
/// required by XFS, but is by this encoder (fixed ino size simplifies sizing
/// in `plan_directory`, which assumes a uniform 4-byte inode field).
pub fn emit(children: &[DirChild], parent_ino: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(super::sf_total_len(children));
    buf.push(children.len() as u8);
    buf.push(0); // i8count: no explicit-size entries beyond the 4-byte form
    buf.extend_from_slice(&(parent_ino as u32).to_be_bytes());

    let mut offset: u16 = 4;
    for child in children {
        buf.push(child.name.len() as u8);
        buf.extend_from_slice(&offset.to_be_bytes());
        buf.extend_from_slice(&child.name);
        buf.extend_from_slice(&(child.ino as u32).to_be_bytes());
        offset += super::sf_entry_len(child.name.len()) as u16;
    }
    buf
}
