//! The XFS directory name hash (`xfs_da_hashname`): folds a name in groups
//! of up to 4 bytes, left-rotating the running accumulator by 7 bits per
//! byte consumed.

fn rol32(x: u32, shift: u32) -> u32 {
    x.rotate_left(shift)
}

pub fn hash_name(name: &[u8]) -> u32 {
    let mut hash: u32 = 0;
    let mut chunks = name.chunks_exact(4);
    for c in &mut chunks {
        hash = ((c[0] as u32) << 21)
            ^ ((c[1] as u32) << 14)
            ^ ((c[2] as u32) << 7)
            ^ (c[3] as u32)
            ^ rol32(hash, 28);
    }
    let rem = chunks.remainder();
    match rem.len() {
        3 => ((rem[0] as u32) << 14) ^ ((rem[1] as u32) << 7) ^ (rem[2] as u32) ^ rol32(hash, 21),
        2 => ((rem[0] as u32) << 7) ^ (rem[1] as u32) ^ rol32(hash, 14),
        1 => (rem[0] as u32) ^ rol32(hash, 7),
        _ => hash,
    }
}

#[cfg(test)]
mod tests {
    use super::hash_name;

    #[test]
    fn empty_name_hashes_to_zero() {
        assert_eq!(hash_name(b""), 0);
    }

    #[test]
    fn known_vectors() {
        assert_eq!(hash_name(b"vorteil"), 781758355);
        assert_eq!(hash_name(b"vorteil++"), 736419341);
        assert_eq!(hash_name(b"Vorteil.io"), 4067321834);
    }
}
