//! XVA container (§4.3.5): a ustar tar holding `Ref:N/NNNNNNNN` data
//! members plus their `.checksum` siblings, and an `ova.xml` manifest.
//! Chunk size is fixed at 1 MiB; an all-zero chunk is omitted entirely
//! rather than written and re-read, since its SHA-1 is already known.

use std::io::Write;

use sha1::{Digest, Sha1};

use crate::error::BuildError;

pub const CHUNK_SIZE: u64 = 1024 * 1024;
/// SHA-1 of one all-zero 1 MiB chunk; chunks matching this are omitted.
pub const ZERO_CHUNK_SHA1: &str = "3b71f43ff30f4b15b5cd85dd9e95ebc7e84eb5a3";

const TAR_BLOCK: usize = 512;

fn octal_field(buf: &mut [u8], value: u64) {
    let s = format!("{:0>width$o}\0", value, width = buf.len() - 1);
    let bytes = s.as_bytes();
    let start = buf.len() - bytes.len();
    buf[start..].copy_from_slice(bytes);
}

fn ustar_header(name: &str, size: u64) -> [u8; TAR_BLOCK] {
    let mut hdr = [0u8; TAR_BLOCK];
    let name_bytes = name.as_bytes();
    hdr[0..name_bytes.len()].copy_from_slice(name_bytes);
    octal_field(&mut hdr[100..108], 0o644);
    octal_field(&mut hdr[108..116], 0);
    octal_field(&mut hdr[116..124], 0);
    octal_field(&mut hdr[124..136], size);
    octal_field(&mut hdr[136..148], 0);
    hdr[156] = b'0';
    hdr[257..263].copy_from_slice(b"ustar\0");
    hdr[263] = b'0';
    hdr[264] = b'0';
    for b in &mut hdr[148..156] {
        *b = b' ';
    }
    let sum: u32 = hdr.iter().map(|&b| b as u32).sum();
    let cksum = format!("{:06o}\0 ", sum);
    hdr[148..156].copy_from_slice(cksum.as_bytes());
    hdr
}

fn write_tar_entry<W: Write>(sink: &mut W, name: &str, content: &[u8]) -> Result<(), BuildError> {
    sink.write_all(&ustar_header(name, content.len() as u64))?;
    sink.write_all(content)?;
    let pad = (TAR_BLOCK - content.len() % TAR_BLOCK) % TAR_BLOCK;
    crate::io_support::zero_reader::write_zeros(sink, pad as u64)?;
    Ok(())
}

/// Streams one disk's worth of chunks (`Ref:N`) into the tar, skipping
/// all-zero chunks. `read_chunk` fills `buf` with up to `CHUNK_SIZE` bytes
/// (short last chunk) and returns how many bytes were filled.
pub fn write_disk<W: Write>(
    sink: &mut W,
    ref_index: u32,
    total_size: u64,
    mut read_chunk: impl FnMut(u64, &mut [u8]) -> std::io::Result<usize>,
) -> Result<(), BuildError> {
    let chunk_count = total_size.div_ceil(CHUNK_SIZE);
    let mut buf = vec![0u8; CHUNK_SIZE as usize];

    for idx in 0..chunk_count {
        let offset = idx * CHUNK_SIZE;
        let n = read_chunk(offset, &mut buf).map_err(BuildError::Io)?;
        let chunk = &buf[..n];

        let mut hasher = Sha1::new();
        hasher.update(chunk);
        let digest = hasher.finalize();
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();

        if hex == ZERO_CHUNK_SHA1 {
            continue;
        }

        let name = format!("Ref:{ref_index}/{idx:08}");
        write_tar_entry(sink, &name, chunk)?;
        write_tar_entry(sink, &format!("{name}.checksum"), hex.as_bytes())?;
    }
    Ok(())
}

pub fn finish<W: Write>(sink: &mut W) -> Result<(), BuildError> {
    crate::io_support::zero_reader::write_zeros(sink, 2 * TAR_BLOCK as u64)?;
    Ok(())
}
