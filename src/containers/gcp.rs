//! GCP container (§4.3.4): `disk.raw` packed into a ustar tar stream, then
//! gzipped. GCE requires the raw image as the sole tar member, name
//! `disk.raw`, size padded to a multiple of the format's size alignment.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::BuildError;

const TAR_BLOCK: usize = 512;
const ENTRY_NAME: &[u8] = b"disk.raw";

fn octal_field(buf: &mut [u8], value: u64) {
    let s = format!("{:0>width$o}\0", value, width = buf.len() - 1);
    let bytes = s.as_bytes();
    let start = buf.len() - bytes.len();
    buf[start..].copy_from_slice(bytes);
}

fn ustar_header(name: &[u8], size: u64) -> [u8; TAR_BLOCK] {
    let mut hdr = [0u8; TAR_BLOCK];
    hdr[0..name.len()].copy_from_slice(name);
    octal_field(&mut hdr[100..108], 0o644); // mode
    octal_field(&mut hdr[108..116], 0); // uid
    octal_field(&mut hdr[116..124], 0); // gid
    octal_field(&mut hdr[124..136], size); // size
    octal_field(&mut hdr[136..148], 0); // mtime
    hdr[156] = b'0'; // typeflag: regular file
    hdr[257..263].copy_from_slice(b"ustar\0");
    hdr[263] = b'0';
    hdr[264] = b'0';

    // Checksum is computed with the checksum field held as spaces.
    for b in &mut hdr[148..156] {
        *b = b' ';
    }
    let sum: u32 = hdr.iter().map(|&b| b as u32).sum();
    let cksum = format!("{:06o}\0 ", sum);
    hdr[148..156].copy_from_slice(cksum.as_bytes());
    hdr
}

/// Wraps `sink` in a gzip encoder and returns a writer that expects a ustar
/// header (written here) followed by exactly `raw_size` bytes of image
/// content, then the tar padding/trailer (also written here on `finish`).
pub struct GcpWriter<W: Write> {
    gz: GzEncoder<W>,
    raw_size: u64,
    written: u64,
}

impl<W: Write> GcpWriter<W> {
    pub fn new(sink: W, raw_size: u64) -> Result<Self, BuildError> {
        let mut gz = GzEncoder::new(sink, Compression::default());
        gz.write_all(&ustar_header(ENTRY_NAME, raw_size))?;
        Ok(GcpWriter { gz, raw_size, written: 0 })
    }

    pub fn write_content(&mut self, buf: &[u8]) -> Result<(), BuildError> {
        self.gz.write_all(buf)?;
        self.written += buf.len() as u64;
        Ok(())
    }

    /// Pad the tar entry to a 512-byte boundary, write the two all-zero
    /// end-of-archive blocks, and finish the gzip stream.
    pub fn finish(mut self) -> Result<W, BuildError> {
        if self.written != self.raw_size {
            return Err(BuildError::WriteUnderflow { written: self.written, declared: self.raw_size });
        }
        let pad = (TAR_BLOCK as u64 - (self.raw_size % TAR_BLOCK as u64)) % TAR_BLOCK as u64;
        crate::io_support::zero_reader::write_zeros(&mut self.gz, pad)?;
        crate::io_support::zero_reader::write_zeros(&mut self.gz, 2 * TAR_BLOCK as u64)?;
        Ok(self.gz.finish()?)
    }
}
