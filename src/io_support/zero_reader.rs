use std::io::Read;

/// An infinite source of zero bytes, used to pad writers past the current
/// end of written data (forward seeks, AG padding, hole chunks).
pub struct ZeroReader;

impl Read for ZeroReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        buf.fill(0);
        Ok(buf.len())
    }
}

/// Copy exactly `len` zero bytes into `w`.
pub fn write_zeros<W: std::io::Write>(w: &mut W, len: u64) -> std::io::Result<()> {
    const CHUNK: usize = 64 * 1024;
    let zeros = [0u8; CHUNK];
    let mut remaining = len;
    while remaining > 0 {
        let n = remaining.min(CHUNK as u64) as usize;
        w.write_all(&zeros[..n])?;
        remaining -= n as u64;
    }
    Ok(())
}
