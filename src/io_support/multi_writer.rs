//! `MultiWriteSeeker`: fan out writes/seeks across N sinks in lock-step
//! (e.g. the disk file plus a running hasher).

use std::io::{Seek, SeekFrom, Write};

/// Writes to every sink it owns; a short write or error from any sink is
/// fatal (fail-fast, no partial fan-out). On seek, every sink must already
/// agree on the absolute offset — divergence is an invariant violation.
pub struct MultiWriteSeeker<W> {
    sinks: Vec<W>,
}

impl<W: Write + Seek> MultiWriteSeeker<W> {
    pub fn new(sinks: Vec<W>) -> Self {
        assert!(!sinks.is_empty(), "MultiWriteSeeker needs at least one sink");
        MultiWriteSeeker { sinks }
    }

    pub fn into_inner(self) -> Vec<W> {
        self.sinks
    }
}

impl<W: Write + Seek> Write for MultiWriteSeeker<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        for sink in &mut self.sinks {
            let n = sink.write(buf)?;
            if n != buf.len() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "short write to one of the fan-out sinks",
                ));
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        for sink in &mut self.sinks {
            sink.flush()?;
        }
        Ok(())
    }
}

impl<W: Write + Seek> Seek for MultiWriteSeeker<W> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let mut results = Vec::with_capacity(self.sinks.len());
        for sink in &mut self.sinks {
            results.push(sink.seek(pos)?);
        }
        let first = results[0];
        assert!(
            results.iter().all(|&r| r == first),
            "fan-out sinks diverged on seek position"
        );
        Ok(first)
    }
}
