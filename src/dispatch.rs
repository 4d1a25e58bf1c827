//! The build dispatcher (§4.4): negotiates a final disk size between the
//! configured target and the XFS compiler's minimum, builds the raw image
//! to a scratch file, then re-streams it through the chosen container
//! encoder.

use std::io::{Seek, SeekFrom, Write};

use log::{debug, info};
use tempfile::tempfile;

use crate::config::{BuildConfig, DiskSize, ImageFormat};
use crate::containers::{gcp, ova, raw, vhd, xva};
use crate::error::BuildError;
use crate::external::{Logger, Progress};
use crate::io_support::sizer::HolePredictor;
use crate::tree::FileTree;

/// Round `value` up to the nearest multiple of `align` (`align` a power of
/// two or 1).
fn round_up(value: u64, align: u64) -> u64 {
    if align <= 1 {
        return value;
    }
    value.div_ceil(align) * align
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

fn lcm(a: u64, b: u64) -> u64 {
    if a == 0 || b == 0 {
        a.max(b)
    } else {
        a / gcd(a, b) * b
    }
}

/// Run precompile to find the minimum size, negotiate it against the
/// configured target, then run prepare+compile into a scratch file, and
/// finally re-stream that scratch file through the chosen container.
pub fn build<W: Write>(
    sink: &mut W,
    tree: &mut FileTree,
    config: &BuildConfig,
    logger: Option<&mut dyn Logger>,
    progress: Option<&mut dyn Progress>,
) -> Result<(), BuildError> {
    let info_registry = crate::containers::format_info(config.format);

    let precompile = crate::xfs::precompile::run(tree, config.minimum_free_inodes, config.minimum_free_space)?;
    debug!("precompile minimum size: {} bytes", precompile.minimum_size);

    let requested = match config.disk_size {
        DiskSize::Absolute(bytes) => bytes,
        DiskSize::Delta(extra) => precompile.minimum_size + extra,
    };
    let aligned = round_up(requested.max(precompile.minimum_size), lcm(config.size_align, info_registry.size_align));
    if aligned < precompile.minimum_size {
        return Err(BuildError::DiskTooSmall { delta: precompile.minimum_size - aligned });
    }
    info!("building {:?} image, {} bytes", config.format, aligned);

    let mut null_logger_storage;
    let logger: &mut dyn Logger = match logger {
        Some(l) => l,
        None => {
            null_logger_storage = crate::external::NullLogger;
            &mut null_logger_storage
        }
    };
    let mut null_progress_storage;
    let progress: &mut dyn Progress = match progress {
        Some(p) => p,
        None => {
            null_progress_storage = crate::external::NullProgress;
            &mut null_progress_storage
        }
    };

    let placement = crate::xfs::prepare::run(tree, precompile.consts, aligned)?;
    let actual_size = placement.ag_lengths.iter().map(|&l| l as u64).sum::<u64>()
        * placement.consts.block_size as u64;
    let hole_map = placement.hole_map();

    let mut scratch = tempfile()?;
    crate::xfs::compile::run(
        &mut scratch,
        crate::xfs::compile::CompileInputs { tree, placement },
        logger,
        progress,
        || false,
    )?;
    scratch.seek(SeekFrom::Start(0))?;

    match config.format {
        ImageFormat::Raw => {
            std::io::copy(&mut scratch, sink)?;
            raw::finish(sink)?;
        }
        ImageFormat::VhdFixed => {
            std::io::copy(&mut scratch, sink)?;
            vhd::finish_fixed(sink, actual_size)?;
        }
        ImageFormat::VhdDynamic => {
            vhd::write_dynamic(
                sink,
                |offset, buf| read_scratch_at(&mut scratch, offset, buf),
                actual_size,
                move |offset, len| hole_map.is_hole(offset, len as u64),
            )?;
        }
        ImageFormat::Gcp => {
            let mut gz = gcp::GcpWriter::new(&mut *sink, actual_size)?;
            let mut buf = vec![0u8; 1 << 20];
            loop {
                let n = std::io::Read::read(&mut scratch, &mut buf)?;
                if n == 0 {
                    break;
                }
                gz.write_content(&buf[..n])?;
            }
            gz.finish()?;
        }
        ImageFormat::Xva => {
            xva::write_disk(sink, 4, actual_size, |offset, buf| read_scratch_at(&mut scratch, offset, buf))?;
            xva::finish(sink)?;
        }
        ImageFormat::Ova => {
            ova::write(
                sink,
                config,
                actual_size,
                |offset, buf| read_scratch_at(&mut scratch, offset, buf),
                move |offset, len| hole_map.is_hole(offset, len),
            )?;
        }
    }

    Ok(())
}

fn read_scratch_at(scratch: &mut std::fs::File, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
    scratch.seek(SeekFrom::Start(offset))?;
    let mut total = 0;
    while total < buf.len() {
        let n = std::io::Read::read(scratch, &mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}
