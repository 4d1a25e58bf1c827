//! The XFS filesystem compiler: turns a [`crate::tree::FileTree`] into a
//! byte-for-byte v4 XFS image, in three phases (`precompile`, `prepare`,
//! `compile`) plus the on-disk structure modules they share.

pub mod ag;
pub mod btree;
pub mod compile;
pub mod constants;
pub mod dir;
pub mod extent;
pub mod hash;
pub mod inode;
pub mod journal;
pub mod precompile;
pub mod prepare;
pub mod superblock;
pub mod translate;
pub mod types;

use std::io::Write;

use crate::error::BuildError;
use crate::external::{Logger, NullLogger, NullProgress, Progress};
use crate::tree::FileTree;

/// Run all three phases and stream the resulting raw XFS image to `sink`.
/// `disk_size` is the exact byte length the caller wants the filesystem to
/// occupy.
///
/// This is the low-level, container-free entry point: no size negotiation
/// against a target format's alignment, no container framing. Most callers
/// want [`crate::dispatch::build`] instead, which negotiates size against
/// the requested [`crate::config::ImageFormat`] and wraps this same
/// precompile/prepare/compile sequence in the chosen container encoder.
pub fn build<W: Write>(
    sink: &mut W,
    tree: &mut FileTree,
    disk_size: u64,
    logger: Option<&mut dyn Logger>,
    progress: Option<&mut dyn Progress>,
) -> Result<u64, BuildError> {
    let mut null_logger = NullLogger;
    let logger = logger.unwrap_or(&mut null_logger);
    let mut null_progress = NullProgress;
    let progress = progress.unwrap_or(&mut null_progress);

    let result = precompile::run(tree, 0, 0)?;
    if disk_size < result.minimum_size {
        return Err(BuildError::DiskTooSmall { delta: result.minimum_size - disk_size });
    }
    let placement = prepare::run(tree, result.consts, disk_size)?;
    let actual_size = placement.ag_lengths.iter().map(|&l| l as u64).sum::<u64>()
        * placement.consts.block_size as u64;

    compile::run(
        sink,
        compile::CompileInputs { tree, placement },
        logger,
        progress,
        || false,
    )?;
    Ok(actual_size)
}
