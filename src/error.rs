use thiserror::Error;

/// Every fallible operation in this crate returns one of these.
///
/// Arithmetic "can't happen" situations (failed block distribution, extent
/// computed out of node-sequence order) are not represented here: they are
/// genuine invariant violations and abort via `assert!`/`unreachable!` rather
/// than returning a value a caller could plausibly recover from.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("requested disk size is too small, need {delta} more bytes")]
    DiskTooSmall { delta: u64 },

    #[error("object in {what} would need {blocks} blocks, exceeding 2^32-1")]
    ObjectTooLarge { what: &'static str, blocks: u64 },

    #[error("block size {0} is out of the supported range")]
    BlockSizeOutOfRange(u32),

    #[error("block size {0} is not a power of two")]
    BlockSizeNotPowerOfTwo(u32),

    #[error("unknown image format: {0}")]
    UnknownFormat(String),

    #[error("precompile did not converge after {iterations} iterations")]
    PrecompileDiverged { iterations: u32 },

    #[error("inode B+ tree for AG {agno} would need more than one level, which is unimplemented")]
    InodeTreeTooDeep { agno: u32 },

    #[error("node {node_seq} needs more extents than fit in the inode's data fork")]
    IndirectExtentsUnsupported { node_seq: u64 },

    #[error("seeking backwards is not supported by this encoder")]
    SeekBackwardsUnsupported,

    #[error("wrote {written} bytes, more than the declared {declared}")]
    WriteOverflow { written: u64, declared: u64 },

    #[error("closed after writing {written} bytes, short of the declared {declared}")]
    WriteUnderflow { written: u64, declared: u64 },

    #[error("build was cancelled")]
    Cancelled,

    #[error("{0}")]
    Parse(&'static str),
}
