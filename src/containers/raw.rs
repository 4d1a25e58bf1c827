//! RAW container (§4.3.1): the XFS image, byte for byte, no framing.

use std::io::Write;

use crate::error::BuildError;

/// Nothing to add; callers write the XFS compiler's output straight to
/// `sink`. Kept as a named encoder so the dispatcher's format match has a
/// uniform arm, and so a size-alignment pass can still run before it.
pub fn finish<W: Write>(_sink: &mut W) -> Result<(), BuildError> {
    Ok(())
}
