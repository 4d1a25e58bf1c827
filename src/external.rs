//! Interfaces to collaborators that live outside this crate (§6).
//!
//! Only the shape of these collaborators is specified here; their
//! implementations (TOML parsing, package extraction, progress bars) are
//! out of scope. The dispatcher is generic over them so tests can supply
//! trivial stand-ins.

use std::io::Read;

use crate::tree::FileTree;

/// Read access to the package the build is driven from.
pub trait PackageReader {
    /// The file tree to compile into a filesystem image.
    fn fs(&mut self) -> &mut FileTree;

    /// The raw bytes of the package's VCFG document, for callers that parse
    /// it themselves. This crate never parses it.
    fn vcfg(&mut self) -> std::io::Result<Box<dyn Read>>;
}

/// Advisory progress sink. The core runs identically without one; see
/// `NullProgress` for the default.
pub trait Progress {
    fn increment(&mut self, delta: u64);
    fn finish(&mut self, success: bool);
}

/// Advisory logging/progress view. The core's own diagnostics go through the
/// `log` facade regardless of whether a `Logger` is attached; this trait
/// exists only so an embedder can additionally surface human-facing text.
pub trait Logger {
    fn is_debug_enabled(&self) -> bool {
        false
    }
    fn is_info_enabled(&self) -> bool {
        false
    }
    fn debugf(&mut self, _msg: &str) {}
    fn infof(&mut self, _msg: &str) {}
    fn warnf(&mut self, _msg: &str) {}
    fn errorf(&mut self, _msg: &str) {}
    fn new_progress(&mut self, _label: &str, _unit: &str, _total: u64) -> Box<dyn Progress> {
        Box::new(NullProgress)
    }
}

pub struct NullProgress;

impl Progress for NullProgress {
    fn increment(&mut self, _delta: u64) {}
    fn finish(&mut self, _success: bool) {}
}

/// A `Logger` that does nothing; used when the caller has no progress UI.
pub struct NullLogger;

impl Logger for NullLogger {}
