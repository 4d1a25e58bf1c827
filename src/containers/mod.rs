//! Container/disk-format encoders (§4.3): each wraps the raw XFS image
//! produced by [`crate::xfs::build`] in a particular virtual-disk or
//! archive container.

pub mod gcp;
pub mod ova;
pub mod raw;
pub mod registry;
pub mod vhd;
pub mod vmdk;
pub mod xva;

pub use registry::{format_info, FormatInfo};
