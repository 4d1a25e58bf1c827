//! Format registry (§6): per-format alignment, MTU default and filename
//! suffix, looked up by the build dispatcher before invoking precompile.

use crate::config::ImageFormat;

pub struct FormatInfo {
    pub suffix: &'static str,
    /// Disk-size rounding granularity this container requires.
    pub size_align: u64,
    /// Default network MTU suggested for guests using this format, where
    /// the target platform has an opinion (0 = no opinion).
    pub default_mtu: u32,
}

pub fn format_info(format: ImageFormat) -> FormatInfo {
    match format {
        ImageFormat::Raw => FormatInfo { suffix: "raw", size_align: 1 << 21, default_mtu: 1500 },
        ImageFormat::VhdFixed => FormatInfo { suffix: "vhd", size_align: 1 << 21, default_mtu: 1500 },
        ImageFormat::VhdDynamic => FormatInfo { suffix: "vhd", size_align: 1 << 21, default_mtu: 1500 },
        ImageFormat::Gcp => FormatInfo { suffix: "tar.gz", size_align: 1 << 30, default_mtu: 1460 },
        ImageFormat::Xva => FormatInfo { suffix: "xva", size_align: 1 << 21, default_mtu: 1500 },
        ImageFormat::Ova => FormatInfo { suffix: "ova", size_align: 1 << 21, default_mtu: 1500 },
    }
}
