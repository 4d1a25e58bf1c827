//! In-process mirror of the external VCFG fields the core reads.
//!
//! The TOML file itself, and the loader that turns it into a `VCFG`, live
//! outside this crate (see `PackageReader` in [`crate::external`]); this
//! struct is what a caller — the real loader, or a test — constructs
//! directly to drive a build.

/// The configured disk size, either a hard byte count or "grow the minimum
/// by this many extra bytes".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskSize {
    Absolute(u64),
    Delta(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Raw,
    VhdFixed,
    VhdDynamic,
    Gcp,
    Xva,
    Ova,
}

impl ImageFormat {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "raw" => Some(Self::Raw),
            "vhd" | "vhd-fixed" => Some(Self::VhdFixed),
            "vhd-dynamic" => Some(Self::VhdDynamic),
            "gcp" => Some(Self::Gcp),
            "xva" => Some(Self::Xva),
            "vmdk" | "vmdk-sparse" | "vmdk-stream-optimized" | "ova" => Some(Self::Ova),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub nic_name: String,
    pub mtu: u32,
}

/// Concrete, in-process configuration driving a single build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub disk_size: DiskSize,
    pub minimum_free_inodes: u64,
    pub minimum_free_space: u64,
    pub format: ImageFormat,
    /// Caller-requested additional size alignment, combined via LCM with the
    /// format's own alignment during size negotiation.
    pub size_align: u64,
    pub vm_name: String,
    pub vm_ram_mib: u64,
    pub vm_cpus: u32,
    pub networks: Vec<NetworkConfig>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            disk_size: DiskSize::Delta(0),
            minimum_free_inodes: 1024,
            minimum_free_space: 16 * 1024 * 1024,
            format: ImageFormat::Raw,
            size_align: 1,
            vm_name: "vorteil".to_string(),
            vm_ram_mib: 256,
            vm_cpus: 1,
            networks: Vec::new(),
        }
    }
}
