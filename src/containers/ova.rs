//! OVA container (§4.3.6): an uncompressed ustar tar holding an OVF
//! descriptor (`<name>.ovf`) and one stream-optimized VMDK
//! (`<name>-disk1.vmdk`).
//!
//! The VMDK is built into a scoped temporary file first (its final size
//! isn't known until compression finishes, and ustar headers need the size
//! up front), then copied into the tar — the same "write to a temp file,
//! measure, re-stream" shape the donor project uses for package staging.

use std::io::{Seek, SeekFrom, Write};

use tempfile::tempfile;

use crate::config::BuildConfig;
use crate::error::BuildError;

const TAR_BLOCK: usize = 512;

fn octal_field(buf: &mut [u8], value: u64) {
    let s = format!("{:0>width$o}\0", value, width = buf.len() - 1);
    let bytes = s.as_bytes();
    let start = buf.len() - bytes.len();
    buf[start..].copy_from_slice(bytes);
}

fn ustar_header(name: &str, size: u64) -> [u8; TAR_BLOCK] {
    let mut hdr = [0u8; TAR_BLOCK];
    let name_bytes = name.as_bytes();
    hdr[0..name_bytes.len()].copy_from_slice(name_bytes);
    octal_field(&mut hdr[100..108], 0o644);
    octal_field(&mut hdr[108..116], 0);
    octal_field(&mut hdr[116..124], 0);
    octal_field(&mut hdr[124..136], size);
    octal_field(&mut hdr[136..148], 0);
    hdr[156] = b'0';
    hdr[257..263].copy_from_slice(b"ustar\0");
    hdr[263] = b'0';
    hdr[264] = b'0';
    for b in &mut hdr[148..156] {
        *b = b' ';
    }
    let sum: u32 = hdr.iter().map(|&b| b as u32).sum();
    let cksum = format!("{:06o}\0 ", sum);
    hdr[148..156].copy_from_slice(cksum.as_bytes());
    hdr
}

fn write_tar_entry<W: Write>(sink: &mut W, name: &str, content: &[u8]) -> Result<(), BuildError> {
    sink.write_all(&ustar_header(name, content.len() as u64))?;
    sink.write_all(content)?;
    let pad = (TAR_BLOCK - content.len() % TAR_BLOCK) % TAR_BLOCK;
    crate::io_support::zero_reader::write_zeros(sink, pad as u64)?;
    Ok(())
}

fn write_tar_stream<W: Write, R: std::io::Read>(
    sink: &mut W,
    name: &str,
    size: u64,
    mut reader: R,
) -> Result<(), BuildError> {
    sink.write_all(&ustar_header(name, size))?;
    let copied = std::io::copy(&mut reader, sink)?;
    if copied != size {
        return Err(BuildError::WriteUnderflow { written: copied, declared: size });
    }
    let pad = (TAR_BLOCK as u64 - size % TAR_BLOCK as u64) % TAR_BLOCK as u64;
    crate::io_support::zero_reader::write_zeros(sink, pad)?;
    Ok(())
}

fn ovf_descriptor(config: &BuildConfig, disk_size: u64, vmdk_size: u64) -> String {
    let networks: String = config
        .networks
        .iter()
        .map(|n| format!(r#"<Network ovf:name="{}"/>"#, n.nic_name))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Envelope xmlns="http://schemas.dmtf.org/ovf/envelope/1">
  <References>
    <File ovf:href="{name}-disk1.vmdk" ovf:id="disk1" ovf:size="{vmdk_size}"/>
  </References>
  <DiskSection>
    <Disk ovf:capacity="{disk_size}" ovf:diskId="disk1" ovf:fileRef="disk1"/>
  </DiskSection>
  <NetworkSection>{networks}</NetworkSection>
  <VirtualSystem ovf:id="{name}">
    <VirtualHardwareSection>
      <Item><rasd:ResourceType>3</rasd:ResourceType><rasd:VirtualQuantity>{cpus}</rasd:VirtualQuantity></Item>
      <Item><rasd:ResourceType>4</rasd:ResourceType><rasd:VirtualQuantity>{ram_mib}</rasd:VirtualQuantity></Item>
    </VirtualHardwareSection>
  </VirtualSystem>
</Envelope>
"#,
        name = config.vm_name,
        vmdk_size = vmdk_size,
        disk_size = disk_size,
        networks = networks,
        cpus = config.vm_cpus,
        ram_mib = config.vm_ram_mib,
    )
}

/// Build the VMDK into a scoped temp file, then emit the OVA tar.
pub fn write<W: Write>(
    sink: &mut W,
    config: &BuildConfig,
    disk_size: u64,
    read_grain: impl FnMut(u64, &mut [u8]) -> std::io::Result<usize>,
    is_hole: impl Fn(u64, u64) -> bool,
) -> Result<(), BuildError> {
    let mut scratch = tempfile()?;
    let descriptor_stub = format!("# {} disk descriptor\n", config.vm_name);
    super::vmdk::write(&mut scratch, disk_size, &descriptor_stub, read_grain, is_hole)?;
    let vmdk_size = scratch.stream_position()?;
    scratch.seek(SeekFrom::Start(0))?;

    let ovf = ovf_descriptor(config, disk_size, vmdk_size);
    write_tar_entry(sink, &format!("{}.ovf", config.vm_name), ovf.as_bytes())?;
    write_tar_stream(sink, &format!("{}-disk1.vmdk", config.vm_name), vmdk_size, scratch)?;

    crate::io_support::zero_reader::write_zeros(sink, 2 * TAR_BLOCK as u64)?;
    Ok(())
}
