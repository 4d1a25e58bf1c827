//! Drives the full dispatcher ([`imgcompile::build`]) for every container
//! format against a small tree and checks each container's distinguishing
//! on-disk framing, the way the donor project's fixture tests assert on
//! specific byte offsets rather than re-implementing a parser.

use imgcompile::config::{BuildConfig, DiskSize, ImageFormat, NetworkConfig};
use imgcompile::tree::FileTree;

fn small_tree() -> FileTree {
    let mut tree = FileTree::new();
    let content = b"hello\n".to_vec();
    tree.add_regular(
        tree.root(),
        "hello.txt",
        content.len() as u64,
        1,
        Box::new(move || Ok(Box::new(std::io::Cursor::new(content.clone())) as Box<dyn std::io::Read>)),
    );
    tree
}

fn config_for(format: ImageFormat) -> BuildConfig {
    BuildConfig {
        disk_size: DiskSize::Delta(0),
        format,
        networks: vec![NetworkConfig { nic_name: "eth0".to_string(), mtu: 1500 }],
        ..BuildConfig::default()
    }
}

#[test]
fn raw_image_starts_with_xfs_superblock() {
    env_logger::init();
    let mut tree = small_tree();
    let config = config_for(ImageFormat::Raw);
    let mut out = Vec::new();
    imgcompile::build(&mut out, &mut tree, &config, None, None).expect("raw build should succeed");

    assert_eq!(&out[0..4], &[0x58, 0x46, 0x53, 0x42]);
}

#[test]
fn vhd_fixed_ends_with_conectix_footer() {
    let mut tree = small_tree();
    let config = config_for(ImageFormat::VhdFixed);
    let mut out = Vec::new();
    imgcompile::build(&mut out, &mut tree, &config, None, None).expect("vhd-fixed build should succeed");

    let footer = &out[out.len() - 512..];
    assert_eq!(&footer[0..8], b"conectix");
    // disk_type field at offset 60: 2 = fixed.
    let disk_type = u32::from_be_bytes(footer[60..64].try_into().unwrap());
    assert_eq!(disk_type, 2);
}

#[test]
fn vhd_dynamic_footer_and_header_pair_up() {
    let mut tree = small_tree();
    let config = config_for(ImageFormat::VhdDynamic);
    let mut out = Vec::new();
    imgcompile::build(&mut out, &mut tree, &config, None, None).expect("vhd-dynamic build should succeed");

    // Footer at offset 0, repeated at the very end; dynamic header right
    // after the first footer.
    assert_eq!(&out[0..8], b"conectix");
    assert_eq!(&out[out.len() - 512..out.len() - 504], b"conectix");
    assert_eq!(&out[512..520], b"cxsparse");

    let disk_type = u32::from_be_bytes(out[60..64].try_into().unwrap());
    assert_eq!(disk_type, 3);
}

// GCP's mandatory 1 GiB disk-size alignment makes a full dispatch::build
// round trip needlessly heavy for a framing check; exercise GcpWriter
// directly instead, the way a unit test for one container would.

#[test]
fn gcp_output_is_a_valid_gzip_stream() {
    use imgcompile::containers::gcp::GcpWriter;

    let content = b"hello\n";
    let mut out = Vec::new();
    let mut w = GcpWriter::new(&mut out, content.len() as u64).expect("writer should start");
    w.write_content(content).expect("content should write");
    w.finish().expect("stream should finish");

    assert_eq!(&out[0..2], &[0x1f, 0x8b], "gzip magic bytes");
}

#[test]
fn gcp_tar_member_is_named_disk_raw() {
    use std::io::Read;

    use imgcompile::containers::gcp::GcpWriter;

    let content = b"hello\n";
    let mut out = Vec::new();
    let mut w = GcpWriter::new(&mut out, content.len() as u64).expect("writer should start");
    w.write_content(content).expect("content should write");
    w.finish().expect("stream should finish");

    let mut gz = flate2::read::GzDecoder::new(&out[..]);
    let mut tar_header = [0u8; 512];
    gz.read_exact(&mut tar_header).expect("tar header should decompress");

    let name_end = tar_header.iter().position(|&b| b == 0).unwrap_or(100);
    assert_eq!(&tar_header[..name_end], b"disk.raw");
    assert_eq!(&tar_header[257..263], b"ustar\0");
}

#[test]
fn xva_tar_has_ustar_magic_and_ends_with_trailer() {
    let mut tree = small_tree();
    let config = config_for(ImageFormat::Xva);
    let mut out = Vec::new();
    imgcompile::build(&mut out, &mut tree, &config, None, None).expect("xva build should succeed");

    assert_eq!(&out[257..263], b"ustar\0");
    // Two all-zero 512-byte end-of-archive blocks.
    let trailer = &out[out.len() - 1024..];
    assert!(trailer.iter().all(|&b| b == 0));
}

#[test]
fn ova_contains_ovf_descriptor_and_embedded_vmdk() {
    let mut tree = small_tree();
    let mut config = config_for(ImageFormat::Ova);
    config.vm_name = "testvm".to_string();
    let mut out = Vec::new();
    imgcompile::build(&mut out, &mut tree, &config, None, None).expect("ova build should succeed");

    assert_eq!(&out[257..263], b"ustar\0");
    let name_end = out.iter().position(|&b| b == 0).unwrap_or(100);
    assert_eq!(&out[..name_end], b"testvm.ovf");

    // The embedded stream-optimized VMDK carries its own KDMV magic
    // somewhere after the OVF entry's tar header+content+padding.
    let kdmv = [0x4b, 0x44, 0x4d, 0x56]; // "KDMV"
    assert!(out.windows(4).any(|w| w == kdmv), "expected KDMV sparse header inside the OVA tar");
}
