use crate::{ProbeError, ProbeResult};
use devtag_provider::{DeviceProbe, ProbeField, ProbeRequest, ProbeValues};
use log::trace;
use std::fmt;
use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;

const EXT_SUPERBLOCK_OFFSET: u64 = 1024;
const EXT_MAGIC: u16 = 0xEF53;
const EXT_FEATURE_COMPAT_HAS_JOURNAL: u32 = 0x0004;
const EXT4_FEATURE_INCOMPAT_MASK: u32 = 0x0040 | 0x0080 | 0x0200;

const BTRFS_SUPERBLOCK_OFFSET: u64 = 0x10000;
const BTRFS_LABEL_SIZE: usize = 256;

const SWAP_PAGE_SIZES: &[u64] = &[4096, 8192, 16384, 65536];
const FAT_NO_NAME: &[u8] = b"NO NAME";

/// Filesystems the probe recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filesystem {
    Ext2,
    Ext3,
    Ext4,
    Xfs,
    Btrfs,
    Swap,
    Vfat,
}

impl Filesystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Filesystem::Ext2 => "ext2",
            Filesystem::Ext3 => "ext3",
            Filesystem::Ext4 => "ext4",
            Filesystem::Xfs => "xfs",
            Filesystem::Btrfs => "btrfs",
            Filesystem::Swap => "swap",
            Filesystem::Vfat => "vfat",
        }
    }
}

impl fmt::Display for Filesystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a detector found on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Identity {
    filesystem: Filesystem,
    uuid: Option<String>,
    label: Option<Vec<u8>>,
}

type Detector = fn(&File) -> ProbeResult<Option<Identity>>;

const DETECTORS: &[Detector] = &[detect_xfs, detect_ext, detect_btrfs, detect_swap, detect_vfat];

/// [`DeviceProbe`] that reads filesystem superblocks directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuperblockProbe;

impl SuperblockProbe {
    pub fn new() -> Self {
        Self
    }

    fn identify(&self, device: &File) -> ProbeResult<Identity> {
        for detect in DETECTORS {
            if let Some(identity) = detect(device)? {
                trace!("superblock signature matched {}", identity.filesystem);
                return Ok(identity);
            }
        }
        Err(ProbeError::Unrecognized)
    }
}

impl DeviceProbe for SuperblockProbe {
    type Error = ProbeError;

    fn probe(&self, device: &File, request: ProbeRequest) -> ProbeResult<ProbeValues> {
        let identity = self.identify(device)?;
        let mut values = ProbeValues::new();

        if request.contains(ProbeField::Type) {
            values.insert(ProbeField::Type, identity.filesystem.as_str());
        }
        if request.contains(ProbeField::Uuid) {
            if let Some(uuid) = identity.uuid {
                values.insert(ProbeField::Uuid, uuid);
            }
        }
        if request.contains(ProbeField::Label) {
            if let Some(label) = identity.label {
                values.insert(ProbeField::Label, label);
            }
        }
        Ok(values)
    }
}

/// Read `len` bytes at `offset`; `None` when the device is too small.
fn read_block(device: &File, offset: u64, len: usize) -> ProbeResult<Option<Vec<u8>>> {
    let mut buf = vec![0u8; len];
    match device.read_exact_at(&mut buf, offset) {
        Ok(()) => Ok(Some(buf)),
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(err) => Err(ProbeError::Io(err)),
    }
}

fn le_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Render a 16-byte UUID as `8-4-4-4-12` lowercase hex; all-zero means unset.
fn format_uuid(raw: &[u8]) -> Option<String> {
    if raw.iter().all(|byte| *byte == 0) {
        return None;
    }
    let hex = hex::encode(raw);
    Some(format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    ))
}

/// Label bytes up to the first NUL; empty labels are unset.
fn nul_terminated(raw: &[u8]) -> Option<Vec<u8>> {
    let end = raw.iter().position(|byte| *byte == 0).unwrap_or(raw.len());
    let label = &raw[..end];
    (!label.is_empty()).then(|| label.to_vec())
}

fn detect_ext(device: &File) -> ProbeResult<Option<Identity>> {
    let Some(sb) = read_block(device, EXT_SUPERBLOCK_OFFSET, 0x88)? else {
        return Ok(None);
    };
    if le_u16(&sb, 0x38) != EXT_MAGIC {
        return Ok(None);
    }

    let compat = le_u32(&sb, 0x5c);
    let incompat = le_u32(&sb, 0x60);
    let filesystem = if incompat & EXT4_FEATURE_INCOMPAT_MASK != 0 {
        Filesystem::Ext4
    } else if compat & EXT_FEATURE_COMPAT_HAS_JOURNAL != 0 {
        Filesystem::Ext3
    } else {
        Filesystem::Ext2
    };

    Ok(Some(Identity {
        filesystem,
        uuid: format_uuid(&sb[0x68..0x78]),
        label: nul_terminated(&sb[0x78..0x88]),
    }))
}

fn detect_xfs(device: &File) -> ProbeResult<Option<Identity>> {
    let Some(sb) = read_block(device, 0, 120)? else {
        return Ok(None);
    };
    if &sb[0..4] != b"XFSB" {
        return Ok(None);
    }
    Ok(Some(Identity {
        filesystem: Filesystem::Xfs,
        uuid: format_uuid(&sb[32..48]),
        label: nul_terminated(&sb[108..120]),
    }))
}

fn detect_btrfs(device: &File) -> ProbeResult<Option<Identity>> {
    let Some(sb) = read_block(device, BTRFS_SUPERBLOCK_OFFSET, 0x12b + BTRFS_LABEL_SIZE)? else {
        return Ok(None);
    };
    if &sb[0x40..0x48] != b"_BHRfS_M" {
        return Ok(None);
    }
    Ok(Some(Identity {
        filesystem: Filesystem::Btrfs,
        uuid: format_uuid(&sb[0x20..0x30]),
        label: nul_terminated(&sb[0x12b..0x12b + BTRFS_LABEL_SIZE]),
    }))
}

fn detect_swap(device: &File) -> ProbeResult<Option<Identity>> {
    for page_size in SWAP_PAGE_SIZES {
        let Some(magic) = read_block(device, page_size - 10, 10)? else {
            break;
        };
        if magic != b"SWAPSPACE2" {
            continue;
        }
        // bootbits[1024], version, last_page, nr_badpages, uuid[16], volume_name[16]
        let Some(header) = read_block(device, 1024, 44)? else {
            return Ok(None);
        };
        return Ok(Some(Identity {
            filesystem: Filesystem::Swap,
            uuid: format_uuid(&header[12..28]),
            label: nul_terminated(&header[28..44]),
        }));
    }
    Ok(None)
}

fn detect_vfat(device: &File) -> ProbeResult<Option<Identity>> {
    let Some(bs) = read_block(device, 0, 512)? else {
        return Ok(None);
    };
    if bs[510..512] != [0x55u8, 0xAA] {
        return Ok(None);
    }

    // FAT32 keeps its extended BPB 28 bytes further in than FAT12/16.
    let ext = if &bs[82..87] == b"FAT32" {
        64
    } else if &bs[54..57] == b"FAT" {
        36
    } else {
        return Ok(None);
    };

    if bs[ext + 2] != 0x29 {
        return Ok(Some(Identity {
            filesystem: Filesystem::Vfat,
            uuid: None,
            label: None,
        }));
    }

    let serial = le_u32(&bs, ext + 3);
    let label = fat_label(&bs[ext + 7..ext + 18]);
    Ok(Some(Identity {
        filesystem: Filesystem::Vfat,
        uuid: Some(format!("{:04X}-{:04X}", serial >> 16, serial & 0xffff)),
        label,
    }))
}

fn fat_label(raw: &[u8]) -> Option<Vec<u8>> {
    let end = raw
        .iter()
        .rposition(|byte| *byte != b' ' && *byte != 0)
        .map(|idx| idx + 1)?;
    let label = &raw[..end];
    (label != FAT_NO_NAME).then(|| label.to_vec())
}
