//! Block device node inspection.

use std::fmt;
use std::fs;
use std::io;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::Path;

/// Kernel device number split into major and minor parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceNumber {
    pub major: u32,
    pub minor: u32,
}

impl DeviceNumber {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Decode a raw `st_rdev` using the Linux `dev_t` layout.
    pub fn from_raw(rdev: u64) -> Self {
        let major = ((rdev >> 8) & 0xfff) | ((rdev >> 32) & !0xfff);
        let minor = (rdev & 0xff) | ((rdev >> 12) & !0xff);
        Self {
            major: major as u32,
            minor: minor as u32,
        }
    }
}

impl fmt::Display for DeviceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major, self.minor)
    }
}

/// Answers "is this path a block device, and which one".
pub trait DeviceNodes {
    /// Stat `path`, following symlinks.
    ///
    /// `Ok(None)` means the path exists but is not a block device; a missing
    /// path surfaces as an `io::ErrorKind::NotFound` error.
    fn block_device(&self, path: &Path) -> io::Result<Option<DeviceNumber>>;
}

impl<N> DeviceNodes for &N
where
    N: DeviceNodes + ?Sized,
{
    fn block_device(&self, path: &Path) -> io::Result<Option<DeviceNumber>> {
        (**self).block_device(path)
    }
}

/// Host filesystem view.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostNodes;

impl DeviceNodes for HostNodes {
    fn block_device(&self, path: &Path) -> io::Result<Option<DeviceNumber>> {
        let meta = fs::metadata(path)?;
        if meta.file_type().is_block_device() {
            Ok(Some(DeviceNumber::from_raw(meta.rdev())))
        } else {
            Ok(None)
        }
    }
}
