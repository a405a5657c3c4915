#![forbid(unsafe_code)]

//! Device cache backed by the udev database.
//!
//! udev records every block device's filesystem and partition identifiers as
//! device properties. A lookup enumerates the `block` subsystem for a device
//! whose property matches the tag and returns its device node.

use devtag_core::{encode_string, TagKind};

/// udev property carrying a tag, with the value in the form udev stores it.
///
/// Filesystem UUIDs and labels are matched against their `*_ENC` variants,
/// which hold the link-safe encoding of the raw value.
pub fn udev_property(name: &str, value: &str) -> Option<(&'static str, String)> {
    let kind = name.parse::<TagKind>().ok()?;
    let property = match kind {
        TagKind::Uuid => ("ID_FS_UUID_ENC", encode_string(value)),
        TagKind::Label => ("ID_FS_LABEL_ENC", encode_string(value)),
        TagKind::PartUuid => ("ID_PART_ENTRY_UUID", value.to_string()),
        TagKind::PartLabel => ("ID_PART_ENTRY_NAME", value.to_string()),
        TagKind::Type => ("ID_FS_TYPE", value.to_string()),
    };
    Some(property)
}

#[cfg(target_os = "linux")]
mod linux {
    use super::udev_property;
    use devtag_provider::DeviceCache;
    use log::{debug, trace};
    use std::io;
    use std::path::PathBuf;
    use udev::{Enumerator, Udev};

    /// [`DeviceCache`] answering lookups from the udev database.
    ///
    /// A handle is a udev context; keeping it across lookups avoids
    /// reconnecting for every tag.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct UdevCache;

    impl UdevCache {
        pub fn new() -> Self {
            Self
        }
    }

    impl DeviceCache for UdevCache {
        type Handle = Udev;
        type Error = io::Error;

        fn open(&self) -> io::Result<Udev> {
            trace!("opening udev context");
            Udev::new()
        }

        fn lookup(&self, handle: &mut Udev, name: &str, value: &str) -> io::Result<Option<PathBuf>> {
            let Some((property, expected)) = udev_property(name, value) else {
                debug!("udev records no property for {name}");
                return Ok(None);
            };

            let mut enumerator = Enumerator::with_udev(handle.clone())?;
            enumerator.match_subsystem("block")?;
            enumerator.match_property(property, &expected)?;

            for device in enumerator.scan_devices()? {
                if let Some(node) = device.devnode() {
                    debug!(
                        "udev: {property}={expected} is {}",
                        device.syspath().display()
                    );
                    return Ok(Some(node.to_path_buf()));
                }
            }
            Ok(None)
        }
    }
}

#[cfg(target_os = "linux")]
pub use linux::UdevCache;
