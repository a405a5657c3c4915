//! Kernel uevent requests for block devices.
//!
//! Writing an action into `/sys/dev/block/<major>:<minor>/uevent` makes the
//! kernel re-broadcast the device event, which lets udev rebuild its links.

use crate::error::{DevtagError, DevtagResult};
use crate::node::{DeviceNodes, HostNodes};
use log::debug;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_SYSFS_ROOT: &str = "/sys";

/// Actions accepted by the kernel's uevent control file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UeventAction {
    Add,
    Remove,
    Change,
    Move,
    Online,
    Offline,
    Bind,
    Unbind,
}

impl UeventAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            UeventAction::Add => "add",
            UeventAction::Remove => "remove",
            UeventAction::Change => "change",
            UeventAction::Move => "move",
            UeventAction::Online => "online",
            UeventAction::Offline => "offline",
            UeventAction::Bind => "bind",
            UeventAction::Unbind => "unbind",
        }
    }
}

impl fmt::Display for UeventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UeventAction {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "add" => Ok(UeventAction::Add),
            "remove" => Ok(UeventAction::Remove),
            "change" => Ok(UeventAction::Change),
            "move" => Ok(UeventAction::Move),
            "online" => Ok(UeventAction::Online),
            "offline" => Ok(UeventAction::Offline),
            "bind" => Ok(UeventAction::Bind),
            "unbind" => Ok(UeventAction::Unbind),
            other => Err(format!("unknown uevent action `{other}`")),
        }
    }
}

/// Something that can ask the kernel to regenerate events for a device.
pub trait EventNotifier {
    fn notify(&self, device: &Path, action: UeventAction) -> DevtagResult<()>;
}

impl<E> EventNotifier for &E
where
    E: EventNotifier + ?Sized,
{
    fn notify(&self, device: &Path, action: UeventAction) -> DevtagResult<()> {
        (**self).notify(device, action)
    }
}

/// Notifier writing to the sysfs uevent control files.
#[derive(Debug, Clone)]
pub struct SysfsNotifier<N = HostNodes> {
    sysfs_root: PathBuf,
    nodes: N,
}

impl SysfsNotifier<HostNodes> {
    pub fn new() -> Self {
        Self::with_root(DEFAULT_SYSFS_ROOT, HostNodes)
    }
}

impl Default for SysfsNotifier<HostNodes> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: DeviceNodes> SysfsNotifier<N> {
    /// Use a different sysfs mount and device-node view (tests, chroots).
    pub fn with_root(sysfs_root: impl Into<PathBuf>, nodes: N) -> Self {
        Self {
            sysfs_root: sysfs_root.into(),
            nodes,
        }
    }

    /// Control file that drives events for `device`.
    pub fn control_path(&self, device: &Path) -> DevtagResult<PathBuf> {
        let number = self
            .nodes
            .block_device(device)?
            .ok_or_else(|| DevtagError::NotBlockDevice(device.to_path_buf()))?;
        Ok(self
            .sysfs_root
            .join("dev/block")
            .join(number.to_string())
            .join("uevent"))
    }
}

impl<N: DeviceNodes> EventNotifier for SysfsNotifier<N> {
    fn notify(&self, device: &Path, action: UeventAction) -> DevtagResult<()> {
        debug!("{}: uevent '{action}' requested", device.display());

        let uevent = self.control_path(device)?;
        let result = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&uevent)
            .and_then(|mut file| file.write_all(action.as_str().as_bytes()));

        debug!(
            "{}: send uevent {}",
            uevent.display(),
            if result.is_ok() { "SUCCESS" } else { "FAILED" }
        );
        result.map_err(|source| DevtagError::Notify {
            path: uevent,
            source,
        })
    }
}

/// Send `action` for `device` through the host's `/sys`.
pub fn send_uevent(device: &Path, action: UeventAction) -> DevtagResult<()> {
    SysfsNotifier::new().notify(device, action)
}
