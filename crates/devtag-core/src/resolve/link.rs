use super::ResolveStrategy;
use crate::config::EvalMethod;
use crate::encode::encode_path_segment;
use crate::error::{DevtagError, DevtagResult};
use crate::node::DeviceNodes;
use crate::notify::{EventNotifier, UeventAction};
use crate::tag::{Tag, TagKind};
use devtag_provider::{DeviceProbe, ProbeField, ProbeRequest};
use log::debug;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_LINK_ROOT: &str = "/dev/disk";

/// Where udev keeps its persistent-name links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkLayout {
    root: PathBuf,
}

impl LinkLayout {
    pub fn under(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Link directory for `kind`; only identifiers the verifier can probe have one.
    pub fn directory(&self, kind: TagKind) -> Option<PathBuf> {
        match kind {
            TagKind::Uuid => Some(self.root.join("by-uuid")),
            TagKind::Label => Some(self.root.join("by-label")),
            TagKind::PartUuid | TagKind::PartLabel | TagKind::Type => None,
        }
    }
}

impl Default for LinkLayout {
    fn default() -> Self {
        Self::under(DEFAULT_LINK_ROOT)
    }
}

/// Resolves tags through `/dev/disk/by-*` links and verifies the target.
///
/// A link is only trusted after the device it points at reports the same
/// identifier when probed. When verification fails and `send_uevent` is set,
/// a `change` event is requested so udev can repair the link for the next
/// lookup.
#[derive(Debug, Clone)]
pub struct LinkResolver<P, E, N> {
    probe: P,
    notifier: E,
    nodes: N,
    layout: LinkLayout,
    send_uevent: bool,
}

impl<P, E, N> LinkResolver<P, E, N>
where
    P: DeviceProbe,
    E: EventNotifier,
    N: DeviceNodes,
{
    pub fn new(probe: P, notifier: E, nodes: N, layout: LinkLayout, send_uevent: bool) -> Self {
        Self {
            probe,
            notifier,
            nodes,
            layout,
            send_uevent,
        }
    }

    pub fn resolve(&self, tag: &Tag) -> DevtagResult<PathBuf> {
        debug!("evaluating by udev {tag}");

        let target = tag
            .kind()
            .and_then(|kind| Some((self.layout.directory(kind)?, kind.probe_field()?)));
        let Some((dir, field)) = target else {
            debug!("unsupported token {}", tag.name());
            return Err(DevtagError::UnsupportedToken(tag.name().to_string()));
        };

        let link = encode_path_segment(&dir, tag.value())?;
        debug!("expected udev link: {}", link.display());

        match self.nodes.block_device(&link) {
            Ok(Some(_)) => {}
            Ok(None) => return Err(DevtagError::NotBlockDevice(link)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("failed to evaluate by udev: {} does not exist", link.display());
                return Err(DevtagError::LinkMissing(link));
            }
            Err(err) => return Err(DevtagError::Io(err)),
        }

        let device = fs::canonicalize(&link).map_err(|source| DevtagError::Canonicalize {
            path: link.clone(),
            source,
        })?;

        if self.verify(&device, tag, field) {
            return Ok(device);
        }

        debug!("failed to evaluate by udev: stale link {}", link.display());
        if self.send_uevent {
            if let Err(err) = self.notifier.notify(&device, UeventAction::Change) {
                debug!("uevent for {} not delivered: {err}", device.display());
            }
        }
        Err(DevtagError::VerificationMismatch {
            device,
            token: tag.to_string(),
        })
    }

    /// Probe `device` and compare the reported field with the tag value byte for byte.
    fn verify(&self, device: &Path, tag: &Tag, field: ProbeField) -> bool {
        let verified = match self.read_field(device, field) {
            Ok(Some(reported)) => reported == tag.value().as_bytes(),
            Ok(None) => {
                debug!("{}: no {field} reported", device.display());
                false
            }
            Err(reason) => {
                debug!("{}: probe failed: {reason}", device.display());
                false
            }
        };
        debug!(
            "{}: {} verification {}",
            device.display(),
            tag.name(),
            if verified { "PASS" } else { "FAILED" }
        );
        verified
    }

    fn read_field(&self, device: &Path, field: ProbeField) -> Result<Option<Vec<u8>>, String> {
        let file = File::open(device).map_err(|err| format!("open failed: {err}"))?;
        let values = self
            .probe
            .probe(&file, ProbeRequest::LABEL | ProbeRequest::UUID)
            .map_err(|err| err.to_string())?;
        Ok(values.get(field).map(<[u8]>::to_vec))
    }
}

impl<P, E, N, H> ResolveStrategy<H> for LinkResolver<P, E, N>
where
    P: DeviceProbe,
    E: EventNotifier,
    N: DeviceNodes,
{
    fn method(&self) -> EvalMethod {
        EvalMethod::Udev
    }

    fn attempt(&self, tag: &Tag, _cache: Option<&mut Option<H>>) -> DevtagResult<PathBuf> {
        self.resolve(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_maps_only_probeable_identifiers() {
        let layout = LinkLayout::default();
        assert_eq!(
            layout.directory(TagKind::Uuid),
            Some(PathBuf::from("/dev/disk/by-uuid"))
        );
        assert_eq!(
            layout.directory(TagKind::Label),
            Some(PathBuf::from("/dev/disk/by-label"))
        );
        assert_eq!(layout.directory(TagKind::PartUuid), None);
        assert_eq!(layout.directory(TagKind::Type), None);
    }
}
