#![allow(dead_code)]

use devtag_core::node::{DeviceNodes, DeviceNumber};
use devtag_core::notify::{EventNotifier, UeventAction};
use devtag_core::DevtagResult;
use devtag_provider::{DeviceCache, DeviceProbe, ProbeField, ProbeRequest, ProbeValues};
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Fake `/dev` tree: regular files stand in for device nodes and carry their
/// metadata as `FIELD=value` lines.
pub struct DeviceTree {
    pub dir: TempDir,
}

impl DeviceTree {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("dev")).unwrap();
        fs::create_dir_all(dir.path().join("disk/by-uuid")).unwrap();
        fs::create_dir_all(dir.path().join("disk/by-label")).unwrap();
        Self { dir }
    }

    pub fn link_root(&self) -> PathBuf {
        self.dir.path().join("disk")
    }

    /// Create a fake device node with the given probe-visible metadata.
    pub fn device(&self, name: &str, metadata: &[(&str, &str)]) -> PathBuf {
        let path = self.dir.path().join("dev").join(name);
        let body: String = metadata
            .iter()
            .map(|(field, value)| format!("{field}={value}\n"))
            .collect();
        fs::write(&path, body).unwrap();
        fs::canonicalize(path).unwrap()
    }

    /// Add a udev-style `by-<kind>/<encoded>` link pointing at `../../dev/<device>`.
    pub fn link(&self, kind: &str, encoded: &str, device: &str) -> PathBuf {
        let link = self.link_root().join(format!("by-{kind}")).join(encoded);
        symlink(Path::new("../../dev").join(device), &link).unwrap();
        link
    }
}

/// Probe that reads `FIELD=value` lines from the opened file.
#[derive(Clone, Default)]
pub struct TextProbe {
    pub calls: Arc<Mutex<Vec<ProbeRequest>>>,
}

#[derive(Debug)]
pub struct ProbeFailure(pub String);

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ProbeFailure {}

impl DeviceProbe for TextProbe {
    type Error = ProbeFailure;

    fn probe(&self, device: &File, request: ProbeRequest) -> Result<ProbeValues, ProbeFailure> {
        self.calls.lock().unwrap().push(request);
        let mut reader = device;
        let mut contents = String::new();
        reader
            .read_to_string(&mut contents)
            .map_err(|err| ProbeFailure(err.to_string()))?;
        if contents.trim() == "garbage" {
            return Err(ProbeFailure("unrecognized superblock".into()));
        }

        let mut values = ProbeValues::new();
        for line in contents.lines() {
            let Some((name, value)) = line.split_once('=') else {
                continue;
            };
            let field = match name {
                "LABEL" => ProbeField::Label,
                "UUID" => ProbeField::Uuid,
                "TYPE" => ProbeField::Type,
                _ => continue,
            };
            if request.contains(field) {
                values.insert(field, value.as_bytes().to_vec());
            }
        }
        Ok(values)
    }
}

/// Treats every existing regular file as a block device and records lookups.
#[derive(Clone, Default)]
pub struct FileNodes {
    pub lookups: Arc<Mutex<Vec<PathBuf>>>,
    pub not_block: Arc<Mutex<Vec<PathBuf>>>,
}

impl DeviceNodes for FileNodes {
    fn block_device(&self, path: &Path) -> io::Result<Option<DeviceNumber>> {
        self.lookups.lock().unwrap().push(path.to_path_buf());
        let meta = fs::metadata(path)?;
        let canonical = fs::canonicalize(path)?;
        if !meta.is_file() || self.not_block.lock().unwrap().contains(&canonical) {
            return Ok(None);
        }
        Ok(Some(DeviceNumber::new(8, 1)))
    }
}

/// Records every notification instead of touching sysfs.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub events: Arc<Mutex<Vec<(PathBuf, UeventAction)>>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<(PathBuf, UeventAction)> {
        self.events.lock().unwrap().clone()
    }
}

impl EventNotifier for RecordingNotifier {
    fn notify(&self, device: &Path, action: UeventAction) -> DevtagResult<()> {
        self.events
            .lock()
            .unwrap()
            .push((device.to_path_buf(), action));
        Ok(())
    }
}

/// In-memory metadata cache counting handle lifecycles.
#[derive(Clone, Default)]
pub struct MockCache {
    pub entries: Arc<Mutex<HashMap<(String, String), PathBuf>>>,
    pub opens: Arc<Mutex<usize>>,
    pub closes: Arc<Mutex<usize>>,
    pub unavailable: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub struct MockHandle {
    pub id: usize,
    pub lookups: usize,
}

impl MockCache {
    pub fn with_entry(name: &str, value: &str, path: impl Into<PathBuf>) -> Self {
        let cache = Self::default();
        cache
            .entries
            .lock()
            .unwrap()
            .insert((name.to_string(), value.to_string()), path.into());
        cache
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn opens(&self) -> usize {
        *self.opens.lock().unwrap()
    }

    pub fn closes(&self) -> usize {
        *self.closes.lock().unwrap()
    }
}

impl DeviceCache for MockCache {
    type Handle = MockHandle;
    type Error = io::Error;

    fn open(&self) -> io::Result<MockHandle> {
        if self.unavailable {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "cache locked"));
        }
        let mut opens = self.opens.lock().unwrap();
        *opens += 1;
        Ok(MockHandle {
            id: *opens,
            lookups: 0,
        })
    }

    fn lookup(
        &self,
        handle: &mut MockHandle,
        name: &str,
        value: &str,
    ) -> io::Result<Option<PathBuf>> {
        handle.lookups += 1;
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(&(name.to_string(), value.to_string()))
            .cloned())
    }

    fn close(&self, handle: MockHandle) {
        *self.closes.lock().unwrap() += 1;
        drop(handle);
    }
}
