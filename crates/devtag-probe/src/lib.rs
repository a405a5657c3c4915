#![forbid(unsafe_code)]

//! Superblock reader used to verify device identity.
//!
//! Reads the label and UUID of common filesystems directly from the device so
//! devtag can confirm that a `/dev/disk/by-*` link still points at the right
//! node. Only positioned reads are used; the file offset of the caller's
//! handle is left untouched.

mod superblock;

pub use superblock::{Filesystem, SuperblockProbe};

use std::io;
use thiserror::Error;

pub type ProbeResult<T> = Result<T, ProbeError>;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to read device: {0}")]
    Io(#[from] io::Error),

    #[error("no supported filesystem signature found")]
    Unrecognized,
}
