//! Identifier encoding for udev-style link names.
//!
//! Mirrors the escaping udev applies when it creates `/dev/disk/by-*` links:
//! safe ASCII and valid multi-byte UTF-8 pass through, everything else becomes
//! `\xNN`.

use crate::error::{DevtagError, DevtagResult};
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Upper bound on a resolved link path, matching the kernel's `PATH_MAX`.
pub const PATH_MAX: usize = 4096;

const WHITELIST: &[u8] = b"#+-.:=@_";

fn is_whitelisted(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || WHITELIST.contains(&byte)
}

/// Encode `value` into a filesystem-safe path segment.
pub fn encode_string(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for ch in value.chars() {
        if !ch.is_ascii() {
            encoded.push(ch);
            continue;
        }
        let byte = ch as u8;
        if byte != b'\\' && is_whitelisted(byte) {
            encoded.push(ch);
        } else {
            let _ = write!(encoded, "\\x{byte:02x}");
        }
    }
    encoded
}

/// Encode `value` and join it onto `dir`, enforcing the path length limit.
pub fn encode_path_segment(dir: &Path, value: &str) -> DevtagResult<PathBuf> {
    let failure = |reason: String| DevtagError::Encoding {
        value: value.to_string(),
        reason,
    };

    if value.is_empty() {
        return Err(failure("value is empty".to_string()));
    }

    let segment = encode_string(value);
    let candidate = dir.join(&segment);
    let length = candidate.as_os_str().len();
    if length >= PATH_MAX {
        return Err(failure(format!(
            "encoded path is {length} bytes, limit is {}",
            PATH_MAX - 1
        )));
    }
    Ok(candidate)
}
