//! `NAME=value` tag model and parsing.

use crate::error::{DevtagError, DevtagResult};
use devtag_provider::ProbeField;
use std::fmt;
use std::str::FromStr;

/// Separator between tag name and value in combined specs.
pub const TAG_SEPARATOR: char = '=';

/// Identifier kinds devtag knows how to name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Uuid,
    Label,
    PartUuid,
    PartLabel,
    Type,
}

impl TagKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagKind::Uuid => "UUID",
            TagKind::Label => "LABEL",
            TagKind::PartUuid => "PARTUUID",
            TagKind::PartLabel => "PARTLABEL",
            TagKind::Type => "TYPE",
        }
    }

    /// Superblock field that carries this identifier, when a probe can read it.
    pub fn probe_field(&self) -> Option<ProbeField> {
        match self {
            TagKind::Uuid => Some(ProbeField::Uuid),
            TagKind::Label => Some(ProbeField::Label),
            TagKind::Type => Some(ProbeField::Type),
            TagKind::PartUuid | TagKind::PartLabel => None,
        }
    }
}

impl FromStr for TagKind {
    type Err = DevtagError;

    fn from_str(value: &str) -> DevtagResult<Self> {
        match value {
            "UUID" => Ok(TagKind::Uuid),
            "LABEL" => Ok(TagKind::Label),
            "PARTUUID" => Ok(TagKind::PartUuid),
            "PARTLABEL" => Ok(TagKind::PartLabel),
            "TYPE" => Ok(TagKind::Type),
            other => Err(DevtagError::UnsupportedToken(other.to_string())),
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `(name, value)` pair naming a device abstractly.
///
/// The name is kept verbatim so each strategy decides what it supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    name: String,
    value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Split a combined `NAME=value` spec at the first separator.
    ///
    /// A value wrapped in single or double quotes is unquoted; the closing
    /// quote is the last occurrence of the opening character. Empty names,
    /// empty values, and unterminated quotes are rejected.
    pub fn parse(spec: &str) -> DevtagResult<Self> {
        let malformed = || DevtagError::InvalidTag(spec.to_string());
        let (name, raw_value) = spec.split_once(TAG_SEPARATOR).ok_or_else(malformed)?;

        let value = match raw_value.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let inner = &raw_value[1..];
                let end = inner.rfind(quote).ok_or_else(malformed)?;
                &inner[..end]
            }
            _ => raw_value,
        };

        if name.is_empty() || value.is_empty() {
            return Err(malformed());
        }
        Ok(Self::new(name, value))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Known identifier kind, if the name is one.
    pub fn kind(&self) -> Option<TagKind> {
        self.name.parse().ok()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.name, TAG_SEPARATOR, self.value)
    }
}
