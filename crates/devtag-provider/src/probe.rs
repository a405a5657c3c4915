//! Provider contract for reading identifying metadata straight from a device.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::fs::File;
use std::ops::BitOr;

/// Identifying fields a probe may be asked to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProbeField {
    Label,
    Uuid,
    Type,
}

impl ProbeField {
    /// Tag-style name of the field (`LABEL`, `UUID`, `TYPE`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeField::Label => "LABEL",
            ProbeField::Uuid => "UUID",
            ProbeField::Type => "TYPE",
        }
    }

    fn bit(self) -> u8 {
        match self {
            ProbeField::Label => 0b001,
            ProbeField::Uuid => 0b010,
            ProbeField::Type => 0b100,
        }
    }
}

impl fmt::Display for ProbeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of fields requested from a probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeRequest(u8);

impl ProbeRequest {
    pub const LABEL: Self = Self(0b001);
    pub const UUID: Self = Self(0b010);
    pub const TYPE: Self = Self(0b100);

    /// Request every field a probe knows about.
    pub fn all() -> Self {
        Self::LABEL | Self::UUID | Self::TYPE
    }

    pub fn contains(&self, field: ProbeField) -> bool {
        self.0 & field.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ProbeRequest {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl From<ProbeField> for ProbeRequest {
    fn from(field: ProbeField) -> Self {
        Self(field.bit())
    }
}

/// Raw values reported by a probe, keyed by field.
///
/// Values are kept as bytes: labels are not guaranteed to be UTF-8 and
/// comparisons must be exact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeValues {
    values: BTreeMap<ProbeField, Vec<u8>>,
}

impl ProbeValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: ProbeField, value: impl Into<Vec<u8>>) {
        self.values.insert(field, value.into());
    }

    pub fn get(&self, field: ProbeField) -> Option<&[u8]> {
        self.values.get(&field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProbeField, &[u8])> {
        self.values.iter().map(|(field, value)| (*field, value.as_slice()))
    }
}

/// Abstraction over low-level metadata probing of an open device.
pub trait DeviceProbe {
    type Error: Error + Send + Sync + 'static;

    /// Read the requested identifying fields from `device`.
    ///
    /// Fields the device does not carry are simply absent from the result.
    fn probe(&self, device: &File, request: ProbeRequest) -> Result<ProbeValues, Self::Error>;
}

impl<P> DeviceProbe for &P
where
    P: DeviceProbe + ?Sized,
{
    type Error = P::Error;

    fn probe(&self, device: &File, request: ProbeRequest) -> Result<ProbeValues, Self::Error> {
        (**self).probe(device, request)
    }
}
