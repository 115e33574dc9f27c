//! Static layout of the inform header.
//!
//! The catalog below is the only place offsets are defined; the parser walks it
//! in order and the encoder walks it again to rebuild the same 40 bytes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named fields of the cleartext header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderField {
    Magic,
    PacketVersion,
    Mac,
    Flags,
    Iv,
    PayloadVersion,
    PayloadLength,
}

impl HeaderField {
    pub fn name(self) -> &'static str {
        match self {
            HeaderField::Magic => "Magic",
            HeaderField::PacketVersion => "PacketVersion",
            HeaderField::Mac => "MAC",
            HeaderField::Flags => "Flags",
            HeaderField::Iv => "IV",
            HeaderField::PayloadVersion => "PayloadVersion",
            HeaderField::PayloadLength => "PayloadLength",
        }
    }
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A catalog entry: which field, and how many bytes it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: HeaderField,
    pub length: usize,
}

pub const MAGIC_LENGTH: usize = 4;
pub const MAC_LENGTH: usize = 6;
pub const IV_LENGTH: usize = 16;

/// Header fields in wire order.
pub const FIELD_ORDER: [FieldSpec; 7] = [
    FieldSpec { field: HeaderField::Magic, length: MAGIC_LENGTH },
    FieldSpec { field: HeaderField::PacketVersion, length: 4 },
    FieldSpec { field: HeaderField::Mac, length: MAC_LENGTH },
    FieldSpec { field: HeaderField::Flags, length: 2 },
    FieldSpec { field: HeaderField::Iv, length: IV_LENGTH },
    FieldSpec { field: HeaderField::PayloadVersion, length: 4 },
    FieldSpec { field: HeaderField::PayloadLength, length: 4 },
];

const fn catalog_length(fields: &[FieldSpec]) -> usize {
    let mut total = 0;
    let mut i = 0;
    while i < fields.len() {
        total += fields[i].length;
        i += 1;
    }
    total
}

/// Combined length of the cleartext header (40 bytes).
pub const HEADER_LENGTH: usize = catalog_length(&FIELD_ORDER);

/// Byte offset of a field within the header.
pub fn field_offset(field: HeaderField) -> usize {
    FIELD_ORDER
        .iter()
        .take_while(|spec| spec.field != field)
        .map(|spec| spec.length)
        .sum()
}

/// Raw flag bitmask as carried on the wire.
///
/// Bit meanings are not fixed here; they come from the
/// [`FlagLayout`](crate::core::variant::FlagLayout) of the active variant.
/// Unknown bits are kept as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flags(pub u16);

impl Flags {
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// True if any bit of `mask` is set. An empty mask is never set.
    pub const fn any(self, mask: u16) -> bool {
        self.0 & mask != 0
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

impl std::ops::BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Self) -> Self::Output {
        Flags(self.0 | rhs.0)
    }
}

/// 6-byte hardware address of the sending device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddress(pub [u8; MAC_LENGTH]);

impl MacAddress {
    pub fn octets(&self) -> [u8; MAC_LENGTH] {
        self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddress {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut octets = [0u8; MAC_LENGTH];
        let mut parts = s.split([':', '-']);
        for octet in octets.iter_mut() {
            let part = parts
                .next()
                .ok_or_else(|| format!("MAC address too short: '{s}'"))?;
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| format!("invalid MAC octet '{part}' in '{s}'"))?;
        }
        if parts.next().is_some() {
            return Err(format!("MAC address too long: '{s}'"));
        }
        Ok(MacAddress(octets))
    }
}

impl Serialize for MacAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
