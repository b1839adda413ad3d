use crate::error::{ModelError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Loose resource files are named `TTTTTTTT-GGGGGGGG-IIIIIIIIIIIIIIII[.ext...]`.
/// `_` is accepted in place of `-` as long as both separators agree.
static TGI_FILENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9A-Fa-f]{8})([-_])([0-9A-Fa-f]{8})([-_])([0-9A-Fa-f]{16})(?:\.[^/\\]*)?$")
        .expect("valid TGI filename regex")
});

/// Type-Group-Instance identity of a resource.
///
/// Keys are plain values: a new identity is a new key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    #[serde(rename = "type")]
    pub type_id: u32,
    pub group: u32,
    pub instance: u64,
}

impl ResourceKey {
    #[must_use]
    pub const fn new(type_id: u32, group: u32, instance: u64) -> Self {
        Self {
            type_id,
            group,
            instance,
        }
    }

    #[must_use]
    pub const fn with_type(self, type_id: u32) -> Self {
        Self { type_id, ..self }
    }

    #[must_use]
    pub const fn with_group(self, group: u32) -> Self {
        Self { group, ..self }
    }

    #[must_use]
    pub const fn with_instance(self, instance: u64) -> Self {
        Self { instance, ..self }
    }

    /// Format as `TTTTTTTT{sep}GGGGGGGG{sep}IIIIIIIIIIIIIIII`.
    #[must_use]
    pub fn format(&self, separator: &str) -> String {
        format_key(self, separator)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_key(self, "-"))
    }
}

impl FromStr for ResourceKey {
    type Err = ModelError;

    /// Parses `T-G-I`, `T_G_I` or `T:G:I` with hex parts (optional `0x`).
    fn from_str(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.trim().split(['-', '_', ':']).collect();
        let [type_part, group_part, instance_part] = parts.as_slice() else {
            return Err(ModelError::invalid_key(raw));
        };

        let type_id = parse_hex(type_part).ok_or_else(|| ModelError::invalid_hex(*type_part))?;
        let group = parse_hex(group_part).ok_or_else(|| ModelError::invalid_hex(*group_part))?;
        let instance =
            parse_hex(instance_part).ok_or_else(|| ModelError::invalid_hex(*instance_part))?;

        Ok(Self::new(
            narrow_u32(type_id)?,
            narrow_u32(group)?,
            instance,
        ))
    }
}

fn narrow_u32(value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| ModelError::OutOfRange { value, bits: 32 })
}

/// Upper-case, zero-padded hex.
#[must_use]
pub fn format_hex(value: u64, digits: usize, prefix: bool) -> String {
    if prefix {
        format!("0x{value:0digits$X}")
    } else {
        format!("{value:0digits$X}")
    }
}

/// Parse a hex string with or without a `0x` prefix.
#[must_use]
pub fn parse_hex(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

#[must_use]
pub fn format_key(key: &ResourceKey, separator: &str) -> String {
    format!(
        "{}{separator}{}{separator}{}",
        format_hex(u64::from(key.type_id), 8, false),
        format_hex(u64::from(key.group), 8, false),
        format_hex(key.instance, 16, false)
    )
}

/// Parse the key out of a loose-file name. Names that do not follow the
/// convention yield `None`; they are not resource files.
#[must_use]
pub fn key_from_filename(name: &str) -> Option<ResourceKey> {
    let caps = TGI_FILENAME.captures(name)?;
    if caps[2] != caps[4] {
        return None;
    }

    let type_id = u32::from_str_radix(&caps[1], 16).ok()?;
    let group = u32::from_str_radix(&caps[3], 16).ok()?;
    let instance = u64::from_str_radix(&caps[5], 16).ok()?;
    Some(ResourceKey::new(type_id, group, instance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn formats_fixed_width_upper_hex() {
        let key = ResourceKey::new(0x6017_E896, 0, 0x1A);
        assert_eq!(key.to_string(), "6017E896-00000000-000000000000001A");
        assert_eq!(key.format("_"), "6017E896_00000000_000000000000001A");
    }

    #[test]
    fn parses_loose_filenames_with_extensions() {
        let key = key_from_filename("220557DA-80000000-0012345678ABCDEF.stbl").expect("key");
        assert_eq!(key, ResourceKey::new(0x2205_57DA, 0x8000_0000, 0x0012_3456_78AB_CDEF));

        let key = key_from_filename("545ac67a_00000000_0000000000000001.SimData.xml").expect("key");
        assert_eq!(key.type_id, 0x545A_C67A);
    }

    #[test]
    fn rejects_names_outside_the_convention() {
        assert_eq!(key_from_filename("6017E896-0012345678ABCDEF.xml"), None);
        assert_eq!(key_from_filename("buff_Example.xml"), None);
        assert_eq!(key_from_filename("6017E896-00000000_0012345678ABCDEF"), None);
        assert_eq!(key_from_filename("6017E896-00000000-12345678ABCDEF"), None);
    }

    #[test]
    fn parse_hex_accepts_optional_prefix() {
        assert_eq!(parse_hex("0x1F"), Some(0x1F));
        assert_eq!(parse_hex("1f"), Some(0x1F));
        assert_eq!(parse_hex("0x"), None);
        assert_eq!(parse_hex("zz"), None);
    }

    #[test]
    fn from_str_checks_widths() {
        let key: ResourceKey = "0x6017E896:0x0:0x1".parse().expect("key");
        assert_eq!(key, ResourceKey::new(0x6017_E896, 0, 1));

        let err = "1FFFFFFFF-0-1".parse::<ResourceKey>().unwrap_err();
        assert!(matches!(err, ModelError::OutOfRange { bits: 32, .. }));
        assert!("1-2".parse::<ResourceKey>().is_err());
    }

    #[test]
    fn serializes_type_field_as_type() {
        let json = serde_json::to_value(ResourceKey::new(1, 2, 3)).expect("json");
        assert_eq!(json["type"], 1);
        assert_eq!(json["instance"], 3);
    }

    proptest! {
        #[test]
        fn proptest_filename_parse_inverts_format(t in any::<u32>(), g in any::<u32>(), i in any::<u64>()) {
            let key = ResourceKey::new(t, g, i);
            prop_assert_eq!(key_from_filename(&format_key(&key, "-")), Some(key));
            prop_assert_eq!(key_from_filename(&format!("{}.binary", format_key(&key, "_"))), Some(key));
        }
    }
}
