use crate::error::{CodecError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read, Write};
use tgi_model::{format_hex, ResourceKey, StringTableLocale};

const MAGIC: &[u8; 4] = b"STBL";
const VERSION: u16 = 5;
/// Smallest possible entry: key, flags, length.
const MIN_ENTRY_SIZE: u64 = 7;

/// A single localized string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringEntry {
    pub key: u32,
    pub value: String,
}

/// Binary string table (STBL v5).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringTable {
    pub entries: Vec<StringEntry>,
}

impl StringTable {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if !bytes.starts_with(MAGIC) {
            return Err(CodecError::InvalidMagic {
                expected: "STBL",
                found: String::from_utf8_lossy(&bytes[..bytes.len().min(4)]).into_owned(),
            });
        }

        let mut cursor = Cursor::new(&bytes[MAGIC.len()..]);
        let version = cursor
            .read_u16::<LittleEndian>()
            .map_err(CodecError::eof("string table header"))?;
        if version != VERSION {
            return Err(CodecError::UnsupportedVersion {
                format: "STBL",
                version: u32::from(version),
            });
        }

        let _compressed = cursor
            .read_u8()
            .map_err(CodecError::eof("string table header"))?;
        let count = cursor
            .read_u64::<LittleEndian>()
            .map_err(CodecError::eof("string table header"))?;
        let mut reserved = [0u8; 2];
        cursor
            .read_exact(&mut reserved)
            .map_err(CodecError::eof("string table header"))?;
        let _strings_length = cursor
            .read_u32::<LittleEndian>()
            .map_err(CodecError::eof("string table header"))?;

        if count > bytes.len() as u64 / MIN_ENTRY_SIZE {
            return Err(CodecError::truncated(format!(
                "string table ({count} entries declared)"
            )));
        }

        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let key = cursor
                .read_u32::<LittleEndian>()
                .map_err(CodecError::eof("string table entry"))?;
            let _flags = cursor
                .read_u8()
                .map_err(CodecError::eof("string table entry"))?;
            let length = cursor
                .read_u16::<LittleEndian>()
                .map_err(CodecError::eof("string table entry"))?;
            let mut raw = vec![0u8; usize::from(length)];
            cursor
                .read_exact(&mut raw)
                .map_err(CodecError::eof("string table entry"))?;
            let value =
                String::from_utf8(raw).map_err(|_| CodecError::InvalidUtf8("string table"))?;
            entries.push(StringEntry { key, value });
        }

        Ok(Self { entries })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut strings_length: u32 = 0;
        for entry in &self.entries {
            let length =
                u16::try_from(entry.value.len()).map_err(|_| CodecError::TooLarge("string"))?;
            strings_length = strings_length.saturating_add(u32::from(length) + 1);
        }

        let mut out = Vec::new();
        out.write_all(MAGIC)?;
        out.write_u16::<LittleEndian>(VERSION)?;
        out.write_u8(0)?;
        out.write_u64::<LittleEndian>(self.entries.len() as u64)?;
        out.write_all(&[0, 0])?;
        out.write_u32::<LittleEndian>(strings_length)?;
        for entry in &self.entries {
            out.write_u32::<LittleEndian>(entry.key)?;
            out.write_u8(0)?;
            out.write_u16::<LittleEndian>(entry.value.len() as u16)?;
            out.write_all(entry.value.as_bytes())?;
        }
        Ok(out)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Locale-keyed text form of a string table, as written into a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringTableJson {
    pub locale: String,
    pub group: String,
    pub instance_base: String,
    pub entries: Vec<StringTableJsonEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringTableJsonEntry {
    pub key: String,
    pub value: String,
}

impl StringTableJson {
    #[must_use]
    pub fn from_binary(key: &ResourceKey, table: &StringTable) -> Self {
        Self {
            locale: locale_label(key.instance),
            group: format_hex(u64::from(key.group), 8, true),
            instance_base: format_hex(StringTableLocale::instance_base(key.instance), 14, true),
            entries: table
                .entries
                .iter()
                .map(|entry| StringTableJsonEntry {
                    key: format_hex(u64::from(entry.key), 8, true),
                    value: entry.value.clone(),
                })
                .collect(),
        }
    }

    pub fn stringify(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Locale name for an instance, or its raw locale byte when unknown.
#[must_use]
pub fn locale_label(instance: u64) -> String {
    StringTableLocale::from_instance(instance).map_or_else(
        || format_hex(instance >> 56, 2, true),
        |locale| locale.name().to_string(),
    )
}
