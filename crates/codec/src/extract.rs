//! Container and loose-file extraction into typed entries.

use crate::dbpf;
use crate::error::Result;
use crate::simdata::SimData;
use crate::stbl::StringTable;
use crate::tuning::TuningDocument;
use tgi_model::{classify, is_tuning_type, ResourceCategory, ResourceKey};

/// Payload decoded as the type its key implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    Tuning(TuningDocument),
    SimData(SimData),
    StringTable(StringTable),
    /// Types with no structured codec; the payload is the value.
    Binary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Typed(TypedValue),
    /// The payload did not decode as its type. The bytes are still on the
    /// entry; `reason` says what went wrong.
    RawFallback { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    /// Position in the source container (0 for loose files).
    pub id: usize,
    pub key: ResourceKey,
    pub payload: Vec<u8>,
    pub decoded: Decoded,
}

impl ResourceEntry {
    #[must_use]
    pub fn category(&self) -> ResourceCategory {
        classify(&self.key)
    }

    #[must_use]
    pub fn is_raw_fallback(&self) -> bool {
        matches!(self.decoded, Decoded::RawFallback { .. })
    }

    #[must_use]
    pub fn typed(&self) -> Option<&TypedValue> {
        match &self.decoded {
            Decoded::Typed(value) => Some(value),
            Decoded::RawFallback { .. } => None,
        }
    }
}

/// Which entries of a container to extract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResourceFilter {
    #[default]
    All,
    Tuning,
    NonTuning,
}

impl ResourceFilter {
    #[must_use]
    pub fn accepts(self, key: &ResourceKey) -> bool {
        match self {
            Self::All => true,
            Self::Tuning => is_tuning_type(key.type_id),
            Self::NonTuning => !is_tuning_type(key.type_id),
        }
    }
}

/// Decode `bytes` as the type `key` implies.
pub fn decode_typed(key: &ResourceKey, bytes: &[u8]) -> Result<TypedValue> {
    Ok(match classify(key) {
        ResourceCategory::Tuning(_) => TypedValue::Tuning(TuningDocument::from_bytes(bytes)?),
        ResourceCategory::StructuredData { .. } => TypedValue::SimData(SimData::from_bytes(bytes)?),
        ResourceCategory::StringTable => TypedValue::StringTable(StringTable::from_bytes(bytes)?),
        ResourceCategory::Image(_)
        | ResourceCategory::RawBinary(_)
        | ResourceCategory::Unsupported(_) => TypedValue::Binary,
    })
}

/// Decode a payload, falling back to raw bytes instead of failing.
#[must_use]
pub fn decode_entry(id: usize, key: ResourceKey, payload: Vec<u8>) -> ResourceEntry {
    let decoded = match decode_typed(&key, &payload) {
        Ok(value) => Decoded::Typed(value),
        Err(err) => {
            log::debug!("{key} kept as raw bytes: {err}");
            Decoded::RawFallback {
                reason: err.to_string(),
            }
        }
    };
    ResourceEntry {
        id,
        key,
        payload,
        decoded,
    }
}

/// Extract the entries of a package that pass `filter`, in index order.
///
/// Only a package that cannot be read at all is an error. Entries whose
/// payload does not decode (or could not be inflated) come back as
/// `RawFallback`.
pub fn extract(container: &[u8], filter: ResourceFilter) -> Result<Vec<ResourceEntry>> {
    let records = dbpf::decode_container(container)?;
    let mut entries = Vec::with_capacity(records.len());

    for (id, record) in records.into_iter().enumerate() {
        if !filter.accepts(&record.key) {
            continue;
        }
        let entry = match record.inflate_error {
            Some(reason) => ResourceEntry {
                id,
                key: record.key,
                payload: record.data,
                decoded: Decoded::RawFallback { reason },
            },
            None => decode_entry(id, record.key, record.data),
        };
        entries.push(entry);
    }

    log::debug!("Extracted {} entries ({filter:?})", entries.len());
    Ok(entries)
}

/// Decode a loose file whose key was parsed from its name.
#[must_use]
pub fn extract_loose(key: ResourceKey, bytes: Vec<u8>) -> ResourceEntry {
    decode_entry(0, key, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbpf::encode_container;
    use crate::stbl::StringEntry;
    use pretty_assertions::assert_eq;

    const TUNING: &[u8] = b"<I c=\"Buff\" i=\"buff\" n=\"buff_A\" s=\"1\"></I>";

    fn package() -> Vec<u8> {
        let stbl = StringTable {
            entries: vec![StringEntry {
                key: 1,
                value: "One".to_string(),
            }],
        }
        .to_bytes()
        .expect("stbl");

        encode_container(
            &[
                (ResourceKey::new(0x220557DA, 0, 0x0000_0000_0000_0001), stbl),
                (ResourceKey::new(0x6017E896, 0, 1), TUNING.to_vec()),
                (ResourceKey::new(0x00B2D882, 0, 2), vec![1, 2, 3]),
            ],
            true,
        )
        .expect("package")
    }

    #[test]
    fn decodes_every_entry() {
        let entries = extract(&package(), ResourceFilter::All).expect("extract");
        assert_eq!(entries.len(), 3);
        assert!(matches!(
            entries[0].typed(),
            Some(TypedValue::StringTable(table)) if table.len() == 1
        ));
        assert!(matches!(entries[1].typed(), Some(TypedValue::Tuning(_))));
        assert_eq!(entries[2].typed(), Some(&TypedValue::Binary));
        assert_eq!(entries[2].payload, vec![1, 2, 3]);
    }

    #[test]
    fn filters_keep_container_positions() {
        let tuning = extract(&package(), ResourceFilter::Tuning).expect("extract");
        assert_eq!(tuning.len(), 1);
        assert_eq!(tuning[0].id, 1);

        let rest = extract(&package(), ResourceFilter::NonTuning).expect("extract");
        assert_eq!(rest.iter().map(|e| e.id).collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn corrupt_payload_falls_back_to_raw() {
        let entry = extract_loose(ResourceKey::new(0x220557DA, 0, 0), b"garbage!".to_vec());
        assert!(entry.is_raw_fallback());
        assert_eq!(entry.payload, b"garbage!".to_vec());
        assert_eq!(entry.category(), ResourceCategory::StringTable);
    }

    #[test]
    fn unreadable_container_is_an_error() {
        assert!(extract(b"PK\x03\x04", ResourceFilter::All).is_err());
    }
}
