//! Read-only grouping of a package's entries for display.

use crate::error::Result;
use crate::extract::{extract, Decoded, ResourceEntry, ResourceFilter, TypedValue};
use crate::stbl::locale_label;
use serde::Serialize;
use tgi_model::ResourceCategory;

const INVALID_STRING_TABLE: &str = "Not a valid string table (it may be corrupt)";
const INVALID_SIMDATA: &str = "Not a valid SimData (it may be corrupt)";
const INVALID_TUNING: &str = "Not a valid tuning file (it may be corrupt)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageIndex {
    /// Container size in bytes.
    pub size: usize,
    pub groups: Vec<IndexGroup>,
}

impl PackageIndex {
    pub fn from_container(bytes: &[u8]) -> Result<Self> {
        let entries = extract(bytes, ResourceFilter::All)?;
        Ok(Self {
            size: bytes.len(),
            groups: summarize(&entries),
        })
    }

    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.groups.iter().map(|group| group.entries.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexGroup {
    pub category: String,
    pub entries: Vec<IndexEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub id: usize,
    pub key: String,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
}

/// Group entries by category label, in order of first appearance.
#[must_use]
pub fn summarize(entries: &[ResourceEntry]) -> Vec<IndexGroup> {
    let mut groups: Vec<IndexGroup> = Vec::new();

    for entry in entries {
        let category = entry.category();
        let label = category.label();
        let item = IndexEntry {
            id: entry.id,
            key: entry.key.to_string(),
            details: details(entry, &category),
            warnings: warning(entry, &category).map(|w| vec![w.to_string()]),
        };

        match groups.iter_mut().find(|group| group.category == label) {
            Some(group) => group.entries.push(item),
            None => groups.push(IndexGroup {
                category: label,
                entries: vec![item],
            }),
        }
    }

    groups
}

fn details(entry: &ResourceEntry, category: &ResourceCategory) -> String {
    match (category, entry.typed()) {
        (ResourceCategory::StringTable, Some(TypedValue::StringTable(table))) => format!(
            "{} String Table (Strings: {})",
            locale_label(entry.key.instance),
            table.len()
        ),
        (ResourceCategory::StringTable, _) => {
            format!("{} String Table", locale_label(entry.key.instance))
        }
        (ResourceCategory::StructuredData { group }, typed) => {
            let name = match typed {
                Some(TypedValue::SimData(simdata)) => simdata.instance_name(),
                _ => None,
            };
            format!(
                "{} SimData ({})",
                group.unwrap_or("Unknown"),
                name.as_deref().unwrap_or("Unnamed")
            )
        }
        (ResourceCategory::Tuning(type_name), typed) => {
            let name = match typed {
                Some(TypedValue::Tuning(doc)) => doc.metadata.declared_name.as_deref(),
                _ => None,
            };
            let type_name = if *type_name == "Tuning" {
                "Generic"
            } else {
                type_name
            };
            format!("{type_name} Tuning ({})", name.unwrap_or("Unnamed"))
        }
        (ResourceCategory::Image(binary) | ResourceCategory::RawBinary(binary), _) => {
            binary.name().to_string()
        }
        (ResourceCategory::Unsupported(_), _) => "Unknown".to_string(),
    }
}

fn warning(entry: &ResourceEntry, category: &ResourceCategory) -> Option<&'static str> {
    if !matches!(entry.decoded, Decoded::RawFallback { .. }) {
        return None;
    }
    match category {
        ResourceCategory::StringTable => Some(INVALID_STRING_TABLE),
        ResourceCategory::StructuredData { .. } => Some(INVALID_SIMDATA),
        ResourceCategory::Tuning(_) => Some(INVALID_TUNING),
        _ => None,
    }
}
