use crate::key::ResourceKey;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Type code of plain (class-less) tuning.
pub const GENERIC_TUNING_TYPE: u32 = 0x03B3_3DDF;

/// Tuning resource types, by name.
const TUNING_TYPES: &[(&str, u32)] = &[
    ("Tuning", GENERIC_TUNING_TYPE),
    ("Achievement", 0x7855_9E9E),
    ("Action", 0x0C77_2E27),
    ("Animation", 0xEE17_C6AD),
    ("Aspiration", 0x28B6_4675),
    ("AspirationCategory", 0xE350_DBD8),
    ("AspirationTrack", 0xC020_FCAD),
    ("Balloon", 0xEC6A_8FC6),
    ("Broadcaster", 0xDEBA_FB73),
    ("Buff", 0x6017_E896),
    ("Business", 0x75D8_07F3),
    ("Career", 0x7399_6BEB),
    ("CareerEvent", 0x9442_0EFF),
    ("CareerGig", 0xCCDB_1E0E),
    ("CareerLevel", 0x2C70_ADF8),
    ("CareerTrack", 0x48C7_5CE3),
    ("CasMenu", 0x93EC_3223),
    ("CasMenuItem", 0x0E31_6F6D),
    ("Interaction", 0xE882_D22F),
    ("Object", 0xB61D_E6B4),
    ("ObjectPart", 0x7147_A350),
    ("Recipe", 0xEB97_F823),
    ("Relbit", 0x0904_DF10),
    ("Reward", 0x6FA4_9828),
    ("RoleState", 0x0E4D_15FB),
    ("Situation", 0xFBC3_AEEB),
    ("SituationJob", 0x9C07_855F),
    ("Snippet", 0x7DF2_169C),
    ("Statistic", 0x339B_C5BD),
    ("Strategy", 0x6E0D_DA9F),
    ("Topic", 0x738E_6C56),
    ("Trait", 0xCB5F_DDC7),
    ("Walkby", 0x3FCD_2486),
    ("ZoneModifier", 0x3C1D_8799),
];

/// SimData groups, by the tuning they pair with.
const SIMDATA_GROUPS: &[(&str, u32)] = &[
    ("Aspiration", 0x0064_DCC4),
    ("Buff", 0x0017_E8F6),
    ("Career", 0x0011_B8F3),
    ("Trait", 0x005F_DD0C),
];

/// Classes whose engine-side id space is narrower than 64 bits.
const CLASS_BIT_WIDTHS: &[(&str, u32)] = &[
    ("Aspiration", 32),
    ("AspirationCategory", 32),
    ("AspirationTrack", 32),
    ("Career", 32),
    ("CareerLevel", 32),
    ("CareerTrack", 32),
    ("Reward", 32),
];

/// Binary resource types the workspace knows by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryType {
    SimData,
    StringTable,
    CombinedTuning,
    ObjectDefinition,
    ObjectCatalog,
    CasPart,
    Footprint,
    Light,
    Slot,
    Thumbnail,
    NameMap,
    Model,
    ModelLod,
    Geometry,
    DdsImage,
    DstImage,
    PngImage,
    Rle2Image,
    RlesImage,
}

const BINARY_TYPES: &[(BinaryType, u32, &str)] = &[
    (BinaryType::SimData, 0x545A_C67A, "SimData"),
    (BinaryType::StringTable, 0x2205_57DA, "StringTable"),
    (BinaryType::CombinedTuning, 0x62E9_4D38, "CombinedTuning"),
    (BinaryType::ObjectDefinition, 0xC0DB_5AE7, "ObjectDefinition"),
    (BinaryType::ObjectCatalog, 0x319E_4F1D, "ObjectCatalog"),
    (BinaryType::CasPart, 0x034A_EECB, "CasPart"),
    (BinaryType::Footprint, 0xD382_BF57, "Footprint"),
    (BinaryType::Light, 0x03B4_C61D, "Light"),
    (BinaryType::Slot, 0xD304_4521, "Slot"),
    (BinaryType::Thumbnail, 0x3C1A_F1F2, "Thumbnail"),
    (BinaryType::NameMap, 0x0166_038C, "NameMap"),
    (BinaryType::Model, 0x0166_1233, "Model"),
    (BinaryType::ModelLod, 0x01D1_0F34, "ModelLod"),
    (BinaryType::Geometry, 0x015A_1849, "Geometry"),
    (BinaryType::DdsImage, 0x00B2_D882, "DdsImage"),
    (BinaryType::DstImage, 0xB6C8_B6A0, "DstImage"),
    (BinaryType::PngImage, 0x2F7D_0004, "PngImage"),
    (BinaryType::Rle2Image, 0x3453_CF95, "Rle2Image"),
    (BinaryType::RlesImage, 0xBA85_6C78, "RlesImage"),
];

impl BinaryType {
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        BINARY_TYPES
            .iter()
            .find(|(_, c, _)| *c == code)
            .map(|(binary, _, _)| *binary)
    }

    #[must_use]
    pub fn code(self) -> u32 {
        self.entry().1
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        self.entry().2
    }

    #[must_use]
    pub const fn is_image(self) -> bool {
        matches!(
            self,
            Self::DdsImage | Self::DstImage | Self::PngImage | Self::Rle2Image | Self::RlesImage
        )
    }

    fn entry(self) -> &'static (BinaryType, u32, &'static str) {
        BINARY_TYPES
            .iter()
            .find(|(binary, _, _)| *binary == self)
            .unwrap_or(&BINARY_TYPES[0])
    }
}

impl fmt::Display for BinaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Category a key's type code falls into. Derived on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceCategory {
    /// SimData; `group` names the tuning the group belongs to, when known.
    StructuredData { group: Option<&'static str> },
    StringTable,
    /// Tuning, with the tuning type name.
    Tuning(&'static str),
    Image(BinaryType),
    RawBinary(BinaryType),
    Unsupported(u32),
}

impl ResourceCategory {
    /// Display label used when grouping resources for a reader.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::StructuredData { .. } => "SimData".to_string(),
            Self::StringTable => "String Tables".to_string(),
            Self::Tuning(_) => "Tuning".to_string(),
            Self::Image(binary) | Self::RawBinary(binary) => binary.name().to_string(),
            Self::Unsupported(_) => "Unknown".to_string(),
        }
    }

    #[must_use]
    pub const fn is_tuning(&self) -> bool {
        matches!(self, Self::Tuning(_))
    }
}

impl Serialize for ResourceCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

/// Classify a key by its type code (and, for SimData, its group).
/// Unknown codes are `Unsupported`, never an error.
#[must_use]
pub fn classify(key: &ResourceKey) -> ResourceCategory {
    if let Some(name) = tuning_type_name(key.type_id) {
        return ResourceCategory::Tuning(name);
    }

    match BinaryType::from_code(key.type_id) {
        Some(BinaryType::SimData) => ResourceCategory::StructuredData {
            group: simdata_group_name(key.group),
        },
        Some(BinaryType::StringTable) => ResourceCategory::StringTable,
        Some(binary) if binary.is_image() => ResourceCategory::Image(binary),
        Some(binary) => ResourceCategory::RawBinary(binary),
        None => ResourceCategory::Unsupported(key.type_id),
    }
}

#[must_use]
pub fn is_tuning_type(type_id: u32) -> bool {
    tuning_type_name(type_id).is_some()
}

#[must_use]
pub fn tuning_type_name(type_id: u32) -> Option<&'static str> {
    TUNING_TYPES
        .iter()
        .find(|(_, code)| *code == type_id)
        .map(|(name, _)| *name)
}

/// Tuning type for a class or instance-type attribute (`Buff`, `buff`,
/// `aspiration_track`). Case and underscores are ignored.
#[must_use]
pub fn tuning_type_for_class(class_name: &str) -> Option<u32> {
    let wanted = normalize_type_name(class_name);
    if wanted.is_empty() {
        return None;
    }
    TUNING_TYPES
        .iter()
        .find(|(name, _)| normalize_type_name(name) == wanted)
        .map(|(_, code)| *code)
}

#[must_use]
pub fn simdata_group_name(group: u32) -> Option<&'static str> {
    SIMDATA_GROUPS
        .iter()
        .find(|(_, code)| *code == group)
        .map(|(name, _)| *name)
}

fn normalize_type_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Built-in instance id width for a tuning class; 64 when unrestricted.
#[must_use]
pub fn bit_width_for_class(class_name: &str) -> u32 {
    CLASS_BIT_WIDTHS
        .iter()
        .find(|(name, _)| *name == class_name)
        .map_or(64, |(_, width)| *width)
}

/// Class → id width lookup, with per-project overrides layered over the
/// built-in table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitWidths {
    overrides: HashMap<String, u32>,
}

impl BitWidths {
    pub fn with_overrides(overrides: impl IntoIterator<Item = (String, u32)>) -> Self {
        Self {
            overrides: overrides
                .into_iter()
                .map(|(class, width)| (class, width.clamp(1, 64)))
                .collect(),
        }
    }

    #[must_use]
    pub fn width_for(&self, class_name: &str) -> u32 {
        self.overrides
            .get(class_name)
            .copied()
            .unwrap_or_else(|| bit_width_for_class(class_name))
    }
}
