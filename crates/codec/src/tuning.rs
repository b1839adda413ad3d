//! Tuning identity: reading the root declaration, inferring the key it
//! implies, and writing key overrides back as a comment.
//!
//! An override comment sits directly before the root element:
//!
//! ```text
//! <!-- Type: 6017E896, Group: 00000000, Instance: 00000000001B2F3C -->
//! <I c="Buff" i="buff" m="buffs.buff" n="creator:buff_Example" s="1781564">
//! ```
//!
//! Every field is optional. Fields present in the comment win over anything
//! derived from the root attributes.

use crate::error::{CodecError, Result};
use crate::xml::{self, StartTag};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use tgi_model::{
    derive_instance_id, format_hex, parse_hex, tuning_type_for_class, BitWidths, IdSpace,
    ResourceKey, GENERIC_TUNING_TYPE,
};

static OVERRIDE_COMMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)<!--\s*((?:(?:type|group|instance)\s*:\s*(?:0x)?[0-9a-f]+\s*,?\s*)+)-->",
    )
    .expect("valid override comment regex")
});

static OVERRIDE_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(type|group|instance)\s*:\s*((?:0x)?[0-9a-f]+)")
        .expect("valid override field regex")
});

/// Kind of root element a tuning document declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    /// `<I>`: instance tuning, ids narrowed per class.
    Instance,
    /// `<M>`: module tuning.
    Module,
    Other,
}

impl RootKind {
    fn from_tag(name: &str) -> Self {
        match name {
            "I" => Self::Instance,
            "M" => Self::Module,
            _ => Self::Other,
        }
    }
}

/// Identity attributes read from a tuning document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TuningMetadata {
    pub root: Option<RootKind>,
    /// `n`
    pub declared_name: Option<String>,
    /// `c`
    pub class_attribute: Option<String>,
    /// `i`
    pub instance_type: Option<String>,
    /// `s`
    pub declared_instance: Option<u64>,
    pub explicit_type: Option<u32>,
    pub explicit_group: Option<u32>,
    pub explicit_instance: Option<u64>,
}

/// Partial key written into an override comment. `None` fields are left
/// as they are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyOverrides {
    pub type_id: Option<u32>,
    pub group: Option<u32>,
    pub instance: Option<u64>,
}

impl KeyOverrides {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.type_id.is_none() && self.group.is_none() && self.instance.is_none()
    }

    /// Fields of `other` replace the ones in `self`.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            type_id: other.type_id.or(self.type_id),
            group: other.group.or(self.group),
            instance: other.instance.or(self.instance),
        }
    }

    /// Overrides for the fields where `declared` differs from `inferred`.
    #[must_use]
    pub fn differing(declared: &ResourceKey, inferred: &ResourceKey) -> Self {
        Self {
            type_id: (declared.type_id != inferred.type_id).then_some(declared.type_id),
            group: (declared.group != inferred.group).then_some(declared.group),
            instance: (declared.instance != inferred.instance).then_some(declared.instance),
        }
    }

    fn render(&self) -> String {
        let mut fields = Vec::with_capacity(3);
        if let Some(type_id) = self.type_id {
            fields.push(format!("Type: {}", format_hex(u64::from(type_id), 8, false)));
        }
        if let Some(group) = self.group {
            fields.push(format!("Group: {}", format_hex(u64::from(group), 8, false)));
        }
        if let Some(instance) = self.instance {
            fields.push(format!("Instance: {}", format_hex(instance, 16, false)));
        }
        format!("<!-- {} -->", fields.join(", "))
    }
}

/// Read the identity attributes of a tuning document. Text without a root
/// element yields empty metadata.
#[must_use]
pub fn infer_metadata(text: &str) -> TuningMetadata {
    let Some(root) = xml::find_root(text) else {
        return TuningMetadata::default();
    };

    let mut metadata = TuningMetadata {
        root: Some(RootKind::from_tag(&root.name)),
        ..TuningMetadata::default()
    };
    for attr in xml::attributes(text, &root) {
        match attr.name.as_str() {
            "n" => metadata.declared_name = Some(attr.value),
            "c" => metadata.class_attribute = Some(attr.value),
            "i" => metadata.instance_type = Some(attr.value),
            "s" => metadata.declared_instance = parse_instance(&attr.value),
            _ => {}
        }
    }

    if let Some((_, overrides)) = find_override(text, &root) {
        metadata.explicit_type = overrides.type_id;
        metadata.explicit_group = overrides.group;
        metadata.explicit_instance = overrides.instance;
    }
    metadata
}

/// Best available key for a tuning document.
///
/// Type: override, else the `i` attribute's tuning type, else the `c`
/// attribute's, else generic tuning. Group: override, else 0. Instance:
/// override, else the `s` attribute, else a hash of the declared name.
#[must_use]
pub fn infer_key(metadata: &TuningMetadata, widths: &BitWidths) -> ResourceKey {
    let type_id = metadata
        .explicit_type
        .or_else(|| metadata.instance_type.as_deref().and_then(tuning_type_for_class))
        .or_else(|| metadata.class_attribute.as_deref().and_then(tuning_type_for_class))
        .unwrap_or(GENERIC_TUNING_TYPE);

    let instance = metadata
        .explicit_instance
        .or(metadata.declared_instance)
        .or_else(|| {
            metadata.declared_name.as_deref().map(|name| {
                name_instance_id(
                    metadata.root.unwrap_or(RootKind::Other),
                    metadata.class_attribute.as_deref(),
                    name,
                    widths,
                )
            })
        })
        .unwrap_or(0);

    ResourceKey::new(type_id, metadata.explicit_group.unwrap_or(0), instance)
}

/// Instance id a tuning with this root and class gets for `name`.
#[must_use]
pub fn name_instance_id(root: RootKind, class: Option<&str>, name: &str, widths: &BitWidths) -> u64 {
    let space = match root {
        RootKind::Instance => IdSpace::Narrowed(class.map_or(64, |c| widths.width_for(c))),
        RootKind::Module | RootKind::Other => IdSpace::Normalized,
    };
    derive_instance_id(name, space)
}

/// Insert or update the override comment.
///
/// Returns `None` when the text has no root element to annotate. An empty
/// override returns the text unchanged.
#[must_use]
pub fn insert_override(text: &str, overrides: &KeyOverrides) -> Option<String> {
    if overrides.is_empty() {
        return Some(text.to_string());
    }
    let root = xml::find_root(text)?;

    match find_override(text, &root) {
        Some((span, existing)) => {
            let merged = existing.merge(*overrides);
            let mut out = String::with_capacity(text.len() + 16);
            out.push_str(&text[..span.start]);
            out.push_str(&merged.render());
            out.push_str(&text[span.end..]);
            Some(out)
        }
        None => {
            let mut out = String::with_capacity(text.len() + 80);
            out.push_str(&text[..root.span.start]);
            out.push_str(&overrides.render());
            out.push('\n');
            out.push_str(&text[root.span.start..]);
            Some(out)
        }
    }
}

/// Tuning text after a rename, with the id the new name hashes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamedTuning {
    pub text: String,
    pub instance: u64,
}

/// Set the root's declared name to `name` and its `s` attribute to the id the
/// name hashes to. An existing instance override is updated as well so it
/// does not pin the old id.
pub fn rename_root(text: &str, name: &str, widths: &BitWidths) -> Result<RenamedTuning> {
    let root = xml::find_root(text).ok_or_else(|| CodecError::malformed("no root element"))?;
    let class = xml::attribute(text, &root, "c");
    let instance = name_instance_id(RootKind::from_tag(&root.name), class.as_deref(), name, widths);

    let named = xml::set_attribute(text, &root, "n", name);
    let root = xml::find_root(&named).ok_or_else(|| CodecError::malformed("no root element"))?;
    let mut renamed = xml::set_attribute(&named, &root, "s", &instance.to_string());

    let pinned = xml::find_root(&renamed)
        .and_then(|root| find_override(&renamed, &root))
        .is_some_and(|(_, existing)| existing.instance.is_some());
    if pinned {
        let overrides = KeyOverrides {
            instance: Some(instance),
            ..KeyOverrides::default()
        };
        if let Some(updated) = insert_override(&renamed, &overrides) {
            renamed = updated;
        }
    }

    Ok(RenamedTuning {
        text: renamed,
        instance,
    })
}

/// A decoded tuning payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuningDocument {
    pub text: String,
    pub metadata: TuningMetadata,
}

impl TuningDocument {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8("tuning"))?;
        Self::parse(text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        if xml::find_root(text).is_none() {
            return Err(CodecError::malformed("no root element"));
        }
        Ok(Self {
            text: text.to_string(),
            metadata: infer_metadata(text),
        })
    }
}

fn parse_instance(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        parse_hex(trimmed)
    } else {
        trimmed.parse().ok()
    }
}

/// Override comment in the prolog before `root`, with its span.
fn find_override(text: &str, root: &StartTag) -> Option<(Range<usize>, KeyOverrides)> {
    let prolog = &text[..root.span.start];
    let found = OVERRIDE_COMMENT.captures_iter(prolog).last()?;
    let whole = found.get(0)?;

    let mut overrides = KeyOverrides::default();
    for field in OVERRIDE_FIELD.captures_iter(&found[1]) {
        let Some(value) = parse_hex(&field[2]) else {
            continue;
        };
        match field[1].to_ascii_lowercase().as_str() {
            "type" => overrides.type_id = u32::try_from(value).ok(),
            "group" => overrides.group = u32::try_from(value).ok(),
            "instance" => overrides.instance = Some(value),
            _ => {}
        }
    }
    Some((whole.range(), overrides))
}
