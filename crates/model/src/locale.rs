use serde::{Deserialize, Serialize};

/// Locales a string table can be written for. The locale lives in the high
/// byte of the table's instance id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StringTableLocale {
    English,
    ChineseSimplified,
    ChineseTraditional,
    Czech,
    Danish,
    Dutch,
    Finnish,
    French,
    German,
    Italian,
    Japanese,
    Korean,
    Norwegian,
    Polish,
    PortugueseBrazil,
    Russian,
    Spanish,
    Swedish,
}

const LOCALES: &[(StringTableLocale, u8, &str)] = &[
    (StringTableLocale::English, 0x00, "English"),
    (StringTableLocale::ChineseSimplified, 0x01, "ChineseSimplified"),
    (StringTableLocale::ChineseTraditional, 0x02, "ChineseTraditional"),
    (StringTableLocale::Czech, 0x03, "Czech"),
    (StringTableLocale::Danish, 0x04, "Danish"),
    (StringTableLocale::Dutch, 0x05, "Dutch"),
    (StringTableLocale::Finnish, 0x06, "Finnish"),
    (StringTableLocale::French, 0x07, "French"),
    (StringTableLocale::German, 0x08, "German"),
    (StringTableLocale::Italian, 0x0B, "Italian"),
    (StringTableLocale::Japanese, 0x0C, "Japanese"),
    (StringTableLocale::Korean, 0x0D, "Korean"),
    (StringTableLocale::Norwegian, 0x0E, "Norwegian"),
    (StringTableLocale::Polish, 0x0F, "Polish"),
    (StringTableLocale::PortugueseBrazil, 0x11, "PortugueseBrazil"),
    (StringTableLocale::Russian, 0x12, "Russian"),
    (StringTableLocale::Spanish, 0x13, "Spanish"),
    (StringTableLocale::Swedish, 0x15, "Swedish"),
];

impl StringTableLocale {
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        LOCALES
            .iter()
            .find(|(_, c, _)| *c == code)
            .map(|(locale, _, _)| *locale)
    }

    #[must_use]
    pub fn from_instance(instance: u64) -> Option<Self> {
        Self::from_code((instance >> 56) as u8)
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        LOCALES
            .iter()
            .find(|(_, _, n)| n.eq_ignore_ascii_case(name))
            .map(|(locale, _, _)| *locale)
    }

    #[must_use]
    pub fn code(self) -> u8 {
        LOCALES
            .iter()
            .find(|(locale, _, _)| *locale == self)
            .map_or(0, |(_, code, _)| *code)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        LOCALES
            .iter()
            .find(|(locale, _, _)| *locale == self)
            .map_or("English", |(_, _, name)| name)
    }

    /// Instance id with the locale byte cleared.
    #[must_use]
    pub const fn instance_base(instance: u64) -> u64 {
        instance & 0x00FF_FFFF_FFFF_FFFF
    }

    /// Instance id for this locale on top of `base`.
    #[must_use]
    pub fn instance_for(self, base: u64) -> u64 {
        Self::instance_base(base) | (u64::from(self.code()) << 56)
    }
}
