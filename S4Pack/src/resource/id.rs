//! Resource identifiers: the (group, instance, type) triple that names a
//! blob inside a package, plus its three textual forms.

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::locale::{Locale, LocaleCode, LocaleTable};
use crate::error::{Error, Result};

/// Type id of string table resources
pub const TYPE_STBL: u32 = 0x220557DA;

/// Shift of the widest (16-bit) locale prefix of a string table instance
pub const LOCALE_SHIFT: u32 = 48;

/// Instance bits below the widest locale prefix
pub const BASE_INSTANCE_MASK: u64 = (1 << LOCALE_SHIFT) - 1;

const GROUP_HIGHBIT: u32 = 0x8000_0000;

lazy_static::lazy_static! {
    static ref S4PE_RE: Regex = Regex::new(
        r"^S4_(?P<type>[0-9A-Fa-f]{1,8})_(?P<group>[0-9A-Fa-f]{1,8})_(?P<instance>[0-9A-Fa-f]{1,16})(?:%%.*)?$"
    ).expect("valid s4pe pattern");
    static ref COLON_RE: Regex = Regex::new(
        r"^(?P<group>[0-9A-Fa-f]{1,8}):(?P<instance>[0-9A-Fa-f]{1,16}):(?P<type>[0-9A-Fa-f]{1,8})$"
    ).expect("valid colon pattern");
    static ref MAXIS_RE: Regex = Regex::new(
        r"^(?P<group>[0-9A-Fa-f]{1,8})!(?P<instance>[0-9A-Fa-f]{1,16})\.(?P<type>[0-9A-Fa-f]{1,8})$"
    ).expect("valid maxis pattern");
}

/// Naming conventions for resource files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameFormat {
    /// `S4_TTTTTTTT_GGGGGGGG_IIIIIIIIIIIIIIII` (upper-case hex)
    #[default]
    S4pe,
    /// `gggggggg:iiiiiiiiiiiiiiii:tttttttt`
    Colon,
    /// `gggggggg!iiiiiiiiiiiiiiii.tttttttt`
    Maxis,
}

impl NameFormat {
    /// Parsers are tried in this order by [`ResourceId::from_string`]
    pub const ALL: [NameFormat; 3] = [NameFormat::S4pe, NameFormat::Colon, NameFormat::Maxis];

    #[must_use]
    pub fn format(self, id: &ResourceId) -> String {
        match self {
            NameFormat::S4pe => format!(
                "S4_{:08X}_{:08X}_{:016X}",
                id.type_id, id.group, id.instance
            ),
            NameFormat::Colon => format!(
                "{:08x}:{:016x}:{:08x}",
                id.group, id.instance, id.type_id
            ),
            NameFormat::Maxis => format!(
                "{:08x}!{:016x}.{:08x}",
                id.group, id.instance, id.type_id
            ),
        }
    }

    fn regex(self) -> &'static Regex {
        match self {
            NameFormat::S4pe => &S4PE_RE,
            NameFormat::Colon => &COLON_RE,
            NameFormat::Maxis => &MAXIS_RE,
        }
    }

    /// Parse `text` with this convention only.
    #[must_use]
    pub fn parse(self, text: &str) -> Option<ResourceId> {
        let caps = self.regex().captures(text)?;
        // The patterns bound the digit counts, so these cannot overflow
        let group = u32::from_str_radix(&caps["group"], 16).ok()?;
        let instance = u64::from_str_radix(&caps["instance"], 16).ok()?;
        let type_id = u32::from_str_radix(&caps["type"], 16).ok()?;
        Some(ResourceId::new(group, instance, type_id))
    }
}

impl FromStr for NameFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "s4pe" | "s4" => Ok(NameFormat::S4pe),
            "colon" => Ok(NameFormat::Colon),
            "maxis" => Ok(NameFormat::Maxis),
            _ => Err(format!(
                "Invalid name format '{s}'. Valid values: s4pe, colon, maxis"
            )),
        }
    }
}

/// Identifies one resource inside a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId {
    pub group: u32,
    pub instance: u64,
    #[serde(rename = "type")]
    pub type_id: u32,
}

impl ResourceId {
    #[must_use]
    pub const fn new(group: u32, instance: u64, type_id: u32) -> Self {
        Self {
            group,
            instance,
            type_id,
        }
    }

    /// Placeholder returned by [`ResourceId::from_string`] for names that
    /// match no convention.
    #[must_use]
    pub const fn sentinel(highbit: bool) -> Self {
        Self::new(if highbit { GROUP_HIGHBIT } else { 0 }, 0, TYPE_STBL)
    }

    /// True for either form of [`ResourceId::sentinel`]
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        *self == Self::sentinel(true) || *self == Self::sentinel(false)
    }

    /// Parse a resource name in any known convention, falling back to
    /// [`ResourceId::sentinel`] when none matches.
    #[must_use]
    pub fn from_string(text: &str, highbit: bool) -> Self {
        NameFormat::ALL
            .iter()
            .find_map(|format| format.parse(text))
            .unwrap_or_else(|| {
                tracing::debug!("'{text}' is not a resource name, using placeholder id");
                Self::sentinel(highbit)
            })
    }

    /// Name in the default (`S4pe`) convention
    #[must_use]
    pub fn filename(&self) -> String {
        NameFormat::S4pe.format(self)
    }

    #[must_use]
    pub fn str_group(&self) -> String {
        format!("{:08x}", self.group)
    }

    #[must_use]
    pub fn str_instance(&self) -> String {
        format!("{:016x}", self.instance)
    }

    #[must_use]
    pub fn hex_instance(&self) -> String {
        format!("0x{:016X}", self.instance)
    }

    #[must_use]
    pub fn is_stbl(&self) -> bool {
        self.type_id == TYPE_STBL
    }

    /// Raw top 16 bits of a string table instance (`None` for other types).
    /// Use [`ResourceId::language`] to resolve it; the game's own codes only
    /// occupy the top byte.
    #[must_use]
    pub fn language_code(&self) -> Option<u16> {
        self.is_stbl()
            .then(|| (self.instance >> LOCALE_SHIFT) as u16)
    }

    /// Locale of a string table, if its prefix is in `locales`
    #[must_use]
    pub fn language<'t>(&self, locales: &'t LocaleTable) -> Option<&'t Locale> {
        if !self.is_stbl() {
            return None;
        }
        locales.by_instance(self.instance)
    }

    /// True for a string table in `locale`
    #[must_use]
    pub fn is_language(&self, locale: &Locale) -> bool {
        self.is_stbl() && locale.code.matches(self.instance)
    }

    /// Low 48 bits of the instance, below any locale prefix. For a
    /// locale-exact key use [`LocaleCode::strip`].
    #[must_use]
    pub fn base_instance(&self) -> u64 {
        self.instance & BASE_INSTANCE_MASK
    }

    /// Same id with the top hex digit of the group set to `8` or `0`
    #[must_use]
    pub fn convert_group(&self, highbit: bool) -> Self {
        let group = (self.group & 0x0FFF_FFFF) | if highbit { GROUP_HIGHBIT } else { 0 };
        Self { group, ..*self }
    }

    /// Same id with the locale prefix replaced by `code`. A byte code keeps
    /// the 56-bit hash below it.
    #[must_use]
    pub fn with_locale_code(&self, code: LocaleCode) -> Self {
        Self {
            instance: code.apply(self.instance),
            ..*self
        }
    }

    /// Retarget this id to `locale`. `None` if the locale is unknown.
    #[must_use]
    pub fn convert_instance(&self, locale: &str, locales: &LocaleTable) -> Option<Self> {
        locales
            .by_locale(locale)
            .map(|lang| self.with_locale_code(lang.code))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.filename())
    }
}

impl FromStr for ResourceId {
    type Err = Error;

    /// Strict parse: unlike [`ResourceId::from_string`] there is no fallback.
    fn from_str(s: &str) -> Result<Self> {
        NameFormat::ALL
            .iter()
            .find_map(|format| format.parse(s))
            .ok_or_else(|| Error::InvalidResourceName(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_formats() {
        let id = ResourceId::new(0x8000_0001, 0x0012_3456_789A_BCDE, TYPE_STBL);
        assert_eq!(id.to_string(), "S4_220557DA_80000001_00123456789ABCDE");
        assert_eq!(
            NameFormat::Colon.format(&id),
            "80000001:00123456789abcde:220557da"
        );
        assert_eq!(
            NameFormat::Maxis.format(&id),
            "80000001!00123456789abcde.220557da"
        );
    }

    #[test]
    fn test_s4pe_suffix_allowed() {
        let id = ResourceId::from_string("S4_220557DA_00000000_0012345678ABCDEF%%+STBL", false);
        assert_eq!(id, ResourceId::new(0, 0x0012_3456_78AB_CDEF, TYPE_STBL));
    }

    #[test]
    fn test_short_fields_parse() {
        let id: ResourceId = "1:2:3".parse().unwrap();
        assert_eq!(id, ResourceId::new(1, 2, 3));
    }

    #[test]
    fn test_fallback_sentinel() {
        assert_eq!(
            ResourceId::from_string("my_strings", false),
            ResourceId::new(0, 0, TYPE_STBL)
        );
        let high = ResourceId::from_string("my_strings", true);
        assert_eq!(high, ResourceId::new(0x8000_0000, 0, TYPE_STBL));
        assert!(high.is_sentinel());
        assert!("my_strings".parse::<ResourceId>().is_err());
    }

    #[test]
    fn test_too_many_digits_rejected() {
        assert!("123456789:0:0".parse::<ResourceId>().is_err());
        assert!("0!0.0x".parse::<ResourceId>().is_err());
    }

    #[test]
    fn test_convert_group() {
        let id = ResourceId::new(0x1234_5678, 1, 2);
        assert_eq!(id.convert_group(true).group, 0x8234_5678);
        assert_eq!(id.convert_group(true).convert_group(false).group, 0x0234_5678);
    }

    #[test]
    fn test_convert_instance() {
        let locales = LocaleTable::builtin();
        let id = ResourceId::new(0, 0x00A1_2345_6789_ABCD, TYPE_STBL);
        let rus = id.convert_instance("RUS_RU", &locales).unwrap();
        assert_eq!(rus.instance, 0x12A1_2345_6789_ABCD);
        assert_eq!(rus.language_code(), Some(0x12A1));
        assert_eq!(rus.base_instance(), id.base_instance());
        assert!(rus.is_language(locales.by_locale("RUS_RU").unwrap()));
        assert!(!rus.is_language(locales.by_locale("ENG_US").unwrap()));
        assert_eq!(rus.language(&locales).unwrap().locale, "RUS_RU");
        assert!(id.convert_instance("XXX_YY", &locales).is_none());
    }

    #[test]
    fn test_language_only_for_stbl() {
        let locales = LocaleTable::builtin();
        let other = ResourceId::new(0, 0, 0x0333_406C);
        assert_eq!(other.language_code(), None);
        assert!(other.language(&locales).is_none());
        let eng = ResourceId::new(0, 0x00C4_1111_2222_3333, TYPE_STBL);
        assert_eq!(eng.language(&locales).unwrap().locale, "ENG_US");
        let unknown = ResourceId::new(0, 0x7F00_0000_0000_0001, TYPE_STBL);
        assert!(unknown.language(&locales).is_none());
    }

    #[test]
    fn test_wide_locale_code() {
        let locales = LocaleTable::from_xml(
            r#"<languages>
                <language locale="ENG_US" code="0x0123" />
                <language locale="RUS_RU" code="0x1234" />
            </languages>"#,
        )
        .unwrap();
        let eng = ResourceId::new(0, 0x0123_4567_89AB_CDEF, TYPE_STBL);
        assert_eq!(eng.language(&locales).unwrap().locale, "ENG_US");

        let rus = eng.convert_instance("RUS_RU", &locales).unwrap();
        assert_eq!(rus.language_code(), Some(0x1234));
        assert_eq!(rus.base_instance(), eng.base_instance());
    }

    #[quickcheck]
    fn prop_text_roundtrip(group: u32, instance: u64, type_id: u32) -> bool {
        let id = ResourceId::new(group, instance, type_id);
        NameFormat::ALL
            .iter()
            .all(|format| format.parse(&format.format(&id)) == Some(id))
    }
}
