//! Locale table: maps locale names (`ENG_US`) to the codes stored in the
//! top of a string table's instance id, and back.
//!
//! The game's own codes are one byte wide: `0x12` names the top byte of the
//! instance and the 56 bits below it are the table hash. A `languages.xml`
//! may also give three- or four-digit codes, which cover the top 16 bits.

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};

use super::id::{BASE_INSTANCE_MASK, LOCALE_SHIFT};
use crate::error::{Error, Result};

const BYTE_SHIFT: u32 = 56;
const BYTE_MASK: u64 = (1 << BYTE_SHIFT) - 1;

/// Locale prefix of a string table instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocaleCode {
    /// Top 8 bits (the game's codes)
    Byte(u8),
    /// Top 16 bits
    Wide(u16),
}

impl LocaleCode {
    /// Parse a hex code such as `0x12` (byte) or `0x1200` (wide)
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let digits = value
            .trim()
            .trim_start_matches("0x")
            .trim_start_matches("0X");
        match digits.len() {
            1 | 2 => u8::from_str_radix(digits, 16).ok().map(LocaleCode::Byte),
            3 | 4 => u16::from_str_radix(digits, 16).ok().map(LocaleCode::Wide),
            _ => None,
        }
    }

    /// True if `instance` carries this code
    #[must_use]
    pub fn matches(self, instance: u64) -> bool {
        match self {
            LocaleCode::Byte(code) => (instance >> BYTE_SHIFT) as u8 == code,
            LocaleCode::Wide(code) => (instance >> LOCALE_SHIFT) as u16 == code,
        }
    }

    /// The part of `instance` this code does not cover
    #[must_use]
    pub fn strip(self, instance: u64) -> u64 {
        match self {
            LocaleCode::Byte(_) => instance & BYTE_MASK,
            LocaleCode::Wide(_) => instance & BASE_INSTANCE_MASK,
        }
    }

    /// `instance` with its prefix replaced by this code
    #[must_use]
    pub fn apply(self, instance: u64) -> u64 {
        match self {
            LocaleCode::Byte(code) => (u64::from(code) << BYTE_SHIFT) | self.strip(instance),
            LocaleCode::Wide(code) => (u64::from(code) << LOCALE_SHIFT) | self.strip(instance),
        }
    }
}

impl std::fmt::Display for LocaleCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocaleCode::Byte(code) => write!(f, "0x{code:02X}"),
            LocaleCode::Wide(code) => write!(f, "0x{code:04X}"),
        }
    }
}

/// A single game locale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locale {
    /// Upper-case locale name, e.g. `RUS_RU`
    pub locale: String,
    /// Prefix carried by string table instances in this locale
    pub code: LocaleCode,
    /// Language code for Google Translate, when known
    pub google: Option<String>,
    /// Language code for `DeepL`, when known
    pub deepl: Option<String>,
}

/// Locales the game ships with, as (name, code byte, google, deepl).
const BUILTIN: &[(&str, u8, &str, &str)] = &[
    ("ENG_US", 0x00, "en", "EN"),
    ("CHT_CN", 0x01, "zh-TW", ""),
    ("CHS_CN", 0x02, "zh-CN", "ZH"),
    ("CZE_CZ", 0x03, "cs", "CS"),
    ("DAN_DK", 0x04, "da", "DA"),
    ("DUT_NL", 0x05, "nl", "NL"),
    ("FIN_FI", 0x06, "fi", "FI"),
    ("FRE_FR", 0x07, "fr", "FR"),
    ("GER_DE", 0x08, "de", "DE"),
    ("ITA_IT", 0x0B, "it", "IT"),
    ("JPN_JP", 0x0C, "ja", "JA"),
    ("KOR_KR", 0x0D, "ko", "KO"),
    ("NOR_NO", 0x0E, "no", "NB"),
    ("POL_PL", 0x0F, "pl", "PL"),
    ("POR_BR", 0x11, "pt", "PT-BR"),
    ("RUS_RU", 0x12, "ru", "RU"),
    ("SPA_ES", 0x13, "es", "ES"),
    ("SPA_MX", 0x14, "es", "ES"),
    ("SWE_SE", 0x15, "sv", "SV"),
];

/// Lookup table between locale names and instance codes
#[derive(Debug, Clone, Default)]
pub struct LocaleTable {
    locales: IndexMap<String, Locale>,
    codes: HashMap<LocaleCode, String>,
}

impl LocaleTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The locales shipped with the game
    #[must_use]
    pub fn builtin() -> Self {
        let mut table = Self::new();
        for &(locale, byte, google, deepl) in BUILTIN {
            table.insert(Locale {
                locale: locale.to_string(),
                code: LocaleCode::Byte(byte),
                google: Some(google.to_string()),
                deepl: (!deepl.is_empty()).then(|| deepl.to_string()),
            });
        }
        table
    }

    /// Add or replace a locale. Names are stored upper-case.
    pub fn insert(&mut self, mut locale: Locale) {
        locale.locale = locale.locale.to_uppercase();
        if let Some(previous) = self.locales.get(&locale.locale) {
            self.codes.remove(&previous.code);
        }
        self.codes.insert(locale.code, locale.locale.clone());
        self.locales.insert(locale.locale.clone(), locale);
    }

    /// Look up a locale by name (case-insensitive)
    #[must_use]
    pub fn by_locale(&self, locale: &str) -> Option<&Locale> {
        self.locales.get(&locale.to_uppercase())
    }

    /// Look up a locale by its code
    #[must_use]
    pub fn by_code(&self, code: LocaleCode) -> Option<&Locale> {
        self.codes.get(&code).and_then(|name| self.locales.get(name))
    }

    /// Locale whose code prefixes `instance`. A wide code wins over a byte
    /// code with the same top byte.
    #[must_use]
    pub fn by_instance(&self, instance: u64) -> Option<&Locale> {
        self.by_code(LocaleCode::Wide((instance >> LOCALE_SHIFT) as u16))
            .or_else(|| self.by_code(LocaleCode::Byte((instance >> BYTE_SHIFT) as u8)))
    }

    /// Locale names in insertion order
    #[must_use]
    pub fn locales(&self) -> Vec<&str> {
        self.locales.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locales.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locales.is_empty()
    }

    /// Load a `languages.xml` file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid XML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_xml(&content)
    }

    /// Parse `<languages><language locale=".." code="0x.." .../></languages>`.
    ///
    /// Entries without a locale or a parseable code are skipped.
    ///
    /// # Errors
    /// Returns an error if the XML is malformed.
    pub fn from_xml(content: &str) -> Result<Self> {
        let mut reader = Reader::from_str(content);
        reader.trim_text(true);

        let mut table = Self::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e) | Event::Empty(e)) if e.name().as_ref() == b"language" => {
                    match parse_language(&e)? {
                        Some(locale) => table.insert(locale),
                        None => tracing::debug!("Skipping incomplete <language> entry"),
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(Error::XmlError(e)),
            }
            buf.clear();
        }

        Ok(table)
    }
}

fn parse_language(element: &BytesStart) -> Result<Option<Locale>> {
    let mut locale = None;
    let mut code = None;
    let mut google = None;
    let mut deepl = None;

    for attr in element.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?.into_owned();
        match attr.key.as_ref() {
            b"locale" => locale = Some(value),
            b"code" => code = LocaleCode::parse(&value),
            b"google-code" => google = Some(value),
            b"deepl-code" => deepl = Some(value),
            _ => {}
        }
    }

    Ok(match (locale, code) {
        (Some(locale), Some(code)) if !locale.is_empty() => Some(Locale {
            locale,
            code,
            google,
            deepl,
        }),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let table = LocaleTable::builtin();
        let rus = table.by_locale("rus_ru").unwrap();
        assert_eq!(rus.code, LocaleCode::Byte(0x12));
        assert_eq!(table.by_code(LocaleCode::Byte(0)).unwrap().locale, "ENG_US");
        assert!(table.by_code(LocaleCode::Wide(0x1200)).is_none());
        assert_eq!(
            table.by_instance(0x12A1_2345_6789_ABCD).unwrap().locale,
            "RUS_RU"
        );
        assert_eq!(
            table.by_instance(0x00FF_FFFF_FFFF_FFFF).unwrap().locale,
            "ENG_US"
        );
        assert!(table.by_instance(0x7F00_0000_0000_0000).is_none());
    }

    #[test]
    fn test_from_xml() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<languages>
    <language locale="eng_us" code="0x00" google-code="en" deepl-code="EN" />
    <language locale="RUS_RU" code="0x1234" google-code="ru" />
    <language code="0x05" />
    <language locale="BAD_XX" code="zz" />
</languages>"#;
        let table = LocaleTable::from_xml(xml).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.by_locale("ENG_US").unwrap().deepl.as_deref(), Some("EN"));
        assert_eq!(table.by_code(LocaleCode::Wide(0x1234)).unwrap().locale, "RUS_RU");
        assert_eq!(table.by_code(LocaleCode::Byte(0)).unwrap().locale, "ENG_US");
        assert_eq!(table.by_locale("RUS_RU").unwrap().deepl, None);
    }

    #[test]
    fn test_reinsert_replaces_code() {
        let mut table = LocaleTable::new();
        table.insert(Locale {
            locale: "ENG_US".into(),
            code: LocaleCode::Byte(1),
            google: None,
            deepl: None,
        });
        table.insert(Locale {
            locale: "ENG_US".into(),
            code: LocaleCode::Byte(2),
            google: None,
            deepl: None,
        });
        assert!(table.by_code(LocaleCode::Byte(1)).is_none());
        assert_eq!(table.by_code(LocaleCode::Byte(2)).unwrap().locale, "ENG_US");
    }

    #[test]
    fn test_code_width() {
        assert_eq!(LocaleCode::parse("0x12"), Some(LocaleCode::Byte(0x12)));
        assert_eq!(LocaleCode::parse("5"), Some(LocaleCode::Byte(5)));
        assert_eq!(LocaleCode::parse("0x0123"), Some(LocaleCode::Wide(0x0123)));
        assert_eq!(LocaleCode::parse("0x12345"), None);
        assert_eq!(LocaleCode::parse("0x"), None);

        // Byte codes keep the 56-bit hash, wide codes the low 48 bits
        let instance = 0x00A1_2345_6789_ABCD;
        assert_eq!(LocaleCode::Byte(0x12).apply(instance), 0x12A1_2345_6789_ABCD);
        assert_eq!(LocaleCode::Wide(0x1234).apply(instance), 0x1234_2345_6789_ABCD);
        assert!(LocaleCode::Byte(0x00).matches(instance));
        assert!(!LocaleCode::Wide(0x0000).matches(instance));
        assert!(LocaleCode::Wide(0x00A1).matches(instance));
        assert_eq!(LocaleCode::Byte(0x12).to_string(), "0x12");
    }
}
