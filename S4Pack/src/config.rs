//! User settings (`settings.toml`)
//!
//! ```toml
//! [group]
//! original = true
//! highbit = false
//!
//! [translation]
//! source = "ENG_US"
//! destination = "RUS_RU"
//!
//! [locales]
//! path = "/path/to/languages.xml"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::resource::{LocaleTable, ResourceId};

fn default_true() -> bool {
    true
}

fn default_source() -> String {
    "ENG_US".to_string()
}

fn default_destination() -> String {
    "RUS_RU".to_string()
}

/// How resource groups are treated when ids are created or retargeted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSettings {
    /// Keep groups as found instead of normalizing the top hex digit
    #[serde(default = "default_true")]
    pub original: bool,
    /// Use `8` (rather than `0`) as the top hex digit of new groups
    #[serde(default)]
    pub highbit: bool,
}

impl Default for GroupSettings {
    fn default() -> Self {
        Self {
            original: true,
            highbit: false,
        }
    }
}

/// Translation direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationSettings {
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_destination")]
    pub destination: String,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            source: default_source(),
            destination: default_destination(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleSettings {
    /// `languages.xml` replacing the built-in locale list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// All user settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub group: GroupSettings,
    #[serde(default)]
    pub translation: TranslationSettings,
    #[serde(default)]
    pub locales: LocaleSettings,
}

impl Settings {
    /// `<config dir>/s4pack/settings.toml`
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("s4pack").join("settings.toml"))
    }

    /// Load settings from a TOML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load from [`Settings::default_path`], or defaults when there is no
    /// settings file.
    ///
    /// # Errors
    /// Returns an error if a settings file exists but cannot be parsed.
    pub fn load_or_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            Some(path) => {
                tracing::debug!("No settings at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => {
                tracing::debug!("No config directory, using default settings");
                Ok(Self::default())
            }
        }
    }

    /// Write settings as TOML, creating parent directories as needed
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// The configured `languages.xml` if it loads, the built-in table otherwise
    #[must_use]
    pub fn locale_table(&self) -> LocaleTable {
        let Some(path) = &self.locales.path else {
            return LocaleTable::builtin();
        };

        match LocaleTable::load(path) {
            Ok(table) if !table.is_empty() => table,
            Ok(_) => {
                tracing::warn!("{} lists no locales, using built-in table", path.display());
                LocaleTable::builtin()
            }
            Err(err) => {
                tracing::warn!(
                    "Cannot load locales from {}: {err}, using built-in table",
                    path.display()
                );
                LocaleTable::builtin()
            }
        }
    }

    /// [`ResourceId::from_string`] with the configured group high bit
    #[must_use]
    pub fn parse_id(&self, name: &str) -> ResourceId {
        ResourceId::from_string(name, self.group.highbit)
    }

    /// Apply the group setting to an id about to be written
    #[must_use]
    pub fn output_id(&self, id: ResourceId) -> ResourceId {
        if self.group.original {
            id
        } else {
            id.convert_group(self.group.highbit)
        }
    }
}
