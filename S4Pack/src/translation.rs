//! Package-level translation workflows
//!
//! - [`load_package`] pairs source-language strings with existing
//!   destination-language strings
//! - [`build_tables`] groups finished translations into destination-locale
//!   string tables
//! - [`write_tables`] saves those tables as a standalone package
//! - [`finalize`] copies a package, swapping in the translated tables

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::formats::stbl::{StringTable, read_stbl};
use crate::package::Package;
use crate::resource::{LocaleCode, LocaleTable, ResourceId};

/// One translatable string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationEntry {
    /// Table the translation belongs to: the destination table when one was
    /// found, the source table otherwise
    pub id: ResourceId,
    /// Key inside the table
    pub key: u32,
    pub source: String,
    pub translation: String,
}

/// Counts from [`finalize`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FinalizeReport {
    /// Resources copied unchanged
    pub copied: usize,
    /// Destination-language tables replaced by a translated table
    pub replaced: usize,
    /// Translated tables with no counterpart, appended at the end
    pub appended: usize,
}

type Tables = IndexMap<ResourceId, StringTable>;

fn locale_code(locale: &str, locales: &LocaleTable) -> Result<LocaleCode> {
    locales
        .by_locale(locale)
        .map(|l| l.code)
        .ok_or_else(|| Error::UnknownLocale(locale.to_string()))
}

/// Read every string table of a package and pair source strings with their
/// translations.
///
/// Tables in the source language provide the strings; tables in the
/// destination language with the same instance hash (the instance without
/// its locale prefix) and key provide the translation. A package with only
/// one of the two uses it for both columns, and a package with neither uses
/// the first other language found.
/// Empty source strings are skipped. A missing file yields no entries.
///
/// # Errors
/// Returns [`Error::UnknownLocale`] if either configured locale is not in
/// `locales`, and read errors from the package.
pub fn load_package<P: AsRef<Path>>(
    path: P,
    settings: &Settings,
    locales: &LocaleTable,
) -> Result<Vec<TranslationEntry>> {
    let source_code = locale_code(&settings.translation.source, locales)?;
    let dest_code = locale_code(&settings.translation.destination, locales)?;

    let (mut from, mut to, other) = Package::read(path, |package| {
        let mut from = Tables::new();
        let mut to = Tables::new();
        let mut other = Tables::new();
        let mut other_code: Option<Option<LocaleCode>> = None;

        for id in package.search_stbl()? {
            let Some(content) = package.content_of(&id)? else {
                continue;
            };
            let mut table = StringTable::from_bytes(&content)?;
            table.id = Some(id);

            if source_code.matches(id.instance) {
                from.insert(id, table);
            } else if dest_code.matches(id.instance) {
                to.insert(id, table);
            } else {
                let code = id.language(locales).map(|l| l.code);
                if *other_code.get_or_insert(code) == code {
                    other.insert(id, table);
                }
            }
        }

        Ok((from, to, other))
    })?;

    if from.is_empty() && to.is_empty() {
        if other.is_empty() {
            return Ok(Vec::new());
        }
        tracing::info!("No source or destination tables, using another language");
        from = other;
    } else if from.is_empty() {
        from = std::mem::take(&mut to);
    }

    // (instance hash, key) -> (destination table, text)
    let translated: HashMap<(u64, u32), (ResourceId, &str)> = to
        .iter()
        .flat_map(|(id, table)| {
            let hash = dest_code.strip(id.instance);
            table.iter().map(move |(key, text)| ((hash, key), (*id, text)))
        })
        .collect();

    let mut entries = Vec::new();
    for (id, table) in &from {
        for (key, source) in table.iter().filter(|(_, source)| !source.is_empty()) {
            let (id, translation) = translated
                .get(&(source_code.strip(id.instance), key))
                .copied()
                .unwrap_or((*id, source));
            entries.push(TranslationEntry {
                id,
                key,
                source: source.to_string(),
                translation: translation.to_string(),
            });
        }
    }

    tracing::info!(
        "Loaded {} strings from {} tables ({} translated tables)",
        entries.len(),
        from.len(),
        to.len()
    );
    Ok(entries)
}

/// Entries of a single `.stbl` file, with the source text as translation.
/// The table id comes from the file name.
pub fn load_stbl<P: AsRef<Path>>(path: P, settings: &Settings) -> Result<Vec<TranslationEntry>> {
    let path = path.as_ref();
    let table = read_stbl(path)?;
    let id = table.id.unwrap_or_else(|| {
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy())
            .unwrap_or_default();
        settings.parse_id(&stem)
    });

    Ok(table
        .iter()
        .map(|(key, text)| TranslationEntry {
            id,
            key,
            source: text.to_string(),
            translation: text.to_string(),
        })
        .collect())
}

/// Group translations into string tables retargeted to `destination`.
///
/// # Errors
/// Returns [`Error::UnknownLocale`] if `destination` is not in `locales`.
pub fn build_tables(
    entries: &[TranslationEntry],
    destination: &str,
    locales: &LocaleTable,
) -> Result<Tables> {
    let code = locale_code(destination, locales)?;
    let mut tables = Tables::new();

    for entry in entries {
        let id = entry.id.with_locale_code(code);
        tables
            .entry(id)
            .or_insert_with(|| StringTable::with_id(id))
            .add(entry.key, &entry.translation);
    }

    Ok(tables)
}

/// Save tables as a new package at `path`.
pub fn write_tables<P: AsRef<Path>>(path: P, tables: &Tables) -> Result<()> {
    Package::write(path, |package| {
        for (id, table) in tables {
            package.put(*id, &table.to_bytes()?)?;
        }
        Ok(())
    })
}

/// Copy the package at `source` to `dest`, replacing its destination-language
/// string tables with the matching entries of `tables` and appending the
/// tables that matched nothing.
///
/// A table matches a resource with the same group and instance. Destination
/// tables without a replacement are copied unchanged. `source` and `dest`
/// may be the same file. A missing or non-package `source` writes nothing.
///
/// # Errors
/// Returns [`Error::UnknownLocale`] for an unknown destination locale and
/// any read or write error.
pub fn finalize<P: AsRef<Path>, Q: AsRef<Path>>(
    source: P,
    dest: Q,
    mut tables: Tables,
    settings: &Settings,
    locales: &LocaleTable,
) -> Result<FinalizeReport> {
    let source = source.as_ref();
    let dest_code = locale_code(&settings.translation.destination, locales)?;

    if !source.exists() {
        tracing::warn!("{} does not exist, nothing to finalize", source.display());
        return Ok(FinalizeReport::default());
    }

    // Read everything first so `dest` may overwrite `source`
    let mut input = Package::from_bytes(std::fs::read(source)?)?;
    let resources = input.resources()?;
    if resources.is_empty() {
        tracing::warn!("{} has no resources, nothing to finalize", source.display());
        return Ok(FinalizeReport::default());
    }

    let mut contents = Vec::with_capacity(resources.len());
    for resource in &resources {
        contents.push((resource.id, input.content(resource)?));
    }

    let mut report = FinalizeReport::default();
    Package::write(dest, |output| {
        for (id, content) in &contents {
            if id.is_stbl() && dest_code.matches(id.instance) {
                let replacement = tables
                    .keys()
                    .position(|t| t.group == id.group && t.instance == id.instance);
                if let Some((table_id, table)) =
                    replacement.and_then(|index| tables.shift_remove_index(index))
                {
                    output.put(table_id, &table.to_bytes()?)?;
                    report.replaced += 1;
                    continue;
                }
            }
            if !content.is_empty() {
                output.put(*id, content)?;
                report.copied += 1;
            }
        }

        for (id, table) in &tables {
            output.put(*id, &table.to_bytes()?)?;
            report.appended += 1;
        }
        Ok(())
    })?;

    tracing::info!(
        "Finalized package: {} copied, {} replaced, {} appended",
        report.copied,
        report.replaced,
        report.appended
    );
    Ok(report)
}
