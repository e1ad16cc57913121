//! CLI command for printing string tables

use std::path::Path;

use anyhow::Context;

use crate::config::Settings;
use crate::formats::stbl::{StringTable, read_stbl};
use crate::package::Package;
use crate::resource::ResourceId;

fn print_table(id: Option<&ResourceId>, table: &StringTable) {
    if let Some(id) = id {
        println!("# {id} ({} strings)", table.len());
    }
    for (key, text) in table.iter() {
        println!("{key:08X}\t{text}");
    }
}

pub fn execute(path: &Path, locale: Option<&str>, settings: &Settings) -> anyhow::Result<()> {
    let is_stbl = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("stbl"));

    if is_stbl {
        let table = read_stbl(path)?;
        print_table(table.id.as_ref(), &table);
        return Ok(());
    }

    let locales = settings.locale_table();
    let wanted = match locale {
        Some(name) => Some(
            locales
                .by_locale(name)
                .with_context(|| format!("Unknown locale '{name}'"))?,
        ),
        None => None,
    };

    let mut package = Package::open(path)?;
    for id in package.search_stbl()? {
        if wanted.is_some_and(|locale| !id.is_language(locale)) {
            continue;
        }
        let Some(content) = package.content_of(&id)? else {
            continue;
        };
        print_table(Some(&id), &StringTable::from_bytes(&content)?);
    }
    package.close();

    Ok(())
}
