//! CLI command for re-keying a package's strings to another locale

use std::path::Path;

use crate::config::Settings;
use crate::translation::{build_tables, load_package, write_tables};

pub fn execute(source: &Path, output: &Path, settings: &Settings) -> anyhow::Result<()> {
    let locales = settings.locale_table();

    let mut entries = load_package(source, settings, &locales)?;
    if entries.is_empty() {
        anyhow::bail!("No strings found in {}", source.display());
    }
    for entry in &mut entries {
        entry.id = settings.output_id(entry.id);
    }

    let tables = build_tables(&entries, &settings.translation.destination, &locales)?;
    write_tables(output, &tables)?;

    println!(
        "Wrote {} strings in {} tables to {}",
        entries.len(),
        tables.len(),
        output.display()
    );
    Ok(())
}
