//! CLI command for exporting string tables as XML

use std::path::Path;

use crate::formats::stbl::{StringTable, xml};
use crate::package::Package;

pub fn execute(source: &Path, output: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(output)?;

    let mut package = Package::open(source)?;
    let mut exported = 0;
    for id in package.search_stbl()? {
        let Some(content) = package.content_of(&id)? else {
            continue;
        };
        let table = StringTable::from_bytes(&content)?;
        let dest = output.join(format!("{}.xml", id.filename()));
        std::fs::write(&dest, xml::to_xml(&table)?)?;
        exported += 1;
    }
    package.close();

    println!("Exported {exported} string tables to {}", output.display());
    Ok(())
}
