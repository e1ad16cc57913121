//! CLI command for inspecting dictionaries

use std::path::Path;

use crate::formats::dictionary::Dictionary;

pub fn execute(path: &Path, query: Option<&str>) -> anyhow::Result<()> {
    let dictionary = Dictionary::load(path)?;
    let query = query.map(str::to_lowercase);

    let mut shown = 0;
    for record in &dictionary.records {
        if let Some(query) = &query {
            if !record.source.to_lowercase().contains(query.as_str()) {
                continue;
            }
        }
        println!("{:08X}\t{}\t{}", record.id, record.source, record.translation);
        if !record.comment.is_empty() {
            println!("\t# {}", record.comment);
        }
        shown += 1;
    }

    println!();
    println!(
        "{shown} of {} records in '{}'",
        dictionary.records.len(),
        dictionary.name
    );
    Ok(())
}
