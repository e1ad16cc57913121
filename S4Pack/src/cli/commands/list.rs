//! CLI command for listing package contents

use std::path::Path;

use crate::compression::CompressionMethod;
use crate::package::Package;
use crate::resource::NameFormat;

/// Format byte size for human-readable output
fn format_size(bytes: u32) -> String {
    if bytes >= 1_048_576 {
        format!("{:.1}M", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1}K", bytes as f64 / 1024.0)
    } else {
        format!("{bytes}")
    }
}

pub fn execute(source: &Path, type_id: Option<u32>, format: NameFormat) -> anyhow::Result<()> {
    let mut package = Package::open(source)?;
    let resources: Vec<_> = package
        .resources()?
        .into_iter()
        .filter(|r| type_id.is_none_or(|t| r.id.type_id == t))
        .collect();

    println!("{:>10}  {:>10}  {:<8}  NAME", "SIZE", "STORED", "CODEC");

    for resource in &resources {
        let codec = CompressionMethod::from_codec(resource.locator.compression.codec);
        println!(
            "{:>10}  {:>10}  {:<8}  {}",
            format_size(resource.size),
            format_size(resource.locator.length),
            codec.as_str(),
            format.format(&resource.id)
        );
    }

    let total: u64 = resources.iter().map(|r| u64::from(r.size)).sum();
    println!();
    println!("{} resources, {} bytes uncompressed", resources.len(), total);

    package.close();
    Ok(())
}
