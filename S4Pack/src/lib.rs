//! # S4Pack
//!
//! A pure-Rust library for The Sims 4 package files, aimed at translators.
//!
//! ## Supported Formats
//!
//! - **DBPF packages** (version 2.1) - Read, search and write resource archives
//! - **RefPack / zlib** - Decompress package entries
//! - **STBL** - Binary string tables, with XML import/export
//! - **DCT** - Translation dictionaries, including older versions
//!
//! ## Quick Start
//!
//! ### Reading String Tables
//!
//! ```no_run
//! use s4pack::prelude::*;
//!
//! let mut package = Package::open("mod.package")?;
//! for id in package.search_stbl()? {
//!     if let Some(bytes) = package.content_of(&id)? {
//!         let table = StringTable::from_bytes(&bytes)?;
//!         println!("{id}: {} strings", table.len());
//!     }
//! }
//! # Ok::<(), s4pack::Error>(())
//! ```
//!
//! ### Writing a Package
//!
//! ```no_run
//! use s4pack::prelude::*;
//!
//! let id = ResourceId::new(0x8000_0000, 0x1200_0000_0000_ABCD, TYPE_STBL);
//! let mut table = StringTable::with_id(id);
//! table.add(0x1234, "Привет");
//!
//! Package::write("translated.package", |package| {
//!     package.put(id, &table.to_bytes()?)
//! })?;
//! # Ok::<(), s4pack::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `s4pack` command-line binary

pub mod compression;
pub mod config;
pub mod cursor;
pub mod error;
pub mod formats;
pub mod package;
pub mod resource;
pub mod translation;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::error::{Error, Result};
    pub use crate::formats::dictionary::{Dictionary, DictionaryRecord};
    pub use crate::formats::stbl::{StringTable, read_stbl, write_stbl};
    pub use crate::package::{IndexLayout, Package, PackageId};
    pub use crate::resource::{
        Locale, LocaleCode, LocaleTable, NameFormat, Resource, ResourceId, TYPE_STBL,
    };
    pub use crate::translation::{TranslationEntry, build_tables, finalize, load_package};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
