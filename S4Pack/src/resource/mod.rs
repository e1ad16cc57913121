//! Resource identity and handles
//!
//! - [`ResourceId`] names a resource by (group, instance, type)
//! - [`Resource`] is a handle to one index entry of an open package
//! - [`LocaleTable`] maps locale names to the codes in string table ids

mod id;
pub mod locale;

use std::io::{Read, Seek};

pub use id::{BASE_INSTANCE_MASK, LOCALE_SHIFT, NameFormat, ResourceId, TYPE_STBL};
pub use locale::{Locale, LocaleCode, LocaleTable};

use crate::error::Result;
use crate::package::dbpf::Locator;
use crate::package::{Package, PackageId};

/// Handle to one entry of a package index
///
/// A handle does not own any data; its payload is read back through the
/// package it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resource {
    pub id: ResourceId,
    pub locator: Locator,
    /// Decompressed size in bytes
    pub size: u32,
    pub package: PackageId,
}

impl Resource {
    /// Read the payload through `package`, which must be the package this
    /// handle came from.
    pub fn content<S: Read + Seek>(&self, package: &mut Package<S>) -> Result<Vec<u8>> {
        package.content(self)
    }
}
