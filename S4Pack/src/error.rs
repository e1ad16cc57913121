//! Error types for `S4Pack`

use thiserror::Error;

use crate::resource::ResourceId;

/// The error type for `S4Pack` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== Format Errors ====================
    /// Wrong magic or unsupported version in a binary container.
    #[error("not a recognized {format}: {message}")]
    FormatMismatch {
        /// The container that was expected (e.g. "DBPF package", "STBL").
        format: &'static str,
        /// What did not match.
        message: String,
    },

    /// The data is structurally broken (bad compression magic, truncated field).
    #[error("corrupt data: {message}")]
    CorruptData {
        /// Description of what is invalid.
        message: String,
    },

    // ==================== Package Errors ====================
    /// A package entry uses a compression codec this crate does not know.
    #[error("unsupported compression codec: {codec:#06X}")]
    UnsupportedCompression {
        /// The codec identifier from the index entry.
        codec: u16,
    },

    /// An entry is too large to be described by the package index.
    #[error("entry too large for package index: {length} bytes (must be smaller than 2GB)")]
    FileTooLarge {
        /// The offending length or offset.
        length: u64,
    },

    /// The requested resource is not present in the package.
    #[error("resource not found in package: {0}")]
    IdNotFound(ResourceId),

    /// The resource handle belongs to a different package.
    #[error("resource {0} does not belong to this package")]
    ForeignResource(ResourceId),

    /// The package was opened in the other mode for this operation.
    #[error("operation requires a package opened for {expected}")]
    WrongMode {
        /// "reading" or "writing".
        expected: &'static str,
    },

    /// The package has already been committed or closed.
    #[error("package is closed")]
    ClosedPackage,

    // ==================== Parsing Errors ====================
    /// XML parsing error.
    #[error("XML parse error: {0}")]
    XmlError(#[from] quick_xml::Error),

    /// XML attribute error.
    #[error("XML attribute error: {0}")]
    XmlAttrError(String),

    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// UTF-8 conversion error.
    #[error("UTF-8 conversion error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),

    /// Settings file could not be parsed.
    #[error("settings parse error: {0}")]
    TomlDeError(#[from] toml::de::Error),

    /// Settings could not be serialized.
    #[error("settings serialize error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    /// A resource name did not match any known naming convention.
    #[error("invalid resource name: {0}")]
    InvalidResourceName(String),

    /// Unknown locale name.
    #[error("unknown locale: {0}")]
    UnknownLocale(String),
}

impl Error {
    /// Shorthand for [`Error::CorruptData`].
    pub(crate) fn corrupt(message: impl Into<String>) -> Self {
        Error::CorruptData {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::FormatMismatch`].
    pub(crate) fn mismatch(format: &'static str, message: impl Into<String>) -> Self {
        Error::FormatMismatch {
            format,
            message: message.into(),
        }
    }

    /// Returns true for errors that tolerant readers degrade to "no data".
    #[must_use]
    pub fn is_format_mismatch(&self) -> bool {
        matches!(self, Error::FormatMismatch { .. })
    }
}

// Add conversion from quick_xml::events::attributes::AttrError
impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlAttrError(err.to_string())
    }
}

/// A specialized Result type for `S4Pack` operations.
pub type Result<T> = std::result::Result<T, Error>;
