//! Resource payload formats
//!
//! - [`stbl`] string tables, plus their XML form
//! - [`dictionary`] translator dictionaries

pub mod dictionary;
pub mod stbl;

pub use dictionary::{Dictionary, DictionaryRecord, read_dictionary, write_dictionary};
pub use stbl::{StringTable, normalize_text, parse_stbl_bytes, read_stbl, write_stbl};
