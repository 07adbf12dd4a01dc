/// Constants for the compound-file format and property sets
pub mod consts;

/// Bounds-checked little-endian field reads
pub mod binary;

/// Windows code-page decoding
pub mod codepage;

/// Compound-file (OLE2/CFB) reader
mod file;

/// Property-set parsing for the summary-information streams
mod metadata;

// Re-export public types for convenient access
pub use file::{is_cfb_file, DirectoryEntry, OleError, OleFile};
pub use metadata::{metadata_from_streams, parse_property_stream, Metadata, PropertyValue};
