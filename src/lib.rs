//! Longan - a reader for legacy Microsoft Word binary documents (.doc)
//!
//! This library parses Word 97-2003 documents: the OLE2 compound-file
//! container, the File Information Block, the piece table that maps
//! character positions onto file offsets, the summary-information property
//! sets, and the RC4 legacy encryption used by password-protected files.
//!
//! # Features
//!
//! - **Compound-file reader**: FAT/DIFAT/mini-FAT traversal and named
//!   stream extraction, safe on adversarial input
//! - **Text extraction**: piece-table decoding with per-piece Unicode and
//!   Windows-1252 runs, in character-position order
//! - **Metadata extraction**: typed property sets from
//!   `\x05SummaryInformation` and `\x05DocumentSummaryInformation`
//! - **Encrypted documents**: RC4 with per-512-byte-block re-keying and
//!   password verification
//!
//! # Example - extracting text
//!
//! ```no_run
//! use longan::Document;
//!
//! # fn main() -> Result<(), longan::DocError> {
//! let doc = Document::open("document.doc")?;
//! println!("{}", doc.text()?);
//!
//! let meta = doc.metadata();
//! println!("title:  {:?}", meta.title);
//! println!("author: {:?}", meta.author);
//! # Ok(())
//! # }
//! ```
//!
//! # Example - an encrypted document
//!
//! ```no_run
//! use longan::Document;
//!
//! # fn main() -> Result<(), longan::DocError> {
//! let doc = Document::open_with_password("locked.doc", "secret")?;
//! assert!(doc.is_encrypted());
//! println!("{}", doc.text()?);
//! # Ok(())
//! # }
//! ```
//!
//! # Example - low-level compound-file access
//!
//! ```no_run
//! use std::fs::File;
//! use longan::ole::OleFile;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = File::open("document.doc")?;
//! let mut ole = OleFile::open(file)?;
//! for name in ole.list_streams() {
//!     println!("stream: {:?}", name);
//! }
//! let data = ole.open_stream("WordDocument")?;
//! println!("{} bytes", data.len());
//! # Ok(())
//! # }
//! ```

/// Compound-file (OLE2) container parsing and property sets
pub mod ole;

/// Word document parsing: FIB, piece table, text, facade
pub mod doc;

/// RC4 legacy decryption primitives
pub mod crypto;

// Re-export the facade types for convenience
pub use doc::{DocError, Document};
pub use ole::Metadata;
