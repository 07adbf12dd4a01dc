//! Word (.doc) document support.
//!
//! Parsing of Microsoft Word documents in the legacy binary format, layered
//! over the compound-file reader in [`crate::ole`]:
//!
//! - `Fib`: the File Information Block at the head of the `WordDocument`
//!   stream
//! - `PieceTable`: the CP → file-offset mapping decoded from the CLX in the
//!   table stream
//! - `Document`: the facade tying container, FIB, piece table, decryption
//!   and property sets together
//!
//! # Example
//!
//! ```rust,no_run
//! use longan::Document;
//!
//! let doc = Document::open("document.doc")?;
//! println!("{}", doc.text()?);
//! # Ok::<(), longan::DocError>(())
//! ```

pub mod document;
pub mod error;
pub mod fib;
pub mod piece_table;
pub mod plc;
mod text;

pub use document::Document;
pub use error::{DocError, Result};
pub use fib::{Fib, Subdocument};
pub use piece_table::{Piece, PieceTable, PieceText};
pub use plc::Plc;
