use crate::crypto::CryptoError;
use crate::ole::OleError;
use std::io;
use thiserror::Error;

/// Error type for document parsing and extraction.
#[derive(Debug, Error)]
pub enum DocError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The input path does not exist
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Compound-file layer error
    #[error("compound file error: {0}")]
    Ole(#[from] OleError),

    /// The container is a compound file but not a Word document
    #[error("not a Word document")]
    NotWordDocument,

    /// The File Information Block is structurally invalid
    #[error("malformed FIB: {0}")]
    MalformedFib(String),

    /// The piece-table envelope is structurally invalid
    #[error("malformed CLX: {0}")]
    MalformedClx(String),

    /// A structure points beyond the end of its stream
    #[error("input truncated: {0}")]
    Truncated(String),

    /// The document is encrypted and no password was supplied
    #[error("document is encrypted but no password was provided")]
    EncryptedNoPassword,

    /// The supplied password does not match the verifier
    #[error("incorrect password")]
    BadPassword,

    /// The document uses a cipher this crate does not implement
    #[error("unsupported cipher: {0}")]
    UnsupportedCipher(String),

    /// The encryption header is structurally invalid
    #[error("malformed encryption header: {0}")]
    MalformedEncryptionHeader(String),
}

impl From<CryptoError> for DocError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::MalformedHeader(msg) => DocError::MalformedEncryptionHeader(msg),
            CryptoError::UnsupportedCipher(msg) => DocError::UnsupportedCipher(msg),
            CryptoError::BadPassword => DocError::BadPassword,
        }
    }
}

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, DocError>;
