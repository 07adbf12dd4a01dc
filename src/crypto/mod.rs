/// RC4 stream cipher
mod rc4;

/// Legacy document encryption: header, key derivation, per-block keying
mod legacy;

pub use legacy::{
    CryptoError, EncryptionHeader, Rc4LegacyKey, CALG_RC4, ENCRYPTION_HEADER_LEN, RC4_BLOCK_LEN,
};
pub use rc4::Rc4;
