//! RC4 legacy decryption for encrypted documents.
//!
//! The table stream of an encrypted document begins with an encryption
//! header carrying the salt and the password verifier. The document cipher
//! is RC4 re-keyed per 512-byte block: the per-block key is the MD5 of the
//! password-derived seed with the little-endian block number appended.

use super::rc4::Rc4;
use crate::ole::binary::{parse_utf16le_string, read_u16_le, read_u32_le};
use md5::{Digest, Md5};
use thiserror::Error;

/// CryptoAPI algorithm identifier for RC4.
pub const CALG_RC4: u32 = 0x6801;

/// RC4 re-keying interval for the document streams.
pub const RC4_BLOCK_LEN: usize = 0x200;

/// Byte length of the fixed-layout encryption header.
pub const ENCRYPTION_HEADER_LEN: usize = 148;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("malformed encryption header: {0}")]
    MalformedHeader(String),
    #[error("unsupported cipher: {0}")]
    UnsupportedCipher(String),
    #[error("incorrect password")]
    BadPassword,
}

/// Encryption information parsed from the head of the table stream.
#[derive(Debug, Clone)]
pub struct EncryptionHeader {
    pub major_version: u16,
    pub minor_version: u16,
    pub flags: u32,
    pub header_size: u32,
    pub provider_type: u32,
    pub alg_id: u32,
    pub alg_hash_id: u32,
    pub key_size: u32,
    pub provider_name: String,
    pub salt: [u8; 16],
    pub encrypted_verifier: [u8; 16],
    pub verifier_hash: [u8; 16],
}

impl EncryptionHeader {
    /// Parse the encryption header from the beginning of the table stream.
    pub fn parse(data: &[u8]) -> Result<Self, CryptoError> {
        if data.len() < ENCRYPTION_HEADER_LEN {
            return Err(CryptoError::MalformedHeader(format!(
                "table stream holds {} bytes, header needs {}",
                data.len(),
                ENCRYPTION_HEADER_LEN
            )));
        }
        let field = |off: usize| read_u32_le(data, off).unwrap_or(0);

        let mut salt = [0u8; 16];
        salt.copy_from_slice(&data[100..116]);
        let mut encrypted_verifier = [0u8; 16];
        encrypted_verifier.copy_from_slice(&data[116..132]);
        let mut verifier_hash = [0u8; 16];
        verifier_hash.copy_from_slice(&data[132..148]);

        Ok(EncryptionHeader {
            major_version: read_u16_le(data, 0).unwrap_or(0),
            minor_version: read_u16_le(data, 2).unwrap_or(0),
            flags: field(4),
            header_size: field(8),
            provider_type: field(12),
            alg_id: field(16),
            alg_hash_id: field(20),
            key_size: field(24),
            // 8 reserved bytes, then the provider name as a null-terminated
            // UTF-16LE string in a 64-byte field
            provider_name: parse_utf16le_string(&data[36..100]),
            salt,
            encrypted_verifier,
            verifier_hash,
        })
    }

    /// Whether the header describes RC4. Legacy producers sometimes leave
    /// the algorithm field zeroed; that also means RC4 here.
    pub fn is_rc4(&self) -> bool {
        self.alg_id == CALG_RC4 || self.alg_id == 0
    }

    /// Derive the document key for `password` and check it against the
    /// verifier. Returns the key on success.
    pub fn password_key(&self, password: &str) -> Result<Rc4LegacyKey, CryptoError> {
        if !self.is_rc4() {
            return Err(CryptoError::UnsupportedCipher(format!(
                "algorithm 0x{:04X}",
                self.alg_id
            )));
        }
        let key = Rc4LegacyKey::derive(password, &self.salt);
        if !key.verify(&self.encrypted_verifier, &self.verifier_hash) {
            return Err(CryptoError::BadPassword);
        }
        Ok(key)
    }
}

/// Password-derived key material for the per-block RC4 cipher.
///
/// Derivation: `h0 = MD5(UTF-16LE(password))`, then
/// `seed = MD5(h0[0..5] || salt)`. The key for block `b` is
/// `MD5(seed || LE32(b))`.
#[derive(Clone)]
pub struct Rc4LegacyKey {
    seed: [u8; 16],
}

impl Rc4LegacyKey {
    /// Derive key material from a password and the 16-byte document salt.
    pub fn derive(password: &str, salt: &[u8; 16]) -> Self {
        let mut utf16 = Vec::with_capacity(password.len() * 2);
        for unit in password.encode_utf16() {
            utf16.extend_from_slice(&unit.to_le_bytes());
        }
        let h0 = Md5::digest(&utf16);

        let mut material = Vec::with_capacity(5 + salt.len());
        material.extend_from_slice(&h0[..5]);
        material.extend_from_slice(salt);
        let seed = Md5::digest(&material);

        Rc4LegacyKey { seed: seed.into() }
    }

    /// A fresh cipher keyed for the given 512-byte block.
    pub fn block_cipher(&self, block: u32) -> Rc4 {
        let mut material = Vec::with_capacity(20);
        material.extend_from_slice(&self.seed);
        material.extend_from_slice(&block.to_le_bytes());
        let block_key = Md5::digest(&material);
        Rc4::new(&block_key)
    }

    /// Check the password verifier: the encrypted verifier decrypts with the
    /// block-0 key and its MD5 must equal the stored hash.
    pub fn verify(&self, encrypted_verifier: &[u8; 16], verifier_hash: &[u8; 16]) -> bool {
        let mut verifier = *encrypted_verifier;
        self.block_cipher(0).apply_keystream(&mut verifier);
        let digest = Md5::digest(verifier);
        digest.as_slice() == verifier_hash
    }

    /// XOR the keystream over `data`, which sits at `offset` within its
    /// block-numbered stream. Re-keys at every 512-byte block boundary and
    /// skips keystream up to the position within the first block.
    pub fn apply_at(&self, offset: u64, data: &mut [u8]) {
        let mut pos = 0usize;
        while pos < data.len() {
            let absolute = offset + pos as u64;
            let block = (absolute / RC4_BLOCK_LEN as u64) as u32;
            let within = (absolute % RC4_BLOCK_LEN as u64) as usize;
            let take = (RC4_BLOCK_LEN - within).min(data.len() - pos);

            let mut cipher = self.block_cipher(block);
            cipher.skip(within);
            cipher.apply_keystream(&mut data[pos..pos + take]);
            pos += take;
        }
    }
}
