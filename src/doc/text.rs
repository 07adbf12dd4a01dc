//! Text materialization.
//!
//! Pieces are read from the `WordDocument` stream in CP order, decrypted
//! when the document cipher applies, and decoded per the piece's encoding.
//! Control characters (paragraph marks, cell terminators, field delimiters)
//! are preserved verbatim; separating the body from the trailing
//! subdocuments is the caller's concern.

use super::error::{DocError, Result};
use super::piece_table::{PieceTable, PieceText};
use crate::crypto::Rc4LegacyKey;
use crate::ole::binary::decode_utf16le;
use crate::ole::codepage::decode_ansi_text;

/// Concatenate the text of every piece, in CP order.
///
/// `decryptor`, when present, is applied to each piece that does not carry
/// `fNoEncryption`; block numbering follows the `WordDocument` stream from
/// its first byte.
pub(crate) fn materialize(
    table: &PieceTable,
    word_document: &[u8],
    decryptor: Option<&Rc4LegacyKey>,
) -> Result<String> {
    let mut text = String::with_capacity(table.total_cps() as usize);

    for (index, piece) in table.pieces().iter().enumerate() {
        if piece.char_count() == 0 {
            continue;
        }

        let start = piece.text.offset() as usize;
        let end = start + piece.byte_len() as usize;
        if end > word_document.len() {
            return Err(DocError::Truncated(format!(
                "piece {} needs bytes {}..{} of a {}-byte WordDocument stream",
                index,
                start,
                end,
                word_document.len()
            )));
        }

        let mut bytes = word_document[start..end].to_vec();
        if let Some(key) = decryptor {
            if !piece.no_encryption {
                key.apply_at(start as u64, &mut bytes);
            }
        }

        match piece.text {
            PieceText::Unicode { .. } => text.push_str(&decode_utf16le(&bytes)),
            PieceText::Ansi { .. } => text.push_str(&decode_ansi_text(&bytes)),
        }
    }

    Ok(text)
}

/// Cut `text` after `count` UTF-16 code units. CPs count code units, so a
/// supplementary-plane character spends two.
pub(crate) fn take_code_units(text: &str, count: u32) -> String {
    let mut taken = 0u32;
    let mut out = String::new();
    for ch in text.chars() {
        let units = ch.len_utf16() as u32;
        if taken + units > count {
            break;
        }
        taken += units;
        out.push(ch);
    }
    out
}
