//! File Information Block (FIB) parser.
//!
//! The FIB sits at offset 0 of the `WordDocument` stream: a fixed 32-byte
//! `FibBase`, then three length-prefixed sections (`fibRgW`, `fibRgLw`,
//! `fibRgFcLcb`). The decoder needs the identification word, the flag bits
//! selecting the table stream and reporting encryption, the seven
//! subdocument character counts from `fibRgLw`, and the piece-table locator
//! `(fcClx, lcbClx)` from `fibRgFcLcb`.

use super::error::{DocError, Result};
use crate::ole::binary::{read_u16_le, read_u32_le};

/// Size of the fixed FibBase structure.
const FIB_BASE_SIZE: usize = 32;

/// `nFib` values this crate knows. Anything else is parsed under the same
/// layout assumptions, with a warning.
const KNOWN_VERSIONS: [u16; 5] = [0x00C1, 0x00D9, 0x0101, 0x010C, 0x0112];

/// `(fcClx, lcbClx)` offset within `fibRgFcLcb`, identical for every known
/// version.
const CLX_POINTER_OFFSET: usize = 264;

/// Subdocuments in their fixed character-stream order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subdocument {
    Main,
    Footnote,
    Header,
    Annotation,
    Endnote,
    Textbox,
    HeaderTextbox,
}

/// Parsed File Information Block.
#[derive(Debug, Clone)]
pub struct Fib {
    n_fib: u16,
    lid: u16,
    flags1: u16,
    l_key: u32,
    /// Character counts: main, footnote, header, annotation, endnote,
    /// textbox, header textbox
    ccp: [u32; 7],
    fc_clx: u32,
    lcb_clx: u32,
}

impl Fib {
    /// Parse the FIB from the head of the `WordDocument` stream.
    pub fn parse(word_document: &[u8]) -> Result<Fib> {
        if word_document.len() < FIB_BASE_SIZE {
            return Err(DocError::MalformedFib(
                "WordDocument stream too short for FibBase".to_string(),
            ));
        }

        let w_ident = read_u16_le(word_document, 0)?;
        if w_ident != 0xA5EC {
            return Err(DocError::NotWordDocument);
        }

        let n_fib = read_u16_le(word_document, 2)?;
        let lid = read_u16_le(word_document, 6)?;
        let flags1 = read_u16_le(word_document, 10)?;
        let l_key = read_u32_le(word_document, 14)?;

        if !KNOWN_VERSIONS.contains(&n_fib) {
            log::warn!(
                "unknown nFib 0x{:04X}, proceeding with the Word 97+ layout",
                n_fib
            );
        }

        // fibRgW: u16 count of 16-bit values
        let mut offset = FIB_BASE_SIZE;
        let csw = read_u16_le(word_document, offset)
            .map_err(|_| DocError::MalformedFib("missing csw".to_string()))?
            as usize;
        offset += 2 + csw * 2;

        // fibRgLw: u16 count of 32-bit values; the character counts live at
        // fixed positions inside it (ccpText at +12 .. ccpHdrTxbx at +40)
        let cslw = read_u16_le(word_document, offset)
            .map_err(|_| DocError::MalformedFib("missing cslw".to_string()))?
            as usize;
        offset += 2;
        if cslw * 4 < 44 || offset + cslw * 4 > word_document.len() {
            return Err(DocError::MalformedFib(format!(
                "fibRgLw holds {} values",
                cslw
            )));
        }
        let rg_lw = &word_document[offset..offset + cslw * 4];
        let ccp = [
            read_u32_le(rg_lw, 12)?, // ccpText
            read_u32_le(rg_lw, 16)?, // ccpFtn
            read_u32_le(rg_lw, 20)?, // ccpHdd
            read_u32_le(rg_lw, 28)?, // ccpAtn
            read_u32_le(rg_lw, 32)?, // ccpEdn
            read_u32_le(rg_lw, 36)?, // ccpTxbx
            read_u32_le(rg_lw, 40)?, // ccpHdrTxbx
        ];
        offset += cslw * 4;

        // fibRgFcLcb: u16 count of 64-bit (fc, lcb) pairs
        let cb_rg_fc_lcb = read_u16_le(word_document, offset)
            .map_err(|_| DocError::MalformedFib("missing cbRgFcLcb".to_string()))?
            as usize;
        offset += 2;
        let blob_size = cb_rg_fc_lcb * 8;
        if offset + blob_size > word_document.len() {
            return Err(DocError::MalformedFib(format!(
                "fibRgFcLcb needs {} bytes, {} available",
                blob_size,
                word_document.len() - offset
            )));
        }
        let blob = &word_document[offset..offset + blob_size];
        if blob.len() < CLX_POINTER_OFFSET + 8 {
            return Err(DocError::MalformedFib(format!(
                "fibRgFcLcb holds {} bytes, piece-table locator needs {}",
                blob.len(),
                CLX_POINTER_OFFSET + 8
            )));
        }
        let fc_clx = read_u32_le(blob, CLX_POINTER_OFFSET)?;
        let lcb_clx = read_u32_le(blob, CLX_POINTER_OFFSET + 4)?;

        Ok(Fib {
            n_fib,
            lid,
            flags1,
            l_key,
            ccp,
            fc_clx,
            lcb_clx,
        })
    }

    /// File format version (`nFib`).
    #[inline]
    pub fn version(&self) -> u16 {
        self.n_fib
    }

    /// Human-readable name of the Word version that wrote the file.
    pub fn version_name(&self) -> &'static str {
        match self.n_fib {
            0x00C1 => "Word 97",
            0x00D9 => "Word 2000",
            0x0101 => "Word 2002/2003",
            0x010C => "Word 2007",
            0x0112 => "Word 2010",
            _ if self.n_fib >= 0x00C1 => "Word 97+",
            _ => "Unknown",
        }
    }

    /// Language ID.
    #[inline]
    pub fn language_id(&self) -> u16 {
        self.lid
    }

    /// Name of the table stream the FIB selects (`fWhichTblStm`, bit 9).
    #[inline]
    pub fn table_stream_name(&self) -> &'static str {
        if self.flags1 & 0x0200 != 0 {
            "1Table"
        } else {
            "0Table"
        }
    }

    /// `fEncrypted` (bit 8): the table stream carries an encryption header.
    #[inline]
    pub fn is_encrypted(&self) -> bool {
        self.flags1 & 0x0100 != 0
    }

    /// `fObfuscated` (bit 15): XOR obfuscation rather than RC4. Only
    /// meaningful when [`is_encrypted`](Self::is_encrypted) is true.
    #[inline]
    pub fn is_xor_obfuscated(&self) -> bool {
        self.is_encrypted() && self.flags1 & 0x8000 != 0
    }

    /// Encryption-header size (RC4) or XOR key, depending on the flags.
    #[inline]
    pub fn l_key(&self) -> u32 {
        self.l_key
    }

    /// Piece-table locator within the table stream.
    #[inline]
    pub fn clx_location(&self) -> (u32, u32) {
        (self.fc_clx, self.lcb_clx)
    }

    /// Character count of one subdocument.
    pub fn char_count(&self, subdoc: Subdocument) -> u32 {
        self.ccp[subdoc as usize]
    }

    /// Total character count over all subdocuments.
    pub fn text_char_count(&self) -> u64 {
        self.ccp.iter().map(|&c| c as u64).sum()
    }

    /// CP ranges of the non-empty subdocuments, in stream order.
    pub fn subdocument_ranges(&self) -> Vec<(Subdocument, u32, u32)> {
        const ORDER: [Subdocument; 7] = [
            Subdocument::Main,
            Subdocument::Footnote,
            Subdocument::Header,
            Subdocument::Annotation,
            Subdocument::Endnote,
            Subdocument::Textbox,
            Subdocument::HeaderTextbox,
        ];
        let mut ranges = Vec::new();
        let mut start = 0u32;
        for (i, subdoc) in ORDER.into_iter().enumerate() {
            let count = self.ccp[i];
            if count > 0 {
                ranges.push((subdoc, start, start + count));
            }
            start = start.saturating_add(count);
        }
        ranges
    }
}
