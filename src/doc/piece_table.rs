//! Piece-table decoding.
//!
//! The CLX envelope in the table stream carries zero or more `Prc`
//! property-run blocks (tag `0x01`) followed by exactly one `PlcPcd` block
//! (tag `0x02`). The `PlcPcd` maps half-open CP ranges onto piece
//! descriptors: a byte offset in the `WordDocument` stream plus the piece's
//! character encoding and an encryption-bypass flag.

use super::error::{DocError, Result};
use super::plc::Plc;
use crate::ole::binary::{read_u16_le, read_u32_le};

/// Size of one piece descriptor in the `PlcPcd`.
const PCD_SIZE: usize = 8;

/// Where a piece's text lives and how it is encoded.
///
/// The on-disk FC word packs the encoding into bit 30: set means UTF-16LE
/// with the stored offset halved, clear means one-byte Windows-1252 text at
/// the stored offset. The halving happens here, in the only place that sees
/// the packed word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceText {
    /// UTF-16LE text at the given byte offset
    Unicode { offset: u32 },
    /// Windows-1252 text at the given byte offset
    Ansi { offset: u32 },
}

impl PieceText {
    /// Unpack a 32-bit FC word.
    fn from_packed(fc_packed: u32) -> PieceText {
        let offset = fc_packed & 0x3FFF_FFFF;
        if fc_packed & 0x4000_0000 != 0 {
            PieceText::Unicode { offset: offset / 2 }
        } else {
            PieceText::Ansi { offset }
        }
    }

    /// Byte offset of the text in the `WordDocument` stream.
    #[inline]
    pub fn offset(&self) -> u32 {
        match *self {
            PieceText::Unicode { offset } | PieceText::Ansi { offset } => offset,
        }
    }

    /// Bytes per character for this encoding.
    #[inline]
    pub fn bytes_per_char(&self) -> u32 {
        match self {
            PieceText::Unicode { .. } => 2,
            PieceText::Ansi { .. } => 1,
        }
    }
}

/// One piece: a contiguous run of characters at one spot in the
/// `WordDocument` stream.
#[derive(Debug, Clone)]
pub struct Piece {
    /// First CP covered by this piece
    pub start_cp: u32,
    /// One past the last CP covered by this piece
    pub end_cp: u32,
    /// Piece bypasses document encryption (`fNoEncryption`)
    pub no_encryption: bool,
    /// Location and encoding of the text
    pub text: PieceText,
}

impl Piece {
    /// Number of characters the piece covers.
    #[inline]
    pub fn char_count(&self) -> u32 {
        self.end_cp - self.start_cp
    }

    /// Number of bytes the piece occupies in the `WordDocument` stream.
    #[inline]
    pub fn byte_len(&self) -> u32 {
        self.char_count() * self.text.bytes_per_char()
    }
}

/// The ordered piece table reconstructed from the CLX.
#[derive(Debug, Clone)]
pub struct PieceTable {
    pieces: Vec<Piece>,
    total_cps: u32,
}

impl PieceTable {
    /// Scan the CLX for the `PlcPcd` block and decode it.
    pub fn parse_clx(clx: &[u8]) -> Result<PieceTable> {
        let mut offset = 0usize;

        loop {
            if offset >= clx.len() {
                return Err(DocError::MalformedClx(
                    "CLX ended without a PlcPcd block".to_string(),
                ));
            }
            match clx[offset] {
                0x01 => {
                    // Prc: u16 length, payload skipped
                    let len = read_u16_le(clx, offset + 1).map_err(|_| {
                        DocError::MalformedClx("truncated Prc header".to_string())
                    })? as usize;
                    offset += 3 + len;
                    if offset > clx.len() {
                        return Err(DocError::MalformedClx(
                            "Prc payload runs past the CLX".to_string(),
                        ));
                    }
                }
                0x02 => {
                    // PlcPcd: u32 length, then the plex payload
                    let len = read_u32_le(clx, offset + 1).map_err(|_| {
                        DocError::MalformedClx("truncated PlcPcd header".to_string())
                    })? as usize;
                    let start = offset + 5;
                    let end = start.checked_add(len).filter(|&e| e <= clx.len()).ok_or_else(
                        || {
                            DocError::MalformedClx(
                                "PlcPcd payload runs past the CLX".to_string(),
                            )
                        },
                    )?;
                    return Self::parse_plcpcd(&clx[start..end]);
                }
                tag => {
                    return Err(DocError::MalformedClx(format!(
                        "unknown CLX block tag 0x{:02X}",
                        tag
                    )));
                }
            }
        }
    }

    /// Decode the `PlcPcd` payload: n+1 CPs, then n piece descriptors.
    fn parse_plcpcd(payload: &[u8]) -> Result<PieceTable> {
        let plc = Plc::parse(payload, PCD_SIZE).ok_or_else(|| {
            DocError::MalformedClx(format!(
                "PlcPcd payload of {} bytes is not a plex of 8-byte elements",
                payload.len()
            ))
        })?;

        let mut pieces = Vec::with_capacity(plc.count());
        for i in 0..plc.count() {
            let (start_cp, end_cp) = plc
                .range(i)
                .ok_or_else(|| DocError::MalformedClx(format!("missing CP pair {}", i)))?;
            if end_cp < start_cp {
                return Err(DocError::MalformedClx(format!(
                    "decreasing CP sequence at piece {}",
                    i
                )));
            }
            let pcd = plc
                .element(i)
                .ok_or_else(|| DocError::MalformedClx(format!("missing descriptor {}", i)))?;

            // Pcd: u16 flags, u32 packed FC, u16 prm (ignored)
            let flags = read_u16_le(pcd, 0)?;
            let fc_packed = read_u32_le(pcd, 2)?;

            pieces.push(Piece {
                start_cp,
                end_cp,
                no_encryption: flags & 0x0001 != 0,
                text: PieceText::from_packed(fc_packed),
            });
        }

        let total_cps = plc.positions().last().copied().unwrap_or(0);
        Ok(PieceTable { pieces, total_cps })
    }

    /// The pieces in CP order.
    #[inline]
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// The terminal CP, equal to the document's total character count.
    #[inline]
    pub fn total_cps(&self) -> u32 {
        self.total_cps
    }
}
