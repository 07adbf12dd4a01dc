//! Code-page decoding for legacy Office text.
//!
//! Property sets and 8-bit text pieces are encoded with Windows code pages;
//! this module maps the numeric identifiers onto `encoding_rs` encodings and
//! decodes byte runs to UTF-8.

use encoding_rs::Encoding;

/// The code page assumed when a property set carries none: Windows-1252.
pub const DEFAULT_CODEPAGE: u16 = 1252;

/// Map a Windows code-page identifier to an `encoding_rs` encoding.
///
/// Covers the code pages that occur in `.doc` property sets; anything else
/// returns `None` and the caller falls back to Windows-1252.
pub fn codepage_to_encoding(codepage: u16) -> Option<&'static Encoding> {
    match codepage {
        874 => Some(encoding_rs::WINDOWS_874),   // Thai
        932 => Some(encoding_rs::SHIFT_JIS),     // Japanese
        936 => Some(encoding_rs::GBK),           // Simplified Chinese
        949 => Some(encoding_rs::EUC_KR),        // Korean
        950 => Some(encoding_rs::BIG5),          // Traditional Chinese
        1250 => Some(encoding_rs::WINDOWS_1250), // Central European
        1251 => Some(encoding_rs::WINDOWS_1251), // Cyrillic
        1252 => Some(encoding_rs::WINDOWS_1252), // Western European
        1253 => Some(encoding_rs::WINDOWS_1253), // Greek
        1254 => Some(encoding_rs::WINDOWS_1254), // Turkish
        1255 => Some(encoding_rs::WINDOWS_1255), // Hebrew
        1256 => Some(encoding_rs::WINDOWS_1256), // Arabic
        1257 => Some(encoding_rs::WINDOWS_1257), // Baltic
        1258 => Some(encoding_rs::WINDOWS_1258), // Vietnamese
        10000 => Some(encoding_rs::MACINTOSH),
        65001 => Some(encoding_rs::UTF_8),
        _ => None,
    }
}

/// Decode a byte run with the given code page, stripping a trailing null
/// terminator. Unknown code pages decode as Windows-1252.
pub fn decode_bytes(bytes: &[u8], codepage: u16) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let encoding = codepage_to_encoding(codepage).unwrap_or(encoding_rs::WINDOWS_1252);
    encoding.decode_without_bom_handling(&bytes[..end]).0.into_owned()
}

/// Decode a byte run as Windows-1252, keeping every byte including embedded
/// control characters. Used for 8-bit text pieces.
pub fn decode_ansi_text(bytes: &[u8]) -> String {
    encoding_rs::WINDOWS_1252
        .decode_without_bom_handling(bytes)
        .0
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ascii() {
        assert_eq!(decode_bytes(b"Hello, World!", 1252), "Hello, World!");
    }

    #[test]
    fn test_decode_stops_at_null() {
        assert_eq!(decode_bytes(b"Hello\0World", 1252), "Hello");
    }

    #[test]
    fn test_decode_windows_1252_quotes() {
        // 0x93/0x94 are curly quotes in Windows-1252
        assert_eq!(decode_bytes(b"\x93hi\x94", 1252), "\u{201C}hi\u{201D}");
    }

    #[test]
    fn test_unknown_codepage_falls_back() {
        assert_eq!(decode_bytes(b"abc", 9999), "abc");
    }

    #[test]
    fn test_decode_ansi_text_keeps_controls() {
        let text = decode_ansi_text(b"a\x07b\x0Dc\xA0");
        assert_eq!(text, "a\u{7}b\rc\u{A0}");
    }
}
