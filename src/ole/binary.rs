use super::OleError;
use zerocopy::{FromBytes, LE, I16, I32, U16, U32, U64};

/// Read a little-endian u16 from a byte slice at the given offset.
#[inline]
pub fn read_u16_le(data: &[u8], offset: usize) -> Result<u16, OleError> {
    if offset + 2 > data.len() {
        return Err(OleError::Truncated("not enough data for u16".to_string()));
    }
    U16::<LE>::read_from_bytes(&data[offset..offset + 2])
        .map(|v| v.get())
        .map_err(|_| OleError::Truncated("failed to read u16".to_string()))
}

/// Read a little-endian i16 from a byte slice at the given offset.
#[inline]
pub fn read_i16_le(data: &[u8], offset: usize) -> Result<i16, OleError> {
    if offset + 2 > data.len() {
        return Err(OleError::Truncated("not enough data for i16".to_string()));
    }
    I16::<LE>::read_from_bytes(&data[offset..offset + 2])
        .map(|v| v.get())
        .map_err(|_| OleError::Truncated("failed to read i16".to_string()))
}

/// Read a little-endian u32 from a byte slice at the given offset.
#[inline]
pub fn read_u32_le(data: &[u8], offset: usize) -> Result<u32, OleError> {
    if offset + 4 > data.len() {
        return Err(OleError::Truncated("not enough data for u32".to_string()));
    }
    U32::<LE>::read_from_bytes(&data[offset..offset + 4])
        .map(|v| v.get())
        .map_err(|_| OleError::Truncated("failed to read u32".to_string()))
}

/// Read a little-endian i32 from a byte slice at the given offset.
#[inline]
pub fn read_i32_le(data: &[u8], offset: usize) -> Result<i32, OleError> {
    if offset + 4 > data.len() {
        return Err(OleError::Truncated("not enough data for i32".to_string()));
    }
    I32::<LE>::read_from_bytes(&data[offset..offset + 4])
        .map(|v| v.get())
        .map_err(|_| OleError::Truncated("failed to read i32".to_string()))
}

/// Read a little-endian i64 from a byte slice at the given offset.
#[inline]
pub fn read_i64_le(data: &[u8], offset: usize) -> Result<i64, OleError> {
    if offset + 8 > data.len() {
        return Err(OleError::Truncated("not enough data for i64".to_string()));
    }
    zerocopy::I64::<LE>::read_from_bytes(&data[offset..offset + 8])
        .map(|v| v.get())
        .map_err(|_| OleError::Truncated("failed to read i64".to_string()))
}

/// Read a little-endian u64 from a byte slice at the given offset.
#[inline]
pub fn read_u64_le(data: &[u8], offset: usize) -> Result<u64, OleError> {
    if offset + 8 > data.len() {
        return Err(OleError::Truncated("not enough data for u64".to_string()));
    }
    U64::<LE>::read_from_bytes(&data[offset..offset + 8])
        .map(|v| v.get())
        .map_err(|_| OleError::Truncated("failed to read u64".to_string()))
}

/// Parse a UTF-16LE string from binary data, stopping at the first null
/// terminator.
pub fn parse_utf16le_string(data: &[u8]) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .take_while(|&c| c != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

/// Decode exactly `data.len() / 2` UTF-16LE code units, keeping embedded
/// control characters. Invalid surrogate sequences become U+FFFD.
pub fn decode_utf16le(data: &[u8]) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u16_le() {
        let data = [0x34, 0x12, 0x78, 0x56];
        assert!(read_u16_le(&data, 0).is_ok_and(|v| v == 0x1234));
        assert!(read_u16_le(&data, 2).is_ok_and(|v| v == 0x5678));
        assert!(read_u16_le(&data, 3).is_err());
    }

    #[test]
    fn test_read_u32_le() {
        let data = [0x78, 0x56, 0x34, 0x12];
        assert!(read_u32_le(&data, 0).is_ok_and(|v| v == 0x12345678));
        assert!(read_u32_le(&data, 1).is_err());
    }

    #[test]
    fn test_read_i64_le() {
        let data = (-2i64).to_le_bytes();
        assert!(read_i64_le(&data, 0).is_ok_and(|v| v == -2));
    }

    #[test]
    fn test_parse_utf16le_stops_at_null() {
        let data = vec![
            0x48, 0x00, // 'H'
            0x69, 0x00, // 'i'
            0x00, 0x00, // null terminator
            0x41, 0x00, // trailing garbage
        ];
        assert_eq!(parse_utf16le_string(&data), "Hi");
    }

    #[test]
    fn test_decode_utf16le_keeps_controls() {
        let data = vec![0x41, 0x00, 0x0D, 0x00, 0x42, 0x00];
        assert_eq!(decode_utf16le(&data), "A\rB");
    }
}
