//! PLC (plex) decoding.
//!
//! A PLC is the recurring table-stream shape `n+1` character positions
//! followed by `n` fixed-size data elements. The piece table (`PlcPcd`) is a
//! PLC with 8-byte elements.

use crate::ole::binary::read_u32_le;
use bytes::Bytes;

/// A decoded PLC: positions plus a shared buffer of data elements.
pub struct Plc {
    /// Character positions (n + 1 entries)
    positions: Vec<u32>,
    /// All data elements, back to back
    data: Bytes,
    /// Size of one data element in bytes
    element_size: usize,
}

impl Plc {
    /// Decode a PLC with the given element size.
    ///
    /// The payload length must satisfy `len = 4 + n * (4 + element_size)`
    /// exactly; anything else is not a PLC.
    pub fn parse(payload: &[u8], element_size: usize) -> Option<Plc> {
        if payload.len() < 4 || element_size == 0 {
            return None;
        }
        let n = (payload.len() - 4) / (4 + element_size);
        if (payload.len() - 4) % (4 + element_size) != 0 {
            return None;
        }

        let mut positions = Vec::with_capacity(n + 1);
        for i in 0..=n {
            positions.push(read_u32_le(payload, i * 4).ok()?);
        }

        let data_start = (n + 1) * 4;
        let data = Bytes::copy_from_slice(&payload[data_start..]);

        Some(Plc {
            positions,
            data,
            element_size,
        })
    }

    /// Number of data elements.
    #[inline]
    pub fn count(&self) -> usize {
        if self.positions.is_empty() {
            0
        } else {
            self.positions.len() - 1
        }
    }

    /// The half-open CP range covered by element `index`.
    pub fn range(&self, index: usize) -> Option<(u32, u32)> {
        if index + 1 >= self.positions.len() {
            return None;
        }
        Some((self.positions[index], self.positions[index + 1]))
    }

    /// The data element at `index`.
    pub fn element(&self, index: usize) -> Option<&[u8]> {
        let start = index.checked_mul(self.element_size)?;
        let end = start + self.element_size;
        if end > self.data.len() {
            return None;
        }
        Some(&self.data[start..end])
    }

    /// All character positions, including the terminal one.
    #[inline]
    pub fn positions(&self) -> &[u32] {
        &self.positions
    }
}
