use super::binary::{read_i16_le, read_i32_le, read_i64_le, read_u16_le, read_u32_le};
use super::codepage::{decode_bytes, DEFAULT_CODEPAGE};
use super::consts::*;
use super::OleError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Offset of the Windows FILETIME epoch (1601-01-01) from the Unix epoch,
/// in 100-nanosecond intervals.
const FILETIME_UNIX_EPOCH: i64 = 116_444_736_000_000_000;

/// 100-nanosecond intervals per minute, for the edit-time property.
const FILETIME_PER_MINUTE: u64 = 600_000_000;

/// Document properties extracted from the two summary-information streams.
///
/// Every field is optional; a missing stream, a malformed property set or an
/// undecodable property simply leaves the affected fields at `None`.
#[derive(Debug, Default, Clone)]
pub struct Metadata {
    // SummaryInformation
    pub title: Option<String>,
    pub subject: Option<String>,
    pub author: Option<String>,
    pub keywords: Option<String>,
    pub comments: Option<String>,
    pub template: Option<String>,
    pub last_author: Option<String>,
    pub revision_number: Option<String>,
    /// Total editing time in minutes
    pub total_edit_time_minutes: Option<i64>,
    pub last_printed: Option<DateTime<Utc>>,
    pub created: Option<DateTime<Utc>>,
    pub last_saved: Option<DateTime<Utc>>,
    pub page_count: Option<i32>,
    pub word_count: Option<i32>,
    pub char_count: Option<i32>,
    pub application_name: Option<String>,
    pub security: Option<i32>,

    // DocumentSummaryInformation
    pub category: Option<String>,
    pub byte_count: Option<i32>,
    pub line_count: Option<i32>,
    pub paragraph_count: Option<i32>,
    pub manager: Option<String>,
    pub company: Option<String>,
    pub char_count_with_spaces: Option<i32>,
    pub hyperlink_base: Option<String>,
    pub content_type: Option<String>,
    pub content_status: Option<String>,
    pub language: Option<i32>,
}

/// A decoded property value.
#[derive(Debug, Clone)]
pub enum PropertyValue {
    I2(i16),
    I4(i32),
    Bool(bool),
    I8(i64),
    Lpstr(String),
    Lpwstr(String),
    /// Raw FILETIME: 100-ns intervals since 1601-01-01 UTC
    FileTime(u64),
    Blob(Vec<u8>),
    Empty,
}

/// Build a [`Metadata`] record from the raw bytes of the two summary
/// streams. Either stream may be absent or malformed; whatever decodes is
/// returned.
pub fn metadata_from_streams(summary: Option<&[u8]>, doc_summary: Option<&[u8]>) -> Metadata {
    let mut metadata = Metadata::default();

    if let Some(data) = summary {
        match parse_property_stream(data) {
            Ok(props) => extract_summary_info(&mut metadata, &props),
            Err(err) => log::warn!("skipping SummaryInformation stream: {}", err),
        }
    }

    if let Some(data) = doc_summary {
        match parse_property_stream(data) {
            Ok(props) => extract_document_summary_info(&mut metadata, &props),
            Err(err) => log::warn!("skipping DocumentSummaryInformation stream: {}", err),
        }
    }

    metadata
}

/// Parse a property-set stream into a map of decoded properties.
///
/// Container layout: byte-order mark `0xFFFE`, format version, OS word,
/// CLSID, then `N` `(FMTID, offset)` pairs. Only the first property set is
/// decoded; the second set of `DocumentSummaryInformation` holds user-defined
/// properties, which are out of scope.
pub fn parse_property_stream(data: &[u8]) -> Result<HashMap<u32, PropertyValue>, OleError> {
    if data.len() < 48 {
        return Err(OleError::Truncated("property-set container".to_string()));
    }

    let byte_order = read_u16_le(data, 0)?;
    if byte_order != 0xFFFE {
        return Err(OleError::Corrupted(format!(
            "bad property-set byte-order mark 0x{:04X}",
            byte_order
        )));
    }

    let num_sets = read_u32_le(data, 24)?;
    if num_sets == 0 {
        return Err(OleError::Corrupted("container holds no property sets".to_string()));
    }

    // Directory of (FMTID, offset) pairs starts right after the header.
    // Walk it for bounds sanity even though only the first set is decoded.
    let mut first_set_offset = 0usize;
    for i in 0..num_sets.min(2) as usize {
        let entry_offset = 28 + i * 20;
        let set_offset = read_u32_le(data, entry_offset + 16)? as usize;
        if set_offset >= data.len() {
            return Err(OleError::Corrupted("property-set offset out of range".to_string()));
        }
        if i == 0 {
            first_set_offset = set_offset;
        }
    }

    parse_property_set(&data[first_set_offset..])
}

/// Decode the `(size, count, id/offset pairs, values)` body of one set.
fn parse_property_set(set: &[u8]) -> Result<HashMap<u32, PropertyValue>, OleError> {
    let size = read_u32_le(set, 0)? as usize;
    let count = read_u32_le(set, 4)?;
    let end = size.min(set.len());

    // The id/offset directory must fit inside the set before anything is
    // allocated for it
    if (count as u64) * 8 + 8 > set.len() as u64 {
        return Err(OleError::Corrupted(
            "property directory larger than its set".to_string(),
        ));
    }

    let mut offsets: Vec<(u32, usize)> = Vec::with_capacity(count as usize);
    for i in 0..count as usize {
        let entry = 8 + i * 8;
        // A directory that runs off the end invalidates the whole set
        let prop_id = read_u32_le(set, entry)?;
        let prop_offset = read_u32_le(set, entry + 4)? as usize;
        offsets.push((prop_id, prop_offset));
    }

    // The code-page property (id 1) governs LPSTR decoding for the set
    let codepage = offsets
        .iter()
        .find(|&&(id, _)| id == 1)
        .and_then(|&(_, off)| read_i16_le(set, off + 4).ok())
        .map(|v| v as u16)
        .unwrap_or(DEFAULT_CODEPAGE);

    let mut properties = HashMap::with_capacity(offsets.len());
    for (prop_id, prop_offset) in offsets {
        if prop_offset + 4 > end {
            log::debug!("property 0x{:02X} offset out of range, dropped", prop_id);
            continue;
        }
        match parse_property_value(&set[..end], prop_offset, codepage) {
            Some(value) => {
                properties.insert(prop_id, value);
            }
            None => log::debug!("property 0x{:02X} undecodable, dropped", prop_id),
        }
    }

    Ok(properties)
}

/// Decode a single typed value. `None` drops the property, leaving the rest
/// of the set intact.
fn parse_property_value(set: &[u8], offset: usize, codepage: u16) -> Option<PropertyValue> {
    let prop_type = read_u16_le(set, offset).ok()?;
    // Two bytes of padding follow the type tag
    let value = offset + 4;

    match prop_type {
        VT_EMPTY | VT_NULL => Some(PropertyValue::Empty),
        VT_I2 => read_i16_le(set, value).ok().map(PropertyValue::I2),
        VT_I4 => read_i32_le(set, value).ok().map(PropertyValue::I4),
        VT_BOOL => read_i16_le(set, value).ok().map(|v| PropertyValue::Bool(v != 0)),
        VT_I8 => read_i64_le(set, value).ok().map(PropertyValue::I8),
        VT_LPSTR => {
            // u32 byte length including the NUL, then code-page bytes
            let len = read_u32_le(set, value).ok()? as usize;
            let end = (value + 4).checked_add(len)?;
            let bytes = set.get(value + 4..end)?;
            Some(PropertyValue::Lpstr(decode_bytes(bytes, codepage)))
        }
        VT_LPWSTR => {
            // u32 character count including the NUL, then UTF-16LE
            let chars = read_u32_le(set, value).ok()? as usize;
            let end = (value + 4).checked_add(chars.checked_mul(2)?)?;
            let bytes = set.get(value + 4..end)?;
            Some(PropertyValue::Lpwstr(super::binary::parse_utf16le_string(
                bytes,
            )))
        }
        VT_FILETIME => {
            let low = read_u32_le(set, value).ok()? as u64;
            let high = read_u32_le(set, value + 4).ok()? as u64;
            Some(PropertyValue::FileTime(low | (high << 32)))
        }
        VT_BLOB | VT_CF => {
            let len = read_u32_le(set, value).ok()? as usize;
            let end = (value + 4).checked_add(len)?;
            let bytes = set.get(value + 4..end)?;
            Some(PropertyValue::Blob(bytes.to_vec()))
        }
        _ => None,
    }
}

/// Convert a FILETIME value to a UTC timestamp. Zero means "not set".
fn filetime_to_datetime(filetime: u64) -> Option<DateTime<Utc>> {
    if filetime == 0 {
        return None;
    }
    let seconds = (filetime as i64 - FILETIME_UNIX_EPOCH) / 10_000_000;
    DateTime::from_timestamp(seconds, 0)
}

fn string_of(value: &PropertyValue) -> Option<String> {
    match value {
        PropertyValue::Lpstr(s) | PropertyValue::Lpwstr(s) => {
            if s.is_empty() {
                None
            } else {
                Some(s.clone())
            }
        }
        _ => None,
    }
}

fn i32_of(value: &PropertyValue) -> Option<i32> {
    match value {
        PropertyValue::I2(v) => Some(*v as i32),
        PropertyValue::I4(v) => Some(*v),
        PropertyValue::I8(v) => i32::try_from(*v).ok(),
        _ => None,
    }
}

fn filetime_of(value: &PropertyValue) -> Option<u64> {
    match value {
        PropertyValue::FileTime(v) => Some(*v),
        _ => None,
    }
}

/// Fill the SummaryInformation fields.
fn extract_summary_info(metadata: &mut Metadata, props: &HashMap<u32, PropertyValue>) {
    let string = |id: u32| props.get(&id).and_then(string_of);
    let int = |id: u32| props.get(&id).and_then(i32_of);
    let time = |id: u32| props.get(&id).and_then(filetime_of).and_then(filetime_to_datetime);

    metadata.title = string(0x02);
    metadata.subject = string(0x03);
    metadata.author = string(0x04);
    metadata.keywords = string(0x05);
    metadata.comments = string(0x06);
    metadata.template = string(0x07);
    metadata.last_author = string(0x08);
    metadata.revision_number = string(0x09);
    // Edit time is a FILETIME-typed duration, not a timestamp
    metadata.total_edit_time_minutes = props
        .get(&0x0A)
        .and_then(filetime_of)
        .map(|ft| (ft / FILETIME_PER_MINUTE) as i64);
    metadata.last_printed = time(0x0B);
    metadata.created = time(0x0C);
    metadata.last_saved = time(0x0D);
    metadata.page_count = int(0x0E);
    metadata.word_count = int(0x0F);
    metadata.char_count = int(0x10);
    metadata.application_name = string(0x12);
    metadata.security = int(0x13);
}

/// Fill the DocumentSummaryInformation fields.
fn extract_document_summary_info(metadata: &mut Metadata, props: &HashMap<u32, PropertyValue>) {
    let string = |id: u32| props.get(&id).and_then(string_of);
    let int = |id: u32| props.get(&id).and_then(i32_of);

    metadata.category = string(0x02);
    metadata.byte_count = int(0x04);
    metadata.line_count = int(0x05);
    metadata.paragraph_count = int(0x06);
    metadata.manager = string(0x0E);
    metadata.company = string(0x0F);
    metadata.char_count_with_spaces = int(0x11);
    metadata.hyperlink_base = string(0x15);
    metadata.content_type = string(0x1A);
    metadata.content_status = string(0x1B);
    metadata.language = int(0x1C);
}
