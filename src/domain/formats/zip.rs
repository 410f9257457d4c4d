//! ZIP end-of-central-directory record

use super::Extent;
use byteorder::{ByteOrder, LittleEndian};
use memchr::memmem;

pub const EOCD_SIGNATURE: &[u8] = b"PK\x05\x06";
/// Fixed part of the EOCD record, before the comment
pub const EOCD_LEN: usize = 22;
const MAX_COMMENT_LEN: usize = u16::MAX as usize;
/// Signature, version needed, flags and method of a local file header
pub const LOCAL_HEADER_FIELDS: usize = 10;
/// Highest "version needed to extract" defined by APPNOTE 6.3
const MAX_VERSION_NEEDED: u16 = 63;

/// Whether the local file header at the start of `data` names a known
/// version and compression method
pub fn has_plausible_local_header(data: &[u8]) -> bool {
    let Some(fields) = data.get(..LOCAL_HEADER_FIELDS) else {
        return false;
    };
    let version = LittleEndian::read_u16(&fields[4..6]);
    let method = LittleEndian::read_u16(&fields[8..10]);
    version <= MAX_VERSION_NEEDED
        && matches!(method, 0..=10 | 12 | 14 | 18 | 19 | 93..=99)
}

/// Length of the EOCD record starting at `record`, comment included
pub fn eocd_record_len(record: &[u8]) -> Extent {
    if let Some(truncated) = Extent::require(record, EOCD_LEN as u64) {
        return truncated;
    }
    if !record.starts_with(EOCD_SIGNATURE) {
        return Extent::Invalid;
    }
    let comment_len = LittleEndian::read_u16(&record[20..22]) as u64;
    Extent::Known(EOCD_LEN as u64 + comment_len)
}

/// Whether `data` ends with a complete EOCD record whose declared comment
/// reaches exactly to the end
pub fn has_trailing_eocd(data: &[u8]) -> bool {
    if data.len() < EOCD_LEN {
        return false;
    }
    let window_start = data.len().saturating_sub(EOCD_LEN + MAX_COMMENT_LEN);
    let tail = &data[window_start..];
    memmem::rfind_iter(tail, EOCD_SIGNATURE).any(|pos| {
        matches!(
            eocd_record_len(&tail[pos..]),
            Extent::Known(len) if pos as u64 + len == tail.len() as u64
        )
    })
}
