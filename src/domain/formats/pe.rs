//! Portable Executable layout
//!
//! Only the fields needed to find where an image ends on disk: the DOS
//! stub's `e_lfanew`, the COFF header and the section table.

use super::Extent;
use byteorder::{ByteOrder, LittleEndian};

const E_LFANEW_OFFSET: usize = 0x3C;
/// Bytes needed to read `e_lfanew`
pub const E_LFANEW_END: usize = E_LFANEW_OFFSET + 4;
const MIN_LFANEW: u32 = 0x40;
const MAX_LFANEW: u32 = 0x10000;
const COFF_HEADER_LEN: u64 = 24; // signature + file header
const SECTION_HEADER_LEN: u64 = 40;
const MAX_SECTIONS: u16 = 96;

pub const PE_SIGNATURE: &[u8] = b"PE\0\0";
pub const PE32_MAGIC: u16 = 0x10b;
pub const PE32_PLUS_MAGIC: u16 = 0x20b;

/// Offset of the `PE\0\0` signature, if `e_lfanew` is sane
pub fn pe_header_offset(data: &[u8]) -> Option<u64> {
    let raw = data.get(E_LFANEW_OFFSET..E_LFANEW_OFFSET + 4)?;
    let lfanew = LittleEndian::read_u32(raw);
    (MIN_LFANEW..=MAX_LFANEW)
        .contains(&lfanew)
        .then_some(lfanew as u64)
}

/// Whether `data` carries a PE signature and a known optional-header magic
pub fn has_pe_headers(data: &[u8]) -> bool {
    let Some(pe) = pe_header_offset(data).map(|o| o as usize) else {
        return false;
    };
    if data.get(pe..pe + 4) != Some(PE_SIGNATURE) {
        return false;
    }
    match data.get(pe + 24..pe + 26) {
        Some(raw) => matches!(LittleEndian::read_u16(raw), PE32_MAGIC | PE32_PLUS_MAGIC),
        None => false,
    }
}

/// On-disk extent of the image: the larger of `SizeOfHeaders` and the end of
/// the furthest section's raw data
pub fn image_extent(data: &[u8]) -> Extent {
    if let Some(truncated) = Extent::require(data, E_LFANEW_OFFSET as u64 + 4) {
        return truncated;
    }
    let Some(pe) = pe_header_offset(data) else {
        return Extent::Invalid;
    };
    if let Some(truncated) = Extent::require(data, pe + COFF_HEADER_LEN) {
        return truncated;
    }
    let pe = pe as usize;
    if &data[pe..pe + 4] != PE_SIGNATURE {
        return Extent::Invalid;
    }

    let sections = LittleEndian::read_u16(&data[pe + 6..]);
    let optional_len = LittleEndian::read_u16(&data[pe + 20..]) as u64;
    if sections == 0 || sections > MAX_SECTIONS || optional_len < 64 {
        return Extent::Invalid;
    }

    let optional = pe as u64 + COFF_HEADER_LEN;
    let table = optional + optional_len;
    let table_end = table + sections as u64 * SECTION_HEADER_LEN;
    if let Some(truncated) = Extent::require(data, table_end) {
        return truncated;
    }

    let optional = optional as usize;
    if !matches!(
        LittleEndian::read_u16(&data[optional..]),
        PE32_MAGIC | PE32_PLUS_MAGIC
    ) {
        return Extent::Invalid;
    }
    let size_of_headers = LittleEndian::read_u32(&data[optional + 60..]) as u64;

    let mut extent = size_of_headers.max(table_end);
    for i in 0..sections as u64 {
        let entry = (table + i * SECTION_HEADER_LEN) as usize;
        let raw_size = LittleEndian::read_u32(&data[entry + 16..]) as u64;
        let raw_pointer = LittleEndian::read_u32(&data[entry + 20..]) as u64;
        if raw_size > 0 {
            extent = extent.max(raw_pointer + raw_size);
        }
    }

    Extent::Known(extent)
}

/// Builds a minimal PE32 image with one section of `section_len` bytes
#[cfg(test)]
pub(crate) fn sample(section_len: u32) -> Vec<u8> {
    let mut image = vec![0u8; 0x200];
    image[..2].copy_from_slice(b"MZ");
    image[0x3C..0x40].copy_from_slice(&0x80u32.to_le_bytes());
    image[0x80..0x84].copy_from_slice(PE_SIGNATURE);
    image[0x86..0x88].copy_from_slice(&1u16.to_le_bytes()); // NumberOfSections
    image[0x94..0x96].copy_from_slice(&0xE0u16.to_le_bytes()); // SizeOfOptionalHeader
    image[0x98..0x9A].copy_from_slice(&PE32_MAGIC.to_le_bytes());
    image[0x98 + 60..0x98 + 64].copy_from_slice(&0x200u32.to_le_bytes()); // SizeOfHeaders
    let section = 0x98 + 0xE0;
    image[section..section + 5].copy_from_slice(b".text");
    image[section + 16..section + 20].copy_from_slice(&section_len.to_le_bytes());
    image[section + 20..section + 24].copy_from_slice(&0x200u32.to_le_bytes());
    image.resize(0x200 + section_len as usize, 0xCC);
    image
}
