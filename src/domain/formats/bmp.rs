//! Windows bitmap file header
//!
//! see: https://www.ece.ualberta.ca/~elliott/ee552/studentAppNotes/2003_w/misc/bmp_file_format/bmp_file_format.htm

use super::Extent;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// Length of the BITMAPFILEHEADER
pub const FILE_HEADER_LEN: usize = 14;

const DIB_CORE: u32 = 12; // BITMAPCOREHEADER
const DIB_INFO: u32 = 40; // BITMAPINFOHEADER
const DIB_V2: u32 = 52;
const DIB_V3: u32 = 56;
const DIB_V4: u32 = 108;
const DIB_V5: u32 = 124;

/// The fields of the file header plus the start of the DIB header
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BmpHeader {
    pub magic: u16,        // should be 'BM'
    pub declared_size: u32, // whole file size, little endian
    pub reserved: u32,     // should be == 0
    pub pixel_offset: u32, // the address of the image data
    pub dib_size: u32,     // size of the DIB header structure
    pub planes: Option<u16>,
    pub bits_per_pixel: Option<u16>,
}

impl BmpHeader {
    /// Reads the header; needs at least 18 bytes
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut cursor = Cursor::new(data);
        let mut header = BmpHeader {
            magic: cursor.read_u16::<LittleEndian>().ok()?,
            declared_size: cursor.read_u32::<LittleEndian>().ok()?,
            reserved: cursor.read_u32::<LittleEndian>().ok()?,
            pixel_offset: cursor.read_u32::<LittleEndian>().ok()?,
            dib_size: cursor.read_u32::<LittleEndian>().ok()?,
            ..Default::default()
        };

        // planes/bpp sit at different offsets for the OS/2 core header
        let planes_at = if header.dib_size == DIB_CORE { 22 } else { 26 };
        cursor.set_position(planes_at);
        header.planes = cursor.read_u16::<LittleEndian>().ok();
        header.bits_per_pixel = cursor.read_u16::<LittleEndian>().ok();

        Some(header)
    }

    pub fn has_known_dib(&self) -> bool {
        matches!(
            self.dib_size,
            DIB_CORE | DIB_INFO | DIB_V2 | DIB_V3 | DIB_V4 | DIB_V5
        )
    }

    /// Structural plausibility, independent of how many bytes were carved
    pub fn is_plausible(&self) -> bool {
        let header_end = FILE_HEADER_LEN as u64 + self.dib_size as u64;
        self.magic == u16::from_le_bytes(*b"BM")
            && self.reserved == 0
            && self.has_known_dib()
            && self.pixel_offset as u64 >= header_end
            && self.declared_size as u64 >= self.pixel_offset as u64
            && self.planes.is_none_or(|p| p == 1)
            && self
                .bits_per_pixel
                .is_none_or(|bpp| matches!(bpp, 1 | 2 | 4 | 8 | 16 | 24 | 32 | 64))
    }
}

/// Reads a little-endian u32 byte count stored `size_offset` bytes into the
/// candidate
pub fn declared_size(data: &[u8], size_offset: usize) -> Extent {
    if let Some(truncated) = Extent::require(data, size_offset as u64 + 4) {
        return truncated;
    }
    let mut cursor = Cursor::new(&data[size_offset..size_offset + 4]);
    match cursor.read_u32::<LittleEndian>() {
        Ok(size) if size as usize > size_offset + 4 => Extent::Known(size as u64),
        _ => Extent::Invalid,
    }
}

#[cfg(test)]
pub(crate) fn sample(declared_size: u32, total_len: usize) -> Vec<u8> {
    let mut bmp = Vec::with_capacity(total_len);
    bmp.extend_from_slice(b"BM");
    bmp.extend_from_slice(&declared_size.to_le_bytes());
    bmp.extend_from_slice(&0u32.to_le_bytes());
    bmp.extend_from_slice(&54u32.to_le_bytes());
    bmp.extend_from_slice(&40u32.to_le_bytes());
    bmp.extend_from_slice(&2u32.to_le_bytes()); // width
    bmp.extend_from_slice(&2u32.to_le_bytes()); // height
    bmp.extend_from_slice(&1u16.to_le_bytes());
    bmp.extend_from_slice(&24u16.to_le_bytes());
    bmp.resize(total_len.max(bmp.len()), 0x7F);
    bmp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_info_header() {
        let bmp = sample(70, 70);
        let header = BmpHeader::parse(&bmp).unwrap();
        assert_eq!(header.declared_size, 70);
        assert_eq!(header.planes, Some(1));
        assert_eq!(header.bits_per_pixel, Some(24));
        assert!(header.is_plausible());
    }

    #[test]
    fn nonzero_reserved_is_implausible() {
        let mut bmp = sample(70, 70);
        bmp[6] = 1;
        assert!(!BmpHeader::parse(&bmp).unwrap().is_plausible());
    }

    #[test]
    fn declared_size_needs_the_field() {
        assert_eq!(declared_size(b"BM\x10", 2), Extent::Truncated { needed: 6 });
        assert_eq!(declared_size(&sample(70, 70), 2), Extent::Known(70));
        assert_eq!(declared_size(b"BM\x03\x00\x00\x00", 2), Extent::Invalid);
    }
}
