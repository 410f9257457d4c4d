//! PNG image header chunk

use byteorder::{BigEndian, ByteOrder};

const SIGNATURE_LEN: usize = 8;
const IHDR_DATA_LEN: u32 = 13;
/// Bytes from the signature to the end of the IHDR chunk
pub const IHDR_END: usize = SIGNATURE_LEN + 25;

/// Checks that the first chunk is a well-formed IHDR with a matching CRC-32
/// and non-zero dimensions
pub fn has_valid_ihdr(data: &[u8]) -> bool {
    // length(4) + type(4) + data(13) + crc(4)
    let Some(chunk) = data.get(SIGNATURE_LEN..IHDR_END) else {
        return false;
    };
    if BigEndian::read_u32(&chunk[0..4]) != IHDR_DATA_LEN || &chunk[4..8] != b"IHDR" {
        return false;
    }
    let width = BigEndian::read_u32(&chunk[8..12]);
    let height = BigEndian::read_u32(&chunk[12..16]);
    let stored_crc = BigEndian::read_u32(&chunk[21..25]);
    width > 0 && height > 0 && crc32fast::hash(&chunk[4..21]) == stored_crc
}
