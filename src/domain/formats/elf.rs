//! ELF object layout
//!
//! Reads the identification bytes and the header-table fields of both
//! classes in either byte order.

use super::Extent;
use byteorder::{BigEndian, ByteOrder, LittleEndian};

pub const ELF_CLASS_32: u8 = 1;
pub const ELF_CLASS_64: u8 = 2;
pub const ELF_DATA_LSB: u8 = 1;
pub const ELF_DATA_MSB: u8 = 2;
pub const EV_CURRENT: u8 = 1;

/// `e_ident` fields after the magic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElfIdent {
    pub class: u8,
    pub data: u8,
    pub version: u8,
}

impl ElfIdent {
    pub fn parse(data: &[u8]) -> Option<Self> {
        let ident = data.get(..16)?;
        Some(Self {
            class: ident[4],
            data: ident[5],
            version: ident[6],
        })
    }

    pub fn is_plausible(&self) -> bool {
        matches!(self.class, ELF_CLASS_32 | ELF_CLASS_64)
            && matches!(self.data, ELF_DATA_LSB | ELF_DATA_MSB)
            && self.version == EV_CURRENT
    }
}

/// Endian-aware field reader
struct Fields<'a> {
    data: &'a [u8],
    big_endian: bool,
}

impl Fields<'_> {
    fn u16(&self, at: u64) -> u64 {
        let raw = &self.data[at as usize..];
        if self.big_endian {
            BigEndian::read_u16(raw) as u64
        } else {
            LittleEndian::read_u16(raw) as u64
        }
    }

    fn u32(&self, at: u64) -> u64 {
        let raw = &self.data[at as usize..];
        if self.big_endian {
            BigEndian::read_u32(raw) as u64
        } else {
            LittleEndian::read_u32(raw) as u64
        }
    }

    fn u64(&self, at: u64) -> u64 {
        let raw = &self.data[at as usize..];
        if self.big_endian {
            BigEndian::read_u64(raw)
        } else {
            LittleEndian::read_u64(raw)
        }
    }
}

/// Field positions that differ between the two classes
struct Layout {
    header_len: u64,
    phoff: u64,
    shoff: u64,
    ehsize: u64,
    phentsize: u64,
    phnum: u64,
    shentsize: u64,
    shnum: u64,
    min_phentsize: u64,
}

const LAYOUT_32: Layout = Layout {
    header_len: 52,
    phoff: 0x1C,
    shoff: 0x20,
    ehsize: 0x28,
    phentsize: 0x2A,
    phnum: 0x2C,
    shentsize: 0x2E,
    shnum: 0x30,
    min_phentsize: 32,
};

const LAYOUT_64: Layout = Layout {
    header_len: 64,
    phoff: 0x20,
    shoff: 0x28,
    ehsize: 0x34,
    phentsize: 0x36,
    phnum: 0x38,
    shentsize: 0x3A,
    shnum: 0x3C,
    min_phentsize: 56,
};

/// On-disk extent: the furthest of the ELF header, the program-header table,
/// every segment's file image and the section-header table
pub fn image_extent(data: &[u8]) -> Extent {
    if let Some(truncated) = Extent::require(data, 16) {
        return truncated;
    }
    let Some(ident) = ElfIdent::parse(data).filter(ElfIdent::is_plausible) else {
        return Extent::Invalid;
    };
    let (layout, wide) = match ident.class {
        ELF_CLASS_32 => (&LAYOUT_32, false),
        _ => (&LAYOUT_64, true),
    };
    if let Some(truncated) = Extent::require(data, layout.header_len) {
        return truncated;
    }

    let fields = Fields {
        data,
        big_endian: ident.data == ELF_DATA_MSB,
    };
    let offset = |at| if wide { fields.u64(at) } else { fields.u32(at) };

    let phoff = offset(layout.phoff);
    let shoff = offset(layout.shoff);
    let ehsize = fields.u16(layout.ehsize);
    let phentsize = fields.u16(layout.phentsize);
    let phnum = fields.u16(layout.phnum);
    let shentsize = fields.u16(layout.shentsize);
    let shnum = fields.u16(layout.shnum);

    let mut extent = ehsize.max(layout.header_len);

    if phnum > 0 {
        if phentsize < layout.min_phentsize {
            return Extent::Invalid;
        }
        let Some(ph_end) = phoff.checked_add(phnum * phentsize) else {
            return Extent::Invalid;
        };
        if let Some(truncated) = Extent::require(data, ph_end) {
            return truncated;
        }
        extent = extent.max(ph_end);

        for i in 0..phnum {
            let entry = phoff + i * phentsize;
            let (p_offset, p_filesz) = if wide {
                (fields.u64(entry + 8), fields.u64(entry + 32))
            } else {
                (fields.u32(entry + 4), fields.u32(entry + 16))
            };
            match p_offset.checked_add(p_filesz) {
                Some(end) => extent = extent.max(end),
                None => return Extent::Invalid,
            }
        }
    }

    if shnum > 0 {
        match shoff.checked_add(shnum * shentsize) {
            Some(sh_end) => extent = extent.max(sh_end),
            None => return Extent::Invalid,
        }
    }

    Extent::Known(extent)
}

/// Builds a little-endian ELF64 object with one loadable segment of
/// `segment_len` bytes and a section table of two entries after it
#[cfg(test)]
pub(crate) fn sample(segment_len: u64) -> Vec<u8> {
    let mut elf = vec![0u8; 64 + 56];
    elf[..4].copy_from_slice(b"\x7fELF");
    elf[4] = ELF_CLASS_64;
    elf[5] = ELF_DATA_LSB;
    elf[6] = EV_CURRENT;
    elf[0x20..0x28].copy_from_slice(&64u64.to_le_bytes()); // e_phoff
    let shoff = 64 + 56 + segment_len;
    elf[0x28..0x30].copy_from_slice(&shoff.to_le_bytes());
    elf[0x34..0x36].copy_from_slice(&64u16.to_le_bytes());
    elf[0x36..0x38].copy_from_slice(&56u16.to_le_bytes());
    elf[0x38..0x3A].copy_from_slice(&1u16.to_le_bytes());
    elf[0x3A..0x3C].copy_from_slice(&64u16.to_le_bytes());
    elf[0x3C..0x3E].copy_from_slice(&2u16.to_le_bytes());
    // PT_LOAD covering the segment bytes
    elf[64..68].copy_from_slice(&1u32.to_le_bytes());
    elf[64 + 8..64 + 16].copy_from_slice(&120u64.to_le_bytes());
    elf[64 + 32..64 + 40].copy_from_slice(&segment_len.to_le_bytes());
    elf.resize((shoff + 128) as usize, 0x90);
    elf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_reaches_section_table_end() {
        let elf = sample(100);
        assert_eq!(image_extent(&elf), Extent::Known(64 + 56 + 100 + 128));
    }

    #[test]
    fn big_endian_32_bit_header() {
        let mut elf = vec![0u8; 52];
        elf[..4].copy_from_slice(b"\x7fELF");
        elf[4] = ELF_CLASS_32;
        elf[5] = ELF_DATA_MSB;
        elf[6] = EV_CURRENT;
        elf[0x20..0x24].copy_from_slice(&52u32.to_be_bytes()); // e_shoff
        elf[0x28..0x2A].copy_from_slice(&52u16.to_be_bytes());
        elf[0x2E..0x30].copy_from_slice(&40u16.to_be_bytes());
        elf[0x30..0x32].copy_from_slice(&3u16.to_be_bytes());
        assert_eq!(image_extent(&elf), Extent::Known(52 + 120));
    }

    #[test]
    fn unknown_class_is_invalid() {
        let mut elf = sample(8);
        elf[4] = 3;
        assert_eq!(image_extent(&elf), Extent::Invalid);
        assert!(!ElfIdent::parse(&elf).unwrap().is_plausible());
    }

    #[test]
    fn program_table_past_data_is_truncated() {
        let elf = sample(8);
        assert_eq!(
            image_extent(&elf[..80]),
            Extent::Truncated { needed: 120 }
        );
    }
}
