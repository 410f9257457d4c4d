//! Shared fixtures for integration tests
//!
//! Builders for minimal, structurally valid files of every built-in format,
//! signature-free filler bytes to embed them in, and unfiltered random
//! bytes full of coincidental headers.

#![allow(dead_code)]

use artefact::domain::entities::CarvedArtifact;
use artefact::domain::repositories::{ByteSource, SourceError};
use artefact::infrastructure::persistence::MemorySink;
use artefact::{CarveError, CarveOptions, CarveSession, CarveSummary};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// First bytes of every built-in header; filler never contains them
const SIGNATURE_LEADS: [u8; 9] = [0xFF, 0x89, b'%', b'P', b'G', b'B', b'M', 0xD0, 0x7F];

/// Deterministic xorshift64 bytes, unfiltered: short headers such as `BM`
/// and `MZ` occur by chance every few dozen KiB
pub fn raw_noise(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 24) as u8
        })
        .collect()
}

/// Deterministic pseudo-random bytes with every signature lead byte
/// remapped, so no header can start inside them
pub fn noise(len: usize, seed: u64) -> Vec<u8> {
    raw_noise(len, seed)
        .into_iter()
        .map(|byte| {
            if SIGNATURE_LEADS.contains(&byte) {
                byte ^ 0x01
            } else {
                byte
            }
        })
        .collect()
}

pub fn jpeg(body_len: usize) -> Vec<u8> {
    let mut jpg = vec![0xFF, 0xD8, 0xFF, 0xE0];
    jpg.extend(std::iter::repeat_n(b'X', body_len));
    jpg.extend_from_slice(&[0xFF, 0xD9]);
    jpg
}

fn png_chunk(kind: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut chunk = (data.len() as u32).to_be_bytes().to_vec();
    let mut body = kind.to_vec();
    body.extend_from_slice(data);
    chunk.extend_from_slice(&body);
    chunk.extend_from_slice(&crc32fast::hash(&body).to_be_bytes());
    chunk
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
    let mut ihdr = width.to_be_bytes().to_vec();
    ihdr.extend_from_slice(&height.to_be_bytes());
    ihdr.extend_from_slice(&[8, 2, 0, 0, 0]);
    png.extend(png_chunk(b"IHDR", &ihdr));
    png.extend(png_chunk(b"IDAT", b"xxxxxxxxxxxxxxxx"));
    png.extend(png_chunk(b"IEND", &[]));
    png
}

pub fn gif() -> Vec<u8> {
    let mut gif = b"GIF89a".to_vec();
    gif.extend_from_slice(&[4, 0, 4, 0, 0x11, 0x22, 0x33]);
    gif.extend_from_slice(b"image data");
    gif.extend_from_slice(&[0x00, 0x3B]);
    gif
}

pub fn pdf() -> Vec<u8> {
    b"%PDF-1.7\n1 0 obj\n<< /Type /Catalog >>\nendobj\ntrailer\n%%EOF".to_vec()
}

pub fn zip(comment: &[u8]) -> Vec<u8> {
    let mut zip = b"PK\x03\x04".to_vec();
    zip.extend_from_slice(&[0x14, 0, 0, 0, 0, 0]);
    zip.extend_from_slice(b"local file entry");
    zip.extend_from_slice(b"PK\x01\x02");
    zip.extend_from_slice(b"central directory");
    zip.extend_from_slice(b"PK\x05\x06");
    zip.extend_from_slice(&[0u8; 16]);
    zip.extend_from_slice(&(comment.len() as u16).to_le_bytes());
    zip.extend_from_slice(comment);
    zip
}

/// A 2x2 24-bit bitmap header declaring `declared_size`, padded or cut to
/// `total_len`
pub fn bmp(declared_size: u32, total_len: usize) -> Vec<u8> {
    let mut bmp = b"BM".to_vec();
    bmp.extend_from_slice(&declared_size.to_le_bytes());
    bmp.extend_from_slice(&0u32.to_le_bytes());
    bmp.extend_from_slice(&54u32.to_le_bytes());
    bmp.extend_from_slice(&40u32.to_le_bytes());
    bmp.extend_from_slice(&2u32.to_le_bytes());
    bmp.extend_from_slice(&2u32.to_le_bytes());
    bmp.extend_from_slice(&1u16.to_le_bytes());
    bmp.extend_from_slice(&24u16.to_le_bytes());
    bmp.resize(total_len.max(bmp.len()), 0x20);
    bmp
}

/// A PE32 image with one section of `section_len` bytes at 0x200
pub fn pe(section_len: u32) -> Vec<u8> {
    let mut image = vec![0u8; 0x200];
    image[..2].copy_from_slice(b"MZ");
    image[0x3C..0x40].copy_from_slice(&0x80u32.to_le_bytes());
    image[0x80..0x84].copy_from_slice(b"PE\0\0");
    image[0x86..0x88].copy_from_slice(&1u16.to_le_bytes());
    image[0x94..0x96].copy_from_slice(&0xE0u16.to_le_bytes());
    image[0x98..0x9A].copy_from_slice(&0x10Bu16.to_le_bytes());
    image[0x98 + 60..0x98 + 64].copy_from_slice(&0x200u32.to_le_bytes());
    let section = 0x98 + 0xE0;
    image[section..section + 5].copy_from_slice(b".text");
    image[section + 16..section + 20].copy_from_slice(&section_len.to_le_bytes());
    image[section + 20..section + 24].copy_from_slice(&0x200u32.to_le_bytes());
    image.resize(0x200 + section_len as usize, 0xCC);
    image
}

/// A little-endian ELF64 with one segment and a two-entry section table
pub fn elf(segment_len: u64) -> Vec<u8> {
    let mut elf = vec![0u8; 64 + 56];
    elf[..4].copy_from_slice(b"\x7fELF");
    elf[4] = 2;
    elf[5] = 1;
    elf[6] = 1;
    elf[0x20..0x28].copy_from_slice(&64u64.to_le_bytes());
    let shoff = 64 + 56 + segment_len;
    elf[0x28..0x30].copy_from_slice(&shoff.to_le_bytes());
    elf[0x34..0x36].copy_from_slice(&64u16.to_le_bytes());
    elf[0x36..0x38].copy_from_slice(&56u16.to_le_bytes());
    elf[0x38..0x3A].copy_from_slice(&1u16.to_le_bytes());
    elf[0x3A..0x3C].copy_from_slice(&64u16.to_le_bytes());
    elf[0x3C..0x3E].copy_from_slice(&2u16.to_le_bytes());
    elf[64..68].copy_from_slice(&1u32.to_le_bytes());
    elf[64 + 8..64 + 16].copy_from_slice(&120u64.to_le_bytes());
    elf[64 + 32..64 + 40].copy_from_slice(&segment_len.to_le_bytes());
    elf.resize((shoff + 128) as usize, 0x90);
    elf
}

/// An OLE2 compound file header padded with zeros to `total_len`
pub fn doc(total_len: usize) -> Vec<u8> {
    let mut doc = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
    doc.resize(total_len.max(512), 0);
    doc[28..30].copy_from_slice(&0xFFFEu16.to_le_bytes());
    doc[30..32].copy_from_slice(&9u16.to_le_bytes());
    doc
}

/// Lays out `parts` separated by filler and returns the input together
/// with each part's offset
pub fn layout(parts: &[(&'static str, Vec<u8>)], gap: usize) -> (Vec<u8>, Vec<(&'static str, u64, Vec<u8>)>) {
    let mut input = noise(gap, 7);
    let mut placed = Vec::new();
    for (i, (format_id, bytes)) in parts.iter().enumerate() {
        placed.push((*format_id, input.len() as u64, bytes.clone()));
        input.extend_from_slice(bytes);
        input.extend(noise(gap, 100 + i as u64));
    }
    (input, placed)
}

pub fn memory_source(input: Vec<u8>) -> Arc<dyn ByteSource> {
    Arc::new(input)
}

/// In-memory source that counts the bytes it hands out
pub struct MeteredSource {
    data: Vec<u8>,
    read: AtomicU64,
}

impl MeteredSource {
    pub fn new(data: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            data,
            read: AtomicU64::new(0),
        })
    }

    pub fn bytes_read(&self) -> u64 {
        self.read.load(Ordering::Relaxed)
    }
}

impl ByteSource for MeteredSource {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, SourceError> {
        let n = self.data.read_at(offset, buf)?;
        self.read.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn describe(&self) -> &str {
        "<metered>"
    }
}

/// Runs a session over an in-memory input and returns the collected
/// artifacts in delivery order
pub fn carve(
    input: Vec<u8>,
    options: CarveOptions,
) -> Result<(CarveSummary, Vec<CarvedArtifact>), CarveError> {
    let mut sink = MemorySink::new();
    let summary = CarveSession::new(memory_source(input), options).run(&mut sink)?;
    Ok((summary, sink.take()))
}

/// The comparable part of an artifact
pub fn describe(artifacts: &[CarvedArtifact]) -> Vec<(u64, &'static str, u64, Vec<u8>)> {
    artifacts
        .iter()
        .map(|a| (a.sequence(), a.format_id(), a.origin_offset(), a.content().to_vec()))
        .collect()
}
