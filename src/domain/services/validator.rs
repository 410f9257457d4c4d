//! Validator service
//!
//! Structural plausibility checks on carved bytes. Coincidental header
//! matches are routine in raw data, so a failed check is an expected
//! outcome reported as a reason string, never an error.

use crate::domain::entities::{BoundaryStrategy, FormatSignature};
use crate::domain::formats::{bmp::BmpHeader, elf::ElfIdent, pe, png, zip};
use byteorder::{ByteOrder, LittleEndian};

/// Why a carved range was rejected
pub type Rejection = &'static str;

const OLE_BYTE_ORDER: u16 = 0xFFFE;

/// Format-specific validation of carved content
#[derive(Debug, Default, Clone, Copy)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    /// Whether `bytes` is a plausible instance of `signature`
    pub fn validate(&self, bytes: &[u8], signature: &FormatSignature) -> bool {
        self.check(bytes, signature).is_ok()
    }

    /// Checks the fixed fields right after the header.
    ///
    /// `head` is the start of a candidate and may be shorter than the file;
    /// fields it does not fully contain are not judged. Cheap enough to run
    /// on every header hit before any boundary search.
    pub fn screen(&self, head: &[u8], signature: &FormatSignature) -> Result<(), Rejection> {
        match signature.id() {
            "jpg" | "jpeg" if head.len() > 3 => check_jpeg(head),
            "png" if head.len() >= png::IHDR_END => png::has_valid_ihdr(head)
                .then_some(())
                .ok_or("bad IHDR chunk"),
            "pdf" if head.len() > 5 => check_pdf(head),
            "gif" if head.len() >= 6 => check_gif(head),
            "zip" if head.len() >= zip::LOCAL_HEADER_FIELDS => zip::has_plausible_local_header(head)
                .then_some(())
                .ok_or("implausible local file header"),
            "bmp" => match BmpHeader::parse(head) {
                Some(header) if !header.is_plausible() => Err("implausible bitmap header"),
                _ => Ok(()),
            },
            "exe" => screen_pe(head),
            "doc" if head.len() >= 32 => check_ole(head),
            "elf" if head.len() >= 16 => check_elf(head),
            _ => Ok(()),
        }
    }

    /// Validates `bytes`, returning the first failed check
    pub fn check(&self, bytes: &[u8], signature: &FormatSignature) -> Result<(), Rejection> {
        if !signature.matches_header(bytes) {
            return Err("header mismatch");
        }
        if signature.strategy() == BoundaryStrategy::Footer && !signature.matches_footer(bytes) {
            return Err("footer mismatch");
        }
        self.screen(bytes, signature)?;

        match signature.id() {
            "jpg" | "jpeg" => check_jpeg(bytes),
            "png" => png::has_valid_ihdr(bytes)
                .then_some(())
                .ok_or("bad IHDR chunk"),
            "pdf" => check_pdf(bytes),
            "gif" => check_gif(bytes),
            "zip" => zip::has_trailing_eocd(bytes)
                .then_some(())
                .ok_or("no end of central directory at tail"),
            "bmp" => check_bmp(bytes),
            "exe" => pe::has_pe_headers(bytes)
                .then_some(())
                .ok_or("no PE headers"),
            "doc" => check_ole(bytes),
            "elf" => check_elf(bytes),
            // custom formats: header and footer only
            _ => Ok(()),
        }
    }
}

fn check_jpeg(bytes: &[u8]) -> Result<(), Rejection> {
    // marker following SOI: SOFn, DHT, DQT, DRI, APPn or COM
    match bytes.get(3) {
        Some(0xC0..=0xCF | 0xDB..=0xDD | 0xE0..=0xEF | 0xFE) => Ok(()),
        _ => Err("implausible marker after SOI"),
    }
}

fn check_pdf(bytes: &[u8]) -> Result<(), Rejection> {
    match bytes.get(5) {
        Some(b) if b.is_ascii_digit() => Ok(()),
        _ => Err("missing version digit"),
    }
}

fn check_gif(bytes: &[u8]) -> Result<(), Rejection> {
    match bytes.get(..6) {
        Some(b"GIF87a" | b"GIF89a") => Ok(()),
        _ => Err("unknown GIF version"),
    }
}

fn check_bmp(bytes: &[u8]) -> Result<(), Rejection> {
    match BmpHeader::parse(bytes) {
        Some(header) if header.is_plausible() => Ok(()),
        Some(_) => Err("implausible bitmap header"),
        None => Err("bitmap header truncated"),
    }
}

/// `e_lfanew` must be sane; the PE signature is only judged when in view
fn screen_pe(head: &[u8]) -> Result<(), Rejection> {
    if head.len() < pe::E_LFANEW_END {
        return Ok(());
    }
    let Some(pe_offset) = pe::pe_header_offset(head) else {
        return Err("implausible e_lfanew");
    };
    match head.get(pe_offset as usize..pe_offset as usize + pe::PE_SIGNATURE.len()) {
        Some(signature) if signature != pe::PE_SIGNATURE => Err("no PE signature"),
        _ => Ok(()),
    }
}

fn check_ole(bytes: &[u8]) -> Result<(), Rejection> {
    let Some(header) = bytes.get(..32) else {
        return Err("compound file header truncated");
    };
    if LittleEndian::read_u16(&header[28..30]) != OLE_BYTE_ORDER {
        return Err("bad byte-order mark");
    }
    match LittleEndian::read_u16(&header[30..32]) {
        9 | 12 => Ok(()),
        _ => Err("bad sector shift"),
    }
}

fn check_elf(bytes: &[u8]) -> Result<(), Rejection> {
    match ElfIdent::parse(bytes) {
        Some(ident) if ident.is_plausible() => Ok(()),
        _ => Err("bad ELF identification"),
    }
}
