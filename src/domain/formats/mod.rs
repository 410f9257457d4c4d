//! Format structure readers
//!
//! Minimal parsers for the structural fields the boundary resolver and the
//! validator need. They never allocate and never read past the slice.

pub mod bmp;
pub mod elf;
pub mod pe;
pub mod png;
pub mod zip;

/// Size information read from the start of a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extent {
    /// Total length (from the header) declared by the structure
    Known(u64),
    /// The structure continues past the available bytes; at least `needed`
    /// bytes from the header are required to decide
    Truncated { needed: u64 },
    /// The bytes do not form a plausible structure
    Invalid,
}

impl Extent {
    /// `Truncated` when `data` is shorter than `needed`, otherwise `None`
    pub(crate) fn require(data: &[u8], needed: u64) -> Option<Extent> {
        if (data.len() as u64) < needed {
            Some(Extent::Truncated { needed })
        } else {
            None
        }
    }
}
