//! Signature registry service
//!
//! Manages the table of format signatures used for carving and builds the
//! multi-pattern header matchers the scanner runs over each window.
//! Uses the Aho-Corasick algorithm for O(n+m+z) multi-pattern matching.

use crate::domain::entities::{BoundaryStrategy, FormatSignature};
use aho_corasick::{AhoCorasick, MatchKind};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

static BUILTIN: LazyLock<SignatureRegistry> = LazyLock::new(SignatureRegistry::builtin_table);

/// Errors raised while building or querying a registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    #[error("Duplicate format id: {0}")]
    DuplicateFormat(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Failed to build header matcher: {0}")]
    Matcher(String),
}

/// Immutable table of format signatures
///
/// # Example
///
/// ```
/// use artefact::domain::services::SignatureRegistry;
///
/// let registry = SignatureRegistry::builtin();
/// let jpg = registry.lookup("jpg").unwrap();
/// assert_eq!(jpg.header(), &[0xFF, 0xD8, 0xFF]);
/// assert!(registry.lookup("xyz").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct SignatureRegistry {
    signatures: Vec<FormatSignature>,
}

impl SignatureRegistry {
    /// The built-in registry, initialised on first use
    pub fn builtin() -> &'static SignatureRegistry {
        &BUILTIN
    }

    /// Creates a registry from custom signatures, checking every invariant
    pub fn new(signatures: Vec<FormatSignature>) -> Result<Self, RegistryError> {
        for (i, signature) in signatures.iter().enumerate() {
            signature
                .check_invariants()
                .map_err(RegistryError::InvalidSignature)?;
            if signatures[..i].iter().any(|s| s.id() == signature.id()) {
                return Err(RegistryError::DuplicateFormat(signature.id().to_string()));
            }
        }
        Ok(Self { signatures })
    }

    fn builtin_table() -> Self {
        Self {
            signatures: vec![
                // FF D8 FF, then an APPn/DQT/SOF marker
                FormatSignature::with_footer(
                    "jpg",
                    &[0xFF, 0xD8, 0xFF],
                    &[0xFF, 0xD9],
                    100 * MIB,
                    "JPEG image",
                ),
                // same stream saved under the .jpeg extension
                FormatSignature::with_footer(
                    "jpeg",
                    &[0xFF, 0xD8, 0xFF],
                    &[0xFF, 0xD9],
                    100 * MIB,
                    "JPEG image (.jpeg, on request)",
                )
                .opt_in(),
                // IEND chunk type plus its fixed CRC
                FormatSignature::with_footer(
                    "png",
                    &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A],
                    &[0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82],
                    50 * MIB,
                    "PNG image",
                ),
                FormatSignature::with_footer("pdf", b"%PDF-", b"%%EOF", 100 * MIB, "PDF document"),
                FormatSignature::with_footer(
                    "zip",
                    b"PK\x03\x04",
                    b"PK\x05\x06",
                    GIB,
                    "ZIP archive",
                )
                .with_strategy(BoundaryStrategy::ZipCentralDirectory),
                FormatSignature::with_footer("gif", b"GIF8", &[0x00, 0x3B], 50 * MIB, "GIF image"),
                FormatSignature::without_footer(
                    "bmp",
                    b"BM",
                    BoundaryStrategy::DeclaredSize { offset: 2 },
                    100 * MIB,
                    "Windows bitmap",
                ),
                FormatSignature::without_footer(
                    "exe",
                    b"MZ",
                    BoundaryStrategy::PeSections,
                    GIB,
                    "PE executable",
                ),
                // OLE2 compound file
                FormatSignature::without_footer(
                    "doc",
                    &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1],
                    BoundaryStrategy::NextHeader,
                    100 * MIB,
                    "Legacy Word document",
                ),
                FormatSignature::without_footer(
                    "elf",
                    &[0x7F, 0x45, 0x4C, 0x46],
                    BoundaryStrategy::ElfSections,
                    512 * MIB,
                    "ELF binary",
                ),
            ],
        }
    }

    /// Returns the signature registered under `format_id`
    pub fn lookup(&self, format_id: &str) -> Result<&FormatSignature, RegistryError> {
        self.signatures
            .iter()
            .find(|s| s.id() == format_id)
            .ok_or_else(|| RegistryError::UnknownFormat(format_id.to_string()))
    }

    /// Returns all signatures in registration order
    pub fn all(&self) -> &[FormatSignature] {
        &self.signatures
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    /// Resolves requested format ids, keeping registration order.
    /// An empty request selects every format that is not opt-in.
    pub fn select<S: AsRef<str>>(&self, format_ids: &[S]) -> Result<Vec<FormatSignature>, RegistryError> {
        for id in format_ids {
            self.lookup(id.as_ref())?;
        }
        Ok(self
            .signatures
            .iter()
            .filter(|s| {
                if format_ids.is_empty() {
                    !s.is_opt_in()
                } else {
                    format_ids.iter().any(|id| id.as_ref() == s.id())
                }
            })
            .cloned()
            .collect())
    }

    /// Builds a header matcher over the requested formats
    pub fn matcher<S: AsRef<str>>(&self, format_ids: &[S]) -> Result<HeaderMatcher, RegistryError> {
        HeaderMatcher::new(self.select(format_ids)?)
    }

    /// Builds a header matcher over every registered format
    pub fn full_matcher(&self) -> Result<HeaderMatcher, RegistryError> {
        HeaderMatcher::new(self.signatures.clone())
    }

    /// Returns a new registry with per-format `max_size` overrides applied
    pub fn with_max_size_overrides(
        &self,
        overrides: &BTreeMap<String, u64>,
    ) -> Result<Self, RegistryError> {
        for id in overrides.keys() {
            self.lookup(id)?;
        }
        let signatures = self
            .signatures
            .iter()
            .map(|s| match overrides.get(s.id()) {
                Some(&max_size) => s.clone().with_max_size(max_size),
                None => s.clone(),
            })
            .collect();
        Self::new(signatures)
    }

    /// Length of the longest registered header
    pub fn largest_header_len(&self) -> usize {
        self.signatures
            .iter()
            .map(|s| s.header().len())
            .max()
            .unwrap_or(0)
    }
}

impl Default for SignatureRegistry {
    fn default() -> Self {
        Self::builtin().clone()
    }
}

/// Multi-pattern header search over a fixed set of signatures
///
/// Signatures sharing identical header bytes are grouped behind one pattern
/// so every member is reported at each hit position. A header that is a
/// prefix of another is reported as its own hit at the same position.
#[derive(Debug, Clone)]
pub struct HeaderMatcher {
    /// Reports every occurrence, overlapping ones included
    overlapping: AhoCorasick,
    /// Reports the occurrence with the leftmost start
    leftmost: AhoCorasick,
    /// Signatures by pattern index
    groups: Vec<Vec<FormatSignature>>,
    largest_header_len: usize,
}

impl HeaderMatcher {
    pub fn new(signatures: Vec<FormatSignature>) -> Result<Self, RegistryError> {
        let mut patterns: Vec<&'static [u8]> = Vec::new();
        let mut groups: Vec<Vec<FormatSignature>> = Vec::new();
        let largest_header_len = signatures.iter().map(|s| s.header().len()).max().unwrap_or(0);

        for signature in signatures {
            match patterns.iter().position(|p| *p == signature.header()) {
                Some(idx) => groups[idx].push(signature),
                None => {
                    patterns.push(signature.header());
                    groups.push(vec![signature]);
                }
            }
        }

        let overlapping =
            AhoCorasick::new(&patterns).map_err(|e| RegistryError::Matcher(e.to_string()))?;
        let leftmost = AhoCorasick::builder()
            .match_kind(MatchKind::LeftmostFirst)
            .build(&patterns)
            .map_err(|e| RegistryError::Matcher(e.to_string()))?;

        Ok(Self {
            overlapping,
            leftmost,
            groups,
            largest_header_len,
        })
    }

    /// Finds every header occurrence in `data` as `(local offset, signature)`
    /// pairs, in automaton order
    pub fn hits<'a>(&'a self, data: &'a [u8]) -> impl Iterator<Item = (usize, &'a FormatSignature)> + 'a {
        self.overlapping
            .find_overlapping_iter(data)
            .flat_map(move |mat| {
                self.groups[mat.pattern().as_usize()]
                    .iter()
                    .map(move |signature| (mat.start(), signature))
            })
    }

    /// Offset of the first header starting at or after `from`
    pub fn next_header_after(&self, data: &[u8], from: usize) -> Option<usize> {
        let tail = data.get(from..)?;
        self.leftmost.find(tail).map(|mat| from + mat.start())
    }

    pub fn signatures(&self) -> impl Iterator<Item = &FormatSignature> {
        self.groups.iter().flatten()
    }

    pub fn largest_header_len(&self) -> usize {
        self.largest_header_len
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_satisfies_invariants() {
        let registry = SignatureRegistry::builtin();
        assert_eq!(registry.len(), 10);
        for signature in registry.all() {
            assert!(signature.check_invariants().is_ok(), "{}", signature);
        }
        assert_eq!(registry.largest_header_len(), 8);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let sig = FormatSignature::with_footer("a", b"AA", b"ZZ", 100, "a");
        assert_eq!(
            SignatureRegistry::new(vec![sig.clone(), sig]).unwrap_err(),
            RegistryError::DuplicateFormat("a".to_string())
        );
    }

    #[test]
    fn select_rejects_unknown_ids() {
        let registry = SignatureRegistry::builtin();
        assert!(registry.select(&["jpg", "nope"]).is_err());
        let default = registry.select::<&str>(&[]).unwrap();
        assert_eq!(default.len(), 9);
        assert!(default.iter().all(|s| s.id() != "jpeg"));
        let picked = registry.select(&["png", "jpg"]).unwrap();
        assert_eq!(picked[0].id(), "jpg");
    }

    #[test]
    fn shared_headers_report_every_format() {
        let a = FormatSignature::with_footer("a", b"HDR", b"END", 100, "a");
        let b = FormatSignature::without_footer("b", b"HDR", BoundaryStrategy::NextHeader, 100, "b");
        let matcher = HeaderMatcher::new(vec![a, b]).unwrap();
        let ids: Vec<_> = matcher.hits(b"..HDR..").map(|(pos, s)| (pos, s.id())).collect();
        assert_eq!(ids, vec![(2, "a"), (2, "b")]);
    }

    #[test]
    fn builtin_jpeg_variants_share_one_header() {
        let matcher = SignatureRegistry::builtin().matcher(&["jpeg", "jpg"]).unwrap();
        let ids: Vec<_> = matcher
            .hits(b"..\xFF\xD8\xFF\xE0")
            .map(|(pos, s)| (pos, s.id()))
            .collect();
        assert_eq!(ids, vec![(2, "jpg"), (2, "jpeg")]);
    }

    #[test]
    fn next_header_after_uses_leftmost_start() {
        let matcher = SignatureRegistry::builtin().full_matcher().unwrap();
        let data = b"xx%PDF-1.4 BM";
        assert_eq!(matcher.next_header_after(data, 0), Some(2));
        assert_eq!(matcher.next_header_after(data, 3), Some(11));
        assert_eq!(matcher.next_header_after(data, 20), None);
    }

    #[test]
    fn max_size_overrides_produce_new_registry() {
        let registry = SignatureRegistry::builtin();
        let overrides = BTreeMap::from([("jpg".to_string(), 4096)]);
        let tuned = registry.with_max_size_overrides(&overrides).unwrap();
        assert_eq!(tuned.lookup("jpg").unwrap().max_size(), 4096);
        assert_eq!(registry.lookup("jpg").unwrap().max_size(), 100 * MIB);
    }
}
