//! Window carver
//!
//! Runs the candidate pipeline over one window: locate every owned header,
//! resolve its end, validate the bytes. Holds only immutable state so one
//! instance is shared by every worker.

use crate::domain::entities::{
    CandidateHit, CandidateState, CarvedArtifact, FormatSignature, FormatStats, ScanWindow,
};
use crate::domain::repositories::{ByteSource, SourceError};
use crate::domain::services::{
    BoundaryResolver, EndPredictor, HeaderMatcher, RegistryError, Resolution, SignatureRegistry,
    Validator,
};
use bytes::Bytes;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Smallest re-read when a candidate outgrows its window
const MIN_REREAD: u64 = 64 * 1024;
/// Bytes after a header screened before its end is searched for
const SCREEN_LEN: usize = 512;

/// A validated candidate waiting for its sequence number
#[derive(Debug, Clone)]
pub struct CarvedRange {
    pub format_id: &'static str,
    pub extension: &'static str,
    pub origin_offset: u64,
    pub content: Bytes,
}

impl CarvedRange {
    pub fn end_offset(&self) -> u64 {
        self.origin_offset + self.content.len() as u64
    }

    pub fn into_artifact(self, sequence: u64) -> CarvedArtifact {
        CarvedArtifact::new(
            sequence,
            self.format_id,
            self.extension,
            self.origin_offset,
            self.content,
        )
    }
}

/// Everything a window produced, ready to be committed in window order
#[derive(Debug, Default)]
pub struct WindowOutcome {
    pub index: usize,
    pub owned_len: u64,
    pub owned_end: u64,
    /// Validated candidates sorted by origin offset
    pub carved: Vec<CarvedRange>,
    pub stats: BTreeMap<&'static str, FormatStats>,
}

/// Carves single windows
pub struct WindowCarver {
    source: Arc<dyn ByteSource>,
    matcher: HeaderMatcher,
    resolver: BoundaryResolver,
    validator: Validator,
    scanned: Arc<AtomicU64>,
}

impl WindowCarver {
    /// Builds a carver for the requested formats. The next-header fallback
    /// still sees every format of `registry`.
    pub fn new<S: AsRef<str>>(
        source: Arc<dyn ByteSource>,
        registry: &SignatureRegistry,
        formats: &[S],
        predictor: Option<Arc<dyn EndPredictor>>,
        scanned: Arc<AtomicU64>,
    ) -> Result<Self, RegistryError> {
        let mut resolver = BoundaryResolver::new(registry)?;
        if let Some(predictor) = predictor {
            resolver = resolver.with_predictor(predictor);
        }
        Ok(Self {
            source,
            matcher: registry.matcher(formats)?,
            resolver,
            validator: Validator::new(),
            scanned,
        })
    }

    /// Carves every candidate whose header this window owns
    pub fn carve(&self, window: &ScanWindow) -> Result<WindowOutcome, SourceError> {
        let mut outcome = WindowOutcome {
            index: window.index(),
            owned_len: window.owned_len() as u64,
            owned_end: window.owned_end(),
            ..Default::default()
        };

        for (pos, signature) in self.matcher.hits(window.data()) {
            let offset = window.start() + pos as u64;
            if !window.owns(offset) {
                continue;
            }
            let stats = outcome.stats.entry(signature.id()).or_default();
            stats.candidates += 1;

            let mut hit = CandidateHit::located(signature.id(), offset);
            if let Err(reason) = self.validator.screen(&self.head(window, offset)?, signature) {
                hit.reject_invalid();
                tracing::debug!("{} @{}: rejected ({})", signature.id(), offset, reason);
                stats.rejected += 1;
                continue;
            }

            let (resolution, reread) = match self.resolver.resolve(window, offset, signature) {
                Resolution::NeedMoreData => {
                    let available = window.tail_from(offset).len() as u64;
                    self.resolve_reread(offset, available, signature)?
                }
                resolution => (resolution, None),
            };

            match resolution {
                Resolution::End(end) => hit.resolve(end),
                Resolution::NotFound(reason) => {
                    tracing::debug!("{} @{}: unresolved ({})", signature.id(), offset, reason);
                    hit.reject_unresolved();
                }
                Resolution::NeedMoreData => hit.reject_unresolved(),
            }

            let content = match (hit.state(), hit.end_offset()) {
                (CandidateState::Resolved, Some(end)) => {
                    reread.as_ref().unwrap_or(window).extract(offset..end)
                }
                _ => None,
            };
            let Some(content) = content else {
                stats.unresolved += 1;
                continue;
            };

            match self.validator.check(&content, signature) {
                Ok(()) => {
                    hit.validate(true);
                    outcome.carved.push(CarvedRange {
                        format_id: signature.id(),
                        extension: signature.extension(),
                        origin_offset: offset,
                        content,
                    });
                }
                Err(reason) => {
                    hit.validate(false);
                    tracing::debug!("{} @{}: rejected ({})", signature.id(), offset, reason);
                    stats.rejected += 1;
                }
            }
        }

        outcome.carved.sort_by_key(|range| range.origin_offset);
        self.scanned.fetch_add(outcome.owned_len, Ordering::Relaxed);
        Ok(outcome)
    }

    /// The first `SCREEN_LEN` bytes of the candidate at `offset`, read from
    /// the source when the window ends sooner
    fn head<'w>(&self, window: &'w ScanWindow, offset: u64) -> Result<Cow<'w, [u8]>, SourceError> {
        let tail = window.tail_from(offset);
        if tail.len() >= SCREEN_LEN || window.at_eof() {
            return Ok(Cow::Borrowed(tail));
        }
        Ok(Cow::Owned(self.source.read_vec_at(offset, SCREEN_LEN)?))
    }

    /// Re-reads the source at the header, growing the buffer up to
    /// `max_size` until the resolver can answer. The first read already
    /// exceeds the `available` bytes the window held.
    fn resolve_reread(
        &self,
        offset: u64,
        available: u64,
        signature: &FormatSignature,
    ) -> Result<(Resolution, Option<ScanWindow>), SourceError> {
        let max_size = signature.max_size();
        let mut size = available.saturating_mul(4).max(MIN_REREAD).min(max_size);

        loop {
            let data = self.source.read_vec_at(offset, size as usize)?;
            let at_eof = offset + data.len() as u64 >= self.source.len();
            let view = ScanWindow::detached(offset, data, at_eof);

            match self.resolver.resolve(&view, offset, signature) {
                Resolution::NeedMoreData if size < max_size && !at_eof => {
                    size = size.saturating_mul(4).min(max_size);
                    tracing::trace!("{} @{}: re-reading {} bytes", signature.id(), offset, size);
                }
                Resolution::NeedMoreData => {
                    return Ok((Resolution::NotFound("no end within max size"), None));
                }
                resolution => return Ok((resolution, Some(view))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::services::ChunkScanner;

    /// Counts every byte handed out by the inner source
    struct Metered {
        inner: Vec<u8>,
        read: AtomicU64,
    }

    impl ByteSource for Metered {
        fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize, SourceError> {
            let n = self.inner.read_at(offset, buf)?;
            self.read.fetch_add(n as u64, Ordering::Relaxed);
            Ok(n)
        }

        fn len(&self) -> u64 {
            self.inner.len() as u64
        }

        fn describe(&self) -> &str {
            "<metered>"
        }
    }

    fn carver(input: Vec<u8>, formats: &[&str]) -> (WindowCarver, Arc<dyn ByteSource>) {
        carver_over(Arc::new(input), formats)
    }

    fn carver_over(source: Arc<dyn ByteSource>, formats: &[&str]) -> (WindowCarver, Arc<dyn ByteSource>) {
        let carver = WindowCarver::new(
            Arc::clone(&source),
            SignatureRegistry::builtin(),
            formats,
            None,
            Arc::new(AtomicU64::new(0)),
        )
        .unwrap();
        (carver, source)
    }

    fn jpeg(body: usize) -> Vec<u8> {
        let mut jpg = vec![0xFF, 0xD8, 0xFF, 0xE0];
        jpg.extend(std::iter::repeat_n(b'X', body));
        jpg.extend_from_slice(&[0xFF, 0xD9]);
        jpg
    }

    #[test]
    fn carves_owned_candidates_in_offset_order() {
        let mut input = vec![0u8; 10];
        input.extend(jpeg(20));
        input.extend(vec![0u8; 5]);
        input.extend(jpeg(3));
        let (carver, source) = carver(input, &["jpg"]);
        let window = ChunkScanner::new(source, 1024, 16).next_window().unwrap().unwrap();

        let outcome = carver.carve(&window).unwrap();
        let offsets: Vec<_> = outcome.carved.iter().map(|r| r.origin_offset).collect();
        assert_eq!(offsets, vec![10, 41]);
        assert_eq!(outcome.carved[0].content.len(), 26);
        assert_eq!(outcome.stats["jpg"].candidates, 2);
    }

    #[test]
    fn candidate_longer_than_window_is_reread() {
        let mut input = vec![0u8; 4];
        input.extend(jpeg(5000));
        input.extend(vec![0u8; 100]);
        let (carver, source) = carver(input, &["jpg"]);
        let window = ChunkScanner::new(source, 256, 16).next_window().unwrap().unwrap();

        let outcome = carver.carve(&window).unwrap();
        assert_eq!(outcome.carved.len(), 1);
        assert_eq!(outcome.carved[0].content.len(), 5006);
    }

    #[test]
    fn reread_starts_past_the_window() {
        let mut input = vec![0u8; 4];
        input.extend(jpeg(300_000));
        let len = input.len() as u64;
        let metered = Arc::new(Metered {
            inner: input,
            read: AtomicU64::new(0),
        });
        let (carver, source) = carver_over(metered.clone(), &["jpg"]);
        let window = ChunkScanner::new(source, 128 * 1024, 16).next_window().unwrap().unwrap();
        let window_bytes = metered.read.load(Ordering::Relaxed);

        let outcome = carver.carve(&window).unwrap();
        assert_eq!(outcome.carved[0].content.len() as u64, len - 4);
        // one re-read from the header to the end of input
        assert_eq!(metered.read.load(Ordering::Relaxed) - window_bytes, len - 4);
    }

    #[test]
    fn implausible_header_is_never_resolved() {
        // 'BM' with a non-zero reserved field and a huge declared size
        let mut input = vec![0u8; 8];
        input.extend_from_slice(b"BM\xFF\xFF\xFF\x7F\x01\x02\x03\x04\x36\x00\x00\x00\x28\x00\x00\x00");
        input.resize(64 * 1024, 0x11);
        let metered = Arc::new(Metered {
            inner: input,
            read: AtomicU64::new(0),
        });
        let (carver, source) = carver_over(metered.clone(), &["bmp"]);
        let window = ChunkScanner::new(source, 4096, 16).next_window().unwrap().unwrap();
        let window_bytes = metered.read.load(Ordering::Relaxed);

        let outcome = carver.carve(&window).unwrap();
        assert!(outcome.carved.is_empty());
        assert_eq!(outcome.stats["bmp"].rejected, 1);
        assert_eq!(metered.read.load(Ordering::Relaxed), window_bytes);
    }

    #[test]
    fn small_artifacts_do_not_pin_the_window() {
        let mut input = vec![0u8; 10];
        input.extend(jpeg(20));
        input.resize(8192, 0);
        let (carver, source) = carver(input, &["jpg"]);
        let window = ChunkScanner::new(source, 8192, 16).next_window().unwrap().unwrap();

        let outcome = carver.carve(&window).unwrap();
        let content = &outcome.carved[0].content;
        assert!(!window.data().as_ptr_range().contains(&content.as_ptr()));
    }

    #[test]
    fn counts_rejections_and_unresolved() {
        let mut input = vec![0xFF, 0xD8, 0xFF, 0x00, 0xFF, 0xD9]; // bad marker
        input.extend_from_slice(&[0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3]); // no footer
        let (carver, source) = carver(input, &["jpg"]);
        let window = ChunkScanner::new(source, 1024, 16).next_window().unwrap().unwrap();

        let outcome = carver.carve(&window).unwrap();
        assert!(outcome.carved.is_empty());
        let stats = outcome.stats["jpg"];
        assert_eq!((stats.candidates, stats.rejected, stats.unresolved), (2, 1, 1));
    }
}
