//! Boundary resolver service
//!
//! Determines where a candidate ends once its header has been located.
//! Every answer is relative to the bytes available in the window: when the
//! end may lie beyond them the resolver asks for more data instead of
//! truncating.

use super::end_predictor::EndPredictor;
use super::signature_registry::{HeaderMatcher, RegistryError, SignatureRegistry};
use crate::domain::entities::{BoundaryStrategy, FormatSignature, ScanWindow};
use crate::domain::formats::{self, Extent};
use memchr::memmem::Finder;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Outcome of a boundary search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Global end offset (exclusive)
    End(u64),
    /// The end may lie past the window; retry with more bytes
    NeedMoreData,
    /// No end within `max_size` or the available data
    NotFound(&'static str),
}

/// Resolves candidate end offsets
#[derive(Clone)]
pub struct BoundaryResolver {
    /// Every registered header, for the next-header fallback
    boundaries: HeaderMatcher,
    footers: BTreeMap<&'static str, Finder<'static>>,
    predictor: Option<Arc<dyn EndPredictor>>,
}

impl fmt::Debug for BoundaryResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundaryResolver")
            .field("footers", &self.footers.keys().collect::<Vec<_>>())
            .field("predictor", &self.predictor.as_ref().map(|p| p.name().to_string()))
            .finish()
    }
}

impl BoundaryResolver {
    pub fn new(registry: &SignatureRegistry) -> Result<Self, RegistryError> {
        let footers = registry
            .all()
            .iter()
            .filter_map(|s| s.footer().map(|footer| (s.id(), Finder::new(footer))))
            .collect();
        Ok(Self {
            boundaries: registry.full_matcher()?,
            footers,
            predictor: None,
        })
    }

    /// Consults `predictor` first for formats without a derivable size
    pub fn with_predictor(mut self, predictor: Arc<dyn EndPredictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    /// Resolves the end of the candidate whose header starts at the global
    /// `header_offset` in `window`.
    ///
    /// Never returns an end at or before the header, nor past
    /// `header_offset + max_size`.
    pub fn resolve(
        &self,
        window: &ScanWindow,
        header_offset: u64,
        signature: &FormatSignature,
    ) -> Resolution {
        let view = window.tail_from(header_offset);
        if !signature.matches_header(view) {
            return Resolution::NotFound("header not in window");
        }
        let span = View {
            data: view,
            at_eof: window.at_eof(),
            max_size: signature.max_size(),
        };

        let resolution = match signature.strategy() {
            BoundaryStrategy::Footer => self.footer_end(&span, signature),
            BoundaryStrategy::ZipCentralDirectory => self.central_directory_end(&span, signature),
            BoundaryStrategy::DeclaredSize { offset } => {
                span.structural(formats::bmp::declared_size(view, offset))
            }
            BoundaryStrategy::PeSections => span.structural(formats::pe::image_extent(view)),
            BoundaryStrategy::ElfSections => span.structural(formats::elf::image_extent(view)),
            BoundaryStrategy::NextHeader => self.next_header_end(&span, signature),
        };

        match resolution {
            Resolution::End(len) => Resolution::End(header_offset + len),
            other => other,
        }
    }

    fn find_footer(&self, signature: &FormatSignature, haystack: &[u8]) -> Option<usize> {
        match self.footers.get(signature.id()) {
            Some(finder) if Some(finder.needle()) == signature.footer() => finder.find(haystack),
            _ => signature
                .footer()
                .and_then(|footer| memchr::memmem::find(haystack, footer)),
        }
    }

    fn footer_end(&self, span: &View<'_>, signature: &FormatSignature) -> Resolution {
        let Some(footer) = signature.footer() else {
            return Resolution::NotFound("format has no footer");
        };
        let hlen = signature.header().len();
        let region = span.searchable(hlen);
        match self.find_footer(signature, region) {
            Some(pos) => Resolution::End((hlen + pos + footer.len()) as u64),
            None if span.exhausted() => Resolution::NotFound("footer not found"),
            None => Resolution::NeedMoreData,
        }
    }

    fn central_directory_end(&self, span: &View<'_>, signature: &FormatSignature) -> Resolution {
        let hlen = signature.header().len();
        let region = span.searchable(hlen);
        match self.find_footer(signature, region) {
            Some(pos) => {
                let eocd = hlen + pos;
                match formats::zip::eocd_record_len(&span.data[eocd..]) {
                    Extent::Known(len) => span.settle(eocd as u64 + len),
                    _ => span.settle((eocd + formats::zip::EOCD_LEN) as u64),
                }
            }
            None if span.exhausted() => Resolution::NotFound("end of central directory not found"),
            None => Resolution::NeedMoreData,
        }
    }

    fn next_header_end(&self, span: &View<'_>, signature: &FormatSignature) -> Resolution {
        let hlen = signature.header().len();
        if let Some(predictor) = &self.predictor {
            match predictor.predict_len(signature, span.data, span.at_eof) {
                Some(len) if len > hlen as u64 => return span.settle(len),
                _ => {}
            }
        }

        let limit = span.limit();
        match self.boundaries.next_header_after(&span.data[..limit], hlen) {
            Some(pos) => Resolution::End(pos as u64),
            None if span.exhausted() => Resolution::End(limit as u64),
            None => Resolution::NeedMoreData,
        }
    }
}

/// The bytes from a header to the end of the available data
struct View<'a> {
    data: &'a [u8],
    at_eof: bool,
    max_size: u64,
}

impl View<'_> {
    /// Bytes that may belong to the candidate
    fn limit(&self) -> usize {
        (self.data.len() as u64).min(self.max_size) as usize
    }

    /// Bytes after the header that may belong to the candidate
    fn searchable(&self, header_len: usize) -> &[u8] {
        let limit = self.limit();
        &self.data[header_len.min(limit)..limit]
    }

    /// No further bytes can change the answer
    fn exhausted(&self) -> bool {
        self.at_eof || self.data.len() as u64 >= self.max_size
    }

    /// Maps a wanted length onto the available data
    fn settle(&self, wanted: u64) -> Resolution {
        let wanted = wanted.min(self.max_size);
        let available = self.data.len() as u64;
        if wanted <= available {
            Resolution::End(wanted)
        } else if self.at_eof {
            Resolution::End(available)
        } else {
            Resolution::NeedMoreData
        }
    }

    fn structural(&self, extent: Extent) -> Resolution {
        match extent {
            Extent::Known(len) => self.settle(len),
            Extent::Truncated { needed } if needed > self.max_size => {
                Resolution::NotFound("structure exceeds max size")
            }
            Extent::Truncated { .. } if self.exhausted() => Resolution::NotFound("truncated structure"),
            Extent::Truncated { .. } => Resolution::NeedMoreData,
            Extent::Invalid => Resolution::NotFound("implausible structure"),
        }
    }
}
