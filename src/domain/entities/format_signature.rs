//! Format signature entity
//!
//! Represents the magic bytes (header and optional footer) that identify
//! a file format, together with the strategy used to find where a carved
//! file ends. This is the foundation of file carving.

use std::fmt;

/// How the end of a candidate file is determined once its header is found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryStrategy {
    /// End is the first footer occurrence after the header
    Footer,
    /// ZIP: footer is the end-of-central-directory record, whose declared
    /// comment length extends the file past the footer bytes
    ZipCentralDirectory,
    /// Little-endian u32 byte count stored at `offset` from the header (BMP)
    DeclaredSize { offset: usize },
    /// Extent of the PE section table
    PeSections,
    /// Extent of the ELF program/section header tables and segments
    ElfSections,
    /// No derivable size: next registered header, or `max_size`
    NextHeader,
}

impl BoundaryStrategy {
    /// Returns whether this strategy needs a footer
    pub fn uses_footer(&self) -> bool {
        matches!(
            self,
            BoundaryStrategy::Footer | BoundaryStrategy::ZipCentralDirectory
        )
    }
}

impl fmt::Display for BoundaryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryStrategy::Footer => write!(f, "footer"),
            BoundaryStrategy::ZipCentralDirectory => write!(f, "central directory"),
            BoundaryStrategy::DeclaredSize { offset } => write!(f, "size field @{}", offset),
            BoundaryStrategy::PeSections => write!(f, "PE sections"),
            BoundaryStrategy::ElfSections => write!(f, "ELF tables"),
            BoundaryStrategy::NextHeader => write!(f, "next header"),
        }
    }
}

/// A format signature containing magic bytes for file identification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSignature {
    /// Short format identifier (e.g. `jpg`)
    id: &'static str,
    /// The header bytes (magic bytes at the start of the file)
    header: &'static [u8],
    /// Optional footer bytes (magic bytes at the end of the file)
    footer: Option<&'static [u8]>,
    /// Maximum plausible file size in bytes (for carving limits)
    max_size: u64,
    /// Human-readable description
    description: &'static str,
    /// File extension used when persisting artifacts
    extension: &'static str,
    /// How the end of a candidate is located
    strategy: BoundaryStrategy,
    /// Only carved when requested by id
    opt_in: bool,
}

impl FormatSignature {
    /// Creates a signature that ends at its footer
    pub fn with_footer(
        id: &'static str,
        header: &'static [u8],
        footer: &'static [u8],
        max_size: u64,
        description: &'static str,
    ) -> Self {
        Self {
            id,
            header,
            footer: Some(footer),
            max_size,
            description,
            extension: id,
            strategy: BoundaryStrategy::Footer,
            opt_in: false,
        }
    }

    /// Creates a footerless signature resolved by `strategy`
    pub fn without_footer(
        id: &'static str,
        header: &'static [u8],
        strategy: BoundaryStrategy,
        max_size: u64,
        description: &'static str,
    ) -> Self {
        Self {
            id,
            header,
            footer: None,
            max_size,
            description,
            extension: id,
            strategy,
            opt_in: false,
        }
    }

    /// Overrides the boundary strategy
    pub fn with_strategy(mut self, strategy: BoundaryStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Overrides the file extension
    pub fn with_extension(mut self, extension: &'static str) -> Self {
        self.extension = extension;
        self
    }

    /// Overrides the maximum plausible size
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    /// Leaves this format out of the default selection; it is carved only
    /// when requested by id
    pub fn opt_in(mut self) -> Self {
        self.opt_in = true;
        self
    }

    pub fn is_opt_in(&self) -> bool {
        self.opt_in
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn header(&self) -> &'static [u8] {
        self.header
    }

    pub fn footer(&self) -> Option<&'static [u8]> {
        self.footer
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    pub fn extension(&self) -> &'static str {
        self.extension
    }

    pub fn strategy(&self) -> BoundaryStrategy {
        self.strategy
    }

    /// Checks if the given data starts with this signature's header
    pub fn matches_header(&self, data: &[u8]) -> bool {
        data.starts_with(self.header)
    }

    /// Checks if the given data ends with this signature's footer.
    /// Always false for footerless formats.
    pub fn matches_footer(&self, data: &[u8]) -> bool {
        match self.footer {
            Some(footer) => data.len() >= self.header.len() + footer.len() && data.ends_with(footer),
            None => false,
        }
    }

    /// Checks the structural invariants of a signature, returning a
    /// description of the first violation
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("format id is empty".to_string());
        }
        if self.header.is_empty() {
            return Err(format!("{}: header is empty", self.id));
        }
        if self.max_size == 0 {
            return Err(format!("{}: max_size is zero", self.id));
        }
        match (self.footer, self.strategy.uses_footer()) {
            (Some([]), _) => Err(format!("{}: footer is empty", self.id)),
            (None, true) => Err(format!(
                "{}: strategy '{}' requires a footer",
                self.id, self.strategy
            )),
            (Some(_), false) => Err(format!(
                "{}: footer given but strategy is '{}'",
                self.id, self.strategy
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for FormatSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn footer_format_matches_both_ends() {
        let sig = FormatSignature::with_footer("jpg", &[0xFF, 0xD8, 0xFF], &[0xFF, 0xD9], 1024, "JPEG");
        let data = [0xFF, 0xD8, 0xFF, 0x00, 0xFF, 0xD9];
        assert!(sig.matches_header(&data));
        assert!(sig.matches_footer(&data));
        assert!(!sig.matches_footer(&[0xFF, 0xD8, 0xFF, 0xD9]));
    }

    #[test]
    fn footerless_without_strategy_is_rejected() {
        let sig = FormatSignature::without_footer("x", b"XX", BoundaryStrategy::Footer, 10, "x");
        assert!(sig.check_invariants().is_err());
    }

    #[test]
    fn footer_with_size_strategy_is_rejected() {
        let sig = FormatSignature::with_footer("x", b"XX", b"YY", 10, "x")
            .with_strategy(BoundaryStrategy::NextHeader);
        assert!(sig.check_invariants().is_err());
    }

    #[test]
    fn empty_header_is_rejected() {
        let sig = FormatSignature::without_footer("x", b"", BoundaryStrategy::NextHeader, 10, "x");
        assert!(sig.check_invariants().is_err());
    }
}
