//! End predictors
//!
//! Pluggable guessers for where a candidate without a derivable size ends.
//! A predictor may abstain, in which case the resolver falls back to the
//! next-header heuristic.

use crate::domain::entities::FormatSignature;
use std::sync::LazyLock;

/// Guesses the length of a candidate whose format carries no size
pub trait EndPredictor: Send + Sync {
    /// Predicted length from the header, or `None` to abstain.
    /// `data` starts at the header; `at_eof` tells whether it runs to the end
    /// of input.
    fn predict_len(&self, signature: &FormatSignature, data: &[u8], at_eof: bool) -> Option<u64>;

    fn name(&self) -> &str;
}

const ENTROPY_LUT_SIZE: usize = 4097;

static ENTROPY_LUT: LazyLock<[f32; ENTROPY_LUT_SIZE]> = LazyLock::new(|| {
    let mut lut = [0.0f32; ENTROPY_LUT_SIZE];
    for (c, entry) in lut.iter_mut().enumerate().skip(1) {
        let cf = c as f32;
        *entry = cf * cf.log2();
    }
    lut
});

/// Shannon entropy of `data` in bits per byte
pub fn shannon_entropy(data: &[u8]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let mut freq = [0u32; 256];
    for &byte in data {
        freq[byte as usize] += 1;
    }
    let n = data.len() as f32;
    let sum: f32 = freq
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| match ENTROPY_LUT.get(c as usize) {
            Some(&v) => v,
            None => c as f32 * (c as f32).log2(),
        })
        .sum();
    n.log2() - sum / n
}

/// Predicts the end at the first run of near-constant blocks, which is how
/// sector slack and zero fill look after the last used sector of a file
#[derive(Debug, Clone, Copy)]
pub struct EntropyEndPredictor {
    block_size: usize,
    slack_blocks: usize,
    threshold: f32,
}

impl Default for EntropyEndPredictor {
    fn default() -> Self {
        Self {
            block_size: 512,
            slack_blocks: 2,
            threshold: 0.5,
        }
    }
}

impl EntropyEndPredictor {
    pub fn new(block_size: usize, slack_blocks: usize, threshold: f32) -> Self {
        Self {
            block_size: block_size.max(1),
            slack_blocks: slack_blocks.max(1),
            threshold,
        }
    }
}

impl EndPredictor for EntropyEndPredictor {
    fn predict_len(&self, signature: &FormatSignature, data: &[u8], _at_eof: bool) -> Option<u64> {
        let first = signature.header().len().div_ceil(self.block_size).max(1);
        let mut run_start = 0;
        let mut run_len = 0;

        for (i, block) in data.chunks_exact(self.block_size).enumerate().skip(first) {
            if shannon_entropy(block) >= self.threshold {
                run_len = 0;
                continue;
            }
            if run_len == 0 {
                run_start = i;
            }
            run_len += 1;
            if run_len >= self.slack_blocks {
                return Some((run_start * self.block_size) as u64);
            }
        }

        None
    }

    fn name(&self) -> &str {
        "entropy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::BoundaryStrategy;

    fn doc() -> FormatSignature {
        FormatSignature::without_footer("doc", b"DOC", BoundaryStrategy::NextHeader, 1 << 20, "d")
    }

    fn noisy(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[test]
    fn entropy_of_constant_and_spread_data() {
        assert_eq!(shannon_entropy(&[0u8; 512]), 0.0);
        let all: Vec<u8> = (0..=255).collect();
        assert!((shannon_entropy(&all) - 8.0).abs() < 1e-3);
    }

    #[test]
    fn predicts_start_of_zero_fill() {
        let mut data = noisy(1536);
        data.extend_from_slice(&[0u8; 1024]);
        data.extend(noisy(512));
        let predictor = EntropyEndPredictor::default();
        assert_eq!(predictor.predict_len(&doc(), &data, false), Some(1536));
    }

    #[test]
    fn abstains_without_slack() {
        let mut data = noisy(2048);
        data.extend_from_slice(&[0u8; 512]); // one block is not enough
        assert_eq!(EntropyEndPredictor::default().predict_len(&doc(), &data, true), None);
    }
}
