//! Document tokenizers.
//!
//! All tokenizers share one contract: `tokenize(bytes)` yields
//! `(feature_bytes, count)` pairs whose counts sum to the number of
//! occurrences in the document. Counts are coalesced per feature.
use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;

use crate::scanner::Scanner;

/// Closed set of tokenizer variants.
pub enum Tokenizer {
    /// Every contiguous byte substring of length `min..=max`.
    NGram { min: usize, max: usize },
    /// ASCII-whitespace-separated byte runs.
    Words,
    /// Only the features of a compiled scanner, counted in one pass.
    Scan(Arc<Scanner>),
}

impl Tokenizer {
    pub fn tokenize(&self, bytes: &[u8]) -> Vec<(Vec<u8>, u32)> {
        match self {
            Tokenizer::NGram { min, max } => {
                let mut counts: HashMap<Vec<u8>, u32> = HashMap::new();
                for order in *min..=*max {
                    if order == 0 || order > bytes.len() {
                        continue;
                    }
                    for gram in bytes.windows(order) {
                        *counts.entry(gram.to_vec()).or_insert(0) += 1;
                    }
                }
                counts.into_iter().collect()
            }
            Tokenizer::Words => {
                let mut counts: HashMap<Vec<u8>, u32> = HashMap::new();
                for word in bytes.split(|b| b.is_ascii_whitespace()) {
                    if !word.is_empty() {
                        *counts.entry(word.to_vec()).or_insert(0) += 1;
                    }
                }
                counts.into_iter().collect()
            }
            Tokenizer::Scan(scanner) => {
                let counts = scanner.count(bytes);
                let feats = scanner.features();
                counts
                    .into_iter()
                    .enumerate()
                    .filter(|(_, c)| *c > 0)
                    .map(|(i, c)| (feats[i].clone(), c))
                    .collect()
            }
        }
    }
}

/// Draw `count` byte windows of length `size` uniformly at random.
/// Documents shorter than one window are returned whole, once.
pub fn sample_windows<'a, R: Rng>(
    bytes: &'a [u8],
    count: usize,
    size: usize,
    rng: &mut R,
) -> Vec<&'a [u8]> {
    if bytes.len() <= size {
        return vec![bytes];
    }
    (0..count)
        .map(|_| {
            let start = rng.gen_range(0..=bytes.len() - size);
            &bytes[start..start + size]
        })
        .collect()
}
