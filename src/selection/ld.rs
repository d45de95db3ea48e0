//! Language-domain feature selection.
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use log::info;

/// Rank features per language by `IG_lang[f, L] - IG_domain[f]` and keep the
/// top `feats_per_lang` of each. Ties break on feature bytes. Features
/// missing from either map score zero for the missing term.
pub fn select_ld_features(
    ig_lang: &HashMap<Vec<u8>, Vec<f64>>,
    ig_domain: Option<&HashMap<Vec<u8>, Vec<f64>>>,
    num_langs: usize,
    feats_per_lang: usize,
) -> Vec<Vec<Vec<u8>>> {
    let mut per_lang = Vec::with_capacity(num_langs);
    for lang in 0..num_langs {
        let mut scored: Vec<(&Vec<u8>, f64)> = ig_lang
            .iter()
            .map(|(feature, gains)| {
                let penalty = ig_domain
                    .and_then(|d| d.get(feature))
                    .and_then(|v| v.first().copied())
                    .unwrap_or(0.0);
                let gain = gains.get(lang).copied().unwrap_or(0.0);
                (feature, gain - penalty)
            })
            .collect();
        scored.sort_unstable_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        per_lang.push(
            scored
                .into_iter()
                .take(feats_per_lang)
                .map(|(feature, _)| feature.clone())
                .collect(),
        );
    }
    per_lang
}

/// Union of the per-language selections, in lexicographic order.
pub fn union_features(per_lang: &[Vec<Vec<u8>>]) -> Vec<Vec<u8>> {
    let set: HashSet<&Vec<u8>> = per_lang.iter().flatten().collect();
    let mut features: Vec<Vec<u8>> = set.into_iter().cloned().collect();
    features.sort_unstable();
    info!(
        "selected {} features across {} languages",
        features.len(),
        per_lang.len()
    );
    features
}
