//! Multinomial Naive Bayes parameter learning.
//!
//! The learner streams every document through the final scanner to obtain
//! per-feature counts, folds them into per-class totals, and produces
//! log-space parameters with additive smoothing.
use log::{info, warn};

use crate::error::Error;
use crate::index::Document;
use crate::pool;
use crate::scanner::Scanner;

/// Per-document language labels plus per-class document totals. One label
/// per document.
pub struct ClassMap {
    pub doc_lang: Vec<u32>,
    pub counts: Vec<u64>,
}

pub fn generate_cm(items: &[Document], num_langs: usize) -> ClassMap {
    let mut doc_lang = Vec::with_capacity(items.len());
    let mut counts = vec![0u64; num_langs];
    for doc in items {
        doc_lang.push(doc.lang_id);
        counts[doc.lang_id as usize] += 1;
    }
    ClassMap { doc_lang, counts }
}

/// Log class priors with add-`alpha` smoothing.
pub fn learn_pc(counts: &[u64], alpha: f64) -> Result<Vec<f64>, Error> {
    if alpha <= 0.0 {
        return Err(Error::Config(
            "class prior smoothing must be positive".to_string(),
        ));
    }
    let denom = counts.iter().sum::<u64>() as f64 + alpha * counts.len() as f64;
    let pc: Vec<f64> = counts
        .iter()
        .map(|&c| ((c as f64 + alpha) / denom).ln())
        .collect();
    if pc.iter().any(|v| !v.is_finite()) {
        return Err(Error::Numeric("non-finite class prior".to_string()));
    }
    Ok(pc)
}

/// Log per-class feature probabilities with add-`beta` smoothing, laid out
/// feature-major: `ptc[f * num_langs + c]`.
pub fn learn_ptc(
    items: &[Document],
    scanner: &Scanner,
    cm: &ClassMap,
    beta: f64,
    jobs: usize,
    chunksize: usize,
) -> Result<Vec<f64>, Error> {
    if beta <= 0.0 {
        return Err(Error::Config(
            "feature smoothing must be positive".to_string(),
        ));
    }
    let num_feats = scanner.num_feats();
    let num_langs = cm.counts.len();

    info!(
        "rescanning {} documents for {} features",
        items.len(),
        num_feats
    );
    let chunks: Vec<(usize, &[Document])> = items.chunks(chunksize).enumerate().collect();
    let partials = pool::map_tasks(jobs, chunks, |(chunk_id, docs)| {
        ftc_chunk(chunk_id * chunksize, docs, scanner, &cm.doc_lang, num_langs)
    })?;

    let mut ftc = vec![0u64; num_feats * num_langs];
    let mut failed = 0usize;
    for partial in partials {
        let (chunk_ftc, chunk_failed) = partial?;
        failed += chunk_failed;
        for (total, add) in ftc.iter_mut().zip(chunk_ftc) {
            *total += add;
        }
    }
    if failed > 0 && failed * 100 >= items.len() {
        return Err(Error::Custom(format!(
            "{} of {} documents unreadable, aborting",
            failed,
            items.len()
        )));
    }

    let mut ptc = vec![0f64; num_feats * num_langs];
    for c in 0..num_langs {
        let class_total: u64 = (0..num_feats).map(|f| ftc[f * num_langs + c]).sum();
        let denom = class_total as f64 + beta * num_feats as f64;
        for f in 0..num_feats {
            let p = (ftc[f * num_langs + c] as f64 + beta) / denom;
            ptc[f * num_langs + c] = p.ln();
        }
    }
    if ptc.iter().any(|v| !v.is_finite()) {
        return Err(Error::Numeric(
            "non-finite feature log-probability".to_string(),
        ));
    }
    Ok(ptc)
}

fn ftc_chunk(
    doc_base: usize,
    docs: &[Document],
    scanner: &Scanner,
    doc_lang: &[u32],
    num_langs: usize,
) -> Result<(Vec<u64>, usize), Error> {
    let num_feats = scanner.num_feats();
    let mut ftc = vec![0u64; num_feats * num_langs];
    let mut counts = vec![0u32; num_feats];
    let mut failed = 0usize;

    for (offset, doc) in docs.iter().enumerate() {
        let bytes = match doc.read() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("dropping unreadable document {:?}: {}", doc.path, e);
                failed += 1;
                continue;
            }
        };
        counts.iter_mut().for_each(|c| *c = 0);
        scanner.scan_counts(&bytes, &mut counts);
        let class = doc_lang[doc_base + offset] as usize;
        for (f, &count) in counts.iter().enumerate() {
            if count > 0 {
                ftc[f * num_langs + class] += count as u64;
            }
        }
    }
    Ok((ftc, failed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn docs(dir: &Path, entries: &[(u32, &str)]) -> Vec<Document> {
        entries
            .iter()
            .enumerate()
            .map(|(i, (lang, text))| {
                let path = dir.join(format!("doc{}", i));
                fs::write(&path, text).unwrap();
                Document {
                    domain_id: 0,
                    lang_id: *lang,
                    name: format!("doc{}", i),
                    path,
                }
            })
            .collect()
    }

    #[test]
    fn priors_normalize() {
        let pc = learn_pc(&[3, 1], 1.0).unwrap();
        let sum: f64 = pc.iter().map(|v| v.exp()).sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(pc[0] > pc[1]);
    }

    #[test]
    fn zero_smoothing_rejected() {
        assert!(matches!(learn_pc(&[1, 1], 0.0), Err(Error::Config(_))));
    }

    #[test]
    fn feature_probabilities_normalize_per_class() {
        let dir = tempdir().unwrap();
        let items = docs(dir.path(), &[(0, "aaab"), (1, "bbba")]);
        let scanner =
            Scanner::build(&[b"a".to_vec(), b"b".to_vec()]).unwrap();
        let cm = generate_cm(&items, 2);
        let ptc = learn_ptc(&items, &scanner, &cm, 1.0, 1, 10).unwrap();

        for c in 0..2 {
            let sum: f64 = (0..2).map(|f| ptc[f * 2 + c].exp()).sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
        // class 0 favours "a", class 1 favours "b"
        assert!(ptc[0] > ptc[1]);
        assert!(ptc[2 + 1] > ptc[2]);
    }

    #[test]
    fn zero_feature_smoothing_rejected() {
        let dir = tempdir().unwrap();
        let items = docs(dir.path(), &[(0, "a")]);
        let scanner = Scanner::build(&[b"a".to_vec()]).unwrap();
        let cm = generate_cm(&items, 1);
        assert!(matches!(
            learn_ptc(&items, &scanner, &cm, 0.0, 1, 10),
            Err(Error::Config(_))
        ));
    }
}
