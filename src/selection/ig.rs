//! Information-gain weighting.
//!
//! For every selected feature, the reduction in class-label entropy from
//! observing the feature. Binarized mode yields a one-vs-rest IG per class
//! over document presence; plain mode yields a single IG over the full class
//! distribution from raw occurrence counts.
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use log::info;

use crate::buckets::for_each_record;
use crate::error::Error;
use crate::pool;

/// Entropy of an unnormalized count vector, in nats. Non-positive cells
/// contribute nothing (`0 log 0 = 0`).
fn entropy(counts: &[f64]) -> f64 {
    let total: f64 = counts.iter().filter(|&&c| c > 0.0).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let mut h = 0.0;
    for &c in counts {
        if c > 0.0 {
            let p = c / total;
            h -= p * p.ln();
        }
    }
    h
}

/// Information gain of every feature in `features` against the class
/// labelling `doc_classes`, with `dist` documents per class.
///
/// Returns one IG vector per feature: per-class when `binarize` is set,
/// length 1 otherwise. Features with no surviving records are absent.
pub fn compute_ig(
    b_dirs: &[PathBuf],
    features: &HashSet<Vec<u8>>,
    doc_classes: &[u32],
    dist: &[u32],
    binarize: bool,
    jobs: usize,
) -> Result<HashMap<Vec<u8>, Vec<f64>>, Error> {
    let partials = pool::map_tasks(jobs, b_dirs.to_vec(), |dir| {
        ig_bucket(&dir, features, doc_classes, dist, binarize)
    })?;
    let mut ig = HashMap::new();
    for partial in partials {
        ig.extend(partial?);
    }
    info!(
        "computed {} information gain for {} features",
        if binarize { "binarized" } else { "plain" },
        ig.len()
    );
    Ok(ig)
}

fn ig_bucket(
    dir: &Path,
    features: &HashSet<Vec<u8>>,
    doc_classes: &[u32],
    dist: &[u32],
    binarize: bool,
) -> Result<HashMap<Vec<u8>, Vec<f64>>, Error> {
    let num_classes = dist.len();
    let mut tallies: HashMap<Vec<u8>, Vec<u64>> = HashMap::new();
    for_each_record(dir, |rec| {
        if !features.contains(&rec.feature) {
            return;
        }
        let class = doc_classes[rec.doc_id as usize] as usize;
        let t = tallies
            .entry(rec.feature)
            .or_insert_with(|| vec![0u64; num_classes]);
        t[class] += if binarize { 1 } else { rec.count as u64 };
    })?;

    let total: f64 = dist.iter().map(|&n| n as f64).sum();
    let mut out = HashMap::with_capacity(tallies.len());
    for (feature, t) in tallies {
        let ig = if binarize {
            binarized_ig(&t, dist, total)
        } else {
            vec![plain_ig(&t, dist, total)]
        };
        if ig.iter().any(|v| !v.is_finite()) {
            return Err(Error::Numeric(format!(
                "non-finite information gain for feature {}",
                crate::features::escape_bytes(&feature)
            )));
        }
        out.insert(feature, ig);
    }
    Ok(out)
}

/// One-vs-rest IG per class; `t` holds document presence counts.
fn binarized_ig(t: &[u64], dist: &[u32], total: f64) -> Vec<f64> {
    let x: f64 = t.iter().map(|&v| v as f64).sum();
    dist.iter()
        .zip(t)
        .map(|(&n_c, &t_c)| {
            let (n_c, t_c) = (n_c as f64, t_c as f64);
            let prior = entropy(&[n_c, total - n_c]);
            let present = entropy(&[t_c, x - t_c]);
            let absent = entropy(&[n_c - t_c, (total - n_c) - (x - t_c)]);
            prior - (x / total) * present - ((total - x) / total) * absent
        })
        .collect()
}

/// Scalar IG over the whole class distribution; `t` holds raw counts.
fn plain_ig(t: &[u64], dist: &[u32], total: f64) -> f64 {
    let x: f64 = t.iter().map(|&v| v as f64).sum();
    let prior: Vec<f64> = dist.iter().map(|&n| n as f64).collect();
    let present: Vec<f64> = t.iter().map(|&v| v as f64).collect();
    let absent: Vec<f64> = prior
        .iter()
        .zip(&present)
        .map(|(n, t)| n - t)
        .collect();
    entropy(&prior) - (x / total) * entropy(&present)
        - ((total - x) / total) * entropy(&absent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buckets::write_record;
    use std::fs;
    use tempfile::tempdir;

    fn ln2() -> f64 {
        2f64.ln()
    }

    #[test]
    fn entropy_basics() {
        assert_eq!(entropy(&[]), 0.0);
        assert_eq!(entropy(&[5.0]), 0.0);
        assert!((entropy(&[1.0, 1.0]) - ln2()).abs() < 1e-12);
        // zero cells are ignored
        assert!((entropy(&[1.0, 0.0, 1.0]) - ln2()).abs() < 1e-12);
    }

    #[test]
    fn perfectly_discriminative_feature() {
        // 2 classes, 2 docs each; feature present in exactly the class-0 docs
        let t = vec![2u64, 0];
        let dist = vec![2u32, 2];
        let ig = binarized_ig(&t, &dist, 4.0);
        // knowing presence resolves the one-vs-rest label completely
        assert!((ig[0] - ln2()).abs() < 1e-12);
        assert!((ig[1] - ln2()).abs() < 1e-12);
    }

    #[test]
    fn uninformative_feature_has_zero_gain() {
        // present in every document of both classes
        let t = vec![2u64, 2];
        let dist = vec![2u32, 2];
        let ig = binarized_ig(&t, &dist, 4.0);
        assert!(ig[0].abs() < 1e-12);
        assert!(ig[1].abs() < 1e-12);
    }

    #[test]
    fn bucket_streaming_matches_direct_computation() {
        let dir = tempdir().unwrap();
        let b_dir = dir.path().join("bucket000");
        fs::create_dir_all(&b_dir).unwrap();
        let mut buf = Vec::new();
        // feature "ab" in docs 0 (class 0) and 1 (class 0); "cd" in doc 2 (class 1)
        write_record(&mut buf, b"ab", 0, 3).unwrap();
        write_record(&mut buf, b"ab", 1, 1).unwrap();
        write_record(&mut buf, b"cd", 2, 2).unwrap();
        fs::write(b_dir.join("chunk00000.bin"), &buf).unwrap();

        let features: HashSet<Vec<u8>> = [b"ab".to_vec(), b"cd".to_vec()].into_iter().collect();
        let doc_classes = vec![0u32, 0, 1];
        let dist = vec![2u32, 1];
        let ig = compute_ig(
            &[b_dir],
            &features,
            &doc_classes,
            &dist,
            true,
            1,
        )
        .unwrap();

        let expected_ab = binarized_ig(&[2, 0], &dist, 3.0);
        assert_eq!(ig[b"ab".as_slice()], expected_ab);
        let expected_cd = binarized_ig(&[0, 1], &dist, 3.0);
        assert_eq!(ig[b"cd".as_slice()], expected_cd);
    }

    #[test]
    fn unselected_features_are_skipped() {
        let dir = tempdir().unwrap();
        let b_dir = dir.path().join("bucket000");
        fs::create_dir_all(&b_dir).unwrap();
        let mut buf = Vec::new();
        write_record(&mut buf, b"zz", 0, 1).unwrap();
        fs::write(b_dir.join("chunk00000.bin"), &buf).unwrap();

        let features: HashSet<Vec<u8>> = [b"ab".to_vec()].into_iter().collect();
        let ig = compute_ig(&[b_dir], &features, &[0], &[1], true, 1).unwrap();
        assert!(ig.is_empty());
    }
}
