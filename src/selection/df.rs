//! Document-frequency tally and selection.
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use log::info;

use crate::buckets::for_each_record;
use crate::error::Error;
use crate::pool;

/// Fold every bucket into per-feature document frequencies. Buckets hold
/// disjoint feature sets, so the per-bucket maps merge without conflicts.
pub fn tally(b_dirs: &[PathBuf], jobs: usize) -> Result<HashMap<Vec<u8>, u32>, Error> {
    let partials = pool::map_tasks(jobs, b_dirs.to_vec(), |dir| tally_bucket(&dir))?;
    let mut df = HashMap::new();
    for partial in partials {
        df.extend(partial?);
    }
    info!("document frequencies tallied for {} features", df.len());
    Ok(df)
}

fn tally_bucket(dir: &Path) -> Result<HashMap<Vec<u8>, u32>, Error> {
    let mut seen: HashMap<Vec<u8>, HashSet<u32>> = HashMap::new();
    for_each_record(dir, |rec| {
        seen.entry(rec.feature).or_default().insert(rec.doc_id);
    })?;
    Ok(seen
        .into_iter()
        .map(|(feature, docs)| (feature, docs.len() as u32))
        .collect())
}

/// Keep the `count` highest-DF features of every n-gram order, ties broken
/// by feature bytes.
pub fn ngram_select(
    df: &HashMap<Vec<u8>, u32>,
    max_order: usize,
    count: usize,
) -> Vec<Vec<u8>> {
    let mut selected = Vec::new();
    for order in 1..=max_order {
        let mut feats: Vec<(&Vec<u8>, u32)> = df
            .iter()
            .filter(|(f, _)| f.len() == order)
            .map(|(f, &c)| (f, c))
            .collect();
        feats.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        selected.extend(feats.into_iter().take(count).map(|(f, _)| f.clone()));
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn df_map(entries: &[(&[u8], u32)]) -> HashMap<Vec<u8>, u32> {
        entries.iter().map(|(f, c)| (f.to_vec(), *c)).collect()
    }

    #[test]
    fn top_per_order() {
        let df = df_map(&[
            (b"a", 10),
            (b"b", 5),
            (b"c", 1),
            (b"ab", 7),
            (b"ba", 9),
        ]);
        let selected = ngram_select(&df, 2, 2);
        assert_eq!(
            selected,
            vec![b"a".to_vec(), b"b".to_vec(), b"ba".to_vec(), b"ab".to_vec()]
        );
    }

    #[test]
    fn ties_break_lexicographically() {
        let df = df_map(&[(b"z", 3), (b"a", 3), (b"m", 3)]);
        let selected = ngram_select(&df, 1, 2);
        assert_eq!(selected, vec![b"a".to_vec(), b"m".to_vec()]);
    }

    #[test]
    fn longer_features_than_max_order_are_ignored() {
        let df = df_map(&[(b"a", 1), (b"abc", 100)]);
        let selected = ngram_select(&df, 2, 5);
        assert_eq!(selected, vec![b"a".to_vec()]);
    }
}
