//! Bucketed tallying of tokenized documents.
//!
//! Documents are split into chunks and dispatched to a worker pool. Each
//! worker tokenizes its documents into per-bucket buffers and flushes every
//! touched bucket with a write-to-temp-then-rename append, so bucket files
//! are always whole records. A bucket directory ends up holding one file per
//! chunk that contributed to it.
use std::fs;
use std::hash::Hasher;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::NamedTempFile;
use twox_hash::XxHash64;

use crate::buckets::record;
use crate::error::Error;
use crate::index::Document;
use crate::pool;
use crate::tokenize::{self, Tokenizer};

/// Window sampling parameters for a tally pass.
#[derive(Debug, Clone, Copy)]
pub struct Sampling {
    pub count: usize,
    pub size: usize,
}

#[derive(Debug, Clone)]
pub struct TallyOptions {
    pub num_buckets: usize,
    pub jobs: usize,
    pub chunksize: usize,
    pub sampling: Option<Sampling>,
    pub seed: u64,
}

/// Stable content hash routing a feature to its bucket. Must not change
/// between passes or runs.
pub fn bucket_of(feature: &[u8], num_buckets: usize) -> usize {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(feature);
    (hasher.finish() % num_buckets as u64) as usize
}

/// Tokenize every document into `pass_dir`'s buckets. Returns the bucket
/// directories.
pub fn build_index(
    items: &[Document],
    tokenizer: &Tokenizer,
    pass_dir: &Path,
    opts: &TallyOptions,
) -> Result<Vec<PathBuf>, Error> {
    let b_dirs: Vec<PathBuf> = (0..opts.num_buckets)
        .map(|b| pass_dir.join(format!("bucket{:03}", b)))
        .collect();
    for dir in &b_dirs {
        fs::create_dir_all(dir)?;
    }

    let chunks: Vec<(usize, &[Document])> = items.chunks(opts.chunksize).enumerate().collect();

    info!(
        "tallying {} documents in {} chunks into {} buckets",
        items.len(),
        chunks.len(),
        opts.num_buckets
    );

    let results = pool::map_tasks(opts.jobs, chunks, |(chunk_id, docs)| {
        tally_chunk(chunk_id, docs, tokenizer, &b_dirs, opts)
    })?;

    let mut failed = 0usize;
    for result in results {
        failed += result?;
    }
    if failed > 0 && failed * 100 >= items.len() {
        return Err(Error::Custom(format!(
            "{} of {} documents unreadable, aborting",
            failed,
            items.len()
        )));
    }

    Ok(b_dirs)
}

fn tally_chunk(
    chunk_id: usize,
    docs: &[Document],
    tokenizer: &Tokenizer,
    b_dirs: &[PathBuf],
    opts: &TallyOptions,
) -> Result<usize, Error> {
    let num_buckets = b_dirs.len();
    let mut buffers: Vec<Vec<u8>> = vec![Vec::new(); num_buckets];
    let mut failed = 0usize;

    for (offset, doc) in docs.iter().enumerate() {
        let doc_id = (chunk_id * opts.chunksize + offset) as u32;
        let bytes = match doc.read() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("dropping unreadable document {:?}: {}", doc.path, e);
                failed += 1;
                continue;
            }
        };
        let tokens = match opts.sampling {
            Some(sampling) => {
                // seeded per document so the drawn windows do not depend on
                // worker count or scheduling
                let mut rng = StdRng::seed_from_u64(
                    opts.seed ^ (doc_id as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15),
                );
                let mut merged: std::collections::HashMap<Vec<u8>, u32> =
                    std::collections::HashMap::new();
                for window in
                    tokenize::sample_windows(&bytes, sampling.count, sampling.size, &mut rng)
                {
                    for (feature, count) in tokenizer.tokenize(window) {
                        *merged.entry(feature).or_insert(0) += count;
                    }
                }
                merged.into_iter().collect()
            }
            None => tokenizer.tokenize(&bytes),
        };
        for (feature, count) in tokens {
            let bucket = bucket_of(&feature, num_buckets);
            record::write_record(&mut buffers[bucket], &feature, doc_id, count)?;
        }
    }

    for (bucket, buf) in buffers.iter().enumerate() {
        if buf.is_empty() {
            continue;
        }
        let mut tmp = NamedTempFile::new_in(&b_dirs[bucket])?;
        tmp.write_all(buf)?;
        tmp.persist(b_dirs[bucket].join(format!("chunk{:05}.bin", chunk_id)))
            .map_err(|e| Error::Io(e.error))?;
    }

    Ok(failed)
}
