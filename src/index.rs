//! Corpus indexing.
//!
//! A corpus is a directory hierarchy `corpus/domain/language/file`. The
//! indexer walks it, assigns dense integer ids to languages and domains on
//! first sight, optionally samples documents, and prunes languages that do
//! not appear in enough distinct domains.
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rand::Rng;

use crate::error::Error;

/// A single training document. Immutable after indexing.
#[derive(Debug, Clone)]
pub struct Document {
    pub domain_id: u32,
    pub lang_id: u32,
    pub name: String,
    pub path: PathBuf,
}

impl Document {
    /// Read the document bytes, retrying once on failure.
    pub fn read(&self) -> std::io::Result<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(bytes),
            Err(first) => {
                debug!("retrying read of {:?} after: {}", self.path, first);
                fs::read(&self.path)
            }
        }
    }
}

/// Dense label interner. Ids are assigned in first-seen order; a frozen
/// index (built from an allow-list) refuses new labels instead.
#[derive(Debug, Default)]
pub struct LabelIndex {
    names: Vec<String>,
    ids: HashMap<String, u32>,
    frozen: bool,
}

impl LabelIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_labels(labels: &[String]) -> Self {
        let mut index = Self::new();
        for label in labels {
            index.lookup(label);
        }
        index.frozen = true;
        index
    }

    /// Id for `name`, allocating one unless the index is frozen.
    pub fn lookup(&mut self, name: &str) -> Option<u32> {
        if let Some(&id) = self.ids.get(name) {
            return Some(id);
        }
        if self.frozen {
            return None;
        }
        let id = self.names.len() as u32;
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        Some(id)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

pub struct CorpusIndexer {
    pub items: Vec<Document>,
    pub langs: LabelIndex,
    pub domains: LabelIndex,
}

impl CorpusIndexer {
    /// Walk `root`, admitting each file with probability `proportion`, then
    /// prune languages present in fewer than `min_domain` domains.
    pub fn new<R: Rng>(
        root: &Path,
        min_domain: usize,
        proportion: f64,
        langs: Option<&[String]>,
        domains: Option<&[String]>,
        rng: &mut R,
    ) -> Result<Self, Error> {
        let mut indexer = CorpusIndexer {
            items: Vec::new(),
            langs: langs.map(LabelIndex::with_labels).unwrap_or_default(),
            domains: domains.map(LabelIndex::with_labels).unwrap_or_default(),
        };
        let coverage = indexer.index(root, proportion, rng);
        if indexer.items.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        indexer.prune_min_domain(min_domain, &coverage);
        if indexer.items.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        Ok(indexer)
    }

    fn index<R: Rng>(
        &mut self,
        root: &Path,
        proportion: f64,
        rng: &mut R,
    ) -> HashMap<u32, HashSet<u32>> {
        let mut files = Vec::new();
        collect_files(root, &mut files);
        // filesystem enumeration order is not stable; ids and document
        // order must be
        files.sort_unstable();

        let mut coverage: HashMap<u32, HashSet<u32>> = HashMap::new();
        for path in files {
            if !rng.gen_bool(proportion) {
                continue;
            }
            let labels = path.parent().and_then(|lang_dir| {
                let lang = lang_dir.file_name()?.to_str()?;
                let domain = lang_dir.parent()?.file_name()?.to_str()?;
                Some((domain.to_string(), lang.to_string()))
            });
            let (domain, lang) = match labels {
                Some(l) => l,
                None => {
                    warn!("cannot derive domain/language for {:?}, skipping", path);
                    continue;
                }
            };
            // a None lookup means the label is outside a pre-specified set
            let domain_id = match self.domains.lookup(&domain) {
                Some(id) => id,
                None => continue,
            };
            let lang_id = match self.langs.lookup(&lang) {
                Some(id) => id,
                None => continue,
            };
            coverage.entry(lang_id).or_default().insert(domain_id);
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.items.push(Document {
                domain_id,
                lang_id,
                name,
                path,
            });
        }
        coverage
    }

    /// Drop languages appearing in fewer than `min_domain` distinct domains
    /// and renumber the survivors densely, preserving first-seen order.
    fn prune_min_domain(&mut self, min_domain: usize, coverage: &HashMap<u32, HashSet<u32>>) {
        let keep = |id: u32| {
            coverage
                .get(&id)
                .map(|domains| domains.len() >= min_domain)
                .unwrap_or(false)
        };
        if (0..self.langs.len() as u32).all(keep) {
            return;
        }

        let mut survivors = LabelIndex::new();
        let mut remap: HashMap<u32, u32> = HashMap::new();
        for (old_id, name) in self.langs.names().iter().enumerate() {
            if keep(old_id as u32) {
                let new_id = survivors.lookup(name).unwrap();
                remap.insert(old_id as u32, new_id);
            } else {
                info!(
                    "dropping language {} (present in fewer than {} domains)",
                    name, min_domain
                );
            }
        }

        self.items.retain(|doc| remap.contains_key(&doc.lang_id));
        for doc in self.items.iter_mut() {
            doc.lang_id = remap[&doc.lang_id];
        }
        self.langs = survivors;
    }

    /// Document count per language id.
    pub fn dist_lang(&self) -> Vec<u32> {
        let mut dist = vec![0u32; self.langs.len()];
        for doc in &self.items {
            dist[doc.lang_id as usize] += 1;
        }
        dist
    }

    /// Document count per domain id.
    pub fn dist_domain(&self) -> Vec<u32> {
        let mut dist = vec![0u32; self.domains.len()];
        for doc in &self.items {
            dist[doc.domain_id as usize] += 1;
        }
        dist
    }
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("cannot read directory {:?}: {}, skipping", dir, e);
            return;
        }
    };
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("unreadable entry under {:?}: {}, skipping", dir, e);
                continue;
            }
        };
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, files);
        } else {
            files.push(path);
        }
    }
}
