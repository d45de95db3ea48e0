//! Corpus indexing pipeline.
//!
//! Indexes a corpus and writes its makeup to the model directory:
//! `lang_index` and `domain_index` (name and document count per id) and
//! `paths` (domain id, language id and path per document).
use std::fs;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::Error;
use crate::index::CorpusIndexer;
use crate::pipelines::pipeline::Pipeline;

#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub corpus: PathBuf,
    pub model_dir: PathBuf,
    pub proportion: f64,
    pub min_domain: usize,
    pub langs: Option<Vec<String>>,
    pub domains: Option<Vec<String>>,
    pub seed: u64,
}

impl IndexOptions {
    pub fn from_cli(cli: crate::cli::Index) -> Self {
        let model_dir = cli
            .model
            .unwrap_or_else(|| crate::pipelines::train::default_model_dir(&cli.corpus));
        IndexOptions {
            corpus: cli.corpus,
            model_dir,
            proportion: cli.proportion,
            min_domain: cli.min_domain,
            langs: if cli.langs.is_empty() { None } else { Some(cli.langs) },
            domains: if cli.domains.is_empty() { None } else { Some(cli.domains) },
            seed: cli.seed,
        }
    }
}

pub struct IndexPipeline {
    opts: IndexOptions,
}

impl IndexPipeline {
    pub fn new(opts: IndexOptions) -> Self {
        Self { opts }
    }
}

impl Pipeline<()> for IndexPipeline {
    fn run(&self) -> Result<(), Error> {
        let opts = &self.opts;
        if !(opts.proportion > 0.0 && opts.proportion <= 1.0) {
            return Err(Error::Config(
                "proportion must be in (0, 1]".to_string(),
            ));
        }
        if opts.min_domain == 0 {
            return Err(Error::Config("min_domain must be positive".to_string()));
        }

        info!("corpus path: {:?}", opts.corpus);
        info!("model path: {:?}", opts.model_dir);
        fs::create_dir_all(&opts.model_dir)?;

        let mut rng = StdRng::seed_from_u64(opts.seed);
        let indexer = CorpusIndexer::new(
            &opts.corpus,
            opts.min_domain,
            opts.proportion,
            opts.langs.as_deref(),
            opts.domains.as_deref(),
            &mut rng,
        )?;
        log_summary(&indexer);

        write_index(&indexer, &opts.model_dir)?;
        Ok(())
    }
}

pub fn log_summary(indexer: &CorpusIndexer) {
    let lang_dist = indexer.dist_lang();
    let lang_info = indexer
        .langs
        .names()
        .iter()
        .zip(&lang_dist)
        .map(|(name, count)| format!("{}({})", name, count))
        .join(" ");
    info!("langs({}): {}", indexer.langs.len(), lang_info);

    let domain_dist = indexer.dist_domain();
    let domain_info = indexer
        .domains
        .names()
        .iter()
        .zip(&domain_dist)
        .map(|(name, count)| format!("{}({})", name, count))
        .join(" ");
    info!("domains({}): {}", indexer.domains.len(), domain_info);

    info!("identified {} files", indexer.items.len());
}

/// Write `lang_index`, `domain_index` and `paths` CSVs.
pub fn write_index(indexer: &CorpusIndexer, model_dir: &Path) -> Result<(), Error> {
    let mut w = csv::Writer::from_path(model_dir.join("lang_index"))?;
    for (name, count) in indexer.langs.names().iter().zip(indexer.dist_lang()) {
        w.write_record([name.clone(), count.to_string()])?;
    }
    w.flush()?;

    let mut w = csv::Writer::from_path(model_dir.join("domain_index"))?;
    for (name, count) in indexer.domains.names().iter().zip(indexer.dist_domain()) {
        w.write_record([name.clone(), count.to_string()])?;
    }
    w.flush()?;

    let mut w = csv::Writer::from_path(model_dir.join("paths"))?;
    for doc in &indexer.items {
        w.write_record([
            doc.domain_id.to_string(),
            doc.lang_id.to_string(),
            doc.path.to_string_lossy().into_owned(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_index_files() {
        let corpus = tempdir().unwrap();
        let model = tempdir().unwrap();
        for (domain, lang, name) in [("news", "en", "a"), ("wiki", "en", "b")] {
            let dir = corpus.path().join(domain).join(lang);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join(name), b"text").unwrap();
        }

        let pipeline = IndexPipeline::new(IndexOptions {
            corpus: corpus.path().to_path_buf(),
            model_dir: model.path().to_path_buf(),
            proportion: 1.0,
            min_domain: 1,
            langs: None,
            domains: None,
            seed: 0,
        });
        pipeline.run().unwrap();

        let langs = fs::read_to_string(model.path().join("lang_index")).unwrap();
        assert_eq!(langs.trim(), "en,2");
        let paths = fs::read_to_string(model.path().join("paths")).unwrap();
        assert_eq!(paths.lines().count(), 2);
    }

    #[test]
    fn invalid_proportion_rejected() {
        let pipeline = IndexPipeline::new(IndexOptions {
            corpus: PathBuf::from("nowhere"),
            model_dir: PathBuf::from("nowhere.model"),
            proportion: 0.0,
            min_domain: 1,
            langs: None,
            domains: None,
            seed: 0,
        });
        assert!(matches!(pipeline.run(), Err(Error::Config(_))));
    }
}
