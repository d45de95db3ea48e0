//! Model training pipeline.
//!
//! Orchestrates the full run: index the corpus, tally tokenized documents
//! into buckets, select features by document frequency, retally exact counts
//! for the survivors, weight them by information gain, pick the top features
//! per language, compile the final scanner and learn the Naive Bayes
//! parameters over it.
//!
//! `--df_feats`/`--ld_feats` substitute a feature list file for the
//! corresponding selection stage; with `--ld_feats` no buckets are created
//! at all.
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::buckets::{self, Sampling, TallyOptions};
use crate::cli;
use crate::error::Error;
use crate::features;
use crate::index::CorpusIndexer;
use crate::model::Model;
use crate::nb;
use crate::pipelines::index::{log_summary, write_index};
use crate::pipelines::pipeline::Pipeline;
use crate::pool;
use crate::scanner::Scanner;
use crate::selection;
use crate::tokenize::Tokenizer;

/// Add-one smoothing for class priors and per-class feature probabilities.
const ALPHA: f64 = 1.0;
const BETA: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub corpus: PathBuf,
    pub model_dir: PathBuf,
    pub proportion: f64,
    pub min_domain: usize,
    pub langs: Option<Vec<String>>,
    pub domains: Option<Vec<String>>,
    pub jobs: usize,
    pub buckets: usize,
    pub chunksize: usize,
    pub max_order: usize,
    pub df_tokens: usize,
    pub feats_per_lang: usize,
    pub word: bool,
    pub df_feats: Option<PathBuf>,
    pub ld_feats: Option<PathBuf>,
    pub no_domain_ig: bool,
    pub sample_size: usize,
    pub sample_count: Option<usize>,
    pub temp: Option<PathBuf>,
    pub debug: bool,
    pub seed: u64,
}

impl TrainOptions {
    pub fn from_cli(cli: cli::Train) -> Self {
        let model_dir = cli
            .model
            .unwrap_or_else(|| default_model_dir(&cli.corpus));
        TrainOptions {
            corpus: cli.corpus,
            model_dir,
            proportion: cli.proportion,
            min_domain: cli.min_domain,
            langs: none_if_empty(cli.langs),
            domains: none_if_empty(cli.domains),
            jobs: cli.jobs.unwrap_or_else(pool::default_jobs),
            buckets: cli.buckets,
            chunksize: cli.chunksize,
            max_order: cli.max_order,
            df_tokens: cli.df_tokens,
            feats_per_lang: cli.feats_per_lang,
            word: cli.word,
            df_feats: cli.df_feats,
            ld_feats: cli.ld_feats,
            no_domain_ig: cli.no_domain_ig,
            sample_size: cli.sample_size,
            sample_count: cli.sample_count,
            temp: cli.temp,
            debug: cli.debug,
            seed: cli.seed,
        }
    }

    fn validate(&self) -> Result<(), Error> {
        if self.df_feats.is_some() && self.ld_feats.is_some() {
            return Err(Error::Config(
                "--df_feats and --ld_feats are mutually exclusive".to_string(),
            ));
        }
        if !(self.proportion > 0.0 && self.proportion <= 1.0) {
            return Err(Error::Config("proportion must be in (0, 1]".to_string()));
        }
        for (name, value) in [
            ("min_domain", self.min_domain),
            ("jobs", self.jobs),
            ("buckets", self.buckets),
            ("chunksize", self.chunksize),
            ("max_order", self.max_order),
            ("df_tokens", self.df_tokens),
            ("feats_per_lang", self.feats_per_lang),
            ("sample_size", self.sample_size),
        ] {
            if value == 0 {
                return Err(Error::Config(format!("{} must be positive", name)));
            }
        }
        if self.sample_count == Some(0) {
            return Err(Error::Config(
                "sample_count must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

fn none_if_empty(v: Vec<String>) -> Option<Vec<String>> {
    if v.is_empty() {
        None
    } else {
        Some(v)
    }
}

pub(crate) fn default_model_dir(corpus: &Path) -> PathBuf {
    let name = corpus
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "corpus".to_string());
    PathBuf::from(format!("{}.model", name))
}

pub struct TrainPipeline {
    opts: TrainOptions,
}

impl TrainPipeline {
    pub fn new(opts: TrainOptions) -> Self {
        Self { opts }
    }

    /// Full two-pass feature selection: tokenize into buckets, cut by
    /// document frequency, retally, weight by information gain and apply
    /// the language-domain criterion.
    fn select_features(&self, indexer: &CorpusIndexer) -> Result<Vec<Vec<u8>>, Error> {
        let opts = &self.opts;
        let bucket_root = opts
            .temp
            .clone()
            .unwrap_or_else(|| opts.model_dir.join("buckets"));
        let pass1_dir = bucket_root.join("pass1");
        let pass2_dir = bucket_root.join("pass2");
        for dir in [&pass1_dir, &pass2_dir] {
            if dir.exists() {
                warn!("discarding stale bucket directory {:?}", dir);
                fs::remove_dir_all(dir)?;
            }
        }
        fs::create_dir_all(&bucket_root)?;

        let tally_opts = TallyOptions {
            num_buckets: opts.buckets,
            jobs: opts.jobs,
            chunksize: opts.chunksize,
            sampling: opts.sample_count.map(|count| Sampling {
                count,
                size: opts.sample_size,
            }),
            seed: opts.seed,
        };

        // first pass over the raw documents
        let custom_df = match &opts.df_feats {
            Some(path) => {
                info!("reading custom features from {:?}", path);
                Some(features::read_features(path)?)
            }
            None => None,
        };
        let tokenizer = match &custom_df {
            Some(feats) => {
                info!("building tokenizer for custom list of {} features", feats.len());
                Tokenizer::Scan(Arc::new(Scanner::build(feats)?))
            }
            None if opts.word => {
                info!("using word tokenizer");
                Tokenizer::Words
            }
            None => {
                info!("using byte n-gram tokenizer, max order {}", opts.max_order);
                Tokenizer::NGram {
                    min: 1,
                    max: opts.max_order,
                }
            }
        };
        let b_dirs = buckets::build_index(&indexer.items, &tokenizer, &pass1_dir, &tally_opts)?;
        if opts.debug {
            let list: Vec<String> = b_dirs
                .iter()
                .map(|d| d.to_string_lossy().into_owned())
                .collect();
            fs::write(opts.model_dir.join("bucketlist"), list.join("\n") + "\n")?;
        }

        let df_feats = match custom_df {
            Some(feats) => {
                if opts.debug {
                    let doc_count = selection::tally(&b_dirs, opts.jobs)?;
                    self.write_df_all(&doc_count)?;
                }
                feats
            }
            None => {
                let doc_count = selection::tally(&b_dirs, opts.jobs)?;
                if opts.debug {
                    self.write_df_all(&doc_count)?;
                }
                let feats = selection::ngram_select(&doc_count, opts.max_order, opts.df_tokens);
                info!("selected {} features by document frequency", feats.len());
                if opts.debug {
                    features::write_features(&feats, &opts.model_dir.join("DFfeats"))?;
                }
                feats
            }
        };

        // the first-pass tally is no longer needed
        if !opts.debug {
            fs::remove_dir_all(&pass1_dir)?;
        }

        // second pass: exact counts for the selected features only, over
        // whole documents (window sampling applies to the first pass alone)
        let exact_opts = TallyOptions {
            sampling: None,
            ..tally_opts
        };
        let df_scanner = Tokenizer::Scan(Arc::new(Scanner::build(&df_feats)?));
        let b_dirs = buckets::build_index(&indexer.items, &df_scanner, &pass2_dir, &exact_opts)?;

        let feature_set: HashSet<Vec<u8>> = df_feats.iter().cloned().collect();
        let doc_langs: Vec<u32> = indexer.items.iter().map(|d| d.lang_id).collect();
        let lang_dist = indexer.dist_lang();

        info!("computing information gain for lang");
        let ig_lang = selection::compute_ig(
            &b_dirs,
            &feature_set,
            &doc_langs,
            &lang_dist,
            true,
            opts.jobs,
        )?;
        if opts.debug {
            features::write_weights(&ig_lang, &opts.model_dir.join("IGweights.lang"))?;
        }

        let ig_domain = if opts.no_domain_ig {
            None
        } else {
            info!("computing information gain for domain");
            let doc_domains: Vec<u32> = indexer.items.iter().map(|d| d.domain_id).collect();
            let domain_dist = indexer.dist_domain();
            let ig = selection::compute_ig(
                &b_dirs,
                &feature_set,
                &doc_domains,
                &domain_dist,
                false,
                opts.jobs,
            )?;
            if opts.debug {
                features::write_weights(&ig, &opts.model_dir.join("IGweights.domain"))?;
            }
            Some(ig)
        };

        let per_lang = selection::select_ld_features(
            &ig_lang,
            ig_domain.as_ref(),
            indexer.langs.len(),
            opts.feats_per_lang,
        );
        let ld_feats = selection::union_features(&per_lang);

        if opts.debug {
            features::write_features(&ld_feats, &opts.model_dir.join("LDfeats"))?;
            let mut w = csv::Writer::from_path(opts.model_dir.join("LDfeats.perlang"))?;
            for feats in &per_lang {
                let row: Vec<String> = feats.iter().map(|f| features::escape_bytes(f)).collect();
                w.write_record(&row)?;
            }
            w.flush()?;
        }

        if !opts.debug {
            fs::remove_dir_all(&pass2_dir)?;
            if opts.temp.is_none() {
                fs::remove_dir_all(&bucket_root)?;
            }
        }

        Ok(ld_feats)
    }

    fn write_df_all(&self, doc_count: &std::collections::HashMap<Vec<u8>, u32>) -> Result<(), Error> {
        let weights = doc_count
            .iter()
            .map(|(f, &c)| (f.clone(), vec![c as f64]))
            .collect();
        let path = self.opts.model_dir.join("DF_all");
        features::write_weights(&weights, &path)?;
        info!("wrote DF counts for all features to {:?}", path);
        Ok(())
    }

    fn dump_scanner(&self, scanner: &Scanner) -> Result<(), Error> {
        #[derive(Serialize)]
        struct ScannerDump {
            states: usize,
            cell_width: u8,
            features: Vec<String>,
        }
        let dump = ScannerDump {
            states: scanner.num_states(),
            cell_width: scanner.nextmove().width(),
            features: scanner
                .features()
                .iter()
                .map(|f| features::escape_bytes(f))
                .collect(),
        };
        let file = fs::File::create(self.opts.model_dir.join("LDfeats.scanner.json"))?;
        serde_json::to_writer_pretty(file, &dump)?;
        Ok(())
    }
}

impl Pipeline<()> for TrainPipeline {
    fn run(&self) -> Result<(), Error> {
        let opts = &self.opts;
        opts.validate()?;

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
        if opts.debug {
            write_index(&indexer, &opts.model_dir)?;
        }

        let ld_feats = match &opts.ld_feats {
            Some(path) => {
                info!("reading features from {:?}", path);
                features::read_features(path)?
            }
            None => self.select_features(&indexer)?,
        };

        info!("compiling scanner over {} features", ld_feats.len());
        let scanner = Scanner::build(&ld_feats)?;
        if opts.debug {
            self.dump_scanner(&scanner)?;
        }

        let cm = nb::generate_cm(&indexer.items, indexer.langs.len());
        let pc = nb::learn_pc(&cm.counts, ALPHA)?;
        let ptc = nb::learn_ptc(
            &indexer.items,
            &scanner,
            &cm,
            BETA,
            opts.jobs,
            opts.chunksize,
        )?;

        let model = Model {
            classes: indexer.langs.names().to_vec(),
            pc,
            ptc,
            num_feats: scanner.num_feats(),
            output: scanner.sparse_output(),
            nextmove: scanner.nextmove().clone(),
        };
        model.write(&opts.model_dir.join("model"))?;

        Ok(())
    }
}
