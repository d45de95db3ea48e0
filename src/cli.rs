//! Command line arguments and parameters management/parsing.
use std::path::PathBuf;

use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "lidtrain",
    about = "Training tools for byte n-gram language identification models"
)]
/// Holds every command that is callable by the `lidtrain` command.
pub enum LidTrain {
    #[structopt(about = "Index a corpus and write its language/domain makeup")]
    Index(Index),
    #[structopt(about = "Train a language identification model")]
    Train(Train),
}

#[derive(Debug, StructOpt)]
/// Index command and parameters.
pub struct Index {
    #[structopt(
        short = "p",
        long,
        default_value = "1.0",
        help = "proportion of documents to use"
    )]
    pub proportion: f64,
    #[structopt(
        long = "min_domain",
        default_value = "1",
        help = "minimum number of domains a language must be present in"
    )]
    pub min_domain: usize,
    #[structopt(
        short = "l",
        long = "lang",
        help = "use LANG - can be specified multiple times (uses all langs found if not specified)"
    )]
    pub langs: Vec<String>,
    #[structopt(
        short = "d",
        long = "domain",
        help = "use DOMAIN - can be specified multiple times (uses all domains found if not specified)"
    )]
    pub domains: Vec<String>,
    #[structopt(
        short = "m",
        long,
        parse(from_os_str),
        help = "save output to MODEL_DIR"
    )]
    pub model: Option<PathBuf>,
    #[structopt(long, default_value = "0", help = "seed for document sampling")]
    pub seed: u64,
    #[structopt(parse(from_os_str), help = "read corpus from CORPUS_DIR")]
    pub corpus: PathBuf,
}

#[derive(Debug, StructOpt)]
/// Train command and parameters.
pub struct Train {
    #[structopt(
        short = "p",
        long,
        default_value = "1.0",
        help = "proportion of documents to use"
    )]
    pub proportion: f64,
    #[structopt(
        long = "min_domain",
        default_value = "1",
        help = "minimum number of domains a language must be present in"
    )]
    pub min_domain: usize,
    #[structopt(
        short = "l",
        long = "lang",
        help = "use LANG - can be specified multiple times (uses all langs found if not specified)"
    )]
    pub langs: Vec<String>,
    #[structopt(
        short = "d",
        long = "domain",
        help = "use DOMAIN - can be specified multiple times (uses all domains found if not specified)"
    )]
    pub domains: Vec<String>,
    #[structopt(
        short = "m",
        long,
        parse(from_os_str),
        help = "save output to MODEL_DIR (defaults to CORPUS_DIR name + .model)"
    )]
    pub model: Option<PathBuf>,
    #[structopt(
        short = "j",
        long,
        help = "number of parallel workers (1 runs strictly sequentially)"
    )]
    pub jobs: Option<usize>,
    #[structopt(
        long,
        default_value = "64",
        help = "distribute features into N buckets"
    )]
    pub buckets: usize,
    #[structopt(
        long,
        default_value = "50",
        help = "max number of files tokenized at a time - smaller reduces memory use"
    )]
    pub chunksize: usize,
    #[structopt(
        long = "max_order",
        default_value = "4",
        help = "highest n-gram order to use"
    )]
    pub max_order: usize,
    #[structopt(
        long = "df_tokens",
        default_value = "15000",
        help = "number of tokens to consider for each n-gram order"
    )]
    pub df_tokens: usize,
    #[structopt(
        long = "feats_per_lang",
        default_value = "300",
        help = "select top N features for each language"
    )]
    pub feats_per_lang: usize,
    #[structopt(long, help = "use whitespace tokenization")]
    pub word: bool,
    #[structopt(
        long = "df_feats",
        parse(from_os_str),
        help = "use a list of features from FEATS instead of DF feature selection"
    )]
    pub df_feats: Option<PathBuf>,
    #[structopt(
        long = "ld_feats",
        parse(from_os_str),
        help = "use a list of features from FEATS instead of LD feature selection"
    )]
    pub ld_feats: Option<PathBuf>,
    #[structopt(
        long = "no_domain_ig",
        help = "use only per-language IG in the LD calculation"
    )]
    pub no_domain_ig: bool,
    #[structopt(
        long = "sample_size",
        default_value = "140",
        help = "size of byte windows for sampling-based tokenization"
    )]
    pub sample_size: usize,
    #[structopt(
        long = "sample_count",
        help = "number of byte windows for sampling-based tokenization (whole document if unset)"
    )]
    pub sample_count: Option<usize>,
    #[structopt(
        short = "t",
        long,
        parse(from_os_str),
        help = "store buckets in TEMP_DIR instead of in MODEL_DIR/buckets"
    )]
    pub temp: Option<PathBuf>,
    #[structopt(long, help = "produce debug output (all intermediates)")]
    pub debug: bool,
    #[structopt(long, default_value = "0", help = "seed for document sampling")]
    pub seed: u64,
    #[structopt(parse(from_os_str), help = "read corpus from CORPUS_DIR")]
    pub corpus: PathBuf,
}
