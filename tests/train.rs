//! End-to-end training runs over small synthetic corpora.
use std::fs;
use std::path::Path;

use tempfile::tempdir;

use lidtrain::model::Model;
use lidtrain::pipelines::train::{TrainOptions, TrainPipeline};
use lidtrain::pipelines::Pipeline;
use lidtrain::scanner::Scanner;

fn write_corpus(root: &Path, docs: &[(&str, &str, String, String)]) {
    for (domain, lang, name, text) in docs {
        let dir = root.join(domain).join(lang);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(name), text).unwrap();
    }
}

/// Two domains, two languages, four documents per pair, with disjoint byte
/// inventories per language.
fn two_lang_corpus() -> Vec<(&'static str, &'static str, String, String)> {
    let mut docs = Vec::new();
    for domain in ["govt", "wiki"] {
        for i in 0..4 {
            docs.push((
                domain,
                "en",
                format!("en{}.txt", i),
                format!("aaa bab abba {}", "ab".repeat(i + 1)),
            ));
            docs.push((
                domain,
                "fr",
                format!("fr{}.txt", i),
                format!("zzz yzy zyyz {}", "zy".repeat(i + 1)),
            ));
        }
    }
    docs
}

fn base_options(corpus: &Path, model_dir: &Path) -> TrainOptions {
    TrainOptions {
        corpus: corpus.to_path_buf(),
        model_dir: model_dir.to_path_buf(),
        proportion: 1.0,
        min_domain: 2,
        langs: None,
        domains: None,
        jobs: 1,
        buckets: 8,
        chunksize: 2,
        max_order: 1,
        df_tokens: 10,
        feats_per_lang: 5,
        word: false,
        df_feats: None,
        ld_feats: None,
        no_domain_ig: false,
        sample_size: 140,
        sample_count: None,
        temp: None,
        debug: false,
        seed: 0,
    }
}

fn classify(model: &Model, bytes: &[u8]) -> usize {
    let scanner = Scanner::from_parts(model.nextmove.clone(), &model.output, model.num_feats);
    let counts = scanner.count(bytes);
    let num_classes = model.classes.len();
    let score = |c: usize| -> f64 {
        model.pc[c]
            + counts
                .iter()
                .enumerate()
                .map(|(f, &n)| n as f64 * model.ptc[f * num_classes + c])
                .sum::<f64>()
    };
    (0..num_classes)
        .max_by(|&a, &b| score(a).partial_cmp(&score(b)).unwrap())
        .unwrap()
}

#[test]
fn trains_and_classifies_training_corpus() {
    let corpus = tempdir().unwrap();
    let model_dir = tempdir().unwrap();
    let docs = two_lang_corpus();
    write_corpus(corpus.path(), &docs);

    let opts = base_options(corpus.path(), model_dir.path());
    TrainPipeline::new(opts).run().unwrap();

    let model = Model::read(&model_dir.path().join("model")).unwrap();
    assert_eq!(model.classes, vec!["en".to_string(), "fr".to_string()]);
    // order-1 features only, at most df_tokens of them
    assert!(model.num_feats <= 10);

    // priors normalize
    let prior_sum: f64 = model.pc.iter().map(|v| v.exp()).sum();
    assert!((prior_sum - 1.0).abs() < 1e-9);

    // every training document classifies correctly
    for (_, lang, _, text) in &docs {
        let expected = model.classes.iter().position(|c| c == lang).unwrap();
        assert_eq!(classify(&model, text.as_bytes()), expected, "doc {:?}", text);
    }

    // buckets are cleaned up on success
    assert!(!model_dir.path().join("buckets").exists());
}

#[test]
fn prunes_languages_below_min_domain() {
    let corpus = tempdir().unwrap();
    let model_dir = tempdir().unwrap();
    let mut docs = two_lang_corpus();
    // "de" appears in a single domain only
    for i in 0..4 {
        docs.push((
            "govt",
            "de",
            format!("de{}.txt", i),
            "mmm nmn mnnm".to_string(),
        ));
    }
    write_corpus(corpus.path(), &docs);

    let opts = base_options(corpus.path(), model_dir.path());
    TrainPipeline::new(opts).run().unwrap();

    let model = Model::read(&model_dir.path().join("model")).unwrap();
    assert_eq!(model.classes, vec!["en".to_string(), "fr".to_string()]);
}

#[test]
fn ld_feats_skips_bucketing() {
    let corpus = tempdir().unwrap();
    let model_dir = tempdir().unwrap();
    write_corpus(corpus.path(), &two_lang_corpus());

    let feats_path = model_dir.path().join("feats");
    fs::write(&feats_path, "a\nb\nz\n").unwrap();

    let mut opts = base_options(corpus.path(), model_dir.path());
    opts.ld_feats = Some(feats_path);
    TrainPipeline::new(opts).run().unwrap();

    let model = Model::read(&model_dir.path().join("model")).unwrap();
    assert_eq!(model.num_feats, 3);
    // the tally stage never ran
    assert!(!model_dir.path().join("buckets").exists());
}

#[test]
fn sampled_runs_are_deterministic() {
    let corpus = tempdir().unwrap();
    write_corpus(corpus.path(), &two_lang_corpus());

    let run = |model_dir: &Path| {
        let mut opts = base_options(corpus.path(), model_dir);
        opts.proportion = 0.9;
        opts.sample_count = Some(2);
        opts.sample_size = 8;
        TrainPipeline::new(opts).run().unwrap();
        fs::read(model_dir.join("model")).unwrap()
    };

    let first_dir = tempdir().unwrap();
    let second_dir = tempdir().unwrap();
    let first = run(first_dir.path());
    let second = run(second_dir.path());
    assert_eq!(first, second);
}

#[test]
fn second_pass_counts_whole_documents_under_sampling() {
    let corpus = tempdir().unwrap();
    let model_dir = tempdir().unwrap();
    write_corpus(
        corpus.path(),
        &[
            ("govt", "en", "a.txt".to_string(), "a".repeat(64)),
            ("govt", "fr", "b.txt".to_string(), "z".repeat(64)),
        ],
    );

    let mut opts = base_options(corpus.path(), model_dir.path());
    opts.min_domain = 1;
    opts.sample_count = Some(1);
    opts.sample_size = 4;
    opts.debug = true;
    TrainPipeline::new(opts).run().unwrap();

    // the second-pass buckets must hold full-document counts even though
    // the first pass tokenized sampled windows
    let pass2 = model_dir.path().join("buckets").join("pass2");
    let mut count_a = 0u32;
    for entry in fs::read_dir(&pass2).unwrap() {
        let b_dir = entry.unwrap().path();
        lidtrain::buckets::for_each_record(&b_dir, |rec| {
            if rec.feature == b"a" && rec.doc_id == 0 {
                count_a += rec.count;
            }
        })
        .unwrap();
    }
    assert_eq!(count_a, 64);
}

#[test]
fn debug_keeps_intermediates() {
    let corpus = tempdir().unwrap();
    let model_dir = tempdir().unwrap();
    write_corpus(corpus.path(), &two_lang_corpus());

    let mut opts = base_options(corpus.path(), model_dir.path());
    opts.debug = true;
    TrainPipeline::new(opts).run().unwrap();

    for artifact in [
        "lang_index",
        "domain_index",
        "paths",
        "bucketlist",
        "DF_all",
        "DFfeats",
        "IGweights.lang",
        "IGweights.domain",
        "LDfeats",
        "LDfeats.perlang",
        "LDfeats.scanner.json",
        "model",
    ] {
        assert!(
            model_dir.path().join(artifact).exists(),
            "missing {}",
            artifact
        );
    }
    assert!(model_dir.path().join("buckets").exists());
}
