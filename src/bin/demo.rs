//! Trains a topic model on one cross-validation fold, writes its reports, and prints the
//! held-out perplexity of the other documents.
//!
//! ```text
//! demo <lda|at|coat> [FILEBASE [PARAMS.yaml]]
//! ```
//!
//! Without a file base the demo draws a synthetic Author-Topic corpus.

use std::env;
use std::error::Error;
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use topic_mcmc::core::ChainRunner;
use topic_mcmc::gibbs::Conditional;
use topic_mcmc::labels::LabelCorpus;
use topic_mcmc::report::{self, dominant_topics};
use topic_mcmc::resolver::CorpusResolver;
use topic_mcmc::synthetic::Generator;
use topic_mcmc::{Estimator, Inferencer, ModelKind, Parameters};

const SEED: u64 = 56567651;
const NFOLD: usize = 5;
const ITERATIONS: usize = 500;
const INFER_ITERATIONS: usize = 3;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let kind = match args.next().as_deref() {
        Some("lda") | None => ModelKind::Lda,
        Some("at") => ModelKind::AuthorTopic,
        Some("coat") => ModelKind::CoauthorTopic,
        Some(other) => {
            return Err(format!("unknown model {other:?}, expected lda, at or coat").into())
        }
    };
    let filebase = args.next().map(PathBuf::from);
    let params = match args.next() {
        Some(path) => Parameters::from_path(path)?,
        None => Parameters::new(5).with_top_words(8).with_top_entities(5),
    };

    let (mut corpus, resolver, out_base) = match &filebase {
        Some(base) => (
            LabelCorpus::open(base)?,
            Some(CorpusResolver::open(base)?),
            base.clone(),
        ),
        None => {
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(SEED);
            let data = Generator::new(5, 200)
                .with_doc_len(80)
                .author_topic(&mut rng, 300, 40, 3)?;
            (data.labels, None, env::temp_dir().join("topic-mcmc-demo"))
        }
    };
    println!("{}", corpus.corpus());

    if let Some(label_kind) = kind.label_kind() {
        // load before splitting so both folds carry the labels
        corpus.doc_labels(label_kind)?;
    }
    let split = corpus.corpus().split(NFOLD, SEED)?;
    let train = corpus.train_corpus(&split, 0);
    let test = corpus.test_corpus(&split, 0);

    let ppx = match kind {
        ModelKind::Lda => {
            let mut model = Estimator::lda(train.into_corpus(), params, SEED);
            train_and_report(&mut model, resolver.as_ref(), &out_base)?;
            let mut inferencer = Inferencer::lda(&model, test.into_corpus(), SEED)?;
            inferencer.init();
            inferencer.inference(INFER_ITERATIONS)?;
            let topics = dominant_topics(&inferencer.vartheta());
            println!(
                "Dominant topics of the first held-out documents: {:?}",
                &topics[..topics.len().min(10)]
            );
            inferencer.ppx()?
        }
        ModelKind::AuthorTopic => {
            let mut model = Estimator::author_topic(train, params, SEED)?;
            train_and_report(&mut model, resolver.as_ref(), &out_base)?;
            let mut inferencer = Inferencer::author_topic(&model, test, SEED)?;
            inferencer.init();
            inferencer.inference(INFER_ITERATIONS)?;
            inferencer.ppx()?
        }
        ModelKind::CoauthorTopic => {
            let mut model = Estimator::coauthor_topic(train, params, SEED)?;
            train_and_report(&mut model, resolver.as_ref(), &out_base)?;
            let mut inferencer = Inferencer::coauthor_topic(&model, test, SEED)?;
            inferencer.init();
            inferencer.inference(INFER_ITERATIONS)?;
            inferencer.ppx()?
        }
    };
    println!("Held-out perplexity ({kind}): {ppx:.3}");
    Ok(())
}

fn train_and_report<C: Conditional>(
    model: &mut Estimator<C>,
    resolver: Option<&CorpusResolver>,
    out_base: &Path,
) -> Result<(), Box<dyn Error>> {
    let prefix = model.kind().to_string();
    model.init();
    model.run_with_progress(ITERATIONS, &prefix)?;

    let out = |suffix: &str| {
        let mut path = out_base.as_os_str().to_os_string();
        path.push(format!(".{prefix}.{suffix}"));
        PathBuf::from(path)
    };
    report::save_top_words(out("twords"), model, resolver)?;
    report::save_top_entities(out("tentities"), model, resolver)?;
    report::save_vartheta(out("vartheta"), model)?;
    report::save_varphi(out("varphi"), model)?;
    report::save_assign(out("assign"), model)?;
    println!("Wrote reports next to {}", out_base.display());

    let mut top = Vec::new();
    report::write_top_words(&mut top, model, resolver)?;
    print!("{}", String::from_utf8_lossy(&top));
    Ok(())
}
