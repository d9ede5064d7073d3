/*!
K-fold cross-validation of held-out perplexity.

Every fold trains its own estimator on the other folds and evaluates the held-out
segment with an inferencer. Folds share no mutable state, so they run in parallel on
the `rayon` thread pool; each fold's chains are seeded with `seed + fold`, which keeps
the result independent of scheduling.

# Examples

```rust
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use topic_mcmc::crossval::CrossValidation;
use topic_mcmc::synthetic::Generator;
use topic_mcmc::{ModelKind, Parameters};

let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
let data = Generator::new(3, 25).with_doc_len(20).lda(&mut rng, 30).unwrap();

let cv = CrossValidation::new(ModelKind::Lda, Parameters::new(3), 3).with_iterations(20, 3);
let ppx = cv.run(&data.labels).unwrap();
assert_eq!(ppx.len(), 3);
```
*/

use rayon::prelude::*;

use crate::corpus::Split;
use crate::error::Result;
use crate::estimator::{Estimator, ModelKind};
use crate::inferencer::Inferencer;
use crate::labels::LabelCorpus;
use crate::params::Parameters;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossValidation {
    pub kind: ModelKind,
    pub params: Parameters,
    pub nfold: usize,
    pub seed: u64,
    pub train_iterations: usize,
    pub infer_iterations: usize,
}

impl CrossValidation {
    pub fn new(kind: ModelKind, params: Parameters, nfold: usize) -> Self {
        Self {
            kind,
            params,
            nfold,
            seed: 56567651,
            train_iterations: 1000,
            infer_iterations: 3,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Gibbs sweeps for training and for held-out inference.
    pub fn with_iterations(mut self, train: usize, infer: usize) -> Self {
        self.train_iterations = train;
        self.infer_iterations = infer;
        self
    }

    /// Held-out perplexity of every fold, in fold order.
    pub fn run(&self, corpus: &LabelCorpus) -> Result<Vec<f64>> {
        let mut corpus = corpus.clone();
        if let Some(label_kind) = self.kind.label_kind() {
            // loaded before splitting so both sides carry the labels
            corpus.doc_labels(label_kind)?;
        }
        let split = corpus.corpus().split(self.nfold, self.seed)?;
        log::info!(
            "{}-fold cross-validation of {} on {}",
            self.nfold,
            self.kind,
            corpus.corpus()
        );
        (0..self.nfold)
            .into_par_iter()
            .map(|fold| self.fold_perplexity(&corpus, &split, fold))
            .collect()
    }

    fn fold_perplexity(&self, corpus: &LabelCorpus, split: &Split, fold: usize) -> Result<f64> {
        let seed = self.seed + fold as u64;
        let train = corpus.train_corpus(split, fold);
        let test = corpus.test_corpus(split, fold);
        let ppx = match self.kind {
            ModelKind::Lda => {
                let mut model = Estimator::lda(train.into_corpus(), self.params, seed);
                model.init();
                model.estimate(self.train_iterations)?;
                let mut inferencer = Inferencer::lda(&model, test.into_corpus(), seed)?;
                inferencer.init();
                inferencer.inference(self.infer_iterations)?;
                inferencer.ppx()?
            }
            ModelKind::AuthorTopic => {
                let mut model = Estimator::author_topic(train, self.params, seed)?;
                model.init();
                model.estimate(self.train_iterations)?;
                let mut inferencer = Inferencer::author_topic(&model, test, seed)?;
                inferencer.init();
                inferencer.inference(self.infer_iterations)?;
                inferencer.ppx()?
            }
            ModelKind::CoauthorTopic => {
                let mut model = Estimator::coauthor_topic(train, self.params, seed)?;
                model.init();
                model.estimate(self.train_iterations)?;
                let mut inferencer = Inferencer::coauthor_topic(&model, test, seed)?;
                inferencer.init();
                inferencer.inference(self.infer_iterations)?;
                inferencer.ppx()?
            }
        };
        log::info!("fold {fold}: perplexity {ppx}");
        Ok(ppx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::Generator;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn synthetic() -> LabelCorpus {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(9);
        Generator::new(3, 25)
            .with_doc_len(15)
            .author_topic(&mut rng, 40, 6, 2)
            .unwrap()
            .labels
    }

    #[test]
    fn test_every_fold_reports_a_perplexity() {
        let corpus = synthetic();
        for kind in [ModelKind::Lda, ModelKind::AuthorTopic] {
            let cv = CrossValidation::new(kind, Parameters::new(3), 4).with_iterations(10, 2);
            let ppx = cv.run(&corpus).unwrap();
            assert_eq!(ppx.len(), 4);
            assert!(ppx.iter().all(|p| p.is_finite() && *p > 0.0), "{kind}: {ppx:?}");
        }
    }

    #[test]
    fn test_parallel_folds_are_deterministic() {
        let corpus = synthetic();
        let cv = CrossValidation::new(ModelKind::AuthorTopic, Parameters::new(3), 3)
            .with_seed(4)
            .with_iterations(15, 2);
        assert_eq!(cv.run(&corpus).unwrap(), cv.run(&corpus).unwrap());
    }

    #[test]
    fn test_zero_folds_rejected() {
        let cv = CrossValidation::new(ModelKind::Lda, Parameters::new(2), 0);
        assert!(cv.run(&synthetic()).is_err());
    }
}
