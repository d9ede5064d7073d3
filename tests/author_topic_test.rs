//! Train-then-infer runs of the Author-Topic and coAuthor-Topic models on synthetic corpora.

use topic_mcmc::core::MarkovChain;
use topic_mcmc::corpus::{Corpus, Document};
use topic_mcmc::labels::{LabelCorpus, LabelKind, Relation};
use topic_mcmc::synthetic::Generator;
use topic_mcmc::{Error, Estimator, Inferencer, ModelKind, Parameters};

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    const SEED: u64 = 56567651;

    fn synthetic_labels() -> LabelCorpus {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(17);
        Generator::new(3, 30)
            .with_doc_len(20)
            .author_topic(&mut rng, 60, 8, 2)
            .unwrap()
            .labels
    }

    #[test]
    fn test_at_train_and_infer() {
        let mut labels = synthetic_labels();
        labels.doc_labels(LabelKind::Authors).unwrap();
        let split = labels.corpus().split(5, SEED).unwrap();
        let train = labels.train_corpus(&split, 2);
        let test = labels.test_corpus(&split, 2);

        let mut model = Estimator::author_topic(train, Parameters::new(3), SEED).unwrap();
        model.init();
        model.estimate(50).unwrap();
        assert!(model.check_invariants());
        assert_eq!(model.num_entities(), 8);

        let vartheta = model.vartheta(false).unwrap();
        assert_eq!(vartheta.dim(), (8, 3));
        for row in vartheta.rows() {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-9);
        }

        let mut inferencer = Inferencer::author_topic(&model, test, SEED).unwrap();
        inferencer.init();
        inferencer.inference(3).unwrap();
        assert_eq!(inferencer.kind(), ModelKind::AuthorTopic);
        // no local counts: the trained posterior is used as is
        assert_eq!(inferencer.vartheta(), vartheta);

        let ppx = inferencer.ppx().unwrap();
        assert!(ppx.is_finite() && ppx > 0.0, "Got perplexity {ppx}");
        assert!(ppx < 30.0, "Perplexity {ppx} is no better than uniform");
    }

    #[test]
    fn test_at_perplexity_ignores_sweep_count() {
        let mut model =
            Estimator::author_topic(synthetic_labels(), Parameters::new(3), SEED).unwrap();
        model.init();
        model.estimate(20).unwrap();

        let held_out = || {
            LabelCorpus::new(Corpus::new(vec![
                Document::new(vec![0, 1, 2, 3]),
                Document::new(vec![4, 4]),
            ]))
            .with_labels(LabelKind::Authors, vec![vec![0, 5], vec![2]])
            .unwrap()
        };
        let mut a = Inferencer::author_topic(&model, held_out(), 1).unwrap();
        let mut b = Inferencer::author_topic(&model, held_out(), 2).unwrap();
        a.init();
        b.init();
        a.inference(1).unwrap();
        b.inference(10).unwrap();
        // the likelihood marginalizes over the fixed posteriors only
        assert_abs_diff_eq!(a.ppx().unwrap(), b.ppx().unwrap(), epsilon = 1e-12);
    }

    #[test]
    fn test_at_unknown_author_rejected() {
        let mut model =
            Estimator::author_topic(synthetic_labels(), Parameters::new(3), SEED).unwrap();
        model.init();
        let held_out = LabelCorpus::new(Corpus::new(vec![Document::new(vec![1])]))
            .with_labels(LabelKind::Authors, vec![vec![8]])
            .unwrap();
        match Inferencer::author_topic(&model, held_out, SEED) {
            Err(Error::UnknownEntity { entity, .. }) => assert_eq!(entity, 8),
            other => panic!("Expected UnknownEntity, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_zero_author_documents_are_skipped() {
        let labels = LabelCorpus::new(Corpus::new(vec![
            Document::new(vec![0, 1, 2]),
            Document::new(vec![2, 2]),
            Document::new(vec![1, 0]),
        ]))
        .with_labels(LabelKind::Authors, vec![vec![0], vec![], vec![1, 0]])
        .unwrap();
        let mut model = Estimator::author_topic(labels, Parameters::new(2), SEED).unwrap();
        model.init();
        model.estimate(10).unwrap();
        assert!(model.assignments()[1].is_empty());
        assert_eq!(model.stats().total(), 5);
        assert!(model.check_invariants());
    }

    #[test]
    fn test_coat_train_and_infer() {
        let mut labels = synthetic_labels();
        labels.doc_labels(LabelKind::Authors).unwrap();
        let split = labels.corpus().split(4, SEED).unwrap();
        let train = labels.train_corpus(&split, 0);
        let mut test = labels.test_corpus(&split, 0);

        let mut model = Estimator::coauthor_topic(train, Parameters::new(3), SEED).unwrap();
        model.init();
        model.estimate(30).unwrap();
        assert!(model.check_invariants());
        let index = model.coauthor_index().unwrap().clone();
        assert_eq!(model.num_entities(), index.num_relations());

        let test_authors = test.doc_labels(LabelKind::Authors).unwrap().to_vec();
        let mut inferencer = Inferencer::coauthor_topic(&model, test, SEED).unwrap();
        inferencer.init();
        inferencer.inference(3).unwrap();

        // relation ids are the trained ones, and only pairs the model knows survive
        for (m, doc) in inferencer.assignments().iter().enumerate() {
            let a = &test_authors[m];
            let known = index.id(&Relation::new(a[0], a[1]));
            match known {
                Some(id) => assert!(doc.iter().all(|x| x.entity == id)),
                None => assert!(doc.is_empty()),
            }
        }

        if inferencer.assignments().iter().any(|d| !d.is_empty()) {
            let ppx = inferencer.ppx().unwrap();
            assert!(ppx.is_finite() && ppx > 0.0, "Got perplexity {ppx}");
        }
    }

    #[test]
    fn test_coat_unseen_pairs_give_empty_held_out() {
        let train = LabelCorpus::new(Corpus::new(vec![
            Document::new(vec![0, 1]),
            Document::new(vec![1, 2]),
        ]))
        .with_labels(LabelKind::Authors, vec![vec![0, 1], vec![1, 2]])
        .unwrap();
        let mut model = Estimator::coauthor_topic(train, Parameters::new(2), SEED).unwrap();
        model.init();
        model.estimate(5).unwrap();

        let held_out = LabelCorpus::new(Corpus::new(vec![Document::new(vec![0, 2])]))
            .with_labels(LabelKind::Authors, vec![vec![0, 2]])
            .unwrap();
        let mut inferencer = Inferencer::coauthor_topic(&model, held_out, SEED).unwrap();
        inferencer.init();
        assert!(inferencer.assignments()[0].is_empty());
        assert!(matches!(inferencer.ppx(), Err(Error::EmptyHeldOut)));
    }

    #[test]
    fn test_lda_inferencer_rejects_at_model() {
        let labels = synthetic_labels();
        let mut at = Estimator::author_topic(labels.clone(), Parameters::new(3), SEED).unwrap();
        at.init();
        let lda_err = Inferencer::lda(&at, labels.into_corpus(), SEED).unwrap_err();
        assert!(matches!(
            lda_err,
            Error::ModelMismatch {
                expected: ModelKind::Lda,
                found: ModelKind::AuthorTopic
            }
        ));
    }
}
