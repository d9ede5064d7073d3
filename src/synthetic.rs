/*!
Corpora drawn from the generative processes of LDA and the Author-Topic model.

Useful as fixtures: the true topic proportions and topic-term distributions are kept
next to the sampled documents, so a trained model can be compared against them.

# Examples

```rust
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use topic_mcmc::synthetic::Generator;

let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
let data = Generator::new(4, 30).with_doc_len(25).lda(&mut rng, 10).unwrap();
assert_eq!(data.labels.num_docs(), 10);
assert_eq!(data.phi.dim(), (4, 30));
```
*/

use ndarray::Array2;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::index;
use rand::Rng;
use rand_distr::Gamma;

use crate::corpus::{Corpus, Document};
use crate::error::{Error, Result};
use crate::labels::{LabelCorpus, LabelKind};

/// Sizes and Dirichlet concentrations of a synthetic corpus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Generator {
    pub num_topics: usize,
    pub num_terms: usize,
    pub doc_len: usize,
    pub alpha: f64,
    pub beta: f64,
}

/// A sampled corpus and the parameters it was sampled from.
#[derive(Debug, Clone)]
pub struct Synthetic {
    /// The documents, with author labels for AT corpora.
    pub labels: LabelCorpus,
    /// Topic proportions of every document (LDA) or author (AT).
    pub theta: Array2<f64>,
    pub phi: Array2<f64>,
    /// The topic each token was drawn from.
    pub topics: Vec<Vec<usize>>,
}

impl Generator {
    pub fn new(num_topics: usize, num_terms: usize) -> Self {
        Self {
            num_topics,
            num_terms,
            doc_len: 50,
            alpha: 0.5,
            beta: 0.1,
        }
    }

    pub fn with_doc_len(mut self, doc_len: usize) -> Self {
        self.doc_len = doc_len;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    /// `num_docs` documents, each with its own topic proportions.
    pub fn lda<R: Rng + ?Sized>(&self, rng: &mut R, num_docs: usize) -> Result<Synthetic> {
        self.check()?;
        let phi = self.topic_terms(rng)?;
        let theta = dirichlet_rows(rng, self.alpha, num_docs, self.num_topics)?;
        let term_dists = categoricals(&phi)?;
        let topic_dists = categoricals(&theta)?;

        let mut docs = Vec::with_capacity(num_docs);
        let mut topics = Vec::with_capacity(num_docs);
        for topic_dist in &topic_dists {
            let z: Vec<usize> = (0..self.doc_len).map(|_| topic_dist.sample(rng)).collect();
            docs.push(z.iter().map(|&k| term_dists[k].sample(rng)).collect::<Document>());
            topics.push(z);
        }
        let corpus = Corpus::with_num_terms(docs, self.num_terms)?;
        Ok(Synthetic {
            labels: LabelCorpus::new(corpus),
            theta,
            phi,
            topics,
        })
    }

    /// `num_docs` documents, each written by `authors_per_doc` distinct authors out of
    /// `num_authors`. Every token picks one of its document's authors uniformly, then a
    /// topic from that author's proportions.
    pub fn author_topic<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        num_docs: usize,
        num_authors: usize,
        authors_per_doc: usize,
    ) -> Result<Synthetic> {
        self.check()?;
        if authors_per_doc == 0 || authors_per_doc > num_authors {
            return Err(Error::Config(format!(
                "cannot pick {authors_per_doc} authors per document out of {num_authors}"
            )));
        }
        let phi = self.topic_terms(rng)?;
        let theta = dirichlet_rows(rng, self.alpha, num_authors, self.num_topics)?;
        let term_dists = categoricals(&phi)?;
        let topic_dists = categoricals(&theta)?;

        let mut docs = Vec::with_capacity(num_docs);
        let mut topics = Vec::with_capacity(num_docs);
        let mut authors = Vec::with_capacity(num_docs);
        for _ in 0..num_docs {
            let doc_authors = index::sample(rng, num_authors, authors_per_doc).into_vec();
            let mut z = Vec::with_capacity(self.doc_len);
            let mut words = Vec::with_capacity(self.doc_len);
            for _ in 0..self.doc_len {
                let author = doc_authors[rng.gen_range(0..doc_authors.len())];
                let k = topic_dists[author].sample(rng);
                words.push(term_dists[k].sample(rng));
                z.push(k);
            }
            docs.push(Document::new(words));
            topics.push(z);
            authors.push(doc_authors);
        }
        let corpus = Corpus::with_num_terms(docs, self.num_terms)?;
        Ok(Synthetic {
            labels: LabelCorpus::new(corpus).with_labels(LabelKind::Authors, authors)?,
            theta,
            phi,
            topics,
        })
    }

    fn check(&self) -> Result<()> {
        if self.num_topics == 0 || self.num_terms == 0 {
            return Err(Error::Config(
                "a synthetic corpus needs at least one topic and one term".to_string(),
            ));
        }
        Ok(())
    }

    fn topic_terms<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Array2<f64>> {
        dirichlet_rows(rng, self.beta, self.num_topics, self.num_terms)
    }
}

/// `rows` independent draws from a symmetric Dirichlet of dimension `dim`, via
/// normalized Gamma variates.
fn dirichlet_rows<R: Rng + ?Sized>(
    rng: &mut R,
    concentration: f64,
    rows: usize,
    dim: usize,
) -> Result<Array2<f64>> {
    let gamma = Gamma::new(concentration, 1.0).map_err(|e| Error::Config(e.to_string()))?;
    let mut out = Array2::zeros((rows, dim));
    for mut row in out.rows_mut() {
        row.iter_mut().for_each(|x| *x = gamma.sample(rng));
        let total = row.sum();
        if total > 0.0 {
            row /= total;
        } else {
            // every variate underflowed; fall back to a uniform row
            row.fill(1.0 / dim as f64);
        }
    }
    Ok(out)
}

fn categoricals(probs: &Array2<f64>) -> Result<Vec<WeightedIndex<f64>>> {
    probs
        .rows()
        .into_iter()
        .map(|row| WeightedIndex::new(row.iter().copied()).map_err(|e| Error::Config(e.to_string())))
        .collect()
}
