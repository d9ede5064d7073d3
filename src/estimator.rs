/*!
Training-time samplers for LDA, the Author-Topic model and the coAuthor-Topic model.

All three are an [`Estimator`]: one count table layout ([`SufficientStats`]), one
[`GibbsChain`], and a [`Conditional`] deciding how a token's new assignment is drawn.
They differ in the entity dimension only:

| model | entity | candidates per document | conditional |
|---|---|---|---|
| LDA | document | the document itself | [`JointConditional`] |
| AT | author | the document's authors | [`JointConditional`] |
| coAT | coauthor relation | the document's author pairs | [`TwoStageConditional`] |

An estimator is created uninitialized. [`Estimator::init`] draws random assignments
and fills the count tables; [`Estimator::estimate`] then runs Gibbs sweeps and may be
called any number of times.

# Examples

```rust
use topic_mcmc::corpus::{Corpus, Document};
use topic_mcmc::estimator::Estimator;
use topic_mcmc::params::Parameters;

let corpus = Corpus::new(vec![Document::new(vec![0, 1, 0]), Document::new(vec![1, 2])]);
let mut model = Estimator::lda(corpus, Parameters::new(2), 56567651);
model.init();
model.estimate(20).unwrap();

let varphi = model.varphi(false).unwrap();
assert_eq!(varphi.dim(), (2, 3));
```
*/

use std::fmt;

use ndarray::{Array1, Array2};

use crate::core::{run_chain, MarkovChain};
use crate::corpus::Corpus;
use crate::error::{Error, Result};
use crate::gibbs::{
    Assignment, Conditional, EntityCandidates, GibbsChain, JointConditional,
    TwoStageConditional,
};
use crate::labels::{CoauthorIndex, LabelCorpus, LabelKind};
use crate::params::Parameters;
use crate::stats::{Posterior, SufficientStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    Lda,
    AuthorTopic,
    CoauthorTopic,
}

impl ModelKind {
    /// The label file the model's entities come from, if any.
    pub fn label_kind(self) -> Option<LabelKind> {
        match self {
            ModelKind::Lda => None,
            ModelKind::AuthorTopic | ModelKind::CoauthorTopic => Some(LabelKind::Authors),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelKind::Lda => "LDA",
            ModelKind::AuthorTopic => "AT",
            ModelKind::CoauthorTopic => "coAT",
        })
    }
}

pub type LdaEstimator = Estimator<JointConditional>;
pub type AtEstimator = Estimator<JointConditional>;
pub type CoatEstimator = Estimator<TwoStageConditional>;

#[derive(Debug, Clone)]
pub struct Estimator<C> {
    kind: ModelKind,
    corpus: Corpus,
    params: Parameters,
    candidates: EntityCandidates,
    coauthors: Option<CoauthorIndex>,
    stats: SufficientStats,
    chain: GibbsChain,
    conditional: C,
    initialized: bool,
}

impl Estimator<JointConditional> {
    /// Latent Dirichlet allocation: each document is its own entity.
    pub fn lda(corpus: Corpus, params: Parameters, seed: u64) -> Self {
        let candidates = EntityCandidates::documents(corpus.num_docs());
        Self::new(ModelKind::Lda, corpus, params, candidates, None, seed)
    }

    /// The Author-Topic model over the corpus' author labels.
    pub fn author_topic(mut labels: LabelCorpus, params: Parameters, seed: u64) -> Result<Self> {
        let authors = labels.doc_labels(LabelKind::Authors)?.to_vec();
        let num_authors = labels.labels_v(LabelKind::Authors)?;
        let candidates = EntityCandidates::labels(authors, num_authors);
        Ok(Self::new(
            ModelKind::AuthorTopic,
            labels.into_corpus(),
            params,
            candidates,
            None,
            seed,
        ))
    }
}

impl Estimator<TwoStageConditional> {
    /// The coAuthor-Topic model over the corpus' coauthor relations.
    pub fn coauthor_topic(mut labels: LabelCorpus, params: Parameters, seed: u64) -> Result<Self> {
        let index = labels.coauthors()?.clone();
        let candidates =
            EntityCandidates::labels(index.doc_relation_lists().to_vec(), index.num_relations());
        Ok(Self::new(
            ModelKind::CoauthorTopic,
            labels.into_corpus(),
            params,
            candidates,
            Some(index),
            seed,
        ))
    }
}

impl<C: Conditional + Default> Estimator<C> {
    fn new(
        kind: ModelKind,
        corpus: Corpus,
        params: Parameters,
        candidates: EntityCandidates,
        coauthors: Option<CoauthorIndex>,
        seed: u64,
    ) -> Self {
        let stats = fresh_stats(kind, &corpus, &params, &candidates);
        Self {
            kind,
            corpus,
            params,
            candidates,
            coauthors,
            stats,
            chain: GibbsChain::new(seed),
            conditional: C::default(),
            initialized: false,
        }
    }
}

fn fresh_stats(
    kind: ModelKind,
    corpus: &Corpus,
    params: &Parameters,
    candidates: &EntityCandidates,
) -> SufficientStats {
    let stats = SufficientStats::new(
        candidates.num_entities(),
        params.num_topics(),
        corpus.num_terms(),
        params.alpha(),
        params.beta(),
    );
    match kind {
        ModelKind::Lda => stats.unnormalized_entities(),
        _ => stats,
    }
}

impl<C: Conditional> Estimator<C> {
    /// Random assignment of every token, then count accumulation. Calling it again
    /// restarts the chain from the seed.
    pub fn init(&mut self) {
        log::info!(
            "init {} estimator: M = {}, V = {}, K = {}, entities = {}",
            self.kind,
            self.corpus.num_docs(),
            self.corpus.num_terms(),
            self.params.num_topics(),
            self.candidates.num_entities()
        );
        self.stats = fresh_stats(self.kind, &self.corpus, &self.params, &self.candidates);
        self.chain
            .initialize(&self.corpus, &self.candidates, &mut self.stats);
        self.initialized = true;
        debug_assert!(self.check_invariants(), "count tables inconsistent after init");
    }

    /// Runs `niter` more Gibbs sweeps.
    pub fn estimate(&mut self, niter: usize) -> Result<()> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        log::info!("sampling {niter} iterations of {}", self.kind);
        run_chain(self, niter)?;
        log::info!("done sampling {}", self.kind);
        Ok(())
    }

    /**
    Whether the count tables agree with each other and with the assignments:

    * `nk[k] == Σ_t nkt[k][t]` and `ne[e] == Σ_k nek[e][k]`,
    * `Σ_k nk[k]` equals the number of sampled tokens,
    * for LDA, `Σ_k nmk[m][k]` equals the length of document `m`.
    */
    pub fn check_invariants(&self) -> bool {
        if !self.stats.is_consistent() {
            return false;
        }
        let sampled = self.candidates.num_sampled_tokens(&self.corpus) as u64;
        if self.initialized && self.stats.total() != sampled {
            return false;
        }
        if self.kind == ModelKind::Lda && self.initialized {
            let lengths_ok = self
                .stats
                .entity_counts()
                .iter()
                .enumerate()
                .all(|(m, &n)| n as usize == self.corpus.num_words_in(m));
            if !lengths_ok {
                return false;
            }
        }
        true
    }

    /// A copy of the current `vartheta` and `varphi`, for handing to an inferencer.
    pub fn posterior(&self) -> Result<Posterior> {
        Ok(Posterior {
            vartheta: self.stats.vartheta(false)?,
            varphi: self.stats.varphi(false)?,
        })
    }

    /// Entity-topic posterior, rows indexed by document, author or relation id.
    pub fn vartheta(&self, log: bool) -> Result<Array2<f64>> {
        self.stats.vartheta(log)
    }

    pub fn vartheta_row(&self, entity: usize, log: bool) -> Result<Array1<f64>> {
        self.stats.vartheta_row(entity, log)
    }

    pub fn vartheta_at(&self, entity: usize, topic: usize, log: bool) -> Result<f64> {
        self.stats.vartheta_at(entity, topic, log)
    }

    /// Topic-term posterior.
    pub fn varphi(&self, log: bool) -> Result<Array2<f64>> {
        self.stats.varphi(log)
    }

    pub fn varphi_row(&self, topic: usize, log: bool) -> Result<Array1<f64>> {
        self.stats.varphi_row(topic, log)
    }

    pub fn varphi_at(&self, topic: usize, term: usize, log: bool) -> Result<f64> {
        self.stats.varphi_at(topic, term, log)
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn seed(&self) -> u64 {
        self.chain.seed
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn stats(&self) -> &SufficientStats {
        &self.stats
    }

    pub fn candidates(&self) -> &EntityCandidates {
        &self.candidates
    }

    pub fn num_entities(&self) -> usize {
        self.candidates.num_entities()
    }

    /// The relation ids of a coAT model.
    pub fn coauthor_index(&self) -> Option<&CoauthorIndex> {
        self.coauthors.as_ref()
    }
}

impl<C: Conditional> MarkovChain for Estimator<C> {
    fn step(&mut self) -> Result<()> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        self.chain.sweep(
            &self.corpus,
            &self.candidates,
            &mut self.stats,
            &mut self.conditional,
        );
        debug_assert!(self.check_invariants(), "count tables inconsistent after a sweep");
        Ok(())
    }

    fn assignments(&self) -> &[Vec<Assignment>] {
        self.chain.assignments()
    }
}
