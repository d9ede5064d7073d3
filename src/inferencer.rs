/*!
Held-out inference against a trained model.

An [`Inferencer`] takes a frozen [`Posterior`] from a trained [`Estimator`] and a
held-out corpus, samples topic (and entity) assignments for the held-out tokens, and
computes the held-out perplexity.

* LDA folds the held-out documents in: it keeps local document-topic counts for the
  held-out documents and samples from `(nmk + alpha) * varphi[k][t]`.
* AT and coAT keep no local counts. Every sweep resamples each token from the trained
  `vartheta` and `varphi`, so successive sweeps are independent draws from the same
  distribution.

The trained model is never touched; the inferencer owns its copy of the posterior.
*/

use ndarray::{Array1, Array2, ArrayView2};

use crate::core::{run_chain, MarkovChain};
use crate::corpus::Corpus;
use crate::error::{Error, Result};
use crate::estimator::{Estimator, ModelKind};
use crate::gibbs::{
    Assignment, Conditional, EntityCandidates, GibbsChain, JointConditional, SamplingState,
    TopicWeights, TwoStageConditional,
};
use crate::labels::{CoauthorIndex, LabelCorpus, LabelKind, Relation};
use crate::params::Parameters;
use crate::stats::Posterior;

pub type LdaInferencer = Inferencer<JointConditional>;
pub type AtInferencer = Inferencer<JointConditional>;
pub type CoatInferencer = Inferencer<TwoStageConditional>;

/// Document-topic counts of the held-out documents (LDA fold-in).
#[derive(Debug, Clone, PartialEq)]
struct LocalCounts {
    alpha: f64,
    nmk: Array2<u32>,
    nm: Array1<u32>,
}

impl LocalCounts {
    fn new(num_docs: usize, num_topics: usize, alpha: f64) -> Self {
        Self {
            alpha,
            nmk: Array2::zeros((num_docs, num_topics)),
            nm: Array1::zeros(num_docs),
        }
    }

    fn vartheta(&self) -> Array2<f64> {
        let k_alpha = self.nmk.ncols() as f64 * self.alpha;
        let mut out = Array2::zeros(self.nmk.dim());
        for ((m, k), x) in out.indexed_iter_mut() {
            *x = (self.nmk[[m, k]] as f64 + self.alpha) / (self.nm[m] as f64 + k_alpha);
        }
        out
    }
}

/// Local counts for the document factor, trained `varphi` for the term factor.
struct FoldIn<'a> {
    local: &'a mut LocalCounts,
    varphi: ArrayView2<'a, f64>,
}

impl TopicWeights for FoldIn<'_> {
    fn num_topics(&self) -> usize {
        self.varphi.nrows()
    }

    fn entity_topic(&self, entity: usize, topic: usize) -> f64 {
        self.local.nmk[[entity, topic]] as f64 + self.local.alpha
    }

    fn topic_term(&self, topic: usize, term: usize) -> f64 {
        self.varphi[[topic, term]]
    }
}

impl SamplingState for FoldIn<'_> {
    fn remove(&mut self, a: Assignment, _term: usize) {
        self.local.nmk[[a.entity, a.topic]] -= 1;
        self.local.nm[a.entity] -= 1;
    }

    fn add(&mut self, a: Assignment, _term: usize) {
        self.local.nmk[[a.entity, a.topic]] += 1;
        self.local.nm[a.entity] += 1;
    }
}

#[derive(Debug, Clone)]
pub struct Inferencer<C> {
    kind: ModelKind,
    corpus: Corpus,
    params: Parameters,
    posterior: Posterior,
    candidates: EntityCandidates,
    coauthors: Option<CoauthorIndex>,
    local: Option<LocalCounts>,
    chain: GibbsChain,
    conditional: C,
    initialized: bool,
}

impl Inferencer<JointConditional> {
    /// Folds `corpus` into a trained LDA model.
    pub fn lda(model: &Estimator<JointConditional>, corpus: Corpus, seed: u64) -> Result<Self> {
        expect_kind(ModelKind::Lda, model.kind())?;
        let posterior = trained_posterior(model, &corpus)?;
        let params = *model.params();
        let candidates = EntityCandidates::documents(corpus.num_docs());
        let local = LocalCounts::new(corpus.num_docs(), params.num_topics(), params.alpha());
        Ok(Self::new(
            ModelKind::Lda,
            corpus,
            params,
            posterior,
            candidates,
            None,
            Some(local),
            seed,
        ))
    }

    /// Held-out documents of a trained Author-Topic model. Every author id must be known
    /// to the trained model.
    pub fn author_topic(
        model: &Estimator<JointConditional>,
        mut labels: LabelCorpus,
        seed: u64,
    ) -> Result<Self> {
        expect_kind(ModelKind::AuthorTopic, model.kind())?;
        let posterior = trained_posterior(model, labels.corpus())?;
        let num_authors = model.num_entities();
        let authors = labels.doc_labels(LabelKind::Authors)?.to_vec();
        for (doc, list) in authors.iter().enumerate() {
            if let Some(&entity) = list.iter().find(|&&a| a >= num_authors) {
                return Err(Error::UnknownEntity {
                    doc,
                    entity,
                    num_entities: num_authors,
                });
            }
        }
        let candidates = EntityCandidates::labels(authors, num_authors);
        Ok(Self::new(
            ModelKind::AuthorTopic,
            labels.into_corpus(),
            *model.params(),
            posterior,
            candidates,
            None,
            None,
            seed,
        ))
    }
}

impl Inferencer<TwoStageConditional> {
    /**
    Held-out documents of a trained coAuthor-Topic model.

    Author pairs are looked up in the trained model's coauthor index so relation ids
    line up with the rows of the trained `vartheta`. Pairs the trained model has never
    seen are dropped from the document's candidates.
    */
    pub fn coauthor_topic(
        model: &Estimator<TwoStageConditional>,
        mut labels: LabelCorpus,
        seed: u64,
    ) -> Result<Self> {
        expect_kind(ModelKind::CoauthorTopic, model.kind())?;
        let posterior = trained_posterior(model, labels.corpus())?;
        let index = model
            .coauthor_index()
            .cloned()
            .unwrap_or_default();
        let authors = labels.doc_labels(LabelKind::Authors)?;
        let mut lists = Vec::with_capacity(authors.len());
        let mut dropped = 0;
        for a in authors {
            let mut rels = Vec::new();
            for i in 0..a.len() {
                for j in (i + 1)..a.len() {
                    match index.id(&Relation::new(a[i], a[j])) {
                        Some(id) => rels.push(id),
                        None => dropped += 1,
                    }
                }
            }
            lists.push(rels);
        }
        if dropped > 0 {
            log::warn!("{dropped} held-out coauthor pairs are unknown to the trained model");
        }
        let candidates = EntityCandidates::labels(lists, index.num_relations());
        Ok(Self::new(
            ModelKind::CoauthorTopic,
            labels.into_corpus(),
            *model.params(),
            posterior,
            candidates,
            Some(index),
            None,
            seed,
        ))
    }
}

fn expect_kind(expected: ModelKind, found: ModelKind) -> Result<()> {
    if expected != found {
        return Err(Error::ModelMismatch { expected, found });
    }
    Ok(())
}

/// The trained posteriors, after checking the held-out terms fit the trained vocabulary.
fn trained_posterior<C: Conditional>(model: &Estimator<C>, corpus: &Corpus) -> Result<Posterior> {
    if !model.is_initialized() {
        return Err(Error::NotInitialized);
    }
    let num_terms = model.corpus().num_terms();
    for (doc, d) in corpus.docs().iter().enumerate() {
        if let Some(&term) = d.words().iter().find(|&&t| t >= num_terms) {
            return Err(Error::TermOutOfRange {
                doc,
                term,
                num_terms,
            });
        }
    }
    model.posterior()
}

impl<C: Conditional + Default> Inferencer<C> {
    #[allow(clippy::too_many_arguments)]
    fn new(
        kind: ModelKind,
        corpus: Corpus,
        params: Parameters,
        posterior: Posterior,
        candidates: EntityCandidates,
        coauthors: Option<CoauthorIndex>,
        local: Option<LocalCounts>,
        seed: u64,
    ) -> Self {
        Self {
            kind,
            corpus,
            params,
            posterior,
            candidates,
            coauthors,
            local,
            chain: GibbsChain::new(seed),
            conditional: C::default(),
            initialized: false,
        }
    }
}

impl<C: Conditional> Inferencer<C> {
    /// Random assignment of every held-out token, as in [`Estimator::init`].
    pub fn init(&mut self) {
        log::info!(
            "init {} inferencer: M = {}, K = {}",
            self.kind,
            self.corpus.num_docs(),
            self.params.num_topics()
        );
        match self.local.as_mut() {
            Some(local) => {
                *local = LocalCounts::new(local.nmk.nrows(), local.nmk.ncols(), local.alpha);
                let mut state = FoldIn {
                    local,
                    varphi: self.posterior.varphi.view(),
                };
                self.chain
                    .initialize(&self.corpus, &self.candidates, &mut state);
            }
            None => {
                self.chain
                    .initialize(&self.corpus, &self.candidates, &mut self.posterior);
            }
        }
        self.initialized = true;
    }

    /// Runs `niter` Gibbs sweeps over the held-out tokens.
    pub fn inference(&mut self, niter: usize) -> Result<()> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        log::info!("inferring {niter} iterations of {}", self.kind);
        run_chain(self, niter)
    }

    /**
    Held-out perplexity `exp(-loglik / W)`, with

    `loglik = Σ_m Σ_n ln Σ_k Σ_i varphi[k][t] · vartheta[c_i][k] − Σ_m N_m · ln |c|`

    where `c` is the document's candidate list. Documents without candidates are
    left out of both the likelihood and the token count `W`.
    */
    pub fn ppx(&self) -> Result<f64> {
        let local_vartheta = self.local.as_ref().map(LocalCounts::vartheta);
        let vartheta = local_vartheta.as_ref().unwrap_or(&self.posterior.vartheta);
        let varphi = &self.posterior.varphi;
        let num_topics = varphi.nrows();

        let mut loglik = 0.0;
        let mut num_words = 0usize;
        for (m, doc) in self.corpus.docs().iter().enumerate() {
            let cands = self.candidates.get(m);
            if cands.is_empty() {
                continue;
            }
            for (n, &term) in doc.words().iter().enumerate() {
                let mut p = 0.0;
                for k in 0..num_topics {
                    let entity_mass: f64 = cands.iter().map(|&e| vartheta[[e, k]]).sum();
                    p += varphi[[k, term]] * entity_mass;
                }
                if !(p > 0.0) {
                    return Err(Error::NonPositiveMass {
                        table: "likelihood",
                        row: m,
                        col: n,
                        value: p,
                    });
                }
                loglik += p.ln();
            }
            loglik -= doc.len() as f64 * (cands.len() as f64).ln();
            num_words += doc.len();
        }
        if num_words == 0 {
            return Err(Error::EmptyHeldOut);
        }
        let ppx = (-loglik / num_words as f64).exp();
        log::info!("{} perplexity over {num_words} tokens: {ppx}", self.kind);
        Ok(ppx)
    }

    /// Topic proportions of the held-out documents (LDA) or the trained entities (AT, coAT).
    pub fn vartheta(&self) -> Array2<f64> {
        match &self.local {
            Some(local) => local.vartheta(),
            None => self.posterior.vartheta.clone(),
        }
    }

    pub fn posterior(&self) -> &Posterior {
        &self.posterior
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

    pub fn candidates(&self) -> &EntityCandidates {
        &self.candidates
    }

    /// The trained coauthor index a coAT inferencer resolves relation ids against.
    pub fn coauthor_index(&self) -> Option<&CoauthorIndex> {
        self.coauthors.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

impl<C: Conditional> MarkovChain for Inferencer<C> {
    fn step(&mut self) -> Result<()> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        match self.local.as_mut() {
            Some(local) => {
                let mut state = FoldIn {
                    local,
                    varphi: self.posterior.varphi.view(),
                };
                self.chain.sweep(
                    &self.corpus,
                    &self.candidates,
                    &mut state,
                    &mut self.conditional,
                );
            }
            None => {
                self.chain.sweep(
                    &self.corpus,
                    &self.candidates,
                    &mut self.posterior,
                    &mut self.conditional,
                );
            }
        }
        Ok(())
    }

    fn assignments(&self) -> &[Vec<Assignment>] {
        self.chain.assignments()
    }
}
