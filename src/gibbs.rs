/*!
The collapsed Gibbs sampler shared by every topic model in this crate.

A token's latent state is an [`Assignment`]: a topic plus the entity that "wrote" it
(the document itself for LDA, an author for AT, a coauthor relation for coAT). A sweep
visits every token in document order, token order, and for each one

1. removes the token's current assignment from the [`SamplingState`],
2. asks a [`Conditional`] for a new assignment built from the [`TopicWeights`],
3. adds the new assignment back.

Which entities a document may draw from is described by [`EntityCandidates`]; a
document with no candidates is skipped entirely.

# Examples

```rust
use topic_mcmc::corpus::{Corpus, Document};
use topic_mcmc::gibbs::{EntityCandidates, GibbsChain, JointConditional};
use topic_mcmc::stats::SufficientStats;

let corpus = Corpus::new(vec![Document::new(vec![0, 1, 0]), Document::new(vec![1, 2])]);
let candidates = EntityCandidates::documents(corpus.num_docs());
let mut stats = SufficientStats::new(2, 2, corpus.num_terms(), 0.5, 0.01);

let mut chain = GibbsChain::new(42);
chain.initialize(&corpus, &candidates, &mut stats);
chain.sweep(&corpus, &candidates, &mut stats, &mut JointConditional::default());

assert_eq!(stats.total(), 5);
assert!(stats.is_consistent());
```
*/

use crate::corpus::Corpus;
use crate::rng::DiscreteRng;

/// The latent state of one token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Assignment {
    pub topic: usize,
    pub entity: usize,
}

/// Read access to the two factors of a token's conditional.
pub trait TopicWeights {
    fn num_topics(&self) -> usize;

    /// Weight of `topic` under `entity`.
    fn entity_topic(&self, entity: usize, topic: usize) -> f64;

    /// Weight of `term` under `topic`.
    fn topic_term(&self, topic: usize, term: usize) -> f64;
}

/// Tables a sweep keeps up to date while it resamples tokens.
pub trait SamplingState: TopicWeights {
    fn remove(&mut self, assignment: Assignment, term: usize);

    fn add(&mut self, assignment: Assignment, term: usize);
}

/// Draws a new assignment for one token whose own contribution has already been removed.
pub trait Conditional {
    fn sample<W: TopicWeights + ?Sized>(
        &mut self,
        weights: &W,
        candidates: &[usize],
        term: usize,
        current: Assignment,
        rng: &mut DiscreteRng,
    ) -> Assignment;
}

/**
A single draw over the joint (topic, entity) space.

The flattened index of `(k, i)` is `k * candidates.len() + i`, where `i` indexes the
document's candidate list. With one candidate per document (LDA) this is a plain
draw over topics.
*/
#[derive(Debug, Clone, Default)]
pub struct JointConditional {
    buffer: Vec<f64>,
}

impl Conditional for JointConditional {
    fn sample<W: TopicWeights + ?Sized>(
        &mut self,
        weights: &W,
        candidates: &[usize],
        term: usize,
        _current: Assignment,
        rng: &mut DiscreteRng,
    ) -> Assignment {
        let len = candidates.len();
        self.buffer.clear();
        let mut sum = 0.0;
        for k in 0..weights.num_topics() {
            let word = weights.topic_term(k, term);
            for &entity in candidates {
                let w = weights.entity_topic(entity, k) * word;
                self.buffer.push(w);
                sum += w;
            }
        }
        let idx = rng.next_discrete(&self.buffer, sum);
        Assignment {
            topic: idx / len,
            entity: candidates[idx % len],
        }
    }
}

/**
Entity first, then topic.

The entity is drawn from the candidates weighted by how much each one favours the
token's current topic; the topic is then drawn from the sampled entity's weights
times the topic-term weights, over all topics.
*/
#[derive(Debug, Clone, Default)]
pub struct TwoStageConditional {
    entity_buffer: Vec<f64>,
    topic_buffer: Vec<f64>,
}

impl Conditional for TwoStageConditional {
    fn sample<W: TopicWeights + ?Sized>(
        &mut self,
        weights: &W,
        candidates: &[usize],
        term: usize,
        current: Assignment,
        rng: &mut DiscreteRng,
    ) -> Assignment {
        self.entity_buffer.clear();
        self.entity_buffer.extend(
            candidates
                .iter()
                .map(|&e| weights.entity_topic(e, current.topic)),
        );
        let sum = self.entity_buffer.iter().sum();
        let entity = candidates[rng.next_discrete(&self.entity_buffer, sum)];

        self.topic_buffer.clear();
        self.topic_buffer.extend(
            (0..weights.num_topics())
                .map(|k| weights.entity_topic(entity, k) * weights.topic_term(k, term)),
        );
        let sum = self.topic_buffer.iter().sum();
        let topic = rng.next_discrete(&self.topic_buffer, sum);
        Assignment { topic, entity }
    }
}

/// The entities each document may assign its tokens to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityCandidates {
    lists: Vec<Vec<usize>>,
    num_entities: usize,
    sample_entity: bool,
}

impl EntityCandidates {
    /// Every document is its own single entity (LDA). No entity is ever drawn.
    pub fn documents(num_docs: usize) -> Self {
        Self {
            lists: (0..num_docs).map(|m| vec![m]).collect(),
            num_entities: num_docs,
            sample_entity: false,
        }
    }

    /// Per-document label lists over an id space of `num_entities`.
    pub fn labels(lists: Vec<Vec<usize>>, num_entities: usize) -> Self {
        Self {
            lists,
            num_entities,
            sample_entity: true,
        }
    }

    pub fn get(&self, m: usize) -> &[usize] {
        &self.lists[m]
    }

    pub fn lists(&self) -> &[Vec<usize>] {
        &self.lists
    }

    pub fn num_docs(&self) -> usize {
        self.lists.len()
    }

    pub fn num_entities(&self) -> usize {
        self.num_entities
    }

    /// Whether initialization draws an entity for every token.
    pub fn samples_entity(&self) -> bool {
        self.sample_entity
    }

    /// Number of tokens of `corpus` that take part in sampling.
    pub fn num_sampled_tokens(&self, corpus: &Corpus) -> usize {
        corpus
            .docs()
            .iter()
            .zip(self.lists.iter())
            .filter(|(_, c)| !c.is_empty())
            .map(|(d, _)| d.len())
            .sum()
    }
}

/// Per-token assignments of a corpus and the generator that drives their updates.
#[derive(Debug, Clone)]
pub struct GibbsChain {
    /// Random seed for reproducibility.
    pub seed: u64,
    rng: DiscreteRng,
    assignments: Vec<Vec<Assignment>>,
}

impl GibbsChain {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: DiscreteRng::seed_from_u64(seed),
            assignments: Vec::new(),
        }
    }

    /// Sets a new seed and restarts the generator from it.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = DiscreteRng::seed_from_u64(seed);
    }

    pub fn assignments(&self) -> &[Vec<Assignment>] {
        &self.assignments
    }

    /**
    Restarts the generator from the seed and gives every token a random assignment.

    Per token, the topic is drawn with `next_int(K)` and then, if the candidates are
    sampled, the entity with `next_int(len)`. Documents without candidates get an empty
    assignment list and add nothing to `state`.
    */
    pub fn initialize<S: SamplingState + ?Sized>(
        &mut self,
        corpus: &Corpus,
        candidates: &EntityCandidates,
        state: &mut S,
    ) {
        assert_eq!(
            corpus.num_docs(),
            candidates.num_docs(),
            "one candidate list is needed per document"
        );
        self.rng = DiscreteRng::seed_from_u64(self.seed);
        let num_topics = state.num_topics();
        self.assignments = Vec::with_capacity(corpus.num_docs());
        for (m, doc) in corpus.docs().iter().enumerate() {
            let cands = candidates.get(m);
            if cands.is_empty() {
                self.assignments.push(Vec::new());
                continue;
            }
            let mut doc_assignments = Vec::with_capacity(doc.len());
            for &term in doc.words() {
                let topic = self.rng.next_int(num_topics);
                let entity = if candidates.samples_entity() {
                    cands[self.rng.next_int(cands.len())]
                } else {
                    cands[0]
                };
                let a = Assignment { topic, entity };
                state.add(a, term);
                doc_assignments.push(a);
            }
            self.assignments.push(doc_assignments);
        }
    }

    /// One full pass over every sampled token.
    pub fn sweep<S, C>(
        &mut self,
        corpus: &Corpus,
        candidates: &EntityCandidates,
        state: &mut S,
        conditional: &mut C,
    ) where
        S: SamplingState + ?Sized,
        C: Conditional + ?Sized,
    {
        for (m, doc) in corpus.docs().iter().enumerate() {
            let cands = candidates.get(m);
            if cands.is_empty() {
                continue;
            }
            for (n, &term) in doc.words().iter().enumerate() {
                let current = self.assignments[m][n];
                state.remove(current, term);
                let next = conditional.sample(&*state, cands, term, current, &mut self.rng);
                state.add(next, term);
                self.assignments[m][n] = next;
            }
        }
    }
}
