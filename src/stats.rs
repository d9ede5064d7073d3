//! Count tables of a collapsed Gibbs sampler and the smoothed posteriors derived from them.
//!
//! One table layout serves all three models. The entity dimension is the document
//! (LDA), the author (AT) or the coauthor relation (coAT):
//!
//! * `nek[e][k]`: tokens of entity `e` assigned to topic `k` (`nmk`, `nak`, `nrk`)
//! * `ne[e]`: tokens of entity `e` (`na`, `nr`; the document length for LDA)
//! * `nkt[k][t]`: tokens of term `t` assigned to topic `k`
//! * `nk[k]`: tokens assigned to topic `k`

use ndarray::prelude::*;

use crate::error::{Error, Result};
use crate::gibbs::{Assignment, SamplingState, TopicWeights};

#[derive(Debug, Clone, PartialEq)]
pub struct SufficientStats {
    alpha: f64,
    beta: f64,
    k_alpha: f64,
    v_beta: f64,
    // the LDA conditional uses nmk + alpha unnormalized, its denominator is constant in k
    normalize_entities: bool,
    nek: Array2<u32>,
    ne: Array1<u32>,
    nkt: Array2<u32>,
    nk: Array1<u32>,
}

impl SufficientStats {
    pub fn new(
        num_entities: usize,
        num_topics: usize,
        num_terms: usize,
        alpha: f64,
        beta: f64,
    ) -> Self {
        Self {
            alpha,
            beta,
            k_alpha: num_topics as f64 * alpha,
            v_beta: num_terms as f64 * beta,
            normalize_entities: true,
            nek: Array2::zeros((num_entities, num_topics)),
            ne: Array1::zeros(num_entities),
            nkt: Array2::zeros((num_topics, num_terms)),
            nk: Array1::zeros(num_topics),
        }
    }

    /// Leaves the entity factor of the conditional as `nek + alpha`.
    pub(crate) fn unnormalized_entities(mut self) -> Self {
        self.normalize_entities = false;
        self
    }

    pub fn num_entities(&self) -> usize {
        self.ne.len()
    }

    pub fn num_terms(&self) -> usize {
        self.nkt.ncols()
    }

    pub fn entity_topic_counts(&self) -> ArrayView2<'_, u32> {
        self.nek.view()
    }

    pub fn entity_counts(&self) -> ArrayView1<'_, u32> {
        self.ne.view()
    }

    pub fn topic_term_counts(&self) -> ArrayView2<'_, u32> {
        self.nkt.view()
    }

    pub fn topic_counts(&self) -> ArrayView1<'_, u32> {
        self.nk.view()
    }

    /// Total number of tokens counted.
    pub fn total(&self) -> u64 {
        self.nk.iter().map(|&c| c as u64).sum()
    }

    pub fn add(&mut self, a: Assignment, term: usize) {
        self.nek[[a.entity, a.topic]] += 1;
        self.ne[a.entity] += 1;
        self.nkt[[a.topic, term]] += 1;
        self.nk[a.topic] += 1;
    }

    pub fn remove(&mut self, a: Assignment, term: usize) {
        self.nek[[a.entity, a.topic]] -= 1;
        self.ne[a.entity] -= 1;
        self.nkt[[a.topic, term]] -= 1;
        self.nk[a.topic] -= 1;
    }

    /// `nk[k] == Σ_t nkt[k][t]` for every topic and `ne[e] == Σ_k nek[e][k]` for every entity.
    pub fn is_consistent(&self) -> bool {
        let topics_ok = self
            .nkt
            .rows()
            .into_iter()
            .zip(self.nk.iter())
            .all(|(row, &total)| row.iter().map(|&c| c as u64).sum::<u64>() == total as u64);
        let entities_ok = self
            .nek
            .rows()
            .into_iter()
            .zip(self.ne.iter())
            .all(|(row, &total)| row.iter().map(|&c| c as u64).sum::<u64>() == total as u64);
        topics_ok && entities_ok
    }

    fn vartheta_value(&self, i: usize, k: usize) -> f64 {
        (self.nek[[i, k]] as f64 + self.alpha) / (self.ne[i] as f64 + self.k_alpha)
    }

    fn varphi_value(&self, k: usize, v: usize) -> f64 {
        (self.nkt[[k, v]] as f64 + self.beta) / (self.nk[k] as f64 + self.v_beta)
    }

    /// `vartheta[i][k] = (nek[i][k] + alpha) / (ne[i] + K alpha)`, natural log if `log`.
    pub fn vartheta_at(&self, i: usize, k: usize, log: bool) -> Result<f64> {
        transform("vartheta", i, k, self.vartheta_value(i, k), log)
    }

    pub fn vartheta_row(&self, i: usize, log: bool) -> Result<Array1<f64>> {
        (0..self.nek.ncols())
            .map(|k| self.vartheta_at(i, k, log))
            .collect::<Result<Vec<_>>>()
            .map(Array1::from)
    }

    pub fn vartheta(&self, log: bool) -> Result<Array2<f64>> {
        let mut out = Array2::zeros(self.nek.dim());
        for ((i, k), x) in out.indexed_iter_mut() {
            *x = self.vartheta_at(i, k, log)?;
        }
        Ok(out)
    }

    /// `varphi[k][v] = (nkt[k][v] + beta) / (nk[k] + V beta)`, natural log if `log`.
    pub fn varphi_at(&self, k: usize, v: usize, log: bool) -> Result<f64> {
        transform("varphi", k, v, self.varphi_value(k, v), log)
    }

    pub fn varphi_row(&self, k: usize, log: bool) -> Result<Array1<f64>> {
        (0..self.nkt.ncols())
            .map(|v| self.varphi_at(k, v, log))
            .collect::<Result<Vec<_>>>()
            .map(Array1::from)
    }

    pub fn varphi(&self, log: bool) -> Result<Array2<f64>> {
        let mut out = Array2::zeros(self.nkt.dim());
        for ((k, v), x) in out.indexed_iter_mut() {
            *x = self.varphi_at(k, v, log)?;
        }
        Ok(out)
    }
}

/// Rejects a non-positive or NaN mass, then optionally moves it to log space.
fn transform(table: &'static str, row: usize, col: usize, value: f64, log: bool) -> Result<f64> {
    if !log {
        return Ok(value);
    }
    let logged = value.ln();
    if !(value > 0.0) || logged.is_nan() {
        return Err(Error::NonPositiveMass {
            table,
            row,
            col,
            value,
        });
    }
    Ok(logged)
}

impl TopicWeights for SufficientStats {
    fn num_topics(&self) -> usize {
        self.nk.len()
    }

    fn entity_topic(&self, entity: usize, topic: usize) -> f64 {
        if self.normalize_entities {
            self.vartheta_value(entity, topic)
        } else {
            self.nek[[entity, topic]] as f64 + self.alpha
        }
    }

    fn topic_term(&self, topic: usize, term: usize) -> f64 {
        self.varphi_value(topic, term)
    }
}

impl SamplingState for SufficientStats {
    fn remove(&mut self, assignment: Assignment, term: usize) {
        SufficientStats::remove(self, assignment, term);
    }

    fn add(&mut self, assignment: Assignment, term: usize) {
        SufficientStats::add(self, assignment, term);
    }
}

/**
A frozen snapshot of a trained model: `vartheta` (entities × topics) and `varphi`
(topics × terms), both in probability space.

Inferencers own one of these; it is never written to after being taken, so held-out
sampling against it is reproducible.
*/
#[derive(Debug, Clone, PartialEq)]
pub struct Posterior {
    pub vartheta: Array2<f64>,
    pub varphi: Array2<f64>,
}

impl Posterior {
    pub fn num_entities(&self) -> usize {
        self.vartheta.nrows()
    }

    pub fn num_terms(&self) -> usize {
        self.varphi.ncols()
    }
}

impl TopicWeights for Posterior {
    fn num_topics(&self) -> usize {
        self.varphi.nrows()
    }

    fn entity_topic(&self, entity: usize, topic: usize) -> f64 {
        self.vartheta[[entity, topic]]
    }

    fn topic_term(&self, topic: usize, term: usize) -> f64 {
        self.varphi[[topic, term]]
    }
}

// Held-out sampling from fixed posteriors never changes them.
impl SamplingState for Posterior {
    fn remove(&mut self, _assignment: Assignment, _term: usize) {}

    fn add(&mut self, _assignment: Assignment, _term: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn filled() -> SufficientStats {
        let mut stats = SufficientStats::new(2, 3, 4, 0.5, 0.1);
        let tokens = [(0, 0, 1), (0, 2, 3), (1, 1, 1), (1, 1, 0), (0, 0, 2)];
        for &(entity, topic, term) in &tokens {
            stats.add(Assignment { topic, entity }, term);
        }
        stats
    }

    #[test]
    fn test_add_remove_keeps_invariants() {
        let mut stats = filled();
        assert!(stats.is_consistent());
        assert_eq!(stats.total(), 5);
        let a = Assignment {
            topic: 1,
            entity: 1,
        };
        stats.remove(a, 1);
        assert!(stats.is_consistent());
        assert_eq!(stats.total(), 4);
        stats.add(a, 1);
        assert_eq!(stats, filled());
    }

    #[test]
    fn test_inconsistency_detected() {
        let mut stats = filled();
        stats.nk[0] += 1;
        assert!(!stats.is_consistent());
    }

    #[test]
    fn test_vartheta_formula_and_normalization() {
        let stats = filled();
        // entity 0 has 3 tokens, 2 of them on topic 0
        assert_abs_diff_eq!(
            stats.vartheta_at(0, 0, false).unwrap(),
            (2.0 + 0.5) / (3.0 + 1.5),
            epsilon = 1e-12
        );
        let vartheta = stats.vartheta(false).unwrap();
        for row in vartheta.rows() {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-12);
        }
        assert_eq!(stats.vartheta_row(1, false).unwrap(), vartheta.row(1));
    }

    #[test]
    fn test_varphi_formula_and_normalization() {
        let stats = filled();
        assert_abs_diff_eq!(
            stats.varphi_at(1, 1, false).unwrap(),
            (1.0 + 0.1) / (2.0 + 0.4),
            epsilon = 1e-12
        );
        let varphi = stats.varphi(false).unwrap();
        for row in varphi.rows() {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_log_space() {
        let stats = filled();
        let plain = stats.varphi(false).unwrap();
        let logged = stats.varphi(true).unwrap();
        assert_abs_diff_eq!(logged, plain.mapv(f64::ln), epsilon = 1e-12);
        assert_abs_diff_eq!(
            stats.varphi_row(2, true).unwrap(),
            plain.row(2).mapv(f64::ln),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_non_positive_mass_is_an_error() {
        match transform("varphi", 3, 4, 0.0, true) {
            Err(Error::NonPositiveMass { row, col, .. }) => assert_eq!((row, col), (3, 4)),
            other => panic!("Expected NonPositiveMass, got {other:?}"),
        }
        assert!(transform("vartheta", 0, 0, f64::NAN, true).is_err());
        assert_eq!(transform("vartheta", 0, 0, 0.0, false).unwrap(), 0.0);
    }

    #[test]
    fn test_unnormalized_entity_weights() {
        let stats = filled().unnormalized_entities();
        assert_eq!(stats.entity_topic(0, 0), 2.5);
        assert_eq!(stats.vartheta_at(0, 0, false).unwrap(), 2.5 / 4.5);
    }
}
