/*!
Plain-text reports over trained models and sampled assignments.

Every report comes as a `write_*` function over any [`Write`] and a `save_*` function
writing to a file. Names are resolved through an optional [`CorpusResolver`]; ids are
printed where no name is known.

# Examples

```rust
use topic_mcmc::corpus::{Corpus, Document};
use topic_mcmc::estimator::Estimator;
use topic_mcmc::params::Parameters;
use topic_mcmc::report;

let corpus = Corpus::new(vec![Document::new(vec![0, 1, 0]), Document::new(vec![1, 2])]);
let mut model = Estimator::lda(corpus, Parameters::new(2).with_top_words(2), 7);
model.init();
model.estimate(10).unwrap();

let mut out = Vec::new();
report::write_top_words(&mut out, &model, None).unwrap();
let text = String::from_utf8(out).unwrap();
assert!(text.starts_with("Topic 0th:\n"));
```
*/

use std::cmp::Ordering;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use ndarray::Array2;
use ndarray_stats::QuantileExt;

use crate::core::MarkovChain;
use crate::corpus::Corpus;
use crate::error::Result;
use crate::estimator::{Estimator, ModelKind};
use crate::gibbs::{Assignment, Conditional};
use crate::inferencer::Inferencer;
use crate::labels::CoauthorIndex;
use crate::resolver::CorpusResolver;
use crate::stats::SufficientStats;

/// What an assignment listing needs from a sampler.
pub trait TopicAssignments {
    fn model_kind(&self) -> ModelKind;

    fn sampled_corpus(&self) -> &Corpus;

    fn token_assignments(&self) -> &[Vec<Assignment>];

    fn relations(&self) -> Option<&CoauthorIndex>;
}

impl<C: Conditional> TopicAssignments for Estimator<C> {
    fn model_kind(&self) -> ModelKind {
        self.kind()
    }

    fn sampled_corpus(&self) -> &Corpus {
        self.corpus()
    }

    fn token_assignments(&self) -> &[Vec<Assignment>] {
        self.assignments()
    }

    fn relations(&self) -> Option<&CoauthorIndex> {
        self.coauthor_index()
    }
}

impl<C: Conditional> TopicAssignments for Inferencer<C> {
    fn model_kind(&self) -> ModelKind {
        self.kind()
    }

    fn sampled_corpus(&self) -> &Corpus {
        self.corpus()
    }

    fn token_assignments(&self) -> &[Vec<Assignment>] {
        self.assignments()
    }

    fn relations(&self) -> Option<&CoauthorIndex> {
        self.coauthor_index()
    }
}

/// One row of a ranked list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranked {
    pub id: usize,
    pub count: u32,
    pub weight: f64,
}

fn ranked(mut items: Vec<Ranked>, n: usize) -> Vec<Ranked> {
    // stable: equal weights stay in id order
    items.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(Ordering::Equal));
    items.truncate(n);
    items
}

/// The `n` terms with the highest count in `topic`, weighted by `nkt[k][t] / nk[k]`.
pub fn top_terms(stats: &SufficientStats, topic: usize, n: usize) -> Vec<Ranked> {
    let nk = stats.topic_counts()[topic];
    let items = stats
        .topic_term_counts()
        .row(topic)
        .iter()
        .enumerate()
        .map(|(id, &count)| Ranked {
            id,
            count,
            weight: share(count, nk),
        })
        .collect();
    ranked(items, n)
}

/// The `n` entities giving the largest share of their tokens to `topic`, `nek[e][k] / ne[e]`.
pub fn top_entities(stats: &SufficientStats, topic: usize, n: usize) -> Vec<Ranked> {
    let totals = stats.entity_counts();
    let items = stats
        .entity_topic_counts()
        .column(topic)
        .iter()
        .zip(totals.iter())
        .enumerate()
        .map(|(id, (&count, &total))| Ranked {
            id,
            count,
            weight: share(count, total),
        })
        .collect();
    ranked(items, n)
}

fn share(count: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// Index of the largest entry of every row, `None` for rows that cannot be ordered.
pub fn dominant_topics(vartheta: &Array2<f64>) -> Vec<Option<usize>> {
    vartheta.rows().into_iter().map(|row| row.argmax().ok()).collect()
}

fn term_name(resolver: Option<&CorpusResolver>, id: usize) -> String {
    resolver
        .and_then(|r| r.term(id))
        .map_or_else(|| id.to_string(), str::to_string)
}

fn author_name(resolver: Option<&CorpusResolver>, id: usize) -> String {
    resolver
        .and_then(|r| r.author(id))
        .map_or_else(|| id.to_string(), str::to_string)
}

fn entity_name<C: Conditional>(
    model: &Estimator<C>,
    resolver: Option<&CorpusResolver>,
    id: usize,
) -> String {
    match model.kind() {
        ModelKind::Lda => resolver
            .and_then(|r| r.doc_name(id).or_else(|| r.doc(id)))
            .map_or_else(|| id.to_string(), str::to_string),
        ModelKind::AuthorTopic => author_name(resolver, id),
        ModelKind::CoauthorTopic => match model.coauthor_index() {
            Some(index) => {
                let rel = index.relation(id);
                format!(
                    "({},{})",
                    author_name(resolver, rel.first()),
                    author_name(resolver, rel.second())
                )
            }
            None => id.to_string(),
        },
    }
}

/// For every topic, its top `twords` terms and their within-topic share.
pub fn write_top_words<W: Write, C: Conditional>(
    out: &mut W,
    model: &Estimator<C>,
    resolver: Option<&CorpusResolver>,
) -> io::Result<()> {
    let n = model.params().top_words();
    for k in 0..model.params().num_topics() {
        writeln!(out, "Topic {k}th:")?;
        for r in top_terms(model.stats(), k, n) {
            writeln!(out, "\t{}\t{}", term_name(resolver, r.id), r.weight)?;
        }
    }
    Ok(())
}

/// For every topic, the top documents (LDA), authors (AT) or author pairs (coAT).
pub fn write_top_entities<W: Write, C: Conditional>(
    out: &mut W,
    model: &Estimator<C>,
    resolver: Option<&CorpusResolver>,
) -> io::Result<()> {
    let n = model.params().top_entities();
    for k in 0..model.params().num_topics() {
        writeln!(out, "Topic {k}th:")?;
        for r in top_entities(model.stats(), k, n) {
            writeln!(out, "\t{}\t{}", entity_name(model, resolver, r.id), r.weight)?;
        }
    }
    Ok(())
}

/// `entity topic count total vartheta` for every non-zero entity-topic count.
pub fn write_vartheta<W: Write, C: Conditional>(
    out: &mut W,
    model: &Estimator<C>,
) -> Result<()> {
    let stats = model.stats();
    let counts = stats.entity_topic_counts();
    let totals = stats.entity_counts();
    for ((i, k), &count) in counts.indexed_iter() {
        if count != 0 {
            let value = stats.vartheta_at(i, k, false)?;
            writeln!(out, "{i} {k} {count} {} {value}", totals[i])?;
        }
    }
    Ok(())
}

/// `topic term count total varphi` for every non-zero topic-term count.
pub fn write_varphi<W: Write, C: Conditional>(out: &mut W, model: &Estimator<C>) -> Result<()> {
    let stats = model.stats();
    let counts = stats.topic_term_counts();
    let totals = stats.topic_counts();
    for ((k, v), &count) in counts.indexed_iter() {
        if count != 0 {
            let value = stats.varphi_at(k, v, false)?;
            writeln!(out, "{k} {v} {count} {} {value}", totals[k])?;
        }
    }
    Ok(())
}

/**
One line per document listing its tokens as `term:topic` (LDA), `term:topic:author`
(AT) or `term:topic:(a,b)` (coAT). Documents that were skipped give an empty line.
*/
pub fn write_assign<W: Write, M: TopicAssignments + ?Sized>(
    out: &mut W,
    model: &M,
) -> io::Result<()> {
    let corpus = model.sampled_corpus();
    for (m, doc) in model.token_assignments().iter().enumerate() {
        let words = corpus.doc_words(m);
        let tokens: Vec<String> = doc
            .iter()
            .zip(words.iter())
            .map(|(a, term)| match (model.model_kind(), model.relations()) {
                (ModelKind::Lda, _) => format!("{term}:{}", a.topic),
                (ModelKind::CoauthorTopic, Some(index)) => {
                    format!("{term}:{}:{}", a.topic, index.relation(a.entity))
                }
                _ => format!("{term}:{}:{}", a.topic, a.entity),
            })
            .collect();
        writeln!(out, "{}", tokens.join(" "))?;
    }
    Ok(())
}

fn save<P, F>(path: P, write: F) -> Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let mut out = BufWriter::new(File::create(path.as_ref())?);
    write(&mut out)?;
    out.flush()?;
    log::debug!("wrote {}", path.as_ref().display());
    Ok(())
}

pub fn save_top_words<P: AsRef<Path>, C: Conditional>(
    path: P,
    model: &Estimator<C>,
    resolver: Option<&CorpusResolver>,
) -> Result<()> {
    save(path, |out| Ok(write_top_words(out, model, resolver)?))
}

pub fn save_top_entities<P: AsRef<Path>, C: Conditional>(
    path: P,
    model: &Estimator<C>,
    resolver: Option<&CorpusResolver>,
) -> Result<()> {
    save(path, |out| Ok(write_top_entities(out, model, resolver)?))
}

pub fn save_vartheta<P: AsRef<Path>, C: Conditional>(path: P, model: &Estimator<C>) -> Result<()> {
    save(path, |out| write_vartheta(out, model))
}

pub fn save_varphi<P: AsRef<Path>, C: Conditional>(path: P, model: &Estimator<C>) -> Result<()> {
    save(path, |out| write_varphi(out, model))
}

pub fn save_assign<P: AsRef<Path>, M: TopicAssignments + ?Sized>(path: P, model: &M) -> Result<()> {
    save(path, |out| Ok(write_assign(out, model)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Document;
    use crate::gibbs::JointConditional;
    use crate::labels::{LabelCorpus, LabelKind};
    use crate::params::Parameters;
    use ndarray::array;
    use std::fs;
    use tempfile::NamedTempFile;

    fn trained_lda() -> Estimator<JointConditional> {
        let corpus = Corpus::new(vec![
            Document::new(vec![0, 1, 0, 2, 0]),
            Document::new(vec![1, 2, 3]),
            Document::new(vec![3, 3, 0]),
        ]);
        let params = Parameters::new(2).with_top_words(3).with_top_entities(2);
        let mut model = Estimator::lda(corpus, params, 21);
        model.init();
        model.estimate(5).unwrap();
        model
    }

    #[test]
    fn test_top_terms_sorted_descending() {
        let model = trained_lda();
        for k in 0..2 {
            let top = top_terms(model.stats(), k, 3);
            assert_eq!(top.len(), 3);
            for pair in top.windows(2) {
                assert!(pair[0].weight >= pair[1].weight, "Not sorted: {top:?}");
                if pair[0].weight == pair[1].weight {
                    assert!(pair[0].id < pair[1].id);
                }
            }
        }
    }

    #[test]
    fn test_top_entities_truncated_and_sorted() {
        let model = trained_lda();
        let top = top_entities(model.stats(), 1, 2);
        assert_eq!(top.len(), 2);
        assert!(top[0].weight >= top[1].weight);
        assert_eq!(top_entities(model.stats(), 0, 10).len(), 3);
    }

    #[test]
    fn test_sparse_dumps_cover_all_tokens() {
        let model = trained_lda();
        let mut out = Vec::new();
        write_varphi(&mut out, &model).unwrap();
        let text = String::from_utf8(out).unwrap();
        let total: u32 = text
            .lines()
            .map(|l| l.split(' ').nth(2).unwrap().parse::<u32>().unwrap())
            .sum();
        assert_eq!(total, 11);

        let mut out = Vec::new();
        write_vartheta(&mut out, &model).unwrap();
        let text = String::from_utf8(out).unwrap();
        for line in text.lines() {
            assert_eq!(line.split(' ').count(), 5, "Bad line {line:?}");
        }
    }

    #[test]
    fn test_assign_lines() {
        let model = trained_lda();
        let mut out = Vec::new();
        write_assign(&mut out, &model).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].split(' ').count(), 3);
        assert!(lines[1].starts_with("1:"));
        assert!(lines
            .iter()
            .flat_map(|l| l.split(' '))
            .all(|tok| tok.split(':').count() == 2));
    }

    #[test]
    fn test_coat_assign_prints_pairs_and_skips() {
        let corpus = Corpus::new(vec![Document::new(vec![0, 1]), Document::new(vec![2])]);
        let labels = LabelCorpus::new(corpus)
            .with_labels(LabelKind::Authors, vec![vec![4, 2], vec![3]])
            .unwrap();
        let mut model = Estimator::coauthor_topic(labels, Parameters::new(2), 3).unwrap();
        model.init();
        let mut out = Vec::new();
        write_assign(&mut out, &model).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(":(2,4)"), "Got {:?}", lines[0]);
        assert_eq!(lines[1], "");

        let resolver = CorpusResolver::from_names(
            vec!["a".into(), "b".into(), "c".into()],
            (0..5).map(|i| format!("author{i}")).collect(),
        );
        let mut out = Vec::new();
        write_top_entities(&mut out, &model, Some(&resolver)).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("(author2,author4)"));
    }

    #[test]
    fn test_dominant_topics() {
        let vartheta = array![[0.1, 0.7, 0.2], [0.5, 0.25, 0.25]];
        assert_eq!(dominant_topics(&vartheta), vec![Some(1), Some(0)]);
    }

    #[test]
    fn test_save_top_words_to_file() {
        let model = trained_lda();
        let file = NamedTempFile::new().expect("Could not create temp file");
        save_top_words(file.path(), &model, None).unwrap();
        let text = fs::read_to_string(file.path()).unwrap();
        assert_eq!(text.lines().filter(|l| l.starts_with("Topic")).count(), 2);
        assert_eq!(text.lines().filter(|l| l.starts_with('\t')).count(), 6);
    }
}
