/*!
Documents as integer token sequences, and cross-validation splits over them.

A [`Corpus`] is built once and never mutated. [`Corpus::split`] returns a [`Split`]
describing a random permutation of document indices cut into `nfold` contiguous
segments; the train and test corpora for a fold are materialized as new, independent
corpora, and the original index of every document they hold stays recoverable.

# Examples

```rust
use topic_mcmc::corpus::{Corpus, Document};

let corpus = Corpus::new(vec![
    Document::new(vec![0, 1, 0]),
    Document::new(vec![1, 2]),
    Document::new(vec![3]),
]);
assert_eq!(corpus.num_terms(), 4);

let split = corpus.split(3, 11).unwrap();
let train = corpus.train_corpus(&split, 0);
let test = corpus.test_corpus(&split, 0);
assert_eq!(train.num_docs() + test.num_docs(), 3);
```
*/

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::iter::FromIterator;
use std::path::Path;

use crate::error::{Error, Result};
use crate::rng::DiscreteRng;

/// An ordered, immutable sequence of vocabulary-term ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    words: Vec<usize>,
}

impl Document {
    pub fn new(words: Vec<usize>) -> Self {
        Self { words }
    }

    pub fn words(&self) -> &[usize] {
        &self.words
    }

    pub fn word(&self, n: usize) -> usize {
        self.words[n]
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl FromIterator<usize> for Document {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    docs: Vec<Document>,
    num_terms: usize,
}

impl Corpus {
    /// Builds a corpus whose vocabulary size is one past the largest term id seen.
    pub fn new(docs: Vec<Document>) -> Self {
        let num_terms = docs
            .iter()
            .flat_map(|d| d.words().iter())
            .max()
            .map_or(0, |&t| t + 1);
        Self { docs, num_terms }
    }

    /// Builds a corpus over a vocabulary of known size, rejecting out-of-range ids.
    pub fn with_num_terms(docs: Vec<Document>, num_terms: usize) -> Result<Self> {
        for (doc, d) in docs.iter().enumerate() {
            if let Some(&term) = d.words().iter().find(|&&t| t >= num_terms) {
                return Err(Error::TermOutOfRange {
                    doc,
                    term,
                    num_terms,
                });
            }
        }
        Ok(Self { docs, num_terms })
    }

    /// Reads one document per line of whitespace-separated term ids.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read_limited(path, None)
    }

    /// Like [`Corpus::read`], stopping after `limit` documents when given.
    pub fn read_limited<P: AsRef<Path>>(path: P, limit: Option<usize>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let mut docs = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            if limit.is_some_and(|l| docs.len() >= l) {
                break;
            }
            let line = line?;
            let words = parse_ids(&line).map_err(|message| Error::Parse {
                path: path.to_path_buf(),
                line: line_no + 1,
                message,
            })?;
            docs.push(Document::new(words));
            if docs.len() % 1000 == 0 {
                log::debug!("read {} documents from {}", docs.len(), path.display());
            }
        }
        let corpus = Self::new(docs);
        log::info!("loaded {corpus} from {}", path.display());
        Ok(corpus)
    }

    pub fn docs(&self) -> &[Document] {
        &self.docs
    }

    pub fn doc(&self, m: usize) -> &Document {
        &self.docs[m]
    }

    pub fn doc_words(&self, m: usize) -> &[usize] {
        self.docs[m].words()
    }

    pub fn num_docs(&self) -> usize {
        self.docs.len()
    }

    pub fn num_terms(&self) -> usize {
        self.num_terms
    }

    /// Total number of tokens over all documents.
    pub fn num_words(&self) -> usize {
        self.docs.iter().map(Document::len).sum()
    }

    pub fn num_words_in(&self, m: usize) -> usize {
        self.docs[m].len()
    }

    /**
    Draws a random permutation of the documents and cuts it into `nfold` segments.

    Segment `v` covers permuted positions `starts[v]..starts[v + 1]`, where
    `starts[v] = round(M * v / nfold)`. The corpus itself is left untouched.
    */
    pub fn split(&self, nfold: usize, seed: u64) -> Result<Split> {
        if nfold == 0 {
            return Err(Error::InvalidSplit("nfold must be at least 1".to_string()));
        }
        let m = self.num_docs();
        let perm = DiscreteRng::seed_from_u64(seed).permutation(m);
        let starts = (0..=nfold)
            .map(|v| (m as f64 * (v as f64 / nfold as f64) + 0.5).floor() as usize)
            .collect();
        Ok(Split {
            nfold,
            perm,
            starts,
        })
    }

    /// The documents outside test segment `fold`, in permuted order.
    pub fn train_corpus(&self, split: &Split, fold: usize) -> Corpus {
        self.subset(&split.train_ids(fold))
    }

    /// The documents of test segment `fold`, in permuted order.
    pub fn test_corpus(&self, split: &Split, fold: usize) -> Corpus {
        self.subset(&split.test_ids(fold))
    }

    pub(crate) fn subset(&self, ids: &[usize]) -> Corpus {
        Corpus {
            docs: ids.iter().map(|&m| self.docs[m].clone()).collect(),
            num_terms: self.num_terms,
        }
    }
}

impl fmt::Display for Corpus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Corpus {{numDocs = {}, numTerms = {}}}",
            self.docs.len(),
            self.num_terms
        )
    }
}

/// A permutation of document indices and the `nfold + 1` cut points over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    nfold: usize,
    perm: Vec<usize>,
    starts: Vec<usize>,
}

impl Split {
    pub fn nfold(&self) -> usize {
        self.nfold
    }

    pub fn permutation(&self) -> &[usize] {
        &self.perm
    }

    pub fn starts(&self) -> &[usize] {
        &self.starts
    }

    /// Original indices of the training documents of `fold`.
    pub fn train_ids(&self, fold: usize) -> Vec<usize> {
        self.check_fold(fold);
        let (lo, hi) = (self.starts[fold], self.starts[fold + 1]);
        self.perm[..lo]
            .iter()
            .chain(self.perm[hi..].iter())
            .copied()
            .collect()
    }

    /// Original indices of the test documents of `fold`.
    pub fn test_ids(&self, fold: usize) -> Vec<usize> {
        self.check_fold(fold);
        self.perm[self.starts[fold]..self.starts[fold + 1]].to_vec()
    }

    /// `(train, test)` original document indices of `fold`.
    pub fn orig_doc_ids(&self, fold: usize) -> (Vec<usize>, Vec<usize>) {
        (self.train_ids(fold), self.test_ids(fold))
    }

    fn check_fold(&self, fold: usize) {
        assert!(
            fold < self.nfold,
            "fold {fold} out of range for a {}-fold split",
            self.nfold
        );
    }
}

pub(crate) fn parse_ids(line: &str) -> std::result::Result<Vec<usize>, String> {
    line.split_whitespace()
        .map(|tok| {
            tok.parse::<usize>()
                .map_err(|e| format!("invalid id {tok:?}: {e}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn toy() -> Corpus {
        Corpus::new(
            (0..10)
                .map(|m| Document::new(vec![m % 4, (m + 1) % 4]))
                .collect(),
        )
    }

    #[test]
    fn test_num_terms_from_max_id() {
        let corpus = Corpus::new(vec![Document::new(vec![0, 1, 0]), Document::new(vec![1, 2])]);
        assert_eq!(corpus.num_docs(), 2);
        assert_eq!(corpus.num_terms(), 3);
        assert_eq!(corpus.num_words(), 5);
        assert_eq!(corpus.num_words_in(1), 2);
        assert_eq!(corpus.to_string(), "Corpus {numDocs = 2, numTerms = 3}");
    }

    #[test]
    fn test_with_num_terms_rejects_out_of_range() {
        let err = Corpus::with_num_terms(vec![Document::new(vec![0, 5])], 3).unwrap_err();
        assert!(matches!(
            err,
            Error::TermOutOfRange {
                doc: 0,
                term: 5,
                num_terms: 3
            }
        ));
    }

    #[test]
    fn test_read_corpus_file() {
        let mut file = NamedTempFile::new().expect("Could not create temp file");
        writeln!(file, "0 1 0").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "2\t1").unwrap();
        let corpus = Corpus::read(file.path()).unwrap();
        assert_eq!(corpus.num_docs(), 3);
        assert!(corpus.doc(1).is_empty());
        assert_eq!(corpus.doc_words(2), &[2, 1]);
        assert_eq!(corpus.num_terms(), 3);

        let limited = Corpus::read_limited(file.path(), Some(1)).unwrap();
        assert_eq!(limited.num_docs(), 1);
    }

    #[test]
    fn test_read_reports_bad_line() {
        let mut file = NamedTempFile::new().expect("Could not create temp file");
        writeln!(file, "0 1").unwrap();
        writeln!(file, "3 x").unwrap();
        match Corpus::read(file.path()) {
            Err(Error::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("Expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_split_cut_points() {
        let split = toy().split(3, 1).unwrap();
        // round(10 * v / 3) for v = 0..=3
        assert_eq!(split.starts(), &[0, 3, 7, 10]);
        assert_eq!(split.test_ids(1).len(), 4);
        assert_eq!(split.train_ids(1).len(), 6);
    }

    #[test]
    fn test_split_does_not_touch_corpus() {
        let corpus = toy();
        let before = corpus.clone();
        let _ = corpus.split(4, 99).unwrap();
        assert_eq!(corpus, before);
    }

    #[test]
    fn test_train_and_test_keep_permuted_order() {
        let corpus = toy();
        let split = corpus.split(2, 5).unwrap();
        let (train_ids, test_ids) = split.orig_doc_ids(0);
        let test = corpus.test_corpus(&split, 0);
        let train = corpus.train_corpus(&split, 0);
        for (i, &m) in test_ids.iter().enumerate() {
            assert_eq!(test.doc(i), corpus.doc(m));
        }
        for (i, &m) in train_ids.iter().enumerate() {
            assert_eq!(train.doc(i), corpus.doc(m));
        }
        assert_eq!(train.num_terms(), corpus.num_terms());
    }

    #[test]
    fn test_zero_folds_rejected() {
        assert!(matches!(toy().split(0, 1), Err(Error::InvalidSplit(_))));
    }

    #[test]
    #[should_panic]
    fn test_fold_out_of_range_panics() {
        let split = toy().split(2, 1).unwrap();
        split.test_ids(2);
    }
}
