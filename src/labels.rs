/*!
Per-document entity labels on top of a [`Corpus`], and the coauthor relations derived
from author labels.

Each of the six [`LabelKind`]s is read independently, the first time it is asked for,
from `<filebase><extension>` (one line per document, space-separated label ids, an
empty line meaning no labels). The [`CoauthorIndex`] is likewise built on first use
and cached for the lifetime of the [`LabelCorpus`].

# Examples

```rust
use topic_mcmc::corpus::{Corpus, Document};
use topic_mcmc::labels::{LabelCorpus, LabelKind, Relation};

let corpus = Corpus::new(vec![Document::new(vec![0, 1]), Document::new(vec![2])]);
let mut corpus = LabelCorpus::new(corpus)
    .with_labels(LabelKind::Authors, vec![vec![4, 1, 2], vec![3]])
    .unwrap();

let coauthors = corpus.coauthors().unwrap();
assert_eq!(coauthors.num_relations(), 3);
assert!(coauthors.doc_relations(1).is_empty());
assert_eq!(coauthors.id(&Relation::new(2, 4)), coauthors.id(&Relation::new(4, 2)));
```
*/

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::corpus::{parse_ids, Corpus, Split};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKind {
    Authors,
    Categories,
    Pubs,
    References,
    Tags,
    Years,
}

impl LabelKind {
    pub const ALL: [LabelKind; 6] = [
        LabelKind::Authors,
        LabelKind::Categories,
        LabelKind::Pubs,
        LabelKind::References,
        LabelKind::Tags,
        LabelKind::Years,
    ];

    /// File extension the labels of this kind are read from.
    pub fn extension(self) -> &'static str {
        match self {
            LabelKind::Authors => ".authors",
            LabelKind::Categories => ".labels",
            LabelKind::Pubs => ".pubs",
            LabelKind::References => ".refs",
            LabelKind::Tags => ".tags",
            LabelKind::Years => ".years",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// An unordered pair of authors. `Relation::new(a, b) == Relation::new(b, a)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Relation {
    first: usize,
    second: usize,
}

impl Relation {
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            first: a.min(b),
            second: a.max(b),
        }
    }

    /// The smaller author id.
    pub fn first(&self) -> usize {
        self.first
    }

    /// The larger author id.
    pub fn second(&self) -> usize {
        self.second
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.first, self.second)
    }
}

/// Dense ids for every coauthor pair in a corpus, with the lookups in both directions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoauthorIndex {
    doc_relations: Vec<Vec<usize>>,
    ids: HashMap<Relation, usize>,
    relations: Vec<Relation>,
    relation_docs: Vec<Vec<usize>>,
}

impl CoauthorIndex {
    /// Assigns ids to author pairs in order of first appearance (document order,
    /// then `i < j` over each document's author list).
    pub fn build(authors: &[Vec<usize>]) -> Self {
        let mut index = Self::default();
        for (m, a) in authors.iter().enumerate() {
            let mut rels = Vec::with_capacity(a.len() * a.len().saturating_sub(1) / 2);
            for i in 0..a.len() {
                for j in (i + 1)..a.len() {
                    let r = Relation::new(a[i], a[j]);
                    let id = match index.ids.get(&r) {
                        Some(&id) => id,
                        None => {
                            let id = index.relations.len();
                            index.ids.insert(r, id);
                            index.relations.push(r);
                            index.relation_docs.push(Vec::new());
                            id
                        }
                    };
                    index.relation_docs[id].push(m);
                    rels.push(id);
                }
            }
            index.doc_relations.push(rels);
        }
        index
    }

    /// Number of distinct relations.
    pub fn num_relations(&self) -> usize {
        self.relations.len()
    }

    /// Number of relation tokens summed over documents.
    pub fn num_tokens(&self) -> usize {
        self.doc_relations.iter().map(Vec::len).sum()
    }

    pub fn doc_relations(&self, m: usize) -> &[usize] {
        &self.doc_relations[m]
    }

    pub fn doc_relation_lists(&self) -> &[Vec<usize>] {
        &self.doc_relations
    }

    pub fn relation(&self, id: usize) -> Relation {
        self.relations[id]
    }

    pub fn id(&self, relation: &Relation) -> Option<usize> {
        self.ids.get(relation).copied()
    }

    /// Documents the relation with this id occurs in.
    pub fn docs(&self, id: usize) -> &[usize] {
        &self.relation_docs[id]
    }

    pub fn docs_of(&self, relation: &Relation) -> Option<&[usize]> {
        self.id(relation).map(|id| self.docs(id))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct LabelTable {
    docs: Vec<Vec<usize>>,
    // distinct label range, one past the largest id
    num_distinct: usize,
    num_tokens: usize,
}

impl LabelTable {
    fn new(docs: Vec<Vec<usize>>) -> Self {
        let num_distinct = docs
            .iter()
            .flat_map(|d| d.iter())
            .max()
            .map_or(0, |&l| l + 1);
        let num_tokens = docs.iter().map(Vec::len).sum();
        Self {
            docs,
            num_distinct,
            num_tokens,
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut docs = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let ids = parse_ids(line.trim()).map_err(|message| Error::Parse {
                path: path.to_path_buf(),
                line: line_no + 1,
                message,
            })?;
            docs.push(ids);
        }
        Ok(Self::new(docs))
    }

    fn subset(&self, ids: &[usize]) -> Self {
        let docs: Vec<Vec<usize>> = ids.iter().map(|&m| self.docs[m].clone()).collect();
        let num_tokens = docs.iter().map(Vec::len).sum();
        Self {
            docs,
            // child corpora keep the parent's id space
            num_distinct: self.num_distinct,
            num_tokens,
        }
    }
}

/// A corpus whose documents carry entity labels of up to six kinds.
#[derive(Debug, Clone, Default)]
pub struct LabelCorpus {
    corpus: Corpus,
    filebase: Option<PathBuf>,
    labels: [Option<LabelTable>; 6],
    coauthors: Option<CoauthorIndex>,
}

impl LabelCorpus {
    /// Wraps an in-memory corpus. Labels must be attached with [`LabelCorpus::with_labels`].
    pub fn new(corpus: Corpus) -> Self {
        Self {
            corpus,
            ..Self::default()
        }
    }

    /// Reads `<filebase>.corpus` now; label files are read when first needed.
    pub fn open<P: AsRef<Path>>(filebase: P) -> Result<Self> {
        let filebase = filebase.as_ref().to_path_buf();
        let corpus = Corpus::read(with_extension(&filebase, ".corpus"))?;
        Ok(Self {
            corpus,
            filebase: Some(filebase),
            ..Self::default()
        })
    }

    /// Attaches labels of `kind`, one list per document.
    pub fn with_labels(mut self, kind: LabelKind, docs: Vec<Vec<usize>>) -> Result<Self> {
        let table = LabelTable::new(docs);
        self.check_count(kind, &table)?;
        self.labels[kind.index()] = Some(table);
        if kind == LabelKind::Authors {
            self.coauthors = None;
        }
        Ok(self)
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn into_corpus(self) -> Corpus {
        self.corpus
    }

    pub fn num_docs(&self) -> usize {
        self.corpus.num_docs()
    }

    /// Whether labels of `kind` are already in memory.
    pub fn has_labels(&self, kind: LabelKind) -> bool {
        self.labels[kind.index()].is_some()
    }

    fn table(&mut self, kind: LabelKind) -> Result<&LabelTable> {
        if self.labels[kind.index()].is_none() {
            let filebase = self.filebase.as_ref().ok_or(Error::MissingLabels(kind))?;
            let path = with_extension(filebase, kind.extension());
            let table = LabelTable::read(&path)?;
            self.check_count(kind, &table)?;
            log::debug!(
                "read {} {kind:?} labels ({} distinct) from {}",
                table.num_tokens,
                table.num_distinct,
                path.display()
            );
            self.labels[kind.index()] = Some(table);
        }
        self.labels[kind.index()]
            .as_ref()
            .ok_or(Error::MissingLabels(kind))
    }

    fn check_count(&self, kind: LabelKind, table: &LabelTable) -> Result<()> {
        if table.docs.len() != self.corpus.num_docs() {
            return Err(Error::LabelCount {
                kind,
                expected: self.corpus.num_docs(),
                found: table.docs.len(),
            });
        }
        Ok(())
    }

    /// Label ids of `kind` for every document.
    pub fn doc_labels(&mut self, kind: LabelKind) -> Result<&[Vec<usize>]> {
        Ok(&self.table(kind)?.docs)
    }

    /// Number of distinct labels of `kind` (one past the largest id).
    pub fn labels_v(&mut self, kind: LabelKind) -> Result<usize> {
        Ok(self.table(kind)?.num_distinct)
    }

    /// Number of label tokens of `kind` over all documents.
    pub fn labels_w(&mut self, kind: LabelKind) -> Result<usize> {
        Ok(self.table(kind)?.num_tokens)
    }

    /// Largest number of labels of `kind` on any single document.
    pub fn labels_max_n(&mut self, kind: LabelKind) -> Result<usize> {
        Ok(self.table(kind)?.docs.iter().map(Vec::len).max().unwrap_or(0))
    }

    /// The coauthor relations of this corpus, built from author labels on first use.
    pub fn coauthors(&mut self) -> Result<&CoauthorIndex> {
        if self.coauthors.is_none() {
            let index = CoauthorIndex::build(self.doc_labels(LabelKind::Authors)?);
            log::debug!(
                "built {} coauthor relations over {} documents",
                index.num_relations(),
                index.doc_relations.len()
            );
            self.coauthors = Some(index);
        }
        self.coauthors
            .as_ref()
            .ok_or(Error::MissingLabels(LabelKind::Authors))
    }

    /// The documents outside test segment `fold`, with every label kind loaded so far.
    pub fn train_corpus(&self, split: &Split, fold: usize) -> LabelCorpus {
        self.subset(&split.train_ids(fold))
    }

    /// The documents of test segment `fold`, with every label kind loaded so far.
    pub fn test_corpus(&self, split: &Split, fold: usize) -> LabelCorpus {
        self.subset(&split.test_ids(fold))
    }

    fn subset(&self, ids: &[usize]) -> LabelCorpus {
        let mut labels: [Option<LabelTable>; 6] = Default::default();
        for (slot, table) in labels.iter_mut().zip(self.labels.iter()) {
            *slot = table.as_ref().map(|t| t.subset(ids));
        }
        LabelCorpus {
            corpus: self.corpus.subset(ids),
            filebase: None,
            labels,
            coauthors: None,
        }
    }
}

fn with_extension(filebase: &Path, extension: &str) -> PathBuf {
    let mut s = filebase.as_os_str().to_os_string();
    s.push(extension);
    PathBuf::from(s)
}
