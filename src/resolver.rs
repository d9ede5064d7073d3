//! Resolution of numeric ids to human-readable names, read from side files next to a corpus.
//!
//! For a file base `b`, the resolver looks for `b.docs`, `b.vocab`, `b.authors.key`,
//! `b.labels.key`, `b.pubs.key` and `b.docnames`, one name per line. Anything after a
//! `=` on a line is dropped. Missing files are fine: lookups into them return `None`.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::labels::LabelKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameFile {
    Docs,
    Vocab,
    Authors,
    Labels,
    Pubs,
    DocNames,
}

impl NameFile {
    const ALL: [NameFile; 6] = [
        NameFile::Docs,
        NameFile::Vocab,
        NameFile::Authors,
        NameFile::Labels,
        NameFile::Pubs,
        NameFile::DocNames,
    ];

    fn extension(self) -> &'static str {
        match self {
            NameFile::Docs => ".docs",
            NameFile::Vocab => ".vocab",
            NameFile::Authors => ".authors.key",
            NameFile::Labels => ".labels.key",
            NameFile::Pubs => ".pubs.key",
            NameFile::DocNames => ".docnames",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CorpusResolver {
    names: [Option<Vec<String>>; 6],
    term_ids: Option<HashMap<String, usize>>,
    author_ids: Option<HashMap<String, usize>>,
}

impl CorpusResolver {
    pub fn open<P: AsRef<Path>>(filebase: P) -> Result<Self> {
        Self::open_with(filebase.as_ref(), false)
    }

    /// Like [`CorpusResolver::open`], but reads the vocabulary from `<filebase>.par.vocab`.
    pub fn open_paragraphs<P: AsRef<Path>>(filebase: P) -> Result<Self> {
        Self::open_with(filebase.as_ref(), true)
    }

    fn open_with(filebase: &Path, paragraphs: bool) -> Result<Self> {
        let mut resolver = Self::default();
        for file in NameFile::ALL {
            let mut path = filebase.as_os_str().to_os_string();
            if paragraphs && file == NameFile::Vocab {
                path.push(".par");
            }
            path.push(file.extension());
            let path = PathBuf::from(path);
            if path.exists() {
                let names = read_names(&path)?;
                log::debug!("read {} names from {}", names.len(), path.display());
                resolver.names[file as usize] = Some(names);
            }
        }
        Ok(resolver)
    }

    /// Builds a resolver from in-memory vocabulary and author names.
    pub fn from_names(vocab: Vec<String>, authors: Vec<String>) -> Self {
        let mut resolver = Self::default();
        resolver.names[NameFile::Vocab as usize] = Some(vocab);
        resolver.names[NameFile::Authors as usize] = Some(authors);
        resolver
    }

    fn name(&self, file: NameFile, id: usize) -> Option<&str> {
        self.names[file as usize]
            .as_ref()
            .and_then(|names| names.get(id))
            .map(String::as_str)
    }

    pub fn term(&self, id: usize) -> Option<&str> {
        self.name(NameFile::Vocab, id)
    }

    pub fn author(&self, id: usize) -> Option<&str> {
        self.name(NameFile::Authors, id)
    }

    /// Category label.
    pub fn label(&self, id: usize) -> Option<&str> {
        self.name(NameFile::Labels, id)
    }

    pub fn pub_name(&self, id: usize) -> Option<&str> {
        self.name(NameFile::Pubs, id)
    }

    pub fn doc(&self, id: usize) -> Option<&str> {
        self.name(NameFile::Docs, id)
    }

    pub fn doc_name(&self, id: usize) -> Option<&str> {
        self.name(NameFile::DocNames, id)
    }

    /// Name of a label of `kind`, where a name file exists for that kind.
    pub fn label_of(&self, kind: LabelKind, id: usize) -> Option<&str> {
        match kind {
            LabelKind::Authors => self.author(id),
            LabelKind::Categories => self.label(id),
            LabelKind::Pubs => self.pub_name(id),
            LabelKind::References | LabelKind::Tags | LabelKind::Years => None,
        }
    }

    /// Id of a vocabulary term; the reverse map is built on first use.
    pub fn term_id(&mut self, term: &str) -> Option<usize> {
        if self.term_ids.is_none() {
            self.term_ids = Some(reverse(&self.names[NameFile::Vocab as usize]));
        }
        self.term_ids.as_ref()?.get(term).copied()
    }

    /// Id of an author name; the reverse map is built on first use.
    pub fn author_id(&mut self, author: &str) -> Option<usize> {
        if self.author_ids.is_none() {
            self.author_ids = Some(reverse(&self.names[NameFile::Authors as usize]));
        }
        self.author_ids.as_ref()?.get(author).copied()
    }
}

fn reverse(names: &Option<Vec<String>>) -> HashMap<String, usize> {
    names
        .iter()
        .flatten()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect()
}

fn read_names(path: &Path) -> Result<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);
    let mut names = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        let name = line.split_once('=').map_or(line, |(name, _)| name);
        names.push(name.to_string());
    }
    Ok(names)
}
