//! Error type shared by every module of the crate.

use std::path::PathBuf;

use crate::labels::LabelKind;
use crate::ModelKind;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{}:{line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("no {0:?} labels are loaded and no file base is known to read them from")]
    MissingLabels(LabelKind),

    #[error("{kind:?} labels cover {found} documents, the corpus has {expected}")]
    LabelCount {
        kind: LabelKind,
        expected: usize,
        found: usize,
    },

    #[error("term {term} of document {doc} is outside the vocabulary of {num_terms} terms")]
    TermOutOfRange {
        doc: usize,
        term: usize,
        num_terms: usize,
    },

    #[error("invalid split: {0}")]
    InvalidSplit(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("the chain has not been initialized, call init() first")]
    NotInitialized,

    /// A smoothed posterior is zero, negative or NaN, so it has no logarithm.
    #[error("the {table}[{row}][{col}] is {value}, expected a positive mass")]
    NonPositiveMass {
        table: &'static str,
        row: usize,
        col: usize,
        value: f64,
    },

    #[error("document {doc} refers to entity {entity}, the trained model knows {num_entities}")]
    UnknownEntity {
        doc: usize,
        entity: usize,
        num_entities: usize,
    },

    #[error("expected a {expected} model, got a {found} model")]
    ModelMismatch { expected: ModelKind, found: ModelKind },

    #[error("the held-out corpus has no tokens to evaluate")]
    EmptyHeldOut,
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Config(e.to_string())
    }
}
