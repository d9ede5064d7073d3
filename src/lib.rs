//! Collapsed Gibbs samplers for topic models: LDA, the Author-Topic model (AT) and the
//! coAuthor-Topic model (coAT), with held-out inference and perplexity.
//!
//! ```rust
//! use topic_mcmc::corpus::{Corpus, Document};
//! use topic_mcmc::{Estimator, Inferencer, Parameters};
//!
//! let train = Corpus::new(vec![
//!     Document::new(vec![0, 1, 0, 2]),
//!     Document::new(vec![2, 3, 3]),
//! ]);
//! let mut model = Estimator::lda(train, Parameters::new(2), 56567651);
//! model.init();
//! model.estimate(50).unwrap();
//!
//! let held_out = Corpus::new(vec![Document::new(vec![0, 2, 3])]);
//! let mut inferencer = Inferencer::lda(&model, held_out, 56567651).unwrap();
//! inferencer.init();
//! inferencer.inference(3).unwrap();
//! assert!(inferencer.ppx().unwrap() > 0.0);
//! ```

pub mod core;
pub mod corpus;
pub mod crossval;
pub mod error;
pub mod estimator;
pub mod gibbs;
pub mod inferencer;
pub mod io;
pub mod labels;
pub mod params;
pub mod report;
pub mod resolver;
pub mod rng;
pub mod stats;
pub mod synthetic;

pub use error::{Error, Result};
pub use estimator::{Estimator, ModelKind};
pub use inferencer::Inferencer;
pub use params::Parameters;
