//! Hyperparameters of the three topic models.
//!
//! Values are always validated on the way in: a non-positive topic count, pseudo-count or
//! list size is replaced by its default, so the samplers never see one.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const NTOPICS_DEFAULT: usize = 100;
pub const ALPHA_DEFAULT: f64 = 0.5;
pub const BETA_DEFAULT: f64 = 0.01;
pub const TWORDS_DEFAULT: usize = 20;
pub const TENTITIES_DEFAULT: usize = 20;

/**
Topic count `K`, Dirichlet pseudo-counts `alpha` and `beta`, and the sizes of the
ranked lists written by the reports.

# Examples

```rust
use topic_mcmc::params::Parameters;

let params = Parameters::new(8).with_alpha(0.1).with_beta(-1.0);
assert_eq!(params.num_topics(), 8);
assert_eq!(params.alpha(), 0.1);
// non-positive values fall back to the defaults
assert_eq!(params.beta(), 0.01);

let params = Parameters::from_yaml_str("ntopics: 5\ntauthors: 3\n").unwrap();
assert_eq!(params.num_topics(), 5);
assert_eq!(params.top_entities(), 3);
```
*/
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "ParameterFile")]
pub struct Parameters {
    #[serde(rename = "ntopics")]
    num_topics: usize,
    alpha: f64,
    beta: f64,
    #[serde(rename = "twords")]
    top_words: usize,
    #[serde(rename = "tentities")]
    top_entities: usize,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            num_topics: NTOPICS_DEFAULT,
            alpha: ALPHA_DEFAULT,
            beta: BETA_DEFAULT,
            top_words: TWORDS_DEFAULT,
            top_entities: TENTITIES_DEFAULT,
        }
    }
}

impl Parameters {
    /// `num_topics` topics, defaults for everything else.
    pub fn new(num_topics: usize) -> Self {
        Self {
            num_topics,
            ..Self::default()
        }
        .checked()
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self.checked()
    }

    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self.checked()
    }

    pub fn with_top_words(mut self, top_words: usize) -> Self {
        self.top_words = top_words;
        self.checked()
    }

    pub fn with_top_entities(mut self, top_entities: usize) -> Self {
        self.top_entities = top_entities;
        self.checked()
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Loads parameters from a YAML file with the keys `ntopics`, `alpha`, `beta`,
    /// `twords` and one of `tdocs` / `tauthors` / `tcoauthors`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let params = Self::from_yaml_str(&fs::read_to_string(path.as_ref())?)?;
        log::info!("loaded {params:?} from {}", path.as_ref().display());
        Ok(params)
    }

    pub fn num_topics(&self) -> usize {
        self.num_topics
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn top_words(&self) -> usize {
        self.top_words
    }

    pub fn top_entities(&self) -> usize {
        self.top_entities
    }

    fn checked(mut self) -> Self {
        if self.num_topics == 0 {
            log::warn!("ntopics must be positive, using {NTOPICS_DEFAULT}");
            self.num_topics = NTOPICS_DEFAULT;
        }
        // also catches NaN
        if !(self.alpha > 0.0) {
            log::warn!("alpha = {} is not positive, using {ALPHA_DEFAULT}", self.alpha);
            self.alpha = ALPHA_DEFAULT;
        }
        if !(self.beta > 0.0) {
            log::warn!("beta = {} is not positive, using {BETA_DEFAULT}", self.beta);
            self.beta = BETA_DEFAULT;
        }
        if self.top_words == 0 {
            self.top_words = TWORDS_DEFAULT;
        }
        if self.top_entities == 0 {
            self.top_entities = TENTITIES_DEFAULT;
        }
        self
    }
}

/// On-disk shape of [`Parameters`]; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ParameterFile {
    ntopics: Option<i64>,
    alpha: Option<f64>,
    beta: Option<f64>,
    twords: Option<i64>,
    #[serde(alias = "tdocs", alias = "tauthors", alias = "tcoauthors")]
    tentities: Option<i64>,
}

impl From<ParameterFile> for Parameters {
    fn from(file: ParameterFile) -> Self {
        let count = |v: Option<i64>, default: usize| v.map_or(default, |v| v.max(0) as usize);
        Parameters {
            num_topics: count(file.ntopics, NTOPICS_DEFAULT),
            alpha: file.alpha.unwrap_or(ALPHA_DEFAULT),
            beta: file.beta.unwrap_or(BETA_DEFAULT),
            top_words: count(file.twords, TWORDS_DEFAULT),
            top_entities: count(file.tentities, TENTITIES_DEFAULT),
        }
        .checked()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let p = Parameters::default();
        assert_eq!(p.num_topics(), 100);
        assert_eq!(p.alpha(), 0.5);
        assert_eq!(p.beta(), 0.01);
        assert_eq!(p.top_words(), 20);
        assert_eq!(p.top_entities(), 20);
    }

    #[test]
    fn test_non_positive_values_fall_back() {
        let p = Parameters::new(0)
            .with_alpha(0.0)
            .with_beta(f64::NAN)
            .with_top_words(0);
        assert_eq!(p, Parameters::default());
    }

    #[test]
    fn test_yaml_keys_and_aliases() {
        let p = Parameters::from_yaml_str("ntopics: 12\nalpha: 0.25\nbeta: 0.1\ntwords: 7\ntcoauthors: 4\n")
            .unwrap();
        assert_eq!(p.num_topics(), 12);
        assert_eq!(p.alpha(), 0.25);
        assert_eq!(p.beta(), 0.1);
        assert_eq!(p.top_words(), 7);
        assert_eq!(p.top_entities(), 4);

        let p = Parameters::from_yaml_str("tdocs: 9").unwrap();
        assert_eq!(p.top_entities(), 9);
        assert_eq!(p.num_topics(), 100);
    }

    #[test]
    fn test_yaml_negative_values_fall_back() {
        let p = Parameters::from_yaml_str("ntopics: -3\nalpha: -1.0\n").unwrap();
        assert_eq!(p.num_topics(), NTOPICS_DEFAULT);
        assert_eq!(p.alpha(), ALPHA_DEFAULT);
    }

    #[test]
    fn test_yaml_type_error() {
        assert!(Parameters::from_yaml_str("alpha: lots").is_err());
    }

    #[test]
    fn test_from_path() {
        let mut file = NamedTempFile::new().expect("Could not create temp file");
        writeln!(file, "ntopics: 3").unwrap();
        let p = Parameters::from_path(file.path()).unwrap();
        assert_eq!(p.num_topics(), 3);
    }
}
