//! TF-IDF vectorizer reproducing a fitted scikit-learn `TfidfVectorizer`.
//!
//! The artifact carries the fitted vocabulary and idf weights together with
//! the analyzer settings, so transform output matches the exporting pipeline:
//! token regex → stop words → n-grams → counts → tf weighting → idf → norm.

use crate::model::{load_json, ArtifactError, SparseVector};
use regex::Regex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// scikit-learn's default `token_pattern`
pub const DEFAULT_TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
}

/// On-disk form of a fitted vectorizer
#[derive(Debug, Clone, Deserialize)]
pub struct TfidfArtifact {
    pub vocabulary: HashMap<String, usize>,
    /// Absent when the vectorizer was fitted with `use_idf=False`
    #[serde(default)]
    pub idf: Option<Vec<f32>>,
    #[serde(default = "default_true")]
    pub lowercase: bool,
    #[serde(default = "default_token_pattern")]
    pub token_pattern: String,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default)]
    pub sublinear_tf: bool,
    #[serde(default)]
    pub binary: bool,
    #[serde(default = "default_norm")]
    pub norm: Option<Norm>,
    #[serde(default)]
    pub stop_words: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_token_pattern() -> String {
    DEFAULT_TOKEN_PATTERN.to_string()
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

fn default_norm() -> Option<Norm> {
    Some(Norm::L2)
}

/// Fitted TF-IDF vectorizer
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Option<Vec<f32>>,
    lowercase: bool,
    token_regex: Regex,
    ngram_range: (usize, usize),
    sublinear_tf: bool,
    binary: bool,
    norm: Option<Norm>,
    stop_words: HashSet<String>,
    dim: usize,
}

impl TfidfVectorizer {
    pub fn from_artifact(artifact: TfidfArtifact) -> Result<Self, String> {
        let token_regex = Regex::new(&artifact.token_pattern)
            .map_err(|e| format!("invalid token_pattern: {}", e))?;

        let (min_n, max_n) = artifact.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(format!("invalid ngram_range ({}, {})", min_n, max_n));
        }

        let dim = match &artifact.idf {
            Some(idf) => idf.len(),
            None => artifact
                .vocabulary
                .values()
                .max()
                .map(|&max| max + 1)
                .unwrap_or(0),
        };

        if let Some((term, &index)) = artifact.vocabulary.iter().find(|(_, &i)| i >= dim) {
            return Err(format!(
                "vocabulary term {:?} has index {} outside {} features",
                term, index, dim
            ));
        }

        Ok(Self {
            vocabulary: artifact.vocabulary,
            idf: artifact.idf,
            lowercase: artifact.lowercase,
            token_regex,
            ngram_range: artifact.ngram_range,
            sublinear_tf: artifact.sublinear_tf,
            binary: artifact.binary,
            norm: artifact.norm,
            stop_words: artifact.stop_words.into_iter().collect(),
            dim,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ArtifactError> {
        let artifact: TfidfArtifact = load_json(path)?;
        let vectorizer = Self::from_artifact(artifact).map_err(|message| ArtifactError::Invalid {
            path: path.to_path_buf(),
            message,
        })?;

        tracing::info!(
            "Loaded TF-IDF vectorizer from {:?} ({} terms, ngram {:?})",
            path,
            vectorizer.vocabulary.len(),
            vectorizer.ngram_range
        );

        Ok(vectorizer)
    }

    /// Number of output features
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Tokens after preprocessing and stop-word removal
    pub fn tokenize(&self, doc: &str) -> Vec<String> {
        let doc = if self.lowercase {
            doc.to_lowercase()
        } else {
            doc.to_string()
        };

        // A single capture group in the pattern selects the token
        let use_group = self.token_regex.captures_len() == 2;

        self.token_regex
            .captures_iter(&doc)
            .filter_map(|caps| {
                let m = if use_group { caps.get(1) } else { caps.get(0) };
                m.map(|m| m.as_str().to_string())
            })
            .filter(|token| !self.stop_words.contains(token))
            .collect()
    }

    /// Word n-grams in scikit-learn order
    fn ngrams(&self, tokens: Vec<String>) -> Vec<String> {
        let (min_n, max_n) = self.ngram_range;
        if max_n == 1 {
            return tokens;
        }

        let mut terms = Vec::new();
        if min_n == 1 {
            terms.extend(tokens.iter().cloned());
        }
        for n in min_n.max(2)..=max_n {
            if n > tokens.len() {
                break;
            }
            for window in tokens.windows(n) {
                terms.push(window.join(" "));
            }
        }
        terms
    }

    /// Transform one document into a TF-IDF vector
    pub fn transform(&self, doc: &str) -> SparseVector {
        let mut counts: HashMap<usize, f32> = HashMap::new();
        for term in self.ngrams(self.tokenize(doc)) {
            if let Some(&index) = self.vocabulary.get(&term) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let mut weighted: Vec<(usize, f32)> = counts
            .into_iter()
            .map(|(index, count)| {
                let mut tf = if self.binary { 1.0 } else { count };
                if self.sublinear_tf {
                    tf = 1.0 + tf.ln();
                }
                let idf = self
                    .idf
                    .as_ref()
                    .map(|idf| idf[index])
                    .unwrap_or(1.0);
                (index, tf * idf)
            })
            .collect();

        match self.norm {
            Some(Norm::L2) => {
                let norm = weighted.iter().map(|(_, v)| v * v).sum::<f32>().sqrt();
                if norm > 0.0 {
                    weighted.iter_mut().for_each(|(_, v)| *v /= norm);
                }
            }
            Some(Norm::L1) => {
                let norm: f32 = weighted.iter().map(|(_, v)| v.abs()).sum();
                if norm > 0.0 {
                    weighted.iter_mut().for_each(|(_, v)| *v /= norm);
                }
            }
            None => {}
        }

        SparseVector::from_pairs(self.dim, weighted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(vocab: &[(&str, usize)], idf: Vec<f32>) -> TfidfArtifact {
        TfidfArtifact {
            vocabulary: vocab.iter().map(|(t, i)| (t.to_string(), *i)).collect(),
            idf: Some(idf),
            lowercase: true,
            token_pattern: DEFAULT_TOKEN_PATTERN.to_string(),
            ngram_range: (1, 1),
            sublinear_tf: false,
            binary: false,
            norm: Some(Norm::L2),
            stop_words: Vec::new(),
        }
    }

    #[test]
    fn test_tokenize_default_pattern() {
        let v = TfidfVectorizer::from_artifact(artifact(&[], vec![])).unwrap();
        // Single-character tokens are dropped by the default pattern
        assert_eq!(
            v.tokenize("I feel GREAT, really great!"),
            vec!["feel", "great", "really", "great"]
        );
    }

    #[test]
    fn test_transform_l2_normalized() {
        let v = TfidfVectorizer::from_artifact(artifact(
            &[("happy", 0), ("sad", 1), ("today", 2)],
            vec![1.0, 2.0, 1.5],
        ))
        .unwrap();

        let x = v.transform("happy happy today");
        // tf-idf: happy = 2 * 1.0, today = 1 * 1.5; l2 norm = 2.5
        assert!((x.get(0) - 0.8).abs() < 1e-6);
        assert!((x.get(2) - 0.6).abs() < 1e-6);
        assert_eq!(x.get(1), 0.0);
        assert_eq!(x.dim(), 3);
    }

    #[test]
    fn test_transform_unknown_words_only() {
        let v = TfidfVectorizer::from_artifact(artifact(&[("happy", 0)], vec![1.0])).unwrap();
        let x = v.transform("completely unseen vocabulary");
        assert!(x.is_empty());
    }

    #[test]
    fn test_sublinear_tf() {
        let mut a = artifact(&[("sad", 0), ("very", 1)], vec![1.0, 1.0]);
        a.sublinear_tf = true;
        a.norm = None;
        let v = TfidfVectorizer::from_artifact(a).unwrap();
        let x = v.transform("very very very sad");
        assert!((x.get(1) - (1.0 + 3.0f32.ln())).abs() < 1e-6);
        assert!((x.get(0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_bigrams_and_stop_words() {
        let mut a = artifact(
            &[("not", 0), ("happy", 1), ("not happy", 2), ("the", 3)],
            vec![1.0, 1.0, 1.0, 1.0],
        );
        a.ngram_range = (1, 2);
        a.norm = None;
        a.stop_words = vec!["am".to_string()];
        let v = TfidfVectorizer::from_artifact(a).unwrap();

        // "am" is removed before n-grams are formed, so "not happy" is adjacent
        let x = v.transform("am not am happy");
        assert_eq!(x.get(0), 1.0);
        assert_eq!(x.get(1), 1.0);
        assert_eq!(x.get(2), 1.0);
        assert_eq!(x.get(3), 0.0);
    }

    #[test]
    fn test_l1_norm_and_binary() {
        let mut a = artifact(&[("calm", 0), ("day", 1)], vec![1.0, 3.0]);
        a.norm = Some(Norm::L1);
        a.binary = true;
        let v = TfidfVectorizer::from_artifact(a).unwrap();
        let x = v.transform("calm calm calm day");
        assert!((x.get(0) - 0.25).abs() < 1e-6);
        assert!((x.get(1) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_bad_artifacts() {
        let mut bad_regex = artifact(&[], vec![]);
        bad_regex.token_pattern = "(".to_string();
        assert!(TfidfVectorizer::from_artifact(bad_regex).is_err());

        let mut bad_ngram = artifact(&[], vec![]);
        bad_ngram.ngram_range = (2, 1);
        assert!(TfidfVectorizer::from_artifact(bad_ngram).is_err());

        let out_of_range = artifact(&[("word", 5)], vec![1.0]);
        assert!(TfidfVectorizer::from_artifact(out_of_range).is_err());
    }

    #[test]
    fn test_from_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("text_vectorizer.json");
        std::fs::write(
            &path,
            r#"{"vocabulary": {"happy": 0, "sad": 1}, "idf": [1.2, 1.7]}"#,
        )
        .unwrap();

        let v = TfidfVectorizer::from_file(&path).unwrap();
        assert_eq!(v.dim(), 2);
        let x = v.transform("Sad");
        assert!((x.get(1) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_explicit_null_norm() {
        let a: TfidfArtifact =
            serde_json::from_str(r#"{"vocabulary": {"a1": 0}, "idf": [2.0], "norm": null}"#)
                .unwrap();
        assert_eq!(a.norm, None);
        let v = TfidfVectorizer::from_artifact(a).unwrap();
        assert_eq!(v.transform("a1 a1").get(0), 4.0);
    }
}
